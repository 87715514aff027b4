// ==========================================
// Excel2DB - 文件解析器实现
// ==========================================
// 职责: 文件读取与解析（导入前置阶段，不触碰存储）
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// ==========================================

use crate::domain::{RawRow, RawTable};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::FileParser;
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

/// 默认最大文件大小（10MB）
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// 支持的扩展名
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["xlsx", "xls", "csv"];

/// 小写扩展名（无扩展名返回空串）
pub fn file_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// 校验文件存在、扩展名与大小
pub fn check_file(path: &Path, max_size: u64) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }

    let ext = file_extension(path);
    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ImportError::UnsupportedFormat(ext));
    }

    let size = std::fs::metadata(path)?.len();
    if size == 0 {
        return Err(ImportError::MalformedInput("文件为空".to_string()));
    }
    if size > max_size {
        return Err(ImportError::FileTooLarge {
            size,
            limit: max_size,
        });
    }
    Ok(())
}

/// 表头 + 数据行 → RawTable（跳过全空行）
fn build_table<I>(headers: Vec<String>, rows: I) -> ImportResult<RawTable>
where
    I: IntoIterator<Item = Vec<String>>,
{
    if headers.iter().all(|h| h.is_empty()) {
        return Err(ImportError::MalformedInput("缺少表头".to_string()));
    }

    let mut records = Vec::new();
    for values in rows {
        let mut row_map = RawRow::new();
        for (col_idx, value) in values.into_iter().enumerate() {
            if let Some(header) = headers.get(col_idx) {
                if !header.is_empty() {
                    row_map.insert(header.clone(), value.trim().to_string());
                }
            }
        }

        // 跳过完全空白的行
        if row_map.values().all(|v| v.is_empty()) {
            continue;
        }

        records.push(row_map);
    }

    Ok(RawTable::new(headers, records))
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl CsvParser {
    fn parse_reader<R: Read>(&self, reader: R) -> ImportResult<RawTable> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(reader);

        // 读取表头（去掉 Excel 导出 CSV 常见的 UTF-8 BOM）
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        build_table(headers, rows)
    }
}

impl FileParser for CsvParser {
    fn parse_path(&self, file_path: &Path) -> ImportResult<RawTable> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }
        let ext = file_extension(file_path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let file = File::open(file_path)?;
        self.parse_reader(file)
    }

    fn parse_bytes(&self, content: &[u8]) -> ImportResult<RawTable> {
        self.parse_reader(content)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl ExcelParser {
    /// 读取第一个 sheet，首行为表头
    fn parse_first_sheet<RS>(&self, workbook: &mut Sheets<RS>) -> ImportResult<RawTable>
    where
        RS: Read + Seek,
    {
        let sheet_names = workbook.sheet_names();
        let sheet_name = sheet_names
            .first()
            .cloned()
            .ok_or_else(|| ImportError::MalformedInput("Excel 文件无工作表".to_string()))?;

        let range = workbook.worksheet_range(&sheet_name)?;
        self.parse_range(&range)
    }

    fn parse_range(&self, range: &Range<Data>) -> ImportResult<RawTable> {
        let mut rows = range.rows();
        let header_row = rows
            .next()
            .ok_or_else(|| ImportError::MalformedInput("Excel 文件无数据行".to_string()))?;

        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        build_table(
            headers,
            rows.map(|data_row| data_row.iter().map(|cell| cell.to_string()).collect()),
        )
    }
}

impl FileParser for ExcelParser {
    fn parse_path(&self, file_path: &Path) -> ImportResult<RawTable> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }
        let ext = file_extension(file_path);
        if ext != "xlsx" && ext != "xls" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;
        self.parse_first_sheet(&mut workbook)
    }

    fn parse_bytes(&self, content: &[u8]) -> ImportResult<RawTable> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(content.to_vec()))?;
        self.parse_first_sheet(&mut workbook)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    fn parser_for(ext: &str) -> ImportResult<Box<dyn FileParser>> {
        match ext {
            "csv" => Ok(Box::new(CsvParser)),
            "xlsx" | "xls" => Ok(Box::new(ExcelParser)),
            _ => Err(ImportError::UnsupportedFormat(ext.to_string())),
        }
    }

    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<RawTable> {
        let path = file_path.as_ref();
        Self::parser_for(&file_extension(path))?.parse_path(path)
    }

    /// 按文件名扩展名解析上传内容
    pub fn parse_upload(&self, file_name: &str, content: &[u8]) -> ImportResult<RawTable> {
        if content.is_empty() {
            return Err(ImportError::MalformedInput("文件不能为空".to_string()));
        }
        Self::parser_for(&file_extension(Path::new(file_name)))?.parse_bytes(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn csv_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        for line in lines {
            writeln!(temp_file, "{}", line).unwrap();
        }
        temp_file
    }

    #[test]
    fn test_csv_parser_valid_file() {
        let temp_file = csv_file(&["中文,其他语言", "你好,hello", "再见,bye"]);

        let parser = CsvParser;
        let table = parser.parse_path(temp_file.path()).unwrap();

        assert_eq!(table.headers, vec!["中文", "其他语言"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].get("中文"), Some(&"你好".to_string()));
        assert_eq!(table.rows[1].get("其他语言"), Some(&"bye".to_string()));
    }

    #[test]
    fn test_csv_parser_file_not_found() {
        let parser = CsvParser;
        let result = parser.parse_path(Path::new("non_existent.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_csv_parser_skip_empty_rows() {
        let temp_file = csv_file(&["中文,其他语言", "你好,hello", ",", "再见,bye"]);

        let table = CsvParser.parse_path(temp_file.path()).unwrap();

        // 应跳过空行
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_csv_bytes_strip_bom() {
        let content = "\u{feff}名称,编码\n感冒,J00\n".as_bytes();
        let table = CsvParser.parse_bytes(content).unwrap();
        assert_eq!(table.headers[0], "名称");
        assert_eq!(table.rows[0].get("名称"), Some(&"感冒".to_string()));
    }

    #[test]
    fn test_universal_parser_rejects_unknown_extension() {
        let result = UniversalFileParser.parse_upload("data.txt", b"a,b\n1,2\n");
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_universal_parser_rejects_empty_upload() {
        let result = UniversalFileParser.parse_upload("data.csv", b"");
        assert!(matches!(result, Err(ImportError::MalformedInput(_))));
    }

    #[test]
    fn test_check_file_size_limit() {
        let temp_file = csv_file(&["中文,其他语言", "你好,hello"]);
        assert!(check_file(temp_file.path(), DEFAULT_MAX_FILE_SIZE).is_ok());
        assert!(matches!(
            check_file(temp_file.path(), 4),
            Err(ImportError::FileTooLarge { .. })
        ));
    }
}
