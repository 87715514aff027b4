// ==========================================
// Excel2DB - 导入组件 Trait
// ==========================================
// 职责: 定义导入组件接口（不包含实现）
// ==========================================

use crate::domain::{RawTable, Row, TemplateDescriptor};
use crate::importer::error::ImportResult;
use std::path::Path;

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 把表格文件解析为原始行（表头 → 单元格文本），按文件顺序
// 实现者: ExcelParser, CsvParser
pub trait FileParser: Send + Sync {
    /// 解析磁盘文件
    ///
    /// # 返回
    /// - Ok(RawTable): 表头 + 数据行（已跳过全空行，单元格已 TRIM）
    /// - Err(FileNotFound / UnsupportedFormat / MalformedInput)
    fn parse_path(&self, file_path: &Path) -> ImportResult<RawTable>;

    /// 解析内存中的文件内容（上传场景）
    fn parse_bytes(&self, content: &[u8]) -> ImportResult<RawTable>;
}

// ==========================================
// TemplateHandler Trait
// ==========================================
// 用途: 一个导入模板的全部规则（描述 + 行校验 + 行增强）
// 实现者: LanguageTemplate, QkzlmbaTemplate, GenericTemplate
pub trait TemplateHandler: Send + Sync {
    /// 模板描述（目标表、列映射、去重键、派生列规则）
    fn descriptor(&self) -> &TemplateDescriptor;

    /// 行增强：仅对已通过校验的行执行，纯函数，无 I/O
    fn enrich(&self, _row: &mut Row) {}
}
