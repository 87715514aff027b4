// ==========================================
// Excel2DB - 行校验与转换
// ==========================================
// 职责: 原始行 → (增强后的行, 保留) 或 (丢弃)
// 流程: 列映射 → 必填校验 → 模板附加校验 → 默认值填充 → 行增强
// 约束: 纯函数，无 I/O；不通过校验的行静默丢弃（只计数、记日志），不报错
// ==========================================

use crate::domain::{DropReason, FieldValue, RawRow, RawTable, Row, RowOutcome, RowSet};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::TemplateHandler;
use tracing::{debug, info};

pub struct RowValidator<'a> {
    handler: &'a dyn TemplateHandler,
}

impl<'a> RowValidator<'a> {
    pub fn new(handler: &'a dyn TemplateHandler) -> Self {
        Self { handler }
    }

    /// 校验表头包含全部必填列
    ///
    /// 缺少必填列时任何一行都不可能通过校验，视为输入格式错误。
    pub fn check_headers(&self, table: &RawTable) -> ImportResult<()> {
        let missing: Vec<&str> = self
            .handler
            .descriptor()
            .required_columns()
            .filter_map(|c| c.label.as_deref())
            .filter(|label| !table.headers.iter().any(|h| h == label))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ImportError::MalformedInput(format!(
                "表头缺少必填列: {}",
                missing.join(", ")
            )))
        }
    }

    /// 处理单行
    pub fn process_row(&self, raw: &RawRow, row_number: usize) -> RowOutcome {
        let template = self.handler.descriptor();

        // 列映射（表头 → 字段）
        let mut row = Row::new(row_number);
        for column in template.sheet_columns() {
            let value = column
                .label
                .as_ref()
                .and_then(|label| raw.get(label))
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(FieldValue::text)
                .unwrap_or(FieldValue::Null);
            row.fields.insert(column.field.clone(), value);
        }

        // 必填校验
        let missing: Vec<String> = template
            .required_columns()
            .filter(|c| row.is_blank(&c.field))
            .map(|c| c.field.clone())
            .collect();
        if !missing.is_empty() {
            return RowOutcome::Drop {
                row_number,
                reason: DropReason::MissingRequired(missing),
            };
        }

        // 默认值填充（仅空白列）
        for column in &template.columns {
            if let Some(default) = &column.default {
                if row.is_blank(&column.field) {
                    row.fields.insert(column.field.clone(), default.clone());
                }
            }
        }

        // 行增强
        self.handler.enrich(&mut row);

        RowOutcome::Keep(row)
    }

    /// 处理整张表（保持输入顺序）
    pub fn process(&self, table: &RawTable) -> ImportResult<RowSet> {
        self.check_headers(table)?;

        let mut row_set = RowSet::default();
        for (idx, raw) in table.rows.iter().enumerate() {
            match self.process_row(raw, idx + 1) {
                RowOutcome::Keep(row) => row_set.rows.push(row),
                RowOutcome::Drop { row_number, reason } => {
                    debug!(row_number = row_number, reason = %reason, "跳过无效数据");
                    row_set.skipped += 1;
                }
            }
        }

        info!(
            template_id = %self.handler.descriptor().id,
            total = table.len(),
            valid = row_set.len(),
            skipped = row_set.skipped,
            "行校验完成"
        );
        Ok(row_set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::template_handler::{LanguageTemplate, QkzlmbaTemplate};

    #[test]
    fn test_blank_required_field_is_dropped() {
        let handler = LanguageTemplate::new();
        let validator = RowValidator::new(&handler);
        let table = RawTable::from_records(
            &["中文", "其他语言"],
            vec![vec!["你好", "hello"], vec!["再见", "  "]],
        );

        let rows = validator.process(&table).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.skipped, 1);
        assert_eq!(rows.rows[0].row_number, 1);
    }

    #[test]
    fn test_defaults_fill_untouched_columns() {
        let handler = LanguageTemplate::new();
        let validator = RowValidator::new(&handler);
        let mut raw = RawRow::new();
        raw.insert("中文".to_string(), "你好".to_string());
        raw.insert("其他语言".to_string(), "hello".to_string());

        match validator.process_row(&raw, 1) {
            RowOutcome::Keep(row) => assert_eq!(row.text("sqbm"), Some("-2")),
            other => panic!("row should be kept: {:?}", other),
        }
    }

    #[test]
    fn test_enrich_runs_only_on_valid_rows() {
        let handler = QkzlmbaTemplate::new();
        let validator = RowValidator::new(&handler);
        let table = RawTable::from_records(
            &["名称", "字典类型", "编码", "是否传染病", "备注"],
            vec![
                vec!["感冒", "ICD", "J00", "", ""],
                vec!["肺炎", "", "J18", "是", ""],
            ],
        );

        let rows = validator.process(&table).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows.rows[0];
        assert_eq!(row.text("dh"), Some("GM"));
        assert_eq!(row.text("fcrb"), Some("1"));
        assert_eq!(row.get("state"), Some(&FieldValue::Integer(1)));
        assert_eq!(row.get("remark"), Some(&FieldValue::Null));
    }

    #[test]
    fn test_missing_required_header_is_malformed() {
        let handler = LanguageTemplate::new();
        let validator = RowValidator::new(&handler);
        let table = RawTable::from_records(&["中文"], vec![vec!["你好"]]);

        assert!(matches!(
            validator.process(&table),
            Err(ImportError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_output_is_deterministic() {
        let handler = QkzlmbaTemplate::new();
        let validator = RowValidator::new(&handler);
        let mut raw = RawRow::new();
        raw.insert("名称".to_string(), "感冒".to_string());
        raw.insert("字典类型".to_string(), "ICD".to_string());
        raw.insert("编码".to_string(), "J00".to_string());

        assert_eq!(validator.process_row(&raw, 3), validator.process_row(&raw, 3));
    }
}
