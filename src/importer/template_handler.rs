// ==========================================
// Excel2DB - 内置模板
// ==========================================
// 职责: language / qkzlmba 两个内置模板 + 配置定义的通用模板
// ==========================================

use crate::domain::{ColumnSpec, DerivedColumnRule, FieldValue, Row, TemplateDescriptor};
use crate::importer::importer_trait::TemplateHandler;
use crate::importer::transliteration::pinyin_initials;

/// 社区/区域编码缺省值
pub const DEFAULT_AREA_CODE: &str = "-2";

// ==========================================
// LanguageTemplate - 语言模板 (zd_language)
// ==========================================
pub struct LanguageTemplate {
    descriptor: TemplateDescriptor,
}

impl LanguageTemplate {
    pub const ID: &'static str = "language";

    pub fn builtin_descriptor() -> TemplateDescriptor {
        TemplateDescriptor {
            id: Self::ID.to_string(),
            display_name: "语言模板".to_string(),
            table: "zd_language".to_string(),
            key_column: "id".to_string(),
            columns: vec![
                ColumnSpec::required("中文", "chinese"),
                ColumnSpec::required("其他语言", "other"),
                ColumnSpec::hidden("sqbm").with_default(DEFAULT_AREA_CODE),
            ],
            identity: vec!["chinese".to_string(), "other".to_string()],
            derived: vec![DerivedColumnRule::FillBlank {
                column: "sqbm".to_string(),
                value: FieldValue::text(DEFAULT_AREA_CODE),
            }],
            file_name: Some("language_template".to_string()),
        }
    }

    pub fn new() -> Self {
        Self::with_descriptor(Self::builtin_descriptor())
    }

    /// 使用覆写后的描述（配置中修改了文件名/默认值）
    pub fn with_descriptor(descriptor: TemplateDescriptor) -> Self {
        Self { descriptor }
    }
}

impl Default for LanguageTemplate {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateHandler for LanguageTemplate {
    fn descriptor(&self) -> &TemplateDescriptor {
        &self.descriptor
    }
}

// ==========================================
// QkzlmbaTemplate - 全科诊疗模板 (zd_qkzlmba)
// ==========================================
pub struct QkzlmbaTemplate {
    descriptor: TemplateDescriptor,
}

impl QkzlmbaTemplate {
    pub const ID: &'static str = "qkzlmba";

    pub fn builtin_descriptor() -> TemplateDescriptor {
        TemplateDescriptor {
            id: Self::ID.to_string(),
            display_name: "全科诊疗模板".to_string(),
            table: "zd_qkzlmba".to_string(),
            key_column: "sysid".to_string(),
            columns: vec![
                ColumnSpec::hidden("dh"),
                ColumnSpec::required("名称", "mc"),
                ColumnSpec::hidden("state").with_default(1),
                ColumnSpec::required("字典类型", "zdlx"),
                ColumnSpec::required("编码", "bm"),
                ColumnSpec::hidden("f_cqjkwt").with_default(0),
                ColumnSpec::optional("是否传染病", "fcrb").with_default("1"),
                ColumnSpec::optional("备注", "remark"),
                ColumnSpec::hidden("qybm"),
            ],
            identity: vec!["zdlx".to_string(), "bm".to_string()],
            derived: vec![
                DerivedColumnRule::Lookup {
                    column: "fcrb".to_string(),
                    source: "fcrb".to_string(),
                    cases: ["是", "Y", "TRUE"]
                        .iter()
                        .map(|v| (v.to_string(), FieldValue::text("1")))
                        .chain(
                            ["否", "N", "FALSE"]
                                .iter()
                                .map(|v| (v.to_string(), FieldValue::text("0"))),
                        )
                        .collect(),
                    otherwise: None,
                },
                DerivedColumnRule::FillBlank {
                    column: "qybm".to_string(),
                    value: FieldValue::text(DEFAULT_AREA_CODE),
                },
            ],
            file_name: Some("qkzlmba_template".to_string()),
        }
    }

    pub fn new() -> Self {
        Self::with_descriptor(Self::builtin_descriptor())
    }

    pub fn with_descriptor(descriptor: TemplateDescriptor) -> Self {
        Self { descriptor }
    }
}

impl Default for QkzlmbaTemplate {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateHandler for QkzlmbaTemplate {
    fn descriptor(&self) -> &TemplateDescriptor {
        &self.descriptor
    }

    /// 代号 = 名称拼音首字母
    fn enrich(&self, row: &mut Row) {
        if let Some(mc) = row.text("mc") {
            let dh = pinyin_initials(mc);
            row.set("dh", dh.as_str());
        }
    }
}

// ==========================================
// GenericTemplate - 配置定义的模板（无行增强）
// ==========================================
pub struct GenericTemplate {
    descriptor: TemplateDescriptor,
}

impl GenericTemplate {
    pub fn new(descriptor: TemplateDescriptor) -> Self {
        Self { descriptor }
    }
}

impl TemplateHandler for GenericTemplate {
    fn descriptor(&self) -> &TemplateDescriptor {
        &self.descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_descriptors_are_consistent() {
        assert!(LanguageTemplate::builtin_descriptor().check().is_ok());
        assert!(QkzlmbaTemplate::builtin_descriptor().check().is_ok());
    }

    #[test]
    fn test_qkzlmba_enrich_sets_code() {
        let handler = QkzlmbaTemplate::new();
        let mut row = Row::new(1);
        row.set("mc", "感冒");
        handler.enrich(&mut row);
        assert_eq!(row.text("dh"), Some("GM"));
    }

    #[test]
    fn test_language_sheet_labels() {
        assert_eq!(
            LanguageTemplate::builtin_descriptor().sheet_labels(),
            vec!["中文", "其他语言"]
        );
    }
}
