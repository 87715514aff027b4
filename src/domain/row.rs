// ==========================================
// Excel2DB - 行数据领域模型
// ==========================================
// 职责: 原始行 / 校验后行集 / 带主键行集
// 流向: RawRow → Row(RowSet) → KeyedRowSet → 落库
// ==========================================

use crate::domain::template::{FieldValue, TemplateDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// 表格解析出的原始行（表头 → 单元格文本）
pub type RawRow = HashMap<String, String>;

// ==========================================
// RawTable - 原始表格
// ==========================================
/// 一份表格输入：表头 + 按文件顺序排列的数据行
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<RawRow>) -> Self {
        Self { headers, rows }
    }

    /// 由表头与按列排列的值构造（测试与 CLI 使用）
    pub fn from_records<H, R, C>(headers: &[H], records: R) -> Self
    where
        H: AsRef<str>,
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let headers: Vec<String> = headers.iter().map(|h| h.as_ref().to_string()).collect();
        let rows = records
            .into_iter()
            .map(|record| {
                headers
                    .iter()
                    .cloned()
                    .zip(record.into_iter().map(Into::into))
                    .collect::<RawRow>()
            })
            .collect();
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ==========================================
// Row - 校验后的行
// ==========================================
/// 字段名 → 值
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// 在输入中的行号（从 1 开始，不含表头）
    pub row_number: usize,
    pub fields: BTreeMap<String, FieldValue>,
}

impl Row {
    pub fn new(row_number: usize) -> Self {
        Self {
            row_number,
            fields: BTreeMap::new(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// 文本值（非文本或缺失返回 None）
    pub fn text(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(FieldValue::as_str)
    }

    pub fn set(&mut self, field: &str, value: impl Into<FieldValue>) {
        self.fields.insert(field.to_string(), value.into());
    }

    pub fn is_blank(&self, field: &str) -> bool {
        self.fields.get(field).map_or(true, FieldValue::is_blank)
    }

    /// 按模板列顺序取值（缺失列为 NULL）
    pub fn values_for(&self, template: &TemplateDescriptor) -> Vec<FieldValue> {
        template
            .columns
            .iter()
            .map(|c| self.fields.get(&c.field).cloned().unwrap_or(FieldValue::Null))
            .collect()
    }
}

// ==========================================
// RowOutcome - 单行校验结果
// ==========================================
/// 单行校验/转换结果（显式保留或丢弃，不以错误表达）
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Keep(Row),
    Drop { row_number: usize, reason: DropReason },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// 必填列为空
    MissingRequired(Vec<String>),
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropReason::MissingRequired(fields) => write!(f, "必填列为空: {}", fields.join(",")),
        }
    }
}

// ==========================================
// RowSet / KeyedRowSet
// ==========================================
/// 一次导入中通过校验并完成增强的行（保持输入顺序）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub rows: Vec<Row>,
    /// 被丢弃的行数
    pub skipped: usize,
}

impl RowSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// RowSet + 严格递增主键（按 RowSet 顺序分配）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyedRowSet {
    pub rows: Vec<(i64, Row)>,
}

impl KeyedRowSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_key(&self) -> Option<i64> {
        self.rows.first().map(|(k, _)| *k)
    }

    pub fn last_key(&self) -> Option<i64> {
        self.rows.last().map(|(k, _)| *k)
    }

    /// 转为落库参数：每行为 [key, 列值...]，与 `TemplateDescriptor::insert_columns` 对齐
    pub fn to_insert_values(&self, template: &TemplateDescriptor) -> Vec<Vec<FieldValue>> {
        self.rows
            .iter()
            .map(|(key, row)| {
                let mut values = Vec::with_capacity(template.columns.len() + 1);
                values.push(FieldValue::Integer(*key));
                values.extend(row.values_for(template));
                values
            })
            .collect()
    }
}
