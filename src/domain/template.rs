// ==========================================
// Excel2DB - 模板描述领域模型
// ==========================================
// 职责: 描述一个导入模板（目标表、列映射、必填列、去重键、派生列规则）
// 红线: 模板在进程启动时注册，注册后不可变
// ==========================================

use rusqlite::types::{ToSql, ToSqlOutput, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ==========================================
// FieldValue - 字段值
// ==========================================
/// 单元格/字段取值
///
/// 表格解析出的值一律为 `Text`；`Integer` 仅来自模板默认值（如 `state = 1`）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Text(String),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    /// 空值或纯空白文本
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Integer(_) => false,
            FieldValue::Text(s) => s.trim().is_empty(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "NULL"),
            FieldValue::Integer(v) => write!(f, "{}", v),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            FieldValue::Null => ToSqlOutput::Owned(Value::Null),
            FieldValue::Integer(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            FieldValue::Text(s) => ToSqlOutput::from(s.as_str()),
        })
    }
}

// ==========================================
// ColumnSpec - 列定义
// ==========================================
/// 目标表的一列
///
/// - `label` 为表格表头名；`None` 表示该列不出现在表格中（由默认值或派生填充）
/// - `required` 为真时，该列为空的行会被丢弃
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub field: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<FieldValue>,
}

impl ColumnSpec {
    /// 表格中的必填列
    pub fn required(label: &str, field: &str) -> Self {
        Self {
            field: field.to_string(),
            label: Some(label.to_string()),
            required: true,
            default: None,
        }
    }

    /// 表格中的可选列
    pub fn optional(label: &str, field: &str) -> Self {
        Self {
            field: field.to_string(),
            label: Some(label.to_string()),
            required: false,
            default: None,
        }
    }

    /// 不出现在表格中的列
    pub fn hidden(field: &str) -> Self {
        Self {
            field: field.to_string(),
            label: None,
            required: false,
            default: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<FieldValue>) -> Self {
        self.default = Some(value.into());
        self
    }
}

// ==========================================
// DerivedColumnRule - 派生列规则
// ==========================================
/// 导入后在整张表上执行的派生列更新（以数据表达，不含代码）
///
/// 两种规则都是幂等的：执行两次与执行一次的表状态一致。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DerivedColumnRule {
    /// 目标列为空（NULL 或空白）时填充常量
    FillBlank { column: String, value: FieldValue },

    /// 按来源列取值映射目标列（去首尾空白，ASCII 不区分大小写）；
    /// 未命中时取 `otherwise`，`otherwise` 为空则保留原值
    Lookup {
        column: String,
        source: String,
        cases: Vec<(String, FieldValue)>,
        #[serde(default)]
        otherwise: Option<FieldValue>,
    },
}

impl DerivedColumnRule {
    pub fn column(&self) -> &str {
        match self {
            DerivedColumnRule::FillBlank { column, .. } => column,
            DerivedColumnRule::Lookup { column, .. } => column,
        }
    }
}

// ==========================================
// TemplateDescriptor - 模板描述
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDescriptor {
    /// 模板标识（稳定字符串键，如 "language"）
    pub id: String,
    /// 展示名称
    pub display_name: String,
    /// 目标表
    pub table: String,
    /// 自增主键列
    pub key_column: String,
    /// 列定义（顺序即落库列顺序）
    pub columns: Vec<ColumnSpec>,
    /// 去重键（组合唯一）
    #[serde(default)]
    pub identity: Vec<String>,
    /// 派生列规则（按顺序执行）
    #[serde(default)]
    pub derived: Vec<DerivedColumnRule>,
    /// 空白模板下载文件名（不含扩展名）
    #[serde(default)]
    pub file_name: Option<String>,
}

impl TemplateDescriptor {
    /// 表格中出现的列（按定义顺序）
    pub fn sheet_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().filter(|c| c.label.is_some())
    }

    /// 表格表头（生成空白模板用）
    pub fn sheet_labels(&self) -> Vec<String> {
        self.sheet_columns()
            .filter_map(|c| c.label.clone())
            .collect()
    }

    /// 必填列
    pub fn required_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().filter(|c| c.required)
    }

    /// 落库列（主键列在前）
    pub fn insert_columns(&self) -> Vec<&str> {
        std::iter::once(self.key_column.as_str())
            .chain(self.columns.iter().map(|c| c.field.as_str()))
            .collect()
    }

    pub fn column(&self, field: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.field == field)
    }

    /// 空白模板文件名（默认 `{id}_template`）
    pub fn template_file_name(&self) -> String {
        self.file_name
            .clone()
            .unwrap_or_else(|| format!("{}_template", self.id))
    }

    /// 应用配置覆写（文件名 / 列默认值）
    pub fn apply_overrides(
        &mut self,
        file_name: Option<&str>,
        defaults: &HashMap<String, FieldValue>,
    ) {
        if let Some(name) = file_name {
            self.file_name = Some(name.to_string());
        }
        for column in &mut self.columns {
            if let Some(value) = defaults.get(&column.field) {
                column.default = Some(value.clone());
            }
        }
    }

    /// 校验模板自身的一致性
    ///
    /// # 返回
    /// - Ok(()): 模板可用
    /// - Err(String): 第一个不一致之处
    pub fn check(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("模板标识为空".to_string());
        }
        for name in std::iter::once(&self.table)
            .chain(std::iter::once(&self.key_column))
            .chain(self.columns.iter().map(|c| &c.field))
        {
            if !is_plain_identifier(name) {
                return Err(format!("非法标识符: {}", name));
            }
        }
        if self.columns.iter().any(|c| c.field == self.key_column) {
            return Err(format!("主键列 {} 不能出现在列定义中", self.key_column));
        }
        if self.columns.iter().any(|c| c.required && c.label.is_none()) {
            return Err("必填列必须出现在表格中".to_string());
        }
        let mut seen = std::collections::HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.field.as_str()) {
                return Err(format!("列 {} 重复定义", column.field));
            }
        }
        for field in &self.identity {
            if self.column(field).is_none() {
                return Err(format!("去重键 {} 不在列定义中", field));
            }
        }
        for rule in &self.derived {
            if self.column(rule.column()).is_none() {
                return Err(format!("派生列 {} 不在列定义中", rule.column()));
            }
            if let DerivedColumnRule::Lookup { source, .. } = rule {
                if self.column(source).is_none() {
                    return Err(format!("派生来源列 {} 不在列定义中", source));
                }
            }
        }
        Ok(())
    }
}

/// 仅允许 `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
