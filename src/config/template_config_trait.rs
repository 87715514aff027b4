// ==========================================
// Excel2DB - 模板配置读取 Trait
// ==========================================
// 职责: 定义模板注册所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::{FieldValue, TemplateDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 内置模板的配置覆写
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateOverride {
    /// 空白模板下载文件名（不含扩展名）
    pub file_name: Option<String>,
    /// 字段 → 默认值（仅作用于空白列）
    pub defaults: HashMap<String, FieldValue>,
}

// ==========================================
// TemplateConfigReader Trait
// ==========================================
// 用途: 模板注册表构建时读取配置
// 实现者: ConfigManager（从 excel2db.json 读取）
pub trait TemplateConfigReader: Send + Sync {
    /// 某个模板的覆写（标识大小写不敏感）
    ///
    /// # 返回
    /// - None: 未配置，使用内置定义
    fn template_override(&self, template_id: &str) -> Option<TemplateOverride>;

    /// 配置文件中定义的额外模板
    fn custom_templates(&self) -> Vec<TemplateDescriptor>;

    /// 上传文件大小上限（字节）
    ///
    /// # 默认值
    /// - 10 MiB
    fn max_file_size(&self) -> u64;
}
