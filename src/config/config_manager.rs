// ==========================================
// Excel2DB - 配置管理器
// ==========================================
// 职责: 配置加载、查询
// 存储: excel2db.json（不存在时使用默认值）
// 覆写: 环境变量 EXCEL2DB_CONFIG_PATH 指定配置文件位置
// ==========================================

use crate::config::template_config_trait::{TemplateConfigReader, TemplateOverride};
use crate::domain::TemplateDescriptor;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::DEFAULT_MAX_FILE_SIZE;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// 配置文件名
pub const CONFIG_FILE_NAME: &str = "excel2db.json";

/// 配置文件路径环境变量
pub const CONFIG_PATH_ENV: &str = "EXCEL2DB_CONFIG_PATH";

// ==========================================
// Excel2DbConfig - 配置文件内容
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Excel2DbConfig {
    /// 数据库文件路径（None: 使用默认数据目录）
    pub db_path: Option<String>,
    /// 上传文件大小上限（字节）
    pub max_file_size: u64,
    /// 内置模板覆写（模板标识 → 覆写）
    pub templates: HashMap<String, TemplateOverride>,
    /// 额外模板
    pub custom_templates: Vec<TemplateDescriptor>,
}

impl Default for Excel2DbConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            templates: HashMap::new(),
            custom_templates: Vec::new(),
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ConfigManager {
    config: Excel2DbConfig,
}

impl ConfigManager {
    pub fn from_config(config: Excel2DbConfig) -> ImportResult<Self> {
        if config.max_file_size == 0 {
            return Err(ImportError::ConfigReadError {
                key: config_keys::MAX_FILE_SIZE.to_string(),
                message: "必须大于 0".to_string(),
            });
        }
        Ok(Self { config })
    }

    /// 从 JSON 字符串加载
    pub fn from_json(content: &str) -> ImportResult<Self> {
        let config: Excel2DbConfig =
            serde_json::from_str(content).map_err(|e| ImportError::ConfigReadError {
                key: CONFIG_FILE_NAME.to_string(),
                message: e.to_string(),
            })?;
        Self::from_config(config)
    }

    /// 从文件加载
    ///
    /// # 返回
    /// - 文件不存在: 默认配置
    /// - 文件存在但无法解析: Err(ConfigReadError)
    pub fn load<P: AsRef<Path>>(path: P) -> ImportResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "配置文件不存在，使用默认配置");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ImportError::ConfigReadError {
            key: path.display().to_string(),
            message: e.to_string(),
        })?;
        let manager = Self::from_json(&content)?;
        info!(
            path = %path.display(),
            custom_templates = manager.config.custom_templates.len(),
            "配置加载完成"
        );
        Ok(manager)
    }

    /// 从默认位置加载
    pub fn load_default() -> ImportResult<Self> {
        Self::load(default_config_path())
    }

    pub fn config(&self) -> &Excel2DbConfig {
        &self.config
    }

    pub fn db_path(&self) -> Option<&str> {
        self.config.db_path.as_deref()
    }
}

impl TemplateConfigReader for ConfigManager {
    fn template_override(&self, template_id: &str) -> Option<TemplateOverride> {
        let wanted = template_id.trim().to_lowercase();
        self.config
            .templates
            .iter()
            .find(|(id, _)| id.trim().to_lowercase() == wanted)
            .map(|(_, o)| o.clone())
    }

    fn custom_templates(&self) -> Vec<TemplateDescriptor> {
        self.config.custom_templates.clone()
    }

    fn max_file_size(&self) -> u64 {
        self.config.max_file_size
    }
}

/// 默认配置文件路径
///
/// 优先级: EXCEL2DB_CONFIG_PATH > {系统配置目录}/excel2db/excel2db.json > ./excel2db.json
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = path.trim();
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    match dirs::config_dir() {
        Some(dir) => dir.join("excel2db").join(CONFIG_FILE_NAME),
        None => {
            warn!("无法确定系统配置目录，使用当前目录");
            PathBuf::from(CONFIG_FILE_NAME)
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    pub const MAX_FILE_SIZE: &str = "max_file_size";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FieldValue;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::load(dir.path().join("absent.json")).unwrap();
        assert_eq!(manager.max_file_size(), DEFAULT_MAX_FILE_SIZE);
        assert!(manager.custom_templates().is_empty());
        assert!(manager.db_path().is_none());
    }

    #[test]
    fn test_load_overrides_and_custom_templates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "db_path": "/tmp/x.db",
                "max_file_size": 2048,
                "templates": {{
                    "QKZLMBA": {{ "file_name": "诊疗模板", "defaults": {{ "qybm": "330100" }} }}
                }},
                "custom_templates": [{{
                    "id": "dept",
                    "display_name": "科室",
                    "table": "zd_dept",
                    "key_column": "id",
                    "columns": [
                        {{ "field": "mc", "label": "名称", "required": true }}
                    ],
                    "identity": ["mc"]
                }}]
            }}"#
        )
        .unwrap();

        let manager = ConfigManager::load(file.path()).unwrap();
        assert_eq!(manager.db_path(), Some("/tmp/x.db"));
        assert_eq!(manager.max_file_size(), 2048);

        let o = manager.template_override("qkzlmba").unwrap();
        assert_eq!(o.file_name.as_deref(), Some("诊疗模板"));
        assert_eq!(o.defaults.get("qybm"), Some(&FieldValue::text("330100")));

        let custom = manager.custom_templates();
        assert_eq!(custom.len(), 1);
        assert_eq!(custom[0].table, "zd_dept");
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        assert!(matches!(
            ConfigManager::from_json("{ not json"),
            Err(ImportError::ConfigReadError { .. })
        ));
    }

    #[test]
    fn test_zero_max_file_size_rejected() {
        assert!(matches!(
            ConfigManager::from_json(r#"{ "max_file_size": 0 }"#),
            Err(ImportError::ConfigReadError { .. })
        ));
    }
}
