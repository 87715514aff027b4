// ==========================================
// Excel2DB - 配置层
// ==========================================
// 职责: 配置文件加载，模板覆写与额外模板定义
// 存储: excel2db.json
// ==========================================

pub mod config_manager;
pub mod template_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, default_config_path, ConfigManager, Excel2DbConfig};
pub use template_config_trait::{TemplateConfigReader, TemplateOverride};
