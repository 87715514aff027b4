// ==========================================
// Excel2DB - 应用状态
// ==========================================
// 职责: 启动时构建共享实例（配置 → 模板注册表 → 存储 → 编排器 → API）
// 约束: 模板注册表构建完成后只读，以 Arc 显式传递，不使用全局单例
// ==========================================

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::api::ImportApi;
use crate::config::{ConfigManager, TemplateConfigReader};
use crate::db::open_sqlite_connection;
use crate::importer::{ImportOrchestrator, TemplateRegistry};
use crate::repository::SqliteImportStorage;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "EXCEL2DB_DB_PATH";

/// 应用状态
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 配置
    pub config: Arc<ConfigManager>,

    /// 模板注册表
    pub registry: Arc<TemplateRegistry>,

    /// 导入API
    pub import_api: Arc<ImportApi>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    /// - config: 已加载的配置
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误（模板定义错误、数据库无法打开）
    pub fn new(db_path: String, config: ConfigManager) -> Result<Self, String> {
        tracing::info!(db_path = %db_path, "初始化AppState");

        let registry = TemplateRegistry::from_config(&config)
            .map_err(|e| format!("模板注册失败: {}", e))?;
        let registry = Arc::new(registry);

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        let storage = SqliteImportStorage::from_connection(Arc::new(Mutex::new(conn)))
            .map_err(|e| format!("存储初始化失败: {}", e))?;

        let orchestrator = ImportOrchestrator::new(Arc::clone(&registry), storage)
            .with_max_file_size(config.max_file_size());
        let import_api = Arc::new(ImportApi::new(Arc::new(orchestrator)));

        tracing::info!(templates = registry.len(), "AppState初始化完成");

        Ok(Self {
            db_path,
            config: Arc::new(config),
            registry,
            import_api,
        })
    }

    /// 使用默认配置文件与默认数据库路径创建
    ///
    /// 数据库路径优先级: EXCEL2DB_DB_PATH > 配置文件 db_path > 默认数据目录
    pub fn from_default() -> Result<Self, String> {
        let config = ConfigManager::load_default().map_err(|e| e.to_string())?;
        let db_path = match std::env::var(DB_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => path.trim().to_string(),
            _ => config
                .db_path()
                .map(str::to_string)
                .unwrap_or_else(get_default_db_path),
        };
        Self::new(db_path, config)
    }
}

/// 获取默认数据库路径
pub fn get_default_db_path() -> String {
    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./excel2db.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("excel2db");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("excel2db.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registers_builtin_templates() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("state.db").to_string_lossy().to_string();

        let state = AppState::new(db_path, ConfigManager::default()).unwrap();
        assert!(state.registry.contains("language"));
        assert!(state.registry.contains("qkzlmba"));
        assert_eq!(state.import_api.list_templates().len(), 2);
    }
}
