// ==========================================
// Excel2DB - 应用层
// ==========================================
// 职责: 启动装配，连接配置、存储与 API
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState, DB_PATH_ENV};
