// ==========================================
// Excel2DB - API 层
// ==========================================
// 职责: 提供导入 API 接口，供 HTTP 适配层 / CLI 调用
// ==========================================

pub mod error;
pub mod import_api;
pub mod response;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use import_api::{Excel2DbService, ImportApi, ImportRequest, TemplateFile, TemplateSummary};
pub use response::{import_success_message, ApiResponse};
