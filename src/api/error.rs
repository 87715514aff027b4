// ==========================================
// Excel2DB - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换导入/存储错误为用户可读的错误消息
// 约定: 每个错误对应一个响应码
// - 400 调用方错误 / 409 当日备份已存在 / 413 文件过大 / 500 服务端错误
// ==========================================

use crate::importer::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 调用方错误
    // ==========================================
    #[error("未知的模板类型: {0}")]
    UnknownTemplate(String),

    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("文件过大: {0}")]
    PayloadTooLarge(String),

    // 同一模板当日已导入过（备份表已存在），需次日或清理备份后再导入
    #[error("导入冲突: {0}")]
    Conflict(String),

    // ==========================================
    // 导入错误（已回滚，可重试）
    // ==========================================
    #[error("导入失败: {0}")]
    ImportFailed(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 响应码
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::UnknownTemplate(_) | ApiError::InvalidInput(_) => "400",
            ApiError::Conflict(_) => "409",
            ApiError::PayloadTooLarge(_) => "413",
            _ => "500",
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::UnknownTemplate(id) => ApiError::UnknownTemplate(id),
            ImportError::FileTooLarge { .. } => ApiError::PayloadTooLarge(err.to_string()),
            ImportError::BackupExists(_) => ApiError::Conflict(err.to_string()),
            e if e.is_client_error() => ApiError::InvalidInput(e.to_string()),
            ImportError::PersistenceError(repo_err) => ApiError::from(repo_err),
            ImportError::Other(e) => ApiError::Other(e),
            e if e.is_retryable() => ApiError::ImportFailed(e.to_string()),
            e => ApiError::InternalError(e.to_string()),
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::Other(e) => ApiError::Other(e),
            other => ApiError::DatabaseError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_error_conversion() {
        let api_err: ApiError = ImportError::UnknownTemplate("bogus".to_string()).into();
        assert_eq!(api_err.code(), "400");
        assert!(api_err.to_string().contains("bogus"));

        let api_err: ApiError = ImportError::FileTooLarge { size: 20, limit: 10 }.into();
        assert_eq!(api_err.code(), "413");

        let api_err: ApiError = ImportError::MalformedInput("缺少表头".to_string()).into();
        assert!(matches!(api_err, ApiError::InvalidInput(_)));
    }

    #[test]
    fn test_storage_errors_are_server_errors() {
        let api_err: ApiError =
            ImportError::from(RepositoryError::DatabaseQueryError("disk I/O".to_string())).into();
        assert!(matches!(api_err, ApiError::DatabaseError(_)));
        assert_eq!(api_err.code(), "500");

    }

    #[test]
    fn test_backup_exists_is_conflict() {
        let api_err: ApiError = ImportError::BackupExists("t_20250101_back_up".to_string()).into();
        assert!(matches!(api_err, ApiError::Conflict(_)));
        assert_eq!(api_err.code(), "409");
        assert!(api_err.to_string().contains("t_20250101_back_up"));
    }
}
