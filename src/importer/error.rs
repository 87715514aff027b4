// ==========================================
// Excel2DB - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约定:
// - 单行校验不通过不是错误（RowOutcome::Drop），这里只有整体失败
// - 存储类错误一律导致整个事务回滚，可直接重试
// ==========================================

use crate::repository::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 模板相关错误 =====
    #[error("未知的模板类型: {0}")]
    UnknownTemplate(String),

    #[error("模板定义错误 ({template}): {message}")]
    InvalidTemplate { template: String, message: String },

    // ===== 文件/输入相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    #[error("文件大小超过限制: {size} 字节（上限 {limit} 字节）")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("输入无法解析: {0}")]
    MalformedInput(String),

    // ===== 存储相关错误 =====
    #[error("主键分配失败: {0}")]
    AllocationError(String),

    #[error("备份表已存在: {0}（同一天只保留首次导入前的备份）")]
    BackupExists(String),

    #[error("备份失败 (表 {table}): {message}")]
    BackupError { table: String, message: String },

    #[error("数据落库失败: {0}")]
    PersistenceError(#[source] RepositoryError),

    // ===== 模板生成错误 =====
    #[error("模板生成失败: {0}")]
    TemplateGenerationError(String),

    // ===== 配置错误 =====
    #[error("配置读取失败 (key: {key}): {message}")]
    ConfigReadError { key: String, message: String },

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 是否为调用方错误（模板/文件/输入问题，重试无意义）
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ImportError::UnknownTemplate(_)
                | ImportError::FileNotFound(_)
                | ImportError::UnsupportedFormat(_)
                | ImportError::FileTooLarge { .. }
                | ImportError::MalformedInput(_)
        )
    }

    /// 是否可直接重试（存储类错误，目标表未被修改）
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ImportError::AllocationError(_)
                | ImportError::BackupError { .. }
                | ImportError::PersistenceError(_)
        )
    }
}

// 实现 From<RepositoryError>
impl From<RepositoryError> for ImportError {
    fn from(err: RepositoryError) -> Self {
        ImportError::PersistenceError(err)
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        ImportError::PersistenceError(RepositoryError::from(err))
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::MalformedInput(format!("CSV 解析失败: {}", err))
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::MalformedInput(format!("Excel 解析失败: {}", err))
    }
}

// 实现 From<rust_xlsxwriter::XlsxError>
impl From<rust_xlsxwriter::XlsxError> for ImportError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        ImportError::TemplateGenerationError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(ImportError::UnknownTemplate("bogus".to_string()).is_client_error());
        assert!(!ImportError::UnknownTemplate("bogus".to_string()).is_retryable());

        let storage = ImportError::from(RepositoryError::DatabaseQueryError("x".to_string()));
        assert!(storage.is_retryable());
        assert!(!storage.is_client_error());
    }

    #[test]
    fn test_unknown_template_names_identifier() {
        let err = ImportError::UnknownTemplate("bogus".to_string());
        assert!(err.to_string().contains("bogus"));
    }
}
