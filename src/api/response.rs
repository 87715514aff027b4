// ==========================================
// Excel2DB - API 响应信封
// ==========================================
// 格式: { code, msg, data }
// 响应码: "200" 成功 / "400" 调用方错误 / "409" 当日备份已存在 / "413" 文件过大 / "500" 服务端错误
// ==========================================

use crate::api::error::ApiError;
use serde::{Deserialize, Serialize};

pub const SUCCESS_CODE: &str = "200";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: String,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(msg: impl Into<String>, data: T) -> Self {
        Self {
            code: SUCCESS_CODE.to_string(),
            msg: msg.into(),
            data: Some(data),
        }
    }

    pub fn error(err: &ApiError) -> Self {
        Self {
            code: err.code().to_string(),
            msg: err.to_string(),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }
}

impl<T> From<Result<T, ApiError>> for ApiResponse<T> {
    fn from(result: Result<T, ApiError>) -> Self {
        match result {
            Ok(data) => Self::success("成功", data),
            Err(err) => Self::error(&err),
        }
    }
}

/// 导入成功提示
pub fn import_success_message(imported: usize) -> String {
    format!("成功导入 {} 条数据", imported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope() {
        let response = ApiResponse::success(import_success_message(4), 4usize);
        assert!(response.is_success());
        assert_eq!(response.msg, "成功导入 4 条数据");

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["code"], "200");
        assert_eq!(json["data"], 4);
    }

    #[test]
    fn test_error_envelope() {
        let response: ApiResponse<()> =
            ApiResponse::error(&ApiError::UnknownTemplate("bogus".to_string()));
        assert_eq!(response.code, "400");
        assert!(response.msg.contains("bogus"));
        assert!(response.data.is_none());

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("data").is_none());
    }
}
