// ==========================================
// Excel2DB - 导入 API
// ==========================================
// 职责: 封装导入/预览/模板下载，供上层（HTTP、CLI）调用
// 约束: 导入流程为同步阻塞调用，在 tokio 阻塞线程池中执行
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::response::{import_success_message, ApiResponse};
use crate::domain::{ImportReport, Row};
use crate::importer::{ImportOrchestrator, ImportResult, TemplateGenerator};
use crate::repository::{ImportStorage, SqliteImportStorage};
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// 模板概要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSummary {
    pub id: String,
    pub display_name: String,
    pub table: String,
    pub columns: Vec<String>,
}

/// 空白模板文件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateFile {
    pub file_name: String,
    pub content: Vec<u8>,
}

/// 单个上传文件的导入请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRequest {
    pub template_id: String,
    pub file_name: String,
    pub content: Vec<u8>,
}

/// 导入API
pub struct ImportApi<S = SqliteImportStorage>
where
    S: ImportStorage + 'static,
{
    orchestrator: Arc<ImportOrchestrator<S>>,
}

impl<S> Clone for ImportApi<S>
where
    S: ImportStorage + 'static,
{
    fn clone(&self) -> Self {
        Self {
            orchestrator: Arc::clone(&self.orchestrator),
        }
    }
}

impl<S> ImportApi<S>
where
    S: ImportStorage + 'static,
{
    /// 创建新的ImportApi实例
    pub fn new(orchestrator: Arc<ImportOrchestrator<S>>) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &Arc<ImportOrchestrator<S>> {
        &self.orchestrator
    }

    // 在阻塞线程池中执行同步导入流程
    async fn run_blocking<T, F>(&self, f: F) -> ApiResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&ImportOrchestrator<S>) -> ImportResult<T> + Send + 'static,
    {
        let orchestrator = Arc::clone(&self.orchestrator);
        let result = tokio::task::spawn_blocking(move || f(&orchestrator))
            .await
            .map_err(|e| ApiError::InternalError(format!("导入任务异常退出: {}", e)))?;
        result.map_err(ApiError::from)
    }

    /// 导入上传文件
    ///
    /// # 参数
    /// - template_id: 模板标识
    /// - file_name: 原始文件名（用于判断格式）
    /// - content: 文件内容
    ///
    /// # 返回
    /// - Ok(ImportReport): 导入结果
    /// - Err(ApiError): 错误信息（导入已整体回滚）
    pub async fn import_upload(
        &self,
        template_id: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> ApiResult<ImportReport> {
        let template_id = template_id.to_string();
        let file_name = file_name.to_string();
        self.run_blocking(move |o| o.import_upload(&template_id, &file_name, &content))
            .await
    }

    /// 导入服务器本地文件
    pub async fn import_path(&self, template_id: &str, path: PathBuf) -> ApiResult<ImportReport> {
        let template_id = template_id.to_string();
        self.run_blocking(move |o| o.import_file(&template_id, &path))
            .await
    }

    /// 预览上传文件（不落库）
    pub async fn preview_upload(
        &self,
        template_id: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> ApiResult<Vec<Row>> {
        let template_id = template_id.to_string();
        let file_name = file_name.to_string();
        self.run_blocking(move |o| {
            o.preview_upload(&template_id, &file_name, &content)
                .map(|rows| rows.rows)
        })
        .await
    }

    /// 批量导入（各文件独立提交、互不影响；同一存储连接上依次执行）
    pub async fn batch_import(&self, requests: Vec<ImportRequest>) -> Vec<ApiResult<ImportReport>> {
        let total = requests.len();
        let tasks = requests.into_iter().map(|request| async move {
            self.import_upload(&request.template_id, &request.file_name, request.content)
                .await
        });
        let results = join_all(tasks).await;

        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            warn!(total = total, failed = failed, "批量导入存在失败文件");
        } else {
            info!(total = total, "批量导入完成");
        }
        results
    }

    /// 已注册模板
    pub fn list_templates(&self) -> Vec<TemplateSummary> {
        self.orchestrator
            .registry()
            .handlers()
            .map(|handler| {
                let descriptor = handler.descriptor();
                TemplateSummary {
                    id: descriptor.id.clone(),
                    display_name: descriptor.display_name.clone(),
                    table: descriptor.table.clone(),
                    columns: descriptor.sheet_labels(),
                }
            })
            .collect()
    }

    /// 模板期望的表头
    pub fn template_columns(&self, template_id: &str) -> ApiResult<Vec<String>> {
        Ok(TemplateGenerator::new(self.orchestrator.registry()).template_columns(template_id)?)
    }

    /// 生成空白模板
    pub fn template_file(&self, template_id: &str) -> ApiResult<TemplateFile> {
        let generator = TemplateGenerator::new(self.orchestrator.registry());
        Ok(TemplateFile {
            file_name: generator.file_name(template_id)?,
            content: generator.generate(template_id)?,
        })
    }
}

// ==========================================
// Excel2DbService - 对外服务接口（响应信封）
// ==========================================
// 用途: HTTP 适配层直接返回的响应
// 实现者: ImportApi
#[async_trait]
pub trait Excel2DbService: Send + Sync {
    /// 导入上传文件，data 为实际落库行数
    async fn import(
        &self,
        template_id: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> ApiResponse<usize>;

    /// 读取上传文件（不落库）
    async fn read(&self, template_id: &str, file_name: &str, content: Vec<u8>)
        -> ApiResponse<Vec<Row>>;

    /// 下载空白模板
    async fn template(&self, template_id: &str) -> ApiResponse<TemplateFile>;
}

#[async_trait]
impl<S> Excel2DbService for ImportApi<S>
where
    S: ImportStorage + 'static,
{
    async fn import(
        &self,
        template_id: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> ApiResponse<usize> {
        match self.import_upload(template_id, file_name, content).await {
            Ok(report) => {
                ApiResponse::success(import_success_message(report.imported), report.imported)
            }
            Err(err) => ApiResponse::error(&err),
        }
    }

    async fn read(
        &self,
        template_id: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> ApiResponse<Vec<Row>> {
        self.preview_upload(template_id, file_name, content).await.into()
    }

    async fn template(&self, template_id: &str) -> ApiResponse<TemplateFile> {
        self.template_file(template_id).into()
    }
}
