// ==========================================
// Excel2DB - 导入编排
// ==========================================
// 流程: 查模板 → 解析+校验（无存储） → [事务: 备份 → 分配主键 → 落库 → 规整] → 提交
// 约束:
// - 未知模板 / 输入无法解析: 在开启事务之前失败，不产生任何存储操作
// - 事务内任一步失败: 整体回滚（包括备份表），目标表保持调用前状态
// - 同一模板的导入串行执行（模板级互斥锁 + IMMEDIATE 事务）
// ==========================================

use crate::domain::{ImportReport, ImportStage, RawTable, RowSet};
use crate::importer::backup_manager::BackupManager;
use crate::importer::batch_loader::BatchLoader;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{check_file, UniversalFileParser, DEFAULT_MAX_FILE_SIZE};
use crate::importer::post_load_normalizer::PostLoadNormalizer;
use crate::importer::row_validator::RowValidator;
use crate::importer::sequence_allocator::SequenceAllocator;
use crate::importer::template_registry::TemplateRegistry;
use crate::repository::ImportStorage;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

// ==========================================
// ImportOrchestrator - 导入编排器
// ==========================================
pub struct ImportOrchestrator<S>
where
    S: ImportStorage,
{
    // 模板注册表（启动时构建，只读）
    registry: Arc<TemplateRegistry>,

    // 存储（事务边界）
    storage: S,

    file_parser: UniversalFileParser,
    max_file_size: u64,

    // 模板级互斥锁
    template_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S> ImportOrchestrator<S>
where
    S: ImportStorage,
{
    /// 创建新的 ImportOrchestrator 实例
    ///
    /// # 参数
    /// - registry: 模板注册表
    /// - storage: 导入存储
    pub fn new(registry: Arc<TemplateRegistry>, storage: S) -> Self {
        Self {
            registry,
            storage,
            file_parser: UniversalFileParser,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            template_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn registry(&self) -> &Arc<TemplateRegistry> {
        &self.registry
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// 预览：解析 + 校验 + 增强，不访问存储
    pub fn preview(&self, template_id: &str, table: &RawTable) -> ImportResult<RowSet> {
        let handler = self.registry.lookup(template_id)?;
        RowValidator::new(handler.as_ref()).process(table)
    }

    /// 导入磁盘文件
    pub fn import_file<P: AsRef<Path>>(
        &self,
        template_id: &str,
        file_path: P,
    ) -> ImportResult<ImportReport> {
        let path = file_path.as_ref();
        // 先确认模板存在，再读文件
        self.registry.lookup(template_id)?;
        check_file(path, self.max_file_size)?;
        let table = self.file_parser.parse(path)?;
        self.import_table(template_id, table)
    }

    /// 导入上传内容
    pub fn import_upload(
        &self,
        template_id: &str,
        file_name: &str,
        content: &[u8],
    ) -> ImportResult<ImportReport> {
        self.registry.lookup(template_id)?;
        self.check_upload_size(content)?;
        let table = self.file_parser.parse_upload(file_name, content)?;
        self.import_table(template_id, table)
    }

    /// 预览上传内容，不访问存储
    pub fn preview_upload(
        &self,
        template_id: &str,
        file_name: &str,
        content: &[u8],
    ) -> ImportResult<RowSet> {
        self.registry.lookup(template_id)?;
        self.check_upload_size(content)?;
        let table = self.file_parser.parse_upload(file_name, content)?;
        self.preview(template_id, &table)
    }

    fn check_upload_size(&self, content: &[u8]) -> ImportResult<()> {
        let size = content.len() as u64;
        if size > self.max_file_size {
            return Err(ImportError::FileTooLarge {
                size,
                limit: self.max_file_size,
            });
        }
        Ok(())
    }

    /// 导入表格数据（备份日期取当前 UTC 日期）
    pub fn import_table(&self, template_id: &str, table: RawTable) -> ImportResult<ImportReport> {
        self.import_table_as_of(template_id, table, Utc::now().date_naive())
    }

    /// 导入表格数据
    ///
    /// # 参数
    /// - template_id: 模板标识（大小写不敏感）
    /// - table: 原始表格
    /// - as_of: 备份日期
    ///
    /// # 返回
    /// - Ok(ImportReport): 已提交，`imported` 为实际落库行数
    /// - Err: 已回滚，目标表与调用前一致
    #[instrument(skip(self, table), fields(rows = table.len()))]
    pub fn import_table_as_of(
        &self,
        template_id: &str,
        table: RawTable,
        as_of: NaiveDate,
    ) -> ImportResult<ImportReport> {
        let start_time = Instant::now();
        let import_id = Uuid::new_v4().to_string();

        let handler = self.registry.lookup(template_id)?;
        let template = handler.descriptor();
        info!(
            import_id = %import_id,
            template_id = %template.id,
            table = %template.table,
            stage = %ImportStage::Start,
            "开始导入"
        );

        // === 解析 + 校验（纯函数，事务外） ===
        let total_rows = table.len();
        let rows = RowValidator::new(handler.as_ref()).process(&table).map_err(|e| {
            error!(
                import_id = %import_id,
                stage = %ImportStage::Failed,
                error = %e,
                "输入校验失败"
            );
            e
        })?;
        let skipped = rows.skipped;
        debug!(import_id = %import_id, stage = %ImportStage::Parsed, valid = rows.len());

        // === 模板级互斥 ===
        let lock = self.template_lock(&template.id)?;
        let _guard = lock
            .lock()
            .map_err(|e| ImportError::InternalError(format!("模板锁获取失败: {}", e)))?;

        // === 事务: 备份 → 分配主键 → 落库 → 规整 ===
        let result = self.storage.in_transaction(|store| -> ImportResult<_> {
            let backup = BackupManager::backup(store, template, as_of)?;
            debug!(
                import_id = %import_id,
                stage = %ImportStage::BackedUp,
                backup = %backup.table_name
            );

            let current_max = store
                .max_key(&template.table, &template.key_column)
                .map_err(|e| ImportError::AllocationError(e.to_string()))?;
            let keyed = SequenceAllocator::assign(rows, current_max)?;
            debug!(
                import_id = %import_id,
                stage = %ImportStage::Keyed,
                current_max = current_max,
                first_key = ?keyed.first_key(),
                last_key = ?keyed.last_key()
            );

            let imported = BatchLoader::load_all(store, template, &keyed)?;
            debug!(import_id = %import_id, stage = %ImportStage::Loaded, imported = imported);

            let normalize = PostLoadNormalizer::normalize(store, template)?;
            debug!(import_id = %import_id, stage = %ImportStage::Normalized);

            Ok((backup, keyed.first_key(), keyed.last_key(), imported, normalize))
        });

        let (backup, first_key, last_key, imported, normalize) = match result {
            Ok(value) => value,
            Err(e) => {
                error!(
                    import_id = %import_id,
                    stage = %ImportStage::Failed,
                    error = %e,
                    "导入失败，事务已回滚"
                );
                return Err(e);
            }
        };

        let elapsed_ms = start_time.elapsed().as_millis();
        info!(
            import_id = %import_id,
            stage = %ImportStage::Committed,
            total_rows = total_rows,
            imported = imported,
            skipped = skipped,
            duplicates_removed = normalize.duplicates_removed,
            elapsed_ms = elapsed_ms,
            "导入完成"
        );

        Ok(ImportReport {
            import_id,
            template_id: template.id.clone(),
            table: template.table.clone(),
            total_rows,
            imported,
            skipped,
            first_key,
            last_key,
            backup,
            normalize,
            imported_at: Utc::now(),
            elapsed_ms,
        })
    }

    fn template_lock(&self, template_id: &str) -> ImportResult<Arc<Mutex<()>>> {
        let mut locks = self
            .template_locks
            .lock()
            .map_err(|e| ImportError::InternalError(format!("模板锁表获取失败: {}", e)))?;
        Ok(locks
            .entry(template_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }
}
