// ==========================================
// Excel2DB - 目标表备份
// ==========================================
// 职责: 导入前把目标表整表复制为 {table}_{YYYYMMDD}_back_up
// 约束:
// - 在导入事务内执行，导入回滚时备份一并回滚
// - 同一天同名备份已存在时拒绝导入（保留当天首次导入前的状态）
// ==========================================

use crate::domain::{BackupRecord, TemplateDescriptor};
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::{ImportStore, RepositoryError};
use chrono::NaiveDate;
use tracing::info;

pub struct BackupManager;

impl BackupManager {
    /// 备份目标表
    ///
    /// # 返回
    /// - Ok(BackupRecord): 备份表名与备份行数
    /// - Err(BackupExists): 当天备份已存在
    /// - Err(BackupError): 目标表不存在或复制失败
    pub fn backup(
        store: &dyn ImportStore,
        template: &TemplateDescriptor,
        as_of: NaiveDate,
    ) -> ImportResult<BackupRecord> {
        let table_name = BackupRecord::table_name_for(&template.table, as_of);

        store
            .create_table_as_copy(&table_name, &template.table)
            .map_err(|e| match e {
                RepositoryError::TableAlreadyExists(name) => ImportError::BackupExists(name),
                other => ImportError::BackupError {
                    table: template.table.clone(),
                    message: other.to_string(),
                },
            })?;

        let row_count = store
            .count_rows(&table_name)
            .map_err(|e| ImportError::BackupError {
                table: template.table.clone(),
                message: e.to_string(),
            })?;

        info!(
            source = %template.table,
            backup = %table_name,
            row_count = row_count,
            "目标表备份完成"
        );

        Ok(BackupRecord {
            table_name,
            source_table: template.table.clone(),
            as_of,
            row_count,
        })
    }
}
