// ==========================================
// Excel2DB - 导入后规整
// ==========================================
// 职责: 落库后在整张目标表上执行
//   1. 按去重键删除重复行（每组保留主键最小的一行）
//   2. 按派生列规则更新列值
// 约束:
// - 作用于整张表（包括本次导入之前的存量数据）
// - 幂等：连续执行两次，第二次删除 0 行、更新 0 行
// ==========================================

use crate::domain::{NormalizeReport, TemplateDescriptor};
use crate::importer::error::ImportResult;
use crate::repository::ImportStore;
use tracing::{debug, info};

pub struct PostLoadNormalizer;

impl PostLoadNormalizer {
    pub fn normalize(
        store: &dyn ImportStore,
        template: &TemplateDescriptor,
    ) -> ImportResult<NormalizeReport> {
        let mut report = NormalizeReport::default();

        // 1. 去重
        if !template.identity.is_empty() {
            report.duplicates_removed =
                store.delete_duplicates(&template.table, &template.key_column, &template.identity)?;
        }

        // 2. 派生列（按定义顺序）
        for rule in &template.derived {
            let updated = store.update_derived_column(&template.table, rule)?;
            debug!(column = %rule.column(), updated = updated, "派生列规则执行完成");
            report.derived_updated += updated;
        }

        info!(
            table = %template.table,
            duplicates_removed = report.duplicates_removed,
            derived_updated = report.derived_updated,
            "导入后规整完成"
        );
        Ok(report)
    }
}
