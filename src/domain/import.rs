// ==========================================
// Excel2DB - 导入结果领域模型
// ==========================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 备份后缀
pub const BACKUP_SUFFIX: &str = "_back_up";

// ==========================================
// ImportStage - 导入状态机
// ==========================================
/// Start → BackedUp → Parsed → Keyed → Loaded → Normalized → Committed，任一步失败 → Failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportStage {
    Start,
    BackedUp,
    Parsed,
    Keyed,
    Loaded,
    Normalized,
    Committed,
    Failed,
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImportStage::Start => "START",
            ImportStage::BackedUp => "BACKED_UP",
            ImportStage::Parsed => "PARSED",
            ImportStage::Keyed => "KEYED",
            ImportStage::Loaded => "LOADED",
            ImportStage::Normalized => "NORMALIZED",
            ImportStage::Committed => "COMMITTED",
            ImportStage::Failed => "FAILED",
        };
        write!(f, "{}", s)
    }
}

// ==========================================
// BackupRecord - 备份表
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    /// 备份表名: {table}_{YYYYMMDD}_back_up
    pub table_name: String,
    /// 被备份的目标表
    pub source_table: String,
    pub as_of: NaiveDate,
    /// 备份时目标表行数
    pub row_count: i64,
}

impl BackupRecord {
    /// 由目标表与日期确定备份表名
    pub fn table_name_for(source_table: &str, as_of: NaiveDate) -> String {
        format!(
            "{}_{}{}",
            source_table,
            as_of.format("%Y%m%d"),
            BACKUP_SUFFIX
        )
    }
}

// ==========================================
// NormalizeReport - 导入后规整统计
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeReport {
    /// 去重删除的行数
    pub duplicates_removed: usize,
    /// 派生列规则更新的行数（各规则累加）
    pub derived_updated: usize,
}

// ==========================================
// ImportReport - 一次导入的结果
// ==========================================
/// 导入要么整体提交，要么整体回滚；因此这里没有"部分成功"状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub import_id: String,
    pub template_id: String,
    pub table: String,
    /// 输入数据行数
    pub total_rows: usize,
    /// 实际落库行数（校验通过的行）
    pub imported: usize,
    /// 校验丢弃行数
    pub skipped: usize,
    pub first_key: Option<i64>,
    pub last_key: Option<i64>,
    pub backup: BackupRecord,
    pub normalize: NormalizeReport,
    pub imported_at: DateTime<Utc>,
    pub elapsed_ms: u128,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_table_name() {
        let date = NaiveDate::from_ymd_opt(2025, 10, 11).unwrap();
        assert_eq!(
            BackupRecord::table_name_for("zd_language", date),
            "zd_language_20251011_back_up"
        );
    }
}
