// ==========================================
// Excel2DB - 领域模型层
// ==========================================
// 职责: 定义模板、行数据、导入结果
// 红线: 不含数据访问逻辑,不含导入流程逻辑
// ==========================================

pub mod import;
pub mod row;
pub mod template;

// 重导出核心类型
pub use import::{BackupRecord, ImportReport, ImportStage, NormalizeReport, BACKUP_SUFFIX};
pub use row::{DropReason, KeyedRowSet, RawRow, RawTable, Row, RowOutcome, RowSet};
pub use template::{ColumnSpec, DerivedColumnRule, FieldValue, TemplateDescriptor};
