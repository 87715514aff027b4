// ==========================================
// Excel2DB - 导入存储 Trait
// ==========================================
// 职责: 定义导入流程所需的存储操作（不包含实现）
// 红线: Repository 不含业务规则，只做数据 CRUD
// 约束: 所有操作可组合进同一个事务
// ==========================================

use crate::domain::{DerivedColumnRule, FieldValue};
use crate::repository::error::{RepositoryError, RepositoryResult};

// ==========================================
// ImportStore Trait
// ==========================================
// 用途: 事务内的存储操作
// 实现者: SqliteImportStore
pub trait ImportStore {
    /// 表是否存在
    fn table_exists(&self, table: &str) -> RepositoryResult<bool>;

    /// 表行数
    fn count_rows(&self, table: &str) -> RepositoryResult<i64>;

    /// 读取主键列当前最大值（空表返回 0）
    fn max_key(&self, table: &str, key_column: &str) -> RepositoryResult<i64>;

    /// 以 `source` 的全部行与列创建新表 `new_name`
    ///
    /// # 返回
    /// - Err(TableAlreadyExists): `new_name` 已存在
    fn create_table_as_copy(&self, new_name: &str, source: &str) -> RepositoryResult<()>;

    /// 多行写入
    ///
    /// # 参数
    /// - columns: 列名（顺序与每行取值一致）
    /// - rows: 每行取值
    ///
    /// # 返回
    /// - Ok(usize): 写入行数
    fn insert_all(
        &self,
        table: &str,
        columns: &[&str],
        rows: &[Vec<FieldValue>],
    ) -> RepositoryResult<usize>;

    /// 删除去重键相同的行，每组保留主键最小的一行
    ///
    /// # 返回
    /// - Ok(usize): 删除行数
    fn delete_duplicates(
        &self,
        table: &str,
        key_column: &str,
        identity: &[String],
    ) -> RepositoryResult<usize>;

    /// 在整张表上执行派生列规则
    ///
    /// # 返回
    /// - Ok(usize): 受影响行数
    fn update_derived_column(&self, table: &str, rule: &DerivedColumnRule)
        -> RepositoryResult<usize>;
}

// ==========================================
// ImportStorage Trait
// ==========================================
// 用途: 开启事务并在事务内执行一组 ImportStore 操作
// 实现者: SqliteImportStorage
pub trait ImportStorage: Send + Sync {
    /// 在单个事务中执行 `f`
    ///
    /// - `f` 返回 Ok → 提交
    /// - `f` 返回 Err 或提交失败 → 回滚，所有操作均不可见
    fn in_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn ImportStore) -> Result<T, E>,
        E: From<RepositoryError>;
}
