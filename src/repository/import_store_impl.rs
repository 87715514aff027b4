// ==========================================
// Excel2DB - 导入存储 SQLite 实现
// ==========================================
// 职责: 实现导入相关数据访问（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据 CRUD
// 约束: 表名/列名来自模板定义，拼接前校验并加引号；取值一律参数化
// ==========================================

use crate::db::{open_sqlite_connection, quote_ident};
use crate::domain::template::is_plain_identifier;
use crate::domain::{DerivedColumnRule, FieldValue};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::import_store::{ImportStorage, ImportStore};
use rusqlite::types::ToSql;
use rusqlite::{params_from_iter, Connection, TransactionBehavior};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// SQLite 单条语句可绑定参数上限（SQLITE_MAX_VARIABLE_NUMBER, 3.32+）
pub const MAX_BOUND_PARAMETERS: usize = 32_766;

fn ident(name: &str) -> RepositoryResult<String> {
    if is_plain_identifier(name) {
        Ok(quote_ident(name))
    } else {
        Err(RepositoryError::InvalidIdentifier(name.to_string()))
    }
}

/// 把 `CREATE TABLE <name> (...)` 改写为以新表名建表
///
/// 列定义从第一个左括号开始原样保留；标识符经过校验，不含括号。
fn rename_table_ddl(ddl: &str, new_ident: &str) -> Option<String> {
    let body_start = ddl.find('(')?;
    Some(format!("CREATE TABLE {} {}", new_ident, &ddl[body_start..]))
}

// ==========================================
// SqliteImportStore - 事务内操作
// ==========================================
pub struct SqliteImportStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteImportStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl ImportStore for SqliteImportStore<'_> {
    fn table_exists(&self, table: &str) -> RepositoryResult<bool> {
        Ok(crate::db::table_exists(self.conn, table)?)
    }

    fn count_rows(&self, table: &str) -> RepositoryResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", ident(table)?);
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }

    fn max_key(&self, table: &str, key_column: &str) -> RepositoryResult<i64> {
        let sql = format!(
            "SELECT COALESCE(MAX({}), 0) FROM {}",
            ident(key_column)?,
            ident(table)?
        );
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }

    fn create_table_as_copy(&self, new_name: &str, source: &str) -> RepositoryResult<()> {
        let new_ident = ident(new_name)?;
        let source_ident = ident(source)?;

        if !self.table_exists(source)? {
            return Err(RepositoryError::TableNotFound(source.to_string()));
        }
        if self.table_exists(new_name)? {
            return Err(RepositoryError::TableAlreadyExists(new_name.to_string()));
        }

        // 按源表 DDL 建表（保留主键/非空/CHECK 约束与声明类型），再整表复制数据
        let source_sql = crate::db::table_sql(self.conn, source)?
            .ok_or_else(|| RepositoryError::TableNotFound(source.to_string()))?;
        let create_sql = rename_table_ddl(&source_sql, &new_ident).ok_or_else(|| {
            RepositoryError::DatabaseQueryError(format!("无法解析表定义: {}", source_sql))
        })?;
        self.conn.execute_batch(&create_sql)?;

        let copied = self.conn.execute(
            &format!("INSERT INTO {} SELECT * FROM {}", new_ident, source_ident),
            [],
        )?;
        debug!(table = %new_name, source = %source, rows = copied, "复制表完成");
        Ok(())
    }

    fn insert_all(
        &self,
        table: &str,
        columns: &[&str],
        rows: &[Vec<FieldValue>],
    ) -> RepositoryResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        if columns.is_empty() {
            return Err(RepositoryError::DatabaseQueryError(
                "写入列为空".to_string(),
            ));
        }
        if let Some(bad) = rows.iter().position(|r| r.len() != columns.len()) {
            return Err(RepositoryError::DatabaseQueryError(format!(
                "第 {} 行取值个数 {} 与列数 {} 不一致",
                bad + 1,
                rows[bad].len(),
                columns.len()
            )));
        }

        let column_list = columns
            .iter()
            .map(|c| ident(c))
            .collect::<RepositoryResult<Vec<_>>>()?
            .join(", ");
        let placeholders = format!("({})", vec!["?"; columns.len()].join(", "));
        let rows_per_statement = (MAX_BOUND_PARAMETERS / columns.len()).max(1);

        let mut count = 0;
        for chunk in rows.chunks(rows_per_statement) {
            let sql = format!(
                "INSERT INTO {} ({}) VALUES {}",
                ident(table)?,
                column_list,
                vec![placeholders.as_str(); chunk.len()].join(", ")
            );
            let mut stmt = self.conn.prepare(&sql)?;
            count += stmt.execute(params_from_iter(chunk.iter().flatten()))?;
        }

        debug!(table = %table, count = count, "多行写入完成");
        Ok(count)
    }

    fn delete_duplicates(
        &self,
        table: &str,
        key_column: &str,
        identity: &[String],
    ) -> RepositoryResult<usize> {
        if identity.is_empty() {
            return Ok(0);
        }

        let table_ident = ident(table)?;
        let key_ident = ident(key_column)?;
        let group_by = identity
            .iter()
            .map(|c| ident(c))
            .collect::<RepositoryResult<Vec<_>>>()?
            .join(", ");

        let sql = format!(
            "DELETE FROM {t} WHERE {k} NOT IN (SELECT MIN({k}) FROM {t} GROUP BY {g})",
            t = table_ident,
            k = key_ident,
            g = group_by
        );
        let removed = self.conn.execute(&sql, [])?;
        debug!(table = %table, removed = removed, "去重完成");
        Ok(removed)
    }

    fn update_derived_column(
        &self,
        table: &str,
        rule: &DerivedColumnRule,
    ) -> RepositoryResult<usize> {
        let table_ident = ident(table)?;

        let updated = match rule {
            DerivedColumnRule::FillBlank { column, value } => {
                let col = ident(column)?;
                let sql = format!(
                    "UPDATE {t} SET {c} = ?1 WHERE {c} IS NULL OR TRIM({c}) = ''",
                    t = table_ident,
                    c = col
                );
                self.conn.execute(&sql, rusqlite::params![value])?
            }
            DerivedColumnRule::Lookup {
                column,
                source,
                cases,
                otherwise,
            } => {
                if cases.is_empty() && otherwise.is_none() {
                    return Ok(0);
                }
                let col = ident(column)?;
                let src = ident(source)?;

                let mut params: Vec<&dyn ToSql> = Vec::with_capacity(cases.len() * 2 + 1);
                let mut case_expr = format!("CASE UPPER(TRIM({}))", src);
                for (when, then) in cases {
                    params.push(when);
                    params.push(then);
                    case_expr.push_str(&format!(
                        " WHEN UPPER(?{}) THEN ?{}",
                        params.len() - 1,
                        params.len()
                    ));
                }
                match otherwise {
                    Some(value) => {
                        params.push(value);
                        case_expr.push_str(&format!(" ELSE ?{} END", params.len()));
                    }
                    None => case_expr.push_str(&format!(" ELSE {} END", col)),
                }

                // 只更新取值确实变化的行，保证受影响行数在重复执行时为 0
                let sql = format!(
                    "UPDATE {t} SET {c} = {e} WHERE {c} IS NOT ({e})",
                    t = table_ident,
                    c = col,
                    e = case_expr
                );
                self.conn.execute(&sql, params.as_slice())?
            }
        };

        debug!(table = %table, column = %rule.column(), updated = updated, "派生列更新完成");
        Ok(updated)
    }
}

// ==========================================
// SqliteImportStorage - 事务边界
// ==========================================
pub struct SqliteImportStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteImportStorage {
    /// 创建新的 Storage 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&guard)?;
        }
        Ok(Self { conn })
    }

    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }
}

impl ImportStorage for SqliteImportStorage {
    fn in_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn ImportStore) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        // IMMEDIATE: 事务开始即持有写锁，读最大主键与写入之间不会被其他连接插入
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let result = {
            let store = SqliteImportStore::new(&tx);
            f(&store)
        };

        match result {
            Ok(value) => {
                tx.commit()
                    .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!(error = %rollback_err, "事务回滚失败");
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> SqliteImportStorage {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE t (
                id INTEGER PRIMARY KEY,
                name TEXT,
                kind TEXT,
                code TEXT
            );
            "#,
        )
        .unwrap();
        SqliteImportStorage::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    fn rows(values: &[(i64, &str, &str)]) -> Vec<Vec<FieldValue>> {
        values
            .iter()
            .map(|(id, name, kind)| {
                vec![
                    FieldValue::Integer(*id),
                    FieldValue::text(*name),
                    FieldValue::text(*kind),
                ]
            })
            .collect()
    }

    #[test]
    fn test_max_key_empty_table_is_zero() {
        let storage = storage();
        let max = storage
            .in_transaction(|store| store.max_key("t", "id"))
            .unwrap();
        assert_eq!(max, 0);
    }

    #[test]
    fn test_insert_all_and_max_key() {
        let storage = storage();
        let (count, max) = storage
            .in_transaction(|store| -> RepositoryResult<_> {
                let count = store.insert_all(
                    "t",
                    &["id", "name", "kind"],
                    &rows(&[(1, "a", "x"), (2, "b", "y"), (7, "c", "z")]),
                )?;
                Ok((count, store.max_key("t", "id")?))
            })
            .unwrap();
        assert_eq!(count, 3);
        assert_eq!(max, 7);
    }

    #[test]
    fn test_insert_all_rejects_ragged_rows() {
        let storage = storage();
        let result = storage.in_transaction(|store| {
            store.insert_all("t", &["id", "name"], &[vec![FieldValue::Integer(1)]])
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_rollback_on_error() {
        let storage = storage();
        let result = storage.in_transaction(|store| -> RepositoryResult<()> {
            store.insert_all("t", &["id", "name", "kind"], &rows(&[(1, "a", "x")]))?;
            Err(RepositoryError::DatabaseQueryError("boom".to_string()))
        });
        assert!(result.is_err());

        let count = storage.in_transaction(|store| store.count_rows("t")).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_create_table_as_copy_rejects_existing() {
        let storage = storage();
        storage
            .in_transaction(|store| store.create_table_as_copy("t_copy", "t"))
            .unwrap();
        let again = storage.in_transaction(|store| store.create_table_as_copy("t_copy", "t"));
        assert!(matches!(again, Err(RepositoryError::TableAlreadyExists(_))));
    }

    #[test]
    fn test_create_table_as_copy_keeps_schema_and_rows() {
        let storage = storage();
        storage
            .in_transaction(|store| -> RepositoryResult<()> {
                let seed = rows(&[(1, "a", "x"), (5, "b", "y")]);
                store.insert_all("t", &["id", "name", "kind"], &seed)?;
                store.create_table_as_copy("t_copy", "t")
            })
            .unwrap();

        let conn = storage.connection();
        let conn = conn.lock().unwrap();
        let source = crate::db::table_sql(&conn, "t").unwrap().unwrap();
        let copy = crate::db::table_sql(&conn, "t_copy").unwrap().unwrap();
        let body = |sql: &str| sql[sql.find('(').unwrap()..].to_string();
        assert_eq!(body(&copy), body(&source));
        assert!(copy.starts_with("CREATE TABLE \"t_copy\""));

        let ids: Vec<i64> = conn
            .prepare("SELECT id FROM t_copy ORDER BY id")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(ids, vec![1, 5]);

        // 主键约束随表结构保留
        let dup = conn.execute("INSERT INTO t_copy (id, name) VALUES (1, 'z')", []);
        assert!(dup.is_err());
    }

    #[test]
    fn test_delete_duplicates_keeps_lowest_key() {
        let storage = storage();
        let (removed, remaining) = storage
            .in_transaction(|store| -> RepositoryResult<_> {
                store.insert_all(
                    "t",
                    &["id", "name", "kind"],
                    &rows(&[(3, "a", "x"), (1, "a", "x"), (2, "b", "x"), (4, "a", "y")]),
                )?;
                let identity = vec!["name".to_string(), "kind".to_string()];
                let removed = store.delete_duplicates("t", "id", &identity)?;
                Ok((removed, store.count_rows("t")?))
            })
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(remaining, 3);

        let conn = storage.connection();
        let conn = conn.lock().unwrap();
        let ids: Vec<i64> = conn
            .prepare("SELECT id FROM t ORDER BY id")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(ids, vec![1, 2, 4]);
    }

    #[test]
    fn test_lookup_rule_is_idempotent() {
        let storage = storage();
        let rule = DerivedColumnRule::Lookup {
            column: "code".to_string(),
            source: "kind".to_string(),
            cases: vec![
                ("x".to_string(), FieldValue::text("X1")),
                ("y".to_string(), FieldValue::text("Y1")),
            ],
            otherwise: Some(FieldValue::text("-")),
        };
        let (first, second) = storage
            .in_transaction(|store| -> RepositoryResult<_> {
                store.insert_all(
                    "t",
                    &["id", "name", "kind"],
                    &rows(&[(1, "a", "x"), (2, "b", "y"), (3, "c", "z")]),
                )?;
                let first = store.update_derived_column("t", &rule)?;
                let second = store.update_derived_column("t", &rule)?;
                Ok((first, second))
            })
            .unwrap();
        assert_eq!(first, 3);
        assert_eq!(second, 0);
    }

    #[test]
    fn test_fill_blank_rule() {
        let storage = storage();
        let rule = DerivedColumnRule::FillBlank {
            column: "code".to_string(),
            value: FieldValue::text("-2"),
        };
        let updated = storage
            .in_transaction(|store| -> RepositoryResult<_> {
                store.insert_all(
                    "t",
                    &["id", "name", "code"],
                    &[
                        vec![FieldValue::Integer(1), FieldValue::text("a"), FieldValue::Null],
                        vec![FieldValue::Integer(2), FieldValue::text("b"), FieldValue::text(" ")],
                        vec![FieldValue::Integer(3), FieldValue::text("c"), FieldValue::text("9")],
                    ],
                )?;
                store.update_derived_column("t", &rule)
            })
            .unwrap();
        assert_eq!(updated, 2);
    }

    #[test]
    fn test_invalid_identifier_is_rejected() {
        let storage = storage();
        let result = storage.in_transaction(|store| store.count_rows("t; DROP TABLE t"));
        assert!(matches!(result, Err(RepositoryError::InvalidIdentifier(_))));
    }
}
