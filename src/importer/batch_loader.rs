// ==========================================
// Excel2DB - 批量落库
// ==========================================
// 职责: 把带主键的行一次性写入目标表
// 约束: 在导入事务内执行；任一行失败则整体失败（由事务回滚全部写入）
// ==========================================

use crate::domain::{KeyedRowSet, TemplateDescriptor};
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::ImportStore;
use tracing::{debug, instrument};

pub struct BatchLoader;

impl BatchLoader {
    /// 写入全部行
    ///
    /// # 返回
    /// - Ok(usize): 写入行数（等于输入行数；空输入为 0 且不访问存储）
    /// - Err(PersistenceError): 写入失败
    #[instrument(skip(store, template, rows), fields(table = %template.table, rows = rows.len()))]
    pub fn load_all(
        store: &dyn ImportStore,
        template: &TemplateDescriptor,
        rows: &KeyedRowSet,
    ) -> ImportResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let columns = template.insert_columns();
        let values = rows.to_insert_values(template);
        let written = store
            .insert_all(&template.table, &columns, &values)
            .map_err(ImportError::PersistenceError)?;

        if written != rows.len() {
            return Err(ImportError::InternalError(format!(
                "写入行数 {} 与待写入行数 {} 不一致",
                written,
                rows.len()
            )));
        }

        debug!(written = written, "批量写入完成");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{KeyedRowSet, Row};
    use crate::importer::template_handler::LanguageTemplate;
    use crate::repository::SqliteImportStore;
    use rusqlite::Connection;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE zd_language (
                id INTEGER PRIMARY KEY, chinese TEXT, other TEXT, sqbm TEXT
            );",
        )
        .unwrap();
        conn
    }

    fn keyed(values: &[(i64, &str, &str)]) -> KeyedRowSet {
        KeyedRowSet {
            rows: values
                .iter()
                .enumerate()
                .map(|(idx, (key, chinese, other))| {
                    let mut row = Row::new(idx + 1);
                    row.set("chinese", *chinese);
                    row.set("other", *other);
                    row.set("sqbm", "-2");
                    (*key, row)
                })
                .collect(),
        }
    }

    #[test]
    fn test_load_all_writes_every_row() {
        let conn = setup();
        let store = SqliteImportStore::new(&conn);
        let template = LanguageTemplate::builtin_descriptor();

        let rows = keyed(&[(1, "你好", "hello"), (2, "再见", "bye")]);
        let written = BatchLoader::load_all(&store, &template, &rows).unwrap();
        assert_eq!(written, 2);

        let other: String = conn
            .query_row("SELECT other FROM zd_language WHERE id = 2", [], |r| r.get(0))
            .unwrap();
        assert_eq!(other, "bye");
    }

    #[test]
    fn test_load_all_empty_is_noop() {
        let conn = Connection::open_in_memory().unwrap();
        let store = SqliteImportStore::new(&conn);
        // 表不存在也不报错：空输入不访问存储
        let written = BatchLoader::load_all(
            &store,
            &LanguageTemplate::builtin_descriptor(),
            &KeyedRowSet::default(),
        )
        .unwrap();
        assert_eq!(written, 0);
    }

    #[test]
    fn test_load_all_duplicate_key_fails() {
        let conn = setup();
        let store = SqliteImportStore::new(&conn);
        let result = BatchLoader::load_all(
            &store,
            &LanguageTemplate::builtin_descriptor(),
            &keyed(&[(1, "你好", "hello"), (1, "再见", "bye")]),
        );
        assert!(matches!(result, Err(ImportError::PersistenceError(_))));
    }
}
