// ==========================================
// Excel2DB - 主键分配
// ==========================================
// 职责: 为待写入行分配主键 current_max+1 .. current_max+n（按 RowSet 顺序）
// 约束:
// - current_max 必须在导入事务内读取，保证与并发导入互斥
// - 溢出视为分配失败，不截断、不回绕
// ==========================================

use crate::domain::{KeyedRowSet, RowSet};
use crate::importer::error::{ImportError, ImportResult};

pub struct SequenceAllocator;

impl SequenceAllocator {
    /// 连续主键区间
    ///
    /// # 返回
    /// - Ok(Vec<i64>): 长度为 n，首个为 current_max+1（n=0 时为空）
    /// - Err(AllocationError): 区间超出 i64 范围
    pub fn next_keys(n: usize, current_max: i64) -> ImportResult<Vec<i64>> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let count = i64::try_from(n)
            .map_err(|_| ImportError::AllocationError(format!("行数过大: {}", n)))?;
        current_max.checked_add(count).ok_or_else(|| {
            ImportError::AllocationError(format!(
                "主键溢出: 当前最大值 {}，待分配 {} 个",
                current_max, n
            ))
        })?;

        Ok((1..=count).map(|offset| current_max + offset).collect())
    }

    /// 按 RowSet 顺序为每行绑定主键
    pub fn assign(rows: RowSet, current_max: i64) -> ImportResult<KeyedRowSet> {
        let keys = Self::next_keys(rows.len(), current_max)?;
        Ok(KeyedRowSet {
            rows: keys.into_iter().zip(rows.rows).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Row;

    #[test]
    fn test_next_keys_continue_from_max() {
        assert_eq!(SequenceAllocator::next_keys(3, 10).unwrap(), vec![11, 12, 13]);
        assert_eq!(SequenceAllocator::next_keys(2, 0).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_next_keys_empty() {
        assert!(SequenceAllocator::next_keys(0, 42).unwrap().is_empty());
    }

    #[test]
    fn test_next_keys_overflow() {
        assert!(matches!(
            SequenceAllocator::next_keys(2, i64::MAX - 1),
            Err(ImportError::AllocationError(_))
        ));
        assert_eq!(
            SequenceAllocator::next_keys(1, i64::MAX - 1).unwrap(),
            vec![i64::MAX]
        );
    }

    #[test]
    fn test_assign_preserves_order() {
        let rows = RowSet {
            rows: vec![Row::new(1), Row::new(3), Row::new(4)],
            skipped: 1,
        };
        let keyed = SequenceAllocator::assign(rows, 5).unwrap();
        let pairs: Vec<(i64, usize)> = keyed.rows.iter().map(|(k, r)| (*k, r.row_number)).collect();
        assert_eq!(pairs, vec![(6, 1), (7, 3), (8, 4)]);
        assert_eq!(keyed.first_key(), Some(6));
        assert_eq!(keyed.last_key(), Some(8));
    }
}
