// ==========================================
// 周缺陷 PPM 追踪系统 - 分类参照数据仓储
// ==========================================
// 表: classification_family
// 红线: Repository 不含业务逻辑（前缀匹配规则在 engine::classification）
// 约束: 装载顺序 = rowid 顺序（UPSERT 不改变已有行的 rowid）
// ==========================================

use crate::domain::ClassificationRecord;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// ClassificationRepository - 分类参照仓储
// ==========================================
pub struct ClassificationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ClassificationRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按装载顺序读取全部分类记录
    pub fn list_all(&self) -> RepositoryResult<Vec<ClassificationRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT family, product_family, category FROM classification_family ORDER BY rowid",
        )?;
        let records = stmt
            .query_map([], |row| {
                Ok(ClassificationRecord {
                    family: row.get(0)?,
                    product_family: row.get(1)?,
                    category: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn count(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM classification_family", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// 批量写入（family 已存在则更新产品族与类别），单事务
    ///
    /// # 返回
    /// - 写入的记录数
    pub fn batch_upsert(&self, records: &[ClassificationRecord]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO classification_family (family, product_family, category)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(family) DO UPDATE SET
                     product_family = excluded.product_family,
                     category = excluded.category",
            )?;
            for record in records {
                stmt.execute(params![record.family, record.product_family, record.category])?;
                count += 1;
            }
        }

        tx.commit()?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_test_db() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        Arc::new(Mutex::new(conn))
    }

    fn record(family: &str, product: &str, category: &str) -> ClassificationRecord {
        ClassificationRecord {
            family: family.to_string(),
            product_family: product.to_string(),
            category: category.to_string(),
        }
    }

    #[test]
    fn test_upsert_keeps_load_order() {
        let repo = ClassificationRepository::new(setup_test_db());

        repo.batch_upsert(&[
            record("AB", "Alpha", "AHUS"),
            record("48VV", "Roof", "Rooftop"),
        ])
        .unwrap();
        // 更新已有 family 不改变顺序
        repo.batch_upsert(&[record("AB", "Alpha2", "CDU"), record("CX", "Cx", "CDEF")])
            .unwrap();

        let all = repo.list_all().unwrap();
        let families: Vec<&str> = all.iter().map(|r| r.family.as_str()).collect();
        assert_eq!(families, vec!["AB", "48VV", "CX"]);
        assert_eq!(all[0].product_family, "Alpha2");
        assert_eq!(all[0].category, "CDU");
        assert_eq!(repo.count().unwrap(), 3);
    }
}
