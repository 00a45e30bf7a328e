// ==========================================
// 周缺陷 PPM 追踪系统 - 年度 PPM 数据仓储
// ==========================================
// 表: annual_ppm
// ==========================================

use crate::domain::AnnualPpmRow;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

/// 单月写入参数 (month_no, escapes, shipped, ppm)
pub type MonthActuals = (u32, Option<i64>, Option<i64>, Option<i64>);

pub struct AnnualPpmRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AnnualPpmRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn count_year(&self, year: i32) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM annual_ppm WHERE year = ?1",
            params![year],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// 写入 12 个月的初始行（已存在的月份不覆盖）
    ///
    /// # 参数
    /// - months: (month_no, 月份名) 列表
    pub fn seed_year(
        &self,
        year: i32,
        months: &[(u32, &str)],
        target: i64,
    ) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO annual_ppm (year, month_no, month, target)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (month_no, month) in months {
                inserted += stmt.execute(params![year, month_no, month, target])?;
            }
        }

        tx.commit()?;
        Ok(inserted)
    }

    pub fn list_year(&self, year: i32) -> RepositoryResult<Vec<AnnualPpmRow>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT year, month_no, month, target, escapes, shipped, ppm
             FROM annual_ppm WHERE year = ?1 ORDER BY month_no",
        )?;
        let rows = stmt
            .query_map(params![year], |row| {
                Ok(AnnualPpmRow {
                    year: row.get(0)?,
                    month_no: row.get(1)?,
                    month: row.get(2)?,
                    target: row.get(3)?,
                    escapes: row.get(4)?,
                    shipped: row.get(5)?,
                    ppm: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 批量写入月度实绩（单事务）；任一月份不存在则整体回滚
    pub fn update_months(&self, year: i32, updates: &[MonthActuals]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        {
            let mut stmt = tx.prepare(
                "UPDATE annual_ppm SET escapes = ?1, shipped = ?2, ppm = ?3
                 WHERE year = ?4 AND month_no = ?5",
            )?;
            for (month_no, escapes, shipped, ppm) in updates {
                let affected = stmt.execute(params![escapes, shipped, ppm, year, month_no])?;
                if affected == 0 {
                    return Err(RepositoryError::NotFound {
                        entity: "AnnualPpmRow".to_string(),
                        id: format!("{}-{}", year, month_no),
                    });
                }
            }
        }

        tx.commit()?;
        Ok(updates.len())
    }
}
