// ==========================================
// 周缺陷 PPM 追踪系统 - 周切换世代仓储
// ==========================================
// 表: rollover_generation
// 用途: 世代号（乐观锁）与切换审计
// ==========================================

use crate::domain::RolloverGeneration;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::weekly_entry_repo::week_from_column;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row, Transaction};
use std::sync::{Arc, Mutex, MutexGuard};

fn map_generation_row(row: &Row) -> rusqlite::Result<RolloverGeneration> {
    let entry_count: i64 = row.get(2)?;
    let unclassified_count: i64 = row.get(3)?;
    let executed_at: DateTime<Utc> = row.get(4)?;
    Ok(RolloverGeneration {
        generation_id: row.get(0)?,
        week: week_from_column(1, row.get(1)?)?,
        year: row.get(5)?,
        entry_count: entry_count.max(0) as usize,
        unclassified_count: unclassified_count.max(0) as usize,
        executed_at,
    })
}

pub struct RolloverRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RolloverRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 最新已提交世代号（无记录时为 0）
    pub fn current_generation_tx(conn: &Connection) -> RepositoryResult<i64> {
        let generation: i64 = conn.query_row(
            "SELECT COALESCE(MAX(generation_id), 0) FROM rollover_generation",
            [],
            |row| row.get(0),
        )?;
        Ok(generation)
    }

    pub fn record_generation_tx(
        tx: &Transaction,
        generation: &RolloverGeneration,
    ) -> RepositoryResult<()> {
        tx.execute(
            "INSERT INTO rollover_generation
                (generation_id, week, week_no, year, entry_count, unclassified_count, executed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                generation.generation_id,
                generation.week.to_string(),
                generation.week.number(),
                generation.year,
                generation.entry_count as i64,
                generation.unclassified_count as i64,
                generation.executed_at,
            ],
        )?;
        Ok(())
    }

    pub fn current_generation(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Self::current_generation_tx(&conn)
    }

    /// 最近的切换记录（新 → 旧）
    pub fn list_recent(&self, limit: usize) -> RepositoryResult<Vec<RolloverGeneration>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT generation_id, week_no, entry_count, unclassified_count, executed_at, year
             FROM rollover_generation ORDER BY generation_id DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], map_generation_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WeekLabel;

    #[test]
    fn test_generation_sequence() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        let conn = Arc::new(Mutex::new(conn));
        let repo = RolloverRepository::new(conn.clone());

        assert_eq!(repo.current_generation().unwrap(), 0);

        for (generation_id, week) in [(1, 11), (2, 12)] {
            let mut guard = conn.lock().unwrap();
            let tx = guard.transaction().unwrap();
            RolloverRepository::record_generation_tx(
                &tx,
                &RolloverGeneration {
                    generation_id,
                    week: WeekLabel::new(week).unwrap(),
                    year: 2025,
                    entry_count: 3,
                    unclassified_count: 1,
                    executed_at: Utc::now(),
                },
            )
            .unwrap();
            tx.commit().unwrap();
        }

        assert_eq!(repo.current_generation().unwrap(), 2);
        let recent = repo.list_recent(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].week.number(), 12);
        assert_eq!(recent[1].unclassified_count, 1);
    }
}
