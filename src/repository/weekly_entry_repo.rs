// ==========================================
// 周缺陷 PPM 追踪系统 - 周条目数据仓储
// ==========================================
// 表: defect_entry（当前周） / defect_entry_history（历史，只追加）
// 红线: Repository 不做业务逻辑,只做数据映射
// 约束: 所有查询使用参数化；*_tx 函数只在周切换事务内调用
// ==========================================

use crate::domain::{Category, WeekLabel, WeeklyEntry};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Row, Transaction};
use std::sync::{Arc, Mutex, MutexGuard};

/// 两张表共享的列（顺序即 SELECT/INSERT 顺序）
const ENTRY_COLUMNS: &str = "entry_id, generation_id, folio, report_date, employee_id, area, \
     sub_area, shift, line, defect, cause, part_number, sequence, quantity, comments, \
     product_family, category, week, week_no, year, month";

pub(crate) fn entry_table(historical: bool) -> &'static str {
    if historical {
        "defect_entry_history"
    } else {
        "defect_entry"
    }
}

/// week_no → WeekLabel（非法值按越界错误返回）
pub(crate) fn week_from_column(column: usize, week_no: i64) -> rusqlite::Result<WeekLabel> {
    u32::try_from(week_no)
        .ok()
        .and_then(WeekLabel::new)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(column, week_no))
}

fn map_entry_row(row: &Row) -> rusqlite::Result<WeeklyEntry> {
    Ok(WeeklyEntry {
        entry_id: row.get(0)?,
        generation_id: row.get(1)?,
        folio: row.get(2)?,
        report_date: row.get(3)?,
        employee_id: row.get(4)?,
        area: row.get(5)?,
        sub_area: row.get(6)?,
        shift: row.get(7)?,
        line: row.get(8)?,
        defect: row.get(9)?,
        cause: row.get(10)?,
        part_number: row.get(11)?,
        sequence: row.get(12)?,
        quantity: row.get(13)?,
        comments: row.get(14)?,
        product_family: row.get(15)?,
        category: row.get(16)?,
        week: week_from_column(18, row.get(18)?)?,
        year: row.get(19)?,
        month: row.get(20)?,
    })
}

// ==========================================
// WeeklyEntryRepository - 周条目仓储
// ==========================================
pub struct WeeklyEntryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl WeeklyEntryRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 事务内操作（周切换）
    // ==========================================

    /// 将当前周全部条目追加到历史表（不做任何字段变换）
    pub fn archive_current_tx(
        tx: &Transaction,
        archived_generation_id: i64,
        archived_at: &str,
    ) -> RepositoryResult<usize> {
        let sql = format!(
            "INSERT INTO defect_entry_history ({cols}, archived_generation_id, archived_at) \
             SELECT {cols}, ?1, ?2 FROM defect_entry",
            cols = ENTRY_COLUMNS
        );
        Ok(tx.execute(&sql, params![archived_generation_id, archived_at])?)
    }

    /// 清空当前周
    pub fn clear_current_tx(tx: &Transaction) -> RepositoryResult<usize> {
        Ok(tx.execute("DELETE FROM defect_entry", [])?)
    }

    /// 批量插入当前周条目
    pub fn insert_batch_tx(tx: &Transaction, entries: &[WeeklyEntry]) -> RepositoryResult<usize> {
        let sql = format!(
            "INSERT INTO defect_entry ({}) VALUES \
             (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)",
            ENTRY_COLUMNS
        );
        let mut stmt = tx.prepare(&sql)?;

        let mut count = 0;
        for entry in entries {
            stmt.execute(params![
                entry.entry_id,
                entry.generation_id,
                entry.folio,
                entry.report_date,
                entry.employee_id,
                entry.area,
                entry.sub_area,
                entry.shift,
                entry.line,
                entry.defect,
                entry.cause,
                entry.part_number,
                entry.sequence,
                entry.quantity,
                entry.comments,
                entry.product_family,
                entry.category,
                entry.week.to_string(),
                entry.week.number(),
                entry.year,
                entry.month,
            ])?;
            count += 1;
        }

        Ok(count)
    }

    /// 读取当前周某一类别的条目（事务内可见刚插入的数据）
    pub fn list_current_by_category_tx(
        conn: &Connection,
        category: Category,
    ) -> RepositoryResult<Vec<WeeklyEntry>> {
        let sql = format!(
            "SELECT {} FROM defect_entry WHERE category = ?1 ORDER BY rowid",
            ENTRY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params![category.as_str()], map_entry_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 当前周全部条目
    pub fn list_current(&self) -> RepositoryResult<Vec<WeeklyEntry>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM defect_entry ORDER BY rowid", ENTRY_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map([], map_entry_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// 按 (周, 年, 类别) 查询条目（导出用），按 folio 排序
    ///
    /// 历史表中同一周可能被多次切换写入，只取最新世代
    pub fn list_entries(
        &self,
        week: WeekLabel,
        year: i32,
        category: Category,
        historical: bool,
    ) -> RepositoryResult<Vec<WeeklyEntry>> {
        let conn = self.get_conn()?;
        let table = entry_table(historical);
        let sql = format!(
            "SELECT {cols} FROM {table} \
             WHERE week_no = ?1 AND year = ?2 AND category = ?3 \
               AND generation_id = (SELECT MAX(generation_id) FROM {table} \
                                    WHERE week_no = ?1 AND year = ?2 AND category = ?3) \
             ORDER BY folio, rowid",
            cols = ENTRY_COLUMNS,
            table = table
        );
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(
                params![week.number(), year, category.as_str()],
                map_entry_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn count_current(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM defect_entry", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn count_history(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM defect_entry_history", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// 当前周的 (周, 年)；当前周为空时返回 None
    pub fn current_period(&self) -> RepositoryResult<Option<(WeekLabel, i32)>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT week_no, year FROM defect_entry ORDER BY year DESC, week_no DESC LIMIT 1",
        )?;
        let mut rows = stmt.query([])?;
        match rows.next()? {
            Some(row) => {
                let week = week_from_column(0, row.get(0)?)?;
                Ok(Some((week, row.get(1)?)))
            }
            None => Ok(None),
        }
    }

    /// 历史中出现过的年份（升序）
    pub fn distinct_history_years(&self, category: Option<Category>) -> RepositoryResult<Vec<i32>> {
        let conn = self.get_conn()?;
        let years = match category {
            Some(c) => {
                let mut stmt = conn.prepare(
                    "SELECT DISTINCT year FROM defect_entry_history WHERE category = ?1 ORDER BY year",
                )?;
                let rows = stmt
                    .query_map(params![c.as_str()], |row| row.get(0))?
                    .collect::<Result<Vec<i32>, _>>()?;
                rows
            }
            None => {
                let mut stmt =
                    conn.prepare("SELECT DISTINCT year FROM defect_entry_history ORDER BY year")?;
                let rows = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<i32>, _>>()?;
                rows
            }
        };
        Ok(years)
    }

    /// 历史中某年出现过的周（按周号升序）
    pub fn distinct_history_weeks(
        &self,
        year: i32,
        category: Option<Category>,
    ) -> RepositoryResult<Vec<WeekLabel>> {
        let conn = self.get_conn()?;
        let week_nos: Vec<i64> = match category {
            Some(c) => {
                let mut stmt = conn.prepare(
                    "SELECT DISTINCT week_no FROM defect_entry_history \
                     WHERE year = ?1 AND category = ?2 ORDER BY week_no",
                )?;
                let rows = stmt
                    .query_map(params![year, c.as_str()], |row| row.get(0))?
                    .collect::<Result<Vec<i64>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT DISTINCT week_no FROM defect_entry_history WHERE year = ?1 ORDER BY week_no",
                )?;
                let rows = stmt
                    .query_map(params![year], |row| row.get(0))?
                    .collect::<Result<Vec<i64>, _>>()?;
                rows
            }
        };

        week_nos
            .into_iter()
            .map(|n| week_from_column(0, n).map_err(RepositoryError::from))
            .collect()
    }
}
