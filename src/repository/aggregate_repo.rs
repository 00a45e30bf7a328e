// ==========================================
// 周缺陷 PPM 追踪系统 - 聚合结果数据仓储
// ==========================================
// 表: pareto_row / pareto_row_history
//     root_cause_row / root_cause_row_history
// 红线: Repository 不含聚合逻辑（计算在 engine 层完成）
// 约束: 历史表只追加；类别作为列存储，不按表区分
// ==========================================

use crate::domain::{ActionPlanEntry, Category, ParetoRow, RootCauseRow, WeekLabel};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::weekly_entry_repo::week_from_column;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::sync::{Arc, Mutex, MutexGuard};

const PARETO_COLUMNS: &str = "generation_id, category, week, week_no, year, defect, report_date, \
     month, total_qty, percentage, cumulative_pct";

const ROOT_CAUSE_COLUMNS: &str = "row_id, generation_id, category, item, week, week_no, year, \
     report_date, month, issue, root_cause, qty, actions_json, responsible, due_date, status";

fn pareto_table(historical: bool) -> &'static str {
    if historical {
        "pareto_row_history"
    } else {
        "pareto_row"
    }
}

fn root_cause_table(historical: bool) -> &'static str {
    if historical {
        "root_cause_row_history"
    } else {
        "root_cause_row"
    }
}

fn category_from_column(column: usize, value: String) -> rusqlite::Result<Category> {
    Category::parse(&value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            Type::Text,
            format!("未知类别: {}", value).into(),
        )
    })
}

fn map_pareto_row(row: &Row) -> rusqlite::Result<ParetoRow> {
    Ok(ParetoRow {
        category: category_from_column(1, row.get(1)?)?,
        week: week_from_column(3, row.get(3)?)?,
        year: row.get(4)?,
        defect: row.get(5)?,
        report_date: row.get(6)?,
        month: row.get(7)?,
        total_qty: row.get(8)?,
        percentage: row.get(9)?,
        cumulative_pct: row.get(10)?,
    })
}

fn map_root_cause_row(row: &Row) -> rusqlite::Result<RootCauseRow> {
    let actions_json: String = row.get(12)?;
    let actions: Vec<ActionPlanEntry> = serde_json::from_str(&actions_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(12, Type::Text, Box::new(e)))?;

    Ok(RootCauseRow {
        row_id: row.get(0)?,
        category: category_from_column(2, row.get(2)?)?,
        item: row.get(3)?,
        week: week_from_column(5, row.get(5)?)?,
        year: row.get(6)?,
        report_date: row.get(7)?,
        month: row.get(8)?,
        issue: row.get(9)?,
        root_cause: row.get(10)?,
        qty: row.get(11)?,
        actions,
    })
}

/// 行动计划首条 → 旧版汇总字段 (responsible, due_date, status)
fn legacy_summary(
    actions: &[ActionPlanEntry],
) -> (Option<String>, Option<String>, Option<String>) {
    match actions.first() {
        Some(first) => (
            Some(first.responsible.clone()),
            Some(first.due_date.clone()),
            Some(first.status.clone()),
        ),
        None => (None, None, None),
    }
}

// ==========================================
// AggregateRepository - 聚合结果仓储
// ==========================================
pub struct AggregateRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AggregateRepository {
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

    /// 将某类别的当前聚合结果追加到历史表
    ///
    /// # 返回
    /// - (帕累托行数, 根因行数)
    pub fn archive_category_tx(
        tx: &Transaction,
        category: Category,
    ) -> RepositoryResult<(usize, usize)> {
        let pareto = tx.execute(
            &format!(
                "INSERT INTO pareto_row_history ({cols}) SELECT {cols} FROM pareto_row WHERE category = ?1",
                cols = PARETO_COLUMNS
            ),
            params![category.as_str()],
        )?;
        let root_causes = tx.execute(
            &format!(
                "INSERT INTO root_cause_row_history ({cols}) SELECT {cols} FROM root_cause_row WHERE category = ?1",
                cols = ROOT_CAUSE_COLUMNS
            ),
            params![category.as_str()],
        )?;
        Ok((pareto, root_causes))
    }

    /// 清空某类别的当前聚合结果
    pub fn clear_category_tx(tx: &Transaction, category: Category) -> RepositoryResult<()> {
        tx.execute(
            "DELETE FROM pareto_row WHERE category = ?1",
            params![category.as_str()],
        )?;
        tx.execute(
            "DELETE FROM root_cause_row WHERE category = ?1",
            params![category.as_str()],
        )?;
        Ok(())
    }

    pub fn insert_pareto_tx(
        tx: &Transaction,
        generation_id: i64,
        rows: &[ParetoRow],
    ) -> RepositoryResult<usize> {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO pareto_row ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            PARETO_COLUMNS
        ))?;

        for row in rows {
            stmt.execute(params![
                generation_id,
                row.category.as_str(),
                row.week.to_string(),
                row.week.number(),
                row.year,
                row.defect,
                row.report_date,
                row.month,
                row.total_qty,
                row.percentage,
                row.cumulative_pct,
            ])?;
        }
        Ok(rows.len())
    }

    pub fn insert_root_causes_tx(
        tx: &Transaction,
        generation_id: i64,
        rows: &[RootCauseRow],
    ) -> RepositoryResult<usize> {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO root_cause_row ({}) VALUES \
             (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            ROOT_CAUSE_COLUMNS
        ))?;

        for row in rows {
            let actions_json = serde_json::to_string(&row.actions)?;
            let (responsible, due_date, status) = legacy_summary(&row.actions);
            stmt.execute(params![
                row.row_id,
                generation_id,
                row.category.as_str(),
                row.item,
                row.week.to_string(),
                row.week.number(),
                row.year,
                row.report_date,
                row.month,
                row.issue,
                row.root_cause,
                row.qty,
                actions_json,
                responsible,
                due_date,
                status,
            ])?;
        }
        Ok(rows.len())
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 帕累托读取：按累计百分比升序，同值按缺陷名升序
    ///
    /// 历史集中同一 (类别, 周, 年) 可能被多次归档，只取最新世代
    pub fn find_pareto(
        &self,
        category: Category,
        week: WeekLabel,
        year: i32,
        historical: bool,
    ) -> RepositoryResult<Vec<ParetoRow>> {
        let conn = self.get_conn()?;
        let table = pareto_table(historical);
        let sql = format!(
            "SELECT {cols} FROM {table} \
             WHERE category = ?1 AND year = ?2 AND week_no = ?3 \
               AND generation_id = (SELECT MAX(generation_id) FROM {table} \
                                    WHERE category = ?1 AND year = ?2 AND week_no = ?3) \
             ORDER BY cumulative_pct ASC, defect ASC",
            cols = PARETO_COLUMNS,
            table = table
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![category.as_str(), year, week.number()],
                map_pareto_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 根因读取：按 item 升序
    pub fn find_root_causes(
        &self,
        category: Category,
        week: WeekLabel,
        year: i32,
        historical: bool,
    ) -> RepositoryResult<Vec<RootCauseRow>> {
        let conn = self.get_conn()?;
        let table = root_cause_table(historical);
        let sql = format!(
            "SELECT {cols} FROM {table} \
             WHERE category = ?1 AND year = ?2 AND week_no = ?3 \
               AND generation_id = (SELECT MAX(generation_id) FROM {table} \
                                    WHERE category = ?1 AND year = ?2 AND week_no = ?3) \
             ORDER BY item ASC",
            cols = ROOT_CAUSE_COLUMNS,
            table = table
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![category.as_str(), year, week.number()],
                map_root_cause_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 当前集中的单条根因行
    pub fn find_live_root_cause(
        &self,
        category: Category,
        row_id: &str,
    ) -> RepositoryResult<Option<RootCauseRow>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM root_cause_row WHERE row_id = ?1 AND category = ?2",
            ROOT_CAUSE_COLUMNS
        );
        let row = conn
            .query_row(&sql, params![row_id, category.as_str()], map_root_cause_row)
            .optional()?;
        Ok(row)
    }

    pub fn count_rows(&self, historical: bool) -> RepositoryResult<(usize, usize)> {
        let conn = self.get_conn()?;
        let pareto: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", pareto_table(historical)),
            [],
            |row| row.get(0),
        )?;
        let root_causes: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", root_cause_table(historical)),
            [],
            |row| row.get(0),
        )?;
        Ok((pareto as usize, root_causes as usize))
    }

    // ==========================================
    // 行动计划写入（仅当前集）
    // ==========================================

    /// 整体替换行动计划列表，并刷新旧版汇总字段
    pub fn replace_actions(
        &self,
        category: Category,
        row_id: &str,
        actions: &[ActionPlanEntry],
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let actions_json = serde_json::to_string(actions)?;
        let (responsible, due_date, status) = legacy_summary(actions);

        let affected = conn.execute(
            "UPDATE root_cause_row
             SET actions_json = ?1, responsible = ?2, due_date = ?3, status = ?4
             WHERE row_id = ?5 AND category = ?6",
            params![
                actions_json,
                responsible,
                due_date,
                status,
                row_id,
                category.as_str()
            ],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "RootCauseRow".to_string(),
                id: row_id.to_string(),
            });
        }
        Ok(())
    }

    /// 更新首条行动的状态（及旧版 status 字段）
    pub fn update_status(
        &self,
        category: Category,
        row_id: &str,
        status: &str,
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let actions_json: Option<String> = tx
            .query_row(
                "SELECT actions_json FROM root_cause_row WHERE row_id = ?1 AND category = ?2",
                params![row_id, category.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        let Some(actions_json) = actions_json else {
            return Err(RepositoryError::NotFound {
                entity: "RootCauseRow".to_string(),
                id: row_id.to_string(),
            });
        };

        let mut actions: Vec<ActionPlanEntry> = serde_json::from_str(&actions_json)?;
        if let Some(first) = actions.first_mut() {
            first.status = status.to_string();
        }

        tx.execute(
            "UPDATE root_cause_row SET actions_json = ?1, status = ?2
             WHERE row_id = ?3 AND category = ?4",
            params![
                serde_json::to_string(&actions)?,
                status,
                row_id,
                category.as_str()
            ],
        )?;

        tx.commit()?;
        Ok(())
    }
}
