// ==========================================
// 周缺陷 PPM 追踪系统 - 周切换管理器
// ==========================================
// 单事务内完成:
//   0. 世代校验（expected_generation）
//   1. 当前周条目 → 历史（原样追加）
//   2. 清空当前周
//   3. 写入新周条目（周标签 + 年份 + 世代号，月份由报告日期派生）
//   4. 逐类别: 归档并清空聚合结果 → 重新计算帕累托 / 根因 → 写入
//   5. 记录世代
// 任一步失败整体回滚，切换前状态保持不变
// 红线: Engine 不拼 SQL（通过仓储 *_tx 函数访问）
// ==========================================

use crate::domain::{
    Category, CategoryRollupSummary, DefectEntry, RolloverGeneration, RolloverReport, WeekLabel,
    WeeklyEntry,
};
use crate::engine::pareto::ParetoAggregator;
use crate::engine::root_cause::RootCauseAggregator;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{AggregateRepository, RolloverRepository, WeeklyEntryRepository};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};

/// 周切换请求
#[derive(Debug, Clone)]
pub struct RolloverRequest {
    /// 已规范化、已分类的条目
    pub entries: Vec<DefectEntry>,
    pub week: WeekLabel,
    pub year: i32,
    /// 调用方看到的最新世代号；None 表示不校验
    pub expected_generation: Option<i64>,
    /// 切换当天（报告日期缺失时的回填值）
    pub today: NaiveDate,
}

// ==========================================
// RolloverManager - 周切换管理器
// ==========================================
pub struct RolloverManager {
    conn: Arc<Mutex<Connection>>,
    pareto: ParetoAggregator,
    root_cause: RootCauseAggregator,
}

impl RolloverManager {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            pareto: ParetoAggregator::new(),
            root_cause: RootCauseAggregator::new(),
        }
    }

    /// 执行周切换
    ///
    /// 持有连接锁直到事务结束：并发上传串行化，读方不会看到中间状态
    ///
    /// # 错误
    /// - `RepositoryError::OptimisticLockFailure`: 世代号与 expected_generation 不一致
    /// - 其他仓储错误: 事务已回滚
    #[instrument(skip(self, request), fields(
        week = %request.week,
        year = request.year,
        entries = request.entries.len()
    ))]
    pub fn execute(&self, request: RolloverRequest) -> RepositoryResult<RolloverReport> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        match self.run(&tx, request) {
            Ok(report) => {
                tx.commit()
                    .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
                info!(
                    generation_id = report.generation_id,
                    archived = report.archived_entries,
                    inserted = report.inserted_entries,
                    unclassified = report.unclassified_entries,
                    "周切换完成"
                );
                Ok(report)
            }
            Err(e) => {
                // tx 析构即回滚
                warn!(error = %e, "周切换失败，已回滚");
                Err(e)
            }
        }
    }

    fn run(&self, tx: &Transaction, request: RolloverRequest) -> RepositoryResult<RolloverReport> {
        let RolloverRequest {
            entries,
            week,
            year,
            expected_generation,
            today,
        } = request;

        // === 步骤 0: 世代校验 ===
        let current = RolloverRepository::current_generation_tx(tx)?;
        if let Some(expected) = expected_generation {
            if expected != current {
                return Err(RepositoryError::OptimisticLockFailure {
                    expected,
                    actual: current,
                });
            }
        }
        let generation_id = current + 1;
        let executed_at: DateTime<Utc> = Utc::now();

        // === 步骤 1-2: 归档并清空当前周 ===
        debug!("步骤 1: 归档当前周条目");
        let archived_entries =
            WeeklyEntryRepository::archive_current_tx(tx, generation_id, &executed_at.to_rfc3339())?;
        WeeklyEntryRepository::clear_current_tx(tx)?;

        // === 步骤 3: 写入新周 ===
        debug!("步骤 3: 写入新周条目");
        let installed: Vec<WeeklyEntry> = entries
            .into_iter()
            .map(|e| WeeklyEntry::install(e, week, year, generation_id, today))
            .collect();
        let unclassified_entries = installed
            .iter()
            .filter(|e| Category::parse(&e.category).is_none())
            .count();
        if unclassified_entries > 0 {
            warn!(
                unclassified = unclassified_entries,
                "存在未分类条目，不计入任何类别的聚合"
            );
        }
        let inserted_entries = WeeklyEntryRepository::insert_batch_tx(tx, &installed)?;

        // === 步骤 4: 逐类别重算聚合 ===
        let mut categories = Vec::with_capacity(Category::ALL.len());
        for category in Category::ALL {
            debug!(category = %category, "步骤 4: 重算类别聚合");
            AggregateRepository::archive_category_tx(tx, category)?;
            AggregateRepository::clear_category_tx(tx, category)?;

            let scoped = WeeklyEntryRepository::list_current_by_category_tx(tx, category)?;
            let pareto = self.pareto.aggregate(category, &scoped);
            let root_causes = self.root_cause.aggregate(category, &scoped);

            let pareto_rows = AggregateRepository::insert_pareto_tx(tx, generation_id, &pareto)?;
            let root_cause_rows =
                AggregateRepository::insert_root_causes_tx(tx, generation_id, &root_causes)?;

            categories.push(CategoryRollupSummary {
                category,
                entries: scoped.len(),
                total_qty: scoped.iter().map(|e| e.quantity).sum(),
                pareto_rows,
                root_cause_rows,
            });
        }

        // === 步骤 5: 记录世代 ===
        RolloverRepository::record_generation_tx(
            tx,
            &RolloverGeneration {
                generation_id,
                week,
                year,
                entry_count: inserted_entries,
                unclassified_count: unclassified_entries,
                executed_at,
            },
        )?;

        Ok(RolloverReport {
            generation_id,
            week,
            year,
            archived_entries,
            inserted_entries,
            unclassified_entries,
            categories,
            executed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{AggregateRepository, WeeklyEntryRepository};

    fn setup() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        Arc::new(Mutex::new(conn))
    }

    fn entry(defect: &str, cause: &str, part: &str, qty: f64, category: &str) -> DefectEntry {
        DefectEntry {
            folio: "R-1".to_string(),
            report_date: NaiveDate::from_ymd_opt(2025, 4, 9),
            employee_id: "10".to_string(),
            area: String::new(),
            sub_area: String::new(),
            shift: "1".to_string(),
            line: "L1".to_string(),
            defect: defect.to_string(),
            cause: cause.to_string(),
            part_number: part.to_string(),
            sequence: String::new(),
            quantity: qty,
            comments: String::new(),
            product_family: "F".to_string(),
            category: category.to_string(),
        }
    }

    fn request(entries: Vec<DefectEntry>, week: u32, expected: Option<i64>) -> RolloverRequest {
        RolloverRequest {
            entries,
            week: WeekLabel::new(week).unwrap(),
            year: 2025,
            expected_generation: expected,
            today: NaiveDate::from_ymd_opt(2025, 4, 10).unwrap(),
        }
    }

    #[test]
    fn test_rollover_installs_and_aggregates() {
        let conn = setup();
        let manager = RolloverManager::new(conn.clone());

        let report = manager
            .execute(request(
                vec![
                    entry("Mal Doblado", "A", "48VV123", 5.0, "Rooftop"),
                    entry("Mal Doblado", "B", "48VV123", 3.0, "rooftop"),
                    entry("Rayado", "C", "AH1", 2.0, "AHUS"),
                    entry("Golpe", "D", "ZZ9", 1.0, ""),
                ],
                15,
                Some(0),
            ))
            .unwrap();

        assert_eq!(report.generation_id, 1);
        assert_eq!(report.archived_entries, 0);
        assert_eq!(report.inserted_entries, 4);
        assert_eq!(report.unclassified_entries, 1);
        assert_eq!(report.categories.len(), 5);
        assert_eq!(report.categories[0].entries, 2);
        assert_eq!(report.categories[0].total_qty, 8.0);

        let aggregates = AggregateRepository::new(conn.clone());
        let week = WeekLabel::new(15).unwrap();
        let causes = aggregates
            .find_root_causes(Category::Rooftop, week, 2025, false)
            .unwrap();
        assert_eq!(causes.len(), 1);
        assert_eq!(causes[0].root_cause, "A / B");
        assert_eq!(causes[0].qty, 8.0);

        let pareto = aggregates.find_pareto(Category::Ahus, week, 2025, false).unwrap();
        assert_eq!(pareto.len(), 1);
        assert!((pareto[0].cumulative_pct - 100.0).abs() < 1e-9);
        assert!(aggregates
            .find_pareto(Category::Cdu, week, 2025, false)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_second_rollover_archives_previous_week() {
        let conn = setup();
        let manager = RolloverManager::new(conn.clone());

        manager
            .execute(request(vec![entry("Rayado", "C", "AH1", 2.0, "AHUS")], 15, None))
            .unwrap();
        let report = manager
            .execute(request(vec![entry("Golpe", "D", "AH2", 4.0, "AHUS")], 16, Some(1)))
            .unwrap();

        assert_eq!(report.generation_id, 2);
        assert_eq!(report.archived_entries, 1);

        let entries = WeeklyEntryRepository::new(conn.clone());
        assert_eq!(entries.count_current().unwrap(), 1);
        assert_eq!(entries.count_history().unwrap(), 1);

        let aggregates = AggregateRepository::new(conn.clone());
        let history = aggregates
            .find_pareto(Category::Ahus, WeekLabel::new(15).unwrap(), 2025, true)
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].defect, "Rayado");
    }

    #[test]
    fn test_stale_generation_is_rejected_without_changes() {
        let conn = setup();
        let manager = RolloverManager::new(conn.clone());
        manager
            .execute(request(vec![entry("Rayado", "C", "AH1", 2.0, "AHUS")], 15, None))
            .unwrap();

        let err = manager
            .execute(request(vec![entry("Golpe", "D", "AH2", 4.0, "AHUS")], 16, Some(0)))
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::OptimisticLockFailure { expected: 0, actual: 1 }
        ));

        let entries = WeeklyEntryRepository::new(conn.clone());
        let (week, _) = entries.current_period().unwrap().unwrap();
        assert_eq!(week.number(), 15);
        assert_eq!(RolloverRepository::new(conn).current_generation().unwrap(), 1);
    }
}
