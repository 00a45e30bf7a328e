// ==========================================
// 周缺陷 PPM 追踪系统 - PPM 读取 / 行动计划 API
// ==========================================
// 职责: 帕累托与根因读取、行动计划编辑、周/年列表、条目导出
// 约束: 只读取聚合结果，不参与计算；行动计划只能编辑当前集
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::{ActionPlanEntry, Category, RootCauseRow, WeekLabel};
use crate::i18n::t;
use crate::repository::{AggregateRepository, WeeklyEntryRepository};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument};

/// 导出列（与上传模板一致）
pub const EXPORT_HEADERS: [&str; 18] = [
    "Folio Reorden",
    "Empleado",
    "Area",
    "SubArea",
    "Turno",
    "Linea",
    "Defecto",
    "Causa",
    "Numero de Parte",
    "Secuencia",
    "Cantidad",
    "Producto",
    "Comentarios",
    "Tipo",
    "Fecha",
    "Semana",
    "Mes",
    "Año",
];

/// 帕累托视图行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParetoViewRow {
    pub defect: String,
    pub frequency: f64,
    pub percentage: f64,
    /// 累计百分比（保留 2 位小数）
    pub cumulative_pct: f64,
    pub report_date: NaiveDate,
    pub month: String,
}

/// 帕累托视图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParetoView {
    pub category: Category,
    pub week: WeekLabel,
    pub year: i32,
    pub total_qty: f64,
    pub rows: Vec<ParetoViewRow>,
}

/// 当前周
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentWeek {
    pub week: WeekLabel,
    pub year: i32,
}

/// PPM API
pub struct PpmApi {
    entry_repo: WeeklyEntryRepository,
    aggregate_repo: AggregateRepository,
}

impl PpmApi {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            entry_repo: WeeklyEntryRepository::new(conn.clone()),
            aggregate_repo: AggregateRepository::new(conn),
        }
    }

    // ==========================================
    // 聚合读取
    // ==========================================

    pub fn get_pareto(
        &self,
        category: Category,
        week: WeekLabel,
        year: i32,
        historical: bool,
    ) -> ApiResult<ParetoView> {
        let rows = self
            .aggregate_repo
            .find_pareto(category, week, year, historical)?;
        let total_qty = rows.iter().map(|r| r.total_qty).sum();

        Ok(ParetoView {
            category,
            week,
            year,
            total_qty,
            rows: rows
                .into_iter()
                .map(|r| ParetoViewRow {
                    defect: r.defect,
                    frequency: r.total_qty,
                    percentage: r.percentage,
                    cumulative_pct: round2(r.cumulative_pct),
                    report_date: r.report_date,
                    month: r.month,
                })
                .collect(),
        })
    }

    pub fn get_action_plan(
        &self,
        category: Category,
        week: WeekLabel,
        year: i32,
        historical: bool,
    ) -> ApiResult<Vec<RootCauseRow>> {
        Ok(self
            .aggregate_repo
            .find_root_causes(category, week, year, historical)?)
    }

    // ==========================================
    // 行动计划编辑
    // ==========================================

    /// 整体替换行动计划
    ///
    /// 每条行动的 4 个字段去空白后均不能为空
    #[instrument(skip(self, actions), fields(count = actions.len()))]
    pub fn update_action_plan(
        &self,
        category: Category,
        row_id: &str,
        actions: Vec<ActionPlanEntry>,
    ) -> ApiResult<String> {
        let actions: Vec<ActionPlanEntry> = actions.iter().map(ActionPlanEntry::trimmed).collect();
        if actions.iter().any(|a| !a.is_complete()) {
            return Err(ApiError::ValidationError(t("action_plan.fields_required")));
        }

        self.aggregate_repo
            .replace_actions(category, row_id, &actions)?;
        info!(row_id, "行动计划已替换");
        Ok(t("action_plan.updated"))
    }

    pub fn update_status(&self, category: Category, row_id: &str, status: &str) -> ApiResult<String> {
        let status = status.trim();
        if status.is_empty() {
            return Err(ApiError::ValidationError(t("action_plan.fields_required")));
        }
        self.aggregate_repo.update_status(category, row_id, status)?;
        Ok(t("action_plan.status_updated"))
    }

    // ==========================================
    // 周 / 年列表
    // ==========================================

    pub fn list_years(&self, category: Option<Category>) -> ApiResult<Vec<i32>> {
        Ok(self.entry_repo.distinct_history_years(category)?)
    }

    pub fn list_weeks(&self, year: i32, category: Option<Category>) -> ApiResult<Vec<WeekLabel>> {
        Ok(self.entry_repo.distinct_history_weeks(year, category)?)
    }

    pub fn current_week(&self) -> ApiResult<Option<CurrentWeek>> {
        Ok(self
            .entry_repo
            .current_period()?
            .map(|(week, year)| CurrentWeek { week, year }))
    }

    // ==========================================
    // 导出
    // ==========================================

    /// 导出条目为 CSV（按 folio 排序），返回写出的行数
    #[instrument(skip(self, out_path), fields(out = %out_path.display()))]
    pub fn export_entries(
        &self,
        week: WeekLabel,
        year: i32,
        category: Category,
        historical: bool,
        out_path: &Path,
    ) -> ApiResult<usize> {
        let entries = self
            .entry_repo
            .list_entries(week, year, category, historical)?;

        let mut writer = csv::Writer::from_path(out_path).map_err(export_error)?;
        writer.write_record(EXPORT_HEADERS).map_err(export_error)?;
        for e in &entries {
            let record = [
                e.folio.clone(),
                e.employee_id.clone(),
                e.area.clone(),
                e.sub_area.clone(),
                e.shift.clone(),
                e.line.clone(),
                e.defect.clone(),
                e.cause.clone(),
                e.part_number.clone(),
                e.sequence.clone(),
                format_quantity(e.quantity),
                e.product_family.clone(),
                e.comments.clone(),
                e.category.clone(),
                e.report_date.format("%Y-%m-%d").to_string(),
                e.week.to_string(),
                e.month.clone(),
                e.year.to_string(),
            ];
            writer
                .write_record(&record)
                .map_err(export_error)?;
        }
        writer
            .flush()
            .map_err(|e| ApiError::InternalError(format!("导出写入失败: {}", e)))?;

        info!(rows = entries.len(), "条目导出完成");
        Ok(entries.len())
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 整数数量不带小数点输出
fn format_quantity(qty: f64) -> String {
    if qty.fract() == 0.0 {
        format!("{}", qty as i64)
    } else {
        qty.to_string()
    }
}

fn export_error(err: csv::Error) -> ApiError {
    ApiError::InternalError(format!("导出写入失败: {}", err))
}
