// ==========================================
// 周缺陷 PPM 追踪系统 - 聚合结果领域模型
// ==========================================
// 职责: 帕累托行 / 根因行 / 行动计划 / 周切换报告
// ==========================================

use crate::domain::types::{Category, WeekLabel};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ParetoRow - 帕累托行
// ==========================================
// 不变量: 同一 (week, year) 下 percentage 之和为 1（总量为 0 时全为 0）
//         按 percentage 降序读取时 cumulative_pct 单调不减，末行约为 100
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParetoRow {
    pub category: Category,
    pub week: WeekLabel,
    pub year: i32,
    pub defect: String,
    pub report_date: NaiveDate, // 组内最大报告日期
    pub month: String,          // 由 report_date 派生
    pub total_qty: f64,
    pub percentage: f64,     // 0..1
    pub cumulative_pct: f64, // 0..100
}

// ==========================================
// RootCauseRow - 根因汇总行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootCauseRow {
    pub row_id: String,
    pub category: Category,
    pub item: u32,
    pub week: WeekLabel,
    pub year: i32,
    pub report_date: NaiveDate,
    pub month: String,
    pub issue: String,
    pub root_cause: String,
    pub qty: f64,
    pub actions: Vec<ActionPlanEntry>,
}

// ==========================================
// ActionPlanEntry - 行动计划条目
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionPlanEntry {
    pub action: String,
    pub responsible: String,
    pub due_date: String,
    pub status: String,
}

impl ActionPlanEntry {
    /// 默认状态（新建行动）
    pub const STATUS_IN_PROGRESS: &'static str = "En proceso";
    pub const STATUS_COMPLETED: &'static str = "Completado";
    pub const STATUS_CANCELED: &'static str = "Cancelado";

    /// TRIM 所有字段
    pub fn trimmed(&self) -> Self {
        Self {
            action: self.action.trim().to_string(),
            responsible: self.responsible.trim().to_string(),
            due_date: self.due_date.trim().to_string(),
            status: self.status.trim().to_string(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.action.is_empty()
            && !self.responsible.is_empty()
            && !self.due_date.is_empty()
            && !self.status.is_empty()
    }
}

// ==========================================
// 周切换请求 / 报告
// ==========================================

/// 单类别汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRollupSummary {
    pub category: Category,
    pub entries: usize,
    pub total_qty: f64,
    pub pareto_rows: usize,
    pub root_cause_rows: usize,
}

/// 周切换报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolloverReport {
    pub generation_id: i64,
    pub week: WeekLabel,
    pub year: i32,
    pub archived_entries: usize,
    pub inserted_entries: usize,
    pub unclassified_entries: usize,
    pub categories: Vec<CategoryRollupSummary>,
    pub executed_at: DateTime<Utc>,
}

/// 世代记录（rollover_generation 表）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolloverGeneration {
    pub generation_id: i64,
    pub week: WeekLabel,
    pub year: i32,
    pub entry_count: usize,
    pub unclassified_count: usize,
    pub executed_at: DateTime<Utc>,
}
