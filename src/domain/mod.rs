// ==========================================
// 周缺陷 PPM 追踪系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod aggregate;
pub mod annual;
pub mod defect;
pub mod types;

// 重导出核心类型
pub use aggregate::{
    ActionPlanEntry, CategoryRollupSummary, ParetoRow, RolloverGeneration, RolloverReport,
    RootCauseRow,
};
pub use annual::{AnnualPpmRow, AnnualPpmUpdate};
pub use defect::{
    Classification, ClassificationRecord, DefectCandidate, DefectEntry, EntryKey,
    NormalizeStats, PreparedBatch, WeeklyEntry,
};
pub use types::{month_name, month_number, Category, WeekLabel, MONTH_NAMES};
