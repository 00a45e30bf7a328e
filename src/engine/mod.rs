// ==========================================
// 周缺陷 PPM 追踪系统 - 引擎层
// ==========================================
// 职责: 分类查找、帕累托 / 根因聚合、周切换、PPM 计算
// 红线: Engine 不拼 SQL
// ==========================================

pub mod classification;
pub mod pareto;
pub mod ppm;
pub mod rollover;
pub mod root_cause;

// 重导出核心引擎
pub use classification::ClassificationIndex;
pub use pareto::ParetoAggregator;
pub use ppm::compute_ppm;
pub use rollover::{RolloverManager, RolloverRequest};
pub use root_cause::{RootCauseAggregator, ROOT_CAUSE_SEPARATOR};
