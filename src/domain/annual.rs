// ==========================================
// 周缺陷 PPM 追踪系统 - 年度 PPM 领域模型
// ==========================================

use serde::{Deserialize, Serialize};

/// 年度 PPM 月度行（annual_ppm 表）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualPpmRow {
    pub year: i32,
    pub month_no: u32,
    pub month: String,
    pub target: i64,
    pub escapes: Option<i64>,  // 逃逸件数
    pub shipped: Option<i64>,  // 发运件数
    pub ppm: Option<i64>,
}

/// 月度实绩更新
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualPpmUpdate {
    pub month: String,
    pub escapes: Option<i64>,
    pub shipped: Option<i64>,
}
