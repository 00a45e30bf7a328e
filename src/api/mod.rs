// ==========================================
// 周缺陷 PPM 追踪系统 - API 层
// ==========================================
// 职责: 对外业务接口（上传 / 读取 / 行动计划 / 年度 PPM / 分类参照）
// ==========================================

pub mod annual_api;
pub mod classification_api;
pub mod error;
pub mod ppm_api;
pub mod upload_api;

// 重导出核心类型
pub use annual_api::AnnualApi;
pub use classification_api::ClassificationApi;
pub use error::{ApiError, ApiResult};
pub use ppm_api::{CurrentWeek, ParetoView, ParetoViewRow, PpmApi, EXPORT_HEADERS};
pub use upload_api::{PreviewResponse, SaveWeekResponse, UploadApi};
