// ==========================================
// 周缺陷 PPM 追踪系统 - 应用层
// ==========================================
// 职责: 共享连接与 API 实例的装配
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState, DB_PATH_ENV};
