// ==========================================
// 周缺陷 PPM 追踪系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
//       *_tx 关联函数只在周切换事务内使用
// ==========================================

pub mod aggregate_repo;
pub mod annual_repo;
pub mod classification_repo;
pub mod error;
pub mod rollover_repo;
pub mod weekly_entry_repo;

// 重导出核心仓储
pub use aggregate_repo::AggregateRepository;
pub use annual_repo::{AnnualPpmRepository, MonthActuals};
pub use classification_repo::ClassificationRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use rollover_repo::RolloverRepository;
pub use weekly_entry_repo::WeeklyEntryRepository;
