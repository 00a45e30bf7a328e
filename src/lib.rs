// ==========================================
// 周缺陷 PPM 追踪系统 - 核心库
// ==========================================
// 流程: 上传 → 规范化 / 合并 / 分类 → 周切换（归档 + 替换）→ 帕累托 / 根因聚合
// 技术栈: Rust + SQLite
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 分类 / 聚合 / 周切换
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    ActionPlanEntry, Category, ClassificationRecord, DefectEntry, ParetoRow, RolloverReport,
    RootCauseRow, WeekLabel, WeeklyEntry,
};

// 引擎
pub use engine::{ClassificationIndex, ParetoAggregator, RolloverManager, RootCauseAggregator};

// API
pub use api::{AnnualApi, ApiError, ClassificationApi, PpmApi, UploadApi};
pub use app::AppState;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "周缺陷 PPM 追踪系统";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
