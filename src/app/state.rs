// ==========================================
// 周缺陷 PPM 追踪系统 - 应用状态
// ==========================================
// 职责: 管理共享数据库连接和各 API 实例
// ==========================================

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{AnnualApi, ClassificationApi, PpmApi, UploadApi};
use crate::config::ConfigManager;
use crate::db;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "PPM_TRACKER_DB";

/// 应用状态
///
/// 所有 API 共享同一个连接；周切换期间持有连接锁
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 上传（周切换）API
    pub upload_api: Arc<UploadApi>,

    /// 帕累托 / 根因 / 行动计划 API
    pub ppm_api: Arc<PpmApi>,

    /// 年度 PPM API
    pub annual_api: Arc<AnnualApi>,

    /// 分类参照 API
    pub classification_api: Arc<ClassificationApi>,

    /// 配置管理
    pub config_manager: Arc<ConfigManager>,

    conn: Arc<Mutex<Connection>>,
}

impl AppState {
    /// 打开（必要时创建）数据库并装配所有 API
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = db::open_shared_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;

        Ok(Self::from_connection(db_path, conn))
    }

    /// 基于已有连接装配（连接需已建库）
    pub fn from_connection(db_path: String, conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            db_path,
            upload_api: Arc::new(UploadApi::new(conn.clone())),
            ppm_api: Arc::new(PpmApi::new(conn.clone())),
            annual_api: Arc::new(AnnualApi::new(conn.clone())),
            classification_api: Arc::new(ClassificationApi::new(conn.clone())),
            config_manager: Arc::new(ConfigManager::from_connection(conn.clone())),
            conn,
        }
    }

    /// 共享连接（供测试与维护脚本使用）
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }
}

/// 默认数据库路径
///
/// 优先级: 环境变量 PPM_TRACKER_DB > <data_dir>/ppm-tracker/ppm_tracker.db > ./ppm_tracker.db
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./ppm_tracker.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("ppm-tracker");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("ppm_tracker.db");
        }
    }

    path.to_string_lossy().to_string()
}
