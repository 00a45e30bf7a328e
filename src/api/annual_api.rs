// ==========================================
// 周缺陷 PPM 追踪系统 - 年度 PPM API
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::{AnnualPpmRow, AnnualPpmUpdate};
use crate::engine::ppm::{annual_months, resolve_update};
use crate::repository::AnnualPpmRepository;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tracing::info;

pub struct AnnualApi {
    repo: AnnualPpmRepository,
    config: ConfigManager,
}

impl AnnualApi {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            repo: AnnualPpmRepository::new(conn.clone()),
            config: ConfigManager::from_connection(conn),
        }
    }

    /// 年度不存在时以配置目标值初始化 12 个月；返回按月排序的整年数据
    pub fn ensure_year(&self, year: i32) -> ApiResult<Vec<AnnualPpmRow>> {
        if self.repo.count_year(year)? == 0 {
            let target = self.config.get_annual_ppm_target()?;
            let inserted = self.repo.seed_year(year, &annual_months(), target)?;
            info!(year, inserted, target, "年度 PPM 已初始化");
        }
        Ok(self.repo.list_year(year)?)
    }

    /// 写入月度逃逸 / 发运件数并重算 PPM
    pub fn update_months(
        &self,
        year: i32,
        updates: Vec<AnnualPpmUpdate>,
    ) -> ApiResult<Vec<AnnualPpmRow>> {
        let resolved = updates
            .iter()
            .map(resolve_update)
            .collect::<Result<Vec<_>, String>>()
            .map_err(|month| ApiError::InvalidInput(format!("未知月份: {}", month)))?;

        let updated = self.repo.update_months(year, &resolved)?;
        info!(year, updated, "年度 PPM 已更新");
        Ok(self.repo.list_year(year)?)
    }
}
