// ==========================================
// 周缺陷 PPM 追踪系统 - 上传 API
// ==========================================
// 职责: 文件预览（解析 + 规范化 + 分类，不落库）与周切换保存
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::{DefectCandidate, DefectEntry, PreparedBatch, RolloverReport, WeekLabel};
use crate::engine::{RolloverManager, RolloverRequest};
use crate::i18n::{t, t_with_args};
use crate::importer::{
    DefectImporter, DefectImporterImpl, EntryNormalizerImpl, FieldMapperImpl,
    UniversalFileParser,
};
use crate::repository::error::RepositoryError;
use crate::repository::{ClassificationRepository, RolloverRepository};
use chrono::{Datelike, Local, NaiveDate};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument, warn};

/// 预览响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewResponse {
    pub batch: PreparedBatch,
    /// 未分类条目数（不计入任何类别的聚合）
    pub unclassified_entries: usize,
}

/// 保存（周切换）响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveWeekResponse {
    pub report: RolloverReport,
    pub message: String,
}

/// 上传 API
pub struct UploadApi {
    importer: DefectImporterImpl<ConfigManager>,
    rollover: RolloverManager,
    rollover_repo: RolloverRepository,
}

impl UploadApi {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        let importer = DefectImporterImpl::new(
            Arc::new(ClassificationRepository::new(conn.clone())),
            ConfigManager::from_connection(conn.clone()),
            Box::new(UniversalFileParser),
            Box::new(FieldMapperImpl),
            Box::new(EntryNormalizerImpl),
        );
        Self {
            importer,
            rollover: RolloverManager::new(conn.clone()),
            rollover_repo: RolloverRepository::new(conn),
        }
    }

    /// 预览上传文件（不落库）
    pub async fn preview_file(&self, file_path: &str) -> ApiResult<PreviewResponse> {
        let path = Path::new(file_path);
        if !path.exists() {
            return Err(ApiError::NotFound(t_with_args(
                "import.file_not_found",
                &[("path", file_path)],
            )));
        }

        let batch = self.importer.prepare_file(path).await?;
        let unclassified_entries = batch
            .entries
            .iter()
            .filter(|e| e.category().is_none())
            .count();

        Ok(PreviewResponse {
            batch,
            unclassified_entries,
        })
    }

    /// 最新已提交的世代号（0 表示从未切换）
    pub fn current_generation(&self) -> ApiResult<i64> {
        Ok(self.rollover_repo.current_generation()?)
    }

    /// 保存为新的一周（年份取本地时钟）
    ///
    /// 条目在切换前重新走一遍规范化与分类：缺料号的行被跳过，
    /// 缺陷别名与料号前缀按配置改写，分类以参照表为准
    ///
    /// # 参数
    /// - entries: 预览得到的条目
    /// - week: 周次（正整数）
    /// - expected_generation: 调用方看到的世代号；Some 时不一致则拒绝
    pub async fn save_week(
        &self,
        entries: Vec<DefectEntry>,
        week: u32,
        expected_generation: Option<i64>,
    ) -> ApiResult<SaveWeekResponse> {
        self.save_week_on(entries, week, expected_generation, Local::now().date_naive())
            .await
    }

    /// 以指定日期执行保存（年份与缺失报告日期均取 today）
    #[instrument(skip(self, entries), fields(count = entries.len()))]
    pub async fn save_week_on(
        &self,
        entries: Vec<DefectEntry>,
        week: u32,
        expected_generation: Option<i64>,
        today: NaiveDate,
    ) -> ApiResult<SaveWeekResponse> {
        if entries.is_empty() {
            return Err(ApiError::InvalidInput(t("upload.empty_batch")));
        }
        let week = WeekLabel::new(week)
            .ok_or_else(|| ApiError::InvalidInput(t("upload.week_required")))?;
        let year = today.year();

        let candidates: Vec<DefectCandidate> = entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| DefectCandidate::from_entry(entry, idx + 1))
            .collect();
        let batch = self.importer.prepare_candidates(candidates).await?;
        if batch.entries.is_empty() {
            return Err(ApiError::InvalidInput(t("upload.empty_batch")));
        }

        let request = RolloverRequest {
            entries: batch.entries,
            week,
            year,
            expected_generation,
            today,
        };

        let report = self.rollover.execute(request).map_err(|e| match e {
            RepositoryError::OptimisticLockFailure { .. } => ApiError::from(e),
            other => {
                warn!(error = %other, "周切换失败");
                ApiError::RolloverAborted(t_with_args(
                    "upload.rollover_aborted",
                    &[("reason", &other.to_string())],
                ))
            }
        })?;

        let message = t_with_args(
            "upload.saved",
            &[
                ("count", &report.inserted_entries.to_string()),
                ("week", &week.to_string()),
                ("year", &year.to_string()),
            ],
        );
        info!(generation_id = report.generation_id, "{}", message);

        Ok(SaveWeekResponse { report, message })
    }

    /// 预览 + 保存
    pub async fn upload_file(
        &self,
        file_path: &str,
        week: u32,
        expected_generation: Option<i64>,
    ) -> ApiResult<SaveWeekResponse> {
        let preview = self.preview_file(file_path).await?;
        self.save_week(preview.batch.entries, week, expected_generation)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::tests::LOCALE_TEST_LOCK;

    fn api() -> UploadApi {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        UploadApi::new(Arc::new(Mutex::new(conn)))
    }

    fn entry() -> DefectEntry {
        DefectEntry {
            folio: "R-1".to_string(),
            report_date: None,
            employee_id: String::new(),
            area: String::new(),
            sub_area: String::new(),
            shift: String::new(),
            line: String::new(),
            defect: "Rayado".to_string(),
            cause: "C".to_string(),
            part_number: "AH1".to_string(),
            sequence: String::new(),
            quantity: 2.0,
            comments: String::new(),
            product_family: "Air".to_string(),
            category: "AHUS".to_string(),
        }
    }

    #[tokio::test]
    async fn test_save_week_validates_input() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        crate::i18n::set_locale("es");
        let api = api();

        let err = api.save_week(Vec::new(), 5, None).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(ref m) if m == "No hay datos para guardar"));

        let err = api.save_week(vec![entry()], 0, None).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
        assert_eq!(api.current_generation().unwrap(), 0);

        crate::i18n::set_locale("zh-CN");
    }

    #[tokio::test]
    async fn test_save_week_uses_today_for_year_and_missing_date() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        crate::i18n::set_locale("en");
        let api = api();
        let today = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap();

        let response = api
            .save_week_on(vec![entry()], 1, Some(0), today)
            .await
            .unwrap();
        assert_eq!(response.report.year, 2024);
        assert_eq!(response.report.generation_id, 1);
        assert_eq!(
            response.message,
            "Data saved: 1 records in Semana 1, year 2024"
        );

        let err = api
            .save_week_on(vec![entry()], 2, Some(0), today)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::OptimisticLockFailure(_)));

        crate::i18n::set_locale("zh-CN");
    }

    #[tokio::test]
    async fn test_save_week_rejects_batch_without_part_numbers() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        crate::i18n::set_locale("es");
        let api = api();

        let mut blank = entry();
        blank.part_number = "  ".to_string();
        let err = api
            .save_week_on(vec![blank], 3, None, NaiveDate::from_ymd_opt(2025, 1, 17).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(ref m) if m == "No hay datos para guardar"));
        assert_eq!(api.current_generation().unwrap(), 0);

        crate::i18n::set_locale("zh-CN");
    }

    #[tokio::test]
    async fn test_preview_missing_file() {
        let api = api();
        let err = api.preview_file("/no/such/file.csv").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
