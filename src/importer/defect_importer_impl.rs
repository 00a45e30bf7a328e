// ==========================================
// 周缺陷 PPM 追踪系统 - 缺陷导入器实现
// ==========================================
// 职责: 文件 → 预处理批次（不落库）
// 流程: 解析 → 列校验 → 映射 → 规范化/合并 → 分类
// ==========================================

use crate::config::NormalizeConfigReader;
use crate::domain::{DefectCandidate, PreparedBatch};
use crate::engine::ClassificationIndex;
use crate::importer::data_cleaner::NormalizeRules;
use crate::importer::defect_importer_trait::{
    DefectImporter, EntryNormalizer, FieldMapper, FileParser,
};
use crate::importer::error::ImportResult;
use crate::repository::ClassificationRepository;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

// ==========================================
// DefectImporterImpl - 缺陷导入器实现
// ==========================================
pub struct DefectImporterImpl<C>
where
    C: NormalizeConfigReader,
{
    // 分类参照
    classification_repo: Arc<ClassificationRepository>,

    // 配置读取器
    config: C,

    // 导入组件
    file_parser: Box<dyn FileParser>,
    field_mapper: Box<dyn FieldMapper>,
    normalizer: Box<dyn EntryNormalizer>,
}

impl<C> DefectImporterImpl<C>
where
    C: NormalizeConfigReader,
{
    pub fn new(
        classification_repo: Arc<ClassificationRepository>,
        config: C,
        file_parser: Box<dyn FileParser>,
        field_mapper: Box<dyn FieldMapper>,
        normalizer: Box<dyn EntryNormalizer>,
    ) -> Self {
        Self {
            classification_repo,
            config,
            file_parser,
            field_mapper,
            normalizer,
        }
    }

    async fn load_rules(&self) -> ImportResult<NormalizeRules> {
        Ok(NormalizeRules {
            defect_aliases: self.config.get_defect_aliases().await?,
            part_prefix_fix: self.config.get_part_prefix_fix().await?,
        })
    }
}

#[async_trait]
impl<C> DefectImporter for DefectImporterImpl<C>
where
    C: NormalizeConfigReader + Send + Sync,
{
    #[instrument(skip(self, file_path), fields(file = %file_path.display()))]
    async fn prepare_file(&self, file_path: &Path) -> ImportResult<PreparedBatch> {
        info!("开始解析上传文件");

        // === 步骤 1: 解析文件 ===
        debug!("步骤 1: 解析文件");
        let raw_rows = self
            .file_parser
            .parse_to_raw_records(file_path)
            .map_err(|e| {
                error!(error = %e, "文件解析失败");
                e
            })?;
        info!(total_rows = raw_rows.len(), "文件解析完成");

        // === 步骤 2: 列校验 + 字段映射 ===
        debug!("步骤 2: 字段映射");
        if let Some(first) = raw_rows.first() {
            let headers: Vec<String> = first.keys().cloned().collect();
            self.field_mapper.validate_headers(&headers)?;
        }

        let mut candidates = Vec::with_capacity(raw_rows.len());
        for (idx, row) in raw_rows.into_iter().enumerate() {
            // 表头占第 1 行
            let row_number = idx + 2;
            match self.field_mapper.map_to_candidate(row, row_number) {
                Ok(candidate) => candidates.push(candidate),
                Err(e) => warn!(row_number, error = %e, "字段映射失败，跳过该行"),
            }
        }

        self.prepare_candidates(candidates).await
    }

    #[instrument(skip(self, candidates), fields(count = candidates.len()))]
    async fn prepare_candidates(
        &self,
        candidates: Vec<DefectCandidate>,
    ) -> ImportResult<PreparedBatch> {
        // === 步骤 3: 规范化与合并 ===
        debug!("步骤 3: 规范化与合并");
        let rules = self.load_rules().await?;
        let (mut entries, stats) = self.normalizer.normalize(candidates, &rules);
        info!(
            rows_read = stats.rows_read,
            skipped = stats.skipped_missing_part,
            merged = stats.merged_duplicates,
            entries = entries.len(),
            "规范化完成"
        );

        // === 步骤 4: 分类（每个料号只查一次） ===
        debug!("步骤 4: 分类查找");
        let index = ClassificationIndex::new(self.classification_repo.list_all()?);
        let resolved = index.resolve_batch(entries.iter().map(|e| e.part_number.as_str()));

        let mut unclassified_parts: Vec<String> = resolved
            .iter()
            .filter(|(_, c)| !c.is_resolved())
            .map(|(part, _)| part.clone())
            .collect();
        unclassified_parts.sort();

        for entry in &mut entries {
            if let Some(classification) = resolved.get(&entry.part_number) {
                entry.apply_classification(classification);
            }
        }

        if !unclassified_parts.is_empty() {
            warn!(
                count = unclassified_parts.len(),
                parts = ?unclassified_parts,
                "存在未分类料号"
            );
        }

        Ok(PreparedBatch {
            entries,
            stats,
            unclassified_parts,
        })
    }
}
