// ==========================================
// 周缺陷 PPM 追踪系统 - 缺陷导入 Trait
// ==========================================
// 职责: 定义上传预处理各阶段接口（不包含实现）
// 流程: 解析 → 映射 → 规范化/合并 → 分类
// ==========================================

use crate::domain::{DefectCandidate, DefectEntry, NormalizeStats, PreparedBatch};
use crate::importer::data_cleaner::NormalizeRules;
use crate::importer::error::ImportResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

// ==========================================
// DefectImporter Trait
// ==========================================
// 用途: 上传预处理主接口（不落库）
// 实现者: DefectImporterImpl
#[async_trait]
pub trait DefectImporter: Send + Sync {
    /// 从文件生成预处理批次
    ///
    /// # 参数
    /// - file_path: .csv / .xlsx / .xls / .xlsm / .ods
    ///
    /// # 返回
    /// - Ok(PreparedBatch): 已规范化、已合并、已分类的条目及统计
    /// - Err: 文件读取错误、缺少必需列等
    async fn prepare_file(&self, file_path: &Path) -> ImportResult<PreparedBatch>;

    /// 对已映射的上传行执行规范化 + 分类
    async fn prepare_candidates(
        &self,
        candidates: Vec<DefectCandidate>,
    ) -> ImportResult<PreparedBatch>;
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 表格文件解析（阶段 0）
// 实现者: CsvParser, ExcelParser
pub trait FileParser: Send + Sync {
    /// 解析文件为原始行记录（HashMap<列名, 值>），跳过全空行
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<HashMap<String, String>>>;
}

// ==========================================
// FieldMapper Trait
// ==========================================
// 用途: 字段映射（阶段 1）
// 实现者: field_mapper::FieldMapper
pub trait FieldMapper: Send + Sync {
    /// 检查必需列（Defecto / Numero de Parte / Cantidad）是否齐全
    fn validate_headers(&self, headers: &[String]) -> ImportResult<()>;

    /// 按表头名（含别名）映射为上传行
    ///
    /// # 参数
    /// - row: 原始行记录
    /// - row_number: 文件中的行号（用于日志）
    fn map_to_candidate(
        &self,
        row: HashMap<String, String>,
        row_number: usize,
    ) -> ImportResult<DefectCandidate>;
}

// ==========================================
// EntryNormalizer Trait
// ==========================================
// 用途: 规范化与合并（阶段 2）
// 实现者: data_cleaner::EntryNormalizer
pub trait EntryNormalizer: Send + Sync {
    /// 规范化并按 (defect, cause, part_number) 合并
    ///
    /// # 返回
    /// - 合并后的条目（保持首次出现顺序）与统计
    fn normalize(
        &self,
        candidates: Vec<DefectCandidate>,
        rules: &NormalizeRules,
    ) -> (Vec<DefectEntry>, NormalizeStats);
}
