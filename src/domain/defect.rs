// ==========================================
// 周缺陷 PPM 追踪系统 - 缺陷条目领域模型
// ==========================================
// 职责: 上传行 → 规范化条目 → 周条目 的三段数据结构
// 合并键: (defect, cause, part_number)
// ==========================================

use crate::domain::types::{month_name, Category, WeekLabel};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// DefectCandidate - 上传中间结构体
// ==========================================
// 用途: 字段映射产物，全部为原始文本
// 生命周期: 仅在导入流程内
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefectCandidate {
    pub folio: String,
    pub report_date: String,
    pub employee_id: String,
    pub area: String,
    pub sub_area: String,
    pub shift: String,
    pub line: String,
    pub defect: String,
    pub cause: String,
    pub part_number: String,
    pub sequence: String,
    pub quantity: String,
    pub comments: String,

    // 元信息
    pub row_number: usize,
}

impl DefectCandidate {
    /// 由已有条目还原为原始文本（保存前重新规范化用）
    pub fn from_entry(entry: &DefectEntry, row_number: usize) -> Self {
        Self {
            folio: entry.folio.clone(),
            report_date: entry
                .report_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            employee_id: entry.employee_id.clone(),
            area: entry.area.clone(),
            sub_area: entry.sub_area.clone(),
            shift: entry.shift.clone(),
            line: entry.line.clone(),
            defect: entry.defect.clone(),
            cause: entry.cause.clone(),
            part_number: entry.part_number.clone(),
            sequence: entry.sequence.clone(),
            quantity: entry.quantity.to_string(),
            comments: entry.comments.clone(),
            row_number,
        }
    }
}

// ==========================================
// EntryKey - 合并键
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryKey {
    pub defect: String,
    pub cause: String,
    pub part_number: String,
}

// ==========================================
// DefectEntry - 规范化后的缺陷条目
// ==========================================
// 分类前 product_family/category 为空字符串
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefectEntry {
    pub folio: String,
    pub report_date: Option<NaiveDate>,
    pub employee_id: String,
    pub area: String,
    pub sub_area: String,
    pub shift: String,
    pub line: String,
    pub defect: String,
    pub cause: String,
    pub part_number: String,
    pub sequence: String,
    pub quantity: f64,
    pub comments: String,
    pub product_family: String,
    pub category: String,
}

impl DefectEntry {
    pub fn key(&self) -> EntryKey {
        EntryKey {
            defect: self.defect.clone(),
            cause: self.cause.clone(),
            part_number: self.part_number.clone(),
        }
    }

    /// 固定类别（未分类或非 5 类之一返回 None）
    pub fn category(&self) -> Option<Category> {
        Category::parse(&self.category)
    }

    /// 写入分类结果；属于 5 个固定类别时统一为规范写法
    pub fn apply_classification(&mut self, classification: &Classification) {
        self.product_family = classification.product_family.clone();
        self.category = canonical_category(&classification.category);
    }
}

// ==========================================
// WeeklyEntry - 当前周条目（已入库）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyEntry {
    pub entry_id: String,
    pub generation_id: i64,
    pub folio: String,
    pub report_date: NaiveDate,
    pub employee_id: String,
    pub area: String,
    pub sub_area: String,
    pub shift: String,
    pub line: String,
    pub defect: String,
    pub cause: String,
    pub part_number: String,
    pub sequence: String,
    pub quantity: f64,
    pub comments: String,
    pub product_family: String,
    pub category: String,
    pub week: WeekLabel,
    pub year: i32,
    pub month: String,
}

impl WeeklyEntry {
    /// 以周标签/年份/世代号落位一条规范化条目
    ///
    /// 报告日期缺失时使用 fallback_date（周切换当天）
    pub fn install(
        entry: DefectEntry,
        week: WeekLabel,
        year: i32,
        generation_id: i64,
        fallback_date: NaiveDate,
    ) -> Self {
        let report_date = entry.report_date.unwrap_or(fallback_date);
        Self {
            entry_id: Uuid::new_v4().to_string(),
            generation_id,
            folio: entry.folio,
            report_date,
            employee_id: entry.employee_id,
            area: entry.area,
            sub_area: entry.sub_area,
            shift: entry.shift,
            line: entry.line,
            defect: entry.defect,
            cause: entry.cause,
            part_number: entry.part_number,
            sequence: entry.sequence,
            quantity: entry.quantity,
            comments: entry.comments,
            product_family: entry.product_family,
            category: canonical_category(&entry.category),
            week,
            year,
            month: month_name(report_date).to_string(),
        }
    }
}

/// 类别文本规范化（非固定类别原样保留）
fn canonical_category(raw: &str) -> String {
    Category::parse(raw)
        .map(|c| c.as_str().to_string())
        .unwrap_or_else(|| raw.trim().to_string())
}

// ==========================================
// 分类参照
// ==========================================

/// 料号前缀（Familia）→ (产品族, 类别)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    pub family: String,
    pub product_family: String,
    pub category: String,
}

/// 分类结果（未命中时两个字段均为空字符串）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub product_family: String,
    pub category: String,
}

impl Classification {
    pub fn unresolved() -> Self {
        Self::default()
    }

    pub fn is_resolved(&self) -> bool {
        !self.category.is_empty() || !self.product_family.is_empty()
    }
}

impl From<&ClassificationRecord> for Classification {
    fn from(record: &ClassificationRecord) -> Self {
        Self {
            product_family: record.product_family.clone(),
            category: record.category.clone(),
        }
    }
}

// ==========================================
// 规范化统计 / 预处理批次
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeStats {
    pub rows_read: usize,
    pub skipped_missing_part: usize,
    pub merged_duplicates: usize,
    pub defect_rewrites: usize,
    pub part_fixes: usize,
}

/// 预处理批次（解析 + 规范化 + 分类，尚未落库）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreparedBatch {
    pub entries: Vec<DefectEntry>,
    pub stats: NormalizeStats,
    pub unclassified_parts: Vec<String>,
}
