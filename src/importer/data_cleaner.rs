// ==========================================
// 周缺陷 PPM 追踪系统 - 条目规范化器实现
// ==========================================
// 阶段 2: TRIM → 缺料号跳过 → 缺陷别名 → 料号前缀修正
//         → 数量解析 → 日期解析 → 按 (defect, cause, part) 合并
// 约束: 合并结果保持首次出现顺序
// ==========================================

use crate::config::PartPrefixFix;
use crate::domain::{DefectCandidate, DefectEntry, EntryKey, NormalizeStats};
use crate::importer::defect_importer_trait::EntryNormalizer as EntryNormalizerTrait;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use tracing::{debug, warn};

/// 规范化规则（由配置读取）
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeRules {
    /// 小写旧名 → 规范名
    pub defect_aliases: HashMap<String, String>,
    pub part_prefix_fix: PartPrefixFix,
}

impl Default for NormalizeRules {
    fn default() -> Self {
        Self {
            defect_aliases: crate::config::config_manager::default_defect_aliases(),
            part_prefix_fix: PartPrefixFix::default(),
        }
    }
}

/// 料号前缀修正；不满足条件时返回 None
///
/// 条件: 以 `from` 开头（忽略大小写），且紧随的字符为数字
pub fn fix_part_prefix(part: &str, fix: &PartPrefixFix) -> Option<String> {
    let from_len = fix.from.len();
    let head = part.get(..from_len)?;
    if !head.eq_ignore_ascii_case(&fix.from) {
        return None;
    }
    let rest = &part[from_len..];
    match rest.chars().next() {
        Some(c) if c.is_ascii_digit() => Some(format!("{}{}", fix.to, rest)),
        _ => None,
    }
}

/// 数量解析：取开头的数值部分（"5 pzas" → 5）
///
/// 空、无数字开头、非有限值均为 0
pub fn parse_quantity(raw: &str) -> f64 {
    let value = raw.trim();
    value[..numeric_prefix_len(value)]
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// 开头数值的字节长度: [符号] 数字 [. 数字] [e [符号] 数字]
fn numeric_prefix_len(value: &str) -> usize {
    let bytes = value.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let int_end = digits_from(end);
    let mut has_digits = int_end > end;
    end = int_end;

    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        if frac_end > end + 1 || has_digits {
            has_digits |= frac_end > end + 1;
            end = frac_end;
        }
    }
    if !has_digits {
        return 0;
    }

    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+') | Some(b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }
    end
}

/// 报告日期解析
///
/// 支持: YYYY-MM-DD / YYYYMMDD / DD/MM/YYYY / YYYY-MM-DD HH:MM:SS（含 T 分隔）
pub fn parse_report_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    for fmt in ["%Y-%m-%d", "%Y%m%d", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return Some(date);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt.date());
        }
    }
    None
}

pub struct EntryNormalizer;

impl EntryNormalizerTrait for EntryNormalizer {
    fn normalize(
        &self,
        candidates: Vec<DefectCandidate>,
        rules: &NormalizeRules,
    ) -> (Vec<DefectEntry>, NormalizeStats) {
        let mut stats = NormalizeStats {
            rows_read: candidates.len(),
            ..NormalizeStats::default()
        };
        let mut entries: Vec<DefectEntry> = Vec::new();
        let mut index: HashMap<EntryKey, usize> = HashMap::new();

        for candidate in candidates {
            let part = candidate.part_number.trim();
            if part.is_empty() {
                warn!(row_number = candidate.row_number, "料号为空，跳过该行");
                stats.skipped_missing_part += 1;
                continue;
            }

            let mut defect = candidate.defect.trim().to_string();
            if let Some(canonical) = rules.defect_aliases.get(&defect.to_lowercase()) {
                if *canonical != defect {
                    defect = canonical.clone();
                    stats.defect_rewrites += 1;
                }
            }

            let part_number = match fix_part_prefix(part, &rules.part_prefix_fix) {
                Some(fixed) => {
                    debug!(row_number = candidate.row_number, from = %part, to = %fixed, "料号前缀修正");
                    stats.part_fixes += 1;
                    fixed
                }
                None => part.to_string(),
            };

            let entry = DefectEntry {
                folio: candidate.folio.trim().to_string(),
                report_date: parse_report_date(&candidate.report_date),
                employee_id: candidate.employee_id.trim().to_string(),
                area: candidate.area.trim().to_string(),
                sub_area: candidate.sub_area.trim().to_string(),
                shift: candidate.shift.trim().to_string(),
                line: candidate.line.trim().to_string(),
                defect,
                cause: candidate.cause.trim().to_string(),
                part_number,
                sequence: candidate.sequence.trim().to_string(),
                quantity: parse_quantity(&candidate.quantity),
                comments: candidate.comments.trim().to_string(),
                product_family: String::new(),
                category: String::new(),
            };

            match index.get(&entry.key()) {
                Some(&pos) => {
                    // 合并：数量累加，其余字段保留首次出现值
                    entries[pos].quantity += entry.quantity;
                    stats.merged_duplicates += 1;
                }
                None => {
                    index.insert(entry.key(), entries.len());
                    entries.push(entry);
                }
            }
        }

        (entries, stats)
    }
}
