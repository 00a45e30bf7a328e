// ==========================================
// 周缺陷 PPM 追踪系统 - 帕累托聚合引擎
// ==========================================
// 输入: 当前周条目（已按类别过滤）
// 输出: 每个 (周, 年) 下每个缺陷一行
// 分组: 缺陷名去空白并忽略大小写，显示首次出现的写法
// 排名: 占比降序，同占比按缺陷名升序
// 累计: 按排名累加占比 × 100
// 红线: Engine 不拼 SQL
// ==========================================

use crate::domain::{month_name, Category, ParetoRow, WeekLabel, WeeklyEntry};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::instrument;

struct DefectGroup<'a> {
    display: &'a str,
    qty: f64,
    max_date: NaiveDate,
}

/// 分组键：去空白、小写
pub fn group_key(value: &str) -> String {
    value.trim().to_lowercase()
}

// ==========================================
// ParetoAggregator - 帕累托聚合器
// ==========================================
#[derive(Debug, Default)]
pub struct ParetoAggregator;

impl ParetoAggregator {
    pub fn new() -> Self {
        Self
    }

    /// 计算帕累托行
    ///
    /// # 返回
    /// - 按 (年, 周) 升序、周内按排名排列的行
    #[instrument(skip(self, entries), fields(category = %category, count = entries.len()))]
    pub fn aggregate(&self, category: Category, entries: &[WeeklyEntry]) -> Vec<ParetoRow> {
        // (年, 周) → 缺陷分组键 → 分组
        let mut weeks: BTreeMap<(i32, WeekLabel), BTreeMap<String, DefectGroup>> = BTreeMap::new();
        for entry in entries {
            let groups = weeks.entry((entry.year, entry.week)).or_default();
            groups
                .entry(group_key(&entry.defect))
                .and_modify(|g| {
                    g.qty += entry.quantity;
                    if entry.report_date > g.max_date {
                        g.max_date = entry.report_date;
                    }
                })
                .or_insert(DefectGroup {
                    display: entry.defect.trim(),
                    qty: entry.quantity,
                    max_date: entry.report_date,
                });
        }

        let mut rows = Vec::new();
        for ((year, week), groups) in weeks {
            let total: f64 = groups.values().map(|g| g.qty).sum();

            let mut ranked: Vec<(DefectGroup, f64)> = groups
                .into_values()
                .map(|g| {
                    let pct = if total == 0.0 { 0.0 } else { g.qty / total };
                    (g, pct)
                })
                .collect();
            // BTreeMap 已按分组键升序，稳定排序后同占比保持名称顺序
            ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

            let mut running = 0.0;
            for (group, pct) in ranked {
                running += pct;
                rows.push(ParetoRow {
                    category,
                    week,
                    year,
                    defect: group.display.to_string(),
                    report_date: group.max_date,
                    month: month_name(group.max_date).to_string(),
                    total_qty: group.qty,
                    percentage: pct,
                    cumulative_pct: running * 100.0,
                });
            }
        }

        rows
    }
}
