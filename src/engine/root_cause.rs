// ==========================================
// 周缺陷 PPM 追踪系统 - 根因汇总引擎
// ==========================================
// 输入: 当前周条目（已按类别过滤）
// 输出: 每个 (周, 年) 下每个缺陷一行
// 分组: 缺陷与原因均去空白并忽略大小写，显示首次出现的写法
// 根因: 去重后的非空原因按字母序以 " / " 连接
// 排名: item = 总量降序、缺陷名升序的行号（从 1 开始）
// ==========================================

use crate::domain::{month_name, Category, RootCauseRow, WeekLabel, WeeklyEntry};
use crate::engine::pareto::group_key;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::instrument;
use uuid::Uuid;

/// 根因连接符
pub const ROOT_CAUSE_SEPARATOR: &str = " / ";

struct IssueGroup<'a> {
    display: &'a str,
    qty: f64,
    // 分组键 → 首次出现的写法
    causes: BTreeMap<String, &'a str>,
    max_date: NaiveDate,
}

#[derive(Debug, Default)]
pub struct RootCauseAggregator;

impl RootCauseAggregator {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip(self, entries), fields(category = %category, count = entries.len()))]
    pub fn aggregate(&self, category: Category, entries: &[WeeklyEntry]) -> Vec<RootCauseRow> {
        let mut weeks: BTreeMap<(i32, WeekLabel), BTreeMap<String, IssueGroup>> = BTreeMap::new();
        for entry in entries {
            let group = weeks
                .entry((entry.year, entry.week))
                .or_default()
                .entry(group_key(&entry.defect))
                .or_insert_with(|| IssueGroup {
                    display: entry.defect.trim(),
                    qty: 0.0,
                    causes: BTreeMap::new(),
                    max_date: entry.report_date,
                });

            group.qty += entry.quantity;
            if entry.report_date > group.max_date {
                group.max_date = entry.report_date;
            }
            let cause = entry.cause.trim();
            if !cause.is_empty() {
                group.causes.entry(group_key(cause)).or_insert(cause);
            }
        }

        let mut rows = Vec::new();
        for ((year, week), groups) in weeks {
            let mut ranked: Vec<IssueGroup> = groups.into_values().collect();
            // 已按分组键升序，稳定排序只需比较总量
            ranked.sort_by(|a, b| b.qty.total_cmp(&a.qty));

            for (idx, group) in ranked.into_iter().enumerate() {
                rows.push(RootCauseRow {
                    row_id: Uuid::new_v4().to_string(),
                    category,
                    item: idx as u32 + 1,
                    week,
                    year,
                    report_date: group.max_date,
                    month: month_name(group.max_date).to_string(),
                    issue: group.display.to_string(),
                    root_cause: group
                        .causes
                        .into_values()
                        .collect::<Vec<_>>()
                        .join(ROOT_CAUSE_SEPARATOR),
                    qty: group.qty,
                    actions: Vec::new(),
                });
            }
        }

        rows
    }
}
