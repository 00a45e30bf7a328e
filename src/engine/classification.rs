// ==========================================
// 周缺陷 PPM 追踪系统 - 分类查找引擎
// ==========================================
// 规则: 1) 精确匹配 family
//       2) 否则取作为料号前缀的最长 family（等长时取装载顺序靠前者）
//       3) 均未命中返回空分类
// 匹配忽略 ASCII 大小写
// 红线: Engine 不拼 SQL（参照数据由调用方传入）
// ==========================================

use crate::domain::{Classification, ClassificationRecord};
use std::collections::HashMap;
use tracing::debug;

// ==========================================
// ClassificationIndex - 分类索引
// ==========================================
pub struct ClassificationIndex {
    // 装载顺序
    records: Vec<ClassificationRecord>,
    // 大写 family → records 下标（重复 family 保留第一个）
    exact: HashMap<String, usize>,
}

impl ClassificationIndex {
    /// 按装载顺序构建索引，空 family 忽略
    pub fn new(records: Vec<ClassificationRecord>) -> Self {
        let records: Vec<ClassificationRecord> = records
            .into_iter()
            .map(|r| ClassificationRecord {
                family: r.family.trim().to_string(),
                ..r
            })
            .filter(|r| !r.family.is_empty())
            .collect();

        let mut exact = HashMap::with_capacity(records.len());
        for (idx, record) in records.iter().enumerate() {
            exact.entry(record.family.to_ascii_uppercase()).or_insert(idx);
        }

        Self { records, exact }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 单个料号查找
    pub fn resolve(&self, part_number: &str) -> Classification {
        let part = part_number.trim().to_ascii_uppercase();
        if part.is_empty() {
            return Classification::unresolved();
        }

        if let Some(&idx) = self.exact.get(&part) {
            return Classification::from(&self.records[idx]);
        }

        // 最长前缀；严格更长才替换，保证等长时先装载者胜出
        let mut best: Option<&ClassificationRecord> = None;
        for record in &self.records {
            let family = record.family.to_ascii_uppercase();
            if !part.starts_with(&family) {
                continue;
            }
            match best {
                Some(current) if current.family.len() >= family.len() => {}
                _ => best = Some(record),
            }
        }

        best.map(Classification::from)
            .unwrap_or_else(Classification::unresolved)
    }

    /// 批量查找：每个不同料号只查一次
    pub fn resolve_batch<'a, I>(&self, part_numbers: I) -> HashMap<String, Classification>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut resolved: HashMap<String, Classification> = HashMap::new();
        for part in part_numbers {
            if !resolved.contains_key(part) {
                resolved.insert(part.to_string(), self.resolve(part));
            }
        }
        debug!(distinct_parts = resolved.len(), families = self.records.len(), "分类查找完成");
        resolved
    }
}
