// ==========================================
// Mock 配置实现 - 用于集成测试
// ==========================================

use async_trait::async_trait;
use ppm_tracker::config::{NormalizeConfigReader, PartPrefixFix};
use ppm_tracker::repository::RepositoryResult;
use std::collections::HashMap;

/// Mock 规范化配置
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub defect_aliases: HashMap<String, String>,
    pub part_prefix_fix: PartPrefixFix,
}

impl MockConfig {
    /// 默认配置（doblado → Mal Doblado，48V → 48VV）
    pub fn default() -> Self {
        let mut defect_aliases = HashMap::new();
        defect_aliases.insert("doblado".to_string(), "Mal Doblado".to_string());
        Self {
            defect_aliases,
            part_prefix_fix: PartPrefixFix::default(),
        }
    }

    /// 追加缺陷别名（键需小写）
    pub fn with_alias(mut self, from: &str, to: &str) -> Self {
        self.defect_aliases.insert(from.to_lowercase(), to.to_string());
        self
    }

    /// 自定义料号前缀修正
    pub fn with_prefix_fix(mut self, from: &str, to: &str) -> Self {
        self.part_prefix_fix = PartPrefixFix {
            from: from.to_string(),
            to: to.to_string(),
        };
        self
    }
}

#[async_trait]
impl NormalizeConfigReader for MockConfig {
    async fn get_defect_aliases(&self) -> RepositoryResult<HashMap<String, String>> {
        Ok(self.defect_aliases.clone())
    }

    async fn get_part_prefix_fix(&self) -> RepositoryResult<PartPrefixFix> {
        Ok(self.part_prefix_fix.clone())
    }
}
