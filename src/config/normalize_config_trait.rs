// ==========================================
// 周缺陷 PPM 追踪系统 - 规范化配置读取 Trait
// ==========================================
// 职责: 定义条目规范化所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 料号前缀修正规则
///
/// 料号以 `from` 开头（忽略大小写）且紧随其后的字符为数字时，
/// 将前缀替换为 `to`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartPrefixFix {
    pub from: String,
    pub to: String,
}

impl Default for PartPrefixFix {
    fn default() -> Self {
        Self {
            from: "48V".to_string(),
            to: "48VV".to_string(),
        }
    }
}

// ==========================================
// NormalizeConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait NormalizeConfigReader: Send + Sync {
    /// 缺陷名别名表
    ///
    /// # 返回
    /// - 小写旧名 → 规范名
    ///
    /// # 默认值
    /// - {"doblado": "Mal Doblado"}
    async fn get_defect_aliases(&self) -> RepositoryResult<HashMap<String, String>>;

    /// 料号前缀修正规则
    ///
    /// # 默认值
    /// - 48V → 48VV
    async fn get_part_prefix_fix(&self) -> RepositoryResult<PartPrefixFix>;
}
