// ==========================================
// 周缺陷 PPM 追踪系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、写入
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::normalize_config_trait::{NormalizeConfigReader, PartPrefixFix};
use crate::db::open_sqlite_connection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// 默认年度 PPM 目标
pub const DEFAULT_ANNUAL_PPM_TARGET: i64 = 400;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> RepositoryResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 全部 global 配置（按 key 排序）
    pub fn get_config_snapshot(&self) -> RepositoryResult<Vec<(String, String)>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 年度 PPM 目标（默认 400）
    pub fn get_annual_ppm_target(&self) -> RepositoryResult<i64> {
        let value = self.get_config_or_default(
            config_keys::ANNUAL_PPM_TARGET,
            &DEFAULT_ANNUAL_PPM_TARGET.to_string(),
        )?;
        match value.trim().parse::<i64>() {
            Ok(v) if v >= 0 => Ok(v),
            _ => {
                tracing::warn!(
                    config_key = config_keys::ANNUAL_PPM_TARGET,
                    raw_value = %value,
                    "年度 PPM 目标配置格式错误，使用默认值"
                );
                Ok(DEFAULT_ANNUAL_PPM_TARGET)
            }
        }
    }
}

// ==========================================
// NormalizeConfigReader Trait 实现
// ==========================================
#[async_trait]
impl NormalizeConfigReader for ConfigManager {
    async fn get_defect_aliases(&self) -> RepositoryResult<HashMap<String, String>> {
        let value = self.get_global_config_value(config_keys::DEFECT_ALIASES)?;
        let Some(raw) = value else {
            return Ok(default_defect_aliases());
        };

        match serde_json::from_str::<HashMap<String, String>>(&raw) {
            // 键统一小写，匹配时忽略大小写
            Ok(map) => Ok(map
                .into_iter()
                .map(|(k, v)| (k.trim().to_lowercase(), v))
                .collect()),
            Err(_) => {
                tracing::warn!(
                    config_key = config_keys::DEFECT_ALIASES,
                    raw_value = %raw,
                    "缺陷别名配置格式错误，使用默认配置"
                );
                Ok(default_defect_aliases())
            }
        }
    }

    async fn get_part_prefix_fix(&self) -> RepositoryResult<PartPrefixFix> {
        let value = self.get_global_config_value(config_keys::PART_PREFIX_FIX)?;
        let Some(raw) = value else {
            return Ok(PartPrefixFix::default());
        };

        match serde_json::from_str::<PartPrefixFix>(&raw) {
            Ok(fix) if !fix.from.trim().is_empty() => Ok(fix),
            _ => {
                tracing::warn!(
                    config_key = config_keys::PART_PREFIX_FIX,
                    raw_value = %raw,
                    "料号前缀修正配置格式错误，使用默认配置"
                );
                Ok(PartPrefixFix::default())
            }
        }
    }
}

/// 默认缺陷别名
pub fn default_defect_aliases() -> HashMap<String, String> {
    HashMap::from([("doblado".to_string(), "Mal Doblado".to_string())])
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 条目规范化
    pub const DEFECT_ALIASES: &str = "defect_aliases"; // JSON 对象
    pub const PART_PREFIX_FIX: &str = "part_prefix_fix"; // JSON {"from","to"}

    // 年度 PPM
    pub const ANNUAL_PPM_TARGET: &str = "annual_ppm_target";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[tokio::test]
    async fn test_defaults_when_unset() {
        let config = setup();
        let aliases = config.get_defect_aliases().await.unwrap();
        assert_eq!(aliases.get("doblado").map(String::as_str), Some("Mal Doblado"));
        assert_eq!(config.get_part_prefix_fix().await.unwrap(), PartPrefixFix::default());
        assert_eq!(config.get_annual_ppm_target().unwrap(), 400);
    }

    #[tokio::test]
    async fn test_overrides_and_bad_values() {
        let config = setup();
        config
            .set_global_config_value(config_keys::DEFECT_ALIASES, r#"{"Golpe":"Golpeado"}"#)
            .unwrap();
        config
            .set_global_config_value(config_keys::PART_PREFIX_FIX, "not json")
            .unwrap();
        config
            .set_global_config_value(config_keys::ANNUAL_PPM_TARGET, "250")
            .unwrap();

        let aliases = config.get_defect_aliases().await.unwrap();
        assert_eq!(aliases.get("golpe").map(String::as_str), Some("Golpeado"));
        assert!(!aliases.contains_key("doblado"));
        assert_eq!(config.get_part_prefix_fix().await.unwrap(), PartPrefixFix::default());
        assert_eq!(config.get_annual_ppm_target().unwrap(), 250);

        config
            .set_global_config_value(config_keys::ANNUAL_PPM_TARGET, "-1")
            .unwrap();
        assert_eq!(config.get_annual_ppm_target().unwrap(), 400);
        assert_eq!(config.get_config_snapshot().unwrap().len(), 3);
    }
}
