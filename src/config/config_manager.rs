// ==========================================
// 募捐活动结项 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

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
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 从 config_kv 表读取配置值，带默认值
    pub fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self
            .get_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 写入配置（UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取所有 global 配置的快照（JSON 格式，按键排序）
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    // ===== 审计文档配置 =====

    /// 审计文档本地存储根目录
    pub fn get_blob_root_dir(&self) -> ConfigResult<PathBuf> {
        match self.get_config_value(config_keys::AUDIT_BLOB_ROOT_DIR)? {
            Some(v) if !v.trim().is_empty() => Ok(PathBuf::from(v.trim())),
            _ => Ok(default_blob_root_dir()),
        }
    }

    /// 审计文档公开 URL 前缀（为空表示使用 file:// 路径）
    pub fn get_public_base_url(&self) -> ConfigResult<Option<String>> {
        let value = self.get_config_or_default(config_keys::AUDIT_PUBLIC_BASE_URL, "")?;
        let trimmed = value.trim().trim_end_matches('/');
        Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
    }

    pub fn get_key_prefix(&self) -> ConfigResult<String> {
        let value = self.get_config_or_default(config_keys::AUDIT_KEY_PREFIX, "audits")?;
        let trimmed = value.trim().trim_matches('/');
        if trimmed.is_empty() {
            Ok("audits".to_string())
        } else {
            Ok(trimmed.to_string())
        }
    }

    /// 渲染/上传的最大尝试次数（至少 1）
    pub fn get_max_attempts(&self) -> ConfigResult<u32> {
        let value = self.get_config_or_default(config_keys::AUDIT_MAX_ATTEMPTS, "3")?;
        match value.trim().parse::<u32>() {
            Ok(n) if n >= 1 => Ok(n),
            _ => {
                tracing::warn!(
                    config_key = config_keys::AUDIT_MAX_ATTEMPTS,
                    raw_value = %value,
                    "最大尝试次数配置无效，使用默认值 3"
                );
                Ok(3)
            }
        }
    }

    pub fn get_retry_base_delay_ms(&self) -> ConfigResult<u64> {
        let value = self.get_config_or_default(config_keys::AUDIT_RETRY_BASE_DELAY_MS, "500")?;
        Ok(value.trim().parse::<u64>().unwrap_or(500))
    }

    /// 审计文档语言（zh-CN / en）
    pub fn get_audit_locale(&self) -> ConfigResult<String> {
        let value = self.get_config_or_default(config_keys::AUDIT_LOCALE, "zh-CN")?;
        Ok(crate::i18n::normalize_locale(&value).to_string())
    }

    /// 汇总审计文档流水线配置
    pub fn get_audit_settings(&self) -> ConfigResult<AuditSettings> {
        Ok(AuditSettings {
            blob_root_dir: self.get_blob_root_dir()?,
            public_base_url: self.get_public_base_url()?,
            key_prefix: self.get_key_prefix()?,
            max_attempts: self.get_max_attempts()?,
            retry_base_delay: Duration::from_millis(self.get_retry_base_delay_ms()?),
            locale: self.get_audit_locale()?,
        })
    }
}

/// 审计文档流水线配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditSettings {
    pub blob_root_dir: PathBuf,
    pub public_base_url: Option<String>,
    pub key_prefix: String,
    pub max_attempts: u32,
    pub retry_base_delay: Duration,
    pub locale: String,
}

fn default_blob_root_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("campaign-closure").join("blobs"))
        .unwrap_or_else(|| PathBuf::from("./campaign-closure-blobs"))
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 审计文档存储
    pub const AUDIT_BLOB_ROOT_DIR: &str = "audit.blob_root_dir";
    pub const AUDIT_PUBLIC_BASE_URL: &str = "audit.public_base_url";
    pub const AUDIT_KEY_PREFIX: &str = "audit.key_prefix";

    // 重试
    pub const AUDIT_MAX_ATTEMPTS: &str = "audit.max_attempts";
    pub const AUDIT_RETRY_BASE_DELAY_MS: &str = "audit.retry_base_delay_ms";

    // 渲染
    pub const AUDIT_LOCALE: &str = "audit.locale";
}
