// ==========================================
// 募捐活动结项 - 活动数据仓储
// ==========================================
// 职责: campaigns / campaign_contracts 表的读取与状态更新
// 红线: Repository 不含业务逻辑（状态转换校验由状态机负责）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::campaign::CampaignInfo;
use crate::domain::types::CampaignStatus;
use crate::engine::sources::{CampaignDirectory, ContractRegistry};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{conversion_error, get_uuid};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

// ==========================================
// CampaignRepository - 活动仓储
// ==========================================
pub struct CampaignRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CampaignRepository {
    /// 创建新的 CampaignRepository 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按 ID 查询活动
    ///
    /// # 返回
    /// - Ok(Some(CampaignInfo)): 找到活动
    /// - Ok(None): 未找到
    pub fn find_by_id(&self, campaign_id: Uuid) -> RepositoryResult<Option<CampaignInfo>> {
        let conn = self.get_conn()?;
        let campaign = conn
            .query_row(
                r#"
                SELECT id, title, goal, organizer_id, status, start_date, end_date
                FROM campaigns
                WHERE id = ?1
                "#,
                params![campaign_id.to_string()],
                map_campaign_row,
            )
            .optional()?;
        Ok(campaign)
    }

    /// 比较并写入活动状态（不校验转换合法性）
    ///
    /// # 返回
    /// - Err(InvalidStateTransition): 当前状态已不是 `from`（from 字段为实际状态）
    /// - Err(NotFound): 活动不存在
    pub fn compare_and_set_status(
        &self,
        campaign_id: Uuid,
        from: CampaignStatus,
        to: CampaignStatus,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let id = campaign_id.to_string();
        let updated = conn.execute(
            "UPDATE campaigns SET status = ?1, updated_at = datetime('now') WHERE id = ?2 AND status = ?3",
            params![to.as_str(), id, from.as_str()],
        )?;
        if updated == 1 {
            return Ok(());
        }

        let current: Option<String> = conn
            .query_row(
                "SELECT status FROM campaigns WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        match current {
            Some(current) => Err(RepositoryError::InvalidStateTransition {
                from: current,
                to: to.to_string(),
            }),
            None => Err(RepositoryError::not_found("Campaign", campaign_id)),
        }
    }

    /// 是否存在已签署的合同
    pub fn contract_signed(&self, campaign_id: Uuid) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let exists: bool = conn.query_row(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM campaign_contracts
                WHERE campaign_id = ?1 AND signed_at IS NOT NULL
            )
            "#,
            params![campaign_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

/// campaigns 行映射（列顺序: id, title, goal, organizer_id, status, start_date, end_date）
pub(crate) fn map_campaign_row(row: &Row<'_>) -> rusqlite::Result<CampaignInfo> {
    let raw_status: String = row.get(4)?;
    let status = CampaignStatus::parse(&raw_status)
        .ok_or_else(|| conversion_error(4, format!("未知的活动状态 '{}'", raw_status)))?;

    Ok(CampaignInfo {
        id: get_uuid(row, 0)?,
        title: row.get(1)?,
        goal: row.get(2)?,
        organizer_id: get_uuid(row, 3)?,
        status,
        start_date: row.get(5)?,
        end_date: row.get(6)?,
    })
}

#[async_trait]
impl CampaignDirectory for CampaignRepository {
    async fn get_campaign_for_closure(&self, campaign_id: Uuid) -> RepositoryResult<CampaignInfo> {
        self.find_by_id(campaign_id)?
            .ok_or_else(|| RepositoryError::not_found("Campaign", campaign_id))
    }

    async fn update_status(
        &self,
        campaign_id: Uuid,
        from: CampaignStatus,
        to: CampaignStatus,
    ) -> RepositoryResult<()> {
        self.compare_and_set_status(campaign_id, from, to)
    }
}

#[async_trait]
impl ContractRegistry for CampaignRepository {
    async fn has_contract(&self, campaign_id: Uuid) -> RepositoryResult<bool> {
        self.contract_signed(campaign_id)
    }
}
