// ==========================================
// 募捐活动结项 - 活动实体（结项视角）
// ==========================================
// 职责: 结项流程所需的最小活动信息
// 红线: 活动 CRUD 不在本核心范围内
// ==========================================

use crate::domain::types::CampaignStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// CampaignInfo - 活动信息
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignInfo {
    pub id: Uuid,
    pub title: String,
    pub goal: f64,
    pub organizer_id: Uuid,
    pub status: CampaignStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl CampaignInfo {
    /// 在给定时间点结项是否早于声明的结束日期
    pub fn closes_early(&self, closed_at: DateTime<Utc>) -> bool {
        closed_at < self.end_date
    }
}
