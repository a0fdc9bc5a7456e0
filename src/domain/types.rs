// ==========================================
// 募捐活动结项 - 领域类型定义
// ==========================================
// 依据: 活动生命周期状态表 / 结项类型
// 序列化格式: snake_case (与数据库、外部接口一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 活动状态 (Campaign Status)
// ==========================================
// 终态: Completed / Rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,           // 草稿
    PendingApproval, // 待审批
    Active,          // 募捐中
    Paused,          // 已暂停
    Completed,       // 已结项
    Rejected,        // 已驳回
}

impl CampaignStatus {
    /// 全部状态（按生命周期顺序）
    pub const ALL: [CampaignStatus; 6] = [
        CampaignStatus::Draft,
        CampaignStatus::PendingApproval,
        CampaignStatus::Active,
        CampaignStatus::Paused,
        CampaignStatus::Completed,
        CampaignStatus::Rejected,
    ];

    /// 数据库存储值
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::PendingApproval => "pending_approval",
            CampaignStatus::Active => "active",
            CampaignStatus::Paused => "paused",
            CampaignStatus::Completed => "completed",
            CampaignStatus::Rejected => "rejected",
        }
    }

    /// 从数据库值解析
    ///
    /// 未知值返回 None（由调用方决定拒绝方式）
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Some(CampaignStatus::Draft),
            "pending_approval" => Some(CampaignStatus::PendingApproval),
            "active" => Some(CampaignStatus::Active),
            "paused" => Some(CampaignStatus::Paused),
            "completed" => Some(CampaignStatus::Completed),
            "rejected" => Some(CampaignStatus::Rejected),
            _ => None,
        }
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, CampaignStatus::Completed | CampaignStatus::Rejected)
    }

    /// 是否允许结项（仅 active / paused）
    pub fn is_closable(&self) -> bool {
        matches!(self, CampaignStatus::Active | CampaignStatus::Paused)
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 结项类型 (Closure Type)
// ==========================================
// Manual 必须附带不少于 10 个字符的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosureType {
    GoalReached, // 达成目标
    EndDate,     // 到期结项
    Manual,      // 人工结项
}

impl ClosureType {
    /// 人工结项原因的最小字符数
    pub const MANUAL_REASON_MIN_CHARS: usize = 10;

    pub fn as_str(&self) -> &'static str {
        match self {
            ClosureType::GoalReached => "goal_reached",
            ClosureType::EndDate => "end_date",
            ClosureType::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "goal_reached" => Some(ClosureType::GoalReached),
            "end_date" => Some(ClosureType::EndDate),
            "manual" => Some(ClosureType::Manual),
            _ => None,
        }
    }

    /// 是否必须填写结项原因
    pub fn requires_reason(&self) -> bool {
        matches!(self, ClosureType::Manual)
    }

    /// 渲染用的 i18n 键
    pub fn label_key(&self) -> &'static str {
        match self {
            ClosureType::GoalReached => "closure_type.goal_reached",
            ClosureType::EndDate => "closure_type.end_date",
            ClosureType::Manual => "closure_type.manual",
        }
    }
}

impl fmt::Display for ClosureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 审计文档任务状态 (Document Job Status)
// ==========================================
// Pending → Running → Ready | Failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentJobStatus {
    Pending, // 等待生成
    Running, // 生成中
    Ready,   // 已挂载文档
    Failed,  // 终止失败（不再重试）
}

impl DocumentJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentJobStatus::Pending => "pending",
            DocumentJobStatus::Running => "running",
            DocumentJobStatus::Ready => "ready",
            DocumentJobStatus::Failed => "failed",
        }
    }

    /// 从数据库值解析，未知值返回 None
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(DocumentJobStatus::Pending),
            "running" => Some(DocumentJobStatus::Running),
            "ready" => Some(DocumentJobStatus::Ready),
            "failed" => Some(DocumentJobStatus::Failed),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, DocumentJobStatus::Ready | DocumentJobStatus::Failed)
    }
}

impl fmt::Display for DocumentJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_campaign_status_roundtrip_db_value() {
        for status in CampaignStatus::ALL {
            assert_eq!(CampaignStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(CampaignStatus::parse("archived"), None);
    }

    #[test]
    fn test_closable_statuses() {
        assert!(CampaignStatus::Active.is_closable());
        assert!(CampaignStatus::Paused.is_closable());
        assert!(!CampaignStatus::Draft.is_closable());
        assert!(!CampaignStatus::Completed.is_closable());
    }

    #[test]
    fn test_closure_type_parse() {
        assert_eq!(ClosureType::parse("manual"), Some(ClosureType::Manual));
        assert_eq!(ClosureType::parse(" GOAL_REACHED "), Some(ClosureType::GoalReached));
        assert_eq!(ClosureType::parse("cancelled"), None);
        assert!(ClosureType::Manual.requires_reason());
        assert!(!ClosureType::EndDate.requires_reason());
    }

    #[test]
    fn test_document_job_status_parse() {
        for status in [
            DocumentJobStatus::Pending,
            DocumentJobStatus::Running,
            DocumentJobStatus::Ready,
            DocumentJobStatus::Failed,
        ] {
            assert_eq!(DocumentJobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(DocumentJobStatus::parse("cancelled"), None);
    }

    #[test]
    fn test_closure_type_serde_snake_case() {
        let json = serde_json::to_string(&ClosureType::GoalReached).unwrap();
        assert_eq!(json, "\"goal_reached\"");
    }
}
