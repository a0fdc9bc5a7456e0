// ==========================================
// 募捐活动结项 - 引擎层数据源接口
// ==========================================
// 职责: 定义结项流程依赖的协作方接口，实现依赖倒置
// 说明: Engine/API 层只依赖 trait，Repository 层提供 rusqlite 实现
// ==========================================
// 硬依赖: 活动查询、组织者查询、捐赠/票据/动态指标
// 尽力而为: 合同检查、预警指标、文档明细
// ==========================================

use crate::domain::campaign::CampaignInfo;
use crate::domain::closure::{ActivitySummary, ClosureReport, DocumentJob, ReceiptSummary};
use crate::domain::metrics::{ActivityMetrics, AlertMetrics, DonationMetrics, ReceiptMetrics};
use crate::domain::types::CampaignStatus;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use uuid::Uuid;

// ==========================================
// CampaignDirectory - 活动查询与状态更新
// ==========================================
#[async_trait]
pub trait CampaignDirectory: Send + Sync {
    /// 查询结项所需的活动信息，不存在时返回 NotFound
    async fn get_campaign_for_closure(&self, campaign_id: Uuid) -> RepositoryResult<CampaignInfo>;

    /// 比较并更新活动状态（转换合法性由调用方通过状态机校验）
    ///
    /// 只有当前状态仍为 `from` 时才写入 `to`；否则返回 InvalidStateTransition（from 为实际状态）。
    async fn update_status(
        &self,
        campaign_id: Uuid,
        from: CampaignStatus,
        to: CampaignStatus,
    ) -> RepositoryResult<()>;
}

// ==========================================
// OrganizerDirectory - 组织者查询
// ==========================================
#[async_trait]
pub trait OrganizerDirectory: Send + Sync {
    async fn organizer_name(&self, organizer_id: Uuid) -> RepositoryResult<String>;
}

// ==========================================
// ContractRegistry - 合同检查（尽力而为）
// ==========================================
#[async_trait]
pub trait ContractRegistry: Send + Sync {
    async fn has_contract(&self, campaign_id: Uuid) -> RepositoryResult<bool>;
}

// ==========================================
// ClosureMetricsSource - 结项指标查询
// ==========================================
#[async_trait]
pub trait ClosureMetricsSource: Send + Sync {
    async fn donation_metrics(&self, campaign_id: Uuid) -> RepositoryResult<DonationMetrics>;

    async fn receipt_metrics(&self, campaign_id: Uuid) -> RepositoryResult<ReceiptMetrics>;

    async fn activity_metrics(&self, campaign_id: Uuid) -> RepositoryResult<ActivityMetrics>;

    /// 预警指标，失败由聚合器降级为 0
    async fn alert_metrics(&self, campaign_id: Uuid) -> RepositoryResult<AlertMetrics>;
}

// ==========================================
// AuditSummarySource - 审计文档明细
// ==========================================
#[async_trait]
pub trait AuditSummarySource: Send + Sync {
    async fn receipt_summaries(&self, campaign_id: Uuid) -> RepositoryResult<Vec<ReceiptSummary>>;

    async fn activity_summaries(&self, campaign_id: Uuid)
        -> RepositoryResult<Vec<ActivitySummary>>;
}

// ==========================================
// ClosureReportStore - 结项报告存储
// ==========================================
#[async_trait]
pub trait ClosureReportStore: Send + Sync {
    async fn exists(&self, campaign_id: Uuid) -> RepositoryResult<bool>;

    async fn find_by_campaign(&self, campaign_id: Uuid) -> RepositoryResult<Option<ClosureReport>>;

    /// 原子提交结项
    ///
    /// 同一事务内: 校验活动当前状态 → 插入报告 → 写入文档任务 → 活动置为 completed。
    /// 报告重复时返回 UniqueConstraintViolation，状态不允许时返回 InvalidStateTransition。
    async fn commit_closure(&self, report: &ClosureReport) -> RepositoryResult<()>;

    /// 一次性补写文档 URL 与哈希；已写过或报告不存在时返回错误
    async fn attach_document(
        &self,
        campaign_id: Uuid,
        document_url: &str,
        document_hash: &str,
    ) -> RepositoryResult<()>;
}

// ==========================================
// DocumentJobQueue - 审计文档任务队列（outbox）
// ==========================================
#[async_trait]
pub trait DocumentJobQueue: Send + Sync {
    async fn find_job(&self, campaign_id: Uuid) -> RepositoryResult<Option<DocumentJob>>;

    /// 未完成（pending / running）的任务，用于重启后恢复
    async fn list_unfinished(&self) -> RepositoryResult<Vec<DocumentJob>>;

    /// 标记开始一次尝试，attempts + 1
    async fn mark_running(&self, campaign_id: Uuid) -> RepositoryResult<()>;

    /// 记录一次可重试失败，回到 pending
    async fn mark_retrying(&self, campaign_id: Uuid, error: &str) -> RepositoryResult<()>;

    async fn mark_ready(&self, campaign_id: Uuid) -> RepositoryResult<()>;

    async fn mark_failed(&self, campaign_id: Uuid, error: &str) -> RepositoryResult<()>;
}
