// ==========================================
// 募捐活动结项 - 结项 API
// ==========================================
// 结项流程（同步部分）:
//   幂等检查 → 活动查询/状态校验 → 原因校验 → 组织者查询
//   → 指标聚合 → 评分/组装 → 原子提交（报告 + 文档任务 + 状态）
// 之后派发审计文档流水线，不等待其完成
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::audit::digest::verify_content_hash;
use crate::audit::pipeline::AuditDocumentPipeline;
use crate::domain::closure::{ClosureReport, DocumentJob, PublicAuditReport};
use crate::domain::types::{CampaignStatus, ClosureType};
use crate::engine::closure_report_builder::{ClosureReportBuilder, ClosureRequest};
use crate::engine::metrics_aggregator::MetricsAggregator;
use crate::engine::sources::{
    CampaignDirectory, ClosureReportStore, DocumentJobQueue, OrganizerDirectory,
};
use crate::engine::status_machine::CampaignStatusMachine;
use crate::repository::error::RepositoryError;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, instrument};
use uuid::Uuid;

const DOCUMENT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// 解析外部传入的结项类型
pub fn parse_closure_type(raw: &str) -> ApiResult<ClosureType> {
    ClosureType::parse(raw).ok_or_else(|| {
        ApiError::ValidationError(format!(
            "未知的结项类型 '{}'（可选: goal_reached / end_date / manual）",
            raw
        ))
    })
}

// ==========================================
// ClosureApi - 结项 API
// ==========================================
pub struct ClosureApi {
    campaigns: Arc<dyn CampaignDirectory>,
    organizers: Arc<dyn OrganizerDirectory>,
    reports: Arc<dyn ClosureReportStore>,
    jobs: Arc<dyn DocumentJobQueue>,
    aggregator: MetricsAggregator,
    builder: ClosureReportBuilder,
    status_machine: CampaignStatusMachine,
    pipeline: Arc<AuditDocumentPipeline>,
}

impl ClosureApi {
    pub fn new(
        campaigns: Arc<dyn CampaignDirectory>,
        organizers: Arc<dyn OrganizerDirectory>,
        reports: Arc<dyn ClosureReportStore>,
        jobs: Arc<dyn DocumentJobQueue>,
        aggregator: MetricsAggregator,
        pipeline: Arc<AuditDocumentPipeline>,
    ) -> Self {
        Self {
            campaigns,
            organizers,
            reports,
            jobs,
            aggregator,
            builder: ClosureReportBuilder::new(),
            status_machine: CampaignStatusMachine::new(),
            pipeline,
        }
    }

    /// 结项
    ///
    /// # 参数
    /// - `campaign_id`: 活动ID
    /// - `closure_type`: 结项类型
    /// - `closure_reason`: 结项原因（manual 必填，至少 10 个字符）
    /// - `closed_by`: 操作人
    ///
    /// # 返回
    /// - Ok(ClosureReport): 已持久化的报告（文档字段为空）
    /// - Err(AlreadyClosed): 活动已有结项报告（含并发重复提交）
    /// - Err(InvalidState): 活动不处于 active / paused
    /// - Err(ValidationError): 结项原因不合法
    /// - Err(Dependency): 组织者或指标查询失败
    pub async fn close_campaign(
        &self,
        campaign_id: Uuid,
        closure_type: ClosureType,
        closure_reason: Option<String>,
        closed_by: Option<Uuid>,
    ) -> ApiResult<ClosureReport> {
        let request = ClosureRequest {
            campaign_id,
            closure_type,
            closure_reason,
            closed_by,
        };
        self.close(request).await
    }

    /// 按请求对象结项
    #[instrument(skip_all, fields(campaign_id = %request.campaign_id, closure_type = %request.closure_type))]
    pub async fn close(&self, request: ClosureRequest) -> ApiResult<ClosureReport> {
        let campaign_id = request.campaign_id;

        // 1. 幂等检查（快速路径，最终以 UNIQUE 约束为准）
        if self.reports.exists(campaign_id).await? {
            return Err(ApiError::AlreadyClosed(campaign_id));
        }

        // 2. 活动查询 + 状态校验
        let campaign = self
            .campaigns
            .get_campaign_for_closure(campaign_id)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    ApiError::from(e)
                } else {
                    ApiError::dependency("获取活动信息失败", e)
                }
            })?;

        if !self.status_machine.can_close(campaign.status) {
            // 并发结项: 另一请求已在检查之后提交
            if campaign.status == CampaignStatus::Completed && self.reports.exists(campaign_id).await? {
                return Err(ApiError::AlreadyClosed(campaign_id));
            }
            return Err(ApiError::invalid_state(campaign_id, campaign.status));
        }

        // 3. 原因校验
        ClosureReportBuilder::validate_request(&request)?;

        // 4. 组织者（硬依赖）
        let organizer_name = self
            .organizers
            .organizer_name(campaign.organizer_id)
            .await
            .map_err(|e| ApiError::dependency("获取组织者信息失败", e))?;

        // 5. 指标聚合
        let metrics = self.aggregator.aggregate(&campaign, &organizer_name).await?;

        // 6. 评分 + 组装
        let report = self.builder.build(&request, &campaign, metrics, Utc::now());

        // 7-8. 原子提交
        self.reports
            .commit_closure(&report)
            .await
            .map_err(|e| normalize_commit_error(campaign_id, e))?;

        info!(
            %campaign_id,
            closure_type = %report.closure_type,
            score = report.transparency_score,
            goal_percentage = report.goal_percentage,
            "活动结项完成"
        );

        // 9. 派发审计文档流水线
        self.pipeline.dispatch(campaign_id);

        Ok(report)
    }

    /// 查询结项报告
    pub async fn get_closure_report(&self, campaign_id: Uuid) -> ApiResult<ClosureReport> {
        self.reports
            .find_by_campaign(campaign_id)
            .await?
            .ok_or_else(|| report_not_found(campaign_id))
    }

    /// 查询公开审计报告
    pub async fn get_public_audit_report(&self, campaign_id: Uuid) -> ApiResult<PublicAuditReport> {
        Ok(self.get_closure_report(campaign_id).await?.to_public())
    }

    pub async fn has_closure_report(&self, campaign_id: Uuid) -> ApiResult<bool> {
        Ok(self.reports.exists(campaign_id).await?)
    }

    /// 审计文档地址
    ///
    /// 文档尚未挂载时返回 DocumentPending，调用方轮询即可
    pub async fn get_audit_document_url(&self, campaign_id: Uuid) -> ApiResult<String> {
        let report = self.get_closure_report(campaign_id).await?;
        match report.document_url {
            Some(url) if !url.is_empty() => Ok(url),
            _ => Err(ApiError::DocumentPending(campaign_id)),
        }
    }

    /// 校验文档内容与报告中记录的哈希是否一致
    pub async fn verify_audit_document(&self, campaign_id: Uuid, content: &[u8]) -> ApiResult<bool> {
        let report = self.get_closure_report(campaign_id).await?;
        let expected = report
            .document_hash
            .ok_or(ApiError::DocumentPending(campaign_id))?;
        Ok(verify_content_hash(content, &expected))
    }

    /// 审计文档任务状态
    pub async fn get_document_job(&self, campaign_id: Uuid) -> ApiResult<DocumentJob> {
        self.jobs
            .find_job(campaign_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("DocumentJob(campaign_id={})不存在", campaign_id)))
    }

    /// 轮询文档任务直到结束（ready / failed）或超时
    ///
    /// 超时不视为错误，返回最后一次读到的任务状态。
    pub async fn wait_for_document(
        &self,
        campaign_id: Uuid,
        timeout: Duration,
    ) -> ApiResult<DocumentJob> {
        let deadline = Instant::now() + timeout;
        loop {
            let job = self.get_document_job(campaign_id).await?;
            if job.status.is_finished() || Instant::now() >= deadline {
                return Ok(job);
            }
            tokio::time::sleep(DOCUMENT_POLL_INTERVAL).await;
        }
    }
}

fn report_not_found(campaign_id: Uuid) -> ApiError {
    ApiError::NotFound(format!("ClosureReport(campaign_id={})不存在", campaign_id))
}

/// 提交失败归一化: 唯一约束冲突即重复结项
fn normalize_commit_error(campaign_id: Uuid, err: RepositoryError) -> ApiError {
    match err {
        RepositoryError::UniqueConstraintViolation(_) => ApiError::AlreadyClosed(campaign_id),
        RepositoryError::InvalidStateTransition { from, .. } => ApiError::InvalidState {
            campaign_id,
            status: from,
        },
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_closure_type() {
        assert_eq!(parse_closure_type("end_date").unwrap(), ClosureType::EndDate);
        assert!(matches!(
            parse_closure_type("cancelled"),
            Err(ApiError::ValidationError(_))
        ));
    }

    #[test]
    fn test_unique_violation_normalized_to_already_closed() {
        let id = Uuid::new_v4();
        let err = normalize_commit_error(
            id,
            RepositoryError::UniqueConstraintViolation(
                "UNIQUE constraint failed: campaign_closure_reports.campaign_id".into(),
            ),
        );
        assert!(matches!(err, ApiError::AlreadyClosed(got) if got == id));
    }

    #[test]
    fn test_state_changed_during_commit_is_invalid_state() {
        let id = Uuid::new_v4();
        let err = normalize_commit_error(
            id,
            RepositoryError::InvalidStateTransition {
                from: "rejected".into(),
                to: "completed".into(),
            },
        );
        assert!(matches!(err, ApiError::InvalidState { ref status, .. } if status == "rejected"));
    }
}
