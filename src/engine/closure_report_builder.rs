// ==========================================
// 募捐活动结项 - 结项报告组装
// ==========================================
// 职责: 结项请求校验 + 评分 + 组装不可变的 ClosureReport
// 红线: 纯计算，不做 I/O；持久化由 ClosureReportStore 负责
// ==========================================

use crate::domain::campaign::CampaignInfo;
use crate::domain::closure::ClosureReport;
use crate::domain::metrics::ClosureMetrics;
use crate::domain::types::ClosureType;
use crate::engine::transparency::TransparencyScoringEngine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// 结项请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosureRequest {
    pub campaign_id: Uuid,
    pub closure_type: ClosureType,
    pub closure_reason: Option<String>,
    pub closed_by: Option<Uuid>,
}

impl ClosureRequest {
    pub fn new(campaign_id: Uuid, closure_type: ClosureType) -> Self {
        Self {
            campaign_id,
            closure_type,
            closure_reason: None,
            closed_by: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.closure_reason = Some(reason.into());
        self
    }

    pub fn closed_by(mut self, user_id: Uuid) -> Self {
        self.closed_by = Some(user_id);
        self
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClosureValidationError {
    #[error("人工结项必须填写结项原因")]
    MissingReason,

    #[error("结项原因至少需要 {min} 个字符，实际 {actual} 个")]
    ReasonTooShort { min: usize, actual: usize },
}

// ==========================================
// ClosureReportBuilder
// ==========================================
pub struct ClosureReportBuilder {
    scoring: TransparencyScoringEngine,
}

impl ClosureReportBuilder {
    pub fn new() -> Self {
        Self {
            scoring: TransparencyScoringEngine::new(),
        }
    }

    /// 校验结项原因（仅 manual 需要）
    ///
    /// 长度按字符计，不做 trim。
    pub fn validate_request(request: &ClosureRequest) -> Result<(), ClosureValidationError> {
        if !request.closure_type.requires_reason() {
            return Ok(());
        }

        let reason = request
            .closure_reason
            .as_deref()
            .ok_or(ClosureValidationError::MissingReason)?;

        let actual = reason.chars().count();
        if actual < ClosureType::MANUAL_REASON_MIN_CHARS {
            return Err(ClosureValidationError::ReasonTooShort {
                min: ClosureType::MANUAL_REASON_MIN_CHARS,
                actual,
            });
        }
        Ok(())
    }

    /// 组装结项报告
    ///
    /// 文档字段留空，由审计文档流水线一次性补写。
    pub fn build(
        &self,
        request: &ClosureRequest,
        campaign: &CampaignInfo,
        metrics: ClosureMetrics,
        closed_at: DateTime<Utc>,
    ) -> ClosureReport {
        let breakdown = self.scoring.score(&metrics, campaign.closes_early(closed_at));

        ClosureReport {
            id: Uuid::new_v4(),
            campaign_id: request.campaign_id,
            closure_type: request.closure_type,
            closure_reason: request.closure_reason.clone(),
            closed_by: request.closed_by,
            goal_percentage: metrics.goal_percentage(),
            transparency_score: breakdown.total(),
            transparency_breakdown: breakdown,
            metrics,
            document_url: None,
            document_hash: None,
            closed_at,
            created_at: Utc::now(),
        }
    }
}

impl Default for ClosureReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::CampaignStatus;
    use chrono::{Duration, TimeZone};

    fn campaign() -> CampaignInfo {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        CampaignInfo {
            id: Uuid::new_v4(),
            title: "Agua potable".to_string(),
            goal: 1000.0,
            organizer_id: Uuid::new_v4(),
            status: CampaignStatus::Active,
            start_date: start,
            end_date: start + Duration::days(60),
        }
    }

    fn metrics_for(c: &CampaignInfo) -> ClosureMetrics {
        ClosureMetrics {
            campaign_goal: c.goal,
            campaign_start: c.start_date,
            campaign_end: c.end_date,
            has_contract: true,
            campaign_title: c.title.clone(),
            organizer_name: "Cáritas".to_string(),
            organizer_id: c.organizer_id,
            total_raised: 750.0,
            total_donors: 4,
            total_donations: 6,
            total_expenses: 0.0,
            total_receipts: 2,
            receipts_with_documents: 2,
            total_activities: 2,
            average_days_between_activities: 10.0,
            alerts_count: 0,
            alerts_resolved: 0,
        }
    }

    #[test]
    fn test_manual_reason_validation() {
        let id = Uuid::new_v4();

        let missing = ClosureRequest::new(id, ClosureType::Manual);
        assert_eq!(
            ClosureReportBuilder::validate_request(&missing),
            Err(ClosureValidationError::MissingReason)
        );

        let short = ClosureRequest::new(id, ClosureType::Manual).with_reason("short");
        assert_eq!(
            ClosureReportBuilder::validate_request(&short),
            Err(ClosureValidationError::ReasonTooShort { min: 10, actual: 5 })
        );

        let ok = ClosureRequest::new(id, ClosureType::Manual).with_reason("organizer request");
        assert!(ClosureReportBuilder::validate_request(&ok).is_ok());

        // 非 manual 不要求原因
        let goal = ClosureRequest::new(id, ClosureType::GoalReached);
        assert!(ClosureReportBuilder::validate_request(&goal).is_ok());
    }

    #[test]
    fn test_reason_length_counts_chars_untrimmed() {
        let id = Uuid::new_v4();
        // 按字符而非字节计数
        let cjk = ClosureRequest::new(id, ClosureType::Manual).with_reason("组织方申请提前结束活动");
        assert!(ClosureReportBuilder::validate_request(&cjk).is_ok());

        // 前后空格计入长度
        let padded = ClosureRequest::new(id, ClosureType::Manual).with_reason("   done   ");
        assert!(ClosureReportBuilder::validate_request(&padded).is_ok());
    }

    #[test]
    fn test_build_freezes_metrics_and_scores() {
        let c = campaign();
        let request = ClosureRequest::new(c.id, ClosureType::GoalReached).closed_by(Uuid::new_v4());
        let closed_at = c.start_date + Duration::days(30);

        let report = ClosureReportBuilder::new().build(&request, &c, metrics_for(&c), closed_at);

        assert_eq!(report.campaign_id, c.id);
        assert_eq!(report.goal_percentage, 75.0);
        assert_eq!(report.transparency_breakdown.goal_progress_score, 15.0);
        // 早于结束日期结项 + 合同
        assert_eq!(report.transparency_breakdown.bonus_score, 5.0);
        assert_eq!(report.transparency_score, report.transparency_breakdown.total());
        assert_eq!(report.metrics.organizer_name, "Cáritas");
        assert!(report.document_url.is_none());
        assert!(report.document_hash.is_none());
        assert_eq!(report.closed_at, closed_at);
    }

    #[test]
    fn test_build_after_end_date_has_no_early_bonus() {
        let c = campaign();
        let request = ClosureRequest::new(c.id, ClosureType::EndDate);
        let closed_at = c.end_date + Duration::hours(1);

        let report = ClosureReportBuilder::new().build(&request, &c, metrics_for(&c), closed_at);
        assert_eq!(report.transparency_breakdown.bonus_score, 3.0);
    }
}
