// ==========================================
// 募捐活动结项 - 结项报告实体
// ==========================================
// 职责: 透明度评分明细、结项报告、公开审计报告、审计文档数据
// 红线: 结项报告创建后不可变，仅允许一次性补写文档 URL + 哈希
// ==========================================

use crate::domain::metrics::ClosureMetrics;
use crate::domain::types::{ClosureType, DocumentJobStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// TransparencyBreakdown - 透明度评分明细
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TransparencyBreakdown {
    pub documentation_score: f64,    // 0-30
    pub activity_score: f64,         // 0-25
    pub goal_progress_score: f64,    // 0-20
    pub timeliness_score: f64,       // 0-15
    pub alerts_deduction_score: f64, // -10-0
    pub bonus_score: f64,            // 0-10
}

impl TransparencyBreakdown {
    /// 总分: 六项求和后截断到 [0, 100]
    ///
    /// 这是唯一的截断点，单项不额外截断。
    pub fn total(&self) -> f64 {
        let total = self.documentation_score
            + self.activity_score
            + self.goal_progress_score
            + self.timeliness_score
            + self.alerts_deduction_score
            + self.bonus_score;
        total.clamp(0.0, 100.0)
    }
}

// ==========================================
// ClosureReport - 结项报告
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosureReport {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub closure_type: ClosureType,
    pub closure_reason: Option<String>,
    pub closed_by: Option<Uuid>,

    /// 冻结的指标快照
    pub metrics: ClosureMetrics,
    pub goal_percentage: f64,
    pub transparency_score: f64,
    pub transparency_breakdown: TransparencyBreakdown,

    /// 审计文档（异步补写，可能永久为空）
    pub document_url: Option<String>,
    pub document_hash: Option<String>,

    pub closed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ClosureReport {
    /// 审计文档是否已挂载
    pub fn has_document(&self) -> bool {
        self.document_url.as_deref().is_some_and(|u| !u.is_empty())
    }

    /// 面向捐赠人的公开投影
    pub fn to_public(&self) -> PublicAuditReport {
        PublicAuditReport {
            campaign_id: self.campaign_id,
            campaign_title: self.metrics.campaign_title.clone(),
            organizer_name: self.metrics.organizer_name.clone(),
            closed_at: self.closed_at,
            total_raised: self.metrics.total_raised,
            campaign_goal: self.metrics.campaign_goal,
            goal_percentage: self.goal_percentage,
            total_donors: self.metrics.total_donors,
            total_expenses: self.metrics.total_expenses,
            transparency_score: self.transparency_score,
            document_url: self.document_url.clone(),
        }
    }
}

// ==========================================
// PublicAuditReport - 公开审计报告
// ==========================================
// 不包含结项原因、操作人、评分明细
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicAuditReport {
    pub campaign_id: Uuid,
    pub campaign_title: String,
    pub organizer_name: String,
    pub closed_at: DateTime<Utc>,
    pub total_raised: f64,
    pub campaign_goal: f64,
    pub goal_percentage: f64,
    pub total_donors: i64,
    pub total_expenses: f64,
    pub transparency_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_url: Option<String>,
}

// ==========================================
// 审计文档明细
// ==========================================

/// 票据明细（文档展示用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptSummary {
    pub provider: String,
    pub name: String,
    pub total: f64,
    pub date: DateTime<Utc>,
    pub has_document: bool,
}

/// 动态明细（文档展示用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub title: String,
    pub activity_type: String,
    pub date: DateTime<Utc>,
}

/// 审计文档渲染数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReportData {
    pub report: ClosureReport,
    pub receipts: Vec<ReceiptSummary>,
    pub activities: Vec<ActivitySummary>,
    pub generated_at: DateTime<Utc>,
}

impl AuditReportData {
    pub fn metrics(&self) -> &ClosureMetrics {
        &self.report.metrics
    }
}

// ==========================================
// DocumentJob - 审计文档任务（outbox）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentJob {
    pub campaign_id: Uuid,
    pub status: DocumentJobStatus,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
