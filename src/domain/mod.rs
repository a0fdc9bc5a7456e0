// ==========================================
// 募捐活动结项 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod campaign;
pub mod closure;
pub mod metrics;
pub mod types;

// 重导出核心类型
pub use campaign::CampaignInfo;
pub use closure::{
    ActivitySummary, AuditReportData, ClosureReport, DocumentJob, PublicAuditReport,
    ReceiptSummary, TransparencyBreakdown,
};
pub use metrics::{
    ActivityMetrics, AlertMetrics, ClosureMetrics, DonationMetrics, ReceiptMetrics,
    DEFAULT_AVERAGE_DAYS_BETWEEN_ACTIVITIES,
};
pub use types::{CampaignStatus, ClosureType, DocumentJobStatus};
