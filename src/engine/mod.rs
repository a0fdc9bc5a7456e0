// ==========================================
// 募捐活动结项 - 引擎层
// ==========================================
// 职责: 实现结项业务规则，不拼 SQL
// 红线: Engine 只依赖 sources.rs 中的 trait，不直接访问数据库
// ==========================================

pub mod closure_report_builder;
pub mod metrics_aggregator;
pub mod sources;
pub mod status_machine;
pub mod transparency;

// 重导出核心引擎
pub use closure_report_builder::{ClosureReportBuilder, ClosureRequest, ClosureValidationError};
pub use metrics_aggregator::{AggregationError, MetricsAggregator};
pub use sources::{
    AuditSummarySource, CampaignDirectory, ClosureMetricsSource, ClosureReportStore,
    ContractRegistry, DocumentJobQueue, OrganizerDirectory,
};
pub use status_machine::CampaignStatusMachine;
pub use transparency::TransparencyScoringEngine;
