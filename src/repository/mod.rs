// ==========================================
// 募捐活动结项 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 以 rusqlite 实现 engine::sources 中的协作方接口
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod campaign_repo;
pub mod closure_metrics_repo;
pub mod closure_report_repo;
pub mod error;
pub mod organizer_repo;
pub mod row_utils;

// 重导出核心仓储
pub use campaign_repo::CampaignRepository;
pub use closure_metrics_repo::ClosureMetricsRepository;
pub use closure_report_repo::ClosureReportRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use organizer_repo::OrganizerRepository;
