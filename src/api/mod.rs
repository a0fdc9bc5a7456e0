// ==========================================
// 募捐活动结项 - API 层
// ==========================================
// 职责: 对外业务入口，编排引擎层与存储层
// ==========================================

pub mod campaign_status_api;
pub mod closure_api;
pub mod error;

// 重导出核心类型
pub use campaign_status_api::CampaignStatusApi;
pub use closure_api::{parse_closure_type, ClosureApi};
pub use error::{ApiError, ApiResult};
