// ==========================================
// 募捐活动结项 - 应用层
// ==========================================
// 职责: 装配应用状态，供命令行入口使用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
