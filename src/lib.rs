// ==========================================
// 募捐活动结项 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + tokio
// 范围: 活动状态机 / 结项指标聚合 / 透明度评分 / 结项报告 / 审计文档
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// 审计文档 - 渲染/摘要/存储/流水线
pub mod audit;

// API 层 - 业务接口
pub mod api;

// 应用层 - 装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{CampaignStatus, ClosureType, DocumentJobStatus};

// 领域实体
pub use domain::{
    CampaignInfo, ClosureMetrics, ClosureReport, DocumentJob, PublicAuditReport,
    TransparencyBreakdown,
};

// 引擎
pub use engine::{
    CampaignStatusMachine, ClosureReportBuilder, MetricsAggregator, TransparencyScoringEngine,
};

// 审计文档
pub use audit::{AuditDocumentPipeline, RetryPolicy};

// API
pub use api::{ApiError, ApiResult, CampaignStatusApi, ClosureApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "募捐活动结项系统";
