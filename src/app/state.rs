// ==========================================
// 募捐活动结项 - 应用状态
// ==========================================
// 职责: 装配共享连接、仓储、引擎与 API 实例
// ==========================================

use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::api::{CampaignStatusApi, ClosureApi};
use crate::audit::{AuditDocumentPipeline, LocalBlobStore, PlainTextRenderer, RetryPolicy};
use crate::config::{AuditSettings, ConfigManager};
use crate::db::{init_schema, open_sqlite_connection};
use crate::engine::MetricsAggregator;
use crate::repository::{
    CampaignRepository, ClosureMetricsRepository, ClosureReportRepository, OrganizerRepository,
};

/// 应用状态
///
/// 所有仓储共享同一个 SQLite 连接，结项提交因此天然串行。
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 结项API
    pub closure_api: Arc<ClosureApi>,

    /// 活动状态API
    pub campaign_status_api: Arc<CampaignStatusApi>,

    /// 审计文档流水线（用于重启恢复）
    pub pipeline: Arc<AuditDocumentPipeline>,

    pub config_manager: Arc<ConfigManager>,

    /// 启动时加载的审计配置
    pub audit_settings: AuditSettings,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 1. 打开数据库并建表（幂等）
    /// 2. 读取审计配置，初始化 Blob 存储
    /// 3. 装配 Repository / Engine / API
    ///
    /// 不会自动恢复未完成的文档任务，需要时调用 `pipeline.resume_pending()`。
    pub async fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库建表失败: {}", e))?;

        Self::from_connection(db_path, Arc::new(Mutex::new(conn))).await
    }

    /// 基于已初始化 schema 的连接装配
    pub async fn from_connection(
        db_path: String,
        conn: Arc<Mutex<Connection>>,
    ) -> Result<Self, String> {
        // ==========================================
        // 配置
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let audit_settings = config_manager
            .get_audit_settings()
            .map_err(|e| format!("读取审计配置失败: {}", e))?;

        // ==========================================
        // Repository层
        // ==========================================
        let campaign_repo = Arc::new(CampaignRepository::from_connection(conn.clone()));
        let organizer_repo = Arc::new(OrganizerRepository::from_connection(conn.clone()));
        let metrics_repo = Arc::new(ClosureMetricsRepository::from_connection(conn.clone()));
        let report_repo = Arc::new(ClosureReportRepository::from_connection(conn.clone()));

        // ==========================================
        // 审计文档
        // ==========================================
        let blob_store = Arc::new(
            LocalBlobStore::new(
                &audit_settings.blob_root_dir,
                audit_settings.public_base_url.clone(),
            )
            .await
            .map_err(|e| format!("无法初始化审计文档存储: {}", e))?,
        );
        let renderer = Arc::new(PlainTextRenderer::new(&audit_settings.locale));

        let pipeline = Arc::new(
            AuditDocumentPipeline::new(
                report_repo.clone(),
                report_repo.clone(),
                metrics_repo.clone(),
                renderer,
                blob_store,
            )
            .with_retry_policy(RetryPolicy::from(&audit_settings))
            .with_key_prefix(audit_settings.key_prefix.clone()),
        );

        // ==========================================
        // Engine / API层
        // ==========================================
        let aggregator = MetricsAggregator::new(metrics_repo, campaign_repo.clone());

        let closure_api = Arc::new(ClosureApi::new(
            campaign_repo.clone(),
            organizer_repo,
            report_repo.clone(),
            report_repo,
            aggregator,
            pipeline.clone(),
        ));
        let campaign_status_api = Arc::new(CampaignStatusApi::new(campaign_repo));

        tracing::info!(
            key_prefix = %audit_settings.key_prefix,
            max_attempts = audit_settings.max_attempts,
            locale = %audit_settings.locale,
            "AppState初始化完成"
        );

        Ok(Self {
            db_path,
            closure_api,
            campaign_status_api,
            pipeline,
            config_manager,
            audit_settings,
        })
    }
}

/// 默认数据库路径
///
/// 优先使用环境变量 CAMPAIGN_CLOSURE_DB_PATH，其次为用户数据目录。
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var("CAMPAIGN_CLOSURE_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./campaign_closure.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("campaign-closure");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("campaign_closure.db");
        }
    }

    path.to_string_lossy().to_string()
}
