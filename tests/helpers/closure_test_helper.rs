// ==========================================
// 结项集成测试辅助工具
// ==========================================
// 职责: 基于临时数据库 + 临时 Blob 目录装配完整的结项环境
// 说明: 使用方需同时声明 `mod test_helpers;`
// ==========================================

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use campaign_closure::api::{CampaignStatusApi, ClosureApi};
use campaign_closure::audit::{
    content_hash, AuditDocumentPipeline, DocumentRenderer, LocalBlobStore, PlainTextRenderer, RenderError,
    RetryPolicy,
};
use campaign_closure::domain::closure::{AuditReportData, DocumentJob};
use campaign_closure::engine::MetricsAggregator;
use campaign_closure::repository::{
    CampaignRepository, ClosureMetricsRepository, ClosureReportRepository, OrganizerRepository,
};
use rusqlite::Connection;
use tempfile::{NamedTempFile, TempDir};
use uuid::Uuid;

use crate::test_helpers::{create_test_db, open_shared};

/// 测试用重试策略: 3 次，间隔极短
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(5))
}

// ==========================================
// 测试渲染器
// ==========================================

/// 前 N 次渲染失败，之后委托给 PlainTextRenderer
pub struct FlakyRenderer {
    remaining_failures: AtomicU32,
    calls: AtomicU32,
    inner: PlainTextRenderer,
}

impl FlakyRenderer {
    pub fn new(failures: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(failures),
            calls: AtomicU32::new(0),
            inner: PlainTextRenderer::new("en"),
        }
    }

    /// 永远失败
    pub fn always_failing() -> Self {
        Self::new(u32::MAX)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DocumentRenderer for FlakyRenderer {
    fn content_type(&self) -> &str {
        self.inner.content_type()
    }

    fn file_extension(&self) -> &str {
        self.inner.file_extension()
    }

    fn render(&self, data: &AuditReportData) -> Result<Vec<u8>, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(RenderError::Unavailable("renderer offline".to_string()));
        }
        self.inner.render(data)
    }
}

/// 渲染前阻塞一段时间，用于制造两次执行重叠
pub struct SlowRenderer {
    delay: Duration,
    calls: AtomicU32,
    inner: PlainTextRenderer,
}

impl SlowRenderer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicU32::new(0),
            inner: PlainTextRenderer::new("en"),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DocumentRenderer for SlowRenderer {
    fn content_type(&self) -> &str {
        self.inner.content_type()
    }

    fn file_extension(&self) -> &str {
        self.inner.file_extension()
    }

    fn render(&self, data: &AuditReportData) -> Result<Vec<u8>, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.inner.render(data)
    }
}

/// 渲染过程中由"另一个进程"抢先挂载文档
pub struct PreemptedRenderer {
    reports: OnceLock<Arc<ClosureReportRepository>>,
    inner: PlainTextRenderer,
}

impl PreemptedRenderer {
    pub const OTHER_URL: &'static str = "https://cdn.test/elsewhere/audit-report.txt";

    pub fn new() -> Self {
        Self {
            reports: OnceLock::new(),
            inner: PlainTextRenderer::new("en"),
        }
    }

    pub fn other_hash() -> String {
        content_hash(b"rendered elsewhere")
    }

    pub fn bind(&self, reports: Arc<ClosureReportRepository>) {
        let _ = self.reports.set(reports);
    }
}

impl DocumentRenderer for PreemptedRenderer {
    fn content_type(&self) -> &str {
        self.inner.content_type()
    }

    fn file_extension(&self) -> &str {
        self.inner.file_extension()
    }

    fn render(&self, data: &AuditReportData) -> Result<Vec<u8>, RenderError> {
        if let Some(reports) = self.reports.get() {
            reports
                .set_document(data.report.campaign_id, Self::OTHER_URL, &Self::other_hash())
                .unwrap();
        }
        self.inner.render(data)
    }
}

// ==========================================
// ClosureTestEnv
// ==========================================
pub struct ClosureTestEnv {
    pub db_path: String,
    pub conn: Arc<Mutex<Connection>>,
    pub closure_api: Arc<ClosureApi>,
    pub status_api: Arc<CampaignStatusApi>,
    pub pipeline: Arc<AuditDocumentPipeline>,
    pub report_repo: Arc<ClosureReportRepository>,
    pub blob_root: PathBuf,

    // 临时资源（确保生命周期）
    _temp_file: NamedTempFile,
    _blob_dir: TempDir,
}

impl ClosureTestEnv {
    /// 默认环境: 英文纯文本渲染 + 快速重试
    pub async fn new() -> Self {
        Self::with_renderer(Arc::new(PlainTextRenderer::new("en")), fast_retry()).await
    }

    pub async fn with_renderer(renderer: Arc<dyn DocumentRenderer>, retry: RetryPolicy) -> Self {
        let (temp_file, db_path) = create_test_db().unwrap();
        let conn = open_shared(&db_path);

        let blob_dir = tempfile::tempdir().unwrap();
        let blob_root = blob_dir.path().to_path_buf();
        let blob_store = Arc::new(
            LocalBlobStore::new(&blob_root, Some("https://cdn.test/".to_string()))
                .await
                .unwrap(),
        );

        let campaign_repo = Arc::new(CampaignRepository::from_connection(conn.clone()));
        let organizer_repo = Arc::new(OrganizerRepository::from_connection(conn.clone()));
        let metrics_repo = Arc::new(ClosureMetricsRepository::from_connection(conn.clone()));
        let report_repo = Arc::new(ClosureReportRepository::from_connection(conn.clone()));

        let pipeline = Arc::new(
            AuditDocumentPipeline::new(
                report_repo.clone(),
                report_repo.clone(),
                metrics_repo.clone(),
                renderer,
                blob_store,
            )
            .with_retry_policy(retry),
        );

        let closure_api = Arc::new(ClosureApi::new(
            campaign_repo.clone(),
            organizer_repo,
            report_repo.clone(),
            report_repo.clone(),
            MetricsAggregator::new(metrics_repo, campaign_repo.clone()),
            pipeline.clone(),
        ));
        let status_api = Arc::new(CampaignStatusApi::new(campaign_repo));

        Self {
            db_path,
            conn,
            closure_api,
            status_api,
            pipeline,
            report_repo,
            blob_root,
            _temp_file: temp_file,
            _blob_dir: blob_dir,
        }
    }

    /// 在共享连接上执行测试数据准备
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> T) -> T {
        let conn = self.conn.lock().unwrap();
        f(&conn)
    }

    /// 等待文档任务结束（ready / failed）
    pub async fn wait_for_job(&self, campaign_id: Uuid) -> DocumentJob {
        self.closure_api
            .wait_for_document(campaign_id, Duration::from_secs(10))
            .await
            .unwrap()
    }

    /// 某活动目录下已上传的文档数
    pub fn uploaded_count(&self, campaign_id: Uuid) -> usize {
        std::fs::read_dir(self.blob_root.join("audits").join(campaign_id.to_string()))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    /// 根据 https://cdn.test/{key} 读取已上传的文档
    pub fn read_uploaded(&self, url: &str) -> Vec<u8> {
        let key = url.trim_start_matches("https://cdn.test/");
        std::fs::read(self.blob_root.join(key)).unwrap()
    }
}
