// ==========================================
// 募捐活动结项 - 审计文档流水线
// ==========================================
// 后台执行，不向任何调用方返回错误:
//   读取明细(尽力而为) → 渲染 → SHA-256 → 上传 → 一次性回写报告
// 任务状态持久化在 audit_document_jobs（outbox），重启后由 resume_pending 恢复
// 渲染 / 上传失败按退避重试；回写失败为终止失败
// 同一流水线实例内，同一活动同时只有一次执行（in_flight 认领）
// ==========================================

use crate::audit::blob_store::{BlobStore, BlobStoreError};
use crate::audit::digest::content_hash;
use crate::audit::renderer::{DocumentRenderer, RenderError};
use crate::config::AuditSettings;
use crate::domain::closure::{AuditReportData, ClosureReport};
use crate::engine::sources::{AuditSummarySource, ClosureReportStore, DocumentJobQueue};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// 退避延迟上限
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("结项报告不存在: campaign_id={0}")]
    ReportMissing(Uuid),

    #[error("审计文档正在生成: campaign_id={0}")]
    InProgress(Uuid),

    #[error("审计文档渲染失败: {0}")]
    Render(#[from] RenderError),

    #[error("审计文档上传失败: {0}")]
    Upload(#[from] BlobStoreError),

    #[error("审计文档回写失败: {0}")]
    Attach(#[source] RepositoryError),

    #[error("读取结项报告失败: {0}")]
    Repository(#[from] RepositoryError),
}

impl PipelineError {
    /// 渲染与上传失败可重试，其余为终止失败
    pub fn is_retryable(&self) -> bool {
        matches!(self, PipelineError::Render(_) | PipelineError::Upload(_))
    }
}

// ==========================================
// RetryPolicy - 有界重试 + 指数退避
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// 只尝试一次
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// 第 attempt 次失败后的等待时间: base * 2^(attempt-1)，封顶 60 秒
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exp)
            .min(MAX_RETRY_DELAY)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}

impl From<&AuditSettings> for RetryPolicy {
    fn from(settings: &AuditSettings) -> Self {
        Self::new(settings.max_attempts, settings.retry_base_delay)
    }
}

// ==========================================
// 执行认领
// ==========================================
type InFlight = Arc<Mutex<HashSet<Uuid>>>;

fn lock_in_flight(in_flight: &InFlight) -> MutexGuard<'_, HashSet<Uuid>> {
    in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 持有期间该活动的流水线归当前执行所有，释放时自动归还
struct InFlightClaim {
    in_flight: InFlight,
    campaign_id: Uuid,
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        lock_in_flight(&self.in_flight).remove(&self.campaign_id);
    }
}

/// 成功挂载的审计文档
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentAttachment {
    pub url: String,
    pub hash: String,
}

/// 审计文档的存储键: {prefix}/{campaign_id}/audit-report-{unix_ts}-{run_tag}.{ext}
///
/// run_tag 每次执行唯一，同一秒内的两次执行不会写到同一对象。
pub fn document_key(
    prefix: &str,
    campaign_id: Uuid,
    generated_at: DateTime<Utc>,
    run_tag: &str,
    extension: &str,
) -> String {
    format!(
        "{}/{}/audit-report-{}-{}.{}",
        prefix.trim_matches('/'),
        campaign_id,
        generated_at.timestamp(),
        run_tag,
        extension
    )
}

fn new_run_tag() -> String {
    let mut tag = Uuid::new_v4().simple().to_string();
    tag.truncate(8);
    tag
}

// ==========================================
// AuditDocumentPipeline
// ==========================================
pub struct AuditDocumentPipeline {
    reports: Arc<dyn ClosureReportStore>,
    jobs: Arc<dyn DocumentJobQueue>,
    summaries: Arc<dyn AuditSummarySource>,
    renderer: Arc<dyn DocumentRenderer>,
    blob_store: Arc<dyn BlobStore>,
    retry: RetryPolicy,
    key_prefix: String,
    in_flight: InFlight,
}

impl AuditDocumentPipeline {
    pub fn new(
        reports: Arc<dyn ClosureReportStore>,
        jobs: Arc<dyn DocumentJobQueue>,
        summaries: Arc<dyn AuditSummarySource>,
        renderer: Arc<dyn DocumentRenderer>,
        blob_store: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            reports,
            jobs,
            summaries,
            renderer,
            blob_store,
            retry: RetryPolicy::default(),
            key_prefix: "audits".to_string(),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// 在独立任务中执行流水线，不等待结果
    ///
    /// 失败只记录日志与任务状态，不传播给调用方。
    pub fn dispatch(self: &Arc<Self>, campaign_id: Uuid) -> JoinHandle<()> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            match pipeline.run(campaign_id).await {
                Ok(_) => {}
                Err(PipelineError::InProgress(_)) => {
                    debug!(%campaign_id, "审计文档已在生成中，跳过重复派发");
                }
                Err(e) => error!(%campaign_id, error = %e, "审计文档生成终止"),
            }
        })
    }

    /// 该活动是否有正在执行的流水线
    pub fn is_in_flight(&self, campaign_id: Uuid) -> bool {
        lock_in_flight(&self.in_flight).contains(&campaign_id)
    }

    fn claim(&self, campaign_id: Uuid) -> Option<InFlightClaim> {
        if !lock_in_flight(&self.in_flight).insert(campaign_id) {
            return None;
        }
        Some(InFlightClaim {
            in_flight: Arc::clone(&self.in_flight),
            campaign_id,
        })
    }

    /// 重新派发未完成（pending / running）且不在执行中的任务
    pub async fn resume_pending(self: &Arc<Self>) -> RepositoryResult<Vec<JoinHandle<()>>> {
        let jobs: Vec<_> = self
            .jobs
            .list_unfinished()
            .await?
            .into_iter()
            .filter(|job| !self.is_in_flight(job.campaign_id))
            .collect();
        if !jobs.is_empty() {
            info!(count = jobs.len(), "恢复未完成的审计文档任务");
        }
        Ok(jobs
            .into_iter()
            .map(|job| self.dispatch(job.campaign_id))
            .collect())
    }

    /// 执行一次完整的流水线
    #[instrument(skip_all, fields(campaign_id = %campaign_id))]
    pub async fn run(&self, campaign_id: Uuid) -> Result<DocumentAttachment, PipelineError> {
        let _claim = self
            .claim(campaign_id)
            .ok_or(PipelineError::InProgress(campaign_id))?;

        let report = match self.reports.find_by_campaign(campaign_id).await? {
            Some(report) => report,
            None => {
                let err = PipelineError::ReportMissing(campaign_id);
                self.record(self.jobs.mark_failed(campaign_id, &err.to_string()).await);
                return Err(err);
            }
        };

        // 已挂载（例如重启前已完成回写）
        if let (Some(url), Some(hash)) = (&report.document_url, &report.document_hash) {
            self.record(self.jobs.mark_ready(campaign_id).await);
            return Ok(DocumentAttachment {
                url: url.clone(),
                hash: hash.clone(),
            });
        }

        let previous_attempts = match self.jobs.find_job(campaign_id).await {
            Ok(job) => job.map(|j| j.attempts.max(0) as u32).unwrap_or(0),
            Err(e) => {
                warn!(%campaign_id, error = %e, "读取文档任务失败，按首次执行处理");
                0
            }
        };

        let data = self.collect(report).await;
        let key = document_key(
            &self.key_prefix,
            campaign_id,
            data.generated_at,
            &new_run_tag(),
            self.renderer.file_extension(),
        );

        // 恢复执行时至少再给一次机会
        let max_attempts = self.retry.max_attempts.max(previous_attempts + 1);
        let mut attempt = previous_attempts;
        let (url, hash) = loop {
            attempt += 1;
            self.record(self.jobs.mark_running(campaign_id).await);

            match self.render_and_upload(&data, &key).await {
                Ok(result) => break result,
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    warn!(
                        %campaign_id,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "审计文档生成失败，稍后重试"
                    );
                    self.record(self.jobs.mark_retrying(campaign_id, &e.to_string()).await);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!(%campaign_id, attempt, error = %e, "审计文档生成失败，不再重试");
                    self.record(self.jobs.mark_failed(campaign_id, &e.to_string()).await);
                    return Err(e);
                }
            }
        };

        if let Err(e) = self.reports.attach_document(campaign_id, &url, &hash).await {
            // 其他执行者已先挂载: 以已挂载的文档为准，清理本次上传
            if let Some(existing) = self.attached_document(campaign_id).await {
                warn!(%campaign_id, key = %key, "审计文档已由其他执行挂载，丢弃本次上传");
                if existing.url != url {
                    if let Err(e) = self.blob_store.delete(&key).await {
                        warn!(%campaign_id, key = %key, error = %e, "清理重复上传的审计文档失败");
                    }
                }
                self.record(self.jobs.mark_ready(campaign_id).await);
                return Ok(existing);
            }

            let err = PipelineError::Attach(e);
            error!(%campaign_id, error = %err, "审计文档已上传但回写报告失败");
            self.record(self.jobs.mark_failed(campaign_id, &err.to_string()).await);
            return Err(err);
        }

        self.record(self.jobs.mark_ready(campaign_id).await);
        info!(%campaign_id, key = %key, hash = %hash, attempt, "审计文档已挂载");

        Ok(DocumentAttachment { url, hash })
    }

    /// 报告上已挂载的文档（读取失败按未挂载处理）
    async fn attached_document(&self, campaign_id: Uuid) -> Option<DocumentAttachment> {
        let report = self.reports.find_by_campaign(campaign_id).await.ok()??;
        Some(DocumentAttachment {
            url: report.document_url?,
            hash: report.document_hash?,
        })
    }

    /// 组装渲染数据；明细查询失败时以空列表继续
    async fn collect(&self, report: ClosureReport) -> AuditReportData {
        let campaign_id = report.campaign_id;

        let receipts = self
            .summaries
            .receipt_summaries(campaign_id)
            .await
            .unwrap_or_else(|e| {
                warn!(%campaign_id, error = %e, "票据明细获取失败，按空列表处理");
                Vec::new()
            });

        let activities = self
            .summaries
            .activity_summaries(campaign_id)
            .await
            .unwrap_or_else(|e| {
                warn!(%campaign_id, error = %e, "动态明细获取失败，按空列表处理");
                Vec::new()
            });

        AuditReportData {
            report,
            receipts,
            activities,
            generated_at: Utc::now(),
        }
    }

    async fn render_and_upload(
        &self,
        data: &AuditReportData,
        key: &str,
    ) -> Result<(String, String), PipelineError> {
        let bytes = self.renderer.render(data)?;
        let hash = content_hash(&bytes);
        let url = self
            .blob_store
            .upload(bytes, key, self.renderer.content_type())
            .await?;
        Ok((url, hash))
    }

    /// 任务状态写入失败只记日志
    fn record(&self, result: RepositoryResult<()>) {
        if let Err(e) = result {
            warn!(error = %e, "审计文档任务状态更新失败");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_retry_delay_doubles_and_caps() {
        let policy = RetryPolicy::new(5, Duration::from_millis(500));
        assert_eq!(policy.delay_after(1), Duration::from_millis(500));
        assert_eq!(policy.delay_after(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(3), Duration::from_millis(2000));
        assert_eq!(policy.delay_after(40), MAX_RETRY_DELAY);
    }

    #[test]
    fn test_retry_policy_has_at_least_one_attempt() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
        assert_eq!(RetryPolicy::no_retry().max_attempts, 1);
    }

    #[test]
    fn test_document_key_layout() {
        let id = Uuid::nil();
        let at = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
        assert_eq!(
            document_key("/audits/", id, at, "1a2b3c4d", "txt"),
            format!("audits/{}/audit-report-{}-1a2b3c4d.txt", id, at.timestamp())
        );
        assert_eq!(new_run_tag().len(), 8);
        assert_ne!(new_run_tag(), new_run_tag());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(PipelineError::Render(RenderError::Unavailable("x".into())).is_retryable());
        assert!(PipelineError::Upload(BlobStoreError::Unavailable("x".into())).is_retryable());
        assert!(!PipelineError::Attach(RepositoryError::LockError("x".into())).is_retryable());
        assert!(!PipelineError::ReportMissing(Uuid::nil()).is_retryable());
        assert!(!PipelineError::InProgress(Uuid::nil()).is_retryable());
    }
}
