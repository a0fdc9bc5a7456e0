// ==========================================
// 募捐活动结项 - 结项报告仓储
// ==========================================
// 职责: campaign_closure_reports / audit_document_jobs 表
// 红线: 报告只插入一次（campaign_id UNIQUE），文档字段只补写一次
// ==========================================
// 事务边界: commit_closure 内完成
//   插入报告 → 写入文档任务(pending) → 校验并更新活动状态为 completed
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::closure::{ClosureReport, DocumentJob, TransparencyBreakdown};
use crate::domain::metrics::ClosureMetrics;
use crate::domain::types::{CampaignStatus, ClosureType, DocumentJobStatus};
use crate::engine::sources::{ClosureReportStore, DocumentJobQueue};
use crate::engine::status_machine::CampaignStatusMachine;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{conversion_error, get_optional_uuid, get_uuid};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

const REPORT_COLUMNS: &str = r#"
    id, campaign_id, closure_type, closure_reason, closed_by,
    metrics_json, goal_percentage, transparency_score, breakdown_json,
    document_url, document_hash, closed_at, created_at
"#;

/// 报告行（JSON 列未解析）
struct ReportRow {
    id: Uuid,
    campaign_id: Uuid,
    closure_type: String,
    closure_reason: Option<String>,
    closed_by: Option<Uuid>,
    metrics_json: String,
    goal_percentage: f64,
    transparency_score: f64,
    breakdown_json: String,
    document_url: Option<String>,
    document_hash: Option<String>,
    closed_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl ReportRow {
    fn from_row(row: &Row<'_>) -> SqliteResult<Self> {
        Ok(Self {
            id: get_uuid(row, 0)?,
            campaign_id: get_uuid(row, 1)?,
            closure_type: row.get(2)?,
            closure_reason: row.get(3)?,
            closed_by: get_optional_uuid(row, 4)?,
            metrics_json: row.get(5)?,
            goal_percentage: row.get(6)?,
            transparency_score: row.get(7)?,
            breakdown_json: row.get(8)?,
            document_url: row.get(9)?,
            document_hash: row.get(10)?,
            closed_at: row.get(11)?,
            created_at: row.get(12)?,
        })
    }

    fn into_report(self) -> RepositoryResult<ClosureReport> {
        let closure_type =
            ClosureType::parse(&self.closure_type).ok_or_else(|| RepositoryError::DataCorruption {
                field: "closure_type".to_string(),
                message: format!("未知的结项类型 '{}'", self.closure_type),
            })?;
        let metrics: ClosureMetrics = serde_json::from_str(&self.metrics_json)?;
        let breakdown: TransparencyBreakdown = serde_json::from_str(&self.breakdown_json)?;

        Ok(ClosureReport {
            id: self.id,
            campaign_id: self.campaign_id,
            closure_type,
            closure_reason: self.closure_reason,
            closed_by: self.closed_by,
            metrics,
            goal_percentage: self.goal_percentage,
            transparency_score: self.transparency_score,
            transparency_breakdown: breakdown,
            document_url: self.document_url,
            document_hash: self.document_hash,
            closed_at: self.closed_at,
            created_at: self.created_at,
        })
    }
}

fn map_job_row(row: &Row<'_>) -> SqliteResult<DocumentJob> {
    let raw_status: String = row.get(1)?;
    let status = DocumentJobStatus::parse(&raw_status)
        .ok_or_else(|| conversion_error(1, format!("未知的文档任务状态 '{}'", raw_status)))?;
    Ok(DocumentJob {
        campaign_id: get_uuid(row, 0)?,
        status,
        attempts: row.get(2)?,
        last_error: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

// ==========================================
// ClosureReportRepository
// ==========================================
pub struct ClosureReportRepository {
    conn: Arc<Mutex<Connection>>,
    status_machine: CampaignStatusMachine,
}

impl ClosureReportRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn))))
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            status_machine: CampaignStatusMachine::new(),
        }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn report_exists(&self, campaign_id: Uuid) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM campaign_closure_reports WHERE campaign_id = ?1)",
            params![campaign_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    pub fn find_report(&self, campaign_id: Uuid) -> RepositoryResult<Option<ClosureReport>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM campaign_closure_reports WHERE campaign_id = ?1",
            REPORT_COLUMNS
        );
        let row = conn
            .query_row(&sql, params![campaign_id.to_string()], ReportRow::from_row)
            .optional()?;

        row.map(ReportRow::into_report).transpose()
    }

    /// 原子提交结项（插入报告 + 文档任务 + 活动状态）
    ///
    /// # 返回
    /// - Err(UniqueConstraintViolation): 该活动已有结项报告
    /// - Err(InvalidStateTransition): 活动当前状态不允许结项
    /// - Err(NotFound): 活动不存在
    pub fn insert_closure(&self, report: &ClosureReport) -> RepositoryResult<()> {
        let metrics_json = serde_json::to_string(&report.metrics)?;
        let breakdown_json = serde_json::to_string(&report.transparency_breakdown)?;
        let campaign_id = report.campaign_id.to_string();
        let now = Utc::now();

        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        // 1. 报告（UNIQUE 约束是重复结项的最终判定）
        tx.execute(
            r#"
            INSERT INTO campaign_closure_reports (
                id, campaign_id, closure_type, closure_reason, closed_by,
                metrics_json, goal_percentage, transparency_score, breakdown_json,
                document_url, document_hash, closed_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL, NULL, ?10, ?11)
            "#,
            params![
                report.id.to_string(),
                campaign_id,
                report.closure_type.as_str(),
                report.closure_reason,
                report.closed_by.map(|u| u.to_string()),
                metrics_json,
                report.goal_percentage,
                report.transparency_score,
                breakdown_json,
                report.closed_at,
                report.created_at,
            ],
        )?;

        // 2. 文档任务（outbox）
        tx.execute(
            r#"
            INSERT INTO audit_document_jobs (campaign_id, status, attempts, last_error, created_at, updated_at)
            VALUES (?1, 'pending', 0, NULL, ?2, ?2)
            "#,
            params![campaign_id, now],
        )?;

        // 3. 事务内重新读取活动状态并校验
        let raw_status: String = tx
            .query_row(
                "SELECT status FROM campaigns WHERE id = ?1",
                params![campaign_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| RepositoryError::not_found("Campaign", &campaign_id))?;

        if !self
            .status_machine
            .can_transition_raw(&raw_status, CampaignStatus::Completed.as_str())
        {
            return Err(RepositoryError::InvalidStateTransition {
                from: raw_status,
                to: CampaignStatus::Completed.to_string(),
            });
        }

        tx.execute(
            "UPDATE campaigns SET status = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![CampaignStatus::Completed.as_str(), campaign_id],
        )?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        debug!(campaign_id = %report.campaign_id, "结项报告已提交");
        Ok(())
    }

    /// 一次性补写文档 URL 与哈希
    pub fn set_document(
        &self,
        campaign_id: Uuid,
        document_url: &str,
        document_hash: &str,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let id = campaign_id.to_string();

        let updated = conn.execute(
            r#"
            UPDATE campaign_closure_reports
            SET document_url = ?1, document_hash = ?2
            WHERE campaign_id = ?3 AND document_url IS NULL
            "#,
            params![document_url, document_hash, id],
        )?;

        if updated == 1 {
            return Ok(());
        }

        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM campaign_closure_reports WHERE campaign_id = ?1)",
            params![id],
            |row| row.get(0),
        )?;
        if exists {
            Err(RepositoryError::UniqueConstraintViolation(format!(
                "审计文档已挂载: campaign_id={}",
                campaign_id
            )))
        } else {
            Err(RepositoryError::not_found("ClosureReport", campaign_id))
        }
    }

    // ===== 文档任务 =====

    pub fn find_job_by_campaign(&self, campaign_id: Uuid) -> RepositoryResult<Option<DocumentJob>> {
        let conn = self.get_conn()?;
        let job = conn
            .query_row(
                r#"
                SELECT campaign_id, status, attempts, last_error, created_at, updated_at
                FROM audit_document_jobs
                WHERE campaign_id = ?1
                "#,
                params![campaign_id.to_string()],
                map_job_row,
            )
            .optional()?;
        Ok(job)
    }

    pub fn list_unfinished_jobs(&self) -> RepositoryResult<Vec<DocumentJob>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT campaign_id, status, attempts, last_error, created_at, updated_at
            FROM audit_document_jobs
            WHERE status IN ('pending', 'running')
            ORDER BY created_at ASC
            "#,
        )?;
        let jobs = stmt
            .query_map([], map_job_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(jobs)
    }

    fn update_job(
        &self,
        campaign_id: Uuid,
        status: DocumentJobStatus,
        increment_attempts: bool,
        last_error: Option<&str>,
    ) -> RepositoryResult<()> {
        let attempts_delta: i64 = if increment_attempts { 1 } else { 0 };
        let conn = self.get_conn()?;
        let updated = conn.execute(
            r#"
            UPDATE audit_document_jobs
            SET status = ?1,
                attempts = attempts + ?2,
                last_error = COALESCE(?3, last_error),
                updated_at = ?4
            WHERE campaign_id = ?5
            "#,
            params![
                status.as_str(),
                attempts_delta,
                last_error,
                Utc::now(),
                campaign_id.to_string(),
            ],
        )?;

        if updated == 0 {
            return Err(RepositoryError::not_found("DocumentJob", campaign_id));
        }
        Ok(())
    }
}

#[async_trait]
impl ClosureReportStore for ClosureReportRepository {
    async fn exists(&self, campaign_id: Uuid) -> RepositoryResult<bool> {
        self.report_exists(campaign_id)
    }

    async fn find_by_campaign(&self, campaign_id: Uuid) -> RepositoryResult<Option<ClosureReport>> {
        self.find_report(campaign_id)
    }

    async fn commit_closure(&self, report: &ClosureReport) -> RepositoryResult<()> {
        self.insert_closure(report)
    }

    async fn attach_document(
        &self,
        campaign_id: Uuid,
        document_url: &str,
        document_hash: &str,
    ) -> RepositoryResult<()> {
        self.set_document(campaign_id, document_url, document_hash)
    }
}

#[async_trait]
impl DocumentJobQueue for ClosureReportRepository {
    async fn find_job(&self, campaign_id: Uuid) -> RepositoryResult<Option<DocumentJob>> {
        self.find_job_by_campaign(campaign_id)
    }

    async fn list_unfinished(&self) -> RepositoryResult<Vec<DocumentJob>> {
        self.list_unfinished_jobs()
    }

    async fn mark_running(&self, campaign_id: Uuid) -> RepositoryResult<()> {
        self.update_job(campaign_id, DocumentJobStatus::Running, true, None)
    }

    async fn mark_retrying(&self, campaign_id: Uuid, error: &str) -> RepositoryResult<()> {
        self.update_job(campaign_id, DocumentJobStatus::Pending, false, Some(error))
    }

    async fn mark_ready(&self, campaign_id: Uuid) -> RepositoryResult<()> {
        self.update_job(campaign_id, DocumentJobStatus::Ready, false, None)
    }

    async fn mark_failed(&self, campaign_id: Uuid, error: &str) -> RepositoryResult<()> {
        self.update_job(campaign_id, DocumentJobStatus::Failed, false, Some(error))
    }
}
