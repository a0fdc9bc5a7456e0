// ==========================================
// 募捐活动结项 - 结项指标查询仓储
// ==========================================
// 职责: 捐赠 / 票据 / 动态 / 预警 聚合查询 + 审计文档明细
// 红线: 只做 SQL 聚合，默认值与降级由 MetricsAggregator 决定
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::closure::{ActivitySummary, ReceiptSummary};
use crate::domain::metrics::{ActivityMetrics, AlertMetrics, DonationMetrics, ReceiptMetrics};
use crate::engine::sources::{AuditSummarySource, ClosureMetricsSource};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

// ==========================================
// ClosureMetricsRepository
// ==========================================
pub struct ClosureMetricsRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ClosureMetricsRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 捐赠指标（只统计 completed 捐赠）
    pub fn query_donation_metrics(&self, campaign_id: Uuid) -> RepositoryResult<DonationMetrics> {
        let conn = self.get_conn()?;
        let metrics = conn.query_row(
            r#"
            SELECT
                COALESCE(SUM(amount), 0.0),
                COUNT(DISTINCT donor_id),
                COUNT(*)
            FROM donations
            WHERE campaign_id = ?1 AND status = 'completed'
            "#,
            params![campaign_id.to_string()],
            |row| {
                Ok(DonationMetrics {
                    total_raised: row.get(0)?,
                    total_donors: row.get(1)?,
                    total_donations: row.get(2)?,
                })
            },
        )?;
        Ok(metrics)
    }

    /// 票据指标
    pub fn query_receipt_metrics(&self, campaign_id: Uuid) -> RepositoryResult<ReceiptMetrics> {
        let conn = self.get_conn()?;
        let metrics = conn.query_row(
            r#"
            SELECT
                COALESCE(SUM(total), 0.0),
                COUNT(*),
                COALESCE(SUM(CASE WHEN document_url IS NOT NULL AND document_url <> '' THEN 1 ELSE 0 END), 0)
            FROM receipts
            WHERE campaign_id = ?1
            "#,
            params![campaign_id.to_string()],
            |row| {
                Ok(ReceiptMetrics {
                    total_expenses: row.get(0)?,
                    total_receipts: row.get(1)?,
                    receipts_with_documents: row.get(2)?,
                })
            },
        )?;
        Ok(metrics)
    }

    /// 动态指标
    ///
    /// 平均间隔: 按时间排序后相邻两条动态的天数差均值；少于两条时为 None
    pub fn query_activity_metrics(&self, campaign_id: Uuid) -> RepositoryResult<ActivityMetrics> {
        let conn = self.get_conn()?;
        let id = campaign_id.to_string();

        let total_activities: i64 = conn.query_row(
            "SELECT COUNT(*) FROM campaign_activities WHERE campaign_id = ?1",
            params![id],
            |row| row.get(0),
        )?;

        let average_days_between_activities: Option<f64> = conn.query_row(
            r#"
            SELECT AVG(gap_days)
            FROM (
                SELECT julianday(occurred_at)
                     - julianday(LAG(occurred_at) OVER (ORDER BY julianday(occurred_at))) AS gap_days
                FROM campaign_activities
                WHERE campaign_id = ?1
            )
            WHERE gap_days IS NOT NULL
            "#,
            params![id],
            |row| row.get(0),
        )?;

        Ok(ActivityMetrics {
            total_activities,
            average_days_between_activities,
        })
    }

    /// 预警指标
    pub fn query_alert_metrics(&self, campaign_id: Uuid) -> RepositoryResult<AlertMetrics> {
        let conn = self.get_conn()?;
        let metrics = conn.query_row(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN resolved <> 0 THEN 1 ELSE 0 END), 0)
            FROM campaign_alerts
            WHERE campaign_id = ?1
            "#,
            params![campaign_id.to_string()],
            |row| {
                Ok(AlertMetrics {
                    alerts_count: row.get(0)?,
                    alerts_resolved: row.get(1)?,
                })
            },
        )?;
        Ok(metrics)
    }

    /// 票据明细（按开具时间）
    pub fn list_receipts(&self, campaign_id: Uuid) -> RepositoryResult<Vec<ReceiptSummary>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT provider, name, total, issued_at, document_url
            FROM receipts
            WHERE campaign_id = ?1
            ORDER BY issued_at ASC
            "#,
        )?;

        let receipts = stmt
            .query_map(params![campaign_id.to_string()], |row| {
                let document_url: Option<String> = row.get(4)?;
                Ok(ReceiptSummary {
                    provider: row.get(0)?,
                    name: row.get(1)?,
                    total: row.get(2)?,
                    date: row.get(3)?,
                    has_document: document_url.is_some_and(|u| !u.is_empty()),
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(receipts)
    }

    /// 动态明细（按发生时间）
    pub fn list_activities(&self, campaign_id: Uuid) -> RepositoryResult<Vec<ActivitySummary>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT title, activity_type, occurred_at
            FROM campaign_activities
            WHERE campaign_id = ?1
            ORDER BY occurred_at ASC
            "#,
        )?;

        let activities = stmt
            .query_map(params![campaign_id.to_string()], |row| {
                Ok(ActivitySummary {
                    title: row.get(0)?,
                    activity_type: row.get(1)?,
                    date: row.get(2)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(activities)
    }
}

#[async_trait]
impl ClosureMetricsSource for ClosureMetricsRepository {
    async fn donation_metrics(&self, campaign_id: Uuid) -> RepositoryResult<DonationMetrics> {
        self.query_donation_metrics(campaign_id)
    }

    async fn receipt_metrics(&self, campaign_id: Uuid) -> RepositoryResult<ReceiptMetrics> {
        self.query_receipt_metrics(campaign_id)
    }

    async fn activity_metrics(&self, campaign_id: Uuid) -> RepositoryResult<ActivityMetrics> {
        self.query_activity_metrics(campaign_id)
    }

    async fn alert_metrics(&self, campaign_id: Uuid) -> RepositoryResult<AlertMetrics> {
        self.query_alert_metrics(campaign_id)
    }
}

#[async_trait]
impl AuditSummarySource for ClosureMetricsRepository {
    async fn receipt_summaries(&self, campaign_id: Uuid) -> RepositoryResult<Vec<ReceiptSummary>> {
        self.list_receipts(campaign_id)
    }

    async fn activity_summaries(
        &self,
        campaign_id: Uuid,
    ) -> RepositoryResult<Vec<ActivitySummary>> {
        self.list_activities(campaign_id)
    }
}
