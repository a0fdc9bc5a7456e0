// ==========================================
// 募捐活动结项 - 审计文档渲染
// ==========================================
// DocumentRenderer: 把 AuditReportData 变成字节（格式由实现决定）
// PlainTextRenderer: 默认实现，纯文本 + 本地化标签
// ==========================================

use crate::domain::closure::AuditReportData;
use crate::i18n::{normalize_locale, t_in};
use std::fmt::Write as _;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("文档格式化失败: {0}")]
    Format(#[from] std::fmt::Error),

    #[error("渲染器不可用: {0}")]
    Unavailable(String),
}

/// 审计文档渲染器
pub trait DocumentRenderer: Send + Sync {
    /// 上传时使用的 MIME 类型
    fn content_type(&self) -> &str;

    /// 文件扩展名（不含点）
    fn file_extension(&self) -> &str;

    fn render(&self, data: &AuditReportData) -> Result<Vec<u8>, RenderError>;
}

// ==========================================
// PlainTextRenderer
// ==========================================
pub struct PlainTextRenderer {
    locale: &'static str,
}

impl PlainTextRenderer {
    pub fn new(locale: &str) -> Self {
        Self {
            locale: normalize_locale(locale),
        }
    }

    fn label(&self, key: &str) -> String {
        t_in(key, self.locale)
    }

    fn yes_no(&self, value: bool) -> String {
        self.label(if value { "common.yes" } else { "common.no" })
    }

    fn write_document(&self, out: &mut String, data: &AuditReportData) -> std::fmt::Result {
        let report = &data.report;
        let metrics = data.metrics();
        let breakdown = &report.transparency_breakdown;

        writeln!(out, "{}", self.label("audit.title"))?;
        writeln!(out, "{}", "=".repeat(48))?;
        writeln!(out, "{}: {}", self.label("audit.campaign"), metrics.campaign_title)?;
        writeln!(out, "{}: {}", self.label("audit.campaign_id"), report.campaign_id)?;
        writeln!(out, "{}: {}", self.label("audit.organizer"), metrics.organizer_name)?;
        writeln!(
            out,
            "{}: {}",
            self.label("audit.closure_type"),
            self.label(report.closure_type.label_key())
        )?;
        if let Some(reason) = &report.closure_reason {
            writeln!(out, "{}: {}", self.label("audit.closure_reason"), reason)?;
        }
        writeln!(
            out,
            "{}: {}",
            self.label("audit.closed_at"),
            report.closed_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;

        writeln!(out)?;
        writeln!(out, "[{}]", self.label("audit.financial_summary"))?;
        writeln!(out, "{}: {:.2}", self.label("audit.goal"), metrics.campaign_goal)?;
        writeln!(out, "{}: {:.2}", self.label("audit.raised"), metrics.total_raised)?;
        writeln!(
            out,
            "{}: {:.2}%",
            self.label("audit.goal_percentage"),
            report.goal_percentage
        )?;
        writeln!(out, "{}: {}", self.label("audit.donors"), metrics.total_donors)?;
        writeln!(out, "{}: {}", self.label("audit.donations"), metrics.total_donations)?;
        writeln!(out, "{}: {:.2}", self.label("audit.expenses"), metrics.total_expenses)?;
        writeln!(out, "{}: {}", self.label("audit.receipts"), metrics.total_receipts)?;
        writeln!(
            out,
            "{}: {}",
            self.label("audit.receipts_with_documents"),
            metrics.receipts_with_documents
        )?;

        writeln!(out)?;
        writeln!(out, "[{}]", self.label("audit.receipt_list"))?;
        if data.receipts.is_empty() {
            writeln!(out, "  {}", self.label("audit.no_items"))?;
        }
        for receipt in &data.receipts {
            writeln!(
                out,
                "  {} | {} | {} | {:.2} | {}: {}",
                receipt.date.format("%Y-%m-%d"),
                receipt.provider,
                receipt.name,
                receipt.total,
                self.label("audit.has_document"),
                self.yes_no(receipt.has_document)
            )?;
        }

        writeln!(out)?;
        writeln!(out, "[{}]", self.label("audit.activity_list"))?;
        if data.activities.is_empty() {
            writeln!(out, "  {}", self.label("audit.no_items"))?;
        }
        for activity in &data.activities {
            writeln!(
                out,
                "  {} | {} | {}",
                activity.date.format("%Y-%m-%d"),
                activity.activity_type,
                activity.title
            )?;
        }

        writeln!(out)?;
        writeln!(out, "[{}]", self.label("audit.transparency"))?;
        let rows = [
            ("audit.documentation_score", breakdown.documentation_score),
            ("audit.activity_score", breakdown.activity_score),
            ("audit.goal_progress_score", breakdown.goal_progress_score),
            ("audit.timeliness_score", breakdown.timeliness_score),
            ("audit.alerts_deduction_score", breakdown.alerts_deduction_score),
            ("audit.bonus_score", breakdown.bonus_score),
        ];
        for (key, value) in rows {
            writeln!(out, "  {}: {:.2}", self.label(key), value)?;
        }
        writeln!(
            out,
            "{}: {:.2}",
            self.label("audit.total_score"),
            report.transparency_score
        )?;

        writeln!(out)?;
        writeln!(
            out,
            "{}: {}",
            self.label("audit.generated_at"),
            data.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        Ok(())
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new("zh-CN")
    }
}

impl DocumentRenderer for PlainTextRenderer {
    fn content_type(&self) -> &str {
        "text/plain; charset=utf-8"
    }

    fn file_extension(&self) -> &str {
        "txt"
    }

    fn render(&self, data: &AuditReportData) -> Result<Vec<u8>, RenderError> {
        let mut out = String::new();
        self.write_document(&mut out, data)?;
        Ok(out.into_bytes())
    }
}
