// ==========================================
// 募捐活动结项 - 指标实体
// ==========================================
// 职责: 四组独立指标 + 聚合后的结项指标快照
// 说明: 金额为协作方提供的只读聚合值，本核心不做记账/对账
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 活动少于两条记录时使用的默认平均间隔（天）
pub const DEFAULT_AVERAGE_DAYS_BETWEEN_ACTIVITIES: f64 = 30.0;

/// 捐赠指标（仅统计 completed 状态的捐赠）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DonationMetrics {
    pub total_raised: f64,
    pub total_donors: i64,
    pub total_donations: i64,
}

/// 票据指标
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceiptMetrics {
    pub total_expenses: f64,
    pub total_receipts: i64,
    pub receipts_with_documents: i64,
}

/// 动态（进展更新）指标
///
/// `average_days_between_activities` 为 None 表示数据源无法计算（少于两条或查询无结果），
/// 默认值由聚合器统一补齐。
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityMetrics {
    pub total_activities: i64,
    pub average_days_between_activities: Option<f64>,
}

/// 预警指标（尽力而为数据源）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertMetrics {
    pub alerts_count: i64,
    pub alerts_resolved: i64,
}

impl AlertMetrics {
    /// 未解决的预警数（不小于 0）
    pub fn unresolved(&self) -> i64 {
        (self.alerts_count - self.alerts_resolved).max(0)
    }
}

// ==========================================
// ClosureMetrics - 结项指标快照
// ==========================================
// 每次结项请求临时计算，随结项报告一起冻结保存
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosureMetrics {
    // 活动信息
    pub campaign_goal: f64,
    pub campaign_start: DateTime<Utc>,
    pub campaign_end: DateTime<Utc>,
    pub has_contract: bool,
    pub campaign_title: String,
    pub organizer_name: String,
    pub organizer_id: Uuid,

    // 捐赠
    pub total_raised: f64,
    pub total_donors: i64,
    pub total_donations: i64,

    // 票据
    pub total_expenses: f64,
    pub total_receipts: i64,
    pub receipts_with_documents: i64,

    // 动态
    pub total_activities: i64,
    pub average_days_between_activities: f64,

    // 预警
    pub alerts_count: i64,
    pub alerts_resolved: i64,
}

impl ClosureMetrics {
    /// 预警指标视图
    pub fn alerts(&self) -> AlertMetrics {
        AlertMetrics {
            alerts_count: self.alerts_count,
            alerts_resolved: self.alerts_resolved,
        }
    }

    /// 活动计划时长（小时）
    pub fn campaign_duration_hours(&self) -> f64 {
        (self.campaign_end - self.campaign_start).num_seconds() as f64 / 3600.0
    }

    /// 目标完成百分比: raised / goal * 100，封顶 100；goal ≤ 0 时为 0
    pub fn goal_percentage(&self) -> f64 {
        if self.campaign_goal <= 0.0 {
            return 0.0;
        }
        (self.total_raised / self.campaign_goal * 100.0).min(100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn metrics(goal: f64, raised: f64) -> ClosureMetrics {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        ClosureMetrics {
            campaign_goal: goal,
            campaign_start: start,
            campaign_end: start,
            has_contract: false,
            campaign_title: String::new(),
            organizer_name: String::new(),
            organizer_id: Uuid::nil(),
            total_raised: raised,
            total_donors: 0,
            total_donations: 0,
            total_expenses: 0.0,
            total_receipts: 0,
            receipts_with_documents: 0,
            total_activities: 0,
            average_days_between_activities: DEFAULT_AVERAGE_DAYS_BETWEEN_ACTIVITIES,
            alerts_count: 0,
            alerts_resolved: 0,
        }
    }

    #[test]
    fn test_goal_percentage() {
        assert_eq!(metrics(1000.0, 750.0).goal_percentage(), 75.0);
        assert_eq!(metrics(1000.0, 2500.0).goal_percentage(), 100.0);
        assert_eq!(metrics(0.0, 500.0).goal_percentage(), 0.0);
        assert_eq!(metrics(-10.0, 500.0).goal_percentage(), 0.0);
    }

    #[test]
    fn test_unresolved_alerts_never_negative() {
        let alerts = AlertMetrics {
            alerts_count: 1,
            alerts_resolved: 3,
        };
        assert_eq!(alerts.unresolved(), 0);
    }

    #[test]
    fn test_snapshot_views() {
        let mut m = metrics(1000.0, 0.0);
        m.campaign_end = m.campaign_start + chrono::Duration::days(45);
        m.alerts_count = 4;
        m.alerts_resolved = 1;

        assert_eq!(m.campaign_duration_hours(), 45.0 * 24.0);
        assert_eq!(m.alerts().unresolved(), 3);
    }
}
