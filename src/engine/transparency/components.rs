use crate::domain::metrics::{AlertMetrics, ClosureMetrics};

pub(super) const DOCUMENTATION_MAX: f64 = 30.0;
pub(super) const ACTIVITY_MAX: f64 = 25.0;
pub(super) const GOAL_PROGRESS_MAX: f64 = 20.0;
pub(super) const ALERTS_DEDUCTION_FLOOR: f64 = -10.0;

/// 每多一条超出预期的动态，只计 20% 的额外比例
const ACTIVITY_EXTRA_DAMPING: f64 = 0.2;
/// 动态比例上限
const ACTIVITY_RATIO_CAP: f64 = 1.5;
/// 一个"月"按 30 天计
const HOURS_PER_MONTH: f64 = 24.0 * 30.0;

/// 文档化: 附带凭证的票据占比 * 30；没有票据时明确为 0
pub(super) fn documentation_score(metrics: &ClosureMetrics) -> f64 {
    if metrics.total_receipts <= 0 {
        return 0.0;
    }
    metrics.receipts_with_documents as f64 / metrics.total_receipts as f64 * DOCUMENTATION_MAX
}

/// 预期动态条数: ceil(活动月数)，至少 1
pub(super) fn expected_activities(metrics: &ClosureMetrics) -> f64 {
    (metrics.campaign_duration_hours() / HOURS_PER_MONTH).ceil().max(1.0)
}

/// 动态: 实际/预期比例，超出部分衰减后封顶 1.5，再映射到 0-25
pub(super) fn activity_score(metrics: &ClosureMetrics) -> f64 {
    if metrics.total_activities <= 0 {
        return 0.0;
    }

    let mut ratio = metrics.total_activities as f64 / expected_activities(metrics);
    if ratio > 1.0 {
        ratio = 1.0 + (ratio - 1.0) * ACTIVITY_EXTRA_DAMPING;
    }
    let ratio = ratio.min(ACTIVITY_RATIO_CAP);

    (ratio * ACTIVITY_MAX / ACTIVITY_RATIO_CAP).min(ACTIVITY_MAX)
}

/// 目标进度: 分段线性，在 r=0.5 / 0.75 / 1 处连续
pub(super) fn goal_progress_score(total_raised: f64, goal: f64) -> f64 {
    if goal <= 0.0 {
        return 0.0;
    }

    let r = total_raised / goal;
    if r >= 1.0 {
        GOAL_PROGRESS_MAX
    } else if r >= 0.75 {
        15.0 + (r - 0.75) * 20.0
    } else if r >= 0.5 {
        10.0 + (r - 0.5) * 20.0
    } else {
        r * 20.0
    }
}

/// 及时性: 按动态平均间隔天数分档
pub(super) fn timeliness_score(average_days: f64) -> f64 {
    if average_days <= 7.0 {
        15.0
    } else if average_days <= 14.0 {
        12.0
    } else if average_days <= 30.0 {
        8.0
    } else {
        5.0
    }
}

/// 预警扣分: 每条未解决预警 -2，最低 -10
pub(super) fn alerts_deduction_score(alerts: AlertMetrics) -> f64 {
    if alerts.alerts_count <= 0 {
        return 0.0;
    }
    (alerts.unresolved() as f64 * -2.0).max(ALERTS_DEDUCTION_FLOOR)
}

/// 加分: 四项贡献之和恰为 10，不额外截断
///
/// - 签署合同 +3
/// - 捐赠人数 ≥ 10 +2
/// - 支出/募得 ≥ 0.8（两者均为正） +3
/// - 早于声明结束日期结项 +2
pub(super) fn bonus_score(metrics: &ClosureMetrics, closed_before_end_date: bool) -> f64 {
    let mut bonus = 0.0;
    if metrics.has_contract {
        bonus += 3.0;
    }
    if metrics.total_donors >= 10 {
        bonus += 2.0;
    }
    if metrics.total_raised > 0.0
        && metrics.total_expenses > 0.0
        && metrics.total_expenses / metrics.total_raised >= 0.8
    {
        bonus += 3.0;
    }
    if closed_before_end_date {
        bonus += 2.0;
    }
    bonus
}
