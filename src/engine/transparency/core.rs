// ==========================================
// 募捐活动结项 - 透明度评分引擎
// ==========================================
// 输入: ClosureMetrics + 是否早于声明结束日期结项
// 输出: TransparencyBreakdown（总分由 total() 截断得到）
// ==========================================

use crate::domain::closure::TransparencyBreakdown;
use crate::domain::metrics::ClosureMetrics;
use tracing::debug;

use super::components::{
    activity_score, alerts_deduction_score, bonus_score, documentation_score,
    goal_progress_score, timeliness_score,
};

// ==========================================
// TransparencyScoringEngine - 透明度评分引擎
// ==========================================
pub struct TransparencyScoringEngine {
    // 无状态引擎,不需要注入依赖
}

impl TransparencyScoringEngine {
    pub fn new() -> Self {
        Self {}
    }

    /// 计算透明度评分明细
    ///
    /// # 参数
    /// - `metrics`: 结项指标快照
    /// - `closed_before_end_date`: 是否早于声明的结束日期结项
    ///
    /// # 返回
    /// 六项评分明细；单项不额外截断，总分截断在 `TransparencyBreakdown::total` 中完成
    pub fn score(
        &self,
        metrics: &ClosureMetrics,
        closed_before_end_date: bool,
    ) -> TransparencyBreakdown {
        let breakdown = TransparencyBreakdown {
            documentation_score: documentation_score(metrics),
            activity_score: activity_score(metrics),
            goal_progress_score: goal_progress_score(metrics.total_raised, metrics.campaign_goal),
            timeliness_score: timeliness_score(metrics.average_days_between_activities),
            alerts_deduction_score: alerts_deduction_score(metrics.alerts()),
            bonus_score: bonus_score(metrics, closed_before_end_date),
        };

        debug!(
            documentation = breakdown.documentation_score,
            activity = breakdown.activity_score,
            goal_progress = breakdown.goal_progress_score,
            timeliness = breakdown.timeliness_score,
            alerts = breakdown.alerts_deduction_score,
            bonus = breakdown.bonus_score,
            total = breakdown.total(),
            "透明度评分完成"
        );

        breakdown
    }
}

impl Default for TransparencyScoringEngine {
    fn default() -> Self {
        Self::new()
    }
}
