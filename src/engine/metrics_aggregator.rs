// ==========================================
// 募捐活动结项 - 指标聚合引擎
// ==========================================
// 职责: 从协作方数据源拉取四组独立指标 + 合同检查，组装 ClosureMetrics
// 硬依赖: 捐赠 / 票据 / 动态（失败则中止结项，带上下文）
// 尽力而为: 预警（失败按 0 计）、合同（失败按"无合同"计）
// ==========================================

use crate::domain::campaign::CampaignInfo;
use crate::domain::metrics::{
    ActivityMetrics, AlertMetrics, ClosureMetrics, DEFAULT_AVERAGE_DAYS_BETWEEN_ACTIVITIES,
};
use crate::engine::sources::{ClosureMetricsSource, ContractRegistry};
use crate::repository::error::RepositoryError;
use futures::TryFutureExt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{instrument, warn};

/// 硬依赖指标查询失败
#[derive(Error, Debug)]
#[error("{context}: {source}")]
pub struct AggregationError {
    pub context: &'static str,
    #[source]
    pub source: RepositoryError,
}

impl AggregationError {
    fn wrap(context: &'static str) -> impl FnOnce(RepositoryError) -> Self {
        move |source| AggregationError { context, source }
    }
}

// ==========================================
// MetricsAggregator - 指标聚合引擎
// ==========================================
pub struct MetricsAggregator {
    metrics_source: Arc<dyn ClosureMetricsSource>,
    contract_registry: Arc<dyn ContractRegistry>,
}

impl MetricsAggregator {
    pub fn new(
        metrics_source: Arc<dyn ClosureMetricsSource>,
        contract_registry: Arc<dyn ContractRegistry>,
    ) -> Self {
        Self {
            metrics_source,
            contract_registry,
        }
    }

    /// 聚合结项指标
    ///
    /// 四组指标互相独立，并发拉取。
    ///
    /// # 参数
    /// - `campaign`: 活动信息（已通过状态校验）
    /// - `organizer_name`: 已解析的组织者名称
    ///
    /// # 返回
    /// - Ok(ClosureMetrics): 完整指标快照
    /// - Err(AggregationError): 硬依赖失败
    #[instrument(skip(self, campaign), fields(campaign_id = %campaign.id))]
    pub async fn aggregate(
        &self,
        campaign: &CampaignInfo,
        organizer_name: &str,
    ) -> Result<ClosureMetrics, AggregationError> {
        let campaign_id = campaign.id;

        let hard = async {
            futures::try_join!(
                self.metrics_source
                    .donation_metrics(campaign_id)
                    .map_err(AggregationError::wrap("获取捐赠指标失败")),
                self.metrics_source
                    .receipt_metrics(campaign_id)
                    .map_err(AggregationError::wrap("获取票据指标失败")),
                self.metrics_source
                    .activity_metrics(campaign_id)
                    .map_err(AggregationError::wrap("获取动态指标失败")),
            )
        };

        let (hard, alerts, has_contract) = futures::join!(
            hard,
            self.metrics_source.alert_metrics(campaign_id),
            self.contract_registry.has_contract(campaign_id),
        );
        let (donations, receipts, activities) = hard?;

        let alerts = alerts.unwrap_or_else(|e| {
            warn!(%campaign_id, error = %e, "预警指标获取失败，按 0 计");
            AlertMetrics::default()
        });

        let has_contract = has_contract.unwrap_or_else(|e| {
            warn!(%campaign_id, error = %e, "合同检查失败，按无合同计");
            false
        });

        Ok(ClosureMetrics {
            campaign_goal: campaign.goal,
            campaign_start: campaign.start_date,
            campaign_end: campaign.end_date,
            has_contract,
            campaign_title: campaign.title.clone(),
            organizer_name: organizer_name.to_string(),
            organizer_id: campaign.organizer_id,
            total_raised: donations.total_raised,
            total_donors: donations.total_donors,
            total_donations: donations.total_donations,
            total_expenses: receipts.total_expenses,
            total_receipts: receipts.total_receipts,
            receipts_with_documents: receipts.receipts_with_documents,
            total_activities: activities.total_activities,
            average_days_between_activities: resolve_average_days(&activities),
            alerts_count: alerts.alerts_count,
            alerts_resolved: alerts.alerts_resolved,
        })
    }
}

/// 动态平均间隔天数；少于两条或无法计算时取默认 30 天
pub fn resolve_average_days(activities: &ActivityMetrics) -> f64 {
    if activities.total_activities < 2 {
        return DEFAULT_AVERAGE_DAYS_BETWEEN_ACTIVITIES;
    }
    match activities.average_days_between_activities {
        Some(days) if days.is_finite() && days >= 0.0 => days,
        _ => DEFAULT_AVERAGE_DAYS_BETWEEN_ACTIVITIES,
    }
}
