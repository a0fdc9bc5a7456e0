// ==========================================
// 募捐活动结项 - 活动状态 API
// ==========================================
// 职责: 经状态机校验的生命周期转换
// 约束: completed 只能经由结项流程到达（保证每个已结项活动都有报告）
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::campaign::CampaignInfo;
use crate::domain::types::CampaignStatus;
use crate::engine::sources::CampaignDirectory;
use crate::engine::status_machine::CampaignStatusMachine;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub struct CampaignStatusApi {
    campaigns: Arc<dyn CampaignDirectory>,
    status_machine: CampaignStatusMachine,
}

impl CampaignStatusApi {
    pub fn new(campaigns: Arc<dyn CampaignDirectory>) -> Self {
        Self {
            campaigns,
            status_machine: CampaignStatusMachine::new(),
        }
    }

    pub async fn get_campaign(&self, campaign_id: Uuid) -> ApiResult<CampaignInfo> {
        Ok(self.campaigns.get_campaign_for_closure(campaign_id).await?)
    }

    /// 状态转换
    ///
    /// # 返回
    /// - Ok(CampaignInfo): 转换后的活动
    /// - Err(ValidationError): 目标为 completed（须走结项流程）
    /// - Err(InvalidStateTransition): 状态机不允许，或校验后状态已被并发修改
    pub async fn transition_status(
        &self,
        campaign_id: Uuid,
        target: CampaignStatus,
    ) -> ApiResult<CampaignInfo> {
        if target == CampaignStatus::Completed {
            return Err(ApiError::ValidationError(
                "活动结项必须通过结项流程完成".to_string(),
            ));
        }

        let mut campaign = self.campaigns.get_campaign_for_closure(campaign_id).await?;
        let from = campaign.status;

        if !self.status_machine.can_transition_to(from, target) {
            return Err(ApiError::InvalidStateTransition {
                from: from.to_string(),
                to: target.to_string(),
            });
        }

        // 以读取到的状态做比较写入，期间被结项等并发修改时拒绝
        self.campaigns.update_status(campaign_id, from, target).await?;
        info!(%campaign_id, from = %from, to = %target, "活动状态已更新");

        campaign.status = target;
        Ok(campaign)
    }
}
