// ==========================================
// 募捐活动结项 - 活动状态机
// ==========================================
// 职责: 校验活动生命周期状态转换
// 规则: 只允许前向边；completed / rejected 为终态
//
//   draft            -> {pending_approval, rejected}
//   pending_approval -> {active, rejected}
//   active           -> {paused, completed}
//   paused           -> {active, completed}
//   completed        -> {}
//   rejected         -> {}
// ==========================================

use crate::domain::types::CampaignStatus;

// ==========================================
// CampaignStatusMachine - 活动状态机
// ==========================================
pub struct CampaignStatusMachine {
    // 无状态引擎
}

impl CampaignStatusMachine {
    pub fn new() -> Self {
        Self {}
    }

    /// 某状态允许到达的目标状态集合
    pub fn allowed_targets(&self, from: CampaignStatus) -> &'static [CampaignStatus] {
        match from {
            CampaignStatus::Draft => &[CampaignStatus::PendingApproval, CampaignStatus::Rejected],
            CampaignStatus::PendingApproval => {
                &[CampaignStatus::Active, CampaignStatus::Rejected]
            }
            CampaignStatus::Active => &[CampaignStatus::Paused, CampaignStatus::Completed],
            CampaignStatus::Paused => &[CampaignStatus::Active, CampaignStatus::Completed],
            CampaignStatus::Completed | CampaignStatus::Rejected => &[],
        }
    }

    /// 判断状态转换是否合法
    pub fn can_transition_to(&self, from: CampaignStatus, to: CampaignStatus) -> bool {
        self.allowed_targets(from).contains(&to)
    }

    /// 以存储原始值判断状态转换
    ///
    /// 未知的 from / to 一律拒绝
    pub fn can_transition_raw(&self, from: &str, to: &str) -> bool {
        match (CampaignStatus::parse(from), CampaignStatus::parse(to)) {
            (Some(from), Some(to)) => self.can_transition_to(from, to),
            _ => false,
        }
    }

    /// 当前状态是否允许结项
    pub fn can_close(&self, current: CampaignStatus) -> bool {
        current.is_closable() && self.can_transition_to(current, CampaignStatus::Completed)
    }
}

impl Default for CampaignStatusMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_edges() {
        let m = CampaignStatusMachine::new();
        assert!(m.can_transition_to(CampaignStatus::Draft, CampaignStatus::PendingApproval));
        assert!(m.can_transition_to(CampaignStatus::Draft, CampaignStatus::Rejected));
        assert!(m.can_transition_to(CampaignStatus::PendingApproval, CampaignStatus::Active));
        assert!(m.can_transition_to(CampaignStatus::Active, CampaignStatus::Paused));
        assert!(m.can_transition_to(CampaignStatus::Paused, CampaignStatus::Active));
        assert!(m.can_transition_to(CampaignStatus::Paused, CampaignStatus::Completed));
    }

    #[test]
    fn test_illegal_edges() {
        let m = CampaignStatusMachine::new();
        assert!(!m.can_transition_to(CampaignStatus::Draft, CampaignStatus::Active));
        assert!(!m.can_transition_to(CampaignStatus::Active, CampaignStatus::Draft));
        assert!(!m.can_transition_to(CampaignStatus::Active, CampaignStatus::Active));
        assert!(!m.can_transition_to(CampaignStatus::PendingApproval, CampaignStatus::Completed));
    }

    #[test]
    fn test_terminal_states_have_no_exit() {
        let m = CampaignStatusMachine::new();
        for to in CampaignStatus::ALL {
            assert!(!m.can_transition_to(CampaignStatus::Completed, to));
            assert!(!m.can_transition_to(CampaignStatus::Rejected, to));
        }
    }

    #[test]
    fn test_unknown_raw_values_rejected() {
        let m = CampaignStatusMachine::new();
        assert!(m.can_transition_raw("active", "completed"));
        assert!(!m.can_transition_raw("archived", "completed"));
        assert!(!m.can_transition_raw("active", "archived"));
        assert!(!m.can_transition_raw("", ""));
    }

    #[test]
    fn test_can_close_only_active_or_paused() {
        let m = CampaignStatusMachine::new();
        let closable: Vec<_> = CampaignStatus::ALL
            .into_iter()
            .filter(|s| m.can_close(*s))
            .collect();
        assert_eq!(closable, vec![CampaignStatus::Active, CampaignStatus::Paused]);
    }
}
