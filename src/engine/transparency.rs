// ==========================================
// 募捐活动结项 - 透明度评分引擎
// ==========================================
// 职责: 结项指标 → 六项加权明细 → 截断后的总分
// 红线: 纯函数，无副作用，无 I/O
// ==========================================
// 分项上限:
//   文档化 30 / 动态 25 / 目标进度 20 / 及时性 15 / 预警扣分 -10 / 加分 10
// ==========================================

mod components;
mod core;


pub use core::TransparencyScoringEngine;
