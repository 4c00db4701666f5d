//! # 节奏与重试策略
//!
//! 约束一次运行可以执行多少次外部动作、在什么时间执行，以及瞬时失败如何重试。
//!
//! ## 主要功能
//! - **每日配额**: 按动作类型（连接请求、后续消息）分别计数的令牌桶，按自然日整体补满
//! - **活动窗口**: 工作时间、周末跳过以及午休等休息时段
//! - **指数退避**: 带抖动、带上限的重试延迟
//! - **时钟抽象**: 通过 `Clock` 注入当前时间，便于测试跨天与休息时段
//!
//! ## 模块结构
//! - `clock`: 时钟 trait 与系统时钟、手动时钟实现
//! - `governor`: 配额与活动窗口门控
//! - `retry`: 重试策略

pub mod clock;
pub mod governor;
pub mod retry;


pub use clock::{Clock, ManualClock, SystemClock};
pub use governor::{
    ActionKind, ActivityWindow, BreakInterval, Consumption, DailyLimits, Gate, Quota,
    RateGovernor,
};
pub use retry::RetryPolicy;
