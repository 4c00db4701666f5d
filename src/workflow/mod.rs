//! # 外联工作流
//!
//! 按阶段状态机执行一次完整的外联运行：认证、搜索、发送连接请求、检测已接受的连接并发送后续消息。
//!
//! ## 主要功能
//! - **状态机**: `Idle → Authenticating → Searching → Connecting → Messaging → Idle`，
//!   任一活动阶段都可以进入 `Stopped` 或 `Failed`
//! - **会话恢复**: 优先使用已保存的 Cookie，失效时清除并重新登录
//! - **安全验证**: 登录后识别两步验证、验证码等验证页面，立即终止并提示人工处理
//! - **去重**: 已处理过的目标在后续运行中不会再次访问
//! - **配额与节奏**: 每个不可撤销动作前检查活动窗口与每日配额，动作之间按配置停顿
//! - **模板渲染**: `{{firstName}}` 等占位符的个性化替换，空值时连同前置连接词一起移除
//! - **协作式停止**: 每个检查点都会响应停止信号，不会中断正在进行的单个动作
//!
//! ## 错误处理
//! - 瞬时错误（超时、导航失败）由重试策略处理，重试耗尽后跳过当前目标
//! - 目标状态错误（元素缺失）跳过当前目标
//! - 安全验证与致命错误终止运行
//! - 持久化错误只记录日志并计数，不中断运行
//!
//! ## 模块结构
//! - `state`: 阶段状态与合法转换
//! - `challenge`: 安全验证识别
//! - `template`: 模板校验与渲染
//! - `parser`: 个人主页链接与资料解析
//! - `humanize`: 将行为模型作用于页面驱动
//! - `context`: 运行上下文与停止信号
//! - `report`: 运行报告
//! - `auth` / `search` / `connect` / `messaging`: 各阶段实现
//! - `orchestrator`: 阶段编排

pub mod state;
pub mod challenge;
pub mod template;
pub mod parser;
pub mod humanize;
pub mod context;
pub mod report;
pub mod auth;
pub mod search;
pub mod connect;
pub mod messaging;
pub mod orchestrator;


pub use challenge::ChallengeKind;
pub use context::{stop_channel, Flow, RunContext, StopHandle, StopSignal};
pub use humanize::Humanizer;
pub use orchestrator::PhaseOrchestrator;
pub use parser::ProfileParser;
pub use report::{RunOutcome, RunReport};
pub use state::{FailureReason, PhaseState};
pub use template::TemplateVars;
