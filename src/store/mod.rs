//! # 持久化存储
//!
//! 保存跨运行的全部状态：连接记录、消息记录、每日计数、已处理目标以及登录会话。
//!
//! ## 主要功能
//! - **连接记录**: 以目标标识为键的插入或更新，按状态查询
//! - **消息记录**: 判断某个连接是否已经成功发送过跟进消息
//! - **每日计数**: 按日期累计连接请求与消息数量，重启后恢复配额
//! - **去重标记**: 已处理过的目标在后续运行中直接跳过
//! - **会话**: 登录后的 Cookie 快照，用于下次运行免登录
//!
//! ## 模块结构
//! - `traits`: `Store` trait 与记录类型
//! - `sqlite`: 基于 SQLite 的持久实现
//! - `memory`: 进程内实现，可模拟存储不可用

pub mod traits;
pub mod memory;
pub mod sqlite;


pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{
    ConnectionRecord, ConnectionStatus, MessageRecord, MessageStatus, SessionRecord, Store,
};
