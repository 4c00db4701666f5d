//! # 页面驱动
//!
//! 工作流与浏览器之间的唯一接口。工作流只按元素用途（`ElementRole`）查找元素，
//! 具体的选择器与查找策略由适配器负责。
//!
//! ## 主要功能
//! - **页面操作**: 导航、等待加载、读取当前 URL 与页面内容
//! - **元素查找**: 每个用途对应一组有序探针，返回第一个命中的元素
//! - **输入事件**: 鼠标移动、点击、逐字符输入、退格与滚轮滚动
//! - **身份伪装**: User-Agent、语言、视口、时区覆盖以及文档级脚本注入
//! - **Cookie**: 读取与写入，用于会话保存与恢复
//!
//! ## 模块结构
//! - `traits`: `PageDriver` trait
//! - `types`: 元素用途、元素句柄与 Cookie
//! - `connection`: CDP WebSocket 连接（JSON-RPC 请求与响应匹配）
//! - `selectors`: 用途到探针列表的映射，可由配置覆盖
//! - `cdp`: 基于 Chrome DevTools Protocol 的实现
//! - `mock`: 脚本化的内存站点，供测试使用

pub mod traits;
pub mod types;
pub mod connection;
pub mod selectors;
pub mod cdp;
pub mod mock;

#[cfg(test)]
mod tests;

pub use cdp::CdpPageDriver;
pub use mock::{DriverCall, MockElement, MockPage, MockPageDriver};
pub use selectors::{Probe, SelectorTable};
pub use traits::PageDriver;
pub use types::{Cookie, ElementHandle, ElementRole, ReadTarget};
