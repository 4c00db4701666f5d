//! # 行为模拟模型
//!
//! 生成与真人操作在统计上难以区分的输入序列，用于规避自动化流量检测。
//!
//! ## 主要功能
//! - **延迟生成**: 基于 Box-Muller 变换的正态分布与均匀分布延迟
//! - **鼠标轨迹**: 三次贝塞尔曲线路径，步数遵循 Fitts 定律，可带过冲修正
//! - **键盘输入**: 相邻键误触、识别停顿、退格修正以及分段连击
//! - **页面滚动**: 先加速、匀速、后减速的滚动步长，可带回滚修正
//! - **身份轮换**: User-Agent、视口、时区、Accept-Language 以及反检测脚本
//!
//! ## 随机源
//! 每个模型在构造时接收独立的 `StdRng`，由 [`ModelSeeds`] 从同一个主种子派生。
//! 固定种子即可完整复现一次运行的全部随机行为。
//!
//! ## 模块结构
//! - `timing`: 延迟分布与采样
//! - `motion`: 鼠标轨迹生成
//! - `typing`: 按键序列生成
//! - `scroll`: 滚动步长生成
//! - `identity`: 浏览器身份与反检测脚本
//!
//! ## 使用示例
//! ```rust
//! use outreach_oxide::config::TypingConfig;
//! use outreach_oxide::stealth::{ModelSeeds, TypingModel, TimingModel};
//!
//! let mut seeds = ModelSeeds::new(Some(7));
//! let mut typing = TypingModel::new(TypingConfig::default(), TimingModel::new(seeds.next_rng()));
//! let keys = typing.keystrokes("Hello there");
//! assert_eq!(keys.replay(), "Hello there");
//! ```

pub mod timing;
pub mod motion;
pub mod typing;
pub mod scroll;
pub mod identity;

#[cfg(test)]
mod tests;

pub use timing::{DelayProfile, TimingModel};
pub use motion::{MotionModel, MotionPath, Point, Rect};
pub use typing::{KeyEvent, KeySequence, TypingModel};
pub use scroll::{ScrollModel, ScrollStep};
pub use identity::{IdentityModel, IdentityProfile, Viewport};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Derives one independent generator per model from a master seed
#[derive(Debug)]
pub struct ModelSeeds {
    master: StdRng,
}

impl ModelSeeds {
    /// Seeded when `seed` is given, OS entropy otherwise
    pub fn new(seed: Option<u64>) -> Self {
        let master = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { master }
    }

    /// Next child generator
    pub fn next_rng(&mut self) -> StdRng {
        StdRng::seed_from_u64(self.master.gen())
    }

    /// Next child generator wrapped as a timing source
    pub fn next_timing(&mut self) -> TimingModel {
        TimingModel::new(self.next_rng())
    }
}
