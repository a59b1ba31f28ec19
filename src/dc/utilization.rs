//! 资源利用率模型
//!
//! 给定作业已运行的时间，返回实际使用的资源比例（[0, 1]）。

use crate::sim::SimTime;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UtilizationModel {
    /// 始终使用全部请求资源
    #[default]
    Full,
    /// 恒定比例
    Partial { fraction: f64 },
    /// 伪随机比例；同一 (seed, 时刻) 总是得到同一个值
    Stochastic { seed: u64 },
}

impl UtilizationModel {
    pub fn fraction_at(&self, elapsed: SimTime) -> f64 {
        match *self {
            UtilizationModel::Full => 1.0,
            UtilizationModel::Partial { fraction } => {
                if fraction.is_nan() {
                    0.0
                } else {
                    fraction.clamp(0.0, 1.0)
                }
            }
            UtilizationModel::Stochastic { seed } => {
                let mixed = seed ^ elapsed.0.wrapping_mul(0x9E37_79B9_7F4A_7C15);
                StdRng::seed_from_u64(mixed).gen_range(0.0..=1.0)
            }
        }
    }

    /// 比例会随时间变化（需要周期性重新采样）
    pub fn is_time_varying(&self) -> bool {
        matches!(self, UtilizationModel::Stochastic { .. })
    }
}
