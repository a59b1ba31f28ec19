//! 处理单元（Processing Element）

use serde::{Deserialize, Serialize};

/// 处理单元：一个 CPU 核，容量以 MIPS 计。主机创建后不可修改。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pe {
    pub id: usize,
    mips: f64,
}

impl Pe {
    /// 创建处理单元；`mips` 必须为正（由配置校验保证）。
    pub fn new(id: usize, mips: f64) -> Self {
        debug_assert!(mips > 0.0, "PE capacity must be positive");
        Self { id, mips }
    }

    pub fn mips(&self) -> f64 {
        self.mips
    }
}
