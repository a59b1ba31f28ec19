//! 单维度资源分配器
//!
//! 追踪某一资源维度（内存/带宽/存储）的已分配量。分配要么整体成功，要么不做任何修改。

use super::kind::ResourceKind;
use crate::dc::HostId;
use crate::error::{CloudError, Result};

#[derive(Debug, Clone)]
pub struct Provisioner {
    host: HostId,
    kind: ResourceKind,
    total: u64,
    used: u64,
}

impl Provisioner {
    pub fn new(host: HostId, kind: ResourceKind, total: u64) -> Self {
        Self {
            host,
            kind,
            total,
            used: 0,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn available(&self) -> u64 {
        self.total - self.used
    }

    pub fn can_allocate(&self, amount: u64) -> bool {
        amount <= self.available()
    }

    /// 预留 `amount`；`used + amount > total` 时返回 `InsufficientCapacity`，状态不变。
    pub fn allocate(&mut self, amount: u64) -> Result<()> {
        if !self.can_allocate(amount) {
            return Err(CloudError::InsufficientCapacity {
                kind: self.kind,
                requested: amount,
                available: self.available(),
            });
        }
        self.used += amount;
        Ok(())
    }

    /// 归还 `amount`；超过已分配量说明调用方重复释放，返回 `InvalidRelease`。
    pub fn release(&mut self, amount: u64) -> Result<()> {
        if amount > self.used {
            return Err(CloudError::InvalidRelease {
                host: self.host,
                kind: self.kind,
                requested: amount,
                allocated: self.used,
            });
        }
        self.used -= amount;
        Ok(())
    }

    /// 已用比例，容量为 0 时视为 0。
    pub fn utilization(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.used as f64 / self.total as f64
        }
    }
}
