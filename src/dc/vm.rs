//! 虚拟机
//!
//! 虚拟机是对某台主机资源的租约：放置后恰好属于一台主机，直到被销毁。

use super::id::{HostId, OwnerId, VmId};
use crate::sim::SimTime;
use serde::{Deserialize, Serialize};

/// 虚拟机资源请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VmSpec {
    /// 每个核的计算速率（MIPS）
    pub mips: f64,
    #[serde(default = "default_pes")]
    pub pes: u32,
    /// 内存（MB）
    pub ram: u64,
    /// 带宽（Mbps）
    pub bw: u64,
    /// 镜像大小（MB）
    pub size: u64,
    #[serde(default = "default_vmm")]
    pub vmm: String,
    /// 租期：放置成功后经过该时长自动销毁
    #[serde(default)]
    pub lease: Option<SimTime>,
}

fn default_pes() -> u32 {
    1
}

fn default_vmm() -> String {
    "Xen".to_string()
}

impl VmSpec {
    pub fn new(mips: f64, pes: u32, ram: u64, bw: u64, size: u64) -> Self {
        Self {
            mips,
            pes,
            ram,
            bw,
            size,
            vmm: default_vmm(),
            lease: None,
        }
    }

    pub fn with_lease(mut self, lease: SimTime) -> Self {
        self.lease = Some(lease);
        self
    }

    /// 该虚拟机能获得的计算份额上限（所有核之和）
    pub fn max_mips(&self) -> f64 {
        self.mips * self.pes as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VmStatus {
    /// 已提交，等待放置事件
    Pending,
    Placed,
    FailedPlacement,
    Destroyed,
}

/// 虚拟机记录（由数据中心 arena 持有）
#[derive(Debug, Clone)]
pub struct Vm {
    pub id: VmId,
    pub owner: OwnerId,
    pub spec: VmSpec,
    pub status: VmStatus,
    pub host: Option<HostId>,
    pub placed_at: Option<SimTime>,
    pub destroyed_at: Option<SimTime>,
    pub lease_cost: f64,
}

impl Vm {
    pub(crate) fn new(id: VmId, owner: OwnerId, spec: VmSpec) -> Self {
        Self {
            id,
            owner,
            spec,
            status: VmStatus::Pending,
            host: None,
            placed_at: None,
            destroyed_at: None,
            lease_cost: 0.0,
        }
    }

    /// 仍可接收作业（已放置，或放置事件尚未执行）
    pub fn accepts_jobs(&self) -> bool {
        matches!(self.status, VmStatus::Pending | VmStatus::Placed)
    }
}
