//! 物理主机
//!
//! 主机由若干 PE 与内存/带宽/存储三个 Provisioner 组成。
//! 计算能力按时间片共享（允许超售），其余三个维度严格按容量分配。

use super::id::{HostId, JobId, VmId};
use super::vm::VmSpec;
use crate::error::{CloudError, Result};
use crate::resource::{Pe, Provisioner, ResourceKind};
use crate::sim::SimTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// 主机配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostSpec {
    #[serde(default = "default_pes")]
    pub pes: u32,
    /// 每个 PE 的 MIPS
    pub pe_mips: f64,
    /// 内存（MB）
    pub ram: u64,
    /// 带宽（Mbps）
    pub bw: u64,
    /// 存储（MB）
    pub storage: u64,
}

fn default_pes() -> u32 {
    1
}

impl HostSpec {
    pub fn new(pes: u32, pe_mips: f64, ram: u64, bw: u64, storage: u64) -> Self {
        Self {
            pes,
            pe_mips,
            ram,
            bw,
            storage,
        }
    }
}

/// 一台虚拟机在主机上占用的资源
#[derive(Debug, Clone, Copy)]
struct Lease {
    vm: VmId,
    pes: u32,
    ram: u64,
    bw: u64,
    storage: u64,
}

#[derive(Debug, Clone)]
pub struct Host {
    id: HostId,
    pes: Vec<Pe>,
    ram: Provisioner,
    bw: Provisioner,
    storage: Provisioner,
    leases: Vec<Lease>,
    /// 正在运行的作业（按到达顺序）
    pub(crate) active: Vec<JobId>,
    /// 作业进度最后一次结算的时刻
    pub(crate) last_update: SimTime,
    /// 每次重新调度递增，用于识别过期的 HostUpdate 事件
    pub(crate) epoch: u64,
}

impl Host {
    pub fn new(id: HostId, spec: &HostSpec) -> Self {
        let pes = (0..spec.pes as usize)
            .map(|i| Pe::new(i, spec.pe_mips))
            .collect();
        Self {
            id,
            pes,
            ram: Provisioner::new(id, ResourceKind::Ram, spec.ram),
            bw: Provisioner::new(id, ResourceKind::Bw, spec.bw),
            storage: Provisioner::new(id, ResourceKind::Storage, spec.storage),
            leases: Vec::new(),
            active: Vec::new(),
            last_update: SimTime::ZERO,
            epoch: 0,
        }
    }

    pub fn id(&self) -> HostId {
        self.id
    }

    pub fn pes(&self) -> &[Pe] {
        &self.pes
    }

    /// 所有 PE 的 MIPS 之和
    pub fn total_mips(&self) -> f64 {
        self.pes.iter().map(Pe::mips).sum()
    }

    pub fn provisioner(&self, kind: ResourceKind) -> &Provisioner {
        match kind {
            ResourceKind::Ram => &self.ram,
            ResourceKind::Bw => &self.bw,
            ResourceKind::Storage => &self.storage,
        }
    }

    /// 驻留虚拟机（按放置顺序）
    pub fn resident_vms(&self) -> impl Iterator<Item = VmId> + '_ {
        self.leases.iter().map(|l| l.vm)
    }

    pub fn hosts_vm(&self, vm: VmId) -> bool {
        self.leases.iter().any(|l| l.vm == vm)
    }

    pub fn active_jobs(&self) -> &[JobId] {
        &self.active
    }

    /// 尚未被虚拟机声明的 PE 数
    pub fn free_pes(&self) -> u32 {
        let claimed: u32 = self.leases.iter().map(|l| l.pes).sum();
        (self.pes.len() as u32).saturating_sub(claimed)
    }

    /// 能否容纳该虚拟机：核数不超过主机 PE 数，内存/带宽/存储均有余量。
    /// 计算速率不参与判断（时间片共享允许超售）。
    pub fn is_suitable_for(&self, vm: &VmSpec) -> bool {
        vm.pes as usize <= self.pes.len()
            && self.ram.can_allocate(vm.ram)
            && self.bw.can_allocate(vm.bw)
            && self.storage.can_allocate(vm.size)
    }

    /// 为虚拟机分配内存/带宽/存储。任何一个维度失败都会回滚已分配的部分。
    #[tracing::instrument(skip(self, spec), fields(host = ?self.id))]
    pub fn vm_create(&mut self, vm: VmId, spec: &VmSpec) -> Result<()> {
        if self.hosts_vm(vm) {
            return Ok(());
        }
        if spec.pes as usize > self.pes.len() {
            return Err(CloudError::NoSuitableHost(vm));
        }
        self.ram.allocate(spec.ram)?;
        if let Err(e) = self.bw.allocate(spec.bw) {
            self.ram.release(spec.ram)?;
            return Err(e);
        }
        if let Err(e) = self.storage.allocate(spec.size) {
            self.bw.release(spec.bw)?;
            self.ram.release(spec.ram)?;
            return Err(e);
        }
        self.leases.push(Lease {
            vm,
            pes: spec.pes,
            ram: spec.ram,
            bw: spec.bw,
            storage: spec.size,
        });
        debug!(
            ram_used = self.ram.used(),
            bw_used = self.bw.used(),
            storage_used = self.storage.used(),
            "虚拟机资源已分配"
        );
        Ok(())
    }

    /// 释放虚拟机占用的资源。虚拟机不在本机时返回 `Ok(false)`，
    /// 因此重复销毁只会释放一次。
    #[tracing::instrument(skip(self), fields(host = ?self.id))]
    pub fn vm_destroy(&mut self, vm: VmId) -> Result<bool> {
        let Some(pos) = self.leases.iter().position(|l| l.vm == vm) else {
            trace!("虚拟机不在本机，忽略");
            return Ok(false);
        };
        let lease = self.leases.remove(pos);
        self.ram.release(lease.ram)?;
        self.bw.release(lease.bw)?;
        self.storage.release(lease.storage)?;
        debug!(
            ram_used = self.ram.used(),
            bw_used = self.bw.used(),
            storage_used = self.storage.used(),
            "虚拟机资源已释放"
        );
        Ok(true)
    }
}
