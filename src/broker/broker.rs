//! Broker
//!
//! 持有一次独立的仿真运行（仿真器 + 数据中心）。提交请求不会直接修改数据中心，
//! 而是转换为事件排入队列，在事件边界上生效。Broker 不改变作业结果，只负责排序与收集。

use super::result::{JobResult, SimulationSummary};
use crate::dc::{
    Datacenter, JobArrive, JobCancel, JobId, JobSpec, JobStatus, OwnerId, Vm, VmCreate,
    VmDestroy, VmId, VmSpec, VmStatus,
};
use crate::error::{CloudError, Result};
use crate::sim::{SimTime, Simulator};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// 虚拟机句柄；状态通过 `Broker::vm_status` 查询
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VmHandle {
    pub id: VmId,
    pub owner: OwnerId,
}

/// 作业句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobHandle {
    pub id: JobId,
    pub vm: VmId,
}

pub struct Broker {
    sim: Simulator,
    dc: Datacenter,
    /// 每个提交者的轮询绑定游标
    rr_cursor: HashMap<OwnerId, usize>,
}

impl Broker {
    pub fn new(dc: Datacenter) -> Self {
        Self {
            sim: Simulator::default(),
            dc,
            rr_cursor: HashMap::new(),
        }
    }

    pub fn now(&self) -> SimTime {
        self.sim.now()
    }

    pub fn datacenter(&self) -> &Datacenter {
        &self.dc
    }

    pub fn vm(&self, id: VmId) -> Option<&Vm> {
        self.dc.vm(id)
    }

    pub fn vm_status(&self, handle: VmHandle) -> Option<VmStatus> {
        self.dc.vm(handle.id).map(|vm| vm.status)
    }

    pub fn job_status(&self, handle: JobHandle) -> Option<JobStatus> {
        self.dc.job(handle.id).map(|job| job.status)
    }

    /// 在当前时刻提交虚拟机
    pub fn submit_vms(&mut self, owner: OwnerId, specs: Vec<VmSpec>) -> Result<Vec<VmHandle>> {
        let now = self.sim.now();
        self.submit_vms_at(owner, specs, now)
    }

    /// 在指定时刻提交虚拟机；放置在该时刻的事件边界上进行。
    #[tracing::instrument(skip(self, specs), fields(count = specs.len()))]
    pub fn submit_vms_at(
        &mut self,
        owner: OwnerId,
        specs: Vec<VmSpec>,
        at: SimTime,
    ) -> Result<Vec<VmHandle>> {
        self.check_time(at)?;
        for spec in &specs {
            if !(spec.mips > 0.0 && spec.mips.is_finite()) || spec.pes == 0 {
                return Err(CloudError::InvalidSpec(format!(
                    "vm needs positive mips and at least one pe, got mips={} pes={}",
                    spec.mips, spec.pes
                )));
            }
        }

        let handles: Vec<VmHandle> = specs
            .into_iter()
            .map(|spec| {
                let id = self.dc.register_vm(owner, spec);
                self.sim.schedule(at, VmCreate { vm: id });
                VmHandle { id, owner }
            })
            .collect();
        info!(owner = ?owner, at = %at, "📥 已提交虚拟机");
        Ok(handles)
    }

    /// 在当前时刻提交作业
    pub fn submit_jobs(&mut self, owner: OwnerId, specs: Vec<JobSpec>) -> Result<Vec<JobHandle>> {
        let now = self.sim.now();
        self.submit_jobs_at(owner, specs, now)
    }

    /// 在指定时刻提交作业。
    ///
    /// 所有作业先统一校验，任何一个失败则整批拒绝（不产生任何作业）。
    /// 指定的虚拟机必须属于提交者，且已放置或正在等待放置；否则返回 `VmNotReady`。
    #[tracing::instrument(skip(self, specs), fields(count = specs.len()))]
    pub fn submit_jobs_at(
        &mut self,
        owner: OwnerId,
        specs: Vec<JobSpec>,
        at: SimTime,
    ) -> Result<Vec<JobHandle>> {
        self.check_time(at)?;

        let usable: Vec<VmId> = self
            .dc
            .vms()
            .iter()
            .filter(|vm| vm.owner == owner && vm.accepts_jobs())
            .map(|vm| vm.id)
            .collect();
        let mut cursor = self.rr_cursor.get(&owner).copied().unwrap_or(0);

        let mut bindings = Vec::with_capacity(specs.len());
        for spec in &specs {
            if !(spec.length >= 0.0 && spec.length.is_finite()) || spec.pes == 0 {
                return Err(CloudError::InvalidSpec(format!(
                    "job needs a finite non-negative length and at least one pe, got length={} pes={}",
                    spec.length, spec.pes
                )));
            }
            let vm_id = match spec.vm {
                Some(id) => {
                    let vm = self.dc.vm(id).ok_or(CloudError::UnknownVm(id))?;
                    if vm.owner != owner {
                        return Err(CloudError::InvalidSpec(format!(
                            "{id:?} belongs to {:?}, not {owner:?}",
                            vm.owner
                        )));
                    }
                    if !vm.accepts_jobs() {
                        return Err(CloudError::VmNotReady(id));
                    }
                    id
                }
                None => {
                    if usable.is_empty() {
                        let first = self.dc.vms().iter().find(|vm| vm.owner == owner);
                        return Err(match first {
                            Some(vm) => CloudError::VmNotReady(vm.id),
                            None => CloudError::InvalidSpec(format!(
                                "{owner:?} has no vms to bind jobs to"
                            )),
                        });
                    }
                    let id = usable[cursor % usable.len()];
                    cursor += 1;
                    id
                }
            };
            bindings.push(vm_id);
        }

        self.rr_cursor.insert(owner, cursor);
        let handles: Vec<JobHandle> = specs
            .into_iter()
            .zip(bindings)
            .map(|(spec, vm)| {
                let id = self.dc.register_job(owner, vm, spec, at);
                self.sim.schedule(at, JobArrive { job: id });
                debug!(job = ?id, vm = ?vm, "作业已绑定");
                JobHandle { id, vm }
            })
            .collect();
        info!(owner = ?owner, at = %at, count = handles.len(), "📥 已提交作业");
        Ok(handles)
    }

    /// 在 `at` 时刻销毁虚拟机（运行中的作业将失败）。重复销毁是无害的。
    pub fn destroy_vm(&mut self, vm: VmId, at: SimTime) -> Result<()> {
        self.check_time(at)?;
        if self.dc.vm(vm).is_none() {
            return Err(CloudError::UnknownVm(vm));
        }
        self.sim.schedule(at, VmDestroy { vm });
        Ok(())
    }

    /// 在 `at` 时刻取消作业
    pub fn cancel_job(&mut self, job: JobId, at: SimTime) -> Result<()> {
        self.check_time(at)?;
        if self.dc.job(job).is_none() {
            return Err(CloudError::UnknownJob(job));
        }
        self.sim.schedule(at, JobCancel { job });
        Ok(())
    }

    /// 执行到 `until`（含该时刻的事件），用于中途观察状态。
    pub fn run_until(&mut self, until: SimTime) -> Result<()> {
        self.sim.run_until(until, &mut self.dc);
        match self.dc.take_fatal() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// 驱动仿真直到没有未来事件。
    ///
    /// 队列耗尽时仍在运行（速率为 0）的作业标记为 `Stalled` 失败。
    /// 只有内部一致性错误会以 `Err` 返回。
    #[tracing::instrument(skip(self))]
    pub fn run_until_idle(&mut self) -> Result<SimulationSummary> {
        let events = self.sim.run(&mut self.dc);
        if let Some(e) = self.dc.take_fatal() {
            return Err(e);
        }
        let stalled = self.dc.fail_stalled(self.sim.now());
        if stalled > 0 {
            warn!(stalled, "部分作业无法推进");
        }
        Ok(self.summary(events))
    }

    /// 销毁所有剩余虚拟机，结束本次仿真。
    pub fn shutdown(&mut self) -> Result<SimulationSummary> {
        let now = self.sim.now();
        let live: Vec<VmId> = self
            .dc
            .vms()
            .iter()
            .filter(|vm| vm.accepts_jobs())
            .map(|vm| vm.id)
            .collect();
        for vm in live {
            self.sim.schedule(now, VmDestroy { vm });
        }
        self.run_until_idle()
    }

    /// 所有终态作业，按完成时间排序（同一时刻按作业 ID）。
    pub fn collect_results(&self) -> Vec<JobResult> {
        let mut results: Vec<JobResult> = self
            .dc
            .jobs()
            .iter()
            .filter_map(JobResult::from_job)
            .collect();
        results.sort_by_key(|r| (r.finish_time, r.id));
        results
    }

    fn summary(&self, events: u64) -> SimulationSummary {
        let count = |status: JobStatus| {
            self.dc
                .jobs()
                .iter()
                .filter(|job| job.status == status)
                .count()
        };
        SimulationSummary {
            total_elapsed_time: self.sim.now(),
            events,
            succeeded: count(JobStatus::Success),
            failed: count(JobStatus::Failed),
            cancelled: count(JobStatus::Cancelled),
        }
    }

    fn check_time(&self, at: SimTime) -> Result<()> {
        if at < self.sim.now() {
            return Err(CloudError::InvalidSpec(format!(
                "cannot schedule at {at}, simulation clock is already at {}",
                self.sim.now()
            )));
        }
        Ok(())
    }
}
