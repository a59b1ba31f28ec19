//! 数据中心（仿真世界）
//!
//! 以 arena 持有主机、虚拟机与作业记录，实体之间只保存 ID。
//! 所有状态修改都发生在事件执行期间；每次主机上的活跃作业集合变化时，
//! 先结算到当前时刻的进度，再重新计算份额并重新投影下一次完成时间。

use super::characteristics::DatacenterCharacteristics;
use super::events::{HostUpdate, VmDestroy};
use super::host::{Host, HostSpec};
use super::id::{HostId, JobId, OwnerId, VmId};
use super::job::{Job, JobFailure, JobSpec, JobStatus};
use super::placement::{FirstFit, PlacementPolicy};
use super::scheduler::{ShareDemand, is_finished, projected_finish, time_shared_shares};
use super::vm::{Vm, VmSpec, VmStatus};
use crate::error::{CloudError, Result};
use crate::resource::ResourceKind;
use crate::sim::{SimTime, Simulator, World};
use serde::Serialize;
use std::any::Any;
use std::collections::BTreeMap;
use tracing::{debug, error, info, trace, warn};

/// 主机资源使用比例快照
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HostUtilization {
    pub cpu: f64,
    /// 已分配给虚拟机的比例
    pub ram: f64,
    pub bw: f64,
    pub storage: f64,
    /// 运行中作业按各自利用率模型实际使用的比例
    pub ram_active: f64,
    pub bw_active: f64,
}

#[derive(Debug)]
pub struct Datacenter {
    characteristics: DatacenterCharacteristics,
    scheduling_interval: Option<SimTime>,
    hosts: Vec<Host>,
    vms: Vec<Vm>,
    jobs: Vec<Job>,
    policy: Box<dyn PlacementPolicy>,
    fatal: Option<CloudError>,
}

impl Default for Datacenter {
    fn default() -> Self {
        Self::new(DatacenterCharacteristics::default())
    }
}

impl World for Datacenter {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn halted(&self) -> bool {
        self.fatal.is_some()
    }
}

impl Datacenter {
    pub fn new(characteristics: DatacenterCharacteristics) -> Self {
        Self {
            characteristics,
            scheduling_interval: None,
            hosts: Vec::new(),
            vms: Vec::new(),
            jobs: Vec::new(),
            policy: Box::new(FirstFit),
            fatal: None,
        }
    }

    pub fn with_policy(mut self, policy: Box<dyn PlacementPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// 设置调度间隔；0 表示关闭周期性重新评估
    pub fn with_scheduling_interval(mut self, interval: SimTime) -> Self {
        self.scheduling_interval = (interval > SimTime::ZERO).then_some(interval);
        self
    }

    /// 添加主机（仅在仿真开始前调用）；至少一个 PE 且 MIPS 为正。
    pub fn add_host(&mut self, spec: &HostSpec) -> Result<HostId> {
        if spec.pes == 0 || !(spec.pe_mips > 0.0 && spec.pe_mips.is_finite()) {
            return Err(CloudError::InvalidSpec(format!(
                "host needs at least one pe with positive mips, got pes={} pe_mips={}",
                spec.pes, spec.pe_mips
            )));
        }
        let id = HostId(self.hosts.len());
        self.hosts.push(Host::new(id, spec));
        Ok(id)
    }

    pub fn characteristics(&self) -> &DatacenterCharacteristics {
        &self.characteristics
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn host(&self, id: HostId) -> Option<&Host> {
        self.hosts.get(id.0)
    }

    pub fn vms(&self) -> &[Vm] {
        &self.vms
    }

    pub fn vm(&self, id: VmId) -> Option<&Vm> {
        self.vms.get(id.0)
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(id.0)
    }

    pub(crate) fn take_fatal(&mut self) -> Option<CloudError> {
        self.fatal.take()
    }

    pub(crate) fn register_vm(&mut self, owner: OwnerId, spec: VmSpec) -> VmId {
        let id = VmId(self.vms.len());
        self.vms.push(Vm::new(id, owner, spec));
        id
    }

    pub(crate) fn register_job(
        &mut self,
        owner: OwnerId,
        vm: VmId,
        spec: JobSpec,
        now: SimTime,
    ) -> JobId {
        let id = JobId(self.jobs.len());
        let mut job = Job::new(id, owner, vm, spec, now);
        job.mark_queued();
        self.jobs.push(job);
        id
    }

    /// 当前各活跃作业的 (作业, 份额)
    pub fn shares(&self, host: HostId) -> Vec<(JobId, f64)> {
        self.hosts
            .get(host.0)
            .map(|h| {
                h.active
                    .iter()
                    .map(|&j| (j, self.jobs[j.0].share))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 资源使用快照。作业的内存/带宽用量取所属虚拟机分配量在其作业间的均分，
    /// 再乘以作业在最近一次结算时刻的利用率。
    pub fn host_utilization(&self, host: HostId) -> Option<HostUtilization> {
        let h = self.hosts.get(host.0)?;
        let mut per_vm: BTreeMap<VmId, usize> = BTreeMap::new();
        for j in &h.active {
            *per_vm.entry(self.jobs[j.0].vm).or_default() += 1;
        }

        let mut used_mips = 0.0;
        let mut ram_in_use = 0.0;
        let mut bw_in_use = 0.0;
        for j in &h.active {
            let job = &self.jobs[j.0];
            let vm = &self.vms[job.vm.0].spec;
            let n = per_vm[&job.vm] as f64;
            let elapsed = job.start_time.map_or(SimTime::ZERO, |s| h.last_update.since(s));
            used_mips += job.rate;
            ram_in_use += vm.ram as f64 / n * job.spec.utilization_ram.fraction_at(elapsed);
            bw_in_use += vm.bw as f64 / n * job.spec.utilization_bw.fraction_at(elapsed);
        }

        let ratio = |used: f64, total: f64| if total > 0.0 { used / total } else { 0.0 };
        let ram = h.provisioner(ResourceKind::Ram);
        let bw = h.provisioner(ResourceKind::Bw);
        Some(HostUtilization {
            cpu: ratio(used_mips, h.total_mips()),
            ram: ram.utilization(),
            bw: bw.utilization(),
            storage: h.provisioner(ResourceKind::Storage).utilization(),
            ram_active: ratio(ram_in_use, ram.total() as f64),
            bw_active: ratio(bw_in_use, bw.total() as f64),
        })
    }

    // ---------------------------------------------------------------------
    // 事件处理
    // ---------------------------------------------------------------------

    /// 放置虚拟机
    #[tracing::instrument(skip(self, sim), fields(vm = ?vm_id, now = ?sim.now()))]
    pub(crate) fn on_vm_create(&mut self, vm_id: VmId, sim: &mut Simulator) {
        let now = sim.now();
        let vm = &self.vms[vm_id.0];
        if vm.status != VmStatus::Pending {
            debug!(status = ?vm.status, "虚拟机不再等待放置，忽略");
            return;
        }
        let spec = vm.spec.clone();

        let placed = match self.policy.select_host(&spec, &self.hosts) {
            Some(host_id) => match self.hosts[host_id.0].vm_create(vm_id, &spec) {
                Ok(()) => Some(host_id),
                Err(e) => {
                    warn!(host = ?host_id, error = %e, "主机拒绝分配");
                    None
                }
            },
            None => None,
        };

        let vm = &mut self.vms[vm_id.0];
        match placed {
            Some(host_id) => {
                vm.status = VmStatus::Placed;
                vm.host = Some(host_id);
                vm.placed_at = Some(now);
                vm.lease_cost = self.characteristics.lease_cost(spec.ram, spec.size);
                info!(host = ?host_id, "🖥️  虚拟机已放置");
                if let Some(lease) = spec.lease {
                    sim.schedule_in(lease, VmDestroy { vm: vm_id });
                }
            }
            None => {
                vm.status = VmStatus::FailedPlacement;
                warn!(error = %CloudError::NoSuitableHost(vm_id), "❌ 虚拟机放置失败");
            }
        }
    }

    /// 作业到达其虚拟机所在主机
    #[tracing::instrument(skip(self, sim), fields(job = ?job_id, now = ?sim.now()))]
    pub(crate) fn on_job_arrive(&mut self, job_id: JobId, sim: &mut Simulator) {
        let now = sim.now();
        let job = &self.jobs[job_id.0];
        if job.status != JobStatus::Queued {
            debug!(status = ?job.status, "作业不在排队状态，忽略");
            return;
        }
        let vm = &self.vms[job.vm.0];
        let host_id = match (vm.status, vm.host) {
            (VmStatus::Placed, Some(h)) => h,
            _ => {
                warn!(vm = ?vm.id, vm_status = ?vm.status, error = %CloudError::VmNotReady(vm.id), "作业无法运行");
                self.jobs[job_id.0].finish(JobStatus::Failed, Some(JobFailure::VmNotReady), now);
                return;
            }
        };
        if job.spec.pes > vm.spec.pes {
            warn!(job_pes = job.spec.pes, vm_pes = vm.spec.pes, "作业核数超过虚拟机核数");
            self.jobs[job_id.0].host = Some(host_id);
            self.jobs[job_id.0].finish(
                JobStatus::Failed,
                Some(JobFailure::ResourceViolation),
                now,
            );
            return;
        }

        self.sync(host_id, now);
        let job = &mut self.jobs[job_id.0];
        job.start(host_id, now);
        if job.remaining <= 0.0 {
            // 零长度作业在到达时立即完成
            self.complete(job_id, now);
            info!("✅ 零长度作业立即完成");
        } else {
            self.hosts[host_id.0].active.push(job_id);
            debug!(host = ?host_id, "作业开始运行");
        }
        self.settle(host_id, sim);
    }

    /// 主机进度结算；`epoch` 过期说明之后已经重新调度过
    pub(crate) fn on_host_update(&mut self, host_id: HostId, epoch: u64, sim: &mut Simulator) {
        if self.hosts[host_id.0].epoch != epoch {
            trace!(host = ?host_id, epoch, "过期的主机更新事件");
            return;
        }
        self.sync(host_id, sim.now());
        self.settle(host_id, sim);
    }

    /// 销毁虚拟机：运行中的作业以 VmPreempted 失败，资源只释放一次
    #[tracing::instrument(skip(self, sim), fields(vm = ?vm_id, now = ?sim.now()))]
    pub(crate) fn on_vm_destroy(&mut self, vm_id: VmId, sim: &mut Simulator) {
        let now = sim.now();
        let vm = &self.vms[vm_id.0];
        let host_id = match (vm.status, vm.host) {
            (VmStatus::Placed, Some(h)) => h,
            (VmStatus::Pending, _) => {
                let vm = &mut self.vms[vm_id.0];
                vm.status = VmStatus::Destroyed;
                vm.destroyed_at = Some(now);
                info!("虚拟机在放置前被撤销");
                return;
            }
            (status, _) => {
                debug!(status = ?status, "虚拟机未驻留在任何主机，忽略");
                return;
            }
        };

        self.sync(host_id, now);
        let victims: Vec<JobId> = self.hosts[host_id.0]
            .active
            .iter()
            .copied()
            .filter(|j| self.jobs[j.0].vm == vm_id)
            .collect();
        for job_id in &victims {
            let e = CloudError::VmPreempted { vm: vm_id, job: *job_id };
            warn!(error = %e, "作业被抢占");
            self.jobs[job_id.0].finish(JobStatus::Failed, Some(JobFailure::VmPreempted), now);
        }
        self.hosts[host_id.0].active.retain(|j| !victims.contains(j));

        if let Err(e) = self.hosts[host_id.0].vm_destroy(vm_id) {
            error!(error = %e, "资源释放不一致");
            self.fatal = Some(e);
            return;
        }
        let vm = &mut self.vms[vm_id.0];
        vm.status = VmStatus::Destroyed;
        vm.destroyed_at = Some(now);
        info!(host = ?host_id, preempted = victims.len(), "🗑️  虚拟机已销毁");
        self.settle(host_id, sim);
    }

    /// 取消作业
    #[tracing::instrument(skip(self, sim), fields(job = ?job_id, now = ?sim.now()))]
    pub(crate) fn on_job_cancel(&mut self, job_id: JobId, sim: &mut Simulator) {
        let now = sim.now();
        let job = &self.jobs[job_id.0];
        match (job.status, job.host) {
            (JobStatus::Running, Some(host_id)) => {
                self.sync(host_id, now);
                if self.jobs[job_id.0].status != JobStatus::Running {
                    debug!("作业恰好在取消时刻完成");
                    self.settle(host_id, sim);
                    return;
                }
                self.hosts[host_id.0].active.retain(|&j| j != job_id);
                self.jobs[job_id.0].finish(JobStatus::Cancelled, None, now);
                info!(host = ?host_id, "作业已取消");
                self.settle(host_id, sim);
            }
            (JobStatus::Created | JobStatus::Queued, _) => {
                self.jobs[job_id.0].finish(JobStatus::Cancelled, None, now);
                info!("作业在运行前被取消");
            }
            (status, _) => debug!(status = ?status, "作业已处于终态，忽略取消"),
        }
    }

    /// 队列耗尽后仍在运行的作业无法再推进，标记为失败
    pub(crate) fn fail_stalled(&mut self, now: SimTime) -> usize {
        let mut count = 0;
        for h in 0..self.hosts.len() {
            let stalled = std::mem::take(&mut self.hosts[h].active);
            for job_id in stalled {
                warn!(job = ?job_id, remaining = self.jobs[job_id.0].remaining, "作业无法推进");
                self.jobs[job_id.0].finish(JobStatus::Failed, Some(JobFailure::Stalled), now);
                count += 1;
            }
            self.hosts[h].epoch = self.hosts[h].epoch.wrapping_add(1);
        }
        count
    }

    // ---------------------------------------------------------------------
    // 时间片共享核心
    // ---------------------------------------------------------------------

    /// 按上一区间的速率把主机上所有活跃作业推进到 `now`
    fn advance(&mut self, host_id: HostId, now: SimTime) {
        let host = &mut self.hosts[host_id.0];
        let dt = now.since(host.last_update).as_secs_f64();
        host.last_update = now;
        if dt <= 0.0 {
            return;
        }
        for &j in &host.active {
            let job = &mut self.jobs[j.0];
            job.remaining = (job.remaining - job.rate * dt).max(0.0);
        }
        trace!(host = ?host_id, dt, active = host.active.len(), "推进作业进度");
    }

    fn complete(&mut self, job_id: JobId, now: SimTime) {
        let job = &mut self.jobs[job_id.0];
        if job.finish(JobStatus::Success, None, now) {
            job.cost = self.characteristics.processing_cost(
                job.actual_cpu_time(),
                job.spec.file_size,
                job.spec.output_size,
            );
        }
    }

    /// 推进进度并结束已完成的作业；同一时刻完成的作业按提交顺序（作业 ID）结束
    fn sync(&mut self, host_id: HostId, now: SimTime) {
        self.advance(host_id, now);

        let mut done: Vec<JobId> = self.hosts[host_id.0]
            .active
            .iter()
            .copied()
            .filter(|j| {
                let job = &self.jobs[j.0];
                is_finished(job.remaining, job.rate)
            })
            .collect();
        done.sort();
        for &job_id in &done {
            self.complete(job_id, now);
            info!(job = ?job_id, host = ?host_id, finish = %now, "✅ 作业完成");
        }
        self.hosts[host_id.0].active.retain(|j| !done.contains(j));
    }

    /// 重新计算份额并投影下一次主机更新
    fn settle(&mut self, host_id: HostId, sim: &mut Simulator) {
        let now = sim.now();
        self.recompute_shares(host_id, now);

        let host = &mut self.hosts[host_id.0];
        host.epoch = host.epoch.wrapping_add(1);
        let epoch = host.epoch;

        let mut next: Option<SimTime> = None;
        let mut time_varying = false;
        for &j in &host.active {
            let job = &self.jobs[j.0];
            time_varying |= job.spec.utilization_cpu.is_time_varying();
            if let Some(t) = projected_finish(now, job.remaining, job.rate) {
                next = Some(next.map_or(t, |n| n.min(t)));
            }
        }
        if let Some(interval) = self.scheduling_interval {
            if time_varying {
                let tick = now.saturating_add(interval);
                next = Some(next.map_or(tick, |n| n.min(tick)));
            }
        }

        match next {
            Some(at) => {
                debug!(host = ?host_id, epoch, next = %at, "投影下一次主机更新");
                sim.schedule(at, HostUpdate { host: host_id, epoch });
            }
            None => trace!(host = ?host_id, "主机没有可推进的作业"),
        }
    }

    /// 活跃集合变化后重新计算每个作业的份额与实际速率
    fn recompute_shares(&mut self, host_id: HostId, now: SimTime) {
        let host = &self.hosts[host_id.0];
        let demands: Vec<ShareDemand> = host
            .active
            .iter()
            .map(|&j| {
                let job = &self.jobs[j.0];
                let vm = &self.vms[job.vm.0].spec;
                ShareDemand {
                    job: j,
                    vm: job.vm,
                    requested: vm.mips * job.spec.pes as f64,
                    vm_cap: vm.max_mips(),
                }
            })
            .collect();
        let shares = time_shared_shares(&demands, host.total_mips());

        for (d, share) in demands.iter().zip(shares) {
            let job = &mut self.jobs[d.job.0];
            let elapsed = job.start_time.map_or(SimTime::ZERO, |s| now.since(s));
            job.share = share;
            job.rate = share * job.spec.utilization_cpu.fraction_at(elapsed);
            trace!(job = ?d.job, share, rate = job.rate, "重新分配份额");
        }
    }
}
