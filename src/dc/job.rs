//! 作业（cloudlet）
//!
//! 状态机：Created -> Queued -> Running -> {Success, Failed, Cancelled}。
//! 进入终态后记录不再变化。

use super::id::{HostId, JobId, OwnerId, VmId};
use super::utilization::UtilizationModel;
use crate::sim::SimTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// 作业描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    /// 目标虚拟机；为空时由 Broker 在提交者的虚拟机之间轮询绑定
    #[serde(default)]
    pub vm: Option<VmId>,
    /// 指令长度（MI，百万条指令）
    pub length: f64,
    #[serde(default = "default_pes")]
    pub pes: u32,
    /// 输入文件大小（MB）
    #[serde(default)]
    pub file_size: u64,
    /// 输出文件大小（MB）
    #[serde(default)]
    pub output_size: u64,
    #[serde(default)]
    pub utilization_cpu: UtilizationModel,
    #[serde(default)]
    pub utilization_ram: UtilizationModel,
    #[serde(default)]
    pub utilization_bw: UtilizationModel,
}

fn default_pes() -> u32 {
    1
}

impl JobSpec {
    pub fn new(length: f64) -> Self {
        Self {
            vm: None,
            length,
            pes: 1,
            file_size: 0,
            output_size: 0,
            utilization_cpu: UtilizationModel::Full,
            utilization_ram: UtilizationModel::Full,
            utilization_bw: UtilizationModel::Full,
        }
    }

    pub fn on_vm(mut self, vm: VmId) -> Self {
        self.vm = Some(vm);
        self
    }

    pub fn with_files(mut self, file_size: u64, output_size: u64) -> Self {
        self.file_size = file_size;
        self.output_size = output_size;
        self
    }

    /// 三个维度使用同一个利用率模型
    pub fn with_utilization(mut self, model: UtilizationModel) -> Self {
        self.utilization_cpu = model;
        self.utilization_ram = model;
        self.utilization_bw = model;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Created,
    Queued,
    Running,
    Success,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Success | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

/// 失败原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobFailure {
    /// 目标虚拟机放置失败或已销毁
    VmNotReady,
    /// 运行中虚拟机被移除
    VmPreempted,
    /// 作业请求的核数超过虚拟机声明的核数
    ResourceViolation,
    /// 事件队列耗尽时仍无法推进（有效速率为 0）
    Stalled,
}

/// 作业记录（由数据中心 arena 持有）
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub owner: OwnerId,
    pub vm: VmId,
    pub spec: JobSpec,
    pub status: JobStatus,
    pub failure: Option<JobFailure>,
    pub host: Option<HostId>,
    pub submitted_at: SimTime,
    pub start_time: Option<SimTime>,
    pub finish_time: Option<SimTime>,
    pub cost: f64,
    /// 剩余指令数（MI）
    pub(crate) remaining: f64,
    /// 当前分得的计算份额（MIPS）
    pub(crate) share: f64,
    /// 份额乘以 CPU 利用率后的实际推进速率（MIPS）
    pub(crate) rate: f64,
}

impl Job {
    pub(crate) fn new(id: JobId, owner: OwnerId, vm: VmId, spec: JobSpec, now: SimTime) -> Self {
        let remaining = spec.length.max(0.0);
        Self {
            id,
            owner,
            vm,
            spec,
            status: JobStatus::Created,
            failure: None,
            host: None,
            submitted_at: now,
            start_time: None,
            finish_time: None,
            cost: 0.0,
            remaining,
            share: 0.0,
            rate: 0.0,
        }
    }

    pub fn remaining(&self) -> f64 {
        self.remaining
    }

    pub fn share(&self) -> f64 {
        self.share
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// 处于 Running 的时长（秒）
    pub fn actual_cpu_time(&self) -> f64 {
        match (self.start_time, self.finish_time) {
            (Some(s), Some(f)) => f.since(s).as_secs_f64(),
            _ => 0.0,
        }
    }

    pub(crate) fn mark_queued(&mut self) {
        if self.status == JobStatus::Created {
            self.status = JobStatus::Queued;
        }
    }

    pub(crate) fn start(&mut self, host: HostId, now: SimTime) {
        debug_assert_eq!(self.status, JobStatus::Queued);
        self.status = JobStatus::Running;
        self.host = Some(host);
        self.start_time = Some(now);
    }

    /// 进入终态；已是终态时不做任何修改并返回 false。
    pub(crate) fn finish(
        &mut self,
        status: JobStatus,
        failure: Option<JobFailure>,
        now: SimTime,
    ) -> bool {
        if self.status.is_terminal() {
            warn!(job = ?self.id, status = ?self.status, "作业已处于终态，忽略状态变更");
            return false;
        }
        debug_assert!(status.is_terminal());
        self.status = status;
        self.failure = failure;
        self.finish_time = Some(now);
        self.share = 0.0;
        self.rate = 0.0;
        if status == JobStatus::Success {
            self.remaining = 0.0;
        }
        true
    }
}
