//! 仿真结果

use crate::dc::{HostId, Job, JobFailure, JobId, JobStatus, OwnerId, VmId};
use crate::sim::SimTime;
use serde::Serialize;

/// 一次 `run_until_idle` 的汇总
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationSummary {
    /// 仿真时钟的最终时刻
    pub total_elapsed_time: SimTime,
    /// 本次执行的事件数
    pub events: u64,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
}

/// 终态作业记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobResult {
    pub id: JobId,
    pub owner: OwnerId,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<JobFailure>,
    pub host_id: Option<HostId>,
    pub vm_id: VmId,
    pub submit_time: SimTime,
    pub start_time: Option<SimTime>,
    pub finish_time: Option<SimTime>,
    /// 实际运行时长（秒）
    pub actual_cpu_time: f64,
    pub cost: f64,
}

impl JobResult {
    /// 仅终态作业会生成结果
    pub fn from_job(job: &Job) -> Option<Self> {
        if !job.status.is_terminal() {
            return None;
        }
        Some(Self {
            id: job.id,
            owner: job.owner,
            status: job.status,
            failure: job.failure,
            host_id: job.host,
            vm_id: job.vm,
            submit_time: job.submitted_at,
            start_time: job.start_time,
            finish_time: job.finish_time,
            actual_cpu_time: job.actual_cpu_time(),
            cost: job.cost,
        })
    }
}
