//! 场景构建
//!
//! 把 `ScenarioSpec` 展开为数据中心与 Broker，并提供一次完整运行的便捷入口。

use crate::broker::{Broker, JobResult, SimulationSummary};
use crate::dc::{Datacenter, OwnerId, Vm, VmStatus};
use crate::error::Result;
use crate::sim::{DatacenterSpec, ScenarioSpec, SimTime};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// 一次场景运行的输出
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub summary: SimulationSummary,
    pub results: Vec<JobResult>,
    pub vms: Vec<VmReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VmReport {
    pub id: usize,
    pub owner: u32,
    pub status: VmStatus,
    pub host_id: Option<usize>,
    pub lease_cost: f64,
}

impl From<&Vm> for VmReport {
    fn from(vm: &Vm) -> Self {
        Self {
            id: vm.id.0,
            owner: vm.owner.0,
            status: vm.status,
            host_id: vm.host.map(|h| h.0),
            lease_cost: vm.lease_cost,
        }
    }
}

/// 读取并校验场景文件
pub fn load_scenario(path: &Path) -> Result<ScenarioSpec> {
    let raw = std::fs::read_to_string(path)?;
    ScenarioSpec::from_json(&raw)
}

/// 按主机组展开数据中心
pub fn build_datacenter(spec: &DatacenterSpec) -> Result<Datacenter> {
    let interval = SimTime::from_millis(spec.scheduling_interval_ms.unwrap_or(0));
    let mut dc = Datacenter::new(spec.characteristics.clone())
        .with_policy(spec.placement.into_policy())
        .with_scheduling_interval(interval);
    for group in &spec.hosts {
        for _ in 0..group.count {
            dc.add_host(&group.host)?;
        }
    }
    info!(
        name = %spec.characteristics.name,
        hosts = dc.hosts().len(),
        "🏗️  数据中心已构建"
    );
    Ok(dc)
}

/// 构建 Broker 并提交所有用户的虚拟机与作业（虚拟机先于作业）
pub fn build_broker(spec: &ScenarioSpec) -> Result<Broker> {
    spec.validate()?;
    let mut broker = Broker::new(build_datacenter(&spec.datacenter)?);
    for user in &spec.users {
        let owner = OwnerId(user.id);
        let vms = user
            .vms
            .iter()
            .flat_map(|g| std::iter::repeat_n(g.vm.clone(), g.count as usize))
            .collect();
        broker.submit_vms(owner, vms)?;
    }
    for user in &spec.users {
        let owner = OwnerId(user.id);
        for group in &user.jobs {
            let at = SimTime::from_millis(group.submit_ms.unwrap_or(0));
            let jobs = std::iter::repeat_n(group.job.clone(), group.count as usize).collect();
            broker.submit_jobs_at(owner, jobs, at)?;
        }
    }
    Ok(broker)
}

/// 运行场景直到空闲，然后销毁剩余虚拟机并收集结果
pub fn run_scenario(spec: &ScenarioSpec) -> Result<ScenarioReport> {
    let mut broker = build_broker(spec)?;
    let summary = broker.run_until_idle()?;
    broker.shutdown()?;
    Ok(ScenarioReport {
        summary,
        results: broker.collect_results(),
        vms: broker.datacenter().vms().iter().map(VmReport::from).collect(),
    })
}
