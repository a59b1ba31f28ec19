//! 数据中心事件
//!
//! Broker 的外部请求都先转换为事件，在事件边界上才修改数据中心状态。

use super::datacenter::Datacenter;
use super::id::{HostId, JobId, VmId};
use crate::sim::{Event, Simulator, World};

fn datacenter(world: &mut dyn World) -> &mut Datacenter {
    world
        .as_any_mut()
        .downcast_mut::<Datacenter>()
        .expect("world must be Datacenter")
}

/// 事件：为虚拟机选择主机并分配资源。
#[derive(Debug)]
pub struct VmCreate {
    pub vm: VmId,
}

impl Event for VmCreate {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let VmCreate { vm } = *self;
        datacenter(world).on_vm_create(vm, sim);
    }
}

/// 事件：作业到达其虚拟机所在主机并开始运行。
#[derive(Debug)]
pub struct JobArrive {
    pub job: JobId,
}

impl Event for JobArrive {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let JobArrive { job } = *self;
        datacenter(world).on_job_arrive(job, sim);
    }
}

/// 事件：主机上某个作业的投影完成时刻（或调度间隔）到达。
/// `epoch` 与主机当前值不一致时说明已被重新调度，事件作废。
#[derive(Debug)]
pub struct HostUpdate {
    pub host: HostId,
    pub epoch: u64,
}

impl Event for HostUpdate {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let HostUpdate { host, epoch } = *self;
        datacenter(world).on_host_update(host, epoch, sim);
    }
}

/// 事件：销毁虚拟机（租期结束或外部撤销）。
#[derive(Debug)]
pub struct VmDestroy {
    pub vm: VmId,
}

impl Event for VmDestroy {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let VmDestroy { vm } = *self;
        datacenter(world).on_vm_destroy(vm, sim);
    }
}

/// 事件：取消作业。
#[derive(Debug)]
pub struct JobCancel {
    pub job: JobId,
}

impl Event for JobCancel {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let JobCancel { job } = *self;
        datacenter(world).on_job_cancel(job, sim);
    }
}
