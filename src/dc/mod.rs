//! 数据中心模块
//!
//! 主机、虚拟机、作业的数据模型，放置策略，以及时间片共享调度核心。

// 子模块声明
mod characteristics;
mod datacenter;
mod events;
mod host;
mod id;
mod job;
mod placement;
mod scheduler;
mod utilization;
mod vm;

// 重新导出公共接口
pub use characteristics::DatacenterCharacteristics;
pub use datacenter::{Datacenter, HostUtilization};
pub use events::{HostUpdate, JobArrive, JobCancel, VmCreate, VmDestroy};
pub use host::{Host, HostSpec};
pub use id::{HostId, JobId, OwnerId, VmId};
pub use job::{Job, JobFailure, JobSpec, JobStatus};
pub use placement::{FirstFit, MostFreePes, PlacementKind, PlacementPolicy};
pub use scheduler::{ShareDemand, is_finished, projected_finish, time_shared_shares};
pub use utilization::UtilizationModel;
pub use vm::{Vm, VmSpec, VmStatus};
