//! 错误类型
//!
//! 容量不足、放置失败等可恢复错误只体现在实体状态上；
//! 只有内部一致性错误（`InvalidRelease`）会中止整个仿真。

use crate::dc::{HostId, JobId, VmId};
use crate::resource::ResourceKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CloudError {
    #[error("insufficient {kind} capacity: requested {requested}, available {available}")]
    InsufficientCapacity {
        kind: ResourceKind,
        requested: u64,
        available: u64,
    },

    #[error("no suitable host for {0:?}")]
    NoSuitableHost(VmId),

    #[error("{0:?} is not ready to accept jobs")]
    VmNotReady(VmId),

    #[error("{vm:?} was removed while {job:?} was running")]
    VmPreempted { vm: VmId, job: JobId },

    #[error("invalid {kind} release on {host:?}: releasing {requested}, allocated {allocated}")]
    InvalidRelease {
        host: HostId,
        kind: ResourceKind,
        requested: u64,
        allocated: u64,
    },

    #[error("unknown {0:?}")]
    UnknownVm(VmId),

    #[error("unknown {0:?}")]
    UnknownJob(JobId),

    #[error("invalid configuration: {0}")]
    InvalidSpec(String),

    #[error("failed to read scenario: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse scenario JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;
