//! 标识符类型
//!
//! 主机、虚拟机、作业均存放在数据中心的 arena 中，彼此之间只通过整数 ID 关联。

use serde::{Deserialize, Serialize};

/// 主机标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HostId(pub usize);

/// 虚拟机标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VmId(pub usize);

/// 作业（cloudlet）标识符，按提交顺序递增
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobId(pub usize);

/// 提交者（云用户）标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OwnerId(pub u32);
