//! 资源维度

use serde::{Deserialize, Serialize};
use std::fmt;

/// 可被 Provisioner 追踪的资源维度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// 内存（MB）
    Ram,
    /// 带宽（Mbps）
    Bw,
    /// 存储（MB）
    Storage,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Ram => "ram",
            ResourceKind::Bw => "bw",
            ResourceKind::Storage => "storage",
        };
        f.write_str(s)
    }
}
