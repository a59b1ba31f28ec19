//! 虚拟机放置策略
//!
//! 默认 FirstFit；另提供按空闲 PE 最多选择主机的策略，后续可以在此扩展其它策略。

use super::host::Host;
use super::id::HostId;
use super::vm::VmSpec;
use serde::{Deserialize, Serialize};

/// 放置策略：为新虚拟机选择主机，没有合适主机时返回 None。
pub trait PlacementPolicy: std::fmt::Debug + Send {
    fn select_host(&mut self, vm: &VmSpec, hosts: &[Host]) -> Option<HostId>;
}

/// 按主机顺序扫描，返回第一台能容纳的主机。
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstFit;

impl PlacementPolicy for FirstFit {
    fn select_host(&mut self, vm: &VmSpec, hosts: &[Host]) -> Option<HostId> {
        hosts
            .iter()
            .find(|h| h.is_suitable_for(vm))
            .map(Host::id)
    }
}

/// 选择空闲 PE 最多的可容纳主机；相同时取 ID 较小者。
#[derive(Debug, Default, Clone, Copy)]
pub struct MostFreePes;

impl PlacementPolicy for MostFreePes {
    fn select_host(&mut self, vm: &VmSpec, hosts: &[Host]) -> Option<HostId> {
        hosts
            .iter()
            .filter(|h| h.is_suitable_for(vm))
            // max_by_key 在相等时返回最后一个，这里反转 ID 以保留最早的主机
            .max_by_key(|h| (h.free_pes(), std::cmp::Reverse(h.id())))
            .map(Host::id)
    }
}

/// 配置文件中的策略名
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlacementKind {
    #[default]
    FirstFit,
    MostFreePes,
}

impl PlacementKind {
    pub fn into_policy(self) -> Box<dyn PlacementPolicy> {
        match self {
            PlacementKind::FirstFit => Box::new(FirstFit),
            PlacementKind::MostFreePes => Box::new(MostFreePes),
        }
    }
}
