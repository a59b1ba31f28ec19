//! 场景文件格式
//!
//! JSON 描述一次仿真：数据中心特性、主机组、调度间隔以及各用户的虚拟机组与作业组。

use crate::dc::{DatacenterCharacteristics, HostSpec, JobSpec, PlacementKind, VmSpec};
use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};

pub const SCENARIO_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub schema_version: u32,
    #[serde(default)]
    pub meta: Option<ScenarioMeta>,
    pub datacenter: DatacenterSpec,
    #[serde(default)]
    pub users: Vec<UserSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioMeta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatacenterSpec {
    #[serde(default)]
    pub characteristics: DatacenterCharacteristics,
    #[serde(default)]
    pub placement: PlacementKind,
    /// 周期性重新评估主机的间隔（毫秒）；缺省或 0 表示关闭
    #[serde(default)]
    pub scheduling_interval_ms: Option<u64>,
    pub hosts: Vec<HostGroupSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostGroupSpec {
    #[serde(default = "one")]
    pub count: u32,
    #[serde(flatten)]
    pub host: HostSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSpec {
    pub id: u32,
    #[serde(default)]
    pub vms: Vec<VmGroupSpec>,
    #[serde(default)]
    pub jobs: Vec<JobGroupSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmGroupSpec {
    #[serde(default = "one")]
    pub count: u32,
    #[serde(flatten)]
    pub vm: VmSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobGroupSpec {
    #[serde(default = "one")]
    pub count: u32,
    /// 提交时刻（毫秒），缺省为 0
    #[serde(default)]
    pub submit_ms: Option<u64>,
    /// 绑定 `vm` 时使用全局虚拟机 ID（按提交顺序从 0 编号）
    #[serde(flatten)]
    pub job: JobSpec,
}

fn one() -> u32 {
    1
}

impl ScenarioSpec {
    pub fn from_json(raw: &str) -> Result<Self> {
        let spec: ScenarioSpec = serde_json::from_str(raw)?;
        spec.validate()?;
        Ok(spec)
    }

    /// 拒绝无法构造的数据中心（版本不符、无主机、非正容量）。
    pub fn validate(&self) -> Result<()> {
        if self.schema_version != SCENARIO_SCHEMA_VERSION {
            return Err(CloudError::InvalidSpec(format!(
                "unsupported schema_version {} (expected {SCENARIO_SCHEMA_VERSION})",
                self.schema_version
            )));
        }
        if self.datacenter.hosts.iter().all(|g| g.count == 0) {
            return Err(CloudError::InvalidSpec("datacenter has no hosts".into()));
        }
        for (i, g) in self.datacenter.hosts.iter().enumerate() {
            let h = &g.host;
            if h.pes == 0 || !(h.pe_mips > 0.0 && h.pe_mips.is_finite()) {
                return Err(CloudError::InvalidSpec(format!(
                    "host group {i} needs at least one pe with positive mips"
                )));
            }
        }
        for user in &self.users {
            for g in &user.vms {
                if g.vm.pes == 0 || !(g.vm.mips > 0.0 && g.vm.mips.is_finite()) {
                    return Err(CloudError::InvalidSpec(format!(
                        "user {} has a vm group without positive mips/pes",
                        user.id
                    )));
                }
            }
            for g in &user.jobs {
                if g.job.pes == 0 || !(g.job.length >= 0.0 && g.job.length.is_finite()) {
                    return Err(CloudError::InvalidSpec(format!(
                        "user {} has a job group with invalid length/pes",
                        user.id
                    )));
                }
            }
        }
        Ok(())
    }
}
