//! 数据中心特性与计费参数

use serde::{Deserialize, Serialize};

/// 数据中心描述信息；价格用于计算作业与虚拟机的费用。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatacenterCharacteristics {
    pub name: String,
    pub arch: String,
    pub os: String,
    pub vmm: String,
    pub time_zone: f64,
    /// 每秒 CPU 使用费用
    pub cost_per_sec: f64,
    /// 每 MB 内存费用
    pub cost_per_mem: f64,
    /// 每 MB 存储费用
    pub cost_per_storage: f64,
    /// 每 MB 传输费用
    pub cost_per_bw: f64,
}

impl Default for DatacenterCharacteristics {
    fn default() -> Self {
        Self {
            name: "Datacenter_0".to_string(),
            arch: "x86".to_string(),
            os: "Linux".to_string(),
            vmm: "Xen".to_string(),
            time_zone: 10.0,
            cost_per_sec: 3.0,
            cost_per_mem: 0.05,
            cost_per_storage: 0.001,
            cost_per_bw: 0.0,
        }
    }
}

impl DatacenterCharacteristics {
    /// 作业处理费用：CPU 时间费用 + 输入/输出数据传输费用
    pub fn processing_cost(&self, cpu_secs: f64, file_size: u64, output_size: u64) -> f64 {
        self.cost_per_sec * cpu_secs + self.cost_per_bw * (file_size + output_size) as f64
    }

    /// 虚拟机租用费用：内存 + 存储
    pub fn lease_cost(&self, ram: u64, size: u64) -> f64 {
        self.cost_per_mem * ram as f64 + self.cost_per_storage * size as f64
    }
}
