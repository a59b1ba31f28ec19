//! Broker 模块
//!
//! 外部调用者与仿真核心之间的中介：接收虚拟机/作业提交、按仿真时间转发，并收集结果。

// 子模块声明
mod broker;
mod result;

// 重新导出公共接口
pub use broker::{Broker, JobHandle, VmHandle};
pub use result::{JobResult, SimulationSummary};
