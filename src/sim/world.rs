//! 世界 trait
//!
//! 定义仿真世界接口。

use super::simulator::Simulator;
use std::any::Any;

/// 仿真世界：由业务层实现（例如数据中心的主机/虚拟机/作业状态）。
pub trait World: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn on_tick(&mut self, _sim: &mut Simulator) {}
    /// 世界进入不可恢复状态（内部一致性被破坏）时返回 true，主循环随即停止。
    fn halted(&self) -> bool {
        false
    }
}
