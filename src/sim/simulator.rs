//! 仿真器
//!
//! 定义事件驱动仿真器，维护当前时间与未来事件队列。
//! 每个 `Simulator` 都是独立的仿真实例，没有全局时钟，多个实例可以并行存在。

use super::event::Event;
use super::scheduled_event::ScheduledEvent;
use super::time::SimTime;
use super::world::World;
use std::collections::BinaryHeap;
use tracing::{debug, info, trace, warn};

/// 事件驱动仿真器：维护当前时间与事件队列。
#[derive(Default)]
pub struct Simulator {
    now: SimTime,
    next_seq: u64,
    processed: u64,
    q: BinaryHeap<ScheduledEvent>,
}

impl Simulator {
    /// 获取当前仿真时间
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// 队列中尚未执行的事件数
    pub fn pending(&self) -> usize {
        self.q.len()
    }

    /// 已执行的事件总数
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// 调度事件在指定时间执行；早于当前时间的请求会被钳制到当前时间。
    #[tracing::instrument(skip(self, ev), fields(event_type = std::any::type_name::<E>(), schedule_at = ?at))]
    pub fn schedule<E: Event>(&mut self, at: SimTime, ev: E) {
        let at = if at < self.now {
            warn!(now = ?self.now, "事件时间早于当前时间，钳制到 now");
            self.now
        } else {
            at
        };
        let seq = self.next_seq;
        trace!(now = ?self.now, seq, "调度事件");

        self.next_seq = self.next_seq.wrapping_add(1);
        self.q.push(ScheduledEvent {
            at,
            seq,
            kind: std::any::type_name::<E>(),
            ev: Box::new(ev),
        });

        debug!(queue_size = self.q.len(), "事件已加入队列");
    }

    /// 在当前时间之后 `delay` 执行事件。
    pub fn schedule_in<E: Event>(&mut self, delay: SimTime, ev: E) {
        let at = self.now.saturating_add(delay);
        self.schedule(at, ev);
    }

    fn step(&mut self, item: ScheduledEvent, world: &mut dyn World) {
        self.processed += 1;
        self.now = item.at;
        debug!(
            event_num = self.processed,
            now = ?self.now,
            seq = item.seq,
            kind = item.kind,
            remaining_queue = self.q.len(),
            "执行事件"
        );
        item.ev.execute(self, world);
        world.on_tick(self);
    }

    /// 运行直到事件队列为空或到达 `until`。
    pub fn run_until(&mut self, until: SimTime, world: &mut dyn World) {
        while let Some(top) = self.q.peek() {
            if top.at > until || world.halted() {
                break;
            }
            let Some(item) = self.q.pop() else { break };
            self.step(item, world);
        }
        if !world.halted() {
            self.now = self.now.max(until);
        }
    }

    /// 运行所有事件直到队列为空（或世界进入停机状态），返回本次执行的事件数。
    #[tracing::instrument(skip(self, world))]
    pub fn run(&mut self, world: &mut dyn World) -> u64 {
        info!("▶️  开始运行仿真");
        debug!(now = ?self.now, queue_size = self.q.len(), "初始状态");

        let before = self.processed;
        while !world.halted() {
            let Some(item) = self.q.pop() else { break };
            self.step(item, world);
        }

        let executed = self.processed - before;
        if world.halted() {
            warn!(total_events = executed, final_time = ?self.now, "⛔ 仿真因内部错误中止");
        } else {
            info!(total_events = executed, final_time = ?self.now, "✅ 仿真完成");
        }
        executed
    }
}
