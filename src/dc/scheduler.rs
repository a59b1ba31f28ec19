//! 时间片共享调度（份额计算）
//!
//! 主机的计算能力在其所有活跃作业之间均分，每个作业的份额不超过自身请求速率；
//! 被封顶作业剩下的能力继续分给其余作业（water-filling），因此不会闲置。
//! 同一虚拟机上作业份额之和不超过该虚拟机的 `mips * pes`。

use super::id::{JobId, VmId};
use crate::sim::SimTime;
use std::collections::BTreeMap;

/// 一个活跃作业的份额需求
#[derive(Debug, Clone, Copy)]
pub struct ShareDemand {
    pub job: JobId,
    pub vm: VmId,
    /// 作业请求速率（MIPS）
    pub requested: f64,
    /// 所属虚拟机的速率上限（MIPS）
    pub vm_cap: f64,
}

/// 计算每个作业的瞬时份额，返回值与 `demands` 一一对应。
///
/// 结果满足：每个份额 ≤ 请求速率；份额之和 ≤ `capacity`；
/// 相同输入总得到相同输出（排序以作业 ID 打破平局）。
pub fn time_shared_shares(demands: &[ShareDemand], capacity: f64) -> Vec<f64> {
    let mut per_vm: BTreeMap<VmId, usize> = BTreeMap::new();
    for d in demands {
        *per_vm.entry(d.vm).or_default() += 1;
    }

    let caps: Vec<f64> = demands
        .iter()
        .map(|d| {
            let n = per_vm[&d.vm] as f64;
            d.requested.min(d.vm_cap / n).max(0.0)
        })
        .collect();

    let mut order: Vec<usize> = (0..demands.len()).collect();
    order.sort_by(|&a, &b| {
        caps[a]
            .total_cmp(&caps[b])
            .then(demands[a].job.cmp(&demands[b].job))
    });

    let mut shares = vec![0.0; demands.len()];
    let mut left_capacity = capacity.max(0.0);
    let mut left_jobs = demands.len();
    for i in order {
        let fair = left_capacity / left_jobs as f64;
        let share = caps[i].min(fair);
        shares[i] = share;
        left_capacity = (left_capacity - share).max(0.0);
        left_jobs -= 1;
    }
    shares
}

/// 以速率 `rate` 完成 `remaining` MI 的预计时刻；速率为 0 时永不完成。
/// 至少前进 1ns，保证事件时间严格递增。
pub fn projected_finish(now: SimTime, remaining: f64, rate: f64) -> Option<SimTime> {
    if rate <= 0.0 || !rate.is_finite() {
        return None;
    }
    let dt = SimTime::from_secs_f64(remaining / rate).max(SimTime(1));
    Some(now.saturating_add(dt))
}

/// 剩余量小于一个纳秒内可完成的工作量即视为完成（吸收时间取整误差）。
pub fn is_finished(remaining: f64, rate: f64) -> bool {
    const EPS_MI: f64 = 1e-9;
    remaining <= EPS_MI + rate.max(0.0) * 1e-9
}
