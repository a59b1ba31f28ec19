use crate::CloudError;
use crate::broker::{Broker, JobResult};
use crate::dc::{
    Datacenter, DatacenterCharacteristics, HostId, HostSpec, JobFailure, JobSpec, JobStatus,
    OwnerId, UtilizationModel, VmId, VmSpec, VmStatus,
};
use crate::resource::ResourceKind;
use crate::sim::SimTime;

const USER: OwnerId = OwnerId(1);

fn single_host_broker() -> Broker {
    let mut dc = Datacenter::new(DatacenterCharacteristics::default());
    dc.add_host(&HostSpec::new(1, 1000.0, 2048, 10_000, 1_000_000)).expect("host");
    Broker::new(dc)
}

fn small_vm() -> VmSpec {
    VmSpec::new(1000.0, 1, 512, 1000, 10_000)
}

fn secs(t: Option<SimTime>) -> f64 {
    t.expect("time set").as_secs_f64()
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

#[test]
fn three_jobs_time_share_one_vm_and_finish_together() {
    let mut broker = single_host_broker();
    let vms = broker.submit_vms(USER, vec![small_vm()]).expect("submit vms");
    let jobs = broker
        .submit_jobs(
            USER,
            (0..3)
                .map(|_| JobSpec::new(40_000.0).on_vm(vms[0].id).with_files(300, 300))
                .collect(),
        )
        .expect("submit jobs");
    assert_eq!(jobs.len(), 3);

    broker.run_until(SimTime::from_secs(1)).expect("run");
    let shares = broker.datacenter().shares(HostId(0));
    assert_eq!(shares.len(), 3);
    let host = broker.datacenter().host(HostId(0)).expect("host");
    assert_eq!(host.active_jobs(), &jobs.iter().map(|j| j.id).collect::<Vec<_>>()[..]);
    for (_, share) in &shares {
        assert!(approx(*share, 1000.0 / 3.0));
    }

    let summary = broker.run_until_idle().expect("run");
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed, 0);
    assert!(approx(summary.total_elapsed_time.as_secs_f64(), 120.0));

    let results = broker.collect_results();
    assert_eq!(results.len(), 3);
    for (i, r) in results.iter().enumerate() {
        assert_eq!(r.id.0, i);
        assert_eq!(r.status, JobStatus::Success);
        assert_eq!(r.host_id, Some(HostId(0)));
        assert_eq!(r.vm_id, vms[0].id);
        assert!(approx(secs(r.start_time), 0.0));
        assert!(approx(secs(r.finish_time), 120.0));
        assert!(approx(r.actual_cpu_time, 120.0));
        // cost_per_sec = 3.0，cost_per_bw = 0
        assert!((r.cost - 360.0).abs() < 1e-3);
    }
}

#[test]
fn oversized_vm_fails_placement_and_its_jobs_never_run() {
    let mut broker = single_host_broker();
    let vms = broker
        .submit_vms(USER, vec![VmSpec::new(1000.0, 1, 4096, 1000, 10_000)])
        .expect("submit vms");
    // 放置尚未发生，作业被缓冲
    let jobs = broker
        .submit_jobs(USER, vec![JobSpec::new(1000.0).on_vm(vms[0].id)])
        .expect("buffered");

    broker.run_until_idle().expect("run");
    assert_eq!(broker.vm_status(vms[0]), Some(VmStatus::FailedPlacement));
    assert_eq!(broker.vm(vms[0].id).and_then(|vm| vm.host), None);

    let results = broker.collect_results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, jobs[0].id);
    assert_eq!(results[0].status, JobStatus::Failed);
    assert_eq!(results[0].failure, Some(JobFailure::VmNotReady));
    assert_eq!(results[0].start_time, None);

    // 放置失败后再提交立即报错
    let err = broker
        .submit_jobs(USER, vec![JobSpec::new(1000.0).on_vm(vms[0].id)])
        .expect_err("vm not ready");
    assert!(matches!(err, CloudError::VmNotReady(id) if id == vms[0].id));
}

#[test]
fn placement_failure_does_not_stop_other_vms() {
    let mut broker = single_host_broker();
    let vms = broker
        .submit_vms(
            USER,
            vec![VmSpec::new(1000.0, 1, 4096, 1000, 10_000), small_vm()],
        )
        .expect("submit vms");
    broker
        .submit_jobs(USER, vec![JobSpec::new(2000.0)])
        .expect("bound round robin");
    broker.run_until_idle().expect("run");

    assert_eq!(broker.vm_status(vms[0]), Some(VmStatus::FailedPlacement));
    assert_eq!(broker.vm_status(vms[1]), Some(VmStatus::Placed));
    let results = broker.collect_results();
    assert_eq!(results.len(), 1);
    // 轮询只考虑可用虚拟机，第一台此时仍在等待放置，所以作业被绑到它上面并失败
    assert_eq!(results[0].vm_id, vms[0].id);
    assert_eq!(results[0].status, JobStatus::Failed);
}

#[test]
fn memory_never_exceeds_host_capacity() {
    let mut broker = single_host_broker();
    let vms = broker
        .submit_vms(USER, (0..5).map(|_| small_vm()).collect())
        .expect("submit vms");
    broker.run_until_idle().expect("run");

    let placed = vms
        .iter()
        .filter(|h| broker.vm_status(**h) == Some(VmStatus::Placed))
        .count();
    assert_eq!(placed, 4);
    assert_eq!(broker.vm_status(vms[4]), Some(VmStatus::FailedPlacement));
    let host = broker.datacenter().host(HostId(0)).expect("host");
    let ram = host.provisioner(ResourceKind::Ram);
    assert!(ram.used() <= ram.total());
    assert_eq!(ram.used(), 2048);
}

#[test]
fn identical_submissions_produce_identical_results() {
    fn run() -> Vec<JobResult> {
        let mut dc = Datacenter::default().with_scheduling_interval(SimTime::from_millis(500));
        dc.add_host(&HostSpec::new(2, 1000.0, 4096, 10_000, 1_000_000)).expect("host");
        dc.add_host(&HostSpec::new(1, 800.0, 4096, 10_000, 1_000_000)).expect("host");
        let mut broker = Broker::new(dc);
        broker
            .submit_vms(USER, (0..4).map(|_| small_vm()).collect())
            .expect("vms");
        let jobs = (0..9)
            .map(|i| {
                JobSpec::new(1000.0 + 750.0 * i as f64)
                    .with_utilization(UtilizationModel::Stochastic { seed: i })
            })
            .collect();
        broker.submit_jobs(USER, jobs).expect("jobs");
        broker
            .submit_jobs_at(USER, vec![JobSpec::new(3000.0)], SimTime::from_secs(2))
            .expect("late job");
        broker.run_until_idle().expect("run");
        broker.collect_results()
    }

    let a = run();
    let b = run();
    assert_eq!(a.len(), 10);
    assert!(a.iter().all(|r| r.status == JobStatus::Success));
    assert_eq!(a, b);
}

#[test]
fn zero_length_job_completes_at_submission_time() {
    let mut broker = single_host_broker();
    let vms = broker.submit_vms(USER, vec![small_vm()]).expect("vms");
    broker
        .submit_jobs_at(
            USER,
            vec![JobSpec::new(0.0).on_vm(vms[0].id)],
            SimTime::from_secs(3),
        )
        .expect("jobs");
    broker.run_until_idle().expect("run");

    let results = broker.collect_results();
    assert_eq!(results[0].status, JobStatus::Success);
    assert_eq!(results[0].start_time, Some(SimTime::from_secs(3)));
    assert_eq!(results[0].finish_time, Some(SimTime::from_secs(3)));
}

#[test]
fn late_arrival_slows_down_running_job() {
    let mut broker = single_host_broker();
    let vms = broker.submit_vms(USER, vec![small_vm()]).expect("vms");
    let first = broker
        .submit_jobs(USER, vec![JobSpec::new(10_000.0).on_vm(vms[0].id)])
        .expect("first");
    broker
        .submit_jobs_at(
            USER,
            vec![JobSpec::new(2_000.0).on_vm(vms[0].id)],
            SimTime::from_secs(4),
        )
        .expect("second");
    broker.run_until_idle().expect("run");

    let results = broker.collect_results();
    // t=4 时第一个作业剩 6000MI；两者各 500MIPS，第二个在 t=8 完成，之后第一个剩 4000MI 独占
    assert_eq!(results[0].id.0, 1);
    assert!(approx(secs(results[0].finish_time), 8.0));
    assert_eq!(results[1].id, first[0].id);
    assert!(approx(secs(results[1].finish_time), 12.0));
}

#[test]
fn jobs_without_vm_are_bound_round_robin() {
    let mut dc = Datacenter::default();
    for _ in 0..3 {
        dc.add_host(&HostSpec::new(1, 1000.0, 2048, 10_000, 1_000_000)).expect("host");
    }
    let mut broker = Broker::new(dc);
    let vms = broker
        .submit_vms(USER, (0..4).map(|_| small_vm()).collect())
        .expect("vms");
    let jobs = broker
        .submit_jobs(USER, (0..10).map(|_| JobSpec::new(4000.0)).collect())
        .expect("jobs");
    for (i, j) in jobs.iter().enumerate() {
        assert_eq!(j.vm, vms[i % 4].id);
    }

    broker.run_until_idle().expect("run");
    let results = broker.collect_results();
    assert_eq!(results.len(), 10);
    // 4 台虚拟机都在 host0 上，10 个作业平分 1000MIPS
    for r in &results {
        assert_eq!(r.status, JobStatus::Success);
        assert_eq!(r.host_id, Some(HostId(0)));
        assert!(approx(secs(r.finish_time), 40.0));
    }
}

#[test]
fn round_robin_cursor_continues_across_submissions() {
    let mut broker = single_host_broker();
    let vms = broker
        .submit_vms(USER, vec![small_vm(), small_vm()])
        .expect("vms");
    let a = broker.submit_jobs(USER, vec![JobSpec::new(1.0)]).expect("a");
    let b = broker.submit_jobs(USER, vec![JobSpec::new(1.0)]).expect("b");
    assert_eq!(a[0].vm, vms[0].id);
    assert_eq!(b[0].vm, vms[1].id);
}

#[test]
fn submission_errors_reject_the_whole_batch() {
    let mut broker = single_host_broker();
    let vms = broker.submit_vms(USER, vec![small_vm()]).expect("vms");

    let err = broker
        .submit_jobs(
            USER,
            vec![JobSpec::new(10.0).on_vm(vms[0].id), JobSpec::new(10.0).on_vm(VmId(42))],
        )
        .expect_err("unknown vm");
    assert!(matches!(err, CloudError::UnknownVm(VmId(42))));
    assert!(broker.datacenter().jobs().is_empty());

    assert!(matches!(
        broker.submit_jobs(USER, vec![JobSpec::new(-1.0)]),
        Err(CloudError::InvalidSpec(_))
    ));
    assert!(matches!(
        broker.submit_jobs(OwnerId(9), vec![JobSpec::new(1.0)]),
        Err(CloudError::InvalidSpec(_))
    ));
    assert!(matches!(
        broker.submit_vms(USER, vec![VmSpec::new(0.0, 1, 1, 1, 1)]),
        Err(CloudError::InvalidSpec(_))
    ));
}

#[test]
fn job_wider_than_its_vm_fails_with_resource_violation() {
    let mut broker = single_host_broker();
    let vms = broker.submit_vms(USER, vec![small_vm()]).expect("vms");
    let mut wide = JobSpec::new(100.0).on_vm(vms[0].id);
    wide.pes = 2;
    broker.submit_jobs(USER, vec![wide]).expect("accepted");
    broker.run_until_idle().expect("run");

    let results = broker.collect_results();
    assert_eq!(results[0].status, JobStatus::Failed);
    assert_eq!(results[0].failure, Some(JobFailure::ResourceViolation));
    assert_eq!(results[0].start_time, None);
}

#[test]
fn partial_utilization_slows_progress() {
    let mut broker = single_host_broker();
    let vms = broker.submit_vms(USER, vec![small_vm()]).expect("vms");
    broker
        .submit_jobs(
            USER,
            vec![
                JobSpec::new(1000.0)
                    .on_vm(vms[0].id)
                    .with_utilization(UtilizationModel::Partial { fraction: 0.5 }),
            ],
        )
        .expect("jobs");
    broker.run_until_idle().expect("run");
    let results = broker.collect_results();
    assert!(approx(secs(results[0].finish_time), 2.0));
}

#[test]
fn job_with_zero_utilization_is_reported_as_stalled() {
    let mut broker = single_host_broker();
    let vms = broker.submit_vms(USER, vec![small_vm()]).expect("vms");
    broker
        .submit_jobs(
            USER,
            vec![
                JobSpec::new(1000.0)
                    .on_vm(vms[0].id)
                    .with_utilization(UtilizationModel::Partial { fraction: 0.0 }),
                JobSpec::new(500.0).on_vm(vms[0].id),
            ],
        )
        .expect("jobs");
    let summary = broker.run_until_idle().expect("run");
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);

    let results = broker.collect_results();
    let stalled = results.iter().find(|r| r.id.0 == 0).expect("job 0");
    assert_eq!(stalled.status, JobStatus::Failed);
    assert_eq!(stalled.failure, Some(JobFailure::Stalled));
    // 另一个作业分到 500MIPS，1 秒完成
    let other = results.iter().find(|r| r.id.0 == 1).expect("job 1");
    assert!(approx(secs(other.finish_time), 1.0));
}

#[test]
fn submitting_in_the_past_is_rejected() {
    let mut broker = single_host_broker();
    broker.submit_vms(USER, vec![small_vm()]).expect("vms");
    broker.run_until(SimTime::from_secs(10)).expect("run");
    assert!(matches!(
        broker.submit_jobs_at(USER, vec![JobSpec::new(1.0)], SimTime::from_secs(5)),
        Err(CloudError::InvalidSpec(_))
    ));
}

#[test]
fn vm_lease_cost_uses_datacenter_prices() {
    let mut broker = single_host_broker();
    let vms = broker.submit_vms(USER, vec![small_vm()]).expect("vms");
    broker.run_until_idle().expect("run");
    let vm = broker.vm(vms[0].id).expect("vm");
    // 0.05 * 512 + 0.001 * 10000
    assert!((vm.lease_cost - 35.6).abs() < 1e-9);
    assert_eq!(vm.placed_at, Some(SimTime::ZERO));
}

#[test]
fn host_utilization_reflects_provisioners_and_rates() {
    let mut broker = single_host_broker();
    let vms = broker.submit_vms(USER, vec![small_vm()]).expect("vms");
    broker
        .submit_jobs(USER, vec![JobSpec::new(10_000.0).on_vm(vms[0].id)])
        .expect("jobs");
    broker.run_until(SimTime::from_secs(1)).expect("run");

    let u = broker
        .datacenter()
        .host_utilization(HostId(0))
        .expect("host");
    assert!(approx(u.cpu, 1.0));
    assert!(approx(u.ram, 0.25));
    assert!(approx(u.bw, 0.1));
    assert!(approx(u.storage, 0.01));
    assert!(approx(u.ram_active, 0.25));
    assert!(approx(u.bw_active, 0.1));
}

#[test]
fn host_utilization_scales_active_ram_and_bw_by_job_models() {
    let mut broker = single_host_broker();
    let vms = broker.submit_vms(USER, vec![small_vm()]).expect("vms");
    let mut job = JobSpec::new(10_000.0).on_vm(vms[0].id);
    job.utilization_ram = UtilizationModel::Partial { fraction: 0.5 };
    job.utilization_bw = UtilizationModel::Partial { fraction: 0.25 };
    // 第二个作业全量使用，两者平分虚拟机的 512MB / 1000Mbps
    broker
        .submit_jobs(USER, vec![job, JobSpec::new(10_000.0).on_vm(vms[0].id)])
        .expect("jobs");
    broker.run_until(SimTime::from_secs(1)).expect("run");

    let u = broker
        .datacenter()
        .host_utilization(HostId(0))
        .expect("host");
    // CPU 利用率模型仍为 Full
    assert!(approx(u.cpu, 1.0));
    assert!(approx(u.ram, 0.25));
    // (256 * 0.5 + 256) / 2048
    assert!(approx(u.ram_active, 384.0 / 2048.0));
    // (500 * 0.25 + 500) / 10000
    assert!(approx(u.bw_active, 625.0 / 10_000.0));
}

#[test]
fn jobs_cannot_target_another_owners_vm() {
    let mut broker = single_host_broker();
    let theirs = broker
        .submit_vms(OwnerId(2), vec![small_vm()])
        .expect("other owner's vm");
    broker.submit_vms(USER, vec![small_vm()]).expect("own vm");

    let err = broker
        .submit_jobs(USER, vec![JobSpec::new(10.0).on_vm(theirs[0].id)])
        .expect_err("foreign vm");
    assert!(matches!(err, CloudError::InvalidSpec(_)));
    assert!(broker.datacenter().jobs().is_empty());

    let ok = broker
        .submit_jobs(OwnerId(2), vec![JobSpec::new(10.0).on_vm(theirs[0].id)])
        .expect("owner may use its vm");
    assert_eq!(ok[0].vm, theirs[0].id);
}
