use crate::broker::Broker;
use crate::dc::{Datacenter, HostSpec, JobSpec, OwnerId, UtilizationModel, VmSpec};
use crate::sim::SimTime;

const USER: OwnerId = OwnerId(0);

fn broker_with_interval(interval: SimTime, model: UtilizationModel, length: f64) -> Broker {
    let mut dc = Datacenter::default().with_scheduling_interval(interval);
    dc.add_host(&HostSpec::new(1, 1000.0, 2048, 10_000, 1_000_000))
        .expect("host");
    let mut broker = Broker::new(dc);
    let vms = broker
        .submit_vms(USER, vec![VmSpec::new(1000.0, 1, 512, 1000, 10_000)])
        .expect("vms");
    broker
        .submit_jobs(
            USER,
            vec![
                JobSpec::new(length)
                    .on_vm(vms[0].id)
                    .with_utilization(model),
            ],
        )
        .expect("jobs");
    broker
}

fn events_until_idle(interval: SimTime, model: UtilizationModel, length: f64) -> u64 {
    let mut broker = broker_with_interval(interval, model, length);
    let summary = broker.run_until_idle().expect("run");
    assert_eq!(summary.succeeded, 1);
    summary.events
}

#[test]
fn stochastic_rate_is_resampled_every_interval() {
    let model = UtilizationModel::Stochastic { seed: 11 };
    let mut broker = broker_with_interval(SimTime::from_millis(100), model, 10_000.0);

    broker.run_until(SimTime::from_millis(50)).expect("run");
    let job = &broker.datacenter().jobs()[0];
    let first = job.rate();
    assert_eq!(first, job.share() * model.fraction_at(SimTime::ZERO));

    broker.run_until(SimTime::from_millis(150)).expect("run");
    let job = &broker.datacenter().jobs()[0];
    let second = job.rate();
    assert_eq!(second, job.share() * model.fraction_at(SimTime::from_millis(100)));
    assert_ne!(first, second);
}

#[test]
fn shorter_interval_means_more_host_updates() {
    let model = UtilizationModel::Stochastic { seed: 11 };
    // VmCreate + JobArrive + 一次完成事件
    let without = events_until_idle(SimTime::ZERO, model, 10_000.0);
    assert_eq!(without, 3);

    let coarse = events_until_idle(SimTime::from_millis(500), model, 10_000.0);
    let fine = events_until_idle(SimTime::from_millis(100), model, 10_000.0);
    assert!(coarse > without, "coarse={coarse}");
    assert!(fine > coarse, "fine={fine} coarse={coarse}");
}

#[test]
fn constant_models_are_not_ticked() {
    let partial = UtilizationModel::Partial { fraction: 0.5 };
    assert_eq!(events_until_idle(SimTime::from_millis(100), partial, 1000.0), 3);
    assert_eq!(
        events_until_idle(SimTime::from_millis(100), UtilizationModel::Full, 1000.0),
        3
    );
}

#[test]
fn stalled_constant_job_does_not_tick_forever() {
    let mut broker = broker_with_interval(
        SimTime::from_millis(100),
        UtilizationModel::Partial { fraction: 0.0 },
        1000.0,
    );
    let summary = broker.run_until_idle().expect("run");
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.events, 2);
}
