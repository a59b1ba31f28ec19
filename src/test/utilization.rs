use crate::dc::UtilizationModel;
use crate::sim::SimTime;

#[test]
fn full_and_partial_models_are_constant() {
    let t = SimTime::from_secs(17);
    assert_eq!(UtilizationModel::Full.fraction_at(t), 1.0);
    assert_eq!(UtilizationModel::Partial { fraction: 0.25 }.fraction_at(t), 0.25);
    assert_eq!(UtilizationModel::Partial { fraction: 3.0 }.fraction_at(t), 1.0);
    assert_eq!(UtilizationModel::Partial { fraction: -1.0 }.fraction_at(t), 0.0);
    assert!(!UtilizationModel::Full.is_time_varying());
}

#[test]
fn stochastic_model_is_bounded_and_reproducible() {
    let m = UtilizationModel::Stochastic { seed: 7 };
    assert!(m.is_time_varying());
    for s in 0..50 {
        let t = SimTime::from_millis(s * 137);
        let a = m.fraction_at(t);
        assert!((0.0..=1.0).contains(&a));
        assert_eq!(a, m.fraction_at(t));
    }
}

#[test]
fn stochastic_model_varies_over_time() {
    let m = UtilizationModel::Stochastic { seed: 99 };
    let samples: Vec<f64> = (0..10).map(|s| m.fraction_at(SimTime::from_secs(s))).collect();
    assert!(samples.windows(2).any(|w| w[0] != w[1]));
}

#[test]
fn utilization_model_parses_tagged_json() {
    let m: UtilizationModel =
        serde_json::from_str(r#"{ "kind": "partial", "fraction": 0.5 }"#).expect("parse");
    assert_eq!(m, UtilizationModel::Partial { fraction: 0.5 });
    let m: UtilizationModel = serde_json::from_str(r#"{ "kind": "full" }"#).expect("parse");
    assert_eq!(m, UtilizationModel::Full);
}
