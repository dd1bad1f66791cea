use chrono::{DateTime, TimeZone, Utc};
use fronius_energy::{BidirectionalIntegrator, EnergyIntegrator};

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

#[test]
fn constant_power_integrates_exactly() {
    // 恒定功率 P 下，N 个间隔合法的采样之后 value = P·(t_N − t_1)/3600
    let power = 3000.0;
    let mut integrator = EnergyIntegrator::new();
    let mut t = 0_i64;
    integrator.update_power(power, at(t));
    for step in [2, 2, 1, 7, 10, 3, 2, 2] {
        t += step;
        integrator.update_power(power, at(t));
    }
    let expected = power * t as f64 / 3600.0;
    assert!((integrator.value_wh() - expected).abs() < 1e-9);
}

#[test]
fn missing_samples_do_not_anchor_a_trapezoid() {
    // 两个缺失采样后跟一个有效采样：有效采样不产生积分步
    let mut integrator = EnergyIntegrator::new();
    integrator.update_power(2000.0, at(0));
    integrator.invalidate_anchor();
    integrator.invalidate_anchor();
    integrator.update_power(2000.0, at(4));
    assert_eq!(integrator.value_wh(), 0.0);
    // 之后继续正常积分
    integrator.update_power(2000.0, at(6));
    assert!((integrator.value_wh() - 2000.0 * 2.0 / 3600.0).abs() < 1e-9);
}

#[test]
fn bidirectional_accumulators_are_monotonic() {
    let mut flow = BidirectionalIntegrator::new();
    let series = [500.0, -300.0, 0.0, 800.0, -1200.0, -1200.0, 50.0];
    let mut prev_pos = 0.0;
    let mut prev_neg = 0.0;
    for (index, power) in series.iter().enumerate() {
        flow.update_power(*power, at(2 * index as i64));
        let pos = flow.positive_wh();
        let neg = flow.negative_wh();
        assert!(pos >= prev_pos);
        assert!(neg >= prev_neg);
        assert!(pos >= 0.0);
        assert!(neg >= 0.0);
        prev_pos = pos;
        prev_neg = neg;
    }
    assert!(prev_pos > 0.0);
    assert!(prev_neg > 0.0);
}
