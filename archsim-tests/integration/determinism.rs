//! Reproducibility of seeded runs.

use archsim_core::tracing_setup::init_test_tracing;
use archsim_core::{LoadBalancing, RunConfig, Scaling, SimulationOptions, Topology};
use archsim_sim::simulate;
use proptest::prelude::*;

fn fan_out() -> Topology {
    Topology::builder()
        .traffic_source("users")
        .load_balancer("lb", Scaling::Single)
        .api_server("api-a", Scaling::Single, Vec::new())
        .api_server("api-b", Scaling::Single, Vec::new())
        .database("db", Scaling::Single, Vec::new())
        .queue("jobs", Scaling::Single)
        .connect("users", "lb")
        .connect("lb", "api-a")
        .connect("lb", "api-b")
        .connect("api-a", "db")
        .connect("api-b", "db")
        .connect("api-a", "jobs")
        .build()
}

#[test]
fn test_same_seed_same_json() -> anyhow::Result<()> {
    init_test_tracing();

    let topology = fan_out();
    let options = SimulationOptions {
        load_balancing: LoadBalancing::RoundRobin,
        ..Default::default()
    };
    let config = RunConfig::new(6, 1200.0).with_seed(99).with_options(options);

    let first = simulate(&topology, config.clone())?.to_json()?;
    let second = simulate(&topology, config)?.to_json()?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_unseeded_runs_keep_request_accounting() -> anyhow::Result<()> {
    init_test_tracing();

    let topology = fan_out();
    let result = simulate(&topology, RunConfig::new(3, 100.0))?;

    assert_eq!(result.config.seed, None);
    assert_eq!(result.total_requests, 300);
    assert_eq!(result.node("api-a").map(|n| n.requests_received), Some(300));
    assert_eq!(result.node("api-b").map(|n| n.requests_received), Some(0));
    Ok(())
}

#[test]
fn test_runs_do_not_share_state() -> anyhow::Result<()> {
    let topology = fan_out();
    let options = SimulationOptions {
        load_balancing: LoadBalancing::RoundRobin,
        ..Default::default()
    };
    let config = RunConfig::new(1, 3.0).with_seed(1).with_options(options);

    // Round-robin cursors restart with every run.
    for _ in 0..3 {
        let result = simulate(&topology, config.clone())?;
        assert_eq!(result.node("api-a").map(|n| n.requests_received), Some(2));
        assert_eq!(result.node("api-b").map(|n| n.requests_received), Some(1));
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_seeded_runs_are_reproducible(seed in any::<u64>(), rps in 1.0f64..1500.0) {
        let topology = fan_out();
        let config = RunConfig::new(2, rps).with_seed(seed);
        let a = simulate(&topology, config.clone()).unwrap();
        let b = simulate(&topology, config).unwrap();
        prop_assert_eq!(a, b);
    }
}
