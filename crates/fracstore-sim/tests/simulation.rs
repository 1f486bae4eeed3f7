//! End-to-end simulator runs over small synthetic clusters.

use fracstore_sim::{
    summarize, ExperimentalConfiguration, PlacementParameters, RecoverySimulator, TrialResult,
};

fn small_config() -> ExperimentalConfiguration {
    ExperimentalConfiguration {
        rack_count: 4,
        nodes_per_rack: 3,
        sub_partition_count: 24,
        trial_count: 16,
        ..ExperimentalConfiguration::default()
    }
}

#[test]
fn test_unreplicated_data_always_dies() {
    // With one replica per sub-partition, the first failure hitting any
    // home node is terminal, and over a long enough horizon one always
    // does.
    let config = ExperimentalConfiguration {
        horizon: f64::INFINITY,
        trial_count: 32,
        ..small_config()
    };
    let results = RecoverySimulator::new(config, PlacementParameters::scatter(1)).run();

    assert!(results.iter().all(TrialResult::is_data_loss));
    let summary = summarize(&results);
    assert_eq!(summary.losses, 32);
    assert!((summary.loss_probability - 1.0).abs() < 1e-12);
    assert!(summary.mean_time_to_loss.is_some());
}

#[test]
fn test_identical_seeds_reproduce_trial_for_trial() {
    let config = small_config();
    let params = PlacementParameters::buddy(3);

    let first = RecoverySimulator::new(config.clone(), params).run();
    let second = RecoverySimulator::new(config, params).run();
    assert_eq!(first, second);
}

#[test]
fn test_different_seeds_shift_outcomes() {
    // An unreplicated layout with no horizon makes every trial end in a
    // loss at a continuous time, so reseeding must move the sequence.
    let base = ExperimentalConfiguration { horizon: f64::INFINITY, ..small_config() };
    let reseeded = ExperimentalConfiguration { seed: base.seed + 1, ..base.clone() };
    let params = PlacementParameters::scatter(1);

    let first = RecoverySimulator::new(base, params).run();
    let second = RecoverySimulator::new(reseeded, params).run();
    assert_ne!(first, second);
}

#[test]
fn test_parallel_run_matches_sequential() {
    let config = ExperimentalConfiguration { trial_count: 24, ..small_config() };
    let params = PlacementParameters::buddy(3);
    let simulator = RecoverySimulator::new(config, params);

    assert_eq!(simulator.run(), simulator.run_parallel());
}

#[test]
fn test_reliable_hardware_survives_short_horizon() {
    let config = ExperimentalConfiguration {
        node_mtbf: 1e12,
        rack_mtbf: 1e12,
        horizon: 100.0,
        ..small_config()
    };
    let results = RecoverySimulator::new(config, PlacementParameters::buddy(3)).run();

    assert!(results.iter().all(|r| *r == TrialResult::Survived));
    assert_eq!(summarize(&results).losses, 0);
}

#[test]
fn test_striped_recovery_never_hurts_durability() {
    // Striped repair pulls from every surviving replica at once, so its
    // mean repair time is a fraction of whole-node recovery. Shorter
    // repair windows cannot raise the loss count on aggregate.
    let config = ExperimentalConfiguration {
        node_mtbf: 200.0,
        rack_mtbf: f64::INFINITY,
        node_recovery_mean: 1_000.0,
        striped_recovery_mean: 0.1,
        horizon: 20_000.0,
        trial_count: 64,
        ..small_config()
    };
    let slow = PlacementParameters { striped_recovery: false, ..PlacementParameters::scatter(3) };
    let fast = PlacementParameters::scatter(3);
    assert!(fast.striped_recovery);

    let slow_losses = summarize(&RecoverySimulator::new(config.clone(), slow).run()).losses;
    let fast_losses = summarize(&RecoverySimulator::new(config, fast).run()).losses;
    assert!(fast_losses <= slow_losses);
}
