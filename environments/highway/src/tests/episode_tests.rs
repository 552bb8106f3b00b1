//! Episode dynamics: truncation, termination and reward shaping.

use drive_ppo::Environment;

use crate::config::CarFollowingConfig;
use crate::env::CarFollowing;

/// Step with a constant action until the episode ends or `limit` is hit.
/// Returns the number of steps and the last outcome.
fn run_constant(
    env: &mut CarFollowing,
    action: [f32; 2],
    limit: usize,
) -> (usize, drive_ppo::StepOutcome) {
    let mut last = env.step(&action).unwrap();
    let mut steps = 1;
    while !last.done() && steps < limit {
        last = env.step(&action).unwrap();
        steps += 1;
    }
    (steps, last)
}

// ============================================================================
// Truncation
// ============================================================================

#[test]
fn should_truncate_at_max_steps_when_cruising() {
    let config = CarFollowingConfig::default().with_traffic(0).with_max_steps(50);
    let mut env = CarFollowing::new(config).unwrap();
    env.reset(Some(9)).unwrap();

    let (steps, last) = run_constant(&mut env, [0.0, 0.0], 1000);

    assert_eq!(steps, 50);
    assert!(last.truncated);
    assert!(!last.terminated);
    assert_eq!(last.info["crashed"], 0.0);
}

#[test]
fn should_require_reset_after_episode_end() {
    let config = CarFollowingConfig::default().with_traffic(0).with_max_steps(3);
    let mut env = CarFollowing::new(config).unwrap();
    env.reset(Some(9)).unwrap();
    run_constant(&mut env, [0.0, 0.0], 10);

    assert!(env.step(&[0.0, 0.0]).is_err());
    assert!(env.reset(None).is_ok());
    assert!(env.step(&[0.0, 0.0]).is_ok());
}

// ============================================================================
// Termination
// ============================================================================

#[test]
fn should_terminate_when_steering_off_road() {
    let config = CarFollowingConfig::default().with_traffic(0);
    let mut env = CarFollowing::new(config).unwrap();
    env.reset(Some(4)).unwrap();

    let (steps, last) = run_constant(&mut env, [0.0, 1.0], 200);

    assert!(steps < 200, "never left the road");
    assert!(last.terminated);
    assert!(!last.truncated);
    assert_eq!(last.info["off_road"], 1.0);
    assert!(last.reward < 0.0);
}

#[test]
fn should_terminate_on_rear_end_collision() {
    let config = CarFollowingConfig::default().with_traffic(0).with_lead_gap(10.0);
    let mut env = CarFollowing::new(config).unwrap();
    env.reset(Some(8)).unwrap();

    let (steps, last) = run_constant(&mut env, [1.0, 0.0], 200);

    assert!(steps < 200, "never caught the lead vehicle");
    assert!(last.terminated);
    assert_eq!(last.info["crashed"], 1.0);
    assert!(last.reward < 0.0);
}

#[test]
fn should_report_shrinking_gap_under_full_throttle() {
    let config = CarFollowingConfig::default().with_traffic(0).with_lead_gap(30.0);
    let mut env = CarFollowing::new(config).unwrap();
    env.reset(Some(8)).unwrap();

    let first = env.step(&[1.0, 0.0]).unwrap().info["lead_gap"];
    let mut later = first;
    for _ in 0..20 {
        later = env.step(&[1.0, 0.0]).unwrap().info["lead_gap"];
    }
    assert!(later < first);
}

// ============================================================================
// Reward
// ============================================================================

#[test]
fn should_reward_high_centered_speed() {
    let config = CarFollowingConfig::default()
        .with_traffic(0)
        .with_initial_speed(30.0, 30.0);
    let mut env = CarFollowing::new(config.clone()).unwrap();
    env.reset(Some(0)).unwrap();

    let outcome = env.step(&[0.0, 0.0]).unwrap();
    let expected = config.reward.high_speed_reward + config.reward.lane_centering_reward;
    assert!((outcome.reward - expected).abs() < 1e-5, "reward {}", outcome.reward);
}

#[test]
fn should_give_no_speed_reward_below_range() {
    let config = CarFollowingConfig::default()
        .with_traffic(0)
        .with_initial_speed(10.0, 10.0);
    let mut env = CarFollowing::new(config.clone()).unwrap();
    env.reset(Some(0)).unwrap();

    let outcome = env.step(&[0.0, 0.0]).unwrap();
    assert!((outcome.reward - config.reward.lane_centering_reward).abs() < 1e-5);
}

#[test]
fn should_keep_rewards_finite_with_dense_traffic() {
    let config = CarFollowingConfig::default().with_traffic(10);
    let mut env = CarFollowing::new(config).unwrap();
    env.reset(Some(21)).unwrap();

    let mut steps = 0;
    while steps < 300 {
        let outcome = env.step(&[0.2, 0.0]).unwrap();
        assert!(outcome.reward.is_finite());
        assert!(outcome.observation.iter().all(|v| v.is_finite()));
        steps += 1;
        if outcome.done() {
            env.reset(None).unwrap();
        }
    }
}
