//! Kinematics observation: ego row plus the nearest vehicles.
//!
//! ```text
//! row 0      [1, 0,       y/W,  vx/V,      vy/V,      cos h, sin h]   ego
//! row 1..=4  [1, dx/R,    dy/W, dvx/V,     dvy/V,     cos h, sin h]   nearest others
//! empty row  [0, 0,       0,    0,         0,         0,     0]
//! ```
//!
//! `W` is the road width, `V` the ego speed limit, `R` the perception range.

use crate::config::CarFollowingConfig;
use crate::vehicle::Vehicle;

/// Observed vehicles including the ego.
pub const OBSERVED_VEHICLES: usize = 5;
/// Features per vehicle row.
pub const FEATURES: usize = 7;
/// Observation shape.
pub const OBSERVATION_SHAPE: [usize; 2] = [OBSERVED_VEHICLES, FEATURES];

/// Build the flattened `[OBSERVED_VEHICLES × FEATURES]` observation.
pub fn observe(ego: &Vehicle, others: &[Vehicle], config: &CarFollowingConfig) -> Vec<f32> {
    let width = config.road_width();
    let max_speed = config.max_speed;
    let range = config.perception_range;

    let mut obs = vec![0.0f32; OBSERVED_VEHICLES * FEATURES];
    obs[..FEATURES].copy_from_slice(&[
        1.0,
        0.0,
        ego.y / width,
        ego.vx() / max_speed,
        ego.vy() / max_speed,
        ego.heading.cos(),
        ego.heading.sin(),
    ]);

    let mut nearby: Vec<&Vehicle> = others
        .iter()
        .filter(|v| (v.x - ego.x).abs() <= range)
        .collect();
    nearby.sort_by(|a, b| (a.x - ego.x).abs().total_cmp(&(b.x - ego.x).abs()));

    for (row, other) in nearby.into_iter().take(OBSERVED_VEHICLES - 1).enumerate() {
        let start = (row + 1) * FEATURES;
        obs[start..start + FEATURES].copy_from_slice(&[
            1.0,
            (other.x - ego.x) / range,
            (other.y - ego.y) / width,
            (other.vx() - ego.vx()) / max_speed,
            (other.vy() - ego.vy()) / max_speed,
            other.heading.cos(),
            other.heading.sin(),
        ]);
    }

    obs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(obs: &[f32], i: usize) -> &[f32] {
        &obs[i * FEATURES..(i + 1) * FEATURES]
    }

    #[test]
    fn test_ego_row_only() {
        let config = CarFollowingConfig::default();
        let ego = Vehicle::new(100.0, 6.0, 20.0);
        let obs = observe(&ego, &[], &config);

        assert_eq!(obs.len(), 35);
        assert_eq!(row(&obs, 0), &[1.0, 0.0, 0.5, 0.5, 0.0, 1.0, 0.0]);
        assert!(obs[FEATURES..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_nearest_first_and_out_of_range_dropped() {
        let config = CarFollowingConfig::default();
        let ego = Vehicle::new(0.0, 6.0, 20.0);
        let others = vec![
            Vehicle::new(50.0, 6.0, 20.0),
            Vehicle::new(-10.0, 2.0, 24.0),
            Vehicle::new(500.0, 6.0, 20.0),
        ];
        let obs = observe(&ego, &others, &config);

        assert_eq!(row(&obs, 1)[1], -0.1);
        assert_eq!(row(&obs, 1)[3], 0.1);
        assert_eq!(row(&obs, 2)[1], 0.5);
        assert_eq!(row(&obs, 3)[0], 0.0);
    }

    #[test]
    fn test_at_most_four_others() {
        let config = CarFollowingConfig::default();
        let ego = Vehicle::new(0.0, 6.0, 20.0);
        let others: Vec<Vehicle> = (1..=8).map(|i| Vehicle::new(i as f32 * 10.0, 2.0, 20.0)).collect();
        let obs = observe(&ego, &others, &config);

        assert_eq!(obs.len(), OBSERVED_VEHICLES * FEATURES);
        for i in 0..OBSERVED_VEHICLES {
            assert_eq!(row(&obs, i)[0], 1.0);
        }
        assert!((row(&obs, 4)[1] - 0.4).abs() < 1e-6);
    }
}
