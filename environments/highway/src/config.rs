//! Configuration for the car-following scenario.

use drive_ppo::EnvError;

use crate::idm::IdmParams;

/// Reward weights.
#[derive(Clone, Debug, PartialEq)]
pub struct RewardConfig {
    /// Added on collision or leaving the road
    pub collision_reward: f32,
    /// Scaled by the ego's normalized speed inside `speed_range`
    pub high_speed_reward: f32,
    /// Speed (m/s) mapped to 0 and 1 by the speed term
    pub speed_range: (f32, f32),
    /// Scaled by how close the ego is to its lane center
    pub lane_centering_reward: f32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            collision_reward: -1.0,
            high_speed_reward: 0.4,
            speed_range: (20.0, 30.0),
            lane_centering_reward: 0.1,
        }
    }
}

/// Car-following scenario configuration.
///
/// # Example
/// ```ignore
/// let config = CarFollowingConfig::new()
///     .with_traffic(8)
///     .with_lead_gap(25.0)
///     .with_max_steps(700);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct CarFollowingConfig {
    pub num_lanes: usize,
    /// Lane width (m)
    pub lane_width: f32,
    /// Simulation step (s)
    pub dt: f32,
    /// Truncation limit
    pub max_steps: usize,
    /// Random traffic in addition to the lead vehicle
    pub traffic: usize,
    /// Initial bumper-to-bumper gap to the lead vehicle (m)
    pub lead_gap: f32,
    /// Initial ego speed range (m/s)
    pub initial_speed: (f32, f32),
    /// Ego speed limit (m/s)
    pub max_speed: f32,
    /// Throttle at action +1 (m/s²)
    pub max_accel: f32,
    /// Braking at action −1 (m/s²)
    pub max_brake: f32,
    /// Steering angle at |action| = 1 (rad)
    pub max_steering: f32,
    /// Longitudinal range in which vehicles are observed (m)
    pub perception_range: f32,
    pub idm: IdmParams,
    pub reward: RewardConfig,
}

impl Default for CarFollowingConfig {
    fn default() -> Self {
        Self {
            num_lanes: 3,
            lane_width: 4.0,
            dt: 0.05,
            max_steps: 700,
            traffic: 6,
            lead_gap: 30.0,
            initial_speed: (20.0, 25.0),
            max_speed: 40.0,
            max_accel: 3.0,
            max_brake: 6.0,
            max_steering: 0.3,
            perception_range: 100.0,
            idm: IdmParams::default(),
            reward: RewardConfig::default(),
        }
    }
}

impl CarFollowingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_num_lanes(mut self, n: usize) -> Self {
        self.num_lanes = n;
        self
    }

    pub fn with_dt(mut self, dt: f32) -> Self {
        self.dt = dt;
        self
    }

    pub fn with_max_steps(mut self, n: usize) -> Self {
        self.max_steps = n;
        self
    }

    pub fn with_traffic(mut self, n: usize) -> Self {
        self.traffic = n;
        self
    }

    pub fn with_lead_gap(mut self, gap: f32) -> Self {
        self.lead_gap = gap;
        self
    }

    pub fn with_initial_speed(mut self, low: f32, high: f32) -> Self {
        self.initial_speed = (low, high);
        self
    }

    pub fn with_idm(mut self, idm: IdmParams) -> Self {
        self.idm = idm;
        self
    }

    pub fn with_reward(mut self, reward: RewardConfig) -> Self {
        self.reward = reward;
        self
    }

    /// Total road width (m).
    pub fn road_width(&self) -> f32 {
        self.num_lanes as f32 * self.lane_width
    }

    /// Lateral coordinate of a lane center.
    pub fn lane_center(&self, lane: usize) -> f32 {
        (lane as f32 + 0.5) * self.lane_width
    }

    /// Lane index containing lateral coordinate `y`, if on the road.
    pub fn lane_of(&self, y: f32) -> Option<usize> {
        if y < 0.0 || y >= self.road_width() {
            return None;
        }
        Some(((y / self.lane_width) as usize).min(self.num_lanes - 1))
    }

    /// Lane the ego starts in (the middle one).
    pub fn ego_lane(&self) -> usize {
        self.num_lanes / 2
    }

    pub fn validate(&self) -> Result<(), EnvError> {
        let invalid = |msg: String| Err(EnvError::Creation(msg));
        if self.num_lanes == 0 {
            return invalid("num_lanes must be > 0".to_string());
        }
        if !(self.lane_width > 0.0) || !(self.dt > 0.0) {
            return invalid(format!(
                "lane_width ({}) and dt ({}) must be positive",
                self.lane_width, self.dt
            ));
        }
        if self.max_steps == 0 {
            return invalid("max_steps must be > 0".to_string());
        }
        if self.initial_speed.0 > self.initial_speed.1 || self.initial_speed.0 < 0.0 {
            return invalid(format!("invalid initial speed range {:?}", self.initial_speed));
        }
        if self.reward.speed_range.0 >= self.reward.speed_range.1 {
            return invalid(format!("invalid reward speed range {:?}", self.reward.speed_range));
        }
        if self.lead_gap < 0.0 {
            return invalid(format!("lead_gap must be >= 0, got {}", self.lead_gap));
        }
        Ok(())
    }
}
