//! Car-following episode on a straight multi-lane highway.

use drive_ppo::{BoxSpace, EnvError, EnvInfo, Environment, ObservationSpace, StepOutcome};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::config::CarFollowingConfig;
use crate::idm::{idm_acceleration, Leader};
use crate::observation::{observe, OBSERVATION_SHAPE};
use crate::vehicle::{Vehicle, VEHICLE_LENGTH};

/// Traffic further than this behind the ego is respawned ahead (m).
const RESPAWN_BEHIND: f32 = 60.0;
/// Spawn window ahead of the ego for new and respawned traffic (m).
const SPAWN_AHEAD: (f32, f32) = (40.0, 160.0);

/// Ego vehicle behind an IDM-driven lead vehicle, with IDM traffic in the
/// other lanes.
///
/// Actions are `[throttle/brake, steering]`, both in `[-1, 1]`. Episodes
/// terminate on collision or when the ego leaves the road, and truncate
/// after `max_steps`.
#[derive(Debug, Clone)]
pub struct CarFollowing {
    config: CarFollowingConfig,
    observation_space: ObservationSpace,
    action_space: BoxSpace,
    ego: Vehicle,
    /// Index 0 is the lead vehicle
    traffic: Vec<Vehicle>,
    rng: Xoshiro256PlusPlus,
    steps: usize,
    is_reset: bool,
    closed: bool,
}

impl CarFollowing {
    pub fn new(config: CarFollowingConfig) -> Result<Self, EnvError> {
        config.validate()?;
        Ok(Self {
            config,
            observation_space: ObservationSpace::new(OBSERVATION_SHAPE.to_vec()),
            action_space: BoxSpace::symmetric(2, 1.0),
            ego: Vehicle::new(0.0, 0.0, 0.0),
            traffic: Vec::new(),
            rng: Xoshiro256PlusPlus::seed_from_u64(0),
            steps: 0,
            is_reset: false,
            closed: false,
        })
    }

    pub fn config(&self) -> &CarFollowingConfig {
        &self.config
    }

    pub fn ego(&self) -> &Vehicle {
        &self.ego
    }

    pub fn traffic(&self) -> &[Vehicle] {
        &self.traffic
    }

    /// Steps taken in the current episode.
    pub fn steps(&self) -> usize {
        self.steps
    }

    fn spawn_ahead(&mut self, lanes: &[usize]) -> Vehicle {
        let lane = lanes[self.rng.gen_range(0..lanes.len())];
        let x = self.ego.x + self.rng.gen_range(SPAWN_AHEAD.0..SPAWN_AHEAD.1);
        let v0 = self.config.idm.desired_speed;
        let speed = self.rng.gen_range(0.6 * v0..=0.9 * v0);
        Vehicle::new(x, self.config.lane_center(lane), speed)
    }

    fn other_lanes(&self) -> Vec<usize> {
        let ego_lane = self.config.ego_lane();
        let lanes: Vec<usize> = (0..self.config.num_lanes).filter(|&l| l != ego_lane).collect();
        if lanes.is_empty() {
            vec![ego_lane]
        } else {
            lanes
        }
    }

    /// Nearest vehicle ahead in the same lane, the ego included.
    fn leader_of(&self, index: usize) -> Option<Leader> {
        let me = &self.traffic[index];
        let lane = self.config.lane_of(me.y);
        let ego = std::iter::once(&self.ego);
        self.traffic
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, v)| v)
            .chain(ego)
            .filter(|v| v.x > me.x && self.config.lane_of(v.y) == lane)
            .min_by(|a, b| a.x.total_cmp(&b.x))
            .map(|v| Leader {
                gap: v.x - me.x - VEHICLE_LENGTH,
                speed: v.vx(),
            })
    }

    fn step_traffic(&mut self) {
        let dt = self.config.dt;
        let accels: Vec<f32> = (0..self.traffic.len())
            .map(|i| idm_acceleration(&self.config.idm, self.traffic[i].speed, self.leader_of(i)))
            .collect();
        for (vehicle, accel) in self.traffic.iter_mut().zip(accels) {
            vehicle.step_longitudinal(accel, dt);
        }

        // Keep density around the ego by recycling traffic left far behind
        let lanes = self.other_lanes();
        for i in 1..self.traffic.len() {
            if self.traffic[i].x < self.ego.x - RESPAWN_BEHIND {
                let vehicle = self.spawn_ahead(&lanes);
                self.traffic[i] = vehicle;
            }
        }
    }

    fn reward(&self, crashed: bool, off_road: bool) -> f32 {
        let r = &self.config.reward;
        let (low, high) = r.speed_range;
        let speed_term = ((self.ego.vx() - low) / (high - low)).clamp(0.0, 1.0);

        let lane_center = self
            .config
            .lane_of(self.ego.y)
            .map(|lane| self.config.lane_center(lane));
        let centering = lane_center.map_or(0.0, |c| {
            let offset = (self.ego.y - c) / self.config.lane_width;
            1.0 / (1.0 + 4.0 * offset * offset)
        });

        let mut reward = r.high_speed_reward * speed_term + r.lane_centering_reward * centering;
        if crashed || off_road {
            reward += r.collision_reward;
        }
        reward
    }
}

impl Environment for CarFollowing {
    fn observation_space(&self) -> &ObservationSpace {
        &self.observation_space
    }

    fn action_space(&self) -> &BoxSpace {
        &self.action_space
    }

    fn reset(&mut self, seed: Option<u64>) -> Result<(Vec<f32>, EnvInfo), EnvError> {
        if self.closed {
            return Err(EnvError::Closed);
        }
        if let Some(seed) = seed {
            self.rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        }

        let (low, high) = self.config.initial_speed;
        let speed = if high > low {
            self.rng.gen_range(low..high)
        } else {
            low
        };
        let ego_y = self.config.lane_center(self.config.ego_lane());
        self.ego = Vehicle::new(0.0, ego_y, speed);

        self.traffic.clear();
        self.traffic
            .push(Vehicle::new(self.config.lead_gap + VEHICLE_LENGTH, ego_y, speed));
        let lanes = self.other_lanes();
        for _ in 0..self.config.traffic {
            let vehicle = self.spawn_ahead(&lanes);
            self.traffic.push(vehicle);
        }

        self.steps = 0;
        self.is_reset = true;

        let mut info = EnvInfo::new();
        info.insert("speed".to_string(), self.ego.speed);
        Ok((observe(&self.ego, &self.traffic, &self.config), info))
    }

    fn step(&mut self, action: &[f32]) -> Result<StepOutcome, EnvError> {
        if self.closed {
            return Err(EnvError::Closed);
        }
        if !self.is_reset {
            return Err(EnvError::NotReset);
        }
        if action.len() != self.action_space.dim() {
            return Err(EnvError::ActionDimensionMismatch {
                expected: self.action_space.dim(),
                actual: action.len(),
            });
        }
        if action.iter().any(|a| !a.is_finite()) {
            return Err(EnvError::Simulation(format!("non-finite action {:?}", action)));
        }

        let throttle = action[0].clamp(-1.0, 1.0);
        let steer = action[1].clamp(-1.0, 1.0);
        let accel = if throttle >= 0.0 {
            throttle * self.config.max_accel
        } else {
            throttle * self.config.max_brake
        };

        self.ego.step_bicycle(
            accel,
            steer * self.config.max_steering,
            self.config.max_speed,
            self.config.dt,
        );
        self.step_traffic();
        self.steps += 1;

        let crashed = self.traffic.iter().any(|v| v.overlaps(&self.ego));
        let off_road = self.config.lane_of(self.ego.y).is_none();
        let terminated = crashed || off_road;
        let truncated = !terminated && self.steps >= self.config.max_steps;
        if terminated || truncated {
            self.is_reset = false;
        }

        let reward = self.reward(crashed, off_road);

        let mut info = EnvInfo::new();
        info.insert("speed".to_string(), self.ego.speed);
        info.insert("crashed".to_string(), if crashed { 1.0 } else { 0.0 });
        info.insert("off_road".to_string(), if off_road { 1.0 } else { 0.0 });
        if let Some(lead) = self.traffic.first() {
            info.insert("lead_gap".to_string(), lead.x - self.ego.x - VEHICLE_LENGTH);
        }

        Ok(StepOutcome {
            observation: observe(&self.ego, &self.traffic, &self.config),
            reward,
            terminated,
            truncated,
            info,
        })
    }

    fn close(&mut self) {
        self.closed = true;
        self.is_reset = false;
        self.traffic.clear();
    }
}
