//! Intelligent Driver Model for longitudinal traffic control.
//!
//! ```text
//! a = a_max · [1 − (v / v0)^δ − (s* / s)²]
//! s* = s0 + v·T + v·Δv / (2·√(a_max·b))
//! ```

/// IDM parameters shared by all traffic vehicles.
#[derive(Clone, Debug, PartialEq)]
pub struct IdmParams {
    /// Desired speed v0 (m/s)
    pub desired_speed: f32,
    /// Desired time headway T (s)
    pub time_headway: f32,
    /// Minimum bumper-to-bumper gap s0 (m)
    pub min_gap: f32,
    /// Maximum acceleration a_max (m/s²)
    pub max_accel: f32,
    /// Comfortable deceleration b (m/s²)
    pub comfort_decel: f32,
    /// Acceleration exponent δ
    pub exponent: f32,
    /// Hard braking limit (m/s²)
    pub max_decel: f32,
}

impl Default for IdmParams {
    fn default() -> Self {
        Self {
            desired_speed: 25.0,
            time_headway: 1.5,
            min_gap: 2.0,
            max_accel: 1.5,
            comfort_decel: 2.0,
            exponent: 4.0,
            max_decel: 9.0,
        }
    }
}

impl IdmParams {
    pub fn with_desired_speed(mut self, v0: f32) -> Self {
        self.desired_speed = v0;
        self
    }

    pub fn with_time_headway(mut self, t: f32) -> Self {
        self.time_headway = t;
        self
    }
}

/// Leader seen by a following vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Leader {
    /// Bumper-to-bumper gap (m)
    pub gap: f32,
    /// Leader speed (m/s)
    pub speed: f32,
}

/// IDM acceleration for a vehicle at `speed` behind an optional `leader`.
///
/// The result is clamped to `[-max_decel, max_accel]`.
pub fn idm_acceleration(params: &IdmParams, speed: f32, leader: Option<Leader>) -> f32 {
    let speed = speed.max(0.0);
    let free_road = 1.0 - (speed / params.desired_speed.max(1e-3)).powf(params.exponent);

    let interaction = match leader {
        Some(leader) => {
            let approach_rate = speed - leader.speed;
            let desired_gap = params.min_gap
                + (speed * params.time_headway
                    + speed * approach_rate / (2.0 * (params.max_accel * params.comfort_decel).sqrt()))
                .max(0.0);
            let gap = leader.gap.max(0.1);
            (desired_gap / gap).powi(2)
        }
        None => 0.0,
    };

    (params.max_accel * (free_road - interaction)).clamp(-params.max_decel, params.max_accel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_road_from_standstill() {
        let params = IdmParams::default();
        let a = idm_acceleration(&params, 0.0, None);
        assert!((a - params.max_accel).abs() < 1e-6);
    }

    #[test]
    fn test_no_acceleration_at_desired_speed() {
        let params = IdmParams::default();
        let a = idm_acceleration(&params, params.desired_speed, None);
        assert!(a.abs() < 1e-5);
    }

    #[test]
    fn test_brakes_when_closing_in() {
        let params = IdmParams::default();
        let a = idm_acceleration(
            &params,
            20.0,
            Some(Leader {
                gap: 8.0,
                speed: 5.0,
            }),
        );
        assert!(a < -params.comfort_decel);
        assert!(a >= -params.max_decel);
    }

    #[test]
    fn test_distant_leader_is_ignored() {
        let params = IdmParams::default();
        let free = idm_acceleration(&params, 15.0, None);
        let far = idm_acceleration(
            &params,
            15.0,
            Some(Leader {
                gap: 1000.0,
                speed: 15.0,
            }),
        );
        assert!((free - far).abs() < 0.01);
    }

    #[test]
    fn test_steady_following_is_near_equilibrium() {
        // Gap equal to s0 + v·T with equal speeds and v well below v0
        let params = IdmParams::default().with_desired_speed(100.0);
        let v = 10.0;
        let gap = params.min_gap + v * params.time_headway;
        let a = idm_acceleration(&params, v, Some(Leader { gap, speed: v }));
        assert!(a.abs() < 0.01, "acceleration {}", a);
    }
}
