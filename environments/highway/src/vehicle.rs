//! Vehicle state and kinematics.

/// Vehicle length (m).
pub const VEHICLE_LENGTH: f32 = 5.0;
/// Vehicle width (m).
pub const VEHICLE_WIDTH: f32 = 2.0;

/// Planar vehicle state. `x` runs along the road, `y` across it.
#[derive(Clone, Debug, PartialEq)]
pub struct Vehicle {
    pub x: f32,
    pub y: f32,
    /// Speed along the heading (m/s)
    pub speed: f32,
    /// Heading relative to the road direction (rad)
    pub heading: f32,
}

impl Vehicle {
    pub fn new(x: f32, y: f32, speed: f32) -> Self {
        Self {
            x,
            y,
            speed,
            heading: 0.0,
        }
    }

    pub fn vx(&self) -> f32 {
        self.speed * self.heading.cos()
    }

    pub fn vy(&self) -> f32 {
        self.speed * self.heading.sin()
    }

    /// Kinematic bicycle update with rear-axle slip angle.
    ///
    /// Speed is clamped to `[0, max_speed]`.
    pub fn step_bicycle(&mut self, accel: f32, steering: f32, max_speed: f32, dt: f32) {
        let beta = (0.5 * steering.tan()).atan();
        let direction = self.heading + beta;
        self.x += self.speed * direction.cos() * dt;
        self.y += self.speed * direction.sin() * dt;
        self.heading += self.speed * beta.sin() / (0.5 * VEHICLE_LENGTH) * dt;
        self.heading = wrap_angle(self.heading);
        self.speed = (self.speed + accel * dt).clamp(0.0, max_speed);
    }

    /// Straight-line update along the road (lane-keeping traffic).
    pub fn step_longitudinal(&mut self, accel: f32, dt: f32) {
        let speed = (self.speed + accel * dt).max(0.0);
        // Trapezoidal position update keeps braking to a stop from overshooting
        self.x += 0.5 * (self.speed + speed) * dt;
        self.speed = speed;
    }

    /// Axis-aligned footprint overlap test.
    ///
    /// Headings stay small on a straight highway, so the boxes are not rotated.
    pub fn overlaps(&self, other: &Vehicle) -> bool {
        (self.x - other.x).abs() < VEHICLE_LENGTH && (self.y - other.y).abs() < VEHICLE_WIDTH
    }
}

/// Wrap an angle into `(-π, π]`.
pub fn wrap_angle(angle: f32) -> f32 {
    let two_pi = 2.0 * std::f32::consts::PI;
    let wrapped = (angle + std::f32::consts::PI).rem_euclid(two_pi) - std::f32::consts::PI;
    if wrapped <= -std::f32::consts::PI {
        wrapped + two_pi
    } else {
        wrapped
    }
}
