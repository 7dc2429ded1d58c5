use micromath::F32Ext;
use nalgebra::{Matrix2, RowVector2, Vector2};
use serde::{Deserialize, Serialize};

use crate::data_point::{AccelerationTriplet, DataPoint};

pub const GRAVITY: f32 = 9.81;
pub const MINIMUM_DELTA_T_S: f32 = 0.01;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseVariances {
    /// m²/s⁴, drives the process noise
    pub accel: f32,
    /// m², altimeter measurement noise
    pub altimeter: f32,
}

impl Default for NoiseVariances {
    fn default() -> Self {
        Self {
            accel: 1.0,
            altimeter: 0.1,
        }
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

/// Body axis aligned with "up", picked from the first sample after init.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerticalAxis {
    pub axis: Axis,
    /// +1 or -1
    pub direction: i8,
}

impl VerticalAxis {
    /// Largest absolute reading wins, ties go to the earlier axis.
    pub fn from_acceleration(acceleration: &AccelerationTriplet) -> Self {
        let raw = [
            acceleration.x.data,
            acceleration.y.data,
            acceleration.z.data,
        ];
        let mut index = 0;
        for i in 1..3 {
            if raw[i].abs() > raw[index].abs() {
                index = i;
            }
        }

        let axis = match index {
            0 => Axis::X,
            1 => Axis::Y,
            _ => Axis::Z,
        };
        let direction = if raw[index] > 0.0 { 1 } else { -1 };
        Self { axis, direction }
    }

    pub fn project(&self, acceleration: &AccelerationTriplet) -> f32 {
        let raw = match self.axis {
            Axis::X => acceleration.x.data,
            Axis::Y => acceleration.y.data,
            Axis::Z => acceleration.z.data,
        };
        raw * self.direction as f32
    }
}

/// Linear Kalman filter over x = [altitude, vertical_velocity]ᵀ.
///
/// The vertical acceleration (gravity removed) forces the prediction,
/// the altimeter is the only measurement:
///
/// ```text
/// xₖ₊₁ = F xₖ + B aₖ + w,   F = ⎡1  dt⎤, B = ⎡½dt²⎤
///                               ⎣0   1⎦      ⎣ dt ⎦
/// zₖ   = H xₖ + v,          H = [1 0]
/// ```
///
/// The first `update` only seeds the state from the altimeter.
#[derive(Debug, Clone)]
pub struct VerticalVelocityEstimator {
    x: Vector2<f32>,
    p: Matrix2<f32>,
    noise: NoiseVariances,
    timestamp_ms: u32,
    initialized: bool,
    vertical_axis: Option<VerticalAxis>,
    inertial_vertical_acceleration: f32,
}

impl Default for VerticalVelocityEstimator {
    fn default() -> Self {
        Self::new(NoiseVariances::default())
    }
}

impl VerticalVelocityEstimator {
    pub fn new(noise: NoiseVariances) -> Self {
        Self {
            x: Vector2::zeros(),
            p: Matrix2::identity(),
            noise,
            timestamp_ms: 0,
            initialized: false,
            vertical_axis: None,
            inertial_vertical_acceleration: 0.0,
        }
    }

    /// Sets altitude, zeroes velocity and resets the covariance.
    /// The vertical axis, once latched, is kept.
    pub fn init(&mut self, initial_altitude: f32, initial_timestamp_ms: u32) {
        self.x = Vector2::new(initial_altitude, 0.0);
        self.p = Matrix2::identity();
        self.timestamp_ms = initial_timestamp_ms;
        self.initialized = true;
    }

    pub fn update(&mut self, acceleration: &AccelerationTriplet, altimeter: &DataPoint) {
        let now_ms = altimeter.timestamp_ms;
        if !self.initialized {
            self.init(altimeter.data, now_ms);
            return;
        }

        let vertical_axis = *self
            .vertical_axis
            .get_or_insert_with(|| VerticalAxis::from_acceleration(acceleration));

        let dt = if now_ms > self.timestamp_ms {
            (now_ms - self.timestamp_ms) as f32 / 1000.0
        } else {
            0.0
        }
        .max(MINIMUM_DELTA_T_S);

        let a = vertical_axis.project(acceleration) - GRAVITY;
        self.inertial_vertical_acceleration = a;

        self.predict(dt, a);
        self.correct(altimeter.data);

        self.timestamp_ms = now_ms;
    }

    fn predict(&mut self, dt: f32, a: f32) {
        let f = Matrix2::new(1.0, dt, 0.0, 1.0);
        let b = Vector2::new(0.5 * dt.powi(2), dt);
        let q = Matrix2::new(
            0.25 * dt.powi(4),
            0.5 * dt.powi(3),
            0.5 * dt.powi(3),
            dt.powi(2),
        ) * self.noise.accel;

        // x̂₋ = F x̂ + B a
        self.x = f * self.x + b * a;
        // P₋ = F P Fᵀ + Q
        self.p = f * self.p * f.transpose() + q;
    }

    fn correct(&mut self, z: f32) {
        let h = RowVector2::new(1.0, 0.0);

        // y = z - H x̂₋, S = H P₋ Hᵀ + R
        let y = z - self.x[0];
        let s = self.p[(0, 0)] + self.noise.altimeter;

        // K = P₋ Hᵀ / S
        let k = Vector2::new(self.p[(0, 0)], self.p[(1, 0)]) / s;

        self.x += k * y;
        self.p = (Matrix2::identity() - k * h) * self.p;
        self.p = 0.5 * (self.p + self.p.transpose()); // keep symmetric
    }

    pub fn estimated_altitude(&self) -> f32 {
        self.x[0]
    }

    pub fn estimated_velocity(&self) -> f32 {
        self.x[1]
    }

    pub fn altitude_variance(&self) -> f32 {
        self.p[(0, 0)]
    }

    pub fn velocity_variance(&self) -> f32 {
        self.p[(1, 1)]
    }

    pub fn timestamp_ms(&self) -> u32 {
        self.timestamp_ms
    }

    pub fn inertial_vertical_acceleration(&self) -> f32 {
        self.inertial_vertical_acceleration
    }

    pub fn vertical_axis(&self) -> Option<Axis> {
        self.vertical_axis.map(|v| v.axis)
    }

    /// 0 until the axis is latched.
    pub fn vertical_direction(&self) -> i8 {
        self.vertical_axis.map_or(0, |v| v.direction)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn noise(&self) -> &NoiseVariances {
        &self.noise
    }
}
