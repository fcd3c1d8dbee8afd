#![forbid(unsafe_code)]

//! Time-driven scalar animations.
//!
//! Both drivers produce an absolute `f32` value (a sheet offset in pixels,
//! for instance) and advance only when the caller ticks them, so the same
//! code runs under a real frame clock and under a deterministic simulator.
//!
//! - [`Timing`] moves from one value to another over a fixed duration,
//!   shaped by an [`EasingFn`].
//! - [`Spring`] integrates a damped harmonic oscillator toward a target and
//!   completes once it is at rest.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Easing functions
// ---------------------------------------------------------------------------

/// Easing function signature: maps `t` in [0, 1] to output in [0, 1].
pub type EasingFn = fn(f32) -> f32;

/// Identity easing (constant velocity).
#[inline]
pub fn linear(t: f32) -> f32 {
    t.clamp(0.0, 1.0)
}

/// Quadratic ease-in (slow start).
#[inline]
pub fn ease_in(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t
}

/// Quadratic ease-out (slow end).
#[inline]
pub fn ease_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

/// Quadratic ease-in-out (slow start and end).
#[inline]
pub fn ease_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// Cubic ease-out (slower end than quadratic).
#[inline]
pub fn ease_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

// ---------------------------------------------------------------------------
// Animation trait
// ---------------------------------------------------------------------------

/// A time-driven animation of a single scalar.
pub trait Animation {
    /// Advance the animation by `dt`.
    fn tick(&mut self, dt: Duration);

    /// Whether the animation has reached its target.
    fn is_complete(&self) -> bool;

    /// Current value of the animated scalar.
    fn value(&self) -> f32;

    /// The value the animation settles on.
    fn target(&self) -> f32;
}

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Moves a value from `from` to `to` over a fixed duration.
///
/// Tracks elapsed time as [`Duration`] internally for precise accumulation
/// (no floating-point drift). The final tick lands exactly on `to`.
#[derive(Debug, Clone, Copy)]
pub struct Timing {
    from: f32,
    to: f32,
    elapsed: Duration,
    duration: Duration,
    easing: EasingFn,
}

impl Timing {
    /// Create a timing animation with ease-in-out easing.
    pub fn new(from: f32, to: f32, duration: Duration) -> Self {
        Self {
            from,
            to,
            elapsed: Duration::ZERO,
            duration: if duration.is_zero() {
                Duration::from_nanos(1)
            } else {
                duration
            },
            easing: ease_in_out,
        }
    }

    /// Set the easing function.
    #[must_use]
    pub fn easing(mut self, easing: EasingFn) -> Self {
        self.easing = easing;
        self
    }

    /// Raw linear progress in [0, 1] before easing.
    pub fn raw_progress(&self) -> f32 {
        let t = self.elapsed.as_secs_f64() / self.duration.as_secs_f64();
        (t as f32).clamp(0.0, 1.0)
    }
}

impl Animation for Timing {
    fn tick(&mut self, dt: Duration) {
        self.elapsed = self.elapsed.saturating_add(dt).min(self.duration);
    }

    fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }

    fn value(&self) -> f32 {
        if self.is_complete() {
            return self.to;
        }
        let t = (self.easing)(self.raw_progress());
        self.from + (self.to - self.from) * t
    }

    fn target(&self) -> f32 {
        self.to
    }
}

// ---------------------------------------------------------------------------
// Spring
// ---------------------------------------------------------------------------

/// Integration step for spring physics.
const SPRING_STEP_SECS: f32 = 1.0 / 240.0;

/// Physical parameters of a [`Spring`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringConfig {
    /// Spring constant `k`.
    pub stiffness: f32,
    /// Damping coefficient `c`.
    pub damping: f32,
    /// Mass `m`.
    pub mass: f32,
    /// Distance from target below which the spring may come to rest.
    pub rest_displacement: f32,
    /// Speed below which the spring may come to rest.
    pub rest_speed: f32,
}

impl Default for SpringConfig {
    /// Slightly underdamped: a short settle with a barely visible overshoot.
    fn default() -> Self {
        Self {
            stiffness: 180.0,
            damping: 24.0,
            mass: 1.0,
            rest_displacement: 0.5,
            rest_speed: 2.0,
        }
    }
}

impl SpringConfig {
    /// Damping ratio `c / (2 * sqrt(k * m))`. Values >= 1.0 never overshoot.
    pub fn damping_ratio(&self) -> f32 {
        let critical = 2.0 * (self.stiffness * self.mass).sqrt();
        if critical <= 0.0 {
            return f32::INFINITY;
        }
        self.damping / critical
    }

    /// A critically damped variant of this config.
    #[must_use]
    pub fn critically_damped(mut self) -> Self {
        self.damping = 2.0 * (self.stiffness * self.mass).sqrt();
        self
    }

    fn sanitized(mut self) -> Self {
        self.stiffness = self.stiffness.max(f32::MIN_POSITIVE);
        self.damping = self.damping.max(0.0);
        self.mass = self.mass.max(f32::MIN_POSITIVE);
        self.rest_displacement = self.rest_displacement.max(f32::EPSILON);
        self.rest_speed = self.rest_speed.max(f32::EPSILON);
        self
    }
}

/// Damped harmonic motion toward a target value.
///
/// Integrated with semi-implicit Euler at a fixed sub-step, so a long frame
/// stays numerically stable instead of exploding. Once displacement
/// and speed both fall below the rest thresholds the value snaps exactly to
/// the target.
#[derive(Debug, Clone, Copy)]
pub struct Spring {
    position: f32,
    velocity: f32,
    to: f32,
    config: SpringConfig,
    at_rest: bool,
}

impl Spring {
    /// Create a spring starting at `from` with zero velocity.
    pub fn new(from: f32, to: f32, config: SpringConfig) -> Self {
        let mut spring = Self {
            position: from,
            velocity: 0.0,
            to,
            config: config.sanitized(),
            at_rest: false,
        };
        spring.settle_if_resting();
        spring
    }

    /// Start with an initial velocity (units per second).
    #[must_use]
    pub fn with_velocity(mut self, velocity: f32) -> Self {
        self.velocity = velocity;
        self.at_rest = false;
        self.settle_if_resting();
        self
    }

    /// Current velocity in units per second.
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    fn settle_if_resting(&mut self) {
        if (self.position - self.to).abs() <= self.config.rest_displacement
            && self.velocity.abs() <= self.config.rest_speed
        {
            self.position = self.to;
            self.velocity = 0.0;
            self.at_rest = true;
        }
    }
}

impl Animation for Spring {
    fn tick(&mut self, dt: Duration) {
        if self.at_rest {
            return;
        }
        let SpringConfig {
            stiffness,
            damping,
            mass,
            ..
        } = self.config;
        let mut remaining = dt.as_secs_f32();
        while remaining > 0.0 {
            let h = remaining.min(SPRING_STEP_SECS);
            let force = -stiffness * (self.position - self.to) - damping * self.velocity;
            self.velocity += force / mass * h;
            self.position += self.velocity * h;
            remaining -= h;
            self.settle_if_resting();
            if self.at_rest {
                break;
            }
        }
    }

    fn is_complete(&self) -> bool {
        self.at_rest
    }

    fn value(&self) -> f32 {
        self.position
    }

    fn target(&self) -> f32 {
        self.to
    }
}
