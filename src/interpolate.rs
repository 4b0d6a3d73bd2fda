//! Value interpolation for transitions.
//!
//! Composite values interpolate each component independently.
//! Components that must not be blended linearly are wrapped: [`Angle`] takes the shorter way around the circle and [`Snap`] jumps straight to its target.

use core::f64::consts::{PI, TAU};
use num_traits::Float;
use serde::{Deserialize, Serialize};

/// A value that can be blended towards another one.
pub trait Interpolate {
	/// Returns the value at progress `t` between `self` (`t == 0`) and `to` (`t == 1`).
	///
	/// `t` is normally within `0.0..=1.0`.
	#[must_use]
	fn interpolate(&self, to: &Self, t: f64) -> Self;
}

/// Linear interpolation that is exact at both ends.
pub fn lerp<F: Float>(from: F, to: F, t: f64) -> F {
	if t <= 0.0 {
		from
	} else if t >= 1.0 {
		to
	} else {
		match F::from(t) {
			Some(t) => from + (to - from) * t,
			None => to,
		}
	}
}

macro_rules! impl_interpolate_float {
	($($float:ty),*) => {$(
		impl Interpolate for $float {
			fn interpolate(&self, to: &Self, t: f64) -> Self {
				lerp(*self, *to, t)
			}
		}
	)*};
}
impl_interpolate_float!(f32, f64);

impl<A: Interpolate, B: Interpolate> Interpolate for (A, B) {
	fn interpolate(&self, to: &Self, t: f64) -> Self {
		(self.0.interpolate(&to.0, t), self.1.interpolate(&to.1, t))
	}
}

impl<A: Interpolate, B: Interpolate, C: Interpolate> Interpolate for (A, B, C) {
	fn interpolate(&self, to: &Self, t: f64) -> Self {
		(self.0.interpolate(&to.0, t), self.1.interpolate(&to.1, t), self.2.interpolate(&to.2, t))
	}
}

/// An angle in radians that interpolates along the shorter arc.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Angle(pub f64);

impl Interpolate for Angle {
	fn interpolate(&self, to: &Self, t: f64) -> Self {
		if t >= 1.0 {
			return *to;
		}
		let mut delta = (to.0 - self.0).rem_euclid(TAU);
		if delta > PI {
			delta -= TAU;
		}
		Angle(lerp(self.0, self.0 + delta, t))
	}
}

/// A value that doesn't blend: it is replaced by its target as soon as a transition starts.
///
/// Category band offsets use this, as positions between bands are meaningless.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snap<T>(pub T);

impl<T: Clone> Interpolate for Snap<T> {
	fn interpolate(&self, to: &Self, t: f64) -> Self {
		if t > 0.0 {
			to.clone()
		} else {
			self.clone()
		}
	}
}

/// Maps linear time progress onto transition progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
	Linear,
	/// Slow start, slow finish. Symmetric around `t == 0.5`.
	CubicInOut,
}

impl Default for Easing {
	fn default() -> Self {
		Easing::Linear
	}
}

impl Easing {
	#[must_use]
	pub fn apply(self, t: f64) -> f64 {
		let t = t.max(0.0).min(1.0);
		match self {
			Easing::Linear => t,
			Easing::CubicInOut => {
				if t < 0.5 {
					4.0 * t * t * t
				} else {
					let u = 2.0 * t - 2.0;
					u * u * u / 2.0 + 1.0
				}
			}
		}
	}
}
