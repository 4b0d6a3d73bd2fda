//! Interpolatable geometry descriptors for the usual chart primitives.
//!
//! These only carry numbers. Scales and path generators stay with the caller's [`Layout`](`crate::sync::Layout`).

use crate::interpolate::{lerp, Interpolate, Snap};
use serde::{Deserialize, Serialize};

/// A vertical bar in a band chart.
///
/// `x` is the band offset and snaps, everything else blends.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bar {
	pub x: Snap<f64>,
	pub y: f64,
	pub width: f64,
	pub height: f64,
}

impl Interpolate for Bar {
	fn interpolate(&self, to: &Self, t: f64) -> Self {
		Self {
			x: self.x.interpolate(&to.x, t),
			y: lerp(self.y, to.y, t),
			width: lerp(self.width, to.width, t),
			height: lerp(self.height, to.height, t),
		}
	}
}

impl Bar {
	#[must_use]
	pub fn attributes(&self) -> Vec<(&'static str, String)> {
		vec![
			("x", self.x.0.to_string()),
			("y", self.y.to_string()),
			("width", self.width.to_string()),
			("height", self.height.to_string()),
		]
	}
}

/// Start and end angle of a pie or donut slice, in radians.
///
/// Pie layouts keep both angles within `0.0..=TAU` with `start_angle <= end_angle`,
/// so the angles blend linearly instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ArcAngles {
	pub start_angle: f64,
	pub end_angle: f64,
}

impl Interpolate for ArcAngles {
	fn interpolate(&self, to: &Self, t: f64) -> Self {
		Self {
			start_angle: lerp(self.start_angle, to.start_angle, t),
			end_angle: lerp(self.end_angle, to.end_angle, t),
		}
	}
}

impl ArcAngles {
	/// The zero-width slice at this slice's end, which slices grow out of and shrink into.
	#[must_use]
	pub fn collapsed_to_end(&self) -> Self {
		Self {
			start_angle: self.end_angle,
			end_angle: self.end_angle,
		}
	}
}

/// A point marker.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dot {
	pub cx: f64,
	pub cy: f64,
	pub r: f64,
}

impl Interpolate for Dot {
	fn interpolate(&self, to: &Self, t: f64) -> Self {
		Self {
			cx: lerp(self.cx, to.cx, t),
			cy: lerp(self.cy, to.cy, t),
			r: lerp(self.r, to.r, t),
		}
	}
}

impl Dot {
	#[must_use]
	pub fn attributes(&self) -> Vec<(&'static str, String)> {
		vec![("cx", self.cx.to_string()), ("cy", self.cy.to_string()), ("r", self.r.to_string())]
	}
}
