//! Shadow Receivers
//!
//! Shadow techniques that are folded directly into the generated receiver
//! programs instead of being applied as a separate pass.

mod pssm;

pub use pssm::{IntegratedPssm, IntegratedPssmFactory};

use smallvec::SmallVec;

/// Maximum number of shadow splits.
pub const MAX_CASCADES: usize = 4;

/// Split points of a view frustum, `near` first and `far` last.
///
/// Uses the Practical Split Scheme: `lambda` blends between a uniform
/// (`0.0`) and a logarithmic (`1.0`) distribution.
#[must_use]
pub fn practical_split_points(split_count: usize, near: f32, far: f32, lambda: f32) -> SmallVec<[f32; 5]> {
    let n = split_count.clamp(1, MAX_CASCADES);
    let mut points = SmallVec::with_capacity(n + 1);
    points.push(near);

    for i in 1..n {
        let p = i as f32 / n as f32;
        let log_split = near * (far / near).powf(p);
        let uni_split = near + (far - near) * p;
        points.push(lambda * log_split + (1.0 - lambda) * uni_split);
    }

    points.push(far);
    points
}
