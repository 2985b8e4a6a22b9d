//! SE3 helpers over decoded poses
//!
//! Poses travel as plain `SE3Pose` values; the math happens on
//! `nalgebra::Isometry3` and is converted back before returning.

use chrono::{DateTime, Utc};
use nalgebra::{Isometry3, Quaternion as NaQuaternion, Translation3, UnitQuaternion, Vector3};

use crate::types::{Quaternion, SE3Pose, Vec3};

/// Convert a pose to an isometry. The rotation is renormalized.
pub fn to_isometry(pose: &SE3Pose) -> Isometry3<f64> {
    let p = &pose.position;
    let q = &pose.rotation;
    let rotation = UnitQuaternion::from_quaternion(NaQuaternion::new(q.w, q.x, q.y, q.z));
    Isometry3::from_parts(Translation3::new(p.x, p.y, p.z), rotation)
}

/// Convert an isometry back to a pose with the given stamp.
pub fn from_isometry(iso: &Isometry3<f64>, stamp: Option<DateTime<Utc>>) -> SE3Pose {
    let t = &iso.translation.vector;
    let q = iso.rotation.quaternion();
    SE3Pose::new(
        Vec3::new(t.x, t.y, t.z),
        Quaternion::new(q.i, q.j, q.k, q.w),
        stamp,
    )
}

/// Inverse transform (`B_pose_A` from `A_pose_B`), keeping the original stamp.
pub fn invert(pose: &SE3Pose) -> SE3Pose {
    from_isometry(&to_isometry(pose).inverse(), pose.stamp)
}

/// Interpolate between two stamped poses at `stamp`.
///
/// Rotation is SLERPed, position LERPed, by
/// `ratio = (stamp - a.stamp) / (b.stamp - a.stamp)`.
/// The ratio is not clamped: callers keep `stamp` within `[a.stamp, b.stamp]`.
///
/// # Returns
/// `None` if either pose has no stamp
pub fn interpolate(a: &SE3Pose, b: &SE3Pose, stamp: DateTime<Utc>) -> Option<SE3Pose> {
    let (a_stamp, b_stamp) = (a.stamp?, b.stamp?);

    let span = seconds_between(a_stamp, b_stamp);
    if span == 0.0 {
        return Some(a.clone().with_stamp(stamp));
    }
    let ratio = seconds_between(a_stamp, stamp) / span;

    let a_iso = to_isometry(a);
    let b_iso = to_isometry(b);

    // try_slerp only fails for a degenerate half-turn; nlerp is well-defined there
    let rotation = a_iso
        .rotation
        .try_slerp(&b_iso.rotation, ratio, f64::EPSILON)
        .unwrap_or_else(|| a_iso.rotation.nlerp(&b_iso.rotation, ratio));
    let position: Vector3<f64> = a_iso
        .translation
        .vector
        .lerp(&b_iso.translation.vector, ratio);

    Some(from_isometry(
        &Isometry3::from_parts(Translation3::from(position), rotation),
        Some(stamp),
    ))
}

/// Signed seconds from `from` to `to`, at nanosecond resolution when it fits.
fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to - from;
    match delta.num_nanoseconds() {
        Some(ns) => ns as f64 * 1e-9,
        None => delta.num_milliseconds() as f64 * 1e-3,
    }
}
