use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Vec3 { x, y, z }
    }
}

/// Rotation as a unit quaternion, scalar part last.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Quaternion { x, y, z, w }
    }

    pub fn identity() -> Self {
        Quaternion::new(0.0, 0.0, 0.0, 1.0)
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Quaternion::identity()
    }
}

/// Rigid transform `A_pose_B`: maps points expressed in frame B into frame A.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SE3Pose {
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Quaternion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stamp: Option<DateTime<Utc>>,
}

impl SE3Pose {
    pub fn new(position: Vec3, rotation: Quaternion, stamp: Option<DateTime<Utc>>) -> Self {
        SE3Pose {
            position,
            rotation,
            stamp,
        }
    }

    /// Same transform, re-stamped
    pub fn with_stamp(mut self, stamp: DateTime<Utc>) -> Self {
        self.stamp = Some(stamp);
        self
    }
}

/// A transform between two named frames, as decoded from the event bus.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedSE3Pose {
    pub frame_a: String,
    pub frame_b: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub a_pose_b: Option<SE3Pose>,
}

impl NamedSE3Pose {
    pub fn new(frame_a: &str, frame_b: &str, a_pose_b: SE3Pose) -> Self {
        NamedSE3Pose {
            frame_a: frame_a.to_string(),
            frame_b: frame_b.to_string(),
            a_pose_b: Some(a_pose_b),
        }
    }

    pub fn stamp(&self) -> Option<DateTime<Utc>> {
        self.a_pose_b.as_ref().and_then(|p| p.stamp)
    }
}

/// Point in time to query a pose buffer at
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Time {
    /// Most recently stored sample
    Latest,
    At(DateTime<Utc>),
}

impl From<DateTime<Utc>> for Time {
    fn from(stamp: DateTime<Utc>) -> Self {
        Time::At(stamp)
    }
}
