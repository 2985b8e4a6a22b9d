//! Time-indexed pose buffer
//!
//! Keeps a bounded history of rigid transforms per frame pair and answers
//! "where was B relative to A at time t" by SE3 interpolation.

pub mod clock;
pub mod config;
pub mod error;
pub mod geometry;
pub mod pose_tree;
pub mod pose_vector;
pub mod shared;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::PoseTreeConfig;
pub use error::{PoseError, PoseResult};
pub use geometry::{interpolate, invert};
pub use pose_tree::{canonicalize, PoseTree};
pub use pose_vector::{PoseVector, DEFAULT_MAX_AGE_SECS};
pub use shared::{ListenerStats, SharedPoseTree};
pub use types::{NamedSE3Pose, Quaternion, SE3Pose, Time, Vec3};
