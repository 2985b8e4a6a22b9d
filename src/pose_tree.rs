use std::collections::HashMap;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::PoseTreeConfig;
use crate::error::{PoseError, PoseResult};
use crate::geometry::invert;
use crate::pose_vector::PoseVector;
use crate::types::{NamedSE3Pose, Time};

/// Pose histories for every observed frame pair
///
/// `A_pose_B` and `B_pose_A` land in the same history: poses are stored with
/// the lexicographically smaller frame name as `frame_a`, inverting the
/// transform when it arrives the other way round.
pub struct PoseTree {
    pose_vectors: HashMap<(String, String), PoseVector>,
    config: PoseTreeConfig,
    clock: Arc<dyn Clock>,
}

/// Bring a pose into storage orientation (`frame_a < frame_b`).
///
/// # Errors
/// `InvalidArgument` if the pose carries no transform
pub fn canonicalize(pose: NamedSE3Pose) -> PoseResult<NamedSE3Pose> {
    let a_pose_b = pose.a_pose_b.as_ref().ok_or_else(|| {
        PoseError::InvalidArgument(format!(
            "cannot canonicalize pose without transform: {}:{}",
            pose.frame_a, pose.frame_b
        ))
    })?;

    if pose.frame_b > pose.frame_a {
        return Ok(pose);
    }
    Ok(NamedSE3Pose {
        a_pose_b: Some(invert(a_pose_b)),
        frame_a: pose.frame_b,
        frame_b: pose.frame_a,
    })
}

fn is_canonical(frame_a: &str, frame_b: &str) -> bool {
    frame_b > frame_a
}

/// Storage key of the unordered pair: its frames in canonical order
fn key(frame_a: &str, frame_b: &str) -> (String, String) {
    if is_canonical(frame_a, frame_b) {
        (frame_a.to_string(), frame_b.to_string())
    } else {
        (frame_b.to_string(), frame_a.to_string())
    }
}

impl PoseTree {
    /// Empty tree with default retention, aged against the wall clock
    pub fn new() -> Self {
        Self::with_clock(PoseTreeConfig::default(), Arc::new(SystemClock))
    }

    pub fn with_clock(config: PoseTreeConfig, clock: Arc<dyn Clock>) -> Self {
        PoseTree {
            pose_vectors: HashMap::new(),
            config,
            clock,
        }
    }

    /// Store a pose in the history of its frame pair, creating it on first use.
    pub fn add_pose(&mut self, pose: NamedSE3Pose) -> PoseResult<()> {
        let pose = canonicalize(pose)?;
        let key = key(&pose.frame_a, &pose.frame_b);

        let max_age = self.config.max_age();
        let clock = &self.clock;
        let pose_vector = self.pose_vectors.entry(key).or_insert_with_key(|(a, b)| {
            log::debug!("New pose vector {}:{}", a, b);
            PoseVector::with_clock(max_age, Arc::clone(clock))
        });
        pose_vector.insert(pose)
    }

    /// `frame_a_pose_frame_b` at `time`, in whichever orientation was asked for.
    ///
    /// Returns `None` for an unknown pair or when the history has no answer
    /// (see `PoseVector::get`).
    pub fn get(&self, frame_a: &str, frame_b: &str, time: Time) -> PoseResult<Option<NamedSE3Pose>> {
        let pose = match self.pose_vector(frame_a, frame_b) {
            Some(pose_vector) => pose_vector.get(time)?,
            None => return Ok(None),
        };
        if is_canonical(frame_a, frame_b) {
            return Ok(pose);
        }
        Ok(pose.map(|pose| NamedSE3Pose {
            a_pose_b: pose.a_pose_b.as_ref().map(invert),
            frame_a: pose.frame_b,
            frame_b: pose.frame_a,
        }))
    }

    /// History for a pair, in either orientation
    pub fn pose_vector(&self, frame_a: &str, frame_b: &str) -> Option<&PoseVector> {
        self.pose_vectors.get(&key(frame_a, frame_b))
    }

    /// Stored pairs in canonical orientation, sorted
    pub fn frame_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self.pose_vectors.keys().cloned().collect();
        pairs.sort();
        pairs
    }

    pub fn config(&self) -> &PoseTreeConfig {
        &self.config
    }

    /// Number of frame pairs
    pub fn len(&self) -> usize {
        self.pose_vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pose_vectors.is_empty()
    }
}

impl Default for PoseTree {
    fn default() -> Self {
        Self::new()
    }
}
