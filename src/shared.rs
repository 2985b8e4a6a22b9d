use crossbeam::channel::Receiver;
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};

use crate::error::{PoseError, PoseResult};
use crate::pose_tree::PoseTree;
use crate::types::{NamedSE3Pose, Time};

/// Thread-safe handle to a `PoseTree`
///
/// One listener thread owns the write side; readers only get owned copies,
/// never a reference into the tree. Clones share the same tree.
#[derive(Clone)]
pub struct SharedPoseTree {
    tree: Arc<RwLock<PoseTree>>,
}

/// Totals reported by a listener once its channel closes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListenerStats {
    pub applied: u64,
    pub rejected: u64,
}

impl SharedPoseTree {
    pub fn new(tree: PoseTree) -> Self {
        SharedPoseTree {
            tree: Arc::new(RwLock::new(tree)),
        }
    }

    pub fn add_pose(&self, pose: NamedSE3Pose) -> PoseResult<()> {
        let mut tree = self
            .tree
            .write()
            .map_err(|_| PoseError::Internal("Failed to acquire pose tree write lock".to_string()))?;
        tree.add_pose(pose)
    }

    pub fn get(&self, frame_a: &str, frame_b: &str, time: Time) -> PoseResult<Option<NamedSE3Pose>> {
        let tree = self
            .tree
            .read()
            .map_err(|_| PoseError::Internal("Failed to acquire pose tree read lock".to_string()))?;
        tree.get(frame_a, frame_b, time)
    }

    /// Copy of one pair's history, oldest first
    pub fn snapshot(&self, frame_a: &str, frame_b: &str) -> PoseResult<Vec<NamedSE3Pose>> {
        let tree = self
            .tree
            .read()
            .map_err(|_| PoseError::Internal("Failed to acquire pose tree read lock".to_string()))?;
        Ok(tree
            .pose_vector(frame_a, frame_b)
            .map(|v| v.snapshot())
            .unwrap_or_default())
    }

    pub fn frame_pairs(&self) -> PoseResult<Vec<(String, String)>> {
        let tree = self
            .tree
            .read()
            .map_err(|_| PoseError::Internal("Failed to acquire pose tree read lock".to_string()))?;
        Ok(tree.frame_pairs())
    }

    /// Spawn the single writer: drain `poses` into the tree until every sender is dropped.
    /// Rejected poses are logged and counted, not fatal.
    pub fn spawn_listener(&self, poses: Receiver<NamedSE3Pose>) -> JoinHandle<ListenerStats> {
        let shared = self.clone();
        thread::spawn(move || {
            let mut stats = ListenerStats::default();
            for pose in poses.iter() {
                let pair = format!("{}:{}", pose.frame_a, pose.frame_b);
                match shared.add_pose(pose) {
                    Ok(()) => stats.applied += 1,
                    Err(e) => {
                        log::warn!("Dropping pose {}: {}", pair, e);
                        stats.rejected += 1;
                    }
                }
            }
            log::debug!(
                "Pose listener finished: {} applied, {} rejected",
                stats.applied,
                stats.rejected
            );
            stats
        })
    }
}
