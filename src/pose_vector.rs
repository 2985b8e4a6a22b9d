use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::error::{PoseError, PoseResult};
use crate::geometry::interpolate;
use crate::types::{NamedSE3Pose, Time};

/// Default retention horizon: 60 minutes
pub const DEFAULT_MAX_AGE_SECS: i64 = 60 * 60;

/// Time-ordered history of poses for one frame pair
///
/// Samples are kept sorted by stamp and expire `max_age` after "now" as read
/// from the injected clock. Lookups between two samples are interpolated;
/// lookups past the newest sample return nothing rather than extrapolate.
///
/// The buffer owns its samples. Every read hands back a copy.
pub struct PoseVector {
    poses: VecDeque<Stamped>,
    max_age: Duration,
    clock: Arc<dyn Clock>,
}

/// A pose with its stamp pulled out, validated once on insert.
#[derive(Clone, Debug)]
struct Stamped {
    stamp: DateTime<Utc>,
    pose: NamedSE3Pose,
}

impl PoseVector {
    /// Create an empty vector with the default horizon, aged against the wall clock
    pub fn new() -> Self {
        Self::with_clock(Duration::seconds(DEFAULT_MAX_AGE_SECS), Arc::new(SystemClock))
    }

    pub fn with_clock(max_age: Duration, clock: Arc<dyn Clock>) -> Self {
        PoseVector {
            poses: VecDeque::new(),
            max_age,
            clock,
        }
    }

    /// Insert a pose in stamp order, then drop samples older than the horizon.
    ///
    /// # Errors
    /// `InvalidArgument` if the pose has no transform or no stamp
    pub fn insert(&mut self, pose: NamedSE3Pose) -> PoseResult<()> {
        let stamp = pose.stamp().ok_or_else(|| {
            PoseError::InvalidArgument(format!(
                "cannot insert pose without stamp: {}:{}",
                pose.frame_a, pose.frame_b
            ))
        })?;

        let index = match self.previous_index(stamp) {
            Some(prev) => prev + 1,
            None => 0,
        };
        log::trace!(
            "Inserting {}:{} at {} (index {}/{})",
            pose.frame_a,
            pose.frame_b,
            stamp,
            index,
            self.poses.len()
        );
        self.poses.insert(index, Stamped { stamp, pose });
        self.expire();
        Ok(())
    }

    /// Look up the pose at `time`.
    ///
    /// * `Latest` - the last sample, if any
    /// * before the first sample - the first sample, unchanged
    /// * at or after the last sample - `None`; this includes a query exactly at
    ///   the last stamp, which is treated as beyond the data
    /// * otherwise - interpolated between the bracketing samples, carrying the
    ///   earlier sample's frame names
    ///
    /// # Errors
    /// `Internal` if the bracketing samples cannot be interpolated
    pub fn get(&self, time: Time) -> PoseResult<Option<NamedSE3Pose>> {
        let time = match time {
            Time::Latest => return Ok(self.poses.back().map(|s| s.pose.clone())),
            Time::At(time) => time,
        };

        let prev_index = match self.previous_index(time) {
            Some(index) => index,
            // earlier than all known poses; return the earliest
            None => return Ok(self.poses.front().map(|s| s.pose.clone())),
        };

        // later than all known poses; refuse to extrapolate
        if prev_index + 1 >= self.poses.len() {
            return Ok(None);
        }

        let prev = &self.poses[prev_index].pose;
        let next = &self.poses[prev_index + 1].pose;
        let interpolated = match (&prev.a_pose_b, &next.a_pose_b) {
            (Some(a), Some(b)) => interpolate(a, b, time),
            _ => None,
        }
        .ok_or_else(|| {
            PoseError::Internal(format!(
                "unable to interpolate nearest poses of {}:{} at {}",
                prev.frame_a, prev.frame_b, time
            ))
        })?;

        Ok(Some(NamedSE3Pose {
            frame_a: prev.frame_a.clone(),
            frame_b: prev.frame_b.clone(),
            a_pose_b: Some(interpolated),
        }))
    }

    /// Index of the last sample stamped at or before `time`.
    ///
    /// The first sample stamped strictly after `time` is found by binary
    /// search; the previous index is the one before it. `None` means `time`
    /// is earlier than every sample (or the vector is empty).
    fn previous_index(&self, time: DateTime<Utc>) -> Option<usize> {
        self.poses
            .partition_point(|s| s.stamp <= time)
            .checked_sub(1)
    }

    fn expire(&mut self) {
        // a horizon reaching past the earliest representable time expires nothing
        let Some(expiration) = self.clock.now().checked_sub_signed(self.max_age) else {
            return;
        };
        let before = self.poses.len();
        while self.poses.front().is_some_and(|s| s.stamp < expiration) {
            self.poses.pop_front();
        }
        let expired = before - self.poses.len();
        if expired > 0 {
            log::debug!("Expired {} poses older than {}", expired, expiration);
        }
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub fn earliest_stamp(&self) -> Option<DateTime<Utc>> {
        self.poses.front().map(|s| s.stamp)
    }

    pub fn latest_stamp(&self) -> Option<DateTime<Utc>> {
        self.poses.back().map(|s| s.stamp)
    }

    /// Owned copy of all samples, oldest first
    pub fn snapshot(&self) -> Vec<NamedSE3Pose> {
        self.poses.iter().map(|s| s.pose.clone()).collect()
    }
}

impl Default for PoseVector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::types::{Quaternion, SE3Pose, Vec3};
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn pose_at(secs: i64, x: f64) -> NamedSE3Pose {
        NamedSE3Pose::new(
            "base",
            "camera",
            SE3Pose::new(Vec3::new(x, 0.0, 0.0), Quaternion::identity(), Some(t(secs))),
        )
    }

    /// Vector whose clock sits at `now_secs`, with a horizon of `max_age_secs`
    fn vector(now_secs: i64, max_age_secs: i64) -> (PoseVector, ManualClock) {
        let clock = ManualClock::new(t(now_secs));
        let poses = PoseVector::with_clock(Duration::seconds(max_age_secs), Arc::new(clock.clone()));
        (poses, clock)
    }

    fn position_x(pose: &NamedSE3Pose) -> f64 {
        pose.a_pose_b.as_ref().unwrap().position.x
    }

    #[test]
    fn test_base_camera_scenario() {
        let (mut poses, _) = vector(10, DEFAULT_MAX_AGE_SECS);
        poses.insert(pose_at(0, 0.0)).unwrap();
        poses.insert(pose_at(10, 10.0)).unwrap();

        let mid = poses.get(Time::At(t(5))).unwrap().unwrap();
        assert_relative_eq!(position_x(&mid), 5.0, epsilon = 1e-12);
        assert_eq!(mid.frame_a, "base");
        assert_eq!(mid.frame_b, "camera");
        assert_eq!(mid.stamp(), Some(t(5)));

        assert_eq!(poses.get(Time::At(t(-1))).unwrap(), Some(pose_at(0, 0.0)));
        assert_eq!(poses.get(Time::At(t(10))).unwrap(), None);
        assert_eq!(poses.get(Time::At(t(11))).unwrap(), None);
        assert_eq!(poses.get(Time::Latest).unwrap(), Some(pose_at(10, 10.0)));
    }

    #[test]
    fn test_out_of_order_inserts_stay_sorted() {
        let (mut poses, _) = vector(100, DEFAULT_MAX_AGE_SECS);
        for secs in [7, 3, 9, 1, 5, 8, 2, 6, 4, 0] {
            poses.insert(pose_at(secs, secs as f64)).unwrap();
        }

        let stamps: Vec<_> = poses.snapshot().iter().map(|p| p.stamp().unwrap()).collect();
        let mut sorted = stamps.clone();
        sorted.sort();
        assert_eq!(stamps, sorted);
        assert_eq!(poses.len(), 10);
        assert_eq!(poses.earliest_stamp(), Some(t(0)));
        assert_eq!(poses.latest_stamp(), Some(t(9)));
    }

    #[test]
    fn test_equal_stamps_keep_insertion_order() {
        let (mut poses, _) = vector(10, DEFAULT_MAX_AGE_SECS);
        poses.insert(pose_at(5, 1.0)).unwrap();
        poses.insert(pose_at(5, 2.0)).unwrap();
        poses.insert(pose_at(1, 0.0)).unwrap();

        let xs: Vec<_> = poses.snapshot().iter().map(position_x).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_latest_is_max_stamp() {
        let (mut poses, _) = vector(100, DEFAULT_MAX_AGE_SECS);
        poses.insert(pose_at(20, 2.0)).unwrap();
        poses.insert(pose_at(30, 3.0)).unwrap();
        poses.insert(pose_at(10, 1.0)).unwrap();

        let latest = poses.get(Time::Latest).unwrap().unwrap();
        assert_eq!(latest.stamp(), Some(t(30)));
    }

    #[test]
    fn test_empty_vector_has_no_data() {
        let (poses, _) = vector(0, DEFAULT_MAX_AGE_SECS);
        assert!(poses.is_empty());
        assert_eq!(poses.get(Time::Latest).unwrap(), None);
        assert_eq!(poses.get(Time::At(t(0))).unwrap(), None);
    }

    #[test]
    fn test_single_pose() {
        let (mut poses, _) = vector(0, DEFAULT_MAX_AGE_SECS);
        poses.insert(pose_at(0, 1.0)).unwrap();

        assert_eq!(poses.get(Time::At(t(-5))).unwrap(), Some(pose_at(0, 1.0)));
        // exactly at the only stamp is past the data
        assert_eq!(poses.get(Time::At(t(0))).unwrap(), None);
    }

    #[test]
    fn test_query_at_inner_stamp_returns_that_sample() {
        let (mut poses, _) = vector(20, DEFAULT_MAX_AGE_SECS);
        poses.insert(pose_at(0, 0.0)).unwrap();
        poses.insert(pose_at(10, 4.0)).unwrap();
        poses.insert(pose_at(20, 8.0)).unwrap();

        let at_ten = poses.get(Time::At(t(10))).unwrap().unwrap();
        assert_relative_eq!(position_x(&at_ten), 4.0, epsilon = 1e-12);

        let at_fifteen = poses.get(Time::At(t(15))).unwrap().unwrap();
        assert_relative_eq!(position_x(&at_fifteen), 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_expiry_on_insert() {
        let (mut poses, clock) = vector(0, 60);
        poses.insert(pose_at(0, 0.0)).unwrap();
        poses.insert(pose_at(30, 1.0)).unwrap();
        assert_eq!(poses.len(), 2);

        clock.set(t(100));
        poses.insert(pose_at(100, 2.0)).unwrap();

        // horizon is t(40): both older samples are gone
        assert_eq!(poses.len(), 1);
        assert!(poses.snapshot().iter().all(|p| p.stamp().unwrap() >= t(40)));
    }

    #[test]
    fn test_expiry_keeps_sample_on_horizon() {
        let (mut poses, clock) = vector(0, 60);
        poses.insert(pose_at(40, 0.0)).unwrap();
        clock.set(t(100));
        poses.insert(pose_at(100, 1.0)).unwrap();

        assert_eq!(poses.earliest_stamp(), Some(t(40)));
    }

    #[test]
    fn test_stale_insert_is_swept_immediately() {
        let (mut poses, _) = vector(1000, 60);
        poses.insert(pose_at(0, 0.0)).unwrap();
        assert!(poses.is_empty());
    }

    #[test]
    fn test_horizon_beyond_representable_time_keeps_poses() {
        // roughly 300k years, past chrono's earliest date
        let (mut poses, _) = vector(0, 10_000_000_000_000);
        poses.insert(pose_at(0, 0.0)).unwrap();
        poses.insert(pose_at(1, 1.0)).unwrap();

        assert_eq!(poses.len(), 2);
    }

    #[test]
    fn test_insert_without_stamp_fails() {
        let (mut poses, _) = vector(0, DEFAULT_MAX_AGE_SECS);

        let mut unstamped = pose_at(0, 0.0);
        unstamped.a_pose_b.as_mut().unwrap().stamp = None;
        assert!(matches!(
            poses.insert(unstamped),
            Err(PoseError::InvalidArgument(_))
        ));

        let no_transform = NamedSE3Pose {
            frame_a: "base".to_string(),
            frame_b: "camera".to_string(),
            a_pose_b: None,
        };
        assert!(matches!(
            poses.insert(no_transform),
            Err(PoseError::InvalidArgument(_))
        ));
        assert!(poses.is_empty());
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let (mut poses, _) = vector(10, DEFAULT_MAX_AGE_SECS);
        poses.insert(pose_at(0, 0.0)).unwrap();

        let mut copy = poses.snapshot();
        copy.clear();
        assert_eq!(poses.len(), 1);
    }
}
