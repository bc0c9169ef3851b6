//! Per-vehicle trajectory history for the 3D map.
//!
//! Samples are stored in display space, filtered by a minimum travel
//! distance and capped at a fixed length (oldest evicted first). Each
//! vehicle also gets a palette color the first time it is observed.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::models::{Vec3, VehicleId};

/// Palette for vehicles and their trails, handed out in first-seen order.
pub const DRONE_COLORS: [&str; 10] = [
    "#FF5733", // Orange-Red
    "#33FF57", // Bright Green
    "#3357FF", // Blue
    "#FF33E0", // Magenta
    "#FFD700", // Gold
    "#00FFFF", // Cyan
    "#FF00FF", // Fuchsia
    "#9400D3", // Violet
    "#1E90FF", // Dodger Blue
    "#32CD32", // Lime Green
];

pub const DEFAULT_MAX_SAMPLES: usize = 100;
pub const DEFAULT_MIN_DISTANCE: f64 = 0.05;

/// Render-ready trajectory of one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryView {
    pub vehicle_id: VehicleId,
    pub color: String,
    pub points: Vec<Vec3>,
}

#[derive(Debug, Clone)]
pub struct TrajectoryTracker {
    max_samples: usize,
    min_distance: f64,
    tracks: HashMap<VehicleId, VecDeque<Vec3>>,
    colors: HashMap<VehicleId, &'static str>,
    observed: usize,
}

impl Default for TrajectoryTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SAMPLES, DEFAULT_MIN_DISTANCE)
    }
}

impl TrajectoryTracker {
    pub fn new(max_samples: usize, min_distance: f64) -> Self {
        Self {
            max_samples: max_samples.max(1),
            min_distance: min_distance.max(0.0),
            tracks: HashMap::new(),
            colors: HashMap::new(),
            observed: 0,
        }
    }

    /// Record a world position (NED) for a vehicle.
    ///
    /// Returns `true` when a sample was appended: either the trajectory was
    /// empty or the display-space point moved more than the threshold away
    /// from the last sample.
    pub fn record(&mut self, id: VehicleId, world_position: Vec3) -> bool {
        self.assign_color(id);
        let point = world_position.ned_to_display();
        let track = self.tracks.entry(id).or_default();

        let significant = match track.back() {
            Some(last) => point.distance_to(last) > self.min_distance,
            None => true,
        };
        if !significant {
            return false;
        }

        track.push_back(point);
        while track.len() > self.max_samples {
            track.pop_front();
        }
        true
    }

    fn assign_color(&mut self, id: VehicleId) -> &'static str {
        let observed = &mut self.observed;
        *self.colors.entry(id).or_insert_with(|| {
            let color = DRONE_COLORS[*observed % DRONE_COLORS.len()];
            *observed += 1;
            color
        })
    }

    pub fn color_of(&self, id: VehicleId) -> Option<&'static str> {
        self.colors.get(&id).copied()
    }

    pub fn samples(&self, id: VehicleId) -> Option<Vec<Vec3>> {
        self.tracks.get(&id).map(|t| t.iter().copied().collect())
    }

    pub fn len(&self, id: VehicleId) -> usize {
        self.tracks.get(&id).map_or(0, VecDeque::len)
    }

    /// Drop the trajectory of a removed vehicle.
    pub fn remove(&mut self, id: VehicleId) {
        self.tracks.remove(&id);
        self.colors.remove(&id);
    }

    /// Trajectories for the given vehicles only, in the given order.
    /// Stale entries never appear here.
    pub fn visible(&self, active: &[VehicleId]) -> Vec<TrajectoryView> {
        active
            .iter()
            .filter_map(|id| {
                let track = self.tracks.get(id)?;
                Some(TrajectoryView {
                    vehicle_id: *id,
                    color: self.color_of(*id).unwrap_or(DRONE_COLORS[0]).to_string(),
                    points: track.iter().copied().collect(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn first_sample_is_always_recorded() {
        let mut tracker = TrajectoryTracker::default();
        let id = Uuid::new_v4();
        assert!(tracker.record(id, Vec3::ZERO));
        assert_eq!(tracker.samples(id).unwrap(), vec![Vec3::ZERO]);
    }

    #[test]
    fn samples_are_stored_in_display_space() {
        let mut tracker = TrajectoryTracker::default();
        let id = Uuid::new_v4();
        tracker.record(id, Vec3::new(1.0, 2.0, -3.0));
        assert_eq!(tracker.samples(id).unwrap(), vec![Vec3::new(2.0, 3.0, 1.0)]);
    }

    #[test]
    fn small_moves_are_filtered() {
        let mut tracker = TrajectoryTracker::new(100, 0.05);
        let id = Uuid::new_v4();
        tracker.record(id, Vec3::ZERO);

        assert!(!tracker.record(id, Vec3::new(0.03, 0.0, 0.0)));
        assert!(!tracker.record(id, Vec3::new(0.05, 0.0, 0.0)));
        assert_eq!(tracker.len(id), 1);

        assert!(tracker.record(id, Vec3::new(0.06, 0.0, 0.0)));
        assert_eq!(tracker.len(id), 2);
    }

    #[test]
    fn overflow_evicts_oldest_first() {
        let mut tracker = TrajectoryTracker::new(3, 0.05);
        let id = Uuid::new_v4();
        for i in 0..5 {
            tracker.record(id, Vec3::new(i as f64, 0.0, 0.0));
        }

        let xs: Vec<f64> = tracker.samples(id).unwrap().iter().map(|p| p.z).collect();
        assert_eq!(xs, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn length_never_exceeds_cap() {
        let mut tracker = TrajectoryTracker::new(100, 0.05);
        let id = Uuid::new_v4();
        for i in 0..250 {
            tracker.record(id, Vec3::new(0.0, i as f64 * 0.1, 0.0));
            assert!(tracker.len(id) <= 100);
        }
        assert_eq!(tracker.len(id), 100);
    }

    #[test]
    fn colors_follow_first_seen_order_and_wrap() {
        let mut tracker = TrajectoryTracker::default();
        let ids: Vec<VehicleId> = (0..12).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            tracker.record(*id, Vec3::ZERO);
        }

        assert_eq!(tracker.color_of(ids[0]), Some(DRONE_COLORS[0]));
        assert_eq!(tracker.color_of(ids[9]), Some(DRONE_COLORS[9]));
        assert_eq!(tracker.color_of(ids[10]), Some(DRONE_COLORS[0]));
        assert_eq!(tracker.color_of(ids[11]), Some(DRONE_COLORS[1]));
    }

    #[test]
    fn color_is_stable_across_later_updates() {
        let mut tracker = TrajectoryTracker::default();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        tracker.record(a, Vec3::ZERO);
        tracker.record(b, Vec3::ZERO);
        tracker.remove(a);
        tracker.record(b, Vec3::new(5.0, 0.0, 0.0));

        assert_eq!(tracker.color_of(b), Some(DRONE_COLORS[1]));
    }

    #[test]
    fn stale_trajectories_are_not_visible() {
        let mut tracker = TrajectoryTracker::default();
        let live = Uuid::new_v4();
        let gone = Uuid::new_v4();
        tracker.record(live, Vec3::ZERO);
        tracker.record(gone, Vec3::ZERO);

        let visible = tracker.visible(&[live]);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].vehicle_id, live);
        assert!(tracker.samples(gone).is_some());
    }
}
