// SPDX-License-Identifier: MIT OR Apache-2.0
//! A game's multi-camera arrangement.

use crate::clip::{ClipId, TimelineClip};
use crate::error::{Result, TimelineError};
use crate::lane::{CameraLane, LaneNumber};
use crate::positioning::ShiftPlan;
use crate::time::Millis;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameId(pub Uuid);

impl GameId {
    /// Create a new random game ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GameId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamId(pub Uuid);

impl TeamId {
    /// Create a new random team ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TeamId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a phase marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkerId(pub Uuid);

impl MarkerId {
    /// Create a new random marker ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MarkerId {
    fn default() -> Self {
        Self::new()
    }
}

/// Label at a logical time ("Quarter 2 start").
/// Markers are independent of clips and may coincide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseMarker {
    /// Marker ID
    pub id: MarkerId,
    /// Logical time
    pub time_ms: Millis,
    /// Marker text
    pub label: String,
}

/// One game's multi-camera timeline.
///
/// Lanes are keyed by lane number and kept in ascending order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameTimeline {
    /// Game ID
    pub id: GameId,
    /// Owning team
    pub team: TeamId,
    lanes: IndexMap<LaneNumber, CameraLane>,
    markers: Vec<PhaseMarker>,
}

impl GameTimeline {
    /// Create an empty timeline
    pub fn new(id: GameId, team: TeamId) -> Self {
        Self {
            id,
            team,
            lanes: IndexMap::new(),
            markers: Vec::new(),
        }
    }

    /// Add a lane. Lane numbers must be unique and within `1..=max_lanes`.
    pub fn add_lane(&mut self, lane: CameraLane, max_lanes: u8) -> Result<()> {
        if !lane.lane.in_range(max_lanes) {
            return Err(TimelineError::LaneOutOfRange { lane: lane.lane, max: max_lanes });
        }
        if self.lanes.contains_key(&lane.lane) {
            return Err(TimelineError::DuplicateLane(lane.lane));
        }

        self.lanes.insert(lane.lane, lane);
        self.lanes.sort_keys();
        Ok(())
    }

    /// Remove a lane and all its clips
    pub fn remove_lane(&mut self, lane: LaneNumber) -> Option<CameraLane> {
        self.lanes.shift_remove(&lane)
    }

    /// Get a lane
    pub fn lane(&self, lane: LaneNumber) -> Option<&CameraLane> {
        self.lanes.get(&lane)
    }

    /// Get a lane, or fail with `LaneNotFound`
    pub fn require_lane(&self, lane: LaneNumber) -> Result<&CameraLane> {
        self.lanes.get(&lane).ok_or(TimelineError::LaneNotFound(lane))
    }

    /// Get a mutable lane
    pub fn lane_mut(&mut self, lane: LaneNumber) -> Option<&mut CameraLane> {
        self.lanes.get_mut(&lane)
    }

    /// All lanes in lane-number order
    pub fn lanes(&self) -> impl Iterator<Item = &CameraLane> {
        self.lanes.values()
    }

    /// Number of lanes
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Change a lane's sync offset
    pub fn set_sync_offset(&mut self, lane: LaneNumber, sync_offset_ms: i64) -> Result<()> {
        let lane = self.lanes.get_mut(&lane).ok_or(TimelineError::LaneNotFound(lane))?;
        lane.sync_offset_ms = sync_offset_ms;
        Ok(())
    }

    /// Latest clip end over all lanes
    pub fn total_duration_ms(&self) -> Millis {
        self.lanes.values().map(CameraLane::end_ms).max().unwrap_or(0)
    }

    /// Find a clip on any lane
    pub fn find_clip(&self, clip_id: ClipId) -> Option<&TimelineClip> {
        self.lanes.values().find_map(|lane| lane.clip(clip_id))
    }

    /// Every clip, lane by lane
    pub fn clips(&self) -> impl Iterator<Item = &TimelineClip> {
        self.lanes.values().flat_map(CameraLane::clips)
    }

    /// Insert a clip on its lane, refusing overlaps
    pub fn insert_clip(&mut self, clip: TimelineClip) -> Result<()> {
        let lane_number = clip.camera_lane;
        let lane = self
            .lanes
            .get_mut(&lane_number)
            .ok_or(TimelineError::LaneNotFound(lane_number))?;
        lane.insert_clip(clip)
    }

    /// Remove a clip from whichever lane holds it
    pub fn remove_clip(&mut self, clip_id: ClipId) -> Result<TimelineClip> {
        self.lanes
            .values_mut()
            .find_map(|lane| lane.remove_clip(clip_id))
            .ok_or(TimelineError::ClipNotFound(clip_id))
    }

    /// Apply a valid shift plan to a lane.
    ///
    /// An invalid plan is refused and nothing changes. The plan must have been
    /// computed against this snapshot; if applying it would still leave an
    /// overlap the lane is restored and `InvalidPlacement` is returned.
    pub fn apply_shift_plan(&mut self, lane: LaneNumber, plan: &ShiftPlan) -> Result<()> {
        if !plan.valid {
            return Err(TimelineError::InvalidPlacement {
                reason: plan.reason.clone().unwrap_or_else(|| "plan is invalid".to_string()),
            });
        }

        let camera_lane = self.lanes.get_mut(&lane).ok_or(TimelineError::LaneNotFound(lane))?;
        if let Some(missing) = plan.affected_clips.iter().find(|s| !camera_lane.contains_clip(s.clip_id)) {
            return Err(TimelineError::ClipNotFound(missing.clip_id));
        }

        let before = camera_lane.clone();
        let moves: Vec<_> = plan
            .affected_clips
            .iter()
            .map(|s| (s.clip_id, s.new_position_ms))
            .collect();
        camera_lane.set_positions(&moves);

        if let Some((a, b)) = camera_lane.find_overlap() {
            let reason = format!(
                "shift would overlap {} and {} on lane {}",
                a.display_name(),
                b.display_name(),
                lane
            );
            *camera_lane = before;
            return Err(TimelineError::InvalidPlacement { reason });
        }

        Ok(())
    }

    /// Add a phase marker
    pub fn add_marker(&mut self, time_ms: Millis, label: impl Into<String>) -> MarkerId {
        let id = MarkerId::new();
        self.insert_marker(PhaseMarker { id, time_ms, label: label.into() });
        id
    }

    /// Insert an existing marker, replacing one with the same ID
    pub fn insert_marker(&mut self, marker: PhaseMarker) {
        self.markers.retain(|m| m.id != marker.id);
        self.markers.push(marker);
        self.markers.sort_by_key(|m| m.time_ms);
    }

    /// Remove a phase marker
    pub fn remove_marker(&mut self, marker_id: MarkerId) -> Option<PhaseMarker> {
        let idx = self.markers.iter().position(|m| m.id == marker_id)?;
        Some(self.markers.remove(idx))
    }

    /// Markers in time order
    pub fn markers(&self) -> &[PhaseMarker] {
        &self.markers
    }

    /// Markers within `[start, end]`
    pub fn markers_in_range(&self, start: Millis, end: Millis) -> Vec<&PhaseMarker> {
        self.markers
            .iter()
            .filter(|m| m.time_ms >= start && m.time_ms <= end)
            .collect()
    }

    /// Check the no-overlap invariant on every lane.
    /// Returns a description of the first violation.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        for lane in self.lanes.values() {
            if let Some((a, b)) = lane.find_overlap() {
                return Err(format!(
                    "{} and {} overlap on lane {}",
                    a.display_name(),
                    b.display_name(),
                    lane.lane
                ));
            }
            if let Some(stray) = lane.clips().iter().find(|c| c.camera_lane != lane.lane) {
                return Err(format!(
                    "{} is stored on lane {} but claims lane {}",
                    stray.display_name(),
                    lane.lane,
                    stray.camera_lane
                ));
            }
        }
        Ok(())
    }
}
