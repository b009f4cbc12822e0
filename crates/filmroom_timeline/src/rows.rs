// SPDX-License-Identifier: MIT OR Apache-2.0
//! Persisted layout.
//!
//! Flat rows with the minimum fields needed to rebuild a [`GameTimeline`]
//! and its Director's Cut exactly: one row per clip, per lane, per marker
//! and per camera selection.

use crate::clip::{ClipId, TimelineClip, VideoId};
use crate::directors_cut::{CameraSelection, DirectorsCut};
use crate::error::Result;
use crate::lane::{CameraLane, LaneNumber};
use crate::time::Millis;
use crate::timeline::{GameId, GameTimeline, MarkerId, PhaseMarker, TeamId};
use serde::{Deserialize, Serialize};

/// One placed clip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipRow {
    /// Owning team
    pub team: TeamId,
    /// Game
    pub game: GameId,
    /// Clip ID
    pub clip_id: ClipId,
    /// Source media
    pub video_id: VideoId,
    /// Lane number
    pub camera_lane: u8,
    /// Logical start
    pub lane_position_ms: Millis,
    /// Media duration
    pub duration_ms: Millis,
    /// Display label
    pub label: String,
}

impl ClipRow {
    /// Row for a clip of `game`
    pub fn from_clip(team: TeamId, game: GameId, clip: &TimelineClip) -> Self {
        Self {
            team,
            game,
            clip_id: clip.id,
            video_id: clip.video_id,
            camera_lane: clip.camera_lane.0,
            lane_position_ms: clip.lane_position_ms,
            duration_ms: clip.duration_ms,
            label: clip.label.clone(),
        }
    }

    /// Rebuild the clip
    pub fn to_clip(&self) -> TimelineClip {
        TimelineClip {
            id: self.clip_id,
            video_id: self.video_id,
            camera_lane: LaneNumber(self.camera_lane),
            lane_position_ms: self.lane_position_ms,
            duration_ms: self.duration_ms,
            label: self.label.clone(),
        }
    }
}

/// One camera lane (without its clips)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneRow {
    /// Game
    pub game: GameId,
    /// Lane number
    pub lane: u8,
    /// Display name
    pub label: String,
    /// Fixed sync offset
    pub sync_offset_ms: i64,
}

/// One phase marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerRow {
    /// Game
    pub game: GameId,
    /// Marker ID
    pub marker_id: MarkerId,
    /// Logical time
    pub time_ms: Millis,
    /// Marker text
    pub label: String,
}

/// One Director's Cut selection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionRow {
    /// Lane number of the live camera
    pub camera_id: u8,
    /// Logical start in seconds
    pub start_seconds: f64,
    /// Logical end in seconds; `None` if still live when recording stopped
    pub end_seconds: Option<f64>,
}

impl From<&CameraSelection> for SelectionRow {
    fn from(selection: &CameraSelection) -> Self {
        Self {
            camera_id: selection.camera_id.0,
            start_seconds: selection.start_seconds,
            end_seconds: selection.end_seconds,
        }
    }
}

impl From<&SelectionRow> for CameraSelection {
    fn from(row: &SelectionRow) -> Self {
        Self {
            camera_id: LaneNumber(row.camera_id),
            start_seconds: row.start_seconds,
            end_seconds: row.end_seconds,
        }
    }
}

/// All rows for one game's timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineRows {
    /// Owning team
    pub team: TeamId,
    /// Game
    pub game: GameId,
    /// Lane rows
    pub lanes: Vec<LaneRow>,
    /// Clip rows
    pub clips: Vec<ClipRow>,
    /// Marker rows
    pub markers: Vec<MarkerRow>,
}

impl TimelineRows {
    /// No rows for a game yet
    pub fn empty(team: TeamId, game: GameId) -> Self {
        Self {
            team,
            game,
            lanes: Vec::new(),
            clips: Vec::new(),
            markers: Vec::new(),
        }
    }

    /// Move a clip row to a lane and position
    pub fn set_clip_placement(&mut self, lane: LaneNumber, clip_id: ClipId, position_ms: Millis) {
        if let Some(row) = self.clips.iter_mut().find(|r| r.clip_id == clip_id) {
            row.camera_lane = lane.0;
            row.lane_position_ms = position_ms;
        }
    }

    /// Insert or replace a clip row
    pub fn upsert_clip(&mut self, lane: LaneNumber, clip: &TimelineClip) {
        let mut row = ClipRow::from_clip(self.team, self.game, clip);
        row.camera_lane = lane.0;
        self.clips.retain(|r| r.clip_id != clip.id);
        self.clips.push(row);
    }

    /// Delete a clip row
    pub fn remove_clip(&mut self, clip_id: ClipId) {
        self.clips.retain(|r| r.clip_id != clip_id);
    }

    /// Insert or replace a lane row
    pub fn upsert_lane(&mut self, lane: LaneNumber, label: &str, sync_offset_ms: i64) {
        let row = LaneRow {
            game: self.game,
            lane: lane.0,
            label: label.to_string(),
            sync_offset_ms,
        };
        match self.lanes.iter_mut().find(|r| r.lane == lane.0) {
            Some(existing) => *existing = row,
            None => self.lanes.push(row),
        }
    }

    /// Delete a lane row and its clip rows
    pub fn remove_lane(&mut self, lane: LaneNumber) {
        self.lanes.retain(|r| r.lane != lane.0);
        self.clips.retain(|r| r.camera_lane != lane.0);
    }

    /// Replace all marker rows
    pub fn set_markers(&mut self, markers: &[PhaseMarker]) {
        let game = self.game;
        self.markers = markers
            .iter()
            .map(|m| MarkerRow {
                game,
                marker_id: m.id,
                time_ms: m.time_ms,
                label: m.label.clone(),
            })
            .collect();
    }
}

impl GameTimeline {
    /// Flatten into persisted rows
    pub fn to_rows(&self) -> TimelineRows {
        TimelineRows {
            team: self.team,
            game: self.id,
            lanes: self
                .lanes()
                .map(|lane| LaneRow {
                    game: self.id,
                    lane: lane.lane.0,
                    label: lane.label.clone(),
                    sync_offset_ms: lane.sync_offset_ms,
                })
                .collect(),
            clips: self
                .clips()
                .map(|clip| ClipRow::from_clip(self.team, self.id, clip))
                .collect(),
            markers: self
                .markers()
                .iter()
                .map(|m| MarkerRow {
                    game: self.id,
                    marker_id: m.id,
                    time_ms: m.time_ms,
                    label: m.label.clone(),
                })
                .collect(),
        }
    }

    /// Rebuild a timeline from rows.
    ///
    /// Clip rows whose lane has no lane row get a default lane. Rows that
    /// would break the no-overlap invariant are refused.
    pub fn from_rows(rows: &TimelineRows) -> Result<Self> {
        let mut timeline = GameTimeline::new(rows.game, rows.team);

        for row in &rows.lanes {
            let lane = CameraLane::new(LaneNumber(row.lane), row.label.clone()).with_sync_offset(row.sync_offset_ms);
            timeline.add_lane(lane, u8::MAX)?;
        }

        for row in &rows.clips {
            let number = LaneNumber(row.camera_lane);
            if timeline.lane(number).is_none() {
                timeline.add_lane(CameraLane::new(number, format!("Camera {number}")), u8::MAX)?;
            }
            timeline.insert_clip(row.to_clip())?;
        }

        for row in &rows.markers {
            timeline.insert_marker(PhaseMarker {
                id: row.marker_id,
                time_ms: row.time_ms,
                label: row.label.clone(),
            });
        }

        Ok(timeline)
    }
}

impl DirectorsCut {
    /// Flatten into persisted rows
    pub fn to_rows(&self) -> Vec<SelectionRow> {
        self.selections().iter().map(SelectionRow::from).collect()
    }

    /// Rebuild a script from rows
    pub fn from_rows(rows: &[SelectionRow]) -> Self {
        Self::new(rows.iter().map(CameraSelection::from).collect())
    }
}
