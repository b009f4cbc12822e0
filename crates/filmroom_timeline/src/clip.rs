// SPDX-License-Identifier: MIT OR Apache-2.0
//! Clips placed on camera lanes.

use crate::lane::LaneNumber;
use crate::time::Millis;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a placed clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClipId(pub Uuid);

impl ClipId {
    /// Create a new random clip ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClipId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an externally-owned media asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoId(pub Uuid);

impl VideoId {
    /// Create a new random video ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One placed segment of source video.
///
/// The clip occupies the half-open interval
/// `[lane_position_ms, lane_position_ms + duration_ms)` on its lane.
/// The duration comes from the source media and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineClip {
    /// Unique clip ID
    pub id: ClipId,
    /// Source media
    pub video_id: VideoId,
    /// Lane the clip currently sits on
    pub camera_lane: LaneNumber,
    /// Logical start time within the lane
    pub lane_position_ms: Millis,
    /// Duration of the source media
    pub duration_ms: Millis,
    /// Display label
    pub label: String,
}

impl TimelineClip {
    /// Create a new clip
    pub fn new(
        video_id: VideoId,
        camera_lane: LaneNumber,
        lane_position_ms: Millis,
        duration_ms: Millis,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id: ClipId::new(),
            video_id,
            camera_lane,
            lane_position_ms,
            duration_ms,
            label: label.into(),
        }
    }

    /// Exclusive end of the clip
    pub fn end_ms(&self) -> Millis {
        self.lane_position_ms + self.duration_ms
    }

    /// Whether the logical time falls inside the clip
    pub fn contains(&self, time_ms: Millis) -> bool {
        time_ms >= self.lane_position_ms && time_ms < self.end_ms()
    }

    /// Strict interval overlap test; touching clips do not overlap
    pub fn overlaps(&self, position_ms: Millis, duration_ms: Millis) -> bool {
        position_ms < self.end_ms() && position_ms + duration_ms > self.lane_position_ms
    }

    /// Center of the clip, in milliseconds (may be fractional)
    pub fn center_ms(&self) -> f64 {
        self.lane_position_ms as f64 + self.duration_ms as f64 / 2.0
    }

    /// Name used in human-readable messages
    pub fn display_name(&self) -> String {
        if self.label.is_empty() {
            format!("clip {}", self.id)
        } else {
            format!("\"{}\"", self.label)
        }
    }
}
