// SPDX-License-Identifier: MIT OR Apache-2.0
//! Camera lanes.

use crate::clip::{ClipId, TimelineClip};
use crate::error::{Result, TimelineError};
use crate::time::Millis;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Camera lane number (stable identity, starts at 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LaneNumber(pub u8);

impl LaneNumber {
    /// Whether the lane number is within `1..=max`
    pub fn in_range(self, max: u8) -> bool {
        self.0 >= 1 && self.0 <= max
    }
}

impl fmt::Display for LaneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One physical camera's track.
///
/// Clips are kept sorted by `lane_position_ms` and never overlap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraLane {
    /// Lane number
    pub lane: LaneNumber,
    /// Display name
    pub label: String,
    /// Fixed correction between this camera's recording clock and logical time
    pub sync_offset_ms: i64,
    clips: Vec<TimelineClip>,
}

impl CameraLane {
    /// Create an empty lane
    pub fn new(lane: LaneNumber, label: impl Into<String>) -> Self {
        Self {
            lane,
            label: label.into(),
            sync_offset_ms: 0,
            clips: Vec::new(),
        }
    }

    /// Set the sync offset
    pub fn with_sync_offset(mut self, sync_offset_ms: i64) -> Self {
        self.sync_offset_ms = sync_offset_ms;
        self
    }

    /// This camera's playhead at a logical time, clamped at 0
    pub fn lane_time_ms(&self, logical_ms: Millis) -> Millis {
        (logical_ms as i128 - self.sync_offset_ms as i128).clamp(0, Millis::MAX as i128) as Millis
    }

    /// Logical time of a playhead on this camera, clamped at 0
    pub fn logical_time_ms(&self, lane_time_ms: Millis) -> Millis {
        (lane_time_ms as i128 + self.sync_offset_ms as i128).clamp(0, Millis::MAX as i128) as Millis
    }

    /// Clips in position order
    pub fn clips(&self) -> &[TimelineClip] {
        &self.clips
    }

    /// Get a clip by ID
    pub fn clip(&self, clip_id: ClipId) -> Option<&TimelineClip> {
        self.clips.iter().find(|c| c.id == clip_id)
    }

    /// Whether the lane holds the clip
    pub fn contains_clip(&self, clip_id: ClipId) -> bool {
        self.clips.iter().any(|c| c.id == clip_id)
    }

    /// Number of clips
    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }

    /// Whether the lane has no clips
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// End of the last clip, or 0 for an empty lane
    pub fn end_ms(&self) -> Millis {
        self.clips.iter().map(TimelineClip::end_ms).max().unwrap_or(0)
    }

    /// Insert a clip, refusing any overlap
    pub fn insert_clip(&mut self, mut clip: TimelineClip) -> Result<()> {
        if let Some(existing) = self
            .clips
            .iter()
            .find(|c| c.id != clip.id && c.overlaps(clip.lane_position_ms, clip.duration_ms))
        {
            return Err(TimelineError::Overlap {
                clip: clip.id,
                existing: existing.id,
                lane: self.lane,
            });
        }

        clip.camera_lane = self.lane;
        self.clips.retain(|c| c.id != clip.id);
        self.clips.push(clip);
        self.sort_clips();
        Ok(())
    }

    /// Remove a clip
    pub fn remove_clip(&mut self, clip_id: ClipId) -> Option<TimelineClip> {
        let idx = self.clips.iter().position(|c| c.id == clip_id)?;
        Some(self.clips.remove(idx))
    }

    /// Reposition clips in bulk without validation; callers check the result
    pub(crate) fn set_positions(&mut self, moves: &[(ClipId, Millis)]) {
        for (clip_id, position) in moves {
            if let Some(clip) = self.clips.iter_mut().find(|c| c.id == *clip_id) {
                clip.lane_position_ms = *position;
            }
        }
        self.sort_clips();
    }

    /// First pair of overlapping clips, if any
    pub fn find_overlap(&self) -> Option<(&TimelineClip, &TimelineClip)> {
        self.clips
            .windows(2)
            .find(|pair| pair[1].lane_position_ms < pair[0].end_ms())
            .map(|pair| (&pair[0], &pair[1]))
    }

    fn sort_clips(&mut self) {
        self.clips.sort_by_key(|c| (c.lane_position_ms, c.id));
    }
}
