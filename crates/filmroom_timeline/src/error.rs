// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for timeline operations.
//!
//! Overlaps, gaps and superseded switches are ordinary outcomes and are
//! reported through return values (`ShiftPlan::valid`, `ActiveClip::Gap`,
//! ignored switch tickets). Only conditions a caller cannot anticipate from
//! user interaction become errors here.

use crate::clip::{ClipId, VideoId};
use crate::lane::LaneNumber;
use thiserror::Error;

/// Timeline errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TimelineError {
    /// A shift plan was rejected; nothing was mutated
    #[error("Invalid placement: {reason}")]
    InvalidPlacement {
        /// Human-readable reason naming the offending clip
        reason: String,
    },

    /// The media asset has no known duration (or a zero duration)
    #[error("Missing media: no duration known for video {0}")]
    MissingMedia(VideoId),

    /// Lane number is zero or above the configured camera ceiling
    #[error("Lane {lane} is out of range (1..={max})")]
    LaneOutOfRange {
        /// Requested lane
        lane: LaneNumber,
        /// Configured maximum
        max: u8,
    },

    /// Lane already exists
    #[error("Lane {0} already exists")]
    DuplicateLane(LaneNumber),

    /// Lane does not exist
    #[error("Lane {0} not found")]
    LaneNotFound(LaneNumber),

    /// Clip does not exist
    #[error("Clip {0} not found")]
    ClipNotFound(ClipId),

    /// A direct insert would break the no-overlap invariant
    #[error("Clip {clip} overlaps clip {existing} on lane {lane}")]
    Overlap {
        /// Clip being inserted
        clip: ClipId,
        /// Clip already on the lane
        existing: ClipId,
        /// Lane number
        lane: LaneNumber,
    },
}

/// Result type for timeline operations
pub type Result<T> = std::result::Result<T, TimelineError>;
