// SPDX-License-Identifier: MIT OR Apache-2.0
//! Active-clip and coverage-gap resolution.

use crate::clip::TimelineClip;
use crate::lane::CameraLane;
use crate::time::{format_clock, Millis};

/// What a lane shows at a logical time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveClip<'a> {
    /// A clip covers the time
    Clip {
        /// The covering clip
        clip: &'a TimelineClip,
        /// Offset to seek the source video to
        clip_relative_time_ms: Millis,
    },
    /// No footage at this time
    Gap {
        /// Start of the next clip after the time; `None` at end of coverage
        next_clip_start_ms: Option<Millis>,
    },
}

impl<'a> ActiveClip<'a> {
    /// Whether the time falls in a coverage gap
    pub fn is_in_gap(&self) -> bool {
        matches!(self, Self::Gap { .. })
    }

    /// The covering clip, if any
    pub fn clip(&self) -> Option<&'a TimelineClip> {
        match self {
            Self::Clip { clip, .. } => Some(*clip),
            Self::Gap { .. } => None,
        }
    }

    /// Seek offset into the covering clip
    pub fn clip_relative_time_ms(&self) -> Option<Millis> {
        match self {
            Self::Clip { clip_relative_time_ms, .. } => Some(*clip_relative_time_ms),
            Self::Gap { .. } => None,
        }
    }

    /// Where coverage resumes, when in a gap
    pub fn next_clip_start_ms(&self) -> Option<Millis> {
        match self {
            Self::Gap { next_clip_start_ms } => *next_clip_start_ms,
            Self::Clip { .. } => None,
        }
    }

    /// Text for the "no footage" overlay
    pub fn gap_message(&self) -> Option<String> {
        match self {
            Self::Clip { .. } => None,
            Self::Gap { next_clip_start_ms: Some(next) } => {
                Some(format!("No footage for this camera, resumes at {}", format_clock(*next)))
            }
            Self::Gap { next_clip_start_ms: None } => Some("No more footage for this camera".to_string()),
        }
    }
}

/// Resolve the clip active on a lane at a logical time
pub fn resolve_active_clip(lane: &CameraLane, time_ms: Millis) -> ActiveClip<'_> {
    if let Some(clip) = lane.clips().iter().find(|c| c.contains(time_ms)) {
        return ActiveClip::Clip {
            clip,
            clip_relative_time_ms: time_ms - clip.lane_position_ms,
        };
    }

    let next_clip_start_ms = lane
        .clips()
        .iter()
        .map(|c| c.lane_position_ms)
        .filter(|&start| start > time_ms)
        .min();
    ActiveClip::Gap { next_clip_start_ms }
}

/// Nearest covered instant to a time on the lane.
///
/// Returns the time itself when covered. Otherwise compares the next clip's
/// start with the last covered millisecond of the previous clip; ties go to
/// the next clip. `None` when the lane has no clips.
pub fn nearest_covered_time(lane: &CameraLane, time_ms: Millis) -> Option<Millis> {
    if lane.clips().iter().any(|c| c.contains(time_ms)) {
        return Some(time_ms);
    }

    let next = lane
        .clips()
        .iter()
        .map(|c| c.lane_position_ms)
        .filter(|&start| start > time_ms)
        .min();
    let previous = lane
        .clips()
        .iter()
        .filter(|c| c.duration_ms > 0 && c.end_ms() <= time_ms)
        .map(|c| c.end_ms() - 1)
        .max();

    match (previous, next) {
        (Some(prev), Some(next)) => {
            if next - time_ms <= time_ms - prev {
                Some(next)
            } else {
                Some(prev)
            }
        }
        (Some(t), None) | (None, Some(t)) => Some(t),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::VideoId;
    use crate::lane::LaneNumber;

    fn gapped_lane() -> CameraLane {
        let mut lane = CameraLane::new(LaneNumber(1), "Press box");
        lane.insert_clip(TimelineClip::new(VideoId::new(), LaneNumber(1), 0, 10, "first")).unwrap();
        lane.insert_clip(TimelineClip::new(VideoId::new(), LaneNumber(1), 20, 10, "second")).unwrap();
        lane
    }

    #[test]
    fn test_gap_detection() {
        let lane = gapped_lane();

        let inside = resolve_active_clip(&lane, 5);
        assert!(!inside.is_in_gap());
        assert_eq!(inside.clip().map(|c| c.label.as_str()), Some("first"));
        assert_eq!(inside.clip_relative_time_ms(), Some(5));

        let gap = resolve_active_clip(&lane, 15);
        assert!(gap.is_in_gap());
        assert_eq!(gap.next_clip_start_ms(), Some(20));

        let past_end = resolve_active_clip(&lane, 35);
        assert!(past_end.is_in_gap());
        assert_eq!(past_end.next_clip_start_ms(), None);
    }

    #[test]
    fn test_clip_boundaries() {
        let lane = gapped_lane();
        // End is exclusive
        assert!(resolve_active_clip(&lane, 10).is_in_gap());
        let start = resolve_active_clip(&lane, 20);
        assert_eq!(start.clip().map(|c| c.label.as_str()), Some("second"));
        assert_eq!(start.clip_relative_time_ms(), Some(0));
    }

    #[test]
    fn test_empty_lane_is_all_gap() {
        let lane = CameraLane::new(LaneNumber(2), "");
        let result = resolve_active_clip(&lane, 0);
        assert_eq!(result, ActiveClip::Gap { next_clip_start_ms: None });
        assert_eq!(nearest_covered_time(&lane, 0), None);
    }

    #[test]
    fn test_gap_message() {
        let mut lane = CameraLane::new(LaneNumber(1), "");
        lane.insert_clip(TimelineClip::new(VideoId::new(), LaneNumber(1), 95_000, 1000, "")).unwrap();
        assert_eq!(
            resolve_active_clip(&lane, 0).gap_message().as_deref(),
            Some("No footage for this camera, resumes at 1:35")
        );
        assert_eq!(resolve_active_clip(&lane, 95_500).gap_message(), None);
    }

    #[test]
    fn test_nearest_covered_time() {
        let lane = gapped_lane();
        assert_eq!(nearest_covered_time(&lane, 5), Some(5));
        // Gap [10,20): last covered ms is 9
        assert_eq!(nearest_covered_time(&lane, 12), Some(9));
        assert_eq!(nearest_covered_time(&lane, 16), Some(20));
        assert_eq!(nearest_covered_time(&lane, 15), Some(20));
        assert_eq!(nearest_covered_time(&lane, 100), Some(29));
    }
}
