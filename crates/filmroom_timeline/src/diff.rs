// SPDX-License-Identifier: MIT OR Apache-2.0
//! Snapshot diffing.
//!
//! Turns the difference between two timeline snapshots into the writes the
//! persistence collaborator needs. Output order is fixed: removals, lane
//! saves, placements, additions, markers. A clip that changed lanes is
//! removed and re-added.

use crate::clip::TimelineClip;
use crate::persistence::PersistOp;
use crate::timeline::GameTimeline;

/// Counts of changed entities
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Clips created
    pub added: usize,
    /// Clips deleted
    pub removed: usize,
    /// Clips repositioned in place
    pub moved: usize,
    /// Lanes created, updated or deleted
    pub lanes: usize,
}

impl DiffSummary {
    /// Summarize a list of operations
    pub fn of(ops: &[PersistOp]) -> Self {
        let mut summary = Self::default();
        for op in ops {
            match op {
                PersistOp::AddClip { .. } => summary.added += 1,
                PersistOp::RemoveClip { .. } => summary.removed += 1,
                PersistOp::SaveClipPlacement { .. } => summary.moved += 1,
                PersistOp::SaveLane { .. } | PersistOp::RemoveLane { .. } => summary.lanes += 1,
                PersistOp::SaveMarkers { .. } | PersistOp::SaveSelections { .. } => {}
            }
        }
        summary
    }
}

/// Compute the writes that turn `old` into `new`
pub fn diff_timelines(old: &GameTimeline, new: &GameTimeline) -> Vec<PersistOp> {
    let mut removals = Vec::new();
    let mut lane_removals = Vec::new();
    let mut lane_saves = Vec::new();
    let mut placements = Vec::new();
    let mut additions = Vec::new();

    for old_lane in old.lanes() {
        if new.lane(old_lane.lane).is_none() {
            lane_removals.push(PersistOp::RemoveLane { lane: old_lane.lane });
            continue;
        }
        for clip in old_lane.clips() {
            let kept = new
                .find_clip(clip.id)
                .is_some_and(|current| same_identity(clip, current));
            if !kept {
                removals.push(PersistOp::RemoveClip { clip_id: clip.id });
            }
        }
    }

    for lane in new.lanes() {
        let changed = old
            .lane(lane.lane)
            .map_or(true, |before| before.label != lane.label || before.sync_offset_ms != lane.sync_offset_ms);
        if changed {
            lane_saves.push(PersistOp::SaveLane {
                lane: lane.lane,
                label: lane.label.clone(),
                sync_offset_ms: lane.sync_offset_ms,
            });
        }

        for clip in lane.clips() {
            match old.find_clip(clip.id) {
                Some(before) if same_identity(before, clip) => {
                    if before.lane_position_ms != clip.lane_position_ms {
                        placements.push(PersistOp::SaveClipPlacement {
                            lane: lane.lane,
                            clip_id: clip.id,
                            position_ms: clip.lane_position_ms,
                        });
                    }
                }
                _ => additions.push(PersistOp::AddClip {
                    lane: lane.lane,
                    clip: clip.clone(),
                }),
            }
        }
    }

    let mut ops = removals;
    ops.extend(lane_removals);
    ops.extend(lane_saves);
    ops.extend(placements);
    ops.extend(additions);
    if old.markers() != new.markers() {
        ops.push(PersistOp::SaveMarkers {
            markers: new.markers().to_vec(),
        });
    }
    ops
}

/// Same clip on the same lane with the same media; only the position may differ
fn same_identity(a: &TimelineClip, b: &TimelineClip) -> bool {
    a.id == b.id
        && a.camera_lane == b.camera_lane
        && a.video_id == b.video_id
        && a.duration_ms == b.duration_ms
        && a.label == b.label
}
