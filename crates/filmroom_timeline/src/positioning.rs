// SPDX-License-Identifier: MIT OR Apache-2.0
//! Clip positioning engine.
//!
//! Pure functions over a [`CameraLane`] snapshot: overlap detection, shift
//! planning for drops, and nearest-free-slot search. Nothing here mutates the
//! lane; callers apply a returned [`ShiftPlan`] with
//! [`GameTimeline::apply_shift_plan`](crate::timeline::GameTimeline::apply_shift_plan).
//!
//! ## Shift direction
//!
//! Overlapped clips are pushed right by default. They are pulled left instead
//! when the drop's center lies right of the first overlapped clip's center and
//! the overlapped clips fit before the drop without crossing zero. This is a
//! drag-feel heuristic kept for compatibility, not an optimality guarantee.
//! The feasibility test only looks at the overlapped clips, so a left shift
//! can still be rejected once it cascades into earlier neighbours.

use crate::clip::{ClipId, TimelineClip};
use crate::lane::CameraLane;
use crate::time::{snap_down, snap_to_grid, snap_up, Millis};
use serde::{Deserialize, Serialize};

/// Direction existing clips move to make room for a drop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShiftDirection {
    /// Nothing overlaps; no shift needed
    #[default]
    None,
    /// Push overlapped clips earlier
    Left,
    /// Push overlapped clips later
    Right,
}

/// One clip move inside a shift plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftInstruction {
    /// Clip being moved
    pub clip_id: ClipId,
    /// Position before the shift
    pub current_position_ms: Millis,
    /// Position after the shift (on the grid)
    pub new_position_ms: Millis,
    /// Clip duration (unchanged by the shift)
    pub duration_ms: Millis,
}

/// Result of shift planning for a proposed drop
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShiftPlan {
    /// Chosen direction
    pub direction: ShiftDirection,
    /// Moves in walk order
    pub affected_clips: Vec<ShiftInstruction>,
    /// Whether the plan may be applied
    pub valid: bool,
    /// Why the plan was rejected
    pub reason: Option<String>,
}

impl ShiftPlan {
    fn none() -> Self {
        Self {
            direction: ShiftDirection::None,
            affected_clips: Vec::new(),
            valid: true,
            reason: None,
        }
    }

    fn rejected(direction: ShiftDirection, affected_clips: Vec<ShiftInstruction>, reason: String) -> Self {
        Self {
            direction,
            affected_clips,
            valid: false,
            reason: Some(reason),
        }
    }

    /// Whether the plan moves any clip
    pub fn is_noop(&self) -> bool {
        self.affected_clips.is_empty()
    }

    /// New position for a clip, if the plan moves it
    pub fn new_position_of(&self, clip_id: ClipId) -> Option<Millis> {
        self.affected_clips
            .iter()
            .find(|s| s.clip_id == clip_id)
            .map(|s| s.new_position_ms)
    }
}

/// Default landing spot for a new clip: the end of the last clip, or 0.
pub fn next_available_position(lane: &CameraLane) -> Millis {
    lane_end_excluding(lane, None)
}

/// Clips whose interval overlaps `[position, position + duration)`, in
/// position order. Touching intervals do not overlap.
pub fn find_overlapping(
    lane: &CameraLane,
    position_ms: Millis,
    duration_ms: Millis,
    exclude: Option<ClipId>,
) -> Vec<&TimelineClip> {
    lane.clips()
        .iter()
        .filter(|c| Some(c.id) != exclude)
        .filter(|c| c.overlaps(position_ms, duration_ms))
        .collect()
}

/// Whether a clip could be placed without overlapping anything
pub fn is_position_valid(
    lane: &CameraLane,
    position_ms: Millis,
    duration_ms: Millis,
    exclude: Option<ClipId>,
) -> bool {
    find_overlapping(lane, position_ms, duration_ms, exclude).is_empty()
}

/// Compute the moves that make room for a clip dropped at `drop_position_ms`.
///
/// The returned instructions are in walk order: ascending position for a
/// right shift, descending for a left shift. An invalid plan keeps the moves
/// computed before the failure so they can be previewed, and must not be
/// applied.
pub fn calculate_shift_plan(
    lane: &CameraLane,
    drop_position_ms: Millis,
    dropped_duration_ms: Millis,
    exclude: Option<ClipId>,
    grid_ms: Millis,
) -> ShiftPlan {
    let overlapping = find_overlapping(lane, drop_position_ms, dropped_duration_ms, exclude);
    let Some(first) = overlapping.first() else {
        return ShiftPlan::none();
    };

    let drop_end = drop_position_ms + dropped_duration_ms;
    let drop_center = drop_position_ms as f64 + dropped_duration_ms as f64 / 2.0;

    let left_fits = left_shift_fits(&overlapping, drop_position_ms, drop_end, grid_ms);
    let plan = if left_fits && drop_center > first.center_ms() {
        plan_left_shift(lane, &overlapping, drop_position_ms, drop_end, exclude, grid_ms)
    } else {
        plan_right_shift(lane, &overlapping, drop_position_ms, drop_end, exclude, grid_ms)
    };

    if plan.valid {
        tracing::debug!(
            "Shift plan on lane {}: {:?}, {} clip(s) moved",
            lane.lane,
            plan.direction,
            plan.affected_clips.len()
        );
    } else {
        tracing::debug!("Shift plan on lane {} rejected: {:?}", lane.lane, plan.reason);
    }
    plan
}

/// Nearest position where the clip fits.
///
/// A valid target is returned snapped and floored at zero. Otherwise the gap
/// between clips whose start is closest to the target wins, and when no gap
/// is large enough the clip goes to the end of the lane.
pub fn find_closest_valid_position(
    lane: &CameraLane,
    target_position_ms: i64,
    duration_ms: Millis,
    exclude: Option<ClipId>,
    grid_ms: Millis,
) -> Millis {
    let target = target_position_ms.max(0) as Millis;
    let snapped = snap_to_grid(target, grid_ms);
    if is_position_valid(lane, snapped, duration_ms, exclude) {
        return snapped;
    }

    let mut best: Option<(Millis, Millis)> = None;
    let mut cursor: Millis = 0;
    for clip in lane.clips().iter().filter(|c| Some(c.id) != exclude) {
        if clip.lane_position_ms > cursor {
            let start = snap_up(cursor, grid_ms);
            if start + duration_ms <= clip.lane_position_ms {
                let distance = start.abs_diff(target);
                if best.map_or(true, |(_, d)| distance < d) {
                    best = Some((start, distance));
                }
            }
        }
        cursor = cursor.max(clip.end_ms());
    }

    match best {
        Some((start, _)) => start,
        None => lane_end_excluding(lane, exclude),
    }
}

fn lane_end_excluding(lane: &CameraLane, exclude: Option<ClipId>) -> Millis {
    lane.clips()
        .iter()
        .filter(|c| Some(c.id) != exclude)
        .map(TimelineClip::end_ms)
        .max()
        .unwrap_or(0)
}

/// Whether the overlapped clips alone could be stacked before the drop
fn left_shift_fits(overlapping: &[&TimelineClip], drop_start: Millis, drop_end: Millis, grid_ms: Millis) -> bool {
    if overlapping.iter().any(|c| c.end_ms() > drop_end) {
        return false;
    }

    let mut boundary = drop_start as i64;
    for clip in overlapping.iter().rev() {
        let position = snap_down(boundary - clip.duration_ms as i64, grid_ms);
        if position < 0 {
            return false;
        }
        boundary = position;
    }
    true
}

fn plan_right_shift(
    lane: &CameraLane,
    overlapping: &[&TimelineClip],
    drop_start: Millis,
    drop_end: Millis,
    exclude: Option<ClipId>,
    grid_ms: Millis,
) -> ShiftPlan {
    let mut moves = Vec::new();
    let mut boundary = drop_end;
    for clip in lane
        .clips()
        .iter()
        .filter(|c| Some(c.id) != exclude && c.lane_position_ms >= drop_start)
    {
        if clip.lane_position_ms >= boundary {
            break;
        }
        let position = snap_up(boundary, grid_ms);
        moves.push(ShiftInstruction {
            clip_id: clip.id,
            current_position_ms: clip.lane_position_ms,
            new_position_ms: position,
            duration_ms: clip.duration_ms,
        });
        boundary = position + clip.duration_ms;
    }

    // A clip that starts before the drop would have to jump over it
    if let Some(straddler) = overlapping.iter().find(|c| c.lane_position_ms < drop_start) {
        let reason = format!(
            "{} starts at {}ms, before the drop at {}ms, and cannot be shifted right",
            straddler.display_name(),
            straddler.lane_position_ms,
            drop_start
        );
        return ShiftPlan::rejected(ShiftDirection::Right, moves, reason);
    }

    ShiftPlan {
        direction: ShiftDirection::Right,
        affected_clips: moves,
        valid: true,
        reason: None,
    }
}

fn plan_left_shift(
    lane: &CameraLane,
    overlapping: &[&TimelineClip],
    drop_start: Millis,
    drop_end: Millis,
    exclude: Option<ClipId>,
    grid_ms: Millis,
) -> ShiftPlan {
    let mut moves = Vec::new();
    let mut boundary = drop_start as i64;
    for clip in lane
        .clips()
        .iter()
        .rev()
        .filter(|c| Some(c.id) != exclude && c.end_ms() <= drop_end)
    {
        if (clip.end_ms() as i64) <= boundary {
            break;
        }
        let position = snap_down(boundary - clip.duration_ms as i64, grid_ms);
        if position < 0 {
            let reason = format!(
                "shifting left would move {} to {}ms, before the start of the game",
                clip.display_name(),
                position
            );
            return ShiftPlan::rejected(ShiftDirection::Left, moves, reason);
        }
        moves.push(ShiftInstruction {
            clip_id: clip.id,
            current_position_ms: clip.lane_position_ms,
            new_position_ms: position as Millis,
            duration_ms: clip.duration_ms,
        });
        boundary = position;
    }

    if let Some(straddler) = overlapping.iter().find(|c| c.end_ms() > drop_end) {
        let reason = format!(
            "{} ends after the drop and cannot be shifted left",
            straddler.display_name()
        );
        return ShiftPlan::rejected(ShiftDirection::Left, moves, reason);
    }

    ShiftPlan {
        direction: ShiftDirection::Left,
        affected_clips: moves,
        valid: true,
        reason: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::VideoId;
    use crate::lane::LaneNumber;

    const GRID: Millis = 100;

    fn lane_with(clips: &[(Millis, Millis, &str)]) -> (CameraLane, Vec<ClipId>) {
        let mut lane = CameraLane::new(LaneNumber(1), "Sideline");
        let mut ids = Vec::new();
        for (position, duration, label) in clips {
            let clip = TimelineClip::new(VideoId::new(), LaneNumber(1), *position, *duration, *label);
            ids.push(clip.id);
            lane.insert_clip(clip).unwrap();
        }
        (lane, ids)
    }

    fn apply(lane: &mut CameraLane, plan: &ShiftPlan) {
        assert!(plan.valid, "plan should be valid: {:?}", plan.reason);
        let moves: Vec<_> = plan
            .affected_clips
            .iter()
            .map(|s| (s.clip_id, s.new_position_ms))
            .collect();
        lane.set_positions(&moves);
    }

    #[test]
    fn test_next_available_position() {
        let (mut lane, _) = lane_with(&[]);
        assert_eq!(next_available_position(&lane), 0);

        lane.insert_clip(TimelineClip::new(VideoId::new(), LaneNumber(1), 0, 1234, "")).unwrap();
        let first = next_available_position(&lane);
        assert_eq!(first, 1234);
        assert_eq!(next_available_position(&lane), first);

        let appended = TimelineClip::new(VideoId::new(), LaneNumber(1), first, 4321, "");
        lane.insert_clip(appended).unwrap();
        assert_eq!(next_available_position(&lane), first + 4321);
    }

    #[test]
    fn test_find_overlapping_is_strict() {
        let (lane, ids) = lane_with(&[(0, 1000, "A"), (2000, 1000, "B")]);

        assert!(find_overlapping(&lane, 1000, 1000, None).is_empty());
        assert!(is_position_valid(&lane, 1000, 1000, None));

        let hits: Vec<_> = find_overlapping(&lane, 999, 1002, None).iter().map(|c| c.id).collect();
        assert_eq!(hits, vec![ids[0], ids[1]]);

        assert!(is_position_valid(&lane, 100, 500, Some(ids[0])));
        assert!(!is_position_valid(&lane, 100, 500, Some(ids[1])));
    }

    #[test]
    fn test_no_overlap_gives_empty_plan() {
        let (lane, _) = lane_with(&[(0, 1000, "A")]);
        let plan = calculate_shift_plan(&lane, 1000, 500, None, GRID);
        assert_eq!(plan.direction, ShiftDirection::None);
        assert!(plan.valid);
        assert!(plan.is_noop());
    }

    #[test]
    fn test_drop_inside_tail_of_first_clip() {
        // The cross-implementation reference case: clips [0,10) and [10,20)
        // in hundreds, a 5-unit clip dropped at 8. B moves to 13 and the plan
        // is rejected because A straddles the drop start.
        let (lane, ids) = lane_with(&[(0, 1000, "A"), (1000, 1000, "B")]);
        let plan = calculate_shift_plan(&lane, 800, 500, None, GRID);

        assert_eq!(plan.direction, ShiftDirection::Right);
        assert_eq!(
            plan.affected_clips,
            vec![ShiftInstruction {
                clip_id: ids[1],
                current_position_ms: 1000,
                new_position_ms: 1300,
                duration_ms: 1000,
            }]
        );
        assert_eq!(plan.new_position_of(ids[0]), None);
        // "A" still covers [8,10), so the drop cannot land there
        assert!(!plan.valid);
        assert!(plan.reason.as_deref().unwrap_or_default().contains("\"A\""));
    }

    #[test]
    fn test_right_shift_cascades() {
        let (mut lane, ids) = lane_with(&[(1000, 1000, "A"), (2000, 1000, "B"), (5000, 1000, "C")]);
        let plan = calculate_shift_plan(&lane, 500, 1000, None, GRID);

        assert!(plan.valid);
        assert_eq!(plan.direction, ShiftDirection::Right);
        assert_eq!(plan.new_position_of(ids[0]), Some(1500));
        assert_eq!(plan.new_position_of(ids[1]), Some(2500));
        assert_eq!(plan.new_position_of(ids[2]), None);

        apply(&mut lane, &plan);
        lane.insert_clip(TimelineClip::new(VideoId::new(), LaneNumber(1), 500, 1000, "drop")).unwrap();
        assert!(lane.find_overlap().is_none());
    }

    #[test]
    fn test_left_shift_when_dropping_after_center() {
        let (lane, ids) = lane_with(&[(0, 1000, "A"), (3000, 1000, "B")]);
        let plan = calculate_shift_plan(&lane, 3500, 1000, None, GRID);

        assert!(plan.valid);
        assert_eq!(plan.direction, ShiftDirection::Left);
        assert_eq!(plan.affected_clips.len(), 1);
        assert_eq!(plan.new_position_of(ids[1]), Some(2500));
    }

    #[test]
    fn test_left_shift_rejected_before_zero() {
        // [0,5) and [5,10); a drop at 7 pulls B to 2 and would push A to -3.
        let (lane, ids) = lane_with(&[(0, 500, "A"), (500, 500, "B")]);
        let before = lane.clone();
        let plan = calculate_shift_plan(&lane, 700, 500, None, GRID);

        assert_eq!(plan.direction, ShiftDirection::Left);
        assert!(!plan.valid);
        let reason = plan.reason.clone().unwrap_or_default();
        assert!(reason.contains("\"A\""), "{reason}");
        assert!(reason.contains("-300"), "{reason}");
        assert_eq!(plan.new_position_of(ids[1]), Some(200));
        assert_eq!(plan.new_position_of(ids[0]), None);
        assert_eq!(lane, before);
    }

    #[test]
    fn test_left_infeasible_falls_back_to_right() {
        // Dropping past B's center, but B cannot fit before the drop
        let (lane, ids) = lane_with(&[(200, 1000, "B")]);
        let plan = calculate_shift_plan(&lane, 600, 1000, None, GRID);
        assert_eq!(plan.direction, ShiftDirection::Right);
        assert!(!plan.valid);
        assert!(plan.new_position_of(ids[0]).is_none());
    }

    #[test]
    fn test_shift_positions_land_on_grid() {
        let (lane, ids) = lane_with(&[(1000, 777, "A"), (1777, 500, "B")]);
        let plan = calculate_shift_plan(&lane, 950, 333, None, GRID);

        assert!(plan.valid);
        assert_eq!(plan.new_position_of(ids[0]), Some(1300));
        assert_eq!(plan.new_position_of(ids[1]), Some(2100));
        for step in &plan.affected_clips {
            assert_eq!(step.new_position_ms % GRID, 0);
            assert_eq!(snap_to_grid(step.new_position_ms, GRID), step.new_position_ms);
        }
    }

    #[test]
    fn test_moving_clip_ignores_itself() {
        let (lane, ids) = lane_with(&[(0, 1000, "A"), (1000, 1000, "B")]);
        // Nudging B slightly left only collides with A
        let plan = calculate_shift_plan(&lane, 900, 1000, Some(ids[1]), GRID);
        assert!(plan.affected_clips.iter().all(|s| s.clip_id != ids[1]));

        let plan = calculate_shift_plan(&lane, 1100, 1000, Some(ids[1]), GRID);
        assert_eq!(plan.direction, ShiftDirection::None);
    }

    #[test]
    fn test_closest_valid_position() {
        let (lane, ids) = lane_with(&[(0, 1000, "A"), (1500, 1000, "B"), (4000, 1000, "C")]);

        // Already free
        assert_eq!(find_closest_valid_position(&lane, 2540, 500, None, GRID), 2500);
        // Negative targets floor at zero
        assert_eq!(find_closest_valid_position(&lane, -400, 500, Some(ids[0]), GRID), 0);
        // Gap [2500,4000) is the only one wide enough
        assert_eq!(find_closest_valid_position(&lane, 1200, 1200, None, GRID), 2500);
        // Both gaps fit a short clip; [1000,1500) starts closest
        assert_eq!(find_closest_valid_position(&lane, 1200, 400, None, GRID), 1000);
        // Nothing fits between clips
        assert_eq!(find_closest_valid_position(&lane, 100, 2000, None, GRID), 5000);
    }

    #[test]
    fn test_valid_plans_never_overlap() {
        let mut lane = CameraLane::new(LaneNumber(1), "");
        let mut seed: u64 = 0x5eed_cafe;
        let mut next = move |bound: u64| {
            seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
            (seed >> 33) % bound
        };

        for _ in 0..200 {
            let duration = 100 + next(30) * 100;
            let drop = snap_to_grid(next(20_000), GRID);
            let plan = calculate_shift_plan(&lane, drop, duration, None, GRID);
            if !plan.valid {
                continue;
            }
            let before = lane.clone();
            let moves: Vec<_> = plan.affected_clips.iter().map(|s| (s.clip_id, s.new_position_ms)).collect();
            lane.set_positions(&moves);
            lane.insert_clip(TimelineClip::new(VideoId::new(), LaneNumber(1), drop, duration, ""))
                .unwrap_or_else(|e| panic!("valid plan left an overlap: {e}; lane before: {before:?}"));
            assert!(lane.find_overlap().is_none());
        }
        assert!(lane.clip_count() > 0);
    }
}
