// SPDX-License-Identifier: MIT OR Apache-2.0
//! Review session: the single owner of a game's timeline.
//!
//! Every edit computes a new snapshot from the current one, diffs the two
//! into [`PersistOp`]s, queues them in an outbox and flushes the outbox to
//! the store. The in-memory snapshot is optimistic: when the store fails the
//! snapshot stays, the unsent operations stay queued and
//! [`ReviewSession::flush`] sends exactly those operations again.
//!
//! Playback is driven from outside through [`ReviewSession::tick`]. The
//! clock is logical game time and is never rewritten by a switch. Each
//! camera plays at `logical - sync_offset` on its own lane; frames are
//! resolved in that lane time and reported back in logical time.

use crate::clip::{ClipId, TimelineClip, VideoId};
use crate::config::TimelineConfig;
use crate::diff::diff_timelines;
use crate::directors_cut::{DirectorMode, DirectorsCut, Recorder, ScriptCue, ScriptPlayer};
use crate::error::TimelineError;
use crate::history::{HistoryError, TimelineHistory};
use crate::lane::{CameraLane, LaneNumber};
use crate::persistence::{MediaCatalog, PersistOp, StoreError, TimelineStore};
use crate::positioning::{calculate_shift_plan, next_available_position, ShiftPlan};
use crate::resolver::{resolve_active_clip, ActiveClip};
use crate::switch::{CameraSwitcher, CompletedSwitch, SwitchOutcome, SwitchPhase, SwitchTicket};
use crate::time::{snap_to_grid, Millis};
use crate::timeline::{GameId, GameTimeline, MarkerId};
use std::collections::VecDeque;
use thiserror::Error;

/// Session errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// Timeline operation failed; nothing changed
    #[error(transparent)]
    Timeline(#[from] TimelineError),

    /// Undo/redo failed
    #[error(transparent)]
    History(#[from] HistoryError),

    /// Loading from the store failed
    #[error("Failed to load game: {0}")]
    Load(#[source] StoreError),

    /// The edit was applied locally but could not be stored
    #[error("Persistence failed with {pending} operation(s) pending: {source}")]
    PersistenceFailure {
        /// Operations still queued
        pending: usize,
        /// Store error
        #[source]
        source: StoreError,
    },
}

/// Result type for session operations
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Result of a placement request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// The clip was placed; `plan` lists the neighbours that moved
    Applied {
        /// Placed clip
        clip_id: ClipId,
        /// Where it landed
        position_ms: Millis,
        /// Shifts applied to make room
        plan: ShiftPlan,
    },
    /// The shift plan was invalid; the timeline is unchanged
    Rejected {
        /// The refused plan, with its reason
        plan: ShiftPlan,
    },
}

impl EditOutcome {
    /// Whether the edit was applied
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// The shift plan behind the outcome
    pub fn plan(&self) -> &ShiftPlan {
        match self {
            Self::Applied { plan, .. } | Self::Rejected { plan } => plan,
        }
    }
}

/// What the live camera shows at the current clock value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveFrame {
    /// A clip covers the playhead
    Footage {
        /// Covering clip
        clip_id: ClipId,
        /// Its source media
        video_id: VideoId,
        /// Offset into the source video
        clip_relative_ms: Millis,
    },
    /// No footage on the live camera
    Gap {
        /// Logical time where coverage resumes
        next_clip_start_ms: Option<Millis>,
        /// Overlay text
        message: String,
    },
}

/// Result of one playback tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackTick {
    /// Clock value of the tick
    pub logical_ms: Millis,
    /// Camera on screen
    pub live: LaneNumber,
    /// Frame on the live camera; `None` when the live lane is missing
    pub frame: Option<LiveFrame>,
    /// Script cue raised by this tick
    pub cue: Option<ScriptCue>,
    /// Switch started because of the cue
    pub switch: Option<SwitchOutcome>,
    /// Where to jump the clock to get past a gap
    pub skip_to_ms: Option<Millis>,
}

/// A review session over one game
pub struct ReviewSession<S, M> {
    config: TimelineConfig,
    timeline: GameTimeline,
    store: S,
    catalog: M,
    history: TimelineHistory,
    outbox: VecDeque<PersistOp>,
    switcher: CameraSwitcher,
    mode: DirectorMode,
    script: DirectorsCut,
    logical_ms: Millis,
}

impl<S: TimelineStore, M: MediaCatalog> ReviewSession<S, M> {
    /// Create a session over an already loaded timeline
    pub fn new(timeline: GameTimeline, script: DirectorsCut, store: S, catalog: M, config: TimelineConfig) -> Self {
        let live = first_lane(&timeline);
        Self {
            history: TimelineHistory::with_max_depth(config.history_depth),
            config,
            timeline,
            store,
            catalog,
            outbox: VecDeque::new(),
            switcher: CameraSwitcher::new(live),
            mode: DirectorMode::Manual,
            script,
            logical_ms: 0,
        }
    }

    /// Load a game from the store and open a session on it
    pub fn open(mut store: S, catalog: M, config: TimelineConfig, game: GameId) -> SessionResult<Self> {
        let timeline = store.load_timeline(game).map_err(SessionError::Load)?;
        let script = DirectorsCut::new(store.load_selections(game).map_err(SessionError::Load)?);
        tracing::info!(
            "Opened game {} with {} lane(s), {} clip(s), {} selection(s)",
            game,
            timeline.lane_count(),
            timeline.clips().count(),
            script.len()
        );
        Ok(Self::new(timeline, script, store, catalog, config))
    }

    /// Current snapshot
    pub fn timeline(&self) -> &GameTimeline {
        &self.timeline
    }

    /// Session configuration
    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    /// The store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Operations not yet accepted by the store
    pub fn pending_ops(&self) -> usize {
        self.outbox.len()
    }

    /// Undo/redo history
    pub fn history(&self) -> &TimelineHistory {
        &self.history
    }

    // Editing

    /// Add a camera lane
    pub fn add_lane(&mut self, lane: LaneNumber, label: impl Into<String>, sync_offset_ms: i64) -> SessionResult<()> {
        let mut next = self.timeline.clone();
        next.add_lane(CameraLane::new(lane, label).with_sync_offset(sync_offset_ms), self.config.max_lanes)?;
        let was_empty = self.timeline.lane_count() == 0;
        let stored = self.commit(next, format!("Add lane {lane}"));
        if was_empty {
            self.switcher.reset(lane);
        }
        stored
    }

    /// Remove a lane and its clips
    pub fn remove_lane(&mut self, lane: LaneNumber) -> SessionResult<()> {
        let mut next = self.timeline.clone();
        next.remove_lane(lane).ok_or(TimelineError::LaneNotFound(lane))?;
        let stored = self.commit(next, format!("Remove lane {lane}"));
        self.settle_switcher();
        stored
    }

    /// Change a lane's sync offset
    pub fn set_sync_offset(&mut self, lane: LaneNumber, sync_offset_ms: i64) -> SessionResult<()> {
        let mut next = self.timeline.clone();
        next.set_sync_offset(lane, sync_offset_ms)?;
        self.commit(next, format!("Sync lane {lane}"))
    }

    /// Add a video to a lane.
    ///
    /// Without a position the clip goes to the end of the lane. With one, it
    /// is dropped there and neighbours are shifted as needed.
    pub fn add_clip(
        &mut self,
        video_id: VideoId,
        lane: LaneNumber,
        position_ms: Option<Millis>,
        label: impl Into<String>,
    ) -> SessionResult<EditOutcome> {
        let duration_ms = self
            .catalog
            .duration_ms(video_id)
            .filter(|&d| d > 0)
            .ok_or(TimelineError::MissingMedia(video_id))?;
        let target = self.timeline.require_lane(lane)?;

        let position_ms = match position_ms {
            Some(drop) => snap_to_grid(drop, self.config.grid_ms),
            None => next_available_position(target),
        };
        let clip = TimelineClip::new(video_id, lane, position_ms, duration_ms, label);
        self.place(clip, "Add clip")
    }

    /// Move a clip to a lane and position as one edit.
    ///
    /// A cross-lane move never exposes a state where the clip is on both
    /// lanes or on neither.
    pub fn move_clip(&mut self, clip_id: ClipId, lane: LaneNumber, position_ms: Millis) -> SessionResult<EditOutcome> {
        let mut clip = self
            .timeline
            .find_clip(clip_id)
            .cloned()
            .ok_or(TimelineError::ClipNotFound(clip_id))?;
        self.timeline.require_lane(lane)?;

        clip.camera_lane = lane;
        clip.lane_position_ms = snap_to_grid(position_ms, self.config.grid_ms);
        self.place(clip, "Move clip")
    }

    /// Remove a clip
    pub fn remove_clip(&mut self, clip_id: ClipId) -> SessionResult<()> {
        let mut next = self.timeline.clone();
        next.remove_clip(clip_id)?;
        self.commit(next, "Remove clip")
    }

    /// Shift plan a drop would produce, without changing anything
    pub fn preview_drop(
        &self,
        lane: LaneNumber,
        position_ms: Millis,
        duration_ms: Millis,
        exclude: Option<ClipId>,
    ) -> SessionResult<ShiftPlan> {
        let lane = self.timeline.require_lane(lane)?;
        let position_ms = snap_to_grid(position_ms, self.config.grid_ms);
        Ok(calculate_shift_plan(lane, position_ms, duration_ms, exclude, self.config.grid_ms))
    }

    /// Add a phase marker
    pub fn add_marker(&mut self, time_ms: Millis, label: impl Into<String>) -> SessionResult<MarkerId> {
        let mut next = self.timeline.clone();
        let id = next.add_marker(time_ms, label);
        self.commit(next, "Add marker")?;
        Ok(id)
    }

    /// Remove a phase marker
    pub fn remove_marker(&mut self, marker_id: MarkerId) -> SessionResult<bool> {
        let mut next = self.timeline.clone();
        if next.remove_marker(marker_id).is_none() {
            return Ok(false);
        }
        self.commit(next, "Remove marker")?;
        Ok(true)
    }

    /// Undo the last edit
    pub fn undo(&mut self) -> SessionResult<()> {
        let previous = self.history.undo(&self.timeline)?;
        self.replace_snapshot(previous)
    }

    /// Redo the last undone edit
    pub fn redo(&mut self) -> SessionResult<()> {
        let next = self.history.redo(&self.timeline)?;
        self.replace_snapshot(next)
    }

    /// Send queued operations to the store, oldest first.
    ///
    /// Stops at the first failure and leaves that operation and everything
    /// after it queued.
    pub fn flush(&mut self) -> SessionResult<()> {
        let game = self.timeline.id;
        while let Some(op) = self.outbox.front() {
            if let Err(source) = self.store.apply(game, op) {
                tracing::warn!(
                    "Failed to persist {} for game {}: {} ({} pending)",
                    op.describe(),
                    game,
                    source,
                    self.outbox.len()
                );
                return Err(SessionError::PersistenceFailure {
                    pending: self.outbox.len(),
                    source,
                });
            }
            self.outbox.pop_front();
        }
        Ok(())
    }

    fn place(&mut self, clip: TimelineClip, description: &str) -> SessionResult<EditOutcome> {
        let mut next = self.timeline.clone();
        if next.find_clip(clip.id).is_some() {
            next.remove_clip(clip.id)?;
        }

        let target = next.require_lane(clip.camera_lane)?;
        let plan = calculate_shift_plan(
            target,
            clip.lane_position_ms,
            clip.duration_ms,
            Some(clip.id),
            self.config.grid_ms,
        );
        if !plan.valid {
            tracing::warn!(
                "Rejected placement of {} on lane {}: {}",
                clip.display_name(),
                clip.camera_lane,
                plan.reason.as_deref().unwrap_or("invalid shift plan")
            );
            return Ok(EditOutcome::Rejected { plan });
        }

        if !plan.is_noop() {
            next.apply_shift_plan(clip.camera_lane, &plan)?;
        }
        let clip_id = clip.id;
        let position_ms = clip.lane_position_ms;
        next.insert_clip(clip)?;

        self.commit(next, description)?;
        Ok(EditOutcome::Applied { clip_id, position_ms, plan })
    }

    fn commit(&mut self, next: GameTimeline, description: impl Into<String>) -> SessionResult<()> {
        let ops = diff_timelines(&self.timeline, &next);
        if ops.is_empty() {
            return Ok(());
        }

        let description = description.into();
        self.history.record(&self.timeline, description.as_str())?;
        tracing::debug!("{}: {} operation(s) queued", description, ops.len());
        self.timeline = next;
        self.outbox.extend(ops);
        self.flush()
    }

    fn replace_snapshot(&mut self, next: GameTimeline) -> SessionResult<()> {
        let ops = diff_timelines(&self.timeline, &next);
        self.timeline = next;
        self.settle_switcher();
        self.outbox.extend(ops);
        self.flush()
    }

    /// Drop switch state that points at lanes no longer in the snapshot
    fn settle_switcher(&mut self) {
        if let SwitchPhase::Switching { target, ticket, .. } = *self.switcher.phase() {
            if self.timeline.lane(target).is_none() {
                tracing::debug!("Switch {} cancelled: camera {} removed", ticket.value(), target);
                self.switcher.cancel();
            }
        }
        if self.timeline.lane(self.switcher.live()).is_none() {
            self.switcher.reset(first_lane(&self.timeline));
        }
    }

    // Playback

    /// Current clock value
    pub fn logical_ms(&self) -> Millis {
        self.logical_ms
    }

    /// Camera on screen
    pub fn live_camera(&self) -> LaneNumber {
        self.switcher.live()
    }

    /// The switch state machine
    pub fn switcher(&self) -> &CameraSwitcher {
        &self.switcher
    }

    /// Director's Cut mode
    pub fn mode(&self) -> &DirectorMode {
        &self.mode
    }

    /// Last recorded or loaded script
    pub fn script(&self) -> &DirectorsCut {
        &self.script
    }

    /// Request a switch to another camera at the current clock value
    pub fn request_switch(&mut self, target: LaneNumber) -> SessionResult<SwitchOutcome> {
        Ok(self.switcher.request_switch(&self.timeline, target, self.logical_ms)?)
    }

    /// The requested source can seek.
    ///
    /// Completes the switch for the current ticket. While recording, the
    /// switch is added to the script at its logical time. The clock is left
    /// alone; the new source seeks to `completed.seek`.
    pub fn source_ready(&mut self, ticket: SwitchTicket) -> Option<CompletedSwitch> {
        let completed = self.switcher.source_ready(ticket)?;
        if let DirectorMode::Recording(recorder) = &mut self.mode {
            recorder.record_switch(completed.to, completed.logical_ms);
        }
        Some(completed)
    }

    /// Start recording a Director's Cut from the live camera
    pub fn start_recording(&mut self) {
        match &self.mode {
            DirectorMode::PlaybackScript(_) => tracing::debug!("Script playback cancelled by recording"),
            DirectorMode::Recording(recorder) => tracing::warn!(
                "Discarding recording with {} selection(s) to start a new one",
                recorder.selections().len()
            ),
            DirectorMode::Manual => {}
        }
        self.mode = DirectorMode::Recording(Recorder::start(self.switcher.live(), self.logical_ms));
        tracing::info!("Recording Director's Cut from {}ms", self.logical_ms);
    }

    /// Stop recording and store the script.
    ///
    /// Returns `Ok(false)` when no recording was active.
    pub fn stop_recording(&mut self) -> SessionResult<bool> {
        let recorder = match std::mem::take(&mut self.mode) {
            DirectorMode::Recording(recorder) => recorder,
            other => {
                self.mode = other;
                return Ok(false);
            }
        };
        self.script = recorder.stop();
        tracing::info!("Recorded Director's Cut with {} selection(s)", self.script.len());

        self.outbox.push_back(PersistOp::SaveSelections {
            selections: self.script.selections().to_vec(),
        });
        self.flush()?;
        Ok(true)
    }

    /// Replay the stored script. An active recording is discarded.
    ///
    /// Returns `false` when there is no script to play.
    pub fn start_playback(&mut self) -> bool {
        if self.script.is_empty() {
            return false;
        }
        if let DirectorMode::Recording(recorder) = &self.mode {
            tracing::warn!(
                "Discarding recording with {} selection(s) to play the script",
                recorder.selections().len()
            );
        }
        self.mode = DirectorMode::PlaybackScript(ScriptPlayer::new(self.script.clone()));
        true
    }

    /// Return to manual switching
    pub fn stop_playback(&mut self) {
        if self.mode.is_playing_script() {
            self.mode = DirectorMode::Manual;
        }
    }

    /// Advance the clock.
    ///
    /// Drives the script player, resolves the live camera's frame and
    /// suggests a skip target when the playhead sits in a gap.
    pub fn tick(&mut self, now_ms: Millis) -> PlaybackTick {
        self.logical_ms = now_ms;

        let cue = match &mut self.mode {
            DirectorMode::PlaybackScript(player) => player.tick(now_ms),
            _ => None,
        };
        let switch = cue.and_then(|cue| self.follow_cue(cue));

        let live = self.switcher.live();
        let frame = self.timeline.lane(live).map(|lane| {
            match resolve_active_clip(lane, lane.lane_time_ms(now_ms)) {
                ActiveClip::Clip { clip, clip_relative_time_ms } => LiveFrame::Footage {
                    clip_id: clip.id,
                    video_id: clip.video_id,
                    clip_relative_ms: clip_relative_time_ms,
                },
                ActiveClip::Gap { next_clip_start_ms } => {
                    let next_clip_start_ms = next_clip_start_ms.map(|start| lane.logical_time_ms(start));
                    LiveFrame::Gap {
                        next_clip_start_ms,
                        message: ActiveClip::Gap { next_clip_start_ms }
                            .gap_message()
                            .unwrap_or_default(),
                    }
                }
            }
        });

        let skip_to_ms = match &frame {
            Some(LiveFrame::Gap { next_clip_start_ms: Some(next), .. }) if self.config.auto_skip_gaps => Some(*next),
            _ => None,
        };

        PlaybackTick {
            logical_ms: now_ms,
            live,
            frame,
            cue,
            switch,
            skip_to_ms,
        }
    }

    fn follow_cue(&mut self, cue: ScriptCue) -> Option<SwitchOutcome> {
        let pending_target = match self.switcher.phase() {
            SwitchPhase::Switching { target, .. } => Some(*target),
            SwitchPhase::Idle { .. } => None,
        };
        if pending_target == Some(cue.camera) {
            return None;
        }

        match self.switcher.request_switch(&self.timeline, cue.camera, self.logical_ms) {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                tracing::warn!("Script cue {} skipped: {}", cue.selection, err);
                None
            }
        }
    }
}

fn first_lane(timeline: &GameTimeline) -> LaneNumber {
    timeline.lanes().next().map_or(LaneNumber(1), |lane| lane.lane)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{MemoryStore, StaticCatalog};
    use crate::positioning::ShiftDirection;
    use crate::timeline::TeamId;

    struct Fixture {
        session: ReviewSession<MemoryStore, StaticCatalog>,
        store: MemoryStore,
        videos: Vec<VideoId>,
    }

    /// Two lanes; videos of 1000, 1000, 500 and 60000ms
    fn fixture() -> Fixture {
        let game = GameId::new();
        let store = MemoryStore::new();
        store.create_game(TeamId::new(), game);

        let videos: Vec<_> = (0..4).map(|_| VideoId::new()).collect();
        let mut catalog = StaticCatalog::new();
        for (video, duration) in videos.iter().zip([1000, 1000, 500, 60_000]) {
            catalog.insert(*video, duration);
        }

        let mut session = ReviewSession::open(store.clone(), catalog, TimelineConfig::default(), game).unwrap();
        session.add_lane(LaneNumber(1), "Sideline", 0).unwrap();
        session.add_lane(LaneNumber(2), "End zone", 2000).unwrap();
        Fixture { session, store, videos }
    }

    fn applied_id(outcome: EditOutcome) -> ClipId {
        match outcome {
            EditOutcome::Applied { clip_id, .. } => clip_id,
            EditOutcome::Rejected { plan } => panic!("placement rejected: {:?}", plan.reason),
        }
    }

    fn stored(fx: &Fixture) -> GameTimeline {
        GameTimeline::from_rows(&fx.store.rows(fx.session.timeline().id).unwrap()).unwrap()
    }

    #[test]
    fn test_add_clip_appends_and_persists() {
        let mut fx = fixture();
        let a = applied_id(fx.session.add_clip(fx.videos[0], LaneNumber(1), None, "A").unwrap());
        let b = applied_id(fx.session.add_clip(fx.videos[1], LaneNumber(1), None, "B").unwrap());

        let timeline = fx.session.timeline();
        assert_eq!(timeline.find_clip(a).unwrap().lane_position_ms, 0);
        assert_eq!(timeline.find_clip(b).unwrap().lane_position_ms, 1000);
        assert_eq!(fx.session.pending_ops(), 0);
        assert_eq!(&stored(&fx), fx.session.timeline());
    }

    #[test]
    fn test_missing_media_refused() {
        let mut fx = fixture();
        let unknown = VideoId::new();
        assert!(matches!(
            fx.session.add_clip(unknown, LaneNumber(1), None, ""),
            Err(SessionError::Timeline(TimelineError::MissingMedia(id))) if id == unknown
        ));
        assert_eq!(fx.session.timeline().clips().count(), 0);
    }

    #[test]
    fn test_drop_shifts_neighbours() {
        let mut fx = fixture();
        let a = applied_id(fx.session.add_clip(fx.videos[0], LaneNumber(1), None, "A").unwrap());
        let b = applied_id(fx.session.add_clip(fx.videos[1], LaneNumber(1), None, "B").unwrap());

        let outcome = fx.session.add_clip(fx.videos[2], LaneNumber(1), Some(1000), "C").unwrap();
        assert_eq!(outcome.plan().direction, ShiftDirection::Right);
        let c = applied_id(outcome);

        let timeline = fx.session.timeline();
        assert_eq!(timeline.find_clip(a).unwrap().lane_position_ms, 0);
        assert_eq!(timeline.find_clip(c).unwrap().lane_position_ms, 1000);
        assert_eq!(timeline.find_clip(b).unwrap().lane_position_ms, 1500);
        assert!(timeline.check_invariants().is_ok());
        assert_eq!(&stored(&fx), fx.session.timeline());
    }

    #[test]
    fn test_rejected_drop_changes_nothing() {
        let mut fx = fixture();
        let a = applied_id(fx.session.add_clip(fx.videos[0], LaneNumber(1), None, "A").unwrap());
        applied_id(fx.session.add_clip(fx.videos[1], LaneNumber(1), None, "B").unwrap());
        let before = fx.session.timeline().clone();
        let writes = fx.store.write_count();

        let outcome = fx.session.add_clip(fx.videos[2], LaneNumber(1), Some(800), "C").unwrap();
        let EditOutcome::Rejected { plan } = outcome else {
            panic!("expected rejection");
        };
        assert!(plan.reason.unwrap().contains("\"A\""));
        assert_eq!(fx.session.timeline(), &before);
        assert_eq!(fx.store.write_count(), writes);
        assert!(fx.session.timeline().find_clip(a).is_some());
    }

    #[test]
    fn test_cross_lane_move_is_atomic() {
        let mut fx = fixture();
        let a = applied_id(fx.session.add_clip(fx.videos[0], LaneNumber(1), None, "A").unwrap());

        let moved = fx.session.move_clip(a, LaneNumber(2), 400).unwrap();
        assert!(moved.is_applied());

        let timeline = fx.session.timeline();
        assert!(timeline.lane(LaneNumber(1)).unwrap().is_empty());
        let clip = timeline.lane(LaneNumber(2)).unwrap().clip(a).unwrap();
        assert_eq!(clip.lane_position_ms, 400);
        assert_eq!(timeline.clips().filter(|c| c.id == a).count(), 1);
        assert_eq!(&stored(&fx), timeline);
    }

    #[test]
    fn test_persistence_failure_retries_same_ops() {
        let mut fx = fixture();
        fx.store.fail_next_writes(1);

        let err = fx.session.add_clip(fx.videos[0], LaneNumber(1), None, "A").unwrap_err();
        assert!(matches!(err, SessionError::PersistenceFailure { pending: 1, .. }));
        assert_eq!(fx.session.timeline().clips().count(), 1);
        assert_eq!(fx.session.pending_ops(), 1);
        assert_eq!(stored(&fx).clips().count(), 0);

        fx.session.flush().unwrap();
        assert_eq!(fx.session.pending_ops(), 0);
        assert_eq!(&stored(&fx), fx.session.timeline());
    }

    #[test]
    fn test_undo_redo_persist() {
        let mut fx = fixture();
        let a = applied_id(fx.session.add_clip(fx.videos[0], LaneNumber(1), None, "A").unwrap());
        fx.session.move_clip(a, LaneNumber(1), 3000).unwrap();

        fx.session.undo().unwrap();
        assert_eq!(fx.session.timeline().find_clip(a).unwrap().lane_position_ms, 0);
        assert_eq!(stored(&fx).find_clip(a).unwrap().lane_position_ms, 0);

        fx.session.redo().unwrap();
        assert_eq!(fx.session.timeline().find_clip(a).unwrap().lane_position_ms, 3000);
        assert_eq!(&stored(&fx), fx.session.timeline());
    }

    #[test]
    fn test_switch_with_sync_offset() {
        let mut fx = fixture();
        fx.session.add_clip(fx.videos[3], LaneNumber(1), None, "A").unwrap();
        fx.session.add_clip(fx.videos[3], LaneNumber(2), None, "B").unwrap();

        fx.session.tick(10_000);
        let SwitchOutcome::Pending { ticket, seek } = fx.session.request_switch(LaneNumber(2)).unwrap() else {
            panic!("expected pending switch");
        };
        assert_eq!(seek.lane_time_ms, 8000);
        assert_eq!(fx.session.live_camera(), LaneNumber(1));

        let completed = fx.session.source_ready(ticket).unwrap();
        assert_eq!(completed.to, LaneNumber(2));
        assert_eq!(completed.logical_ms, 10_000);
        assert_eq!(fx.session.live_camera(), LaneNumber(2));
        assert_eq!(fx.session.logical_ms(), 10_000);

        // B shows its own 9000 at logical 11000; switching back lands A on 11000
        let tick = fx.session.tick(fx.session.logical_ms() + 1000);
        assert!(matches!(tick.frame, Some(LiveFrame::Footage { clip_relative_ms: 9000, .. })));
        let SwitchOutcome::Pending { ticket, seek } = fx.session.request_switch(LaneNumber(1)).unwrap() else {
            panic!("expected pending switch");
        };
        assert_eq!(seek.lane_time_ms, 11_000);
        assert_eq!(fx.session.source_ready(ticket).unwrap().logical_ms, 11_000);
    }

    #[test]
    fn test_recording_across_sync_offsets() {
        let mut fx = fixture();
        fx.session.add_clip(fx.videos[3], LaneNumber(1), None, "A").unwrap();
        fx.session.add_clip(fx.videos[3], LaneNumber(2), None, "B").unwrap();

        fx.session.tick(0);
        fx.session.start_recording();
        for (lane, at) in [(2, 0), (1, 5000), (2, 12_000)] {
            fx.session.tick(at);
            let SwitchOutcome::Pending { ticket, .. } = fx.session.request_switch(LaneNumber(lane)).unwrap() else {
                panic!("expected pending switch");
            };
            fx.session.source_ready(ticket).unwrap();
            assert_eq!(fx.session.logical_ms(), at);
        }
        assert!(fx.session.stop_recording().unwrap());

        let script = fx.session.script();
        assert!(script.is_tiled());
        let starts: Vec<_> = script.selections().iter().map(|s| (s.camera_id, s.start_seconds)).collect();
        assert_eq!(
            starts,
            vec![(LaneNumber(2), 0.0), (LaneNumber(1), 5.0), (LaneNumber(2), 12.0)]
        );
        assert_eq!(script.selections()[0].end_seconds, Some(5.0));
        assert_eq!(script.selections()[1].end_seconds, Some(12.0));
        assert_eq!(script.selections()[2].end_seconds, None);
    }

    #[test]
    fn test_removed_lane_cancels_pending_switch() {
        let mut fx = fixture();
        fx.session.add_clip(fx.videos[3], LaneNumber(1), None, "A").unwrap();
        fx.session.add_clip(fx.videos[3], LaneNumber(2), None, "B").unwrap();

        fx.session.tick(4000);
        let SwitchOutcome::Pending { ticket, .. } = fx.session.request_switch(LaneNumber(2)).unwrap() else {
            panic!("expected pending switch");
        };
        fx.session.remove_lane(LaneNumber(2)).unwrap();
        assert!(!fx.session.switcher().is_switching());

        assert_eq!(fx.session.source_ready(ticket), None);
        assert_eq!(fx.session.live_camera(), LaneNumber(1));
        assert!(fx.session.tick(5000).frame.is_some());
    }

    #[test]
    fn test_undo_cancels_switch_to_removed_lane() {
        let mut fx = fixture();
        fx.session.add_lane(LaneNumber(3), "Drone", 0).unwrap();
        fx.session.add_clip(fx.videos[3], LaneNumber(3), None, "C").unwrap();

        let SwitchOutcome::Pending { ticket, .. } = fx.session.request_switch(LaneNumber(3)).unwrap() else {
            panic!("expected pending switch");
        };
        fx.session.undo().unwrap();
        fx.session.undo().unwrap();
        assert!(fx.session.timeline().lane(LaneNumber(3)).is_none());
        assert_eq!(fx.session.source_ready(ticket), None);
        assert_eq!(fx.session.live_camera(), LaneNumber(1));
    }

    #[test]
    fn test_recording_tiles_and_persists() {
        let mut fx = fixture();
        fx.session.add_lane(LaneNumber(3), "Drone", 0).unwrap();
        for lane in 1..=3 {
            fx.session.add_clip(fx.videos[3], LaneNumber(lane), None, "").unwrap();
        }

        fx.session.tick(0);
        fx.session.start_recording();
        for (lane, at) in [(2, 0), (3, 5000), (1, 12_000)] {
            fx.session.tick(at);
            let SwitchOutcome::Pending { ticket, .. } = fx.session.request_switch(LaneNumber(lane)).unwrap() else {
                panic!("expected pending switch");
            };
            fx.session.source_ready(ticket).unwrap();
        }
        assert!(fx.session.stop_recording().unwrap());

        let script = fx.session.script();
        assert_eq!(script.len(), 3);
        assert!(script.is_tiled());
        assert_eq!(script.selections()[2].end_seconds, None);

        let mut store = fx.store.clone();
        let saved = store.load_selections(fx.session.timeline().id).unwrap();
        assert_eq!(saved, script.selections());
    }

    #[test]
    fn test_script_playback_drives_switches() {
        let mut fx = fixture();
        fx.session.add_clip(fx.videos[3], LaneNumber(1), None, "A").unwrap();
        fx.session.add_clip(fx.videos[3], LaneNumber(2), None, "B").unwrap();

        fx.session.start_recording();
        fx.session.tick(5000);
        let SwitchOutcome::Pending { ticket, .. } = fx.session.request_switch(LaneNumber(2)).unwrap() else {
            panic!("expected pending switch");
        };
        fx.session.source_ready(ticket);
        fx.session.stop_recording().unwrap();

        fx.session.tick(0);
        let SwitchOutcome::Pending { ticket, .. } = fx.session.request_switch(LaneNumber(1)).unwrap() else {
            panic!("expected pending switch");
        };
        fx.session.source_ready(ticket);

        assert!(fx.session.start_playback());
        let first = fx.session.tick(1000);
        assert_eq!(first.cue.map(|c| c.camera), Some(LaneNumber(1)));
        assert_eq!(first.switch, Some(SwitchOutcome::AlreadyLive));

        let second = fx.session.tick(5000);
        assert_eq!(second.cue.map(|c| c.camera), Some(LaneNumber(2)));
        let Some(SwitchOutcome::Pending { ticket, .. }) = second.switch else {
            panic!("expected scripted switch");
        };
        fx.session.source_ready(ticket);
        assert_eq!(fx.session.live_camera(), LaneNumber(2));
        assert_eq!(fx.session.tick(6000).cue, None);
    }

    #[test]
    fn test_recording_and_playback_exclusive() {
        let mut fx = fixture();
        fx.session.start_recording();
        assert!(fx.session.stop_recording().unwrap());
        assert!(fx.session.start_playback());
        assert!(fx.session.mode().is_playing_script());

        assert!(!fx.session.stop_recording().unwrap());
        assert!(fx.session.mode().is_playing_script());

        fx.session.start_recording();
        assert!(fx.session.mode().is_recording());
        assert!(fx.session.start_playback());
        assert!(!fx.session.mode().is_recording());
    }

    #[test]
    fn test_restarted_recording_starts_fresh() {
        let mut fx = fixture();
        fx.session.add_clip(fx.videos[3], LaneNumber(1), None, "A").unwrap();
        fx.session.add_clip(fx.videos[3], LaneNumber(2), None, "B").unwrap();

        fx.session.start_recording();
        fx.session.tick(3000);
        let SwitchOutcome::Pending { ticket, .. } = fx.session.request_switch(LaneNumber(2)).unwrap() else {
            panic!("expected pending switch");
        };
        fx.session.source_ready(ticket);

        fx.session.tick(7000);
        fx.session.start_recording();
        assert!(fx.session.stop_recording().unwrap());

        let selections = fx.session.script().selections();
        assert_eq!(selections.len(), 1);
        assert_eq!(selections[0].camera_id, LaneNumber(2));
        assert_eq!(selections[0].start_seconds, 7.0);
    }

    #[test]
    fn test_tick_reports_gap_and_skip() {
        let mut fx = fixture();
        let c = applied_id(fx.session.add_clip(fx.videos[2], LaneNumber(1), Some(3000), "C").unwrap());

        let tick = fx.session.tick(1000);
        assert_eq!(tick.live, LaneNumber(1));
        assert_eq!(tick.skip_to_ms, Some(3000));
        assert!(matches!(tick.frame, Some(LiveFrame::Gap { next_clip_start_ms: Some(3000), .. })));

        let tick = fx.session.tick(3200);
        assert_eq!(
            tick.frame,
            Some(LiveFrame::Footage { clip_id: c, video_id: fx.videos[2], clip_relative_ms: 200 })
        );
        assert_eq!(tick.skip_to_ms, None);
    }
}
