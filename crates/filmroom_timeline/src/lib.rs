// SPDX-License-Identifier: MIT OR Apache-2.0
//! Multi-camera film review core.
//!
//! This crate places clips from independent cameras on parallel lanes of
//! one logical game clock and keeps playback in sync across them:
//! - Camera lanes holding non-overlapping clips
//! - Shift planning for drops and moves
//! - Active-clip and coverage-gap resolution
//! - Camera switching that preserves logical game time
//! - Director's Cut recording and replay
//!
//! ## Architecture
//!
//! The core is built on:
//! - Pure positioning functions over an immutable snapshot
//! - A tagged switch state machine with superseding tickets
//! - A session that diffs snapshots into store operations
//! - Narrow store and media collaborator traits

pub mod clip;
pub mod config;
pub mod diff;
pub mod directors_cut;
pub mod error;
pub mod history;
pub mod lane;
pub mod persistence;
pub mod positioning;
pub mod resolver;
pub mod rows;
pub mod session;
pub mod switch;
pub mod time;
pub mod timeline;

pub use clip::{ClipId, TimelineClip, VideoId};
pub use config::TimelineConfig;
pub use diff::{diff_timelines, DiffSummary};
pub use directors_cut::{CameraSelection, DirectorMode, DirectorsCut, Recorder, ScriptCue, ScriptPlayer};
pub use error::{Result, TimelineError};
pub use history::{HistoryError, TimelineHistory};
pub use lane::{CameraLane, LaneNumber};
pub use persistence::{MediaCatalog, MemoryStore, PersistOp, StaticCatalog, StoreError, StoreResult, TimelineStore};
pub use positioning::{
    calculate_shift_plan, find_closest_valid_position, find_overlapping, is_position_valid,
    next_available_position, ShiftDirection, ShiftInstruction, ShiftPlan,
};
pub use resolver::{nearest_covered_time, resolve_active_clip, ActiveClip};
pub use rows::{ClipRow, LaneRow, MarkerRow, SelectionRow, TimelineRows};
pub use session::{EditOutcome, LiveFrame, PlaybackTick, ReviewSession, SessionError, SessionResult};
pub use switch::{CameraSwitcher, CompletedSwitch, GapNotice, SwitchOutcome, SwitchPhase, SwitchTicket, SyncSeek};
pub use time::{format_clock, snap_to_grid, Millis, DEFAULT_GRID_MS};
pub use timeline::{GameId, GameTimeline, MarkerId, PhaseMarker, TeamId};
