// SPDX-License-Identifier: MIT OR Apache-2.0
//! Collaborator contracts for storage and media.
//!
//! The core never talks to a database or a video backend directly. It
//! computes a consistent snapshot, turns the change into [`PersistOp`]s and
//! hands them to a [`TimelineStore`]. Durations come from a
//! [`MediaCatalog`].

use crate::clip::{ClipId, TimelineClip, VideoId};
use crate::directors_cut::CameraSelection;
use crate::lane::LaneNumber;
use crate::rows::{SelectionRow, TimelineRows};
use crate::time::Millis;
use crate::timeline::{GameId, GameTimeline, PhaseMarker, TeamId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialize(String),

    /// No stored timeline for the game
    #[error("Game {0} not found")]
    GameNotFound(GameId),

    /// Stored rows do not form a valid timeline
    #[error("Stored timeline is invalid: {0}")]
    Corrupt(String),

    /// Backend unreachable or refused the write
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// One write to the persistence collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PersistOp {
    /// Remove a clip
    RemoveClip {
        /// Clip ID
        clip_id: ClipId,
    },
    /// Remove a lane and its clips
    RemoveLane {
        /// Lane number
        lane: LaneNumber,
    },
    /// Create or update a lane
    SaveLane {
        /// Lane number
        lane: LaneNumber,
        /// Display name
        label: String,
        /// Fixed sync offset
        sync_offset_ms: i64,
    },
    /// Move a clip within its lane
    SaveClipPlacement {
        /// Lane number
        lane: LaneNumber,
        /// Clip ID
        clip_id: ClipId,
        /// New logical start
        position_ms: Millis,
    },
    /// Create a clip
    AddClip {
        /// Lane number
        lane: LaneNumber,
        /// The clip
        clip: TimelineClip,
    },
    /// Replace the phase markers
    SaveMarkers {
        /// All markers
        markers: Vec<PhaseMarker>,
    },
    /// Replace the Director's Cut
    SaveSelections {
        /// All selections
        selections: Vec<CameraSelection>,
    },
}

impl PersistOp {
    /// Short description for logs
    pub fn describe(&self) -> String {
        match self {
            Self::RemoveClip { clip_id } => format!("remove clip {clip_id}"),
            Self::RemoveLane { lane } => format!("remove lane {lane}"),
            Self::SaveLane { lane, .. } => format!("save lane {lane}"),
            Self::SaveClipPlacement { lane, clip_id, position_ms } => {
                format!("place clip {clip_id} at {position_ms}ms on lane {lane}")
            }
            Self::AddClip { lane, clip } => format!("add clip {} on lane {lane}", clip.id),
            Self::SaveMarkers { markers } => format!("save {} markers", markers.len()),
            Self::SaveSelections { selections } => format!("save {} camera selections", selections.len()),
        }
    }
}

/// Persistence collaborator
pub trait TimelineStore {
    /// Load a game's timeline
    fn load_timeline(&mut self, game: GameId) -> StoreResult<GameTimeline>;

    /// Move a clip on a lane
    fn save_clip_placement(
        &mut self,
        game: GameId,
        lane: LaneNumber,
        clip_id: ClipId,
        position_ms: Millis,
    ) -> StoreResult<()>;

    /// Create a clip on a lane
    fn add_clip(&mut self, game: GameId, lane: LaneNumber, clip: &TimelineClip) -> StoreResult<()>;

    /// Delete a clip
    fn remove_clip(&mut self, game: GameId, clip_id: ClipId) -> StoreResult<()>;

    /// Create or update a lane
    fn save_lane(&mut self, game: GameId, lane: LaneNumber, label: &str, sync_offset_ms: i64) -> StoreResult<()>;

    /// Delete a lane and its clips
    fn remove_lane(&mut self, game: GameId, lane: LaneNumber) -> StoreResult<()>;

    /// Replace a game's phase markers
    fn save_markers(&mut self, game: GameId, markers: &[PhaseMarker]) -> StoreResult<()>;

    /// Replace a game's Director's Cut
    fn save_selections(&mut self, game: GameId, selections: &[CameraSelection]) -> StoreResult<()>;

    /// Load a game's Director's Cut
    fn load_selections(&mut self, game: GameId) -> StoreResult<Vec<CameraSelection>>;

    /// Apply one queued operation
    fn apply(&mut self, game: GameId, op: &PersistOp) -> StoreResult<()> {
        match op {
            PersistOp::RemoveClip { clip_id } => self.remove_clip(game, *clip_id),
            PersistOp::RemoveLane { lane } => self.remove_lane(game, *lane),
            PersistOp::SaveLane { lane, label, sync_offset_ms } => self.save_lane(game, *lane, label, *sync_offset_ms),
            PersistOp::SaveClipPlacement { lane, clip_id, position_ms } => {
                self.save_clip_placement(game, *lane, *clip_id, *position_ms)
            }
            PersistOp::AddClip { lane, clip } => self.add_clip(game, *lane, clip),
            PersistOp::SaveMarkers { markers } => self.save_markers(game, markers),
            PersistOp::SaveSelections { selections } => self.save_selections(game, selections),
        }
    }
}

/// Media-asset collaborator
pub trait MediaCatalog {
    /// Duration of a video, if known
    fn duration_ms(&self, video: VideoId) -> Option<Millis>;
}

/// Catalog backed by a fixed map
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    durations: HashMap<VideoId, Millis>,
}

impl StaticCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a video
    pub fn insert(&mut self, video: VideoId, duration_ms: Millis) {
        self.durations.insert(video, duration_ms);
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(mut self, video: VideoId, duration_ms: Millis) -> Self {
        self.insert(video, duration_ms);
        self
    }
}

impl MediaCatalog for StaticCatalog {
    fn duration_ms(&self, video: VideoId) -> Option<Millis> {
        self.durations.get(&video).copied()
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    games: HashMap<GameId, TimelineRows>,
    selections: HashMap<GameId, Vec<SelectionRow>>,
    fail_writes: usize,
    writes: usize,
}

impl MemoryState {
    fn begin_write(&mut self, game: GameId) -> StoreResult<&mut TimelineRows> {
        if self.fail_writes > 0 {
            self.fail_writes -= 1;
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }
        let rows = self.games.get_mut(&game).ok_or(StoreError::GameNotFound(game))?;
        self.writes += 1;
        Ok(rows)
    }
}

/// In-memory row store.
///
/// Clones share the same rows, so a test can keep a handle while a session
/// owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an empty game
    pub fn create_game(&self, team: TeamId, game: GameId) {
        self.state.lock().games.insert(game, TimelineRows::empty(team, game));
    }

    /// Store a whole timeline, replacing any previous rows
    pub fn seed(&self, timeline: &GameTimeline) {
        self.state.lock().games.insert(timeline.id, timeline.to_rows());
    }

    /// Make the next `count` writes fail with `Unavailable`
    pub fn fail_next_writes(&self, count: usize) {
        self.state.lock().fail_writes = count;
    }

    /// Number of successful writes
    pub fn write_count(&self) -> usize {
        self.state.lock().writes
    }

    /// Current rows for a game
    pub fn rows(&self, game: GameId) -> Option<TimelineRows> {
        self.state.lock().games.get(&game).cloned()
    }
}

impl TimelineStore for MemoryStore {
    fn load_timeline(&mut self, game: GameId) -> StoreResult<GameTimeline> {
        let state = self.state.lock();
        let rows = state.games.get(&game).ok_or(StoreError::GameNotFound(game))?;
        GameTimeline::from_rows(rows).map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    fn save_clip_placement(
        &mut self,
        game: GameId,
        lane: LaneNumber,
        clip_id: ClipId,
        position_ms: Millis,
    ) -> StoreResult<()> {
        let mut state = self.state.lock();
        state.begin_write(game)?.set_clip_placement(lane, clip_id, position_ms);
        Ok(())
    }

    fn add_clip(&mut self, game: GameId, lane: LaneNumber, clip: &TimelineClip) -> StoreResult<()> {
        let mut state = self.state.lock();
        state.begin_write(game)?.upsert_clip(lane, clip);
        Ok(())
    }

    fn remove_clip(&mut self, game: GameId, clip_id: ClipId) -> StoreResult<()> {
        let mut state = self.state.lock();
        state.begin_write(game)?.remove_clip(clip_id);
        Ok(())
    }

    fn save_lane(&mut self, game: GameId, lane: LaneNumber, label: &str, sync_offset_ms: i64) -> StoreResult<()> {
        let mut state = self.state.lock();
        state.begin_write(game)?.upsert_lane(lane, label, sync_offset_ms);
        Ok(())
    }

    fn remove_lane(&mut self, game: GameId, lane: LaneNumber) -> StoreResult<()> {
        let mut state = self.state.lock();
        state.begin_write(game)?.remove_lane(lane);
        Ok(())
    }

    fn save_markers(&mut self, game: GameId, markers: &[PhaseMarker]) -> StoreResult<()> {
        let mut state = self.state.lock();
        state.begin_write(game)?.set_markers(markers);
        Ok(())
    }

    fn save_selections(&mut self, game: GameId, selections: &[CameraSelection]) -> StoreResult<()> {
        let mut state = self.state.lock();
        state.begin_write(game)?;
        state
            .selections
            .insert(game, selections.iter().map(SelectionRow::from).collect());
        Ok(())
    }

    fn load_selections(&mut self, game: GameId) -> StoreResult<Vec<CameraSelection>> {
        let state = self.state.lock();
        if !state.games.contains_key(&game) {
            return Err(StoreError::GameNotFound(game));
        }
        Ok(state
            .selections
            .get(&game)
            .map(|rows| rows.iter().map(CameraSelection::from).collect())
            .unwrap_or_default())
    }
}
