// SPDX-License-Identifier: MIT OR Apache-2.0
//! Game documents on disk.
//!
//! One RON document per game holds the persisted rows of the timeline and
//! the Director's Cut script.

use filmroom_timeline::{
    CameraLane, CameraSelection, ClipId, GameId, GameTimeline, LaneNumber, Millis, PersistOp, PhaseMarker,
    SelectionRow, StoreError, StoreResult, TeamId, TimelineClip, TimelineRows, TimelineStore,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Current document format version
pub const DOCUMENT_FORMAT_VERSION: u32 = 1;

/// A game's timeline rows and script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameDocument {
    /// Format version
    pub version: u32,
    /// Timeline rows
    pub timeline: TimelineRows,
    /// Director's Cut rows
    #[serde(default)]
    pub selections: Vec<SelectionRow>,
}

impl GameDocument {
    /// Document for a new game with `lanes` default camera lanes
    pub fn new_game(team: TeamId, game: GameId, lanes: u8) -> StoreResult<Self> {
        let mut timeline = GameTimeline::new(game, team);
        for n in 1..=lanes {
            timeline
                .add_lane(CameraLane::new(LaneNumber(n), format!("Camera {n}")), lanes)
                .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        }
        Ok(Self::from_timeline(&timeline))
    }

    /// Document holding a timeline and no script
    pub fn from_timeline(timeline: &GameTimeline) -> Self {
        Self {
            version: DOCUMENT_FORMAT_VERSION,
            timeline: timeline.to_rows(),
            selections: Vec::new(),
        }
    }

    /// Game the document belongs to
    pub fn game(&self) -> GameId {
        self.timeline.game
    }

    /// Rebuild the timeline model
    pub fn to_timeline(&self) -> StoreResult<GameTimeline> {
        GameTimeline::from_rows(&self.timeline).map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    /// Rebuild the Director's Cut selections
    pub fn to_selections(&self) -> Vec<CameraSelection> {
        self.selections.iter().map(CameraSelection::from).collect()
    }

    /// Apply one write to the rows
    pub fn apply(&mut self, op: &PersistOp) {
        let rows = &mut self.timeline;
        match op {
            PersistOp::RemoveClip { clip_id } => rows.remove_clip(*clip_id),
            PersistOp::RemoveLane { lane } => rows.remove_lane(*lane),
            PersistOp::SaveLane { lane, label, sync_offset_ms } => rows.upsert_lane(*lane, label, *sync_offset_ms),
            PersistOp::SaveClipPlacement { lane, clip_id, position_ms } => {
                rows.set_clip_placement(*lane, *clip_id, *position_ms);
            }
            PersistOp::AddClip { lane, clip } => rows.upsert_clip(*lane, clip),
            PersistOp::SaveMarkers { markers } => rows.set_markers(markers),
            PersistOp::SaveSelections { selections } => {
                self.selections = selections.iter().map(SelectionRow::from).collect();
            }
        }
    }

    /// Parse a document
    pub fn from_ron(content: &str) -> StoreResult<Self> {
        let document: GameDocument = ron::from_str(content).map_err(|e| StoreError::Deserialize(e.to_string()))?;
        if document.version > DOCUMENT_FORMAT_VERSION {
            return Err(StoreError::Deserialize(format!(
                "Document version {} is newer than supported version {}",
                document.version, DOCUMENT_FORMAT_VERSION
            )));
        }
        Ok(document)
    }

    /// Serialize the document
    pub fn to_ron(&self) -> StoreResult<String> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        ron::ser::to_string_pretty(self, config).map_err(|e| StoreError::Serialize(e.to_string()))
    }

    /// Load a document from disk
    pub fn load(path: &Path) -> StoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Write the document to disk
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }
}

/// Store writing every change straight to a game document
#[derive(Debug)]
pub struct RonFileStore {
    path: PathBuf,
    document: GameDocument,
}

impl RonFileStore {
    /// Write a new document and open it
    pub fn create(path: impl Into<PathBuf>, document: GameDocument) -> StoreResult<Self> {
        let path = path.into();
        document.save(&path)?;
        tracing::info!("Created game {} at {:?}", document.game(), path);
        Ok(Self { path, document })
    }

    /// Open an existing document
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let document = GameDocument::load(&path)?;
        Ok(Self { path, document })
    }

    /// Document path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current document
    pub fn document(&self) -> &GameDocument {
        &self.document
    }

    fn check_game(&self, game: GameId) -> StoreResult<()> {
        if game == self.document.game() {
            Ok(())
        } else {
            Err(StoreError::GameNotFound(game))
        }
    }

    fn write(&mut self, game: GameId, update: impl FnOnce(&mut GameDocument)) -> StoreResult<()> {
        self.check_game(game)?;
        update(&mut self.document);
        self.document.save(&self.path)
    }
}

impl TimelineStore for RonFileStore {
    fn load_timeline(&mut self, game: GameId) -> StoreResult<GameTimeline> {
        self.check_game(game)?;
        self.document.to_timeline()
    }

    fn save_clip_placement(
        &mut self,
        game: GameId,
        lane: LaneNumber,
        clip_id: ClipId,
        position_ms: Millis,
    ) -> StoreResult<()> {
        self.write(game, |doc| doc.timeline.set_clip_placement(lane, clip_id, position_ms))
    }

    fn add_clip(&mut self, game: GameId, lane: LaneNumber, clip: &TimelineClip) -> StoreResult<()> {
        self.write(game, |doc| doc.timeline.upsert_clip(lane, clip))
    }

    fn remove_clip(&mut self, game: GameId, clip_id: ClipId) -> StoreResult<()> {
        self.write(game, |doc| doc.timeline.remove_clip(clip_id))
    }

    fn save_lane(&mut self, game: GameId, lane: LaneNumber, label: &str, sync_offset_ms: i64) -> StoreResult<()> {
        self.write(game, |doc| doc.timeline.upsert_lane(lane, label, sync_offset_ms))
    }

    fn remove_lane(&mut self, game: GameId, lane: LaneNumber) -> StoreResult<()> {
        self.write(game, |doc| doc.timeline.remove_lane(lane))
    }

    fn save_markers(&mut self, game: GameId, markers: &[PhaseMarker]) -> StoreResult<()> {
        self.write(game, |doc| doc.timeline.set_markers(markers))
    }

    fn save_selections(&mut self, game: GameId, selections: &[CameraSelection]) -> StoreResult<()> {
        self.write(game, |doc| {
            doc.selections = selections.iter().map(SelectionRow::from).collect();
        })
    }

    fn load_selections(&mut self, game: GameId) -> StoreResult<Vec<CameraSelection>> {
        self.check_game(game)?;
        Ok(self.document.to_selections())
    }

    fn apply(&mut self, game: GameId, op: &PersistOp) -> StoreResult<()> {
        self.write(game, |doc| doc.apply(op))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filmroom_timeline::VideoId;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("filmroom-test-{}.ron", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_new_game_document() {
        let document = GameDocument::new_game(TeamId::new(), GameId::new(), 3).unwrap();
        let timeline = document.to_timeline().unwrap();
        assert_eq!(timeline.lane_count(), 3);
        assert_eq!(timeline.lane(LaneNumber(2)).unwrap().label, "Camera 2");
    }

    #[test]
    fn test_file_store_round_trip() {
        let path = temp_path();
        let document = GameDocument::new_game(TeamId::new(), GameId::new(), 2).unwrap();
        let game = document.game();
        let mut store = RonFileStore::create(&path, document).unwrap();

        let clip = TimelineClip::new(VideoId::new(), LaneNumber(2), 1000, 5000, "Q1");
        store.add_clip(game, LaneNumber(2), &clip).unwrap();
        store
            .apply(game, &PersistOp::SaveClipPlacement { lane: LaneNumber(2), clip_id: clip.id, position_ms: 2000 })
            .unwrap();
        let selections = vec![CameraSelection { camera_id: LaneNumber(2), start_seconds: 0.0, end_seconds: None }];
        store.save_selections(game, &selections).unwrap();

        let mut reopened = RonFileStore::open(&path).unwrap();
        let timeline = reopened.load_timeline(game).unwrap();
        assert_eq!(timeline.find_clip(clip.id).unwrap().lane_position_ms, 2000);
        assert_eq!(reopened.load_selections(game).unwrap(), selections);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_wrong_game_refused() {
        let path = temp_path();
        let document = GameDocument::new_game(TeamId::new(), GameId::new(), 1).unwrap();
        let mut store = RonFileStore::create(&path, document).unwrap();

        let other = GameId::new();
        assert!(matches!(store.load_timeline(other), Err(StoreError::GameNotFound(id)) if id == other));
        assert!(store.remove_lane(other, LaneNumber(1)).is_err());

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_newer_document_rejected() {
        let mut document = GameDocument::new_game(TeamId::new(), GameId::new(), 1).unwrap();
        document.version = DOCUMENT_FORMAT_VERSION + 1;
        let content = document.to_ron().unwrap();
        assert!(matches!(GameDocument::from_ron(&content), Err(StoreError::Deserialize(_))));
    }
}
