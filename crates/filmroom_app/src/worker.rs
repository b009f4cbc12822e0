// SPDX-License-Identifier: MIT OR Apache-2.0
//! Background persistence.
//!
//! Writes from the review session are queued on an unbounded channel and
//! applied to the game document by a worker thread, so editing never waits
//! on the disk. The worker reports the outcome of every write.

use crate::store::{GameDocument, RonFileStore};
use filmroom_timeline::{
    CameraSelection, ClipId, GameId, GameTimeline, LaneNumber, Millis, PersistOp, PhaseMarker, StoreError,
    StoreResult, TimelineClip, TimelineStore,
};
use std::thread::JoinHandle;
use tokio::sync::mpsc;

enum WorkerMessage {
    Apply(GameId, PersistOp),
    Shutdown,
}

/// Outcome of one queued write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistReport {
    /// What was written
    pub description: String,
    /// Error text if the write failed
    pub error: Option<String>,
}

/// Worker thread applying queued writes to a game document
pub struct PersistenceWorker {
    request_tx: mpsc::UnboundedSender<WorkerMessage>,
    report_rx: mpsc::UnboundedReceiver<PersistReport>,
    handle: Option<JoinHandle<()>>,
}

impl PersistenceWorker {
    /// Start a worker writing to `store`
    pub fn spawn(store: RonFileStore) -> Self {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (report_tx, report_rx) = mpsc::unbounded_channel();

        let handle = std::thread::spawn(move || {
            persistence_worker(store, request_rx, report_tx);
        });

        Self {
            request_tx,
            report_rx,
            handle: Some(handle),
        }
    }

    /// A store handle that queues writes on this worker.
    ///
    /// Reads are served from `document`, which is kept up to date with the
    /// writes sent through the handle.
    pub fn store(&self, document: GameDocument) -> QueuedStore {
        QueuedStore {
            document,
            request_tx: self.request_tx.clone(),
        }
    }

    /// Wait for every queued write and return the reports
    pub fn finish(mut self) -> Vec<PersistReport> {
        // A send error means the worker is already gone
        let _ = self.request_tx.send(WorkerMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Persistence worker panicked");
            }
        }

        let mut reports = Vec::new();
        while let Ok(report) = self.report_rx.try_recv() {
            reports.push(report);
        }
        reports
    }
}

/// Worker thread that processes queued writes
fn persistence_worker(
    mut store: RonFileStore,
    mut request_rx: mpsc::UnboundedReceiver<WorkerMessage>,
    report_tx: mpsc::UnboundedSender<PersistReport>,
) {
    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create persistence runtime: {e}");
            return;
        }
    };

    rt.block_on(async {
        while let Some(message) = request_rx.recv().await {
            let WorkerMessage::Apply(game, op) = message else {
                break;
            };

            let description = op.describe();
            let error = match store.apply(game, &op) {
                Ok(()) => {
                    tracing::debug!("Persisted {} to {:?}", description, store.path());
                    None
                }
                Err(e) => {
                    tracing::warn!("Failed to persist {}: {}", description, e);
                    Some(e.to_string())
                }
            };

            if report_tx.send(PersistReport { description, error }).is_err() {
                break;
            }
        }
    });
}

/// Fire-and-forget store backed by a [`PersistenceWorker`]
pub struct QueuedStore {
    document: GameDocument,
    request_tx: mpsc::UnboundedSender<WorkerMessage>,
}

impl QueuedStore {
    fn enqueue(&mut self, game: GameId, op: PersistOp) -> StoreResult<()> {
        if game != self.document.game() {
            return Err(StoreError::GameNotFound(game));
        }
        self.document.apply(&op);
        self.request_tx
            .send(WorkerMessage::Apply(game, op))
            .map_err(|_| StoreError::Unavailable("persistence worker stopped".to_string()))
    }
}

impl TimelineStore for QueuedStore {
    fn load_timeline(&mut self, game: GameId) -> StoreResult<GameTimeline> {
        if game != self.document.game() {
            return Err(StoreError::GameNotFound(game));
        }
        self.document.to_timeline()
    }

    fn save_clip_placement(
        &mut self,
        game: GameId,
        lane: LaneNumber,
        clip_id: ClipId,
        position_ms: Millis,
    ) -> StoreResult<()> {
        self.enqueue(game, PersistOp::SaveClipPlacement { lane, clip_id, position_ms })
    }

    fn add_clip(&mut self, game: GameId, lane: LaneNumber, clip: &TimelineClip) -> StoreResult<()> {
        self.enqueue(game, PersistOp::AddClip { lane, clip: clip.clone() })
    }

    fn remove_clip(&mut self, game: GameId, clip_id: ClipId) -> StoreResult<()> {
        self.enqueue(game, PersistOp::RemoveClip { clip_id })
    }

    fn save_lane(&mut self, game: GameId, lane: LaneNumber, label: &str, sync_offset_ms: i64) -> StoreResult<()> {
        self.enqueue(
            game,
            PersistOp::SaveLane {
                lane,
                label: label.to_string(),
                sync_offset_ms,
            },
        )
    }

    fn remove_lane(&mut self, game: GameId, lane: LaneNumber) -> StoreResult<()> {
        self.enqueue(game, PersistOp::RemoveLane { lane })
    }

    fn save_markers(&mut self, game: GameId, markers: &[PhaseMarker]) -> StoreResult<()> {
        self.enqueue(game, PersistOp::SaveMarkers { markers: markers.to_vec() })
    }

    fn save_selections(&mut self, game: GameId, selections: &[CameraSelection]) -> StoreResult<()> {
        self.enqueue(
            game,
            PersistOp::SaveSelections {
                selections: selections.to_vec(),
            },
        )
    }

    fn load_selections(&mut self, game: GameId) -> StoreResult<Vec<CameraSelection>> {
        if game != self.document.game() {
            return Err(StoreError::GameNotFound(game));
        }
        Ok(self.document.to_selections())
    }

    fn apply(&mut self, game: GameId, op: &PersistOp) -> StoreResult<()> {
        self.enqueue(game, op.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filmroom_timeline::{ReviewSession, StaticCatalog, TeamId, TimelineConfig, VideoId};

    #[test]
    fn test_session_writes_reach_disk() {
        let path = std::env::temp_dir().join(format!("filmroom-worker-{}.ron", uuid::Uuid::new_v4()));
        let document = GameDocument::new_game(TeamId::new(), GameId::new(), 2).unwrap();
        let game = document.game();
        let store = RonFileStore::create(&path, document.clone()).unwrap();

        let worker = PersistenceWorker::spawn(store);
        let video = VideoId::new();
        let catalog = StaticCatalog::new().with(video, 4000);
        let mut session =
            ReviewSession::open(worker.store(document), catalog, TimelineConfig::default(), game).unwrap();

        session.add_clip(video, LaneNumber(1), None, "Q1").unwrap();
        session.add_clip(video, LaneNumber(1), None, "Q2").unwrap();
        session.add_marker(0, "Kickoff").unwrap();
        let expected = session.timeline().clone();
        drop(session);

        let reports = worker.finish();
        assert_eq!(reports.len(), 3);
        assert!(reports.iter().all(|r| r.error.is_none()));

        let saved = GameDocument::load(&path).unwrap().to_timeline().unwrap();
        assert_eq!(saved, expected);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_stopped_worker_is_unavailable() {
        let path = std::env::temp_dir().join(format!("filmroom-worker-{}.ron", uuid::Uuid::new_v4()));
        let document = GameDocument::new_game(TeamId::new(), GameId::new(), 1).unwrap();
        let game = document.game();
        let worker = PersistenceWorker::spawn(RonFileStore::create(&path, document.clone()).unwrap());
        let mut store = worker.store(document);
        assert!(worker.finish().is_empty());

        let result = store.remove_lane(game, LaneNumber(1));
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        std::fs::remove_file(&path).unwrap();
    }
}
