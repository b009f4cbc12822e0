// SPDX-License-Identifier: MIT OR Apache-2.0
//! Director's Cut: recording camera choices and replaying them.
//!
//! A recorded script is a list of [`CameraSelection`]s that tile the logical
//! timeline from the moment recording started. The last selection is left
//! open (`end_seconds: None`) and extends to the end of the review.

use crate::lane::LaneNumber;
use crate::time::{millis_to_seconds, seconds_to_millis, Millis};
use serde::{Deserialize, Serialize};

/// "This camera was live from `start_seconds`"
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraSelection {
    /// Live camera
    pub camera_id: LaneNumber,
    /// Logical start in seconds
    pub start_seconds: f64,
    /// Logical end in seconds; `None` while still live
    pub end_seconds: Option<f64>,
}

impl CameraSelection {
    /// Whether the selection covers a logical time
    pub fn covers(&self, seconds: f64) -> bool {
        seconds >= self.start_seconds && self.end_seconds.map_or(true, |end| seconds < end)
    }

    /// Start as logical milliseconds
    pub fn start_ms(&self) -> Millis {
        seconds_to_millis(self.start_seconds)
    }
}

/// A recorded camera script
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectorsCut {
    selections: Vec<CameraSelection>,
}

impl DirectorsCut {
    /// Wrap stored selections, sorted by start
    pub fn new(mut selections: Vec<CameraSelection>) -> Self {
        selections.sort_by(|a, b| a.start_seconds.total_cmp(&b.start_seconds));
        Self { selections }
    }

    /// Selections in time order
    pub fn selections(&self) -> &[CameraSelection] {
        &self.selections
    }

    /// Number of selections
    pub fn len(&self) -> usize {
        self.selections.len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    /// Index of the selection live at a logical time
    pub fn index_at(&self, seconds: f64) -> Option<usize> {
        self.selections.iter().rposition(|s| s.covers(seconds))
    }

    /// Camera the script puts on screen at a logical time
    pub fn camera_at(&self, seconds: f64) -> Option<LaneNumber> {
        self.index_at(seconds).map(|i| self.selections[i].camera_id)
    }

    /// Check that selections are ordered, contiguous and only the last is open
    pub fn is_tiled(&self) -> bool {
        self.selections.windows(2).all(|pair| {
            pair[0].start_seconds < pair[1].start_seconds && pair[0].end_seconds == Some(pair[1].start_seconds)
        })
    }
}

/// Builds a script while the reviewer switches cameras
#[derive(Debug, Clone, PartialEq)]
pub struct Recorder {
    selections: Vec<CameraSelection>,
}

impl Recorder {
    /// Start recording with `live` on screen at `at_ms`
    pub fn start(live: LaneNumber, at_ms: Millis) -> Self {
        Self {
            selections: vec![CameraSelection {
                camera_id: live,
                start_seconds: millis_to_seconds(at_ms),
                end_seconds: None,
            }],
        }
    }

    /// Selections so far
    pub fn selections(&self) -> &[CameraSelection] {
        &self.selections
    }

    /// Record a completed switch to `camera` at logical `at_ms`.
    ///
    /// Closes the open selection at the switch time and opens a new one.
    /// Selections starting at or after the switch time are dropped, so a
    /// switch after scrubbing backwards rewrites the rest of the script.
    pub fn record_switch(&mut self, camera: LaneNumber, at_ms: Millis) {
        let at = millis_to_seconds(at_ms);
        while self.selections.last().is_some_and(|s| s.start_seconds >= at) {
            self.selections.pop();
        }

        if let Some(last) = self.selections.last_mut() {
            if last.camera_id == camera {
                last.end_seconds = None;
                return;
            }
            last.end_seconds = Some(at);
        }

        self.selections.push(CameraSelection {
            camera_id: camera,
            start_seconds: at,
            end_seconds: None,
        });
        tracing::debug!("Recorded camera {} from {:.3}s", camera, at);
    }

    /// Stop recording; the last selection stays open
    pub fn stop(self) -> DirectorsCut {
        DirectorsCut { selections: self.selections }
    }
}

/// A switch the script asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptCue {
    /// Camera to put live
    pub camera: LaneNumber,
    /// Index of the selection that triggered the cue
    pub selection: usize,
    /// Logical start of that selection
    pub start_ms: Millis,
}

/// Replays a script against the logical clock
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptPlayer {
    script: DirectorsCut,
    cued: Option<usize>,
}

impl ScriptPlayer {
    /// Create a player positioned before the first cue
    pub fn new(script: DirectorsCut) -> Self {
        Self { script, cued: None }
    }

    /// The script being played
    pub fn script(&self) -> &DirectorsCut {
        &self.script
    }

    /// Advance to a logical time.
    ///
    /// Returns a cue when the active selection differs from the last cued
    /// one, so seeking anywhere in the script puts the right camera up.
    pub fn tick(&mut self, logical_ms: Millis) -> Option<ScriptCue> {
        let index = self.script.index_at(millis_to_seconds(logical_ms));
        if index == self.cued {
            return None;
        }
        self.cued = index;

        let index = index?;
        let selection = self.script.selections[index];
        tracing::debug!("Script cue {}: camera {} at {}ms", index, selection.camera_id, logical_ms);
        Some(ScriptCue {
            camera: selection.camera_id,
            selection: index,
            start_ms: selection.start_ms(),
        })
    }

    /// Whether the clock has passed the end of a closed final selection
    pub fn is_finished(&self, logical_ms: Millis) -> bool {
        match self.script.selections.last() {
            Some(last) => last.end_seconds.is_some_and(|end| millis_to_seconds(logical_ms) >= end),
            None => true,
        }
    }
}

/// Review mode orthogonal to the switch phase
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DirectorMode {
    /// Switches come from the reviewer and nothing is recorded
    #[default]
    Manual,
    /// Switches are appended to a script
    Recording(Recorder),
    /// Switches come from a script
    PlaybackScript(ScriptPlayer),
}

impl DirectorMode {
    /// Whether a recording is active
    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording(_))
    }

    /// Whether a script is driving the switches
    pub fn is_playing_script(&self) -> bool {
        matches!(self, Self::PlaybackScript(_))
    }

    /// Short name for status lines
    pub fn name(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Recording(_) => "recording",
            Self::PlaybackScript(_) => "playback",
        }
    }
}
