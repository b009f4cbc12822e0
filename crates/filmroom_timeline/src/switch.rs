// SPDX-License-Identifier: MIT OR Apache-2.0
//! Camera switching with logical-time preservation.
//!
//! A switch request computes, once, where the target camera has to seek so
//! the viewer keeps watching the same moment of the game:
//!
//! ```text
//! playhead = logical - live.sync_offset
//! target   = playhead + (live.sync_offset - target.sync_offset), clamped at 0
//! ```
//!
//! Logical time itself never changes across a switch; only the playhead
//! moves from one camera's clock to the other's.
//!
//! The switcher then waits in [`SwitchPhase::Switching`] until the new
//! source reports it can seek. Only the most recent request can complete;
//! readiness reported for an older ticket is dropped.

use crate::clip::{ClipId, VideoId};
use crate::error::Result;
use crate::lane::{CameraLane, LaneNumber};
use crate::resolver::{nearest_covered_time, resolve_active_clip};
use crate::time::Millis;
use crate::timeline::GameTimeline;

/// Identifies one switch request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SwitchTicket(u64);

impl SwitchTicket {
    /// Raw generation number
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// The requested time had no footage; the switch landed elsewhere
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapNotice {
    /// Lane time the sync math asked for
    pub requested_ms: Millis,
    /// Covered lane time the switch landed on instead
    pub landed_ms: Millis,
}

/// Where the new camera's source has to seek
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSeek {
    /// Target lane
    pub lane: LaneNumber,
    /// Clip covering the landing time
    pub clip_id: ClipId,
    /// Source media of that clip
    pub video_id: VideoId,
    /// Landing time on the target lane
    pub lane_time_ms: Millis,
    /// Offset into the source video
    pub clip_relative_ms: Millis,
    /// Set when the requested time was not covered
    pub gap: Option<GapNotice>,
}

/// Switch phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchPhase {
    /// One camera live, steady playback
    Idle {
        /// Live camera
        live: LaneNumber,
    },
    /// Waiting for the target source to become seek-ready
    Switching {
        /// Camera still on screen
        live: LaneNumber,
        /// Requested camera
        target: LaneNumber,
        /// Request generation
        ticket: SwitchTicket,
        /// Logical time at request
        logical_ms: Millis,
        /// Seek to apply once the source is ready
        pending_seek: SyncSeek,
    },
}

impl SwitchPhase {
    /// Camera currently on screen
    pub fn live(&self) -> LaneNumber {
        match self {
            Self::Idle { live } | Self::Switching { live, .. } => *live,
        }
    }
}

/// Result of a switch request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// Switch started; confirm with [`CameraSwitcher::source_ready`]
    Pending {
        /// Ticket to confirm with
        ticket: SwitchTicket,
        /// Seek the new source must perform
        seek: SyncSeek,
    },
    /// Target is already live; any pending switch was dropped
    AlreadyLive,
    /// Target lane has no clips at all; live camera unchanged
    NoCoverage {
        /// Requested lane
        lane: LaneNumber,
    },
}

/// A switch that reached the new camera
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletedSwitch {
    /// Previous camera
    pub from: LaneNumber,
    /// New live camera
    pub to: LaneNumber,
    /// Logical time of the switch, unchanged by the seek
    pub logical_ms: Millis,
    /// Seek that was applied, in the new camera's lane time
    pub seek: SyncSeek,
}

/// Physical target on the new camera's lane for the live camera's playhead,
/// clamped at zero
pub fn physical_target_ms(playhead_ms: i64, current_offset_ms: i64, new_offset_ms: i64) -> Millis {
    let target = playhead_ms as i128 + current_offset_ms as i128 - new_offset_ms as i128;
    target.clamp(0, Millis::MAX as i128) as Millis
}

/// Compute the seek for a switch from `from` to `to` at `logical_ms`.
///
/// Returns `Ok(None)` when the target lane has no clips.
pub fn compute_sync_seek(
    timeline: &GameTimeline,
    from: LaneNumber,
    to: LaneNumber,
    logical_ms: Millis,
) -> Result<Option<SyncSeek>> {
    let current = timeline.require_lane(from)?;
    let target = timeline.require_lane(to)?;
    let playhead = (logical_ms as i64).saturating_sub(current.sync_offset_ms);
    let requested = physical_target_ms(playhead, current.sync_offset_ms, target.sync_offset_ms);
    Ok(seek_on_lane(target, requested))
}

/// Seek for an arbitrary lane time, landing on the nearest covered instant
pub fn seek_on_lane(lane: &CameraLane, requested_ms: Millis) -> Option<SyncSeek> {
    let landed_ms = nearest_covered_time(lane, requested_ms)?;
    let clip = resolve_active_clip(lane, landed_ms).clip()?;
    let gap = (landed_ms != requested_ms).then_some(GapNotice { requested_ms, landed_ms });

    Some(SyncSeek {
        lane: lane.lane,
        clip_id: clip.id,
        video_id: clip.video_id,
        lane_time_ms: landed_ms,
        clip_relative_ms: landed_ms - clip.lane_position_ms,
        gap,
    })
}

/// Camera switch state machine
#[derive(Debug, Clone)]
pub struct CameraSwitcher {
    phase: SwitchPhase,
    next_ticket: u64,
}

impl CameraSwitcher {
    /// Start idle on a camera
    pub fn new(live: LaneNumber) -> Self {
        Self {
            phase: SwitchPhase::Idle { live },
            next_ticket: 1,
        }
    }

    /// Current phase
    pub fn phase(&self) -> &SwitchPhase {
        &self.phase
    }

    /// Camera currently on screen
    pub fn live(&self) -> LaneNumber {
        self.phase.live()
    }

    /// Whether a switch is waiting for its source
    pub fn is_switching(&self) -> bool {
        matches!(self.phase, SwitchPhase::Switching { .. })
    }

    /// Seek held for the in-flight switch
    pub fn pending_seek(&self) -> Option<&SyncSeek> {
        match &self.phase {
            SwitchPhase::Switching { pending_seek, .. } => Some(pending_seek),
            SwitchPhase::Idle { .. } => None,
        }
    }

    /// Request a switch to `target` at the current logical time.
    ///
    /// A request made while another switch is in flight replaces it; the
    /// earlier ticket can no longer complete.
    pub fn request_switch(
        &mut self,
        timeline: &GameTimeline,
        target: LaneNumber,
        logical_ms: Millis,
    ) -> Result<SwitchOutcome> {
        let live = self.live();
        timeline.require_lane(target)?;

        if let SwitchPhase::Switching { ticket, .. } = self.phase {
            tracing::debug!("Switch {} superseded by request for camera {}", ticket.0, target);
        }

        if target == live {
            self.phase = SwitchPhase::Idle { live };
            return Ok(SwitchOutcome::AlreadyLive);
        }

        let Some(seek) = compute_sync_seek(timeline, live, target, logical_ms)? else {
            tracing::debug!("Camera {} has no footage; staying on camera {}", target, live);
            self.phase = SwitchPhase::Idle { live };
            return Ok(SwitchOutcome::NoCoverage { lane: target });
        };

        let ticket = SwitchTicket(self.next_ticket);
        self.next_ticket += 1;
        self.phase = SwitchPhase::Switching {
            live,
            target,
            ticket,
            logical_ms,
            pending_seek: seek,
        };

        tracing::debug!(
            "Switch {} requested: camera {} -> {} at {}ms, seek {}ms into clip {}",
            ticket.0,
            live,
            target,
            logical_ms,
            seek.clip_relative_ms,
            seek.clip_id
        );
        Ok(SwitchOutcome::Pending { ticket, seek })
    }

    /// The target source reports it can seek.
    ///
    /// Completes the switch only for the current ticket; stale tickets are
    /// ignored and return `None`.
    pub fn source_ready(&mut self, ticket: SwitchTicket) -> Option<CompletedSwitch> {
        match self.phase {
            SwitchPhase::Switching {
                live,
                target,
                ticket: current,
                logical_ms,
                pending_seek,
            } if current == ticket => {
                self.phase = SwitchPhase::Idle { live: target };
                tracing::debug!("Switch {} completed: camera {} live", ticket.0, target);
                Some(CompletedSwitch {
                    from: live,
                    to: target,
                    logical_ms,
                    seek: pending_seek,
                })
            }
            _ => {
                tracing::debug!("Ignoring readiness for stale switch {}", ticket.0);
                None
            }
        }
    }

    /// Abandon an in-flight switch and stay on the live camera
    pub fn cancel(&mut self) {
        self.phase = SwitchPhase::Idle { live: self.live() };
    }

    /// Make a camera live immediately (initial selection, lane removal)
    pub fn reset(&mut self, live: LaneNumber) {
        self.phase = SwitchPhase::Idle { live };
    }
}
