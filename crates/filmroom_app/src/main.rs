// SPDX-License-Identifier: MIT OR Apache-2.0
//! `filmroom` - multi-camera game film review from the command line.
//!
//! Creates and edits game documents, inspects what each camera shows at a
//! point in the game, dumps the persisted rows and replays a recorded
//! Director's Cut through the camera switch machine.
//!
//! ## Architecture
//!
//! Commands open a [`ReviewSession`] over the game document. Edits are
//! written through a [`worker::PersistenceWorker`] so the session never
//! blocks on the disk.

mod store;
mod worker;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use filmroom_timeline::config::CONFIG_FILE_NAME;
use filmroom_timeline::{
    format_clock, resolve_active_clip, ActiveClip, ClipId, ClipRow, EditOutcome, GameId, LaneNumber, LaneRow,
    MarkerRow, Millis, ReviewSession, SelectionRow, StaticCatalog, SwitchOutcome, TeamId, TimelineConfig,
    VideoId,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use store::{GameDocument, RonFileStore};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use uuid::Uuid;
use worker::PersistenceWorker;

#[derive(Parser)]
#[command(name = "filmroom")]
#[command(about = "Multi-camera game film review")]
#[command(version)]
struct Cli {
    /// Review settings file (defaults to filmroom.ron next to the game file)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty game document
    Init {
        /// Game document path
        file: PathBuf,

        /// Number of camera lanes
        #[arg(long, default_value = "2")]
        lanes: u8,

        /// Owning team ID (random if omitted)
        #[arg(long)]
        team: Option<Uuid>,
    },

    /// Add a video to a camera lane
    Add {
        /// Game document path
        file: PathBuf,

        /// Camera lane
        #[arg(long)]
        lane: u8,

        /// Video ID (random if omitted)
        #[arg(long)]
        video: Option<Uuid>,

        /// Duration of the video in milliseconds
        #[arg(long)]
        duration: Millis,

        /// Drop position in milliseconds (end of lane if omitted)
        #[arg(long)]
        at: Option<Millis>,

        /// Clip label
        #[arg(long, default_value = "")]
        label: String,
    },

    /// Move a clip to a lane and position
    Move {
        /// Game document path
        file: PathBuf,

        /// Clip ID
        #[arg(long)]
        clip: Uuid,

        /// Target camera lane
        #[arg(long)]
        lane: u8,

        /// Target position in milliseconds
        #[arg(long)]
        at: Millis,
    },

    /// Add a phase marker
    Marker {
        /// Game document path
        file: PathBuf,

        /// Logical time in milliseconds
        #[arg(long)]
        at: Millis,

        /// Marker text
        #[arg(long)]
        label: String,
    },

    /// Show lanes, clips and gaps
    Inspect {
        /// Game document path
        file: PathBuf,

        /// Show what every camera shows at this time
        #[arg(long)]
        at: Option<Millis>,
    },

    /// Print the persisted rows as JSON lines
    Rows {
        /// Game document path
        file: PathBuf,
    },

    /// Replay the stored Director's Cut
    Replay {
        /// Game document path
        file: PathBuf,

        /// Clock step in milliseconds
        #[arg(long, default_value = "1000")]
        step: Millis,
    },
}

/// One line of `filmroom rows`
#[derive(Serialize)]
#[serde(tag = "row", rename_all = "snake_case")]
enum RowLine<'a> {
    Lane(&'a LaneRow),
    Clip(&'a ClipRow),
    Marker(&'a MarkerRow),
    Selection(&'a SelectionRow),
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Init { file, lanes, team } => init_game(&file, lanes, team),
        Commands::Add {
            file,
            lane,
            video,
            duration,
            at,
            label,
        } => {
            let config = load_config(cli.config.as_deref(), &file)?;
            add_clip(&file, config, lane, video, duration, at, label)
        }
        Commands::Move { file, clip, lane, at } => {
            let config = load_config(cli.config.as_deref(), &file)?;
            move_clip(&file, config, clip, lane, at)
        }
        Commands::Marker { file, at, label } => {
            let config = load_config(cli.config.as_deref(), &file)?;
            add_marker(&file, config, at, label)
        }
        Commands::Inspect { file, at } => inspect(&file, at),
        Commands::Rows { file } => print_rows(&file),
        Commands::Replay { file, step } => {
            let config = load_config(cli.config.as_deref(), &file)?;
            replay(&file, config, step)
        }
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("filmroom_app=info,filmroom_timeline=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(explicit: Option<&Path>, game_file: &Path) -> Result<TimelineConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => game_file
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(CONFIG_FILE_NAME),
    };
    TimelineConfig::load_or_default(&path).with_context(|| format!("Failed to read config {}", path.display()))
}

fn init_game(file: &Path, lanes: u8, team: Option<Uuid>) -> Result<()> {
    if file.exists() {
        bail!("{} already exists", file.display());
    }
    let team = team.map_or_else(TeamId::new, TeamId);
    let document = GameDocument::new_game(team, GameId::new(), lanes)?;
    let game = document.game();
    RonFileStore::create(file, document)?;
    println!("Created game {game} with {lanes} camera lane(s)");
    Ok(())
}

/// Open a session whose writes go through a persistence worker
fn open_session(
    file: &Path,
    config: TimelineConfig,
    catalog: StaticCatalog,
) -> Result<(ReviewSession<worker::QueuedStore, StaticCatalog>, PersistenceWorker)> {
    let store = RonFileStore::open(file).with_context(|| format!("Failed to open {}", file.display()))?;
    let document = store.document().clone();
    let game = document.game();
    let worker = PersistenceWorker::spawn(store);
    let session = ReviewSession::open(worker.store(document), catalog, config, game)?;
    Ok((session, worker))
}

/// Wait for queued writes and fail if any of them did not reach the disk
fn finish_writes(worker: PersistenceWorker) -> Result<()> {
    let reports = worker.finish();
    let failed: Vec<_> = reports.iter().filter(|r| r.error.is_some()).collect();
    if let Some(first) = failed.first() {
        bail!(
            "{} of {} write(s) failed; first: {} ({})",
            failed.len(),
            reports.len(),
            first.description,
            first.error.as_deref().unwrap_or_default()
        );
    }
    tracing::debug!("{} write(s) persisted", reports.len());
    Ok(())
}

fn report_edit(outcome: &EditOutcome) -> Result<()> {
    match outcome {
        EditOutcome::Applied { clip_id, position_ms, plan } => {
            println!("Placed clip {clip_id} at {} ({position_ms}ms)", format_clock(*position_ms));
            for shift in &plan.affected_clips {
                println!(
                    "  shifted {} {}ms -> {}ms",
                    shift.clip_id, shift.current_position_ms, shift.new_position_ms
                );
            }
            Ok(())
        }
        EditOutcome::Rejected { plan } => {
            bail!(
                "Placement rejected: {}",
                plan.reason.as_deref().unwrap_or("invalid shift plan")
            )
        }
    }
}

fn add_clip(
    file: &Path,
    config: TimelineConfig,
    lane: u8,
    video: Option<Uuid>,
    duration: Millis,
    at: Option<Millis>,
    label: String,
) -> Result<()> {
    let video = video.map_or_else(VideoId::new, VideoId);
    let catalog = StaticCatalog::new().with(video, duration);
    let (mut session, worker) = open_session(file, config, catalog)?;

    let outcome = session.add_clip(video, LaneNumber(lane), at, label);
    drop(session);
    finish_writes(worker)?;
    report_edit(&outcome?)
}

fn move_clip(file: &Path, config: TimelineConfig, clip: Uuid, lane: u8, at: Millis) -> Result<()> {
    let (mut session, worker) = open_session(file, config, StaticCatalog::new())?;

    let outcome = session.move_clip(ClipId(clip), LaneNumber(lane), at);
    drop(session);
    finish_writes(worker)?;
    report_edit(&outcome?)
}

fn add_marker(file: &Path, config: TimelineConfig, at: Millis, label: String) -> Result<()> {
    let (mut session, worker) = open_session(file, config, StaticCatalog::new())?;

    let marker = session.add_marker(at, label);
    drop(session);
    finish_writes(worker)?;
    println!("Added marker {} at {}", marker?.0, format_clock(at));
    Ok(())
}

fn inspect(file: &Path, at: Option<Millis>) -> Result<()> {
    let document = GameDocument::load(file).with_context(|| format!("Failed to open {}", file.display()))?;
    let timeline = document.to_timeline()?;

    println!(
        "Game {} - {} lane(s), {} total",
        timeline.id,
        timeline.lane_count(),
        format_clock(timeline.total_duration_ms())
    );
    for marker in timeline.markers() {
        println!("  [{}] {}", format_clock(marker.time_ms), marker.label);
    }

    for lane in timeline.lanes() {
        println!("Lane {} \"{}\" (sync offset {}ms)", lane.lane, lane.label, lane.sync_offset_ms);

        let mut cursor = 0;
        for clip in lane.clips() {
            if clip.lane_position_ms > cursor {
                println!("    gap {} - {}", format_clock(cursor), format_clock(clip.lane_position_ms));
            }
            println!(
                "  {} {} - {} {}",
                clip.id,
                format_clock(clip.lane_position_ms),
                format_clock(clip.end_ms()),
                clip.label
            );
            cursor = clip.end_ms();
        }

        if let Some(time) = at {
            let lane_time = lane.lane_time_ms(time);
            match resolve_active_clip(lane, lane_time) {
                ActiveClip::Clip { clip, clip_relative_time_ms } => {
                    println!(
                        "  at {} (camera {}): {} +{}ms",
                        format_clock(time),
                        format_clock(lane_time),
                        clip.display_name(),
                        clip_relative_time_ms
                    );
                }
                ActiveClip::Gap { next_clip_start_ms } => {
                    let next = next_clip_start_ms.map(|start| lane.logical_time_ms(start));
                    let message = ActiveClip::Gap { next_clip_start_ms: next }.gap_message();
                    println!("  at {}: {}", format_clock(time), message.unwrap_or_default());
                }
            }
        }
    }
    Ok(())
}

fn print_rows(file: &Path) -> Result<()> {
    let document = GameDocument::load(file).with_context(|| format!("Failed to open {}", file.display()))?;
    let rows = &document.timeline;

    let lines = rows
        .lanes
        .iter()
        .map(RowLine::Lane)
        .chain(rows.clips.iter().map(RowLine::Clip))
        .chain(rows.markers.iter().map(RowLine::Marker))
        .chain(document.selections.iter().map(RowLine::Selection));
    for line in lines {
        println!("{}", serde_json::to_string(&line)?);
    }
    Ok(())
}

fn replay(file: &Path, config: TimelineConfig, step: Millis) -> Result<()> {
    if step == 0 {
        bail!("--step must be greater than zero");
    }
    let store = RonFileStore::open(file).with_context(|| format!("Failed to open {}", file.display()))?;
    let game = store.document().game();
    let mut session = ReviewSession::open(store, StaticCatalog::new(), config, game)?;

    if !session.start_playback() {
        bail!("Game {game} has no Director's Cut");
    }
    let end = session.timeline().total_duration_ms();
    tracing::info!("Replaying {} selection(s) over {}", session.script().len(), format_clock(end));

    let mut now = 0;
    while now <= end {
        let tick = session.tick(now);
        if let Some(cue) = tick.cue {
            println!("{} cue -> camera {}", format_clock(now), cue.camera);
        }
        match tick.switch {
            Some(SwitchOutcome::Pending { ticket, seek }) => {
                session.source_ready(ticket);
                println!(
                    "{} live camera {} seeking {} +{}ms",
                    format_clock(now),
                    seek.lane,
                    seek.clip_id,
                    seek.clip_relative_ms
                );
                if let Some(gap) = seek.gap {
                    println!("    no footage at {}ms, landed at {}ms", gap.requested_ms, gap.landed_ms);
                }
            }
            Some(SwitchOutcome::NoCoverage { lane }) => {
                println!("{} camera {} has no footage, staying on {}", format_clock(now), lane, tick.live);
            }
            Some(SwitchOutcome::AlreadyLive) | None => {}
        }
        now += step;
    }
    Ok(())
}
