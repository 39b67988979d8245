// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk simulator — replays synthetic detector output through a scan
// session and prints what the camera UI would see, as JSON lines.
//
// Entry point. Initialises logging, loads the session config, and runs the
// selected scenarios.

mod scenarios;

use std::path::PathBuf;
use std::sync::mpsc;

use clap::Parser;
use scanwerk_core::{FrameSize, ScanMode, SessionConfig};
use scanwerk_vision::{FrameInput, ScanEvent, ScanSession};

use scenarios::Scenario;

/// Replay synthetic corner streams through the auto-capture core.
#[derive(Parser, Debug)]
#[command(name = "scanwerk-sim")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scenarios to run (all of them when omitted).
    #[arg(value_enum)]
    scenarios: Vec<Scenario>,

    /// JSON session config file. Overrides --mode.
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Scan-mode preset.
    #[arg(long, short = 'm', value_enum, default_value = "document")]
    mode: ModeArg,

    /// Preview frame width in pixels.
    #[arg(long, default_value = "1000")]
    width: u32,

    /// Preview frame height in pixels.
    #[arg(long, default_value = "1000")]
    height: u32,

    /// Frames per scenario.
    #[arg(long, default_value = "120")]
    frames: usize,

    /// Milliseconds between frames.
    #[arg(long, default_value = "50")]
    interval: u64,

    /// Print a report line for every frame, not just captures.
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum ModeArg {
    Document,
    Receipt,
    IdCard,
    Book,
}

impl From<ModeArg> for ScanMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Document => ScanMode::Document,
            ModeArg::Receipt => ScanMode::Receipt,
            ModeArg::IdCard => ScanMode::IdCard,
            ModeArg::Book => ScanMode::Book,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    tracing::info!("Scanwerk simulator starting");

    let config = match &args.config {
        Some(path) => match SessionConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(error = %e, path = %path.display(), "could not load session config");
                std::process::exit(2);
            }
        },
        None => SessionConfig::for_mode(args.mode.into()),
    };

    let frame = match FrameSize::try_new(args.width, args.height) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::error!(error = %e, "invalid frame size");
            std::process::exit(2);
        }
    };

    let scenarios = if args.scenarios.is_empty() {
        Scenario::ALL.to_vec()
    } else {
        args.scenarios.clone()
    };

    for scenario in scenarios {
        run(scenario, config, frame, &args);
    }
}

/// Replay one scenario and print its captures and a summary line.
fn run(scenario: Scenario, config: SessionConfig, frame: FrameSize, args: &Args) {
    let (tx, rx) = mpsc::channel::<ScanEvent>();
    let mut session = ScanSession::new(config).with_sink(tx);
    let span = tracing::info_span!("scenario", ?scenario, session = %session.id());
    let _guard = span.enter();

    let mut peak = 0u8;
    let mut captures = 0usize;
    for (i, quad) in scenario.corners(frame, args.frames).into_iter().enumerate() {
        let input = FrameInput::new(quad, frame, i as u64 * args.interval);
        let report = session.process_frame(input);
        peak = peak.max(report.score.overall);

        if args.verbose {
            print_json(&report);
        }
        for event in rx.try_iter() {
            captures += 1;
            print_json(&event);
        }
    }

    let summary = serde_json::json!({
        "scenario": format!("{scenario:?}"),
        "session": session.id(),
        "frames": args.frames,
        "captures": captures,
        "lastCaptureMs": session.controller().last_capture(),
        "peakOverall": peak,
        "averageOverall": session.controller().average_quality(1000),
    });
    print_json(&summary);
}

fn print_json(value: &impl serde::Serialize) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::warn!(error = %e, "could not serialise output line"),
    }
}
