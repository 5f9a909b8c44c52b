// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fs;

use clap::Parser;
use log::{error, info};
use serde::Serialize;

use gsrx::core::config::GsConfig;
use gsrx::core::error::{GsError, Result};
use gsrx::core::gs::{GsState, NullRenderer, TransferPhase};
use gsrx::core::save_state::GsSaveState;

/// Replay a captured GIF stream through the GS front end
#[derive(Parser)]
#[command(name = "gsrx")]
#[command(about = "PlayStation 2 GS command front end", long_about = None)]
struct Args {
    /// Raw GIF packet dump (little-endian qwords)
    dump_file: String,

    /// GIF path to feed (0-3)
    #[arg(short = 'p', long, default_value = "2")]
    path: usize,

    /// Front end configuration file (TOML)
    #[arg(short = 'c', long)]
    config: Option<String>,

    /// Feed the dump in chunks of this many qwords (0 = all at once)
    #[arg(long, default_value = "0")]
    chunk: usize,

    /// Skip drawing while still tracking state
    #[arg(long)]
    frame_skip: bool,

    /// Restore this save state before replaying
    #[arg(long)]
    load_state: Option<String>,

    /// Write a save state after replaying
    #[arg(long)]
    save_state: Option<String>,

    /// Print the replay summary as JSON
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// What a replay produced
#[derive(Debug, Serialize)]
struct ReplaySummary {
    bytes: usize,
    draws: u64,
    primitives: u64,
    vertices: u64,
    invalidations: u64,
    path_idle: bool,
    transfer_pending: bool,
}

fn main() -> Result<()> {
    // Pick up RUST_LOG and friends from a local .env when present
    if let Err(e) = dotenvy::dotenv() {
        if !e.to_string().contains("not found") {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    let args = Args::parse();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    match args.verbose {
        0 => {}
        1 => {
            logger.filter_level(log::LevelFilter::Debug);
        }
        _ => {
            logger.filter_level(log::LevelFilter::Trace);
        }
    }
    logger.init();

    info!("gsrx v{}", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            GsConfig::load(path)?
        }
        None => GsConfig::default(),
    };

    let mut gs = GsState::with_config(NullRenderer::new(), config);
    gs.set_frame_skip(args.frame_skip);

    if let Some(path) = &args.load_state {
        info!("Restoring save state from: {}", path);
        GsSaveState::load_from_file(path)?.restore(&mut gs)?;
    }

    info!("Loading GIF dump from: {}", args.dump_file);
    let data = fs::read(&args.dump_file)?;

    let chunk = if args.chunk == 0 {
        data.len().max(1)
    } else {
        args.chunk * 16
    };

    for (i, piece) in data.chunks(chunk).enumerate() {
        // Renderer failures are reported but the stream keeps going
        if let Err(e) = gs.transfer(args.path, piece) {
            error!("Transfer {} failed: {}", i, e);
            if matches!(e, GsError::InvalidPath { .. }) {
                return Err(e);
            }
        }
    }

    if let Err(e) = gs.flush() {
        error!("Final flush failed: {}", e);
    }

    if let Some(path) = &args.save_state {
        let label = format!("after {}", args.dump_file);
        GsSaveState::capture(&mut gs, &label)?.save_to_file(path)?;
        info!("Save state written to: {}", path);
    }

    let stats = *gs.renderer();
    let summary = ReplaySummary {
        bytes: data.len(),
        draws: stats.draws,
        primitives: stats.primitives,
        vertices: stats.vertices,
        invalidations: stats.invalidations,
        path_idle: gs.path(args.path).is_some_and(|p| p.is_idle()),
        transfer_pending: gs.transfer_phase() != TransferPhase::Idle,
    };

    if args.json {
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to serialize summary: {}", e),
        }
    } else {
        info!("Replay completed");
        info!("Bytes fed: {}", summary.bytes);
        info!(
            "Draws: {} | Primitives: {} | Vertices: {}",
            summary.draws, summary.primitives, summary.vertices
        );
        info!("Video memory invalidations: {}", summary.invalidations);
        if !summary.path_idle {
            info!("Path {} stopped mid-packet", args.path);
        }
        if summary.transfer_pending {
            info!("A memory transfer is still in progress");
        }
    }

    Ok(())
}
