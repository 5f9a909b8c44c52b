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

//! Save state files
//!
//! A save state wraps a frozen GS image (see [`GsState::freeze`]) together
//! with the configuration it was captured under and some metadata, and
//! stores the lot as a bincode file.
//!
//! # Version Compatibility
//!
//! The container carries its own version number. Loading a file with a
//! different container version fails; the frozen image inside keeps its own
//! version and is checked by [`GsState::defrost`].
//!
//! # Example
//!
//! ```no_run
//! use gsrx::core::gs::{GsState, NullRenderer};
//! use gsrx::core::save_state::GsSaveState;
//!
//! let mut gs = GsState::new(NullRenderer::new());
//! // ... feed GIF data ...
//!
//! let state = GsSaveState::capture(&mut gs, "after boot logo").unwrap();
//! state.save_to_file("gs.state").unwrap();
//!
//! let loaded = GsSaveState::load_from_file("gs.state").unwrap();
//! loaded.restore(&mut gs).unwrap();
//! ```

use bincode::{config, Decode, Encode};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::core::config::GsConfig;
use crate::core::error::{GsError, Result};
use crate::core::gs::{GsState, Renderer};

/// Save state container version
///
/// Incremented whenever the container layout changes in a way that breaks
/// backward compatibility.
pub const SAVE_STATE_VERSION: u32 = 1;

/// Complete GS save state
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
#[bincode(encode_bounds = "", decode_bounds = "")]
pub struct GsSaveState {
    /// Container version
    pub version: u32,

    /// Save state metadata
    pub metadata: SaveStateMetadata,

    /// Configuration the GS was running with
    #[bincode(with_serde)]
    pub config: GsConfig,

    /// Frame skip flag at capture time
    pub frame_skip: bool,

    /// Frozen GS image
    pub image: Vec<u8>,
}

/// Save state metadata
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
#[bincode(encode_bounds = "", decode_bounds = "")]
pub struct SaveStateMetadata {
    /// Timestamp when the save state was created
    #[bincode(with_serde)]
    pub timestamp: DateTime<Utc>,

    /// Free form description
    pub label: String,

    /// Version of the frozen image
    pub image_version: u32,
}

impl GsSaveState {
    /// Capture the state of a running GS
    ///
    /// Pending primitives are flushed to the renderer first.
    ///
    /// # Arguments
    ///
    /// * `gs` - GS to capture
    /// * `label` - Description stored in the metadata
    pub fn capture<R: Renderer>(gs: &mut GsState<R>, label: &str) -> Result<Self> {
        let image = gs.freeze()?;

        Ok(Self {
            version: SAVE_STATE_VERSION,
            metadata: SaveStateMetadata {
                timestamp: Utc::now(),
                label: label.to_string(),
                image_version: crate::core::gs::STATE_VERSION,
            },
            config: *gs.config(),
            frame_skip: gs.frame_skip(),
            image,
        })
    }

    /// Put a GS back into the captured state
    pub fn restore<R: Renderer>(&self, gs: &mut GsState<R>) -> Result<()> {
        gs.reconfigure(self.config)?;
        gs.set_frame_skip(self.frame_skip);
        gs.defrost(&self.image)?;

        info!(
            "Restored save state '{}' from {}",
            self.metadata.label,
            self.metadata.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
        Ok(())
    }

    /// Save to a file
    ///
    /// # Arguments
    ///
    /// * `path` - File path to save to
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let config = config::standard();
        let encoded = bincode::encode_to_vec(self, config)
            .map_err(|e| GsError::SaveState(e.to_string()))?;
        let mut file = File::create(path)?;
        file.write_all(&encoded)?;
        Ok(())
    }

    /// Load from a file
    ///
    /// # Arguments
    ///
    /// * `path` - File path to load from
    ///
    /// # Returns
    ///
    /// The loaded state, or an error if the file cannot be read, decoded, or
    /// was written by an incompatible container version
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;

        let config = config::standard();
        let (state, _): (GsSaveState, usize) = bincode::decode_from_slice(&buffer, config)
            .map_err(|e| GsError::SaveState(e.to_string()))?;

        if state.version != SAVE_STATE_VERSION {
            return Err(GsError::SaveState(format!(
                "Incompatible save state version: expected {}, got {}",
                SAVE_STATE_VERSION, state.version
            )));
        }

        Ok(state)
    }
}
