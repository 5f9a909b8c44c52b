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

//! GS front end configuration
//!
//! Options that change how the front end dispatches work. They are applied
//! through [`GsState::reconfigure`](crate::core::gs::GsState::reconfigure),
//! which rebuilds every dispatch table in one step.
//!
//! # Example
//!
//! ```
//! use gsrx::core::config::GsConfig;
//!
//! let config = GsConfig::from_toml_str("auto_flush = true").unwrap();
//! assert!(config.auto_flush);
//! assert!(!config.alternate_uv_rounding);
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{GsError, Result};

/// Front end options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GsConfig {
    /// Flush after every primitive that samples the frame buffer it draws to
    pub auto_flush: bool,

    /// Route packed UV writes through the alternate rounding handler
    pub alternate_uv_rounding: bool,
}

impl GsConfig {
    /// Parse a configuration from TOML text
    ///
    /// Missing keys keep their default value.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| GsError::Config(e.to_string()))
    }

    /// Load a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Serialize to TOML text
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| GsError::Config(e.to_string()))
    }
}
