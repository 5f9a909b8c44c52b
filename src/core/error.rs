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

/// GS front end error types
use thiserror::Error;

/// Result type for GS operations
pub type Result<T> = std::result::Result<T, GsError>;

/// Main error type for the GS front end
#[derive(Error, Debug)]
pub enum GsError {
    #[error("Invalid GIF path index: {index} (valid range: 0-3)")]
    InvalidPath { index: usize },

    #[error("Failed to grow vertex buffer to {requested} vertices")]
    OutOfMemory { requested: usize },

    #[error("Renderer error: {0}")]
    Renderer(#[from] RendererError),

    #[error("Truncated save state: needed {needed} bytes, {available} available")]
    StateTruncated { needed: usize, available: usize },

    #[error("Unsupported save state version {found} (newest supported: {supported})")]
    UnsupportedStateVersion { found: u32, supported: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Save state error: {0}")]
    SaveState(String),
}

/// Errors reported by a renderer backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RendererError {
    #[error("Rendering backend error: {0}")]
    Backend(String),

    #[error("Unsupported draw: {0}")]
    Unsupported(String),
}
