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

//! PlayStation 2 Graphics Synthesizer front end
//!
//! This library decodes GIF packets, tracks the GS register file, assembles
//! vertices into indexed primitive batches and hands them to a pluggable
//! renderer. It also implements local memory transfers and state freezing.
//!
//! # Example
//!
//! ```
//! use gsrx::core::gs::{GsState, NullRenderer, PacketWriter};
//!
//! let mut gs = GsState::new(NullRenderer::new());
//!
//! // An empty A+D packet
//! let packet = PacketWriter::new().ad_tag(0, true).finish();
//! gs.transfer(2, &packet).unwrap();
//! ```

pub mod core;
