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

//! GS module tests
//!
//! Tests are organized into the following modules:
//! - `fixtures`: Recording renderer and packet helpers shared by the tests
//! - `gif`: GIF tag decoding, path cursors and soft reset
//! - `registers`: Register dispatch, flush-on-change and derived state
//! - `vertex`: Vertex kick, culling and index generation
//! - `flush`: Batch flushing, carry-over and renderer failures
//! - `transfer`: Host to local, local to host and local to local transfers
//! - `freeze`: Freeze and defrost
//! - `properties`: Property tests over generated packets

mod registers;
