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

//! Custom assertions for front end testing

use gsrx::core::gs::{psm, GsState, LocalMemory, MemOffset, Renderer};

/// Assert a 32-bit pixel of the buffer at block 0, width 64
#[allow(dead_code)]
pub fn assert_pixel(mem: &LocalMemory, x: u32, y: u32, expected: u32) {
    let actual = mem.read_pixel(&MemOffset::new(0, 1, psm::CT32), x, y);
    assert_eq!(
        actual, expected,
        "Pixel at ({}, {}) mismatch: expected 0x{:08X}, got 0x{:08X}",
        x, y, expected, actual
    );
}

/// Assert every path is waiting for a tag
#[allow(dead_code)]
pub fn assert_paths_idle<R: Renderer>(gs: &GsState<R>) {
    for i in 0..4 {
        let path = gs.path(i).expect("Path index in range");
        assert!(
            path.is_idle(),
            "Path {} mid-packet with {} loops left",
            i,
            path.nloop()
        );
    }
}

/// Assert nothing is waiting in the vertex or index queues
#[allow(dead_code)]
pub fn assert_queues_empty<R: Renderer>(gs: &GsState<R>) {
    assert!(
        gs.queued_indices().is_empty(),
        "{} indices still queued",
        gs.queued_indices().len()
    );
    assert_eq!(gs.vertex_cursors(), (0, 0, 0), "Vertex cursors not reset");
}
