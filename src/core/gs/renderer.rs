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

//! Renderer interface
//!
//! The front end never rasterizes anything itself. Completed primitive
//! batches are handed to a [`Renderer`] together with the state they must be
//! drawn with, and every local memory transfer is announced so a texture or
//! surface cache can stay coherent.

use super::context::{DrawingContext, DrawingEnvironment};
use super::registers::{Bitbltbuf, Prim};
use super::types::{PrimClass, Rect, Vertex};
use crate::core::error::RendererError;

/// One batch of primitives sharing the same state
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    /// Shared registers at the time of the draw
    pub env: &'a DrawingEnvironment,
    /// Context selected by PRIM.CTXT
    pub context: &'a DrawingContext,
    /// PRIM in effect
    pub prim: Prim,
    /// Class of every primitive in the batch
    pub class: PrimClass,
    /// Vertex window referenced by `indices`
    pub vertices: &'a [Vertex],
    /// Unrolled primitive indices, `class.index_count()` per primitive
    pub indices: &'a [u32],
    /// The last UV came through the alternate packed rounding handler
    pub packed_uv_hack: bool,
}

impl DrawCall<'_> {
    /// Number of primitives in the batch
    pub fn primitive_count(&self) -> usize {
        self.indices.len() / self.class.index_count()
    }
}

/// Consumer of assembled primitives
pub trait Renderer {
    /// Draw one batch
    ///
    /// A failure is reported back to whoever fed the command stream; the
    /// batch is discarded either way.
    fn draw(&mut self, call: &DrawCall<'_>) -> std::result::Result<(), RendererError>;

    /// Local memory inside `rect` of the destination buffer is about to change
    fn invalidate_video_mem(&mut self, _blit: Bitbltbuf, _rect: Rect) {}

    /// Local memory inside `rect` of the source buffer is about to be read
    ///
    /// `clut` is set when the read is a CLUT load.
    fn invalidate_local_mem(&mut self, _blit: Bitbltbuf, _rect: Rect, _clut: bool) {}
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn draw(&mut self, call: &DrawCall<'_>) -> std::result::Result<(), RendererError> {
        (**self).draw(call)
    }

    fn invalidate_video_mem(&mut self, blit: Bitbltbuf, rect: Rect) {
        (**self).invalidate_video_mem(blit, rect)
    }

    fn invalidate_local_mem(&mut self, blit: Bitbltbuf, rect: Rect, clut: bool) {
        (**self).invalidate_local_mem(blit, rect, clut)
    }
}

/// Renderer that discards everything but keeps counters
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer {
    /// Batches received
    pub draws: u64,
    /// Primitives received
    pub primitives: u64,
    /// Vertices referenced
    pub vertices: u64,
    /// Video memory invalidations received
    pub invalidations: u64,
}

impl NullRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for NullRenderer {
    fn draw(&mut self, call: &DrawCall<'_>) -> std::result::Result<(), RendererError> {
        self.draws += 1;
        self.primitives += call.primitive_count() as u64;
        self.vertices += call.vertices.len() as u64;
        Ok(())
    }

    fn invalidate_video_mem(&mut self, _blit: Bitbltbuf, _rect: Rect) {
        self.invalidations += 1;
    }
}
