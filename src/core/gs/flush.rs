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

//! Batch flushing
//!
//! A flush hands every queued primitive to the renderer in one draw call
//! and rewinds the queues. Vertices of a strip or fan that is still being
//! built are carried over to the start of the queue so the primitive can be
//! completed after the flush.

use log::{debug, warn};

use super::renderer::{DrawCall, Renderer};
use super::types::{PrimType, PsmInfo, Vertex};
use super::GsState;
use crate::core::error::{GsError, Result};

impl<R: Renderer> GsState<R> {
    /// Draw queued primitives and push out buffered image data
    ///
    /// # Returns
    ///
    /// `Err(GsError::Renderer)` if a draw failed since the last call that
    /// reported errors.
    pub fn flush(&mut self) -> Result<()> {
        self.flush_all();
        self.take_pending_error()
    }

    /// Flush without reporting renderer errors
    pub(crate) fn flush_all(&mut self) {
        self.flush_write();
        self.flush_prim();
    }

    /// Hand queued primitives to the renderer
    pub(crate) fn flush_prim(&mut self) {
        if self.index.tail == 0 {
            return;
        }

        let prim_type = PrimType::from_bits(self.env.prim.prim());
        let head = self.vertex.head;
        let tail = self.vertex.tail;
        let next = self.vertex.next;

        // Vertices of the primitive under construction
        let mut carry = [Vertex::default(); 2];
        let mut unused = 0;

        if tail > head {
            match prim_type {
                PrimType::Point | PrimType::Invalid => {}
                PrimType::Line
                | PrimType::LineStrip
                | PrimType::Sprite
                | PrimType::Triangle
                | PrimType::TriangleStrip => {
                    unused = (tail - head).min(carry.len());
                    carry[..unused].copy_from_slice(&self.vertex.buff[head..head + unused]);
                }
                PrimType::TriangleFan => {
                    carry[0] = self.vertex.buff[head];
                    unused = 1;

                    if tail - 1 > head {
                        carry[1] = self.vertex.buff[tail - 1];
                        unused = 2;
                    }
                }
            }
        }

        let ctx = &self.env.ctxt[self.ctx_index];
        let frame_fmt = PsmInfo::of(ctx.frame.psm()).fmt;
        let z_fmt = PsmInfo::of(ctx.zbuf.psm()).fmt;
        let z_unused = ctx.zbuf.zmsk() != 0 && ctx.test.ztst() == 1;
        if frame_fmt >= 3 || (z_fmt >= 3 && !z_unused) {
            warn!(
                "Possible invalid draw: FRAME psm {:#04x}, ZBUF psm {:#04x}",
                ctx.frame.psm(),
                ctx.zbuf.psm()
            );
        }

        let call = DrawCall {
            env: &self.env,
            context: ctx,
            prim: self.env.prim,
            class: prim_type.class(),
            vertices: &self.vertex.buff[..tail],
            indices: &self.index.buff[..self.index.tail],
            packed_uv_hack: self.packed_uv_hack,
        };

        debug!(
            "Flushing {} primitives ({:?}, {} vertices, context {})",
            call.primitive_count(),
            call.class,
            tail,
            self.ctx_index + 1
        );

        if let Err(err) = self.renderer.draw(&call) {
            self.record_error(err.into());
        }

        self.index.tail = 0;
        self.vertex.head = 0;

        if unused > 0 {
            self.vertex.buff[..unused].copy_from_slice(&carry[..unused]);
            self.vertex.tail = unused;
            self.vertex.next = if next > head { next - head } else { 0 };
        } else {
            self.vertex.tail = 0;
            self.vertex.next = 0;
        }
    }

    /// Keep the first failure for the caller, log the rest
    pub(crate) fn record_error(&mut self, err: GsError) {
        if self.pending_error.is_some() {
            warn!("Dropping renderer error after an earlier one: {}", err);
            return;
        }

        warn!("Renderer failed: {}", err);
        self.pending_error = Some(err);
    }

    /// Report a recorded failure once
    pub(crate) fn take_pending_error(&mut self) -> Result<()> {
        match self.pending_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
