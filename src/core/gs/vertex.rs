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

//! Vertex assembly
//!
//! Every position register write "kicks" the sticky vertex into a queue.
//! Once enough vertices for the current topology are queued, the primitive
//! is tested against the scissor box and, if it can produce pixels, its
//! vertex indices are appended to the index queue. Strips and fans reuse
//! queued vertices, so the queue keeps a `head` (first vertex of the
//! primitive being built), a `tail` (one past the last vertex) and a `next`
//! (where the following primitive may start).

use log::debug;

use super::dispatch::VertexKick;
use super::renderer::Renderer;
use super::types::{PrimType, Vertex};
use super::GsState;
use crate::core::error::{GsError, Result};

/// Smallest vertex queue ever allocated
pub(crate) const VERTEX_BUFFER_MIN: usize = 10_000;

/// Room kept past `maxcount` so a strip can always be completed
const VERTEX_BUFFER_SLACK: usize = 3;

/// Queued vertices plus the last four kicked positions
#[derive(Debug, Clone)]
pub(crate) struct VertexQueue {
    pub buff: Vec<Vertex>,
    pub head: usize,
    pub tail: usize,
    pub next: usize,
    /// Usable capacity; the queue grows once `tail` reaches it
    pub maxcount: usize,
    /// Ring of positions relative to XYOFFSET, in 1/16 pixels
    pub xy: [[i32; 2]; 4],
    pub xy_tail: usize,
}

impl VertexQueue {
    pub fn new() -> Self {
        Self {
            buff: vec![Vertex::default(); VERTEX_BUFFER_MIN],
            head: 0,
            tail: 0,
            next: 0,
            maxcount: VERTEX_BUFFER_MIN - VERTEX_BUFFER_SLACK,
            xy: [[0; 2]; 4],
            xy_tail: 0,
        }
    }
}

/// Unrolled primitive indices into the vertex queue
#[derive(Debug, Clone)]
pub(crate) struct IndexQueue {
    pub buff: Vec<u32>,
    pub tail: usize,
}

impl IndexQueue {
    pub fn new() -> Self {
        Self {
            buff: vec![0; VERTEX_BUFFER_MIN * 3],
            tail: 0,
        }
    }

    #[inline]
    fn push(&mut self, indices: &[usize]) {
        for (slot, &i) in self.buff[self.tail..].iter_mut().zip(indices) {
            *slot = i as u32;
        }
        self.tail += indices.len();
    }
}

/// Inclusive bounds of a primitive
#[derive(Debug, Clone, Copy)]
struct Bounds {
    min: [i32; 2],
    max: [i32; 2],
}

impl Bounds {
    fn of(points: &[[i32; 2]]) -> Self {
        let mut bounds = Bounds {
            min: points[0],
            max: points[0],
        };
        for p in &points[1..] {
            for axis in 0..2 {
                bounds.min[axis] = bounds.min[axis].min(p[axis]);
                bounds.max[axis] = bounds.max[axis].max(p[axis]);
            }
        }
        bounds
    }
}

impl<R: Renderer> GsState<R> {
    /// Grow both queues by half, keeping the live vertices and indices
    ///
    /// # Returns
    ///
    /// `Err(GsError::OutOfMemory)` when the allocation fails; the old
    /// queues are left intact.
    pub(crate) fn grow_vertex_buffer(&mut self) -> Result<()> {
        let maxcount = (self.vertex.maxcount * 3 / 2).max(VERTEX_BUFFER_MIN);

        let mut vertices: Vec<Vertex> = Vec::new();
        vertices
            .try_reserve_exact(maxcount)
            .map_err(|_| GsError::OutOfMemory { requested: maxcount })?;

        let mut indices: Vec<u32> = Vec::new();
        indices
            .try_reserve_exact(maxcount * 3)
            .map_err(|_| GsError::OutOfMemory { requested: maxcount })?;

        vertices.extend_from_slice(&self.vertex.buff[..self.vertex.tail]);
        vertices.resize(maxcount, Vertex::default());
        indices.extend_from_slice(&self.index.buff[..self.index.tail]);
        indices.resize(maxcount * 3, 0);

        debug!(
            "Vertex queue grown to {} vertices ({} queued, {} indices)",
            maxcount, self.vertex.tail, self.index.tail
        );

        self.vertex.buff = vertices;
        self.vertex.maxcount = maxcount - VERTEX_BUFFER_SLACK;
        self.index.buff = indices;

        Ok(())
    }

    #[inline]
    fn grow_if_full(&mut self) -> Result<()> {
        if self.vertex.tail >= self.vertex.maxcount {
            self.grow_vertex_buffer()?;
        }
        Ok(())
    }

    /// Queue the sticky vertex and emit a primitive once enough are queued
    ///
    /// # Arguments
    ///
    /// * `kick` - Topology and auto flush mode baked into the register handler
    /// * `skip` - Queue the vertex without drawing (ADC / XYZ3 / XYZF3)
    pub(crate) fn vertex_kick(&mut self, kick: VertexKick, skip: bool) -> Result<()> {
        let ctx = &self.env.ctxt[self.ctx_index];
        let ofx = ctx.xyoffset.ofx() as i32;
        let ofy = ctx.xyoffset.ofy() as i32;
        let scissor = ctx.scissor_box;

        let q = &mut self.vertex;
        q.buff[q.tail] = self.v;
        q.xy[q.xy_tail & 3] = [
            self.v.xyz.x() as i32 - ofx,
            self.v.xyz.y() as i32 - ofy,
        ];
        q.tail += 1;
        q.xy_tail += 1;

        let n = kick.prim.vertex_count();
        let m = q.tail - q.head;
        if m < n {
            return Ok(());
        }

        let fan = kick.prim == PrimType::TriangleFan;
        let culled = if !skip && (!fan || m <= 4) {
            let xy = q.xy;
            let t = q.xy_tail;
            let v0 = xy[(t + 1) & 3];
            let v1 = xy[(t + 2) & 3];
            let v2 = xy[(t + 3) & 3];
            let v3 = xy[t.wrapping_sub(m) & 3];

            let (bounds, degenerate) = match kick.prim {
                PrimType::Point | PrimType::Invalid => (Bounds::of(&[v2]), false),
                PrimType::Line | PrimType::LineStrip => (Bounds::of(&[v1, v2]), false),
                PrimType::Sprite => {
                    let b = Bounds::of(&[v1, v2]);
                    (b, b.min[0] == b.max[0] || b.min[1] == b.max[1])
                }
                PrimType::Triangle | PrimType::TriangleStrip => {
                    let b = Bounds::of(&[v0, v1, v2]);
                    let zero_area = b.min[0] == b.max[0] || b.min[1] == b.max[1];
                    (b, zero_area || v0 == v1 || v1 == v2 || v0 == v2)
                }
                PrimType::TriangleFan => {
                    let b = Bounds::of(&[v3, v1, v2]);
                    let zero_area = b.min[0] == b.max[0] || b.min[1] == b.max[1];
                    (b, zero_area || v3 == v1 || v1 == v2 || v3 == v2)
                }
            };

            let outside = bounds.max[0] < scissor.x0
                || bounds.max[1] < scissor.y0
                || bounds.min[0] > scissor.x1
                || bounds.min[1] > scissor.y1;

            outside || degenerate
        } else {
            false
        };

        if skip || culled {
            match kick.prim {
                PrimType::Point
                | PrimType::Line
                | PrimType::Triangle
                | PrimType::Sprite
                | PrimType::Invalid => {
                    self.vertex.tail = self.vertex.head;
                }
                PrimType::LineStrip | PrimType::TriangleStrip => {
                    self.vertex.head += 1;
                    self.grow_if_full()?;
                }
                PrimType::TriangleFan => self.grow_if_full()?,
            }
            return Ok(());
        }

        self.grow_if_full()?;

        let q = &mut self.vertex;
        let head = q.head;
        match kick.prim {
            PrimType::Point => {
                self.index.push(&[head]);
                q.head = head + 1;
                q.next = head + 1;
            }
            PrimType::Line | PrimType::Sprite => {
                self.index.push(&[head, head + 1]);
                q.head = head + 2;
                q.next = head + 2;
            }
            PrimType::LineStrip => {
                if q.next < q.head {
                    q.buff.copy_within(q.head..q.head + 2, q.next);
                    q.head = q.next;
                    q.tail = q.next + 2;
                }
                let head = q.head;
                self.index.push(&[head, head + 1]);
                q.head = head + 1;
                q.next = head + 2;
            }
            PrimType::Triangle => {
                self.index.push(&[head, head + 1, head + 2]);
                q.head = head + 3;
                q.next = head + 3;
            }
            PrimType::TriangleStrip => {
                if q.next < q.head {
                    q.buff.copy_within(q.head..q.head + 3, q.next);
                    q.head = q.next;
                    q.tail = q.next + 3;
                }
                let head = q.head;
                self.index.push(&[head, head + 1, head + 2]);
                q.head = head + 1;
                q.next = head + 3;
            }
            PrimType::TriangleFan => {
                let tail = q.tail;
                self.index.push(&[head, tail - 2, tail - 1]);
                q.next = tail;
            }
            PrimType::Invalid => {
                q.tail = head;
            }
        }

        if kick.auto_flush && self.env.prim.tme() != 0 {
            let ctx = &self.env.ctxt[self.ctx_index];
            if ctx.frame.block() == ctx.tex0.tbp0() {
                self.flush_prim();
            }
        }

        Ok(())
    }
}
