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

//! GS (Graphics Synthesizer) front end
//!
//! This module implements the command side of the PlayStation 2 Graphics
//! Synthesizer. It owns everything between the GIF and the rasterizer:
//! - Decoding GIF packets from the four GIF paths
//! - Register dispatch with flush-on-change semantics
//! - Vertex assembly into indexed primitive batches
//! - Handing batches to a [`Renderer`]
//! - Host to local, local to host and local to local memory transfers
//! - Freezing and restoring the whole state
//!
//! # GIF Paths
//!
//! | Index | Source                 | Truncated packets          |
//! |-------|------------------------|----------------------------|
//! | 0     | PATH1 (VU1 XGKICK)     | Dropped at end of transfer |
//! | 1     | PATH2 (VIF1 DIRECT)    | Resumed by the next call   |
//! | 2     | PATH3 (GIF DMA)        | Resumed by the next call   |
//! | 3     | Auxiliary              | Resumed by the next call   |
//!
//! # Coordinates
//!
//! Vertex positions arrive as unsigned 12.4 fixed point. The primitive
//! coordinate space used for scissor tests is the position minus the
//! context's XYOFFSET, still in 1/16 pixel units.
//!
//! # References
//!
//! - GS User's Manual, chapters 3 (drawing), 4 (transfers) and 7 (registers)

use bitflags::bitflags;
use log::{debug, info, trace, warn};

use crate::core::config::GsConfig;
use crate::core::error::{GsError, Result};

// Module declarations
mod context;
mod dispatch;
mod flush;
mod freeze;
mod gif;
mod local_memory;
mod registers;
mod renderer;
#[cfg(test)]
mod tests;
mod transfer;
mod types;
mod vertex;

// Public re-exports
pub use context::{ContextOffsets, DrawingContext, DrawingEnvironment, PixelOffset, ScissorBox};
pub use freeze::STATE_VERSION;
pub use gif::{GifPath, PacketWriter, PathKind, PATH_COUNT};
pub use local_memory::{LocalMemory, MemOffset, BLOCK_SIZE, VM_SIZE};
pub use registers::*;
pub use renderer::{DrawCall, NullRenderer, Renderer};
pub use transfer::{TransferDirection, TransferPhase};
pub use types::{psm, PrimClass, PrimType, PsmInfo, Rect, Vertex};

use dispatch::{ClutState, HandlerTables};
use transfer::TransferBuffer;
use vertex::{IndexQueue, VertexQueue};

bitflags! {
    /// GIF paths cleared by [`GsState::soft_reset`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SoftResetMask: u32 {
        /// PATH1 and the auxiliary path (indices 0 and 3)
        const PATH1 = 1 << 0;
        /// PATH2 (index 1)
        const PATH2 = 1 << 1;
        /// PATH3 (index 2)
        const PATH3 = 1 << 2;
    }
}

/// Graphics Synthesizer front end state
///
/// Holds the register file, the GIF paths, the vertex and index queues, the
/// transfer buffer and the 4 MiB of local memory. Completed primitive
/// batches are handed to the renderer `R` whenever a register change or a
/// transfer requires it.
///
/// # Errors
///
/// Renderer failures never interrupt command processing. The first failure
/// is kept and returned by the public call that triggered it; later
/// failures in the same call are logged.
///
/// # Examples
///
/// ```
/// use gsrx::core::gs::{addr, GsState, NullRenderer, PacketWriter, Prim, PrimType};
///
/// let mut gs = GsState::new(NullRenderer::new());
///
/// let mut prim = Prim::default();
/// prim.set_prim(PrimType::Sprite as u32);
///
/// let packet = PacketWriter::new()
///     .ad_tag(4, true)
///     .ad(addr::SCISSOR_1, (639 << 16) | (447 << 48))
///     .ad(addr::PRIM, prim.0)
///     .ad(addr::XYZ2, 0x0000_0000_0010_0010)
///     .ad(addr::XYZ2, 0x0000_0000_0100_0100)
///     .finish();
///
/// gs.transfer(2, &packet).unwrap();
/// gs.flush().unwrap();
/// assert_eq!(gs.renderer().draws, 1);
/// ```
pub struct GsState<R: Renderer> {
    renderer: R,
    config: GsConfig,
    frame_skip: bool,

    /// Register file
    env: DrawingEnvironment,

    /// Context selected by PRIM.CTXT
    ctx_index: usize,

    /// Sticky vertex attributes written by register handlers
    v: Vertex,

    /// Q carried from the last PACKED STQ to the next PACKED RGBA
    q: f32,

    /// Set when the last UV went through the alternate PACKED handler
    packed_uv_hack: bool,

    paths: [GifPath; PATH_COUNT],

    vertex: VertexQueue,
    index: IndexQueue,

    tr: TransferBuffer,
    mem: LocalMemory,

    handlers: HandlerTables,
    clut: ClutState,

    /// First renderer failure not yet reported to the caller
    pending_error: Option<GsError>,
}

impl<R: Renderer> GsState<R> {
    /// Create a GS with the default configuration
    ///
    /// # Arguments
    ///
    /// * `renderer` - Consumer of primitive batches and invalidations
    pub fn new(renderer: R) -> Self {
        Self::with_config(renderer, GsConfig::default())
    }

    /// Create a GS with an explicit configuration
    ///
    /// # Arguments
    ///
    /// * `renderer` - Consumer of primitive batches and invalidations
    /// * `config` - Behaviour switches
    pub fn with_config(renderer: R, config: GsConfig) -> Self {
        let mut gs = Self {
            renderer,
            handlers: HandlerTables::new(config.alternate_uv_rounding),
            config,
            frame_skip: false,
            env: DrawingEnvironment::new(),
            ctx_index: 0,
            v: Vertex::default(),
            q: 1.0,
            packed_uv_hack: false,
            paths: [GifPath::new(); PATH_COUNT],
            vertex: VertexQueue::new(),
            index: IndexQueue::new(),
            tr: TransferBuffer::new(),
            mem: LocalMemory::new(),
            clut: ClutState::default(),
            pending_error: None,
        };

        gs.reset();
        info!(
            "GS initialized (auto_flush={}, alternate_uv_rounding={})",
            gs.config.auto_flush, gs.config.alternate_uv_rounding
        );
        gs
    }

    /// Reset the GS to its power-on state
    ///
    /// Clears the register file, every GIF path, the sticky vertex and the
    /// vertex queue. Local memory and the renderer are left untouched.
    pub fn reset(&mut self) {
        self.paths = [GifPath::new(); PATH_COUNT];
        self.v = Vertex::default();
        self.packed_uv_hack = false;

        self.env.reset();
        self.update_context();
        self.update_vertex_kick();
        self.env.update_dimx();
        for ctx in self.env.ctxt.iter_mut() {
            ctx.update_derived();
        }

        self.vertex.head = 0;
        self.vertex.tail = 0;
        self.vertex.next = 0;
        self.index.tail = 0;
        self.tr.active = false;

        debug!("GS reset");
    }

    /// Current configuration
    pub fn config(&self) -> &GsConfig {
        &self.config
    }

    /// Switch configuration
    ///
    /// Pending primitives are drawn under the old configuration before the
    /// dispatch tables are rebuilt.
    pub fn reconfigure(&mut self, config: GsConfig) -> Result<()> {
        self.flush_all();
        self.config = config;
        self.handlers = HandlerTables::new(config.alternate_uv_rounding);
        self.update_vertex_kick();
        info!(
            "GS reconfigured (auto_flush={}, alternate_uv_rounding={})",
            config.auto_flush, config.alternate_uv_rounding
        );
        self.take_pending_error()
    }

    /// Enable or disable frame skipping
    ///
    /// While skipping, position registers are ignored so no primitive is
    /// assembled; every other register keeps being tracked.
    pub fn set_frame_skip(&mut self, skip: bool) {
        if self.frame_skip == skip {
            return;
        }

        self.frame_skip = skip;
        self.update_vertex_kick();
        debug!("Frame skip {}", if skip { "on" } else { "off" });
    }

    /// Whether frame skipping is active
    pub fn frame_skip(&self) -> bool {
        self.frame_skip
    }

    /// Feed GIF data into a path
    ///
    /// # Arguments
    ///
    /// * `index` - Path index (0-3)
    /// * `data` - Whole 128-bit units; a trailing partial unit is ignored
    ///
    /// # Returns
    ///
    /// - `Ok(())` when the data was consumed
    /// - `Err(GsError::InvalidPath)` for an index outside 0-3
    /// - `Err(GsError::OutOfMemory)` when the vertex queue could not grow
    /// - `Err(GsError::Renderer)` when a batch drawn during the call failed
    pub fn transfer(&mut self, index: usize, data: &[u8]) -> Result<()> {
        if index >= PATH_COUNT {
            return Err(GsError::InvalidPath { index });
        }

        let size = data.len() / 16;
        if data.len() % 16 != 0 {
            warn!(
                "GIF path {} transfer of {} bytes is not qword aligned, ignoring {} trailing bytes",
                index,
                data.len(),
                data.len() % 16
            );
        }

        trace!("GIF path {} transfer of {} qwords", index, size);

        let mut path = self.paths[index];
        let result = self.transfer_path(index, &mut path, &data[..size * 16]);
        self.paths[index] = path;

        result?;
        self.take_pending_error()
    }

    /// Decode qwords into `path` until the data runs out
    fn transfer_path(&mut self, index: usize, path: &mut GifPath, mem: &[u8]) -> Result<()> {
        let mut pos = 0usize;
        let mut size = mem.len() / 16;

        while size > 0 {
            if path.nloop == 0 {
                let mut tag = [0u8; 16];
                tag.copy_from_slice(&mem[pos..pos + 16]);
                path.set_tag(GifTag::from_bytes(&tag));

                pos += 16;
                size -= 1;

                if path.nloop > 0 {
                    self.q = 1.0;

                    if path.tag.pre() && path.tag.format() == GifFormat::Packed {
                        self.apply_prim(path.tag.prim());
                    }
                }
            } else {
                match path.tag.format() {
                    GifFormat::Packed => {
                        // Finish a loop left open by the previous call
                        if path.reg != 0 {
                            loop {
                                let handler = self.handlers.packed[path.get_reg() as usize];
                                self.apply_packed(handler, &mem[pos..pos + 16])?;
                                pos += 16;
                                size -= 1;

                                if !path.step_reg() || size == 0 || path.reg == 0 {
                                    break;
                                }
                            }
                        }

                        if path.nloop > 0 && size > 0 {
                            let total = path.nloop as usize * path.nreg as usize;

                            if size >= total {
                                self.run_packed_block(path, &mem[pos..pos + total * 16])?;
                                pos += total * 16;
                                size -= total;
                                path.nloop = 0;
                            } else {
                                loop {
                                    let handler = self.handlers.packed[path.get_reg() as usize];
                                    self.apply_packed(handler, &mem[pos..pos + 16])?;
                                    pos += 16;
                                    size -= 1;

                                    if !path.step_reg() || size == 0 {
                                        break;
                                    }
                                }
                            }
                        }
                    }
                    GifFormat::Reglist => {
                        let mut words = size * 2;

                        loop {
                            let handler = self.handlers.reg[(path.get_reg() & 0x7f) as usize];
                            let data = dispatch::low_u64(&mem[pos..pos + 8]);
                            self.apply_reg(handler, data)?;
                            pos += 8;
                            words -= 1;

                            if !path.step_reg() || words == 0 {
                                break;
                            }
                        }

                        // A packet with an odd number of words is padded to a qword
                        if words & 1 == 1 {
                            pos += 8;
                        }

                        size = words / 2;
                    }
                    GifFormat::Image | GifFormat::Image2 => {
                        let len = size.min(path.nloop as usize);

                        match self.env.trxdir.xdir() {
                            0 => self.write(&mem[pos..pos + len * 16]),
                            2 => self.move_rect(),
                            _ => {}
                        }

                        pos += len * 16;
                        path.nloop -= len as u32;
                        size -= len;
                    }
                }
            }

            if index == 0 && path.tag.eop() && path.nloop == 0 {
                break;
            }
        }

        if index == 0 && size == 0 && path.nloop > 0 {
            debug!(
                "PATH1 packet truncated with {} loops left, dropping the rest",
                path.nloop
            );
            path.nloop = 0;
        }

        Ok(())
    }

    /// Run `nloop` complete loops of a PACKED tag
    fn run_packed_block(&mut self, path: &GifPath, block: &[u8]) -> Result<()> {
        match path.kind {
            PathKind::AdOnly => {
                for q in block.chunks_exact(16) {
                    self.apply_address_data(q)?;
                }
            }
            PathKind::StqRgbaXyzf2 | PathKind::StqRgbaXyz2 => {
                let position = if path.kind == PathKind::StqRgbaXyzf2 {
                    packed::XYZF2
                } else {
                    packed::XYZ2
                };
                let stq = self.handlers.packed[packed::STQ as usize];
                let rgba = self.handlers.packed[packed::RGBA as usize];
                let xyz = self.handlers.packed[position as usize];

                for v in block.chunks_exact(48) {
                    self.apply_packed(stq, &v[..16])?;
                    self.apply_packed(rgba, &v[16..32])?;
                    self.apply_packed(xyz, &v[32..])?;
                }
            }
            PathKind::Generic => {
                let mut reg = 0;
                for q in block.chunks_exact(16) {
                    let handler = self.handlers.packed[path.reg_at(reg) as usize];
                    self.apply_packed(handler, q)?;
                    reg += 1;
                    if reg == path.nreg {
                        reg = 0;
                    }
                }
            }
        }
        Ok(())
    }

    /// Clear the GIF paths selected by `mask`
    ///
    /// Also cancels any transfer direction in TRXDIR and resets the carried
    /// Q to 1.0. Calling it twice in a row has the same effect as once.
    pub fn soft_reset(&mut self, mask: SoftResetMask) {
        if mask.contains(SoftResetMask::PATH1) {
            self.paths[0] = GifPath::new();
            self.paths[3] = GifPath::new();
        }
        if mask.contains(SoftResetMask::PATH2) {
            self.paths[1] = GifPath::new();
        }
        if mask.contains(SoftResetMask::PATH3) {
            self.paths[2] = GifPath::new();
        }

        self.env.trxdir.set_xdir(3);
        self.tr.active = false;
        self.q = 1.0;

        debug!("GIF soft reset ({:?})", mask);
    }

    /// Write one register through its A+D address
    ///
    /// # Arguments
    ///
    /// * `addr` - A+D register address (7 bits)
    /// * `data` - 64-bit register value
    pub fn write_register(&mut self, addr: u8, data: u64) -> Result<()> {
        let handler = self.handlers.reg[(addr & 0x7f) as usize];
        self.apply_reg(handler, data)?;
        self.take_pending_error()
    }

    /// Select the context named by PRIM.CTXT
    pub(crate) fn update_context(&mut self) {
        self.ctx_index = self.env.prim.ctxt() as usize;
    }

    /// Rebuild the position register handlers for the current PRIM
    pub(crate) fn update_vertex_kick(&mut self) {
        self.handlers.update_vertex_kick(
            PrimType::from_bits(self.env.prim.prim()),
            self.config.auto_flush,
            self.frame_skip,
        );
    }

    /// Register file
    pub fn env(&self) -> &DrawingEnvironment {
        &self.env
    }

    /// Context selected by PRIM.CTXT
    pub fn context(&self) -> &DrawingContext {
        &self.env.ctxt[self.ctx_index]
    }

    /// Index (0 or 1) of the selected context
    pub fn context_index(&self) -> usize {
        self.ctx_index
    }

    /// Sticky vertex attributes
    pub fn vertex(&self) -> &Vertex {
        &self.v
    }

    /// Q carried between PACKED STQ and RGBA
    pub fn q(&self) -> f32 {
        self.q
    }

    /// GIF path decoder state
    pub fn path(&self, index: usize) -> Option<&GifPath> {
        self.paths.get(index)
    }

    /// Vertices queued but not yet drawn
    pub fn queued_vertices(&self) -> &[Vertex] {
        &self.vertex.buff[..self.vertex.tail]
    }

    /// Indices of primitives queued but not yet drawn
    pub fn queued_indices(&self) -> &[u32] {
        &self.index.buff[..self.index.tail]
    }

    /// Vertex queue cursors as `(head, tail, next)`
    pub fn vertex_cursors(&self) -> (usize, usize, usize) {
        (self.vertex.head, self.vertex.tail, self.vertex.next)
    }

    /// Current vertex queue capacity before growth
    pub fn vertex_capacity(&self) -> usize {
        self.vertex.maxcount
    }

    /// Local memory
    pub fn local_memory(&self) -> &LocalMemory {
        &self.mem
    }

    /// Local memory, mutably
    pub fn local_memory_mut(&mut self) -> &mut LocalMemory {
        &mut self.mem
    }

    /// Renderer
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Renderer, mutably
    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Consume the GS and return its renderer
    pub fn into_renderer(self) -> R {
        self.renderer
    }
}
