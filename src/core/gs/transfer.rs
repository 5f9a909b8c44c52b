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

//! Local memory transfers
//!
//! TRXDIR starts one of three transfers over the rectangle described by
//! BITBLTBUF, TRXPOS and TRXREG:
//! - Host to local: image data arrives through IMAGE packets or HWREG and
//!   is staged in a transfer buffer until the rectangle is complete or a
//!   register change forces it out
//! - Local to host: pixels are read back through [`GsState::read_fifo`]
//! - Local to local: the rectangle is copied immediately, honouring the
//!   scan direction bits so overlapping copies stay intact

use log::{debug, trace, warn};

use super::local_memory::{MemOffset, VM_SIZE};
use super::registers::Bitbltbuf;
use super::renderer::Renderer;
use super::types::{PsmInfo, Rect};
use super::GsState;
use crate::core::error::Result;

/// Direction of a memory transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferDirection {
    /// Image data flows from the host into local memory
    HostToLocal,
    /// Image data flows from local memory to the host
    LocalToHost,
}

/// Progress of the current memory transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferPhase {
    /// No transfer set up, or the last one completed
    Idle,
    /// TRXDIR was written but no data moved yet
    Armed(TransferDirection),
    /// Some of the rectangle has been transferred
    Streaming(TransferDirection),
}

/// Staging area for host to local data
#[derive(Debug, Clone)]
pub(crate) struct TransferBuffer {
    /// Cursor inside the rectangle
    pub x: u32,
    pub y: u32,
    /// Bytes of `buff` already written to local memory
    pub start: usize,
    /// Bytes of `buff` received
    pub end: usize,
    /// Size of the rectangle in bytes, 0 until the first data arrives
    pub total: usize,
    pub overflow: bool,
    /// BITBLTBUF at the time TRXDIR was written
    pub blit: Bitbltbuf,
    pub active: bool,
    pub buff: Vec<u8>,
}

impl TransferBuffer {
    pub fn new() -> Self {
        Self {
            x: 0,
            y: 0,
            start: 0,
            end: 0,
            total: 0,
            overflow: false,
            blit: Bitbltbuf::default(),
            active: false,
            buff: vec![0; VM_SIZE],
        }
    }

    /// Arm a new transfer starting at `(x, y)`
    pub fn init(&mut self, x: u32, y: u32, blit: Bitbltbuf) {
        self.x = x;
        self.y = y;
        self.total = 0;
        self.blit = blit;
        self.active = true;
    }

    /// Size the transfer on first use and clamp `len` to what is left
    ///
    /// # Returns
    ///
    /// `true` if any bytes remain to be transferred
    pub fn update(&mut self, tw: u32, th: u32, trbpp: u32, len: &mut usize) -> bool {
        if self.total == 0 {
            self.start = 0;
            self.end = 0;
            self.total = (((tw * trbpp) >> 3) as usize * th as usize).min(VM_SIZE);
            self.overflow = false;
        }

        let remaining = self.total - self.end;
        if *len > remaining {
            if !self.overflow {
                self.overflow = true;
                warn!(
                    "Transfer of {} bytes overflows the {} bytes left in the rectangle",
                    *len, remaining
                );
            }
            *len = remaining;
        }

        *len > 0
    }
}

impl<R: Renderer> GsState<R> {
    /// Progress of the current memory transfer
    pub fn transfer_phase(&self) -> TransferPhase {
        if !self.tr.active {
            return TransferPhase::Idle;
        }

        let direction = match self.env.trxdir.xdir() {
            0 => TransferDirection::HostToLocal,
            1 => TransferDirection::LocalToHost,
            _ => return TransferPhase::Idle,
        };

        if self.tr.total == 0 {
            TransferPhase::Armed(direction)
        } else if self.tr.end < self.tr.total || self.tr.start < self.tr.end {
            TransferPhase::Streaming(direction)
        } else {
            TransferPhase::Idle
        }
    }

    /// Destination rectangle of the current transfer
    fn destination_rect(&self) -> Rect {
        let pos = self.env.trxpos;
        let reg = self.env.trxreg;
        Rect::from_origin(pos.dsax(), pos.dsay(), reg.rrw(), reg.rrh())
    }

    /// Source rectangle of the current transfer
    fn source_rect(&self) -> Rect {
        let pos = self.env.trxpos;
        let reg = self.env.trxreg;
        Rect::from_origin(pos.ssax(), pos.ssay(), reg.rrw(), reg.rrh())
    }

    /// Accept host to local image data
    pub(crate) fn write(&mut self, mem: &[u8]) {
        let blit = self.tr.blit;
        let trbpp = PsmInfo::of(blit.dpsm()).trbpp;
        let (w, h) = (self.env.trxreg.rrw(), self.env.trxreg.rrh());

        let mut len = mem.len();
        if !self.tr.update(w, h, trbpp, &mut len) {
            return;
        }

        trace!(
            "Image write of {} bytes to {:#06x} ({}/{} received)",
            len,
            blit.dbp(),
            self.tr.end + len,
            self.tr.total
        );

        // Drawing from the area being replaced must finish first
        let ctx = &self.env.ctxt[self.ctx_index];
        if self.env.prim.tme() != 0
            && (blit.dbp() == ctx.tex0.tbp0() || blit.dbp() == ctx.tex0.cbp())
        {
            self.flush_prim();
        }

        if self.tr.end == 0 && len >= self.tr.total {
            // Whole rectangle in one go, skip the staging copy
            let total = self.tr.total;
            let rect = self.destination_rect();
            self.renderer.invalidate_video_mem(blit, rect);

            self.mem.write_image(
                &mut self.tr.x,
                &mut self.tr.y,
                &mem[..total],
                blit,
                self.env.trxpos,
                self.env.trxreg,
            );

            self.tr.start = total;
            self.tr.end = total;
        } else {
            let end = self.tr.end;
            self.tr.buff[end..end + len].copy_from_slice(&mem[..len]);
            self.tr.end += len;

            if self.tr.end >= self.tr.total {
                self.flush_write();
            }
        }
    }

    /// Write staged image data to local memory
    pub(crate) fn flush_write(&mut self) {
        if self.tr.end <= self.tr.start {
            return;
        }

        let blit = self.env.bitbltbuf;
        let rect = self.destination_rect();
        self.renderer.invalidate_video_mem(blit, rect);

        let consumed = self.mem.write_image(
            &mut self.tr.x,
            &mut self.tr.y,
            &self.tr.buff[self.tr.start..self.tr.end],
            blit,
            self.env.trxpos,
            self.env.trxreg,
        );

        trace!(
            "Flushed {} staged bytes, cursor at ({}, {})",
            consumed,
            self.tr.x,
            self.tr.y
        );

        // A partial pixel stays staged until the rest of it arrives
        self.tr.start = if consumed == 0 {
            self.tr.end
        } else {
            self.tr.start + consumed
        };
    }

    /// Read local to host data
    ///
    /// Pending primitives are drawn first so the read sees their pixels.
    ///
    /// # Arguments
    ///
    /// * `out` - Destination; at most the bytes left in the rectangle are written
    ///
    /// # Returns
    ///
    /// Number of bytes written to `out`
    pub fn read_fifo(&mut self, out: &mut [u8]) -> Result<usize> {
        self.flush_all();

        let blit = self.env.bitbltbuf;
        let trbpp = PsmInfo::of(blit.spsm()).trbpp;
        let (w, h) = (self.env.trxreg.rrw(), self.env.trxreg.rrh());

        let mut len = out.len();
        if !self.tr.update(w, h, trbpp, &mut len) {
            self.take_pending_error()?;
            return Ok(0);
        }

        let pos = self.env.trxpos;
        if self.tr.x == pos.ssax() && self.tr.y == pos.ssay() {
            let rect = self.source_rect();
            self.renderer.invalidate_local_mem(blit, rect, false);
        }

        let produced = self.mem.read_image(
            &mut self.tr.x,
            &mut self.tr.y,
            &mut out[..len],
            blit,
            pos,
            self.env.trxreg,
        );

        self.tr.end += len;
        self.tr.start = self.tr.end;

        trace!("Read {} bytes from local memory", produced);

        self.take_pending_error()?;
        Ok(produced)
    }

    /// Local to local rectangle copy
    pub(crate) fn move_rect(&mut self) {
        let blit = self.env.bitbltbuf;
        let pos = self.env.trxpos;
        let (w, h) = (self.env.trxreg.rrw(), self.env.trxreg.rrh());

        debug!(
            "Move {}x{} from {:#06x} ({}, {}) to {:#06x} ({}, {})",
            w,
            h,
            blit.sbp(),
            pos.ssax(),
            pos.ssay(),
            blit.dbp(),
            pos.dsax(),
            pos.dsay()
        );

        let src_rect = self.source_rect();
        let dst_rect = self.destination_rect();
        self.renderer.invalidate_local_mem(blit, src_rect, false);
        self.renderer.invalidate_video_mem(blit, dst_rect);

        if w == 0 || h == 0 {
            return;
        }

        let (mut sx, mut sy) = (pos.ssax() as i64, pos.ssay() as i64);
        let (mut dx, mut dy) = (pos.dsax() as i64, pos.dsay() as i64);
        let (mut xinc, mut yinc) = (1i64, 1i64);

        if pos.dirx() != 0 {
            sx += w as i64 - 1;
            dx += w as i64 - 1;
            xinc = -1;
        }

        if pos.diry() != 0 {
            sy += h as i64 - 1;
            dy += h as i64 - 1;
            yinc = -1;
        }

        let src = MemOffset::new(blit.sbp(), blit.sbw(), blit.spsm());
        let dst = MemOffset::new(blit.dbp(), blit.dbw(), blit.dpsm());

        for row in 0..h as i64 {
            let (syy, dyy) = ((sy + row * yinc) as u32, (dy + row * yinc) as u32);

            for col in 0..w as i64 {
                let (sxx, dxx) = ((sx + col * xinc) as u32, (dx + col * xinc) as u32);
                let value = self.mem.read_pixel(&src, sxx, syy);
                self.mem.write_pixel(&dst, dxx, dyy, value);
            }
        }
    }
}
