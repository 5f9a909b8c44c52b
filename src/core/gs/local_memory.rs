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

//! GS local memory
//!
//! The GS owns 4 MiB of embedded DRAM addressed in 256-byte blocks. Buffers
//! are described by a block pointer, a width in units of 64 pixels and a
//! pixel storage mode.
//!
//! Pixels are stored row-major from the base block (`bp * 256`), one row being
//! `bw * 64` pixels. Formats that live inside a 32-bit unit (24-bit color,
//! the T8H/T4HL/T4HH palettes) read and write only the bits they own.

use super::registers::{Bitbltbuf, Trxpos, Trxreg};
use super::types::PsmInfo;

/// Local memory size in bytes (4 MiB)
pub const VM_SIZE: usize = 4 * 1024 * 1024;

/// Bytes per block
pub const BLOCK_SIZE: usize = 256;

/// Coordinates wrap at 2048 in both directions
const COORD_MASK: u32 = 2047;

/// Addressing parameters of a buffer in local memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemOffset {
    /// Base block pointer
    pub bp: u32,
    /// Width in units of 64 pixels
    pub bw: u32,
    /// Pixel storage mode
    pub psm: u32,
}

impl MemOffset {
    pub const fn new(bp: u32, bw: u32, psm: u32) -> Self {
        Self { bp, bw, psm }
    }

    /// Bit address of pixel (x, y) inside local memory
    pub fn bit_address(&self, x: u32, y: u32) -> usize {
        let info = PsmInfo::of(self.psm);
        let pitch = self.bw.max(1) as usize * 64;
        let index = (y & COORD_MASK) as usize * pitch + (x & COORD_MASK) as usize;
        let base = self.bp as usize * BLOCK_SIZE * 8;
        (base + index * info.bpp as usize) % (VM_SIZE * 8)
    }
}

/// GS local memory
pub struct LocalMemory {
    vm: Vec<u8>,
}

impl LocalMemory {
    /// Create a zero-filled local memory
    pub fn new() -> Self {
        Self {
            vm: vec![0; VM_SIZE],
        }
    }

    /// Raw contents
    pub fn as_bytes(&self) -> &[u8] {
        &self.vm
    }

    /// Raw contents for bulk restore
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.vm
    }

    /// Read one pixel
    ///
    /// # Arguments
    ///
    /// * `off` - Buffer the pixel belongs to
    /// * `x`, `y` - Pixel coordinates inside the buffer
    ///
    /// # Returns
    ///
    /// The pixel value right-aligned (a T4HH texel is returned as 0-15)
    ///
    /// # Examples
    ///
    /// ```
    /// use gsrx::core::gs::{psm, LocalMemory, MemOffset};
    ///
    /// let mut mem = LocalMemory::new();
    /// let off = MemOffset::new(0, 1, psm::CT32);
    /// mem.write_pixel(&off, 3, 2, 0xdead_beef);
    /// assert_eq!(mem.read_pixel(&off, 3, 2), 0xdead_beef);
    /// ```
    pub fn read_pixel(&self, off: &MemOffset, x: u32, y: u32) -> u32 {
        let info = PsmInfo::of(off.psm);
        let bit = off.bit_address(x, y);
        let byte = bit >> 3;

        match info.bpp {
            32 => (self.read_u32(byte) & info.mask) >> info.shift,
            16 => u32::from(self.vm[byte]) | (u32::from(self.vm[byte + 1]) << 8),
            8 => u32::from(self.vm[byte]),
            _ => (u32::from(self.vm[byte]) >> (bit & 4)) & 0x0f,
        }
    }

    /// Write one pixel, leaving the bits the format does not own untouched
    pub fn write_pixel(&mut self, off: &MemOffset, x: u32, y: u32, value: u32) {
        let info = PsmInfo::of(off.psm);
        let bit = off.bit_address(x, y);
        let byte = bit >> 3;

        match info.bpp {
            32 => {
                let word = self.read_u32(byte);
                let word = (word & !info.mask) | ((value << info.shift) & info.mask);
                self.vm[byte..byte + 4].copy_from_slice(&word.to_le_bytes());
            }
            16 => {
                self.vm[byte] = value as u8;
                self.vm[byte + 1] = (value >> 8) as u8;
            }
            8 => self.vm[byte] = value as u8,
            _ => {
                let shift = bit & 4;
                let keep = self.vm[byte] & !(0x0f << shift);
                self.vm[byte] = keep | (((value & 0x0f) as u8) << shift);
            }
        }
    }

    fn read_u32(&self, byte: usize) -> u32 {
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.vm[byte..byte + 4]);
        u32::from_le_bytes(word)
    }

    /// Host to local image upload
    ///
    /// Consumes whole pixels from `src` into the destination rectangle
    /// described by BITBLTBUF/TRXPOS/TRXREG, starting at the cursor
    /// `(tx, ty)` and advancing it row by row.
    ///
    /// # Returns
    ///
    /// Number of bytes consumed from `src`
    pub fn write_image(
        &mut self,
        tx: &mut u32,
        ty: &mut u32,
        src: &[u8],
        blit: Bitbltbuf,
        pos: Trxpos,
        reg: Trxreg,
    ) -> usize {
        let off = MemOffset::new(blit.dbp(), blit.dbw(), blit.dpsm());
        let trbpp = PsmInfo::of(blit.dpsm()).trbpp as usize;
        let (left, right) = (pos.dsax(), pos.dsax() + reg.rrw());
        let bottom = pos.dsay() + reg.rrh();

        if reg.rrw() == 0 {
            return 0;
        }

        let available = src.len() * 8 / trbpp;
        let mut bit = 0usize;

        for _ in 0..available {
            if *ty >= bottom {
                break;
            }

            let value = extract_pixel(src, bit, trbpp);
            self.write_pixel(&off, *tx, *ty, value);
            bit += trbpp;

            *tx += 1;
            if *tx >= right {
                *tx = left;
                *ty += 1;
            }
        }

        bit.div_ceil(8)
    }

    /// Local to host image download
    ///
    /// Mirror of [`LocalMemory::write_image`] reading the source rectangle.
    ///
    /// # Returns
    ///
    /// Number of bytes produced into `dst`
    pub fn read_image(
        &self,
        tx: &mut u32,
        ty: &mut u32,
        dst: &mut [u8],
        blit: Bitbltbuf,
        pos: Trxpos,
        reg: Trxreg,
    ) -> usize {
        let off = MemOffset::new(blit.sbp(), blit.sbw(), blit.spsm());
        let trbpp = PsmInfo::of(blit.spsm()).trbpp as usize;
        let (left, right) = (pos.ssax(), pos.ssax() + reg.rrw());
        let bottom = pos.ssay() + reg.rrh();

        if reg.rrw() == 0 {
            return 0;
        }

        let available = dst.len() * 8 / trbpp;
        let mut bit = 0usize;

        for _ in 0..available {
            if *ty >= bottom {
                break;
            }

            let value = self.read_pixel(&off, *tx, *ty);
            insert_pixel(dst, bit, trbpp, value);
            bit += trbpp;

            *tx += 1;
            if *tx >= right {
                *tx = left;
                *ty += 1;
            }
        }

        bit.div_ceil(8)
    }
}

impl Default for LocalMemory {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a `trbpp`-wide little-endian pixel starting at bit `bit` of `src`
fn extract_pixel(src: &[u8], bit: usize, trbpp: usize) -> u32 {
    let byte = bit >> 3;
    match trbpp {
        32 => u32::from_le_bytes([src[byte], src[byte + 1], src[byte + 2], src[byte + 3]]),
        24 => u32::from_le_bytes([src[byte], src[byte + 1], src[byte + 2], 0]),
        16 => u32::from(src[byte]) | (u32::from(src[byte + 1]) << 8),
        8 => u32::from(src[byte]),
        _ => (u32::from(src[byte]) >> (bit & 4)) & 0x0f,
    }
}

fn insert_pixel(dst: &mut [u8], bit: usize, trbpp: usize, value: u32) {
    let byte = bit >> 3;
    match trbpp {
        32 => dst[byte..byte + 4].copy_from_slice(&value.to_le_bytes()),
        24 => dst[byte..byte + 3].copy_from_slice(&value.to_le_bytes()[..3]),
        16 => dst[byte..byte + 2].copy_from_slice(&(value as u16).to_le_bytes()),
        8 => dst[byte] = value as u8,
        _ => {
            let shift = bit & 4;
            dst[byte] = (dst[byte] & !(0x0f << shift)) | (((value & 0x0f) as u8) << shift);
        }
    }
}
