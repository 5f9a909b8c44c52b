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

//! GIF path decoder
//!
//! A GIF path walks a stream of 128-bit units. Each packet starts with a
//! [`GifTag`] describing how many register loops follow and how every loop
//! is laid out; the path keeps the remaining loop count and the register slot
//! cursor so a packet may be fed in as many pieces as the caller likes.
//!
//! PACKED tags are classified once when the tag is decoded so the hot vertex
//! layouts can run through a batched loop.

use super::registers::{packed, GifFormat, GifTag};

/// Number of independent GIF paths
pub const PATH_COUNT: usize = 4;

/// Classification of a PACKED register list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PathKind {
    /// Any register list; every slot goes through the per-register handlers
    #[default]
    Generic,
    /// Every slot is A+D
    AdOnly,
    /// STQ, RGBA, XYZF2
    StqRgbaXyzf2,
    /// STQ, RGBA, XYZ2
    StqRgbaXyz2,
}

/// Decoder state of one GIF path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GifPath {
    pub(crate) tag: GifTag,
    pub(crate) nloop: u32,
    pub(crate) nreg: u32,
    pub(crate) reg: u32,
    pub(crate) kind: PathKind,
    pub(crate) regs: [u8; 16],
}

const STQ_RGBA_XYZF2: [u8; 3] = [packed::STQ, packed::RGBA, packed::XYZF2];
const STQ_RGBA_XYZ2: [u8; 3] = [packed::STQ, packed::RGBA, packed::XYZ2];

impl GifPath {
    /// Fresh path waiting for a tag
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a new tag
    ///
    /// A tag with NLOOP = 0 only replaces the header bits; the register
    /// list of the previous tag is left as it was.
    ///
    /// # Examples
    ///
    /// ```
    /// use gsrx::core::gs::{GifFormat, GifPath, GifTag, PathKind};
    ///
    /// let mut path = GifPath::new();
    /// path.set_tag(GifTag::new(4, true, GifFormat::Packed, &[0x02, 0x01, 0x04]));
    /// assert_eq!(path.kind(), PathKind::StqRgbaXyzf2);
    /// assert_eq!(path.nloop(), 4);
    /// ```
    pub fn set_tag(&mut self, tag: GifTag) {
        self.tag = tag;
        self.nloop = tag.nloop();

        if self.nloop == 0 {
            return;
        }

        self.nreg = tag.nreg();
        self.regs = [0; 16];
        for (i, slot) in self.regs.iter_mut().take(self.nreg as usize).enumerate() {
            *slot = tag.reg(i);
        }
        self.reg = 0;
        self.kind = PathKind::Generic;

        if tag.format() != GifFormat::Packed {
            return;
        }

        let used = &self.regs[..self.nreg as usize];

        if used.iter().all(|&r| r == packed::A_D) {
            self.kind = PathKind::AdOnly;
            return;
        }

        match self.nreg {
            3 if used == STQ_RGBA_XYZF2 => self.kind = PathKind::StqRgbaXyzf2,
            3 if used == STQ_RGBA_XYZ2 => self.kind = PathKind::StqRgbaXyz2,
            // Repeated vertex layouts fold into three-register loops
            9 | 12 if used.chunks(3).all(|c| c == STQ_RGBA_XYZF2) => {
                self.kind = PathKind::StqRgbaXyzf2;
                self.nloop *= self.nreg / 3;
                self.nreg = 3;
            }
            _ => {}
        }
    }

    /// Register descriptor at the current slot
    #[inline]
    pub fn get_reg(&self) -> u8 {
        self.regs[self.reg as usize & 15]
    }

    /// Register descriptor at an arbitrary slot
    #[inline]
    pub fn reg_at(&self, index: u32) -> u8 {
        self.regs[index as usize & 15]
    }

    /// Advance the slot cursor
    ///
    /// Wraps at NREG and consumes one loop when it does.
    ///
    /// # Returns
    ///
    /// `false` once the last loop of the tag has been consumed
    #[inline]
    pub fn step_reg(&mut self) -> bool {
        self.reg += 1;
        if self.reg == self.nreg {
            self.reg = 0;
            self.nloop = self.nloop.saturating_sub(1);
            if self.nloop == 0 {
                return false;
            }
        }
        true
    }

    /// Last decoded tag
    pub fn tag(&self) -> GifTag {
        self.tag
    }

    /// Loops left in the current tag
    pub fn nloop(&self) -> u32 {
        self.nloop
    }

    /// Registers per loop
    pub fn nreg(&self) -> u32 {
        self.nreg
    }

    /// Current slot cursor
    pub fn reg(&self) -> u32 {
        self.reg
    }

    /// Fast path classification of the current tag
    pub fn kind(&self) -> PathKind {
        self.kind
    }

    /// True when the path expects a tag next
    pub fn is_idle(&self) -> bool {
        self.nloop == 0
    }

    /// Tag rebuilt from the live decoder state, as stored in a snapshot
    pub(crate) fn snapshot_tag(&self) -> GifTag {
        let mut tag = self.tag;
        tag.set_nreg(self.nreg);
        tag.set_nloop(self.nloop);
        tag.regs = self
            .regs
            .iter()
            .enumerate()
            .fold(0u64, |acc, (j, &r)| acc | (u64::from(r & 0x0f) << (j * 4)));
        tag
    }
}

/// Builder for GIF packets
///
/// Produces the little-endian byte stream a DMA channel would deliver,
/// handy for tools, tests and replaying captured command lists.
///
/// # Examples
///
/// ```
/// use gsrx::core::gs::{addr, PacketWriter};
///
/// let bytes = PacketWriter::new()
///     .ad_tag(1, true)
///     .ad(addr::PRIM, 3)
///     .finish();
/// assert_eq!(bytes.len(), 32);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PacketWriter {
    data: Vec<u8>,
}

impl PacketWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tag
    pub fn tag(mut self, tag: GifTag) -> Self {
        self.data.extend_from_slice(&tag.to_bytes());
        self
    }

    /// Append a PACKED tag whose single slot is A+D
    pub fn ad_tag(self, nloop: u32, eop: bool) -> Self {
        self.tag(GifTag::new(nloop, eop, GifFormat::Packed, &[packed::A_D]))
    }

    /// Append one A+D qword
    pub fn ad(mut self, addr: u8, data: u64) -> Self {
        self.data.extend_from_slice(&data.to_le_bytes());
        self.data.extend_from_slice(&u64::from(addr & 0x7f).to_le_bytes());
        self
    }

    /// Append a raw 128-bit qword
    pub fn qword(mut self, value: u128) -> Self {
        self.data.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Append a PACKED STQ qword
    pub fn stq(self, s: f32, t: f32, q: f32) -> Self {
        let value = u128::from(s.to_bits())
            | (u128::from(t.to_bits()) << 32)
            | (u128::from(q.to_bits()) << 64);
        self.qword(value)
    }

    /// Append a PACKED RGBA qword
    pub fn rgba(self, r: u8, g: u8, b: u8, a: u8) -> Self {
        let value = u128::from(r)
            | (u128::from(g) << 32)
            | (u128::from(b) << 64)
            | (u128::from(a) << 96);
        self.qword(value)
    }

    /// Append a PACKED XYZF2 qword
    pub fn xyzf2(self, x: u16, y: u16, z: u32, f: u8, adc: bool) -> Self {
        let value = u128::from(x)
            | (u128::from(y) << 32)
            | (u128::from(z & 0x00ff_ffff) << 68)
            | (u128::from(f) << 100)
            | (u128::from(adc) << 111);
        self.qword(value)
    }

    /// Append a PACKED XYZ2 qword
    pub fn xyz2(self, x: u16, y: u16, z: u32, adc: bool) -> Self {
        let value = u128::from(x)
            | (u128::from(y) << 32)
            | (u128::from(z) << 64)
            | (u128::from(adc) << 111);
        self.qword(value)
    }

    /// Append one 64-bit REGLIST word
    pub fn reglist(mut self, value: u64) -> Self {
        self.data.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Append raw bytes, zero padded to a whole qword
    pub fn image(mut self, bytes: &[u8]) -> Self {
        self.data.extend_from_slice(bytes);
        let rem = self.data.len() % 16;
        if rem != 0 {
            self.data.resize(self.data.len() + 16 - rem, 0);
        }
        self
    }

    /// Finished stream
    pub fn finish(self) -> Vec<u8> {
        self.data
    }
}
