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

//! GS type definitions
//!
//! Primitive topologies, pixel storage formats and the assembled vertex.

use super::registers::{Rgbaq, St, Xyz};

/// Primitive topology selected by PRIM.PRIM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimType {
    #[default]
    Point = 0,
    Line = 1,
    LineStrip = 2,
    Triangle = 3,
    TriangleStrip = 4,
    TriangleFan = 5,
    Sprite = 6,
    /// Reserved encoding 7, never produces a primitive
    Invalid = 7,
}

impl PrimType {
    /// Decode the 3-bit PRIM field
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 7 {
            0 => PrimType::Point,
            1 => PrimType::Line,
            2 => PrimType::LineStrip,
            3 => PrimType::Triangle,
            4 => PrimType::TriangleStrip,
            5 => PrimType::TriangleFan,
            6 => PrimType::Sprite,
            _ => PrimType::Invalid,
        }
    }

    /// Class the topology belongs to once strips and fans are unrolled
    pub const fn class(self) -> PrimClass {
        match self {
            PrimType::Point => PrimClass::Point,
            PrimType::Line | PrimType::LineStrip => PrimClass::Line,
            PrimType::Triangle | PrimType::TriangleStrip | PrimType::TriangleFan => {
                PrimClass::Triangle
            }
            PrimType::Sprite => PrimClass::Sprite,
            PrimType::Invalid => PrimClass::Invalid,
        }
    }

    /// Vertices that must be buffered before a primitive can complete
    pub const fn vertex_count(self) -> usize {
        match self {
            PrimType::Point | PrimType::Invalid => 1,
            PrimType::Line | PrimType::LineStrip | PrimType::Sprite => 2,
            PrimType::Triangle | PrimType::TriangleStrip | PrimType::TriangleFan => 3,
        }
    }
}

/// Primitive class handed to the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimClass {
    Point = 0,
    Line = 1,
    Triangle = 2,
    Sprite = 3,
    Invalid = 7,
}

impl PrimClass {
    /// Indices emitted per primitive of this class
    pub const fn index_count(self) -> usize {
        match self {
            PrimClass::Point | PrimClass::Invalid => 1,
            PrimClass::Line | PrimClass::Sprite => 2,
            PrimClass::Triangle => 3,
        }
    }
}

/// Pixel storage mode identifiers
pub mod psm {
    pub const CT32: u32 = 0x00;
    pub const CT24: u32 = 0x01;
    pub const CT16: u32 = 0x02;
    pub const CT16S: u32 = 0x0a;
    pub const T8: u32 = 0x13;
    pub const T4: u32 = 0x14;
    pub const T8H: u32 = 0x1b;
    pub const T4HL: u32 = 0x24;
    pub const T4HH: u32 = 0x2c;
    pub const Z32: u32 = 0x30;
    pub const Z24: u32 = 0x31;
    pub const Z16: u32 = 0x32;
    pub const Z16S: u32 = 0x3a;
}

/// Storage properties of a pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PsmInfo {
    /// Bits per pixel as laid out in local memory
    pub bpp: u32,
    /// Bits per pixel on the transfer bus
    pub trbpp: u32,
    /// Bit position of the pixel inside its storage unit
    pub shift: u32,
    /// Mask of the bits the pixel owns inside its storage unit
    pub mask: u32,
    /// 0 = 32-bit, 1 = 24-bit, 2 = 16-bit, 3 = indexed
    pub fmt: u32,
}

impl PsmInfo {
    /// Look up a pixel format; unknown encodings behave as 32-bit color
    pub const fn of(psm: u32) -> Self {
        match psm {
            psm::CT24 | psm::Z24 => Self::new(32, 24, 0, 0x00ff_ffff, 1),
            psm::CT16 | psm::CT16S | psm::Z16 | psm::Z16S => Self::new(16, 16, 0, 0xffff, 2),
            psm::T8 => Self::new(8, 8, 0, 0xff, 3),
            psm::T4 => Self::new(4, 4, 0, 0xf, 3),
            psm::T8H => Self::new(32, 8, 24, 0xff00_0000, 3),
            psm::T4HL => Self::new(32, 4, 24, 0x0f00_0000, 3),
            psm::T4HH => Self::new(32, 4, 28, 0xf000_0000, 3),
            _ => Self::new(32, 32, 0, 0xffff_ffff, 0),
        }
    }

    const fn new(bpp: u32, trbpp: u32, shift: u32, mask: u32, fmt: u32) -> Self {
        Self {
            bpp,
            trbpp,
            shift,
            mask,
            fmt,
        }
    }
}

/// Assembled vertex
///
/// RGBAQ, ST, UV and FOG are sticky: they keep their value across kicks
/// until a new register write replaces them. XYZ is written by every
/// position register immediately before the kick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    pub st: St,
    pub rgbaq: Rgbaq,
    pub xyz: Xyz,
    /// U in bits 0-13, V in bits 16-29
    pub uv: u32,
    pub fog: u32,
}

/// Axis aligned rectangle, right and bottom exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Rect {
    /// Rectangle from an origin and a size
    ///
    /// Empty sizes are widened to one unit so invalidation always covers
    /// at least the origin.
    pub fn from_origin(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self {
            left: x,
            top: y,
            right: x + w.max(1),
            bottom: y + h.max(1),
        }
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }
}
