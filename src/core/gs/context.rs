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

//! Drawing contexts and the drawing environment
//!
//! The GS keeps two complete sets of per-primitive state (contexts 1 and 2)
//! plus a block of registers shared by both. PRIM.CTXT picks the context a
//! primitive is drawn with.

use super::local_memory::MemOffset;
use super::registers::{
    Alpha, Bitbltbuf, Clamp, Colclamp, Dimx, Dthe, Fba, Fogcol, Frame, Miptbp1, Miptbp2, Pabe,
    Prim, Prmodecont, Scanmsk, Scissor, Test, Tex0, Tex1, Texa, Texclut, Trxdir, Trxpos, Trxreg,
    XyOffset, Zbuf,
};

/// Scissor rectangle in primitive coordinates (12.4 fixed point, offset removed)
///
/// Both edges are inclusive: a vertex at `x1` is still inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScissorBox {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

/// Combined frame and depth addressing used by pixel pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelOffset {
    pub fb: MemOffset,
    pub zb: MemOffset,
}

/// Memory offsets derived from FRAME, ZBUF and TEX0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContextOffsets {
    /// Frame buffer
    pub fb: MemOffset,
    /// Depth buffer (shares the frame buffer width)
    pub zb: MemOffset,
    /// Texture
    pub tex: MemOffset,
    /// Frame and depth together
    pub fzb: PixelOffset,
}

/// One of the two drawing contexts
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DrawingContext {
    pub xyoffset: XyOffset,
    pub tex0: Tex0,
    pub tex1: Tex1,
    pub clamp: Clamp,
    pub miptbp1: Miptbp1,
    pub miptbp2: Miptbp2,
    pub scissor: Scissor,
    pub alpha: Alpha,
    pub test: Test,
    pub fba: Fba,
    pub frame: Frame,
    pub zbuf: Zbuf,

    /// Derived memory offsets
    pub(crate) offset: ContextOffsets,

    /// Derived scissor box
    pub(crate) scissor_box: ScissorBox,
}

impl DrawingContext {
    /// Derived memory offsets
    pub fn offsets(&self) -> &ContextOffsets {
        &self.offset
    }

    /// Scissor box in primitive coordinates
    pub fn scissor_box(&self) -> ScissorBox {
        self.scissor_box
    }

    pub(crate) fn update_scissor(&mut self) {
        self.scissor_box = ScissorBox {
            x0: (self.scissor.scax0() << 4) as i32,
            y0: (self.scissor.scay0() << 4) as i32,
            x1: (self.scissor.scax1() << 4) as i32,
            y1: (self.scissor.scay1() << 4) as i32,
        };
    }

    /// Recompute frame, depth and combined offsets
    pub(crate) fn update_frame_offsets(&mut self) {
        let fbw = self.frame.fbw();
        self.offset.fb = MemOffset::new(self.frame.block(), fbw, self.frame.psm());
        self.offset.zb = MemOffset::new(self.zbuf.block(), fbw, self.zbuf.psm());
        self.offset.fzb = PixelOffset {
            fb: self.offset.fb,
            zb: self.offset.zb,
        };
    }

    pub(crate) fn update_tex_offset(&mut self) {
        self.offset.tex = MemOffset::new(self.tex0.tbp0(), self.tex0.tbw(), self.tex0.psm());
    }

    /// Recompute everything derived from the raw registers
    pub(crate) fn update_derived(&mut self) {
        self.update_scissor();
        self.update_frame_offsets();
        self.update_tex_offset();
    }
}

/// Registers shared by both contexts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawingEnvironment {
    pub prim: Prim,
    pub prmodecont: Prmodecont,
    pub texclut: Texclut,
    pub scanmsk: Scanmsk,
    pub texa: Texa,
    pub fogcol: Fogcol,
    pub dimx: Dimx,
    pub dthe: Dthe,
    pub colclamp: Colclamp,
    pub pabe: Pabe,
    pub bitbltbuf: Bitbltbuf,
    pub trxdir: Trxdir,
    pub trxpos: Trxpos,
    pub trxreg: Trxreg,

    /// Contexts 1 and 2
    pub ctxt: [DrawingContext; 2],

    /// Derived signed dither matrix
    pub(crate) dither: [[i8; 4]; 4],
}

impl DrawingEnvironment {
    pub fn new() -> Self {
        let mut env = Self::zeroed();
        env.reset();
        env
    }

    /// Clear every register; PRMODECONT.AC powers up as 1
    pub fn reset(&mut self) {
        *self = Self {
            prmodecont: Prmodecont(1),
            ..Self::zeroed()
        };
    }

    fn zeroed() -> Self {
        Self {
            prim: Prim::default(),
            prmodecont: Prmodecont::default(),
            texclut: Texclut::default(),
            scanmsk: Scanmsk::default(),
            texa: Texa::default(),
            fogcol: Fogcol::default(),
            dimx: Dimx::default(),
            dthe: Dthe::default(),
            colclamp: Colclamp::default(),
            pabe: Pabe::default(),
            bitbltbuf: Bitbltbuf::default(),
            trxdir: Trxdir::default(),
            trxpos: Trxpos::default(),
            trxreg: Trxreg::default(),
            ctxt: [DrawingContext::default(); 2],
            dither: [[0; 4]; 4],
        }
    }

    /// Dither matrix decoded from DIMX
    pub fn dither_matrix(&self) -> &[[i8; 4]; 4] {
        &self.dither
    }

    pub(crate) fn update_dimx(&mut self) {
        for (i, row) in self.dither.iter_mut().enumerate() {
            for (j, entry) in row.iter_mut().enumerate() {
                *entry = self.dimx.entry(i, j);
            }
        }
    }
}

impl Default for DrawingEnvironment {
    fn default() -> Self {
        Self::new()
    }
}
