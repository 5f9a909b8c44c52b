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

//! Freeze and defrost
//!
//! The frozen image is a flat little-endian record:
//!
//! | Field                         | Size              |
//! |-------------------------------|-------------------|
//! | Version                       | 4                 |
//! | Shared registers (15 x u64)   | 120               |
//! | Context registers (2 x 12)    | 192               |
//! | RGBAQ, ST                     | 16                |
//! | UV, FOG                       | 8                 |
//! | XYZ, reserved                 | 16                |
//! | Transfer cursor (2 x i32)     | 8                 |
//! | Local memory                  | 4 MiB             |
//! | GIF paths (4 x tag + cursor)  | 80                |
//! | Q                             | 4                 |
//!
//! Images up to version 6 carry extra u64 slots after PRIM and after TEX1
//! of each context; images up to version 4 also carry 28 reserved bytes per
//! context.

use log::{debug, info};

use super::gif::PATH_COUNT;
use super::local_memory::VM_SIZE;
use super::registers::{
    Alpha, Bitbltbuf, Clamp, Colclamp, Dimx, Dthe, Fba, Fogcol, Frame, GifTag, Miptbp1, Miptbp2,
    Pabe, Prim, Prmodecont, Rgbaq, Scanmsk, Scissor, St, Test, Tex0, Tex1, Texa, Texclut, Trxdir,
    Trxpos, Trxreg, XyOffset, Xyz, Zbuf,
};
use super::renderer::Renderer;
use super::GsState;
use crate::core::error::{GsError, Result};

/// Version written by [`GsState::freeze`]
pub const STATE_VERSION: u32 = 7;

/// Size of a current-version image
const FROZEN_SIZE: usize = 4 + 15 * 8 + 2 * 12 * 8 + 8 + 8 + 4 + 4 + 8 + 8 + 4 + 4
    + VM_SIZE
    + PATH_COUNT * (16 + 4)
    + 4;

/// Little-endian record writer
struct StateWriter {
    data: Vec<u8>,
}

impl StateWriter {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    fn u32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    fn u64(&mut self, value: u64) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    fn bytes(&mut self, value: &[u8]) {
        self.data.extend_from_slice(value);
    }
}

/// Little-endian record reader
struct StateReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> StateReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let available = self.data.len() - self.pos;
        if len > available {
            return Err(GsError::StateTruncated {
                needed: self.pos + len,
                available: self.data.len(),
            });
        }

        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn skip(&mut self, len: usize) -> Result<()> {
        self.take(len).map(|_| ())
    }

    fn u32(&mut self) -> Result<u32> {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(bytes))
    }

    fn u64(&mut self) -> Result<u64> {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(bytes))
    }
}

/// Size of an image written by `version`
const fn frozen_size(version: u32) -> usize {
    let mut size = FROZEN_SIZE;
    if version <= 6 {
        size += 8 + 2 * 8;
    }
    if version <= 4 {
        size += 2 * 28;
    }
    size
}

impl<R: Renderer> GsState<R> {
    /// Size in bytes of the image [`GsState::freeze`] produces
    pub fn freeze_size(&self) -> usize {
        FROZEN_SIZE
    }

    /// Serialize the complete GS state
    ///
    /// Pending primitives and staged image data are flushed first so local
    /// memory is current.
    ///
    /// # Returns
    ///
    /// The frozen image, or the renderer error raised by the flush
    pub fn freeze(&mut self) -> Result<Vec<u8>> {
        self.flush_all();
        self.take_pending_error()?;

        let mut w = StateWriter::with_capacity(FROZEN_SIZE);
        w.u32(STATE_VERSION);

        let env = &self.env;
        for value in [
            env.prim.0,
            env.prmodecont.0,
            env.texclut.0,
            env.scanmsk.0,
            env.texa.0,
            env.fogcol.0,
            env.dimx.0,
            env.dthe.0,
            env.colclamp.0,
            env.pabe.0,
            env.bitbltbuf.0,
            env.trxdir.0,
            env.trxpos.0,
            env.trxreg.0,
            // Historical duplicate slot
            env.trxreg.0,
        ] {
            w.u64(value);
        }

        for ctx in &env.ctxt {
            for value in [
                ctx.xyoffset.0,
                ctx.tex0.0,
                ctx.tex1.0,
                ctx.clamp.0,
                ctx.miptbp1.0,
                ctx.miptbp2.0,
                ctx.scissor.0,
                ctx.alpha.0,
                ctx.test.0,
                ctx.fba.0,
                ctx.frame.0,
                ctx.zbuf.0,
            ] {
                w.u64(value);
            }
        }

        w.u64(self.v.rgbaq.0);
        w.u64(self.v.st.0);
        w.u32(self.v.uv);
        w.u32(self.v.fog);
        w.u64(self.v.xyz.0);
        w.u64(0);

        w.u32(self.tr.x);
        w.u32(self.tr.y);

        w.bytes(self.mem.as_bytes());

        for path in &self.paths {
            w.bytes(&path.snapshot_tag().to_bytes());
            w.u32(path.reg);
        }

        w.u32(self.q.to_bits());

        debug!("Froze GS state ({} bytes)", w.data.len());
        Ok(w.data)
    }

    /// Restore a state produced by [`GsState::freeze`]
    ///
    /// Any version up to [`STATE_VERSION`] is accepted. The image is validated before
    /// anything is touched, so a rejected image leaves the GS as it was.
    pub fn defrost(&mut self, data: &[u8]) -> Result<()> {
        let mut r = StateReader::new(data);
        let version = r.u32()?;

        if version > STATE_VERSION {
            return Err(GsError::UnsupportedStateVersion {
                found: version,
                supported: STATE_VERSION,
            });
        }

        let needed = frozen_size(version);
        if data.len() < needed {
            return Err(GsError::StateTruncated {
                needed,
                available: data.len(),
            });
        }

        self.flush_all();
        self.reset();

        self.env.prim = Prim(r.u64()?);
        if version <= 6 {
            r.skip(8)?;
        }
        self.env.prmodecont = Prmodecont(r.u64()?);
        self.env.texclut = Texclut(r.u64()?);
        self.env.scanmsk = Scanmsk(r.u64()?);
        self.env.texa = Texa(r.u64()?);
        self.env.fogcol = Fogcol(r.u64()?);
        self.env.dimx = Dimx(r.u64()?);
        self.env.dthe = Dthe(r.u64()?);
        self.env.colclamp = Colclamp(r.u64()?);
        self.env.pabe = Pabe(r.u64()?);
        self.env.bitbltbuf = Bitbltbuf(r.u64()?);
        self.env.trxdir = Trxdir(r.u64()?);
        self.env.trxpos = Trxpos(r.u64()?);
        self.env.trxreg = Trxreg(r.u64()?);
        r.skip(8)?;

        for i in 0..2 {
            let ctx = &mut self.env.ctxt[i];
            ctx.xyoffset = XyOffset(r.u64()? & 0x0000_ffff_0000_ffff);
            ctx.tex0 = Tex0(r.u64()?);
            ctx.tex1 = Tex1(r.u64()?);
            if version <= 6 {
                r.skip(8)?;
            }
            ctx.clamp = Clamp(r.u64()?);
            ctx.miptbp1 = Miptbp1(r.u64()?);
            ctx.miptbp2 = Miptbp2(r.u64()?);
            ctx.scissor = Scissor(r.u64()?);
            ctx.alpha = Alpha(r.u64()?);
            ctx.test = Test(r.u64()?);
            ctx.fba = Fba(r.u64()?);
            ctx.frame = Frame(r.u64()?);
            ctx.zbuf = Zbuf(r.u64()?);
            if version <= 4 {
                r.skip(28)?;
            }
        }

        self.v.rgbaq = Rgbaq(r.u64()?);
        self.v.st = St(r.u64()?);
        self.v.uv = r.u32()?;
        self.v.fog = r.u32()?;
        self.v.xyz = Xyz(r.u64()?);
        r.skip(8)?;

        self.tr.x = r.u32()?;
        self.tr.y = r.u32()?;
        self.tr.blit = self.env.bitbltbuf;
        self.tr.total = 0;
        self.tr.active = self.env.trxdir.xdir() < 2;

        self.mem.as_bytes_mut().copy_from_slice(r.take(VM_SIZE)?);

        for path in self.paths.iter_mut() {
            let mut tag = [0u8; 16];
            tag.copy_from_slice(r.take(16)?);
            path.set_tag(GifTag::from_bytes(&tag));
            path.reg = r.u32()?;
            if path.nreg > 0 {
                path.reg %= path.nreg;
            }
        }

        self.q = f32::from_bits(r.u32()?);

        self.update_context();
        self.update_vertex_kick();
        self.env.update_dimx();
        for ctx in self.env.ctxt.iter_mut() {
            ctx.update_derived();
        }

        info!("Restored GS state (version {})", version);
        Ok(())
    }
}
