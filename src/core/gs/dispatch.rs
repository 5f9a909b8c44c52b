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

//! Register dispatch
//!
//! Decoded register writes are routed through two lookup tables, one indexed
//! by the 4-bit PACKED descriptor and one by the 7-bit A+D address. Entries
//! are plain enum variants; the position register entries carry the
//! primitive type and auto-flush mode they kick with, so the tables are
//! rebuilt whenever PRIM, the configuration or the frame skip state changes
//! instead of being consulted on every vertex.
//!
//! Writes to registers that affect drawing compare the new value with the
//! current one and flush pending primitives before the new value lands.

use log::{trace, warn};

use super::registers::{
    addr, packed, Alpha, Bitbltbuf, Clamp, Colclamp, Dimx, Dthe, Fba, Fog, Fogcol, Frame, Miptbp1,
    Miptbp2, Pabe, Prim, Rgbaq, Scanmsk, Scissor, St, Test, Tex0, Tex1, Texa, Texclut, Trxdir,
    Trxpos, Trxreg, Xyz, Xyzf, Zbuf,
};
use super::renderer::Renderer;
use super::types::{psm, PrimType, PsmInfo, Rect};
use super::GsState;
use crate::core::error::Result;

/// Bits of TEX0 that TEX2 is allowed to replace (PSM, CBP, CPSM, CSM, CSA, CLD)
const TEX2_MASK: u64 = 0xFFFF_FFE0_03F0_0000;

/// Bits of TEX0 whose change forces a flush (TBP0 TBW PSM TW TH TCC TFX CPSM CSA)
const TEX0_FLUSH_MASK: u64 = 0x1f78_001f_ffff_ffff;

/// PRIM fields other than the primitive type
const PRIM_ATTR_MASK: u32 = 0x7f8;

/// How a position register completes a vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct VertexKick {
    pub prim: PrimType,
    pub auto_flush: bool,
}

/// A+D / REGLIST register handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RegHandler {
    Null,
    Nop,
    Prim,
    Rgbaq,
    St,
    Uv { alternate: bool },
    Xyzf { kick: VertexKick, adc: bool },
    Xyz { kick: VertexKick, adc: bool },
    Tex0(usize),
    Clamp(usize),
    Fog,
    Tex1(usize),
    Tex2(usize),
    XyOffset(usize),
    Prmodecont,
    Prmode,
    Texclut,
    Scanmsk,
    Miptbp1(usize),
    Miptbp2(usize),
    Texa,
    Fogcol,
    Texflush,
    Scissor(usize),
    Alpha(usize),
    Dimx,
    Dthe,
    Colclamp,
    Test(usize),
    Pabe,
    Fba(usize),
    Frame(usize),
    Zbuf(usize),
    Bitbltbuf,
    Trxpos,
    Trxreg,
    Trxdir,
    Hwreg,
}

/// PACKED register handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PackedHandler {
    Null,
    Nop,
    Prim,
    Rgba,
    Stq,
    Uv { alternate: bool },
    Xyzf2 { kick: VertexKick, adc: bool },
    Xyz2 { kick: VertexKick, adc: bool },
    Tex0(usize),
    Clamp(usize),
    Fog,
    AddressData,
}

/// Both dispatch tables
#[derive(Debug, Clone)]
pub(crate) struct HandlerTables {
    pub packed: [PackedHandler; 16],
    pub reg: [RegHandler; 128],
}

impl HandlerTables {
    /// Build the tables for a configuration
    ///
    /// Position registers start out kicking points; call
    /// [`HandlerTables::update_vertex_kick`] with the live PRIM afterwards.
    pub fn new(alternate_uv_rounding: bool) -> Self {
        let mut packed_table = [PackedHandler::Null; 16];
        let mut reg = [RegHandler::Null; 128];

        packed_table[packed::PRIM as usize] = PackedHandler::Prim;
        packed_table[packed::RGBA as usize] = PackedHandler::Rgba;
        packed_table[packed::STQ as usize] = PackedHandler::Stq;
        packed_table[packed::UV as usize] = PackedHandler::Uv {
            alternate: alternate_uv_rounding,
        };
        packed_table[packed::TEX0_1 as usize] = PackedHandler::Tex0(0);
        packed_table[packed::TEX0_2 as usize] = PackedHandler::Tex0(1);
        packed_table[packed::CLAMP_1 as usize] = PackedHandler::Clamp(0);
        packed_table[packed::CLAMP_2 as usize] = PackedHandler::Clamp(1);
        packed_table[packed::FOG as usize] = PackedHandler::Fog;
        packed_table[packed::A_D as usize] = PackedHandler::AddressData;
        packed_table[packed::NOP as usize] = PackedHandler::Nop;

        reg[addr::PRIM as usize] = RegHandler::Prim;
        reg[addr::RGBAQ as usize] = RegHandler::Rgbaq;
        reg[addr::RGBAQ as usize + 0x10] = RegHandler::Rgbaq;
        reg[addr::ST as usize] = RegHandler::St;
        reg[addr::UV as usize] = RegHandler::Uv {
            alternate: alternate_uv_rounding,
        };
        reg[addr::TEX0_1 as usize] = RegHandler::Tex0(0);
        reg[addr::TEX0_2 as usize] = RegHandler::Tex0(1);
        reg[addr::CLAMP_1 as usize] = RegHandler::Clamp(0);
        reg[addr::CLAMP_2 as usize] = RegHandler::Clamp(1);
        reg[addr::FOG as usize] = RegHandler::Fog;
        reg[addr::NOP as usize] = RegHandler::Nop;
        reg[addr::TEX1_1 as usize] = RegHandler::Tex1(0);
        reg[addr::TEX1_2 as usize] = RegHandler::Tex1(1);
        reg[addr::TEX2_1 as usize] = RegHandler::Tex2(0);
        reg[addr::TEX2_2 as usize] = RegHandler::Tex2(1);
        reg[addr::XYOFFSET_1 as usize] = RegHandler::XyOffset(0);
        reg[addr::XYOFFSET_2 as usize] = RegHandler::XyOffset(1);
        reg[addr::PRMODECONT as usize] = RegHandler::Prmodecont;
        reg[addr::PRMODE as usize] = RegHandler::Prmode;
        reg[addr::TEXCLUT as usize] = RegHandler::Texclut;
        reg[addr::SCANMSK as usize] = RegHandler::Scanmsk;
        reg[addr::MIPTBP1_1 as usize] = RegHandler::Miptbp1(0);
        reg[addr::MIPTBP1_2 as usize] = RegHandler::Miptbp1(1);
        reg[addr::MIPTBP2_1 as usize] = RegHandler::Miptbp2(0);
        reg[addr::MIPTBP2_2 as usize] = RegHandler::Miptbp2(1);
        reg[addr::TEXA as usize] = RegHandler::Texa;
        reg[addr::FOGCOL as usize] = RegHandler::Fogcol;
        reg[addr::TEXFLUSH as usize] = RegHandler::Texflush;
        reg[addr::SCISSOR_1 as usize] = RegHandler::Scissor(0);
        reg[addr::SCISSOR_2 as usize] = RegHandler::Scissor(1);
        reg[addr::ALPHA_1 as usize] = RegHandler::Alpha(0);
        reg[addr::ALPHA_2 as usize] = RegHandler::Alpha(1);
        reg[addr::DIMX as usize] = RegHandler::Dimx;
        reg[addr::DTHE as usize] = RegHandler::Dthe;
        reg[addr::COLCLAMP as usize] = RegHandler::Colclamp;
        reg[addr::TEST_1 as usize] = RegHandler::Test(0);
        reg[addr::TEST_2 as usize] = RegHandler::Test(1);
        reg[addr::PABE as usize] = RegHandler::Pabe;
        reg[addr::FBA_1 as usize] = RegHandler::Fba(0);
        reg[addr::FBA_2 as usize] = RegHandler::Fba(1);
        reg[addr::FRAME_1 as usize] = RegHandler::Frame(0);
        reg[addr::FRAME_2 as usize] = RegHandler::Frame(1);
        reg[addr::ZBUF_1 as usize] = RegHandler::Zbuf(0);
        reg[addr::ZBUF_2 as usize] = RegHandler::Zbuf(1);
        reg[addr::BITBLTBUF as usize] = RegHandler::Bitbltbuf;
        reg[addr::TRXPOS as usize] = RegHandler::Trxpos;
        reg[addr::TRXREG as usize] = RegHandler::Trxreg;
        reg[addr::TRXDIR as usize] = RegHandler::Trxdir;
        reg[addr::HWREG as usize] = RegHandler::Hwreg;
        // SIGNAL, FINISH and LABEL are handled by the privileged register block
        reg[addr::SIGNAL as usize] = RegHandler::Null;
        reg[addr::FINISH as usize] = RegHandler::Null;
        reg[addr::LABEL as usize] = RegHandler::Null;

        let mut tables = Self {
            packed: packed_table,
            reg,
        };
        tables.update_vertex_kick(PrimType::Point, false, false);
        tables
    }

    /// Point the position registers at the kick for `prim`
    ///
    /// With `frame_skip` set every position register becomes a no-op.
    pub fn update_vertex_kick(&mut self, prim: PrimType, auto_flush: bool, frame_skip: bool) {
        if frame_skip {
            for id in [packed::XYZF2, packed::XYZ2, packed::XYZF3, packed::XYZ3] {
                self.packed[id as usize] = PackedHandler::Nop;
            }
            for id in [addr::XYZF2, addr::XYZ2, addr::XYZF3, addr::XYZ3] {
                self.reg[id as usize] = RegHandler::Nop;
            }
            return;
        }

        let kick = VertexKick { prim, auto_flush };

        self.packed[packed::XYZF2 as usize] = PackedHandler::Xyzf2 { kick, adc: false };
        self.packed[packed::XYZF3 as usize] = PackedHandler::Xyzf2 { kick, adc: true };
        self.packed[packed::XYZ2 as usize] = PackedHandler::Xyz2 { kick, adc: false };
        self.packed[packed::XYZ3 as usize] = PackedHandler::Xyz2 { kick, adc: true };

        self.reg[addr::XYZF2 as usize] = RegHandler::Xyzf { kick, adc: false };
        self.reg[addr::XYZF3 as usize] = RegHandler::Xyzf { kick, adc: true };
        self.reg[addr::XYZ2 as usize] = RegHandler::Xyz { kick, adc: false };
        self.reg[addr::XYZ3 as usize] = RegHandler::Xyz { kick, adc: true };
    }
}

/// 32-bit lane `i` of a packed qword
#[inline]
fn lane(q: &[u8], i: usize) -> u32 {
    u32::from_le_bytes([q[i * 4], q[i * 4 + 1], q[i * 4 + 2], q[i * 4 + 3]])
}

/// Lower 64 bits of a packed qword
#[inline]
pub(crate) fn low_u64(q: &[u8]) -> u64 {
    u64::from(lane(q, 0)) | (u64::from(lane(q, 1)) << 32)
}

/// Q replacement rules: exact zero becomes 1.0, NaN becomes the largest float
#[inline]
fn sanitize_q(bits: u32) -> f32 {
    if bits == 0 {
        return 1.0;
    }
    let q = f32::from_bits(bits);
    if q.is_nan() {
        f32::MAX
    } else {
        q
    }
}

/// PACKED XYZ2/XYZF2 ADC flag (bit 111)
#[inline]
fn packed_adc(q: &[u8]) -> bool {
    lane(q, 3) & 0x8000 != 0
}

/// Simplified CLUT load tracker driven by TEX0.CLD
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct ClutState {
    pub cbp: [u32; 2],
}

impl ClutState {
    /// Decide whether TEX0 requests a CLUT load, updating CBP0/CBP1
    pub fn write_test(&mut self, tex0: Tex0) -> bool {
        if PsmInfo::of(tex0.psm()).fmt != 3 {
            return false;
        }

        let cbp = tex0.cbp();
        match tex0.cld() {
            1 => true,
            2 => {
                self.cbp[0] = cbp;
                true
            }
            3 => {
                self.cbp[1] = cbp;
                true
            }
            4 if self.cbp[0] != cbp => {
                self.cbp[0] = cbp;
                true
            }
            5 if self.cbp[1] != cbp => {
                self.cbp[1] = cbp;
                true
            }
            _ => false,
        }
    }
}

impl<R: Renderer> GsState<R> {
    #[inline]
    fn is_active_context(&self, i: usize) -> bool {
        self.env.prim.ctxt() as usize == i
    }

    /// Run one PACKED register
    pub(crate) fn apply_packed(&mut self, handler: PackedHandler, q: &[u8]) -> Result<()> {
        match handler {
            PackedHandler::Null | PackedHandler::Nop => {}
            PackedHandler::Prim => self.apply_prim(lane(q, 0) & 0x7ff),
            PackedHandler::Rgba => {
                let mut rgbaq = Rgbaq(
                    u64::from(q[0])
                        | (u64::from(q[4]) << 8)
                        | (u64::from(q[8]) << 16)
                        | (u64::from(q[12]) << 24),
                );
                rgbaq.set_q(self.q);
                self.v.rgbaq = rgbaq;
            }
            PackedHandler::Stq => {
                self.v.st = St(low_u64(q));
                self.q = sanitize_q(lane(q, 2));
            }
            PackedHandler::Uv { alternate } => {
                self.v.uv = (lane(q, 0) & 0x3fff) | ((lane(q, 1) & 0x3fff) << 16);
                if alternate {
                    self.packed_uv_hack = true;
                }
            }
            PackedHandler::Xyzf2 { kick, adc } => {
                let mut xyz = Xyz::default();
                xyz.set_x(lane(q, 0) & 0xffff);
                xyz.set_y(lane(q, 1) & 0xffff);
                xyz.set_z((lane(q, 2) >> 4) & 0x00ff_ffff);
                self.v.xyz = xyz;
                self.v.fog = (lane(q, 3) >> 4) & 0xff;
                self.vertex_kick(kick, adc || packed_adc(q))?;
            }
            PackedHandler::Xyz2 { kick, adc } => {
                let mut xyz = Xyz::default();
                xyz.set_x(lane(q, 0) & 0xffff);
                xyz.set_y(lane(q, 1) & 0xffff);
                xyz.set_z(lane(q, 2));
                self.v.xyz = xyz;
                self.vertex_kick(kick, adc || packed_adc(q))?;
            }
            PackedHandler::Tex0(i) => self.apply_reg(RegHandler::Tex0(i), low_u64(q))?,
            PackedHandler::Clamp(i) => self.apply_reg(RegHandler::Clamp(i), low_u64(q))?,
            PackedHandler::Fog => self.v.fog = (lane(q, 3) >> 4) & 0xff,
            PackedHandler::AddressData => self.apply_address_data(q)?,
        }
        Ok(())
    }

    /// Run one A+D qword: data in bits 0-63, address in bits 64-70
    #[inline]
    pub(crate) fn apply_address_data(&mut self, q: &[u8]) -> Result<()> {
        let handler = self.handlers.reg[(q[8] & 0x7f) as usize];
        self.apply_reg(handler, low_u64(q))
    }

    /// Run one 64-bit register write
    pub(crate) fn apply_reg(&mut self, handler: RegHandler, data: u64) -> Result<()> {
        match handler {
            RegHandler::Null | RegHandler::Nop => {}
            RegHandler::Prim => self.apply_prim((data as u32) & 0x7ff),
            RegHandler::Rgbaq => {
                let mut rgbaq = Rgbaq(data);
                rgbaq.set_q(sanitize_q(rgbaq.q_bits()));
                self.v.rgbaq = rgbaq;
            }
            RegHandler::St => self.v.st = St(data),
            RegHandler::Uv { alternate } => {
                self.v.uv = (data as u32) & 0x3fff_3fff;
                if alternate {
                    self.packed_uv_hack = false;
                }
            }
            RegHandler::Xyzf { kick, adc } => {
                let xyzf = Xyzf(data);
                let mut xyz = Xyz::default();
                xyz.set_x(xyzf.x());
                xyz.set_y(xyzf.y());
                xyz.set_z(xyzf.z());
                self.v.xyz = xyz;
                self.v.fog = xyzf.f();
                self.vertex_kick(kick, adc)?;
            }
            RegHandler::Xyz { kick, adc } => {
                self.v.xyz = Xyz(data);
                self.vertex_kick(kick, adc)?;
            }
            RegHandler::Tex0(i) => self.write_tex0(i, Tex0(data)),
            RegHandler::Clamp(i) => {
                let value = Clamp(data);
                if self.is_active_context(i) && value != self.env.ctxt[i].clamp {
                    self.flush_all();
                }
                self.env.ctxt[i].clamp = value;
            }
            RegHandler::Fog => self.v.fog = Fog(data).f(),
            RegHandler::Tex1(i) => {
                let value = Tex1(data);
                if self.is_active_context(i) && value != self.env.ctxt[i].tex1 {
                    self.flush_all();
                }
                self.env.ctxt[i].tex1 = value;
            }
            RegHandler::Tex2(i) => {
                let merged = (self.env.ctxt[i].tex0.0 & !TEX2_MASK) | (data & TEX2_MASK);
                self.apply_tex0(i, Tex0(merged));
            }
            RegHandler::XyOffset(i) => {
                let value = data & 0x0000_ffff_0000_ffff;
                if value != self.env.ctxt[i].xyoffset.0 {
                    self.flush_all();
                }
                self.env.ctxt[i].xyoffset.0 = value;
                self.env.ctxt[i].update_scissor();
            }
            RegHandler::Prmodecont => self.env.prmodecont.set_ac((data & 1) as u32),
            RegHandler::Prmode => self.write_prmode(data as u32),
            RegHandler::Texclut => {
                let value = Texclut(data);
                if value != self.env.texclut {
                    self.flush_all();
                }
                self.env.texclut = value;
            }
            RegHandler::Scanmsk => {
                let value = Scanmsk(data);
                if value != self.env.scanmsk {
                    self.flush_all();
                }
                self.env.scanmsk = value;
            }
            RegHandler::Miptbp1(i) => {
                let value = Miptbp1(data);
                if self.is_active_context(i) && value != self.env.ctxt[i].miptbp1 {
                    self.flush_all();
                }
                self.env.ctxt[i].miptbp1 = value;
            }
            RegHandler::Miptbp2(i) => {
                let value = Miptbp2(data);
                if self.is_active_context(i) && value != self.env.ctxt[i].miptbp2 {
                    self.flush_all();
                }
                self.env.ctxt[i].miptbp2 = value;
            }
            RegHandler::Texa => {
                let value = Texa(data);
                if value != self.env.texa {
                    self.flush_all();
                }
                self.env.texa = value;
            }
            RegHandler::Fogcol => {
                let value = Fogcol(data);
                if value != self.env.fogcol {
                    self.flush_all();
                }
                self.env.fogcol = value;
            }
            RegHandler::Texflush => trace!("TEXFLUSH = {:#018x}", data),
            RegHandler::Scissor(i) => {
                let value = Scissor(data);
                if self.is_active_context(i) && value != self.env.ctxt[i].scissor {
                    self.flush_all();
                }
                self.env.ctxt[i].scissor = value;
                self.env.ctxt[i].update_scissor();
            }
            RegHandler::Alpha(i) => {
                let value = Alpha(data);
                if self.is_active_context(i) && value != self.env.ctxt[i].alpha {
                    self.flush_all();
                }
                self.env.ctxt[i].alpha = value;
            }
            RegHandler::Dimx => {
                let value = Dimx(data);
                if value != self.env.dimx {
                    self.flush_all();
                    self.env.dimx = value;
                    self.env.update_dimx();
                }
            }
            RegHandler::Dthe => {
                let value = Dthe(data);
                if value != self.env.dthe {
                    self.flush_all();
                }
                self.env.dthe = value;
            }
            RegHandler::Colclamp => {
                let value = Colclamp(data);
                if value != self.env.colclamp {
                    self.flush_all();
                }
                self.env.colclamp = value;
            }
            RegHandler::Test(i) => {
                let value = Test(data);
                if self.is_active_context(i) && value != self.env.ctxt[i].test {
                    self.flush_all();
                }
                self.env.ctxt[i].test = value;
            }
            RegHandler::Pabe => {
                let value = Pabe(data);
                if value != self.env.pabe {
                    self.flush_all();
                }
                self.env.pabe = value;
            }
            RegHandler::Fba(i) => {
                let value = Fba(data);
                if self.is_active_context(i) && value != self.env.ctxt[i].fba {
                    self.flush_all();
                }
                self.env.ctxt[i].fba = value;
            }
            RegHandler::Frame(i) => self.write_frame(i, Frame(data)),
            RegHandler::Zbuf(i) => self.write_zbuf(i, Zbuf(data)),
            RegHandler::Bitbltbuf => {
                let value = Bitbltbuf(data);
                if value != self.env.bitbltbuf {
                    self.flush_write();
                }
                self.env.bitbltbuf = value;
            }
            RegHandler::Trxpos => {
                let value = Trxpos(data);
                if value != self.env.trxpos {
                    self.flush_write();
                }
                self.env.trxpos = value;
            }
            RegHandler::Trxreg => {
                let value = Trxreg(data);
                if value != self.env.trxreg {
                    self.flush_write();
                }
                self.env.trxreg = value;
            }
            RegHandler::Trxdir => self.write_trxdir(Trxdir(data)),
            RegHandler::Hwreg => {
                // Only meaningful while a host to local transfer is running
                if self.env.trxdir.xdir() == 0 {
                    self.write(&data.to_le_bytes());
                }
            }
        }
        Ok(())
    }

    /// Replace PRIM, flushing when the new primitive cannot share a batch
    ///
    /// With PRMODECONT.AC = 1 the whole register is replaced and the context
    /// is reselected; with AC = 0 only the primitive type changes and the
    /// attributes keep coming from PRMODE.
    pub(crate) fn apply_prim(&mut self, prim: u32) {
        let old = self.env.prim;
        let ac = self.env.prmodecont.ac() == 1;

        if PrimType::from_bits(old.prim()).class() == PrimType::from_bits(prim).class() {
            if ac && (old.lo() ^ prim) & PRIM_ATTR_MASK != 0 {
                self.flush_all();
            }
        } else {
            self.flush_all();
        }

        if ac {
            self.env.prim = Prim(u64::from(prim));
            self.update_context();
        } else {
            self.env.prim.set_prim(prim & 7);
        }

        self.update_vertex_kick();

        if self.index.tail == 0 {
            self.vertex.next = 0;
        }

        // Drop vertices left over from an unfinished primitive
        self.vertex.head = self.vertex.next;
        self.vertex.tail = self.vertex.next;
    }

    fn write_prmode(&mut self, value: u32) {
        if self.env.prmodecont.ac() == 1 {
            return;
        }

        if (self.env.prim.lo() ^ value) & PRIM_ATTR_MASK != 0 {
            self.flush_all();
        }

        let prim_type = self.env.prim.prim();
        self.env.prim = Prim(u64::from(value & 0x7ff));
        self.env.prim.set_prim(prim_type);
        self.update_context();
    }

    fn write_tex0(&mut self, i: usize, mut tex0: Tex0) {
        trace!("TEX0_{} = {:#018x}", i + 1, tex0.0);

        // Hardware maximum is 1024x1024
        tex0.set_tw(tex0.tw().min(10));
        tex0.set_th(tex0.th().min(10));

        self.apply_tex0(i, tex0);

        if self.env.ctxt[i].tex1.mtba() != 0 {
            self.derive_miptbp1(i, tex0);
        }
    }

    fn apply_tex0(&mut self, i: usize, mut tex0: Tex0) {
        let clut_load = self.clut.write_test(tex0);

        if clut_load
            || (self.is_active_context(i)
                && (tex0.0 ^ self.env.ctxt[i].tex0.0) & TEX0_FLUSH_MASK != 0)
        {
            self.flush_all();
        }

        tex0.set_cpsm(tex0.cpsm() & 0xa);

        let relayout = (tex0.lo() ^ self.env.ctxt[i].tex0.lo()) & 0x03ff_ffff != 0;
        self.env.ctxt[i].tex0 = tex0;
        if relayout {
            self.env.ctxt[i].update_tex_offset();
        }

        if clut_load {
            self.invalidate_clut(tex0);
        }
    }

    /// Announce the palette area a CLUT load is about to read
    fn invalidate_clut(&mut self, tex0: Tex0) {
        let entries = match tex0.psm() {
            psm::T8 | psm::T8H => 256,
            _ => 16,
        };

        let mut blit = Bitbltbuf::default();
        blit.set_sbp(tex0.cbp());
        blit.set_spsm(tex0.cpsm());

        let rect = if tex0.csm() == 0 {
            blit.set_sbw(1);
            Rect::from_origin(0, 0, 16, entries / 16)
        } else {
            let texclut = self.env.texclut;
            blit.set_sbw(texclut.cbw());
            Rect::from_origin(texclut.cou() * 16, texclut.cov(), entries, 1)
        };

        self.renderer.invalidate_local_mem(blit, rect, true);
    }

    /// Fill MIPTBP1 with tightly packed levels following the base texture
    fn derive_miptbp1(&mut self, i: usize, tex0: Tex0) {
        let bpp = PsmInfo::of(tex0.psm()).bpp;
        let mut bp = tex0.tbp0();
        let mut bw = tex0.tbw();
        let mut w = 1u32 << tex0.tw();
        let mut h = (1u32 << tex0.th()).max(w);

        let mut levels = [(0u32, 0u32); 3];
        for level in levels.iter_mut() {
            bp += ((w * h * bpp >> 3) + 255) >> 8;
            bw = (bw >> 1).max(1);
            w = (w >> 1).max(1);
            h = (h >> 1).max(1);
            *level = (bp, bw);
        }

        let mip = &mut self.env.ctxt[i].miptbp1;
        mip.set_tbp1(levels[0].0);
        mip.set_tbw1(levels[0].1);
        mip.set_tbp2(levels[1].0);
        mip.set_tbw2(levels[1].1);
        mip.set_tbp3(levels[2].0);
        mip.set_tbw3(levels[2].1);
    }

    fn write_frame(&mut self, i: usize, frame: Frame) {
        trace!("FRAME_{} = {:#018x}", i + 1, frame.0);

        if self.is_active_context(i) && frame != self.env.ctxt[i].frame {
            self.flush_all();
        }

        let relayout = (self.env.ctxt[i].frame.lo() ^ frame.lo()) & 0x3f3f_01ff != 0;
        let ctx = &mut self.env.ctxt[i];
        ctx.frame = frame;
        if relayout {
            ctx.update_frame_offsets();
        }

        // Palette formats as render targets only write the bits they own
        let fbmsk = match ctx.frame.psm() {
            psm::T8H => Some(0x00FF_FFFF),
            psm::T4HH => Some(0x0FFF_FFFF),
            psm::T4HL => Some(0xF0FF_FFFF),
            _ => None,
        };
        if let Some(fbmsk) = fbmsk {
            ctx.frame.set_psm(psm::CT32);
            ctx.frame.set_fbmsk(fbmsk);
        }
    }

    fn write_zbuf(&mut self, i: usize, mut zbuf: Zbuf) {
        trace!("ZBUF_{} = {:#018x}", i + 1, zbuf.0);

        zbuf.set_psm(zbuf.psm() | 0x30);

        if self.is_active_context(i) && zbuf != self.env.ctxt[i].zbuf {
            self.flush_all();
        }

        let relayout = (self.env.ctxt[i].zbuf.lo() ^ zbuf.lo()) & 0x3f00_01ff != 0;
        let ctx = &mut self.env.ctxt[i];
        ctx.zbuf = zbuf;
        if relayout {
            ctx.update_frame_offsets();
        }
    }

    fn write_trxdir(&mut self, trxdir: Trxdir) {
        trace!("TRXDIR = {:#018x}", trxdir.0);

        self.flush_all();

        self.env.trxdir = trxdir;

        let pos = self.env.trxpos;
        match trxdir.xdir() {
            0 => self.tr.init(pos.dsax(), pos.dsay(), self.env.bitbltbuf),
            1 => self.tr.init(pos.ssax(), pos.ssay(), self.env.bitbltbuf),
            2 => self.move_rect(),
            _ => warn!("Invalid transfer direction 3 written to TRXDIR, ignoring"),
        }
    }
}
