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

//! GS register layouts
//!
//! Every GS register is a fixed 64-bit word whose fields live at hardware
//! defined bit positions. Each register is modelled as a transparent newtype
//! over `u64` with one getter and one setter per field, so the raw value can
//! be compared, frozen and restored bit-for-bit.
//!
//! The 128-bit GIF tag that heads every GIF packet lives here as well, together
//! with the packed-format and A+D register identifiers.

/// Declares a register newtype with bit field accessors.
///
/// Each field is `getter, setter = lsb, width;` and is read and written as `u32`.
macro_rules! gs_register {
    (
        $(#[$meta:meta])*
        $name:ident {
            $(
                $(#[$fmeta:meta])*
                $field:ident, $setter:ident = $lsb:expr, $width:expr;
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(pub u64);

        #[allow(dead_code)]
        impl $name {
            $(
                $(#[$fmeta])*
                #[inline]
                pub const fn $field(self) -> u32 {
                    ((self.0 >> $lsb) & ((1u64 << $width) - 1)) as u32
                }

                #[inline]
                pub fn $setter(&mut self, value: u32) {
                    let mask = ((1u64 << $width) - 1) << $lsb;
                    self.0 = (self.0 & !mask) | ((u64::from(value) << $lsb) & mask);
                }
            )*

            /// Lower 32 bits of the register
            #[inline]
            pub const fn lo(self) -> u32 {
                self.0 as u32
            }

            /// Upper 32 bits of the register
            #[inline]
            pub const fn hi(self) -> u32 {
                (self.0 >> 32) as u32
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

/// GIF tag data formats (FLG field)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GifFormat {
    /// Each register occupies one 128-bit qword
    Packed = 0,
    /// Each register occupies one 64-bit word
    Reglist = 1,
    /// Raw image data for a host to local transfer
    Image = 2,
    /// Alias of [`GifFormat::Image`]
    Image2 = 3,
}

impl GifFormat {
    /// Decode the 2-bit FLG field
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => GifFormat::Packed,
            1 => GifFormat::Reglist,
            2 => GifFormat::Image,
            _ => GifFormat::Image2,
        }
    }
}

/// 128-bit GIF tag
///
/// # Layout
///
/// | Bits    | Field | Description                              |
/// |---------|-------|------------------------------------------|
/// | 0-14    | NLOOP | Number of register loops                 |
/// | 15      | EOP   | End of packet                            |
/// | 46      | PRE   | PRIM field is valid (PACKED only)        |
/// | 47-57   | PRIM  | Value written to PRIM when PRE is set    |
/// | 58-59   | FLG   | Data format                              |
/// | 60-63   | NREG  | Register count, 0 means 16               |
/// | 64-127  | REGS  | Sixteen 4-bit register descriptors       |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GifTag {
    /// Bits 0-63 (NLOOP, EOP, PRE, PRIM, FLG, NREG)
    pub lo: u64,
    /// Bits 64-127 (REGS)
    pub regs: u64,
}

impl GifTag {
    /// Size of a tag in bytes
    pub const SIZE: usize = 16;

    /// Build a tag from its fields
    ///
    /// # Arguments
    ///
    /// * `nloop` - Loop count (15 bits)
    /// * `eop` - End of packet flag
    /// * `format` - Data format
    /// * `regs` - Register descriptors, at most 16; the length becomes NREG
    ///
    /// # Examples
    ///
    /// ```
    /// use gsrx::core::gs::{GifFormat, GifTag};
    ///
    /// let tag = GifTag::new(1, true, GifFormat::Packed, &[0x0e]);
    /// assert_eq!(tag.nloop(), 1);
    /// assert!(tag.eop());
    /// assert_eq!(tag.nreg(), 1);
    /// assert_eq!(tag.reg(0), 0x0e);
    /// ```
    pub fn new(nloop: u32, eop: bool, format: GifFormat, regs: &[u8]) -> Self {
        let nreg = regs.len().min(16) as u64;
        let mut packed = 0u64;
        for (i, &r) in regs.iter().take(16).enumerate() {
            packed |= u64::from(r & 0x0f) << (i * 4);
        }

        let lo = u64::from(nloop & 0x7fff)
            | (u64::from(eop) << 15)
            | ((format as u64) << 58)
            | ((nreg & 0x0f) << 60);

        Self { lo, regs: packed }
    }

    /// Same tag with PRE set and the given PRIM value attached
    pub fn with_prim(mut self, prim: u32) -> Self {
        self.lo &= !(0x7ffu64 << 47);
        self.lo |= (1u64 << 46) | (u64::from(prim & 0x7ff) << 47);
        self
    }

    /// Decode a tag from 16 little-endian bytes
    pub fn from_bytes(bytes: &[u8; 16]) -> Self {
        let mut lo = [0u8; 8];
        let mut hi = [0u8; 8];
        lo.copy_from_slice(&bytes[..8]);
        hi.copy_from_slice(&bytes[8..]);
        Self {
            lo: u64::from_le_bytes(lo),
            regs: u64::from_le_bytes(hi),
        }
    }

    /// Encode the tag as 16 little-endian bytes
    pub fn to_bytes(self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.lo.to_le_bytes());
        out[8..].copy_from_slice(&self.regs.to_le_bytes());
        out
    }

    /// NLOOP (bits 0-14)
    #[inline]
    pub const fn nloop(self) -> u32 {
        (self.lo & 0x7fff) as u32
    }

    /// EOP (bit 15)
    #[inline]
    pub const fn eop(self) -> bool {
        (self.lo >> 15) & 1 != 0
    }

    /// PRE (bit 46)
    #[inline]
    pub const fn pre(self) -> bool {
        (self.lo >> 46) & 1 != 0
    }

    /// PRIM (bits 47-57)
    #[inline]
    pub const fn prim(self) -> u32 {
        ((self.lo >> 47) & 0x7ff) as u32
    }

    /// FLG (bits 58-59)
    #[inline]
    pub const fn format(self) -> GifFormat {
        GifFormat::from_bits((self.lo >> 58) as u32)
    }

    /// Raw NREG field (bits 60-63); 0 encodes 16 registers
    #[inline]
    pub const fn nreg_raw(self) -> u32 {
        (self.lo >> 60) as u32
    }

    /// Register count with the 0 = 16 rule applied
    #[inline]
    pub const fn nreg(self) -> u32 {
        match self.nreg_raw() {
            0 => 16,
            n => n,
        }
    }

    /// Register descriptor in slot `index` (0-15)
    #[inline]
    pub const fn reg(self, index: usize) -> u8 {
        ((self.regs >> ((index & 15) * 4)) & 0x0f) as u8
    }

    pub(crate) fn set_nloop(&mut self, nloop: u32) {
        self.lo = (self.lo & !0x7fff) | u64::from(nloop & 0x7fff);
    }

    pub(crate) fn set_nreg(&mut self, nreg: u32) {
        self.lo = (self.lo & !(0xfu64 << 60)) | (u64::from(nreg & 0x0f) << 60);
    }
}

/// Register descriptors used in PACKED mode
pub mod packed {
    pub const PRIM: u8 = 0x00;
    pub const RGBA: u8 = 0x01;
    pub const STQ: u8 = 0x02;
    pub const UV: u8 = 0x03;
    pub const XYZF2: u8 = 0x04;
    pub const XYZ2: u8 = 0x05;
    pub const TEX0_1: u8 = 0x06;
    pub const TEX0_2: u8 = 0x07;
    pub const CLAMP_1: u8 = 0x08;
    pub const CLAMP_2: u8 = 0x09;
    pub const FOG: u8 = 0x0a;
    pub const XYZF3: u8 = 0x0c;
    pub const XYZ3: u8 = 0x0d;
    pub const A_D: u8 = 0x0e;
    pub const NOP: u8 = 0x0f;
}

/// A+D register addresses (7 bits)
pub mod addr {
    pub const PRIM: u8 = 0x00;
    pub const RGBAQ: u8 = 0x01;
    pub const ST: u8 = 0x02;
    pub const UV: u8 = 0x03;
    pub const XYZF2: u8 = 0x04;
    pub const XYZ2: u8 = 0x05;
    pub const TEX0_1: u8 = 0x06;
    pub const TEX0_2: u8 = 0x07;
    pub const CLAMP_1: u8 = 0x08;
    pub const CLAMP_2: u8 = 0x09;
    pub const FOG: u8 = 0x0a;
    pub const XYZF3: u8 = 0x0c;
    pub const XYZ3: u8 = 0x0d;
    pub const NOP: u8 = 0x0f;
    pub const TEX1_1: u8 = 0x14;
    pub const TEX1_2: u8 = 0x15;
    pub const TEX2_1: u8 = 0x16;
    pub const TEX2_2: u8 = 0x17;
    pub const XYOFFSET_1: u8 = 0x18;
    pub const XYOFFSET_2: u8 = 0x19;
    pub const PRMODECONT: u8 = 0x1a;
    pub const PRMODE: u8 = 0x1b;
    pub const TEXCLUT: u8 = 0x1c;
    pub const SCANMSK: u8 = 0x22;
    pub const MIPTBP1_1: u8 = 0x34;
    pub const MIPTBP1_2: u8 = 0x35;
    pub const MIPTBP2_1: u8 = 0x36;
    pub const MIPTBP2_2: u8 = 0x37;
    pub const TEXA: u8 = 0x3b;
    pub const FOGCOL: u8 = 0x3d;
    pub const TEXFLUSH: u8 = 0x3f;
    pub const SCISSOR_1: u8 = 0x40;
    pub const SCISSOR_2: u8 = 0x41;
    pub const ALPHA_1: u8 = 0x42;
    pub const ALPHA_2: u8 = 0x43;
    pub const DIMX: u8 = 0x44;
    pub const DTHE: u8 = 0x45;
    pub const COLCLAMP: u8 = 0x46;
    pub const TEST_1: u8 = 0x47;
    pub const TEST_2: u8 = 0x48;
    pub const PABE: u8 = 0x49;
    pub const FBA_1: u8 = 0x4a;
    pub const FBA_2: u8 = 0x4b;
    pub const FRAME_1: u8 = 0x4c;
    pub const FRAME_2: u8 = 0x4d;
    pub const ZBUF_1: u8 = 0x4e;
    pub const ZBUF_2: u8 = 0x4f;
    pub const BITBLTBUF: u8 = 0x50;
    pub const TRXPOS: u8 = 0x51;
    pub const TRXREG: u8 = 0x52;
    pub const TRXDIR: u8 = 0x53;
    pub const HWREG: u8 = 0x54;
    pub const SIGNAL: u8 = 0x60;
    pub const FINISH: u8 = 0x61;
    pub const LABEL: u8 = 0x62;
}

gs_register! {
    /// PRIM: primitive type and drawing attributes
    Prim {
        /// Primitive type (3 bits)
        prim, set_prim = 0, 3;
        /// Gouraud shading
        iip, set_iip = 3, 1;
        /// Texture mapping
        tme, set_tme = 4, 1;
        /// Fogging
        fge, set_fge = 5, 1;
        /// Alpha blending
        abe, set_abe = 6, 1;
        /// Antialiasing
        aa1, set_aa1 = 7, 1;
        /// UV (1) or STQ (0) texture coordinates
        fst, set_fst = 8, 1;
        /// Drawing context selector
        ctxt, set_ctxt = 9, 1;
        /// Fragment value control
        fix, set_fix = 10, 1;
    }
}

gs_register! {
    /// PRMODECONT: selects where primitive attributes come from
    Prmodecont {
        /// 1 = attributes from PRIM, 0 = attributes from PRMODE
        ac, set_ac = 0, 1;
    }
}

gs_register! {
    /// RGBAQ: vertex color and Q
    Rgbaq {
        r, set_r = 0, 8;
        g, set_g = 8, 8;
        b, set_b = 16, 8;
        a, set_a = 24, 8;
        /// Raw IEEE-754 bits of Q
        q_bits, set_q_bits = 32, 32;
    }
}

impl Rgbaq {
    /// Q as a float
    pub fn q(self) -> f32 {
        f32::from_bits(self.q_bits())
    }

    pub fn set_q(&mut self, q: f32) {
        self.set_q_bits(q.to_bits());
    }
}

gs_register! {
    /// ST: texture coordinates as raw floats
    St {
        s_bits, set_s_bits = 0, 32;
        t_bits, set_t_bits = 32, 32;
    }
}

impl St {
    pub fn s(self) -> f32 {
        f32::from_bits(self.s_bits())
    }

    pub fn t(self) -> f32 {
        f32::from_bits(self.t_bits())
    }
}

gs_register! {
    /// UV: texel coordinates (fixed point 10.4)
    Uv {
        u, set_u = 0, 14;
        v, set_v = 16, 14;
    }
}

gs_register! {
    /// XYZ2/XYZ3: vertex position
    Xyz {
        /// X in 12.4 fixed point
        x, set_x = 0, 16;
        /// Y in 12.4 fixed point
        y, set_y = 16, 16;
        z, set_z = 32, 32;
    }
}

gs_register! {
    /// XYZF2/XYZF3: vertex position with fog
    Xyzf {
        x, set_x = 0, 16;
        y, set_y = 16, 16;
        z, set_z = 32, 24;
        f, set_f = 56, 8;
    }
}

gs_register! {
    /// FOG: vertex fog coefficient
    Fog {
        f, set_f = 56, 8;
    }
}

gs_register! {
    /// TEX0: texture buffer and CLUT setup
    Tex0 {
        /// Texture base pointer (block address)
        tbp0, set_tbp0 = 0, 14;
        /// Texture buffer width (units of 64 pixels)
        tbw, set_tbw = 14, 6;
        psm, set_psm = 20, 6;
        /// log2 of texture width
        tw, set_tw = 26, 4;
        /// log2 of texture height
        th, set_th = 30, 4;
        tcc, set_tcc = 34, 1;
        tfx, set_tfx = 35, 2;
        /// CLUT base pointer
        cbp, set_cbp = 37, 14;
        cpsm, set_cpsm = 51, 4;
        csm, set_csm = 55, 1;
        csa, set_csa = 56, 5;
        /// CLUT load control
        cld, set_cld = 61, 3;
    }
}

gs_register! {
    /// TEX1: LOD and filtering
    Tex1 {
        lcm, set_lcm = 0, 1;
        mxl, set_mxl = 2, 3;
        mmag, set_mmag = 5, 1;
        mmin, set_mmin = 6, 3;
        /// Derive MIPTBP1 from TEX0 automatically
        mtba, set_mtba = 9, 1;
        l, set_l = 19, 2;
        k, set_k = 32, 12;
    }
}

gs_register! {
    /// CLAMP: texture wrap modes
    Clamp {
        wms, set_wms = 0, 2;
        wmt, set_wmt = 2, 2;
        minu, set_minu = 4, 10;
        maxu, set_maxu = 14, 10;
        minv, set_minv = 24, 10;
        maxv, set_maxv = 34, 10;
    }
}

gs_register! {
    /// XYOFFSET: primitive to window coordinate offset
    XyOffset {
        ofx, set_ofx = 0, 16;
        ofy, set_ofy = 32, 16;
    }
}

gs_register! {
    /// TEXCLUT: CLUT position for CSM2
    Texclut {
        cbw, set_cbw = 0, 6;
        cou, set_cou = 6, 6;
        cov, set_cov = 12, 10;
    }
}

gs_register! {
    /// SCANMSK: raster line masking
    Scanmsk {
        msk, set_msk = 0, 2;
    }
}

gs_register! {
    /// MIPTBP1: mip levels 1-3
    Miptbp1 {
        tbp1, set_tbp1 = 0, 14;
        tbw1, set_tbw1 = 14, 6;
        tbp2, set_tbp2 = 20, 14;
        tbw2, set_tbw2 = 34, 6;
        tbp3, set_tbp3 = 40, 14;
        tbw3, set_tbw3 = 54, 6;
    }
}

gs_register! {
    /// MIPTBP2: mip levels 4-6
    Miptbp2 {
        tbp4, set_tbp4 = 0, 14;
        tbw4, set_tbw4 = 14, 6;
        tbp5, set_tbp5 = 20, 14;
        tbw5, set_tbw5 = 34, 6;
        tbp6, set_tbp6 = 40, 14;
        tbw6, set_tbw6 = 54, 6;
    }
}

gs_register! {
    /// TEXA: alpha expansion for 24/16-bit textures
    Texa {
        ta0, set_ta0 = 0, 8;
        aem, set_aem = 15, 1;
        ta1, set_ta1 = 32, 8;
    }
}

gs_register! {
    /// FOGCOL: distant fog color
    Fogcol {
        fcr, set_fcr = 0, 8;
        fcg, set_fcg = 8, 8;
        fcb, set_fcb = 16, 8;
    }
}

gs_register! {
    /// SCISSOR: per-context clip rectangle in window pixels (inclusive)
    Scissor {
        scax0, set_scax0 = 0, 11;
        scax1, set_scax1 = 16, 11;
        scay0, set_scay0 = 32, 11;
        scay1, set_scay1 = 48, 11;
    }
}

gs_register! {
    /// ALPHA: blending equation ((A - B) * C >> 7) + D
    Alpha {
        a, set_a = 0, 2;
        b, set_b = 2, 2;
        c, set_c = 4, 2;
        d, set_d = 6, 2;
        fix, set_fix = 32, 8;
    }
}

gs_register! {
    /// DIMX: 4x4 dither matrix, signed 3-bit entries in 4-bit slots
    Dimx {}
}

impl Dimx {
    /// Dither entry at row `i`, column `j`, sign extended
    pub fn entry(self, i: usize, j: usize) -> i8 {
        let shift = ((i & 3) * 4 + (j & 3)) * 4;
        let raw = ((self.0 >> shift) & 7) as i8;
        (raw << 5) >> 5
    }
}

gs_register! {
    /// DTHE: dithering enable
    Dthe {
        dthe, set_dthe = 0, 1;
    }
}

gs_register! {
    /// COLCLAMP: color clamp (1) or wrap (0)
    Colclamp {
        clamp, set_clamp = 0, 1;
    }
}

gs_register! {
    /// TEST: pixel tests
    Test {
        ate, set_ate = 0, 1;
        atst, set_atst = 1, 3;
        aref, set_aref = 4, 8;
        afail, set_afail = 12, 2;
        date, set_date = 14, 1;
        datm, set_datm = 15, 1;
        zte, set_zte = 16, 1;
        ztst, set_ztst = 17, 2;
    }
}

gs_register! {
    /// PABE: per-pixel alpha blending enable
    Pabe {
        pabe, set_pabe = 0, 1;
    }
}

gs_register! {
    /// FBA: alpha correction
    Fba {
        fba, set_fba = 0, 1;
    }
}

gs_register! {
    /// FRAME: frame buffer setup
    Frame {
        /// Frame base pointer (page address, 2048 words per page)
        fbp, set_fbp = 0, 9;
        fbw, set_fbw = 16, 6;
        psm, set_psm = 24, 6;
        /// Write mask, set bits are not written
        fbmsk, set_fbmsk = 32, 32;
    }
}

impl Frame {
    /// Frame base as a block address
    pub const fn block(self) -> u32 {
        self.fbp() << 5
    }
}

gs_register! {
    /// ZBUF: depth buffer setup
    Zbuf {
        zbp, set_zbp = 0, 9;
        psm, set_psm = 24, 6;
        zmsk, set_zmsk = 32, 1;
    }
}

impl Zbuf {
    /// Depth base as a block address
    pub const fn block(self) -> u32 {
        self.zbp() << 5
    }
}

gs_register! {
    /// BITBLTBUF: transfer buffer setup
    Bitbltbuf {
        sbp, set_sbp = 0, 14;
        sbw, set_sbw = 16, 6;
        spsm, set_spsm = 24, 6;
        dbp, set_dbp = 32, 14;
        dbw, set_dbw = 48, 6;
        dpsm, set_dpsm = 56, 6;
    }
}

gs_register! {
    /// TRXPOS: transfer origins and local to local copy direction
    Trxpos {
        ssax, set_ssax = 0, 11;
        ssay, set_ssay = 16, 11;
        dsax, set_dsax = 32, 11;
        dsay, set_dsay = 48, 11;
        /// Copy rows bottom to top
        diry, set_diry = 59, 1;
        /// Copy columns right to left
        dirx, set_dirx = 60, 1;
    }
}

gs_register! {
    /// TRXREG: transfer rectangle size in pixels
    Trxreg {
        rrw, set_rrw = 0, 12;
        rrh, set_rrh = 32, 12;
    }
}

gs_register! {
    /// TRXDIR: transfer direction, writing it starts the transfer
    Trxdir {
        /// 0 host to local, 1 local to host, 2 local to local, 3 invalid
        xdir, set_xdir = 0, 2;
    }
}
