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

//! Test fixtures for common front end scenarios

use gsrx::core::error::RendererError;
use gsrx::core::gs::{
    addr, Bitbltbuf, DrawCall, GsState, PacketWriter, Prim, PrimClass, PrimType, Rect, Renderer,
    Scissor, Trxpos, Trxreg,
};

/// Summary of one draw call
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Batch {
    pub class: PrimClass,
    pub context: usize,
    /// Vertex positions in index order, whole pixels
    pub points: Vec<(u32, u32)>,
}

/// Renderer that keeps a log of what it was asked to do
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct LogRenderer {
    pub batches: Vec<Batch>,
    pub invalidated: Vec<Rect>,
}

impl Renderer for LogRenderer {
    fn draw(&mut self, call: &DrawCall<'_>) -> Result<(), RendererError> {
        let points = call
            .indices
            .iter()
            .map(|&i| {
                let v = &call.vertices[i as usize];
                (v.xyz.x() >> 4, v.xyz.y() >> 4)
            })
            .collect();

        self.batches.push(Batch {
            class: call.class,
            context: call.prim.ctxt() as usize,
            points,
        });
        Ok(())
    }

    fn invalidate_video_mem(&mut self, _blit: Bitbltbuf, rect: Rect) {
        self.invalidated.push(rect);
    }
}

/// Create a GS with both scissors covering the whole drawing plane
#[allow(dead_code)]
pub fn create_test_gs() -> GsState<LogRenderer> {
    let mut gs = GsState::new(LogRenderer::default());
    let mut s = Scissor::default();
    s.set_scax1(2047);
    s.set_scay1(2047);
    gs.write_register(addr::SCISSOR_1, s.0)
        .expect("Failed to write SCISSOR_1");
    gs.write_register(addr::SCISSOR_2, s.0)
        .expect("Failed to write SCISSOR_2");
    gs
}

/// A+D packet selecting topology `t` and kicking `points`
#[allow(dead_code)]
pub fn primitive_packet(t: PrimType, points: &[(u32, u32)], eop: bool) -> Vec<u8> {
    let mut p = Prim::default();
    p.set_prim(t as u32);

    let mut w = PacketWriter::new()
        .ad_tag(1 + points.len() as u32, eop)
        .ad(addr::PRIM, p.0);
    for &(x, y) in points {
        w = w.ad(addr::XYZ2, u64::from(x << 4) | (u64::from(y << 4) << 16));
    }
    w.finish()
}

/// A+D packet programming a transfer and setting its direction
#[allow(dead_code)]
pub fn transfer_setup_packet(
    psm: u32,
    src: (u32, u32),
    dst: (u32, u32),
    size: (u32, u32),
    reverse: bool,
    xdir: u64,
) -> Vec<u8> {
    let mut blit = Bitbltbuf::default();
    blit.set_sbw(1);
    blit.set_spsm(psm);
    blit.set_dbw(1);
    blit.set_dpsm(psm);

    let mut pos = Trxpos::default();
    pos.set_ssax(src.0);
    pos.set_ssay(src.1);
    pos.set_dsax(dst.0);
    pos.set_dsay(dst.1);
    pos.set_dirx(u32::from(reverse));
    pos.set_diry(u32::from(reverse));

    let mut reg = Trxreg::default();
    reg.set_rrw(size.0);
    reg.set_rrh(size.1);

    PacketWriter::new()
        .ad_tag(4, false)
        .ad(addr::BITBLTBUF, blit.0)
        .ad(addr::TRXPOS, pos.0)
        .ad(addr::TRXREG, reg.0)
        .ad(addr::TRXDIR, xdir)
        .finish()
}
