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

//! Register dispatch tests
//! Tests for flush-on-change, PRIM handling and derived register state

use super::super::*;
use super::fixtures::*;
use crate::core::config::GsConfig;

/// Queue one triangle so a later flush is observable
fn queue_triangle(gs: &mut GsState<RecordingRenderer>) {
    kick(gs, PrimType::Triangle, &[(0, 0), (10, 0), (0, 10)]);
    assert_eq!(gs.queued_indices().len(), 3);
}

#[test]
fn test_initial_state() {
    let gs = gs();
    assert_eq!(gs.env().prmodecont.ac(), 1);
    assert_eq!(gs.context_index(), 0);
    assert_eq!(gs.q(), 1.0);
    assert_eq!(gs.env().trxdir.xdir(), 0);
}

#[test]
fn test_active_context_register_flushes() {
    let mut gs = gs();
    queue_triangle(&mut gs);

    gs.write_register(addr::TEST_1, 0x0003_0000).unwrap();
    assert_eq!(gs.renderer().draws.len(), 1);
    assert_eq!(gs.renderer().draws[0].context.test.0, 0);
    assert_eq!(gs.env().ctxt[0].test.0, 0x0003_0000);
}

#[test]
fn test_inactive_context_register_does_not_flush() {
    let mut gs = gs();
    queue_triangle(&mut gs);

    gs.write_register(addr::ALPHA_2, 0x44).unwrap();
    gs.write_register(addr::TEX1_2, 0x200).unwrap();
    gs.write_register(addr::FRAME_2, 0x100).unwrap();
    assert!(gs.renderer().draws.is_empty());
    assert_eq!(gs.env().ctxt[1].alpha.0, 0x44);
}

#[test]
fn test_unchanged_value_does_not_flush() {
    let mut gs = gs();
    gs.write_register(addr::FOGCOL, 0x112233).unwrap();
    queue_triangle(&mut gs);

    gs.write_register(addr::FOGCOL, 0x112233).unwrap();
    assert!(gs.renderer().draws.is_empty());

    gs.write_register(addr::FOGCOL, 0x445566).unwrap();
    assert_eq!(gs.renderer().draws.len(), 1);
}

#[test]
fn test_flush_between_kicks_contains_prior_vertices() {
    let mut gs = gs();

    let packet = PacketWriter::new()
        .ad_tag(8, true)
        .ad(addr::PRIM, prim(PrimType::Triangle))
        .ad(addr::XYZ2, xyz(0, 0, 0))
        .ad(addr::XYZ2, xyz(8, 0, 0))
        .ad(addr::XYZ2, xyz(0, 8, 0))
        .ad(addr::ALPHA_1, 0x48)
        .ad(addr::XYZ2, xyz(20, 20, 0))
        .ad(addr::XYZ2, xyz(28, 20, 0))
        .ad(addr::XYZ2, xyz(20, 28, 0))
        .finish();
    gs.transfer(2, &packet).unwrap();

    let draws = &gs.renderer().draws;
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].indices, vec![0, 1, 2]);
    assert_eq!(draws[0].context.alpha.0, 0);
    assert_eq!(gs.queued_indices(), &[0, 1, 2]);
}

#[test]
fn test_env_registers_flush() {
    for (reg, value) in [
        (addr::TEXCLUT, 0x1234u64),
        (addr::SCANMSK, 2),
        (addr::TEXA, 0x80_0000_8000),
        (addr::DTHE, 1),
        (addr::COLCLAMP, 1),
        (addr::PABE, 1),
        (addr::DIMX, 0x1111),
    ] {
        let mut gs = gs();
        queue_triangle(&mut gs);
        gs.write_register(reg, value).unwrap();
        assert_eq!(gs.renderer().draws.len(), 1, "register {:#04x}", reg);
    }
}

#[test]
fn test_dimx_updates_dither_matrix() {
    let mut gs = gs();
    // Entry (0, 0) = -4, entry (3, 3) = 3
    let dimx = 0x4u64 | (0x3u64 << 60);
    gs.write_register(addr::DIMX, dimx).unwrap();
    let matrix = gs.env().dither_matrix();
    assert_eq!(matrix[0][0], -4);
    assert_eq!(matrix[3][3], 3);
}

#[test]
fn test_prim_class_change_flushes() {
    let mut gs = gs();
    queue_triangle(&mut gs);

    // Same class: no flush
    gs.write_register(addr::PRIM, prim(PrimType::TriangleStrip))
        .unwrap();
    assert!(gs.renderer().draws.is_empty());

    gs.write_register(addr::PRIM, prim(PrimType::Sprite)).unwrap();
    assert_eq!(gs.renderer().draws.len(), 1);
}

#[test]
fn test_prim_attribute_change_flushes() {
    let mut gs = gs();
    queue_triangle(&mut gs);

    let mut p = Prim(prim(PrimType::Triangle));
    p.set_abe(1);
    gs.write_register(addr::PRIM, p.0).unwrap();
    assert_eq!(gs.renderer().draws.len(), 1);
}

#[test]
fn test_prim_selects_context() {
    let mut gs = gs();
    let mut p = Prim(prim(PrimType::Sprite));
    p.set_ctxt(1);
    gs.write_register(addr::PRIM, p.0).unwrap();
    assert_eq!(gs.context_index(), 1);
}

#[test]
fn test_prim_drops_incomplete_primitive() {
    let mut gs = gs();
    let packet = PacketWriter::new()
        .ad_tag(3, true)
        .ad(addr::PRIM, prim(PrimType::Triangle))
        .ad(addr::XYZ2, xyz(0, 0, 0))
        .ad(addr::XYZ2, xyz(8, 0, 0))
        .finish();
    gs.transfer(2, &packet).unwrap();
    assert_eq!(gs.vertex_cursors(), (0, 2, 0));

    gs.write_register(addr::PRIM, prim(PrimType::Triangle))
        .unwrap();
    assert_eq!(gs.vertex_cursors(), (0, 0, 0));
}

#[test]
fn test_prmode_with_ac_clear() {
    let mut gs = gs();
    gs.write_register(addr::PRMODECONT, 0).unwrap();

    // Only the type is taken from PRIM
    let mut p = Prim(prim(PrimType::Line));
    p.set_tme(1);
    gs.write_register(addr::PRIM, p.0).unwrap();
    assert_eq!(gs.env().prim.prim(), PrimType::Line as u32);
    assert_eq!(gs.env().prim.tme(), 0);

    // Attributes come from PRMODE, the type is kept
    let mut mode = Prim(prim(PrimType::Sprite));
    mode.set_fge(1);
    mode.set_ctxt(1);
    gs.write_register(addr::PRMODE, mode.0).unwrap();
    assert_eq!(gs.env().prim.prim(), PrimType::Line as u32);
    assert_eq!(gs.env().prim.fge(), 1);
    assert_eq!(gs.context_index(), 1);
}

#[test]
fn test_prmode_ignored_with_ac_set() {
    let mut gs = gs();
    let mut mode = Prim::default();
    mode.set_fge(1);
    gs.write_register(addr::PRMODE, mode.0).unwrap();
    assert_eq!(gs.env().prim.fge(), 0);
}

#[test]
fn test_rgbaq_q_rules() {
    let mut gs = gs();

    let mut c = Rgbaq::default();
    c.set_q_bits(0);
    gs.write_register(addr::RGBAQ, c.0).unwrap();
    assert_eq!(gs.vertex().rgbaq.q(), 1.0);

    c.set_q(f32::NAN);
    gs.write_register(addr::RGBAQ, c.0).unwrap();
    assert_eq!(gs.vertex().rgbaq.q(), f32::MAX);

    c.set_q(-0.0);
    gs.write_register(addr::RGBAQ, c.0).unwrap();
    assert_eq!(gs.vertex().rgbaq.q_bits(), (-0.0f32).to_bits());
}

#[test]
fn test_packed_stq_and_rgba_carry_q() {
    let mut gs = gs();
    let packet = PacketWriter::new()
        .tag(GifTag::new(
            3,
            true,
            GifFormat::Packed,
            &[packed::STQ, packed::RGBA],
        ))
        .stq(0.5, 0.75, 0.0)
        .rgba(1, 2, 3, 4)
        .stq(0.5, 0.75, f32::NAN)
        .rgba(5, 6, 7, 8)
        .stq(0.5, 0.75, 2.5)
        .rgba(9, 10, 11, 12)
        .finish();

    gs.transfer(2, &packet[..16 * 3]).unwrap();
    assert_eq!(gs.vertex().rgbaq.q(), 1.0);
    assert_eq!(gs.vertex().st.s(), 0.5);
    assert_eq!(gs.vertex().st.t(), 0.75);

    gs.transfer(2, &packet[16 * 3..16 * 5]).unwrap();
    assert_eq!(gs.vertex().rgbaq.q(), f32::MAX);

    gs.transfer(2, &packet[16 * 5..]).unwrap();
    let c = gs.vertex().rgbaq;
    assert_eq!((c.r(), c.g(), c.b(), c.a()), (9, 10, 11, 12));
    assert_eq!(c.q(), 2.5);
}

#[test]
fn test_uv_handlers() {
    let mut gs = gs();
    let packet = PacketWriter::new()
        .tag(GifTag::new(1, true, GifFormat::Packed, &[packed::UV]))
        .qword(0x7fff | (0x4001u128 << 32))
        .finish();
    gs.transfer(2, &packet).unwrap();
    assert_eq!(gs.vertex().uv, 0x3fff | (0x0001 << 16));

    gs.write_register(addr::UV, 0xffff_ffff).unwrap();
    assert_eq!(gs.vertex().uv, 0x3fff_3fff);
}

#[test]
fn test_alternate_uv_rounding_flag() {
    let config = GsConfig {
        alternate_uv_rounding: true,
        ..GsConfig::default()
    };
    let mut gs = gs_with(config);

    let packet = PacketWriter::new()
        .tag(GifTag::new(1, true, GifFormat::Packed, &[packed::UV]))
        .qword(0x10 | (0x20u128 << 32))
        .finish();
    gs.transfer(2, &packet).unwrap();
    kick(&mut gs, PrimType::Sprite, &[(0, 0), (4, 4)]);
    gs.flush().unwrap();
    assert!(gs.renderer().draws[0].packed_uv_hack);

    gs.write_register(addr::UV, 0x10).unwrap();
    kick(&mut gs, PrimType::Sprite, &[(0, 0), (4, 4)]);
    gs.flush().unwrap();
    assert!(!gs.renderer().draws[1].packed_uv_hack);
}

#[test]
fn test_fog_handlers() {
    let mut gs = gs();
    gs.write_register(addr::FOG, 0x5au64 << 56).unwrap();
    assert_eq!(gs.vertex().fog, 0x5a);

    let packet = PacketWriter::new()
        .tag(GifTag::new(1, true, GifFormat::Packed, &[packed::FOG]))
        .qword(0xa5u128 << 100)
        .finish();
    gs.transfer(2, &packet).unwrap();
    assert_eq!(gs.vertex().fog, 0xa5);
}

#[test]
fn test_tex0_size_clamped() {
    let mut gs = gs();
    let mut tex0 = Tex0::default();
    tex0.set_tw(15);
    tex0.set_th(11);
    gs.write_register(addr::TEX0_1, tex0.0).unwrap();

    assert_eq!(gs.env().ctxt[0].tex0.tw(), 10);
    assert_eq!(gs.env().ctxt[0].tex0.th(), 10);
}

#[test]
fn test_tex0_cpsm_masked_and_offset_updated() {
    let mut gs = gs();
    let mut tex0 = Tex0::default();
    tex0.set_tbp0(0x200);
    tex0.set_tbw(4);
    tex0.set_psm(psm::CT32);
    tex0.set_cpsm(0xf);
    gs.write_register(addr::TEX0_2, tex0.0).unwrap();

    let ctx = &gs.env().ctxt[1];
    assert_eq!(ctx.tex0.cpsm(), 0xa);
    assert_eq!(ctx.offsets().tex, MemOffset::new(0x200, 4, psm::CT32));
}

#[test]
fn test_tex0_clut_load_flushes_and_invalidates() {
    let mut gs = gs();
    queue_triangle(&mut gs);

    let mut tex0 = Tex0::default();
    tex0.set_psm(psm::T8);
    tex0.set_cbp(0x300);
    tex0.set_cld(1);
    // Context 2 is inactive, only the CLUT load can flush
    gs.write_register(addr::TEX0_2, tex0.0).unwrap();

    assert_eq!(gs.renderer().draws.len(), 1);
    let (blit, rect, clut) = gs.renderer().local_invalidations[0];
    assert!(clut);
    assert_eq!(blit.sbp(), 0x300);
    assert_eq!(rect, Rect::from_origin(0, 0, 16, 16));
}

#[test]
fn test_tex0_conditional_clut_load() {
    let mut gs = gs();
    let mut tex0 = Tex0::default();
    tex0.set_psm(psm::T4);
    tex0.set_cbp(0x300);
    tex0.set_cld(4);

    gs.write_register(addr::TEX0_2, tex0.0).unwrap();
    gs.write_register(addr::TEX0_2, tex0.0).unwrap();
    assert_eq!(gs.renderer().local_invalidations.len(), 1);

    tex0.set_cbp(0x310);
    gs.write_register(addr::TEX0_2, tex0.0).unwrap();
    assert_eq!(gs.renderer().local_invalidations.len(), 2);
}

#[test]
fn test_tex2_merges_palette_fields() {
    let mut gs = gs();
    let mut tex0 = Tex0::default();
    tex0.set_tbp0(0x123);
    tex0.set_tw(8);
    tex0.set_th(7);
    tex0.set_psm(psm::CT32);
    gs.write_register(addr::TEX0_1, tex0.0).unwrap();

    let mut tex2 = Tex0::default();
    tex2.set_tbp0(0x3fff);
    tex2.set_psm(psm::T8);
    tex2.set_cbp(0x2000);
    gs.write_register(addr::TEX2_1, tex2.0).unwrap();

    let merged = gs.env().ctxt[0].tex0;
    assert_eq!(merged.tbp0(), 0x123);
    assert_eq!(merged.tw(), 8);
    assert_eq!(merged.th(), 7);
    assert_eq!(merged.psm(), psm::T8);
    assert_eq!(merged.cbp(), 0x2000);
}

#[test]
fn test_mip_base_pointers_derived() {
    let mut gs = gs();
    let mut tex1 = Tex1::default();
    tex1.set_mtba(1);
    gs.write_register(addr::TEX1_1, tex1.0).unwrap();

    let mut tex0 = Tex0::default();
    tex0.set_tbp0(0x100);
    tex0.set_tbw(4);
    tex0.set_tw(8);
    tex0.set_th(8);
    tex0.set_psm(psm::CT32);
    gs.write_register(addr::TEX0_1, tex0.0).unwrap();

    // 256x256x32 is 256 KiB or 1024 blocks, then 256 and 64 blocks
    let mip = gs.env().ctxt[0].miptbp1;
    assert_eq!(mip.tbp1(), 0x100 + 1024);
    assert_eq!(mip.tbw1(), 2);
    assert_eq!(mip.tbp2(), 0x100 + 1024 + 256);
    assert_eq!(mip.tbw2(), 1);
    assert_eq!(mip.tbp3(), 0x100 + 1024 + 256 + 64);
    assert_eq!(mip.tbw3(), 1);
}

#[test]
fn test_frame_psm_corrections() {
    let mut gs = gs();
    for (psm_in, mask) in [
        (psm::T8H, 0x00FF_FFFF),
        (psm::T4HH, 0x0FFF_FFFF),
        (psm::T4HL, 0xF0FF_FFFF),
    ] {
        let mut frame = Frame::default();
        frame.set_fbp(0x20);
        frame.set_fbw(10);
        frame.set_psm(psm_in);
        gs.write_register(addr::FRAME_1, frame.0).unwrap();

        let stored = gs.env().ctxt[0].frame;
        assert_eq!(stored.psm(), psm::CT32);
        assert_eq!(stored.fbmsk(), mask);
    }

    let offsets = gs.env().ctxt[0].offsets();
    assert_eq!(offsets.fb.bp, 0x20 << 5);
    assert_eq!(offsets.fb.bw, 10);
}

#[test]
fn test_zbuf_forces_depth_format() {
    let mut gs = gs();
    let mut zbuf = Zbuf::default();
    zbuf.set_zbp(0x40);
    zbuf.set_psm(0x02);
    gs.write_register(addr::ZBUF_1, zbuf.0).unwrap();

    let ctx = &gs.env().ctxt[0];
    assert_eq!(ctx.zbuf.psm(), psm::Z16);
    assert_eq!(ctx.offsets().zb.psm, psm::Z16);
    assert_eq!(ctx.offsets().zb.bp, 0x40 << 5);
}

#[test]
fn test_xyoffset_masked_and_flushes() {
    let mut gs = gs();
    queue_triangle(&mut gs);

    // Context 2 is inactive but an offset change still flushes
    gs.write_register(addr::XYOFFSET_2, 0xffff_1234_ffff_5678)
        .unwrap();
    assert_eq!(gs.renderer().draws.len(), 1);

    let offset = gs.env().ctxt[1].xyoffset;
    assert_eq!(offset.ofx(), 0x5678);
    assert_eq!(offset.ofy(), 0x1234);
    assert_eq!(offset.0, 0x0000_1234_0000_5678);
}

#[test]
fn test_scissor_box_derived() {
    let mut gs = gs();
    gs.write_register(addr::SCISSOR_1, scissor(10, 20, 30, 40))
        .unwrap();
    let b = gs.env().ctxt[0].scissor_box();
    assert_eq!((b.x0, b.y0, b.x1, b.y1), (160, 320, 480, 640));
}

#[test]
fn test_unmapped_and_privileged_addresses_ignored() {
    let mut gs = gs();
    let before = *gs.env();
    for reg in [0x0bu8, 0x1d, 0x60, 0x61, 0x62, 0x7f] {
        gs.write_register(reg, u64::MAX).unwrap();
    }
    assert_eq!(*gs.env(), before);
}

#[test]
fn test_frame_skip_ignores_positions() {
    let mut gs = gs();
    gs.set_frame_skip(true);
    kick(&mut gs, PrimType::Triangle, &[(0, 0), (10, 0), (0, 10)]);
    assert!(gs.queued_vertices().is_empty());

    gs.set_frame_skip(false);
    kick(&mut gs, PrimType::Triangle, &[(0, 0), (10, 0), (0, 10)]);
    assert_eq!(gs.queued_indices().len(), 3);
}

#[test]
fn test_reconfigure_flushes_first() {
    let mut gs = gs();
    queue_triangle(&mut gs);

    let config = GsConfig {
        auto_flush: true,
        ..GsConfig::default()
    };
    gs.reconfigure(config).unwrap();
    assert_eq!(gs.renderer().draws.len(), 1);
    assert!(gs.config().auto_flush);
}

#[test]
fn test_config_from_toml() {
    let config = GsConfig::from_toml_str("auto_flush = true\nalternate_uv_rounding = true")
        .unwrap();
    assert!(config.auto_flush);
    assert!(config.alternate_uv_rounding);

    let text = config.to_toml_string().unwrap();
    assert_eq!(GsConfig::from_toml_str(&text).unwrap(), config);

    assert_eq!(GsConfig::from_toml_str("").unwrap(), GsConfig::default());
    assert!(matches!(
        GsConfig::from_toml_str("auto_flush = 3"),
        Err(GsError::Config(_))
    ));
}
