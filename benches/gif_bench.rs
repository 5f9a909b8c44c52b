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

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use gsrx::core::gs::{
    addr, packed, Bitbltbuf, GifFormat, GifTag, GsState, NullRenderer, PacketWriter, Prim,
    PrimType, Scissor, Trxpos, Trxreg,
};
use std::hint::black_box;

fn open_scissor(gs: &mut GsState<NullRenderer>) {
    let mut s = Scissor::default();
    s.set_scax1(2047);
    s.set_scay1(2047);
    gs.write_register(addr::SCISSOR_1, s.0).unwrap();
}

fn prim(t: PrimType) -> u64 {
    let mut p = Prim::default();
    p.set_prim(t as u32);
    p.0
}

/// Triangle strip of `count` vertices in STQ/RGBA/XYZ2 packed form
fn packed_strip(count: u32) -> Vec<u8> {
    let mut w = PacketWriter::new()
        .ad_tag(1, false)
        .ad(addr::PRIM, prim(PrimType::TriangleStrip))
        .tag(GifTag::new(
            count,
            true,
            GifFormat::Packed,
            &[packed::STQ, packed::RGBA, packed::XYZ2],
        ));
    for i in 0..count {
        let x = ((i / 2) % 512) as u16;
        let y = (i % 2) as u16 * 16;
        w = w
            .stq(0.5, 0.5, 1.0)
            .rgba(0x80, 0x80, 0x80, 0x80)
            .xyz2(x << 4, y << 4, 0, false);
    }
    w.finish()
}

/// The same strip written through A+D only
fn ad_strip(count: u32) -> Vec<u8> {
    let mut w = PacketWriter::new()
        .ad_tag(1 + count * 2, true)
        .ad(addr::PRIM, prim(PrimType::TriangleStrip));
    for i in 0..count {
        let x = u64::from((i / 2) % 512) << 4;
        let y = u64::from(i % 2) << 8;
        w = w
            .ad(addr::RGBAQ, 0x3f80_0000_8080_8080)
            .ad(addr::XYZ2, x | (y << 16));
    }
    w.finish()
}

fn gif_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("gif");

    for count in [96u32, 960, 9600].iter() {
        let data = packed_strip(*count);
        group.bench_with_input(BenchmarkId::new("packed_fast_path", count), &data, |b, data| {
            let mut gs = GsState::new(NullRenderer::new());
            open_scissor(&mut gs);
            b.iter(|| {
                gs.transfer(2, black_box(data)).unwrap();
                gs.flush().unwrap();
            });
        });

        // Qword at a time forces the generic step loop
        group.bench_with_input(BenchmarkId::new("packed_per_qword", count), &data, |b, data| {
            let mut gs = GsState::new(NullRenderer::new());
            open_scissor(&mut gs);
            b.iter(|| {
                for qword in data.chunks(16) {
                    gs.transfer(2, black_box(qword)).unwrap();
                }
                gs.flush().unwrap();
            });
        });

        let data = ad_strip(*count);
        group.bench_with_input(BenchmarkId::new("address_data", count), &data, |b, data| {
            let mut gs = GsState::new(NullRenderer::new());
            open_scissor(&mut gs);
            b.iter(|| {
                gs.transfer(2, black_box(data)).unwrap();
                gs.flush().unwrap();
            });
        });
    }

    group.finish();
}

fn arm_transfer(gs: &mut GsState<NullRenderer>, w: u32, h: u32, dsax: u32, xdir: u64) {
    let mut blit = Bitbltbuf::default();
    blit.set_sbw(4);
    blit.set_dbw(4);
    gs.write_register(addr::BITBLTBUF, blit.0).unwrap();

    let mut pos = Trxpos::default();
    pos.set_dsax(dsax);
    gs.write_register(addr::TRXPOS, pos.0).unwrap();

    let mut reg = Trxreg::default();
    reg.set_rrw(w);
    reg.set_rrh(h);
    gs.write_register(addr::TRXREG, reg.0).unwrap();
    gs.write_register(addr::TRXDIR, xdir).unwrap();
}

fn transfer_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("local_memory");

    let image: Vec<u8> = (0..256 * 256 * 4).map(|i| i as u8).collect();
    let packet = PacketWriter::new()
        .tag(GifTag::new((image.len() / 16) as u32, true, GifFormat::Image, &[]))
        .image(&image)
        .finish();

    group.bench_function("upload_256x256", |b| {
        let mut gs = GsState::new(NullRenderer::new());
        b.iter(|| {
            arm_transfer(&mut gs, 256, 256, 0, 0);
            gs.transfer(2, black_box(&packet)).unwrap();
        });
    });

    group.bench_function("upload_256x256_split", |b| {
        let mut gs = GsState::new(NullRenderer::new());
        b.iter(|| {
            arm_transfer(&mut gs, 256, 256, 0, 0);
            for piece in packet.chunks(4096) {
                gs.transfer(2, black_box(piece)).unwrap();
            }
        });
    });

    group.bench_function("read_256x256", |b| {
        let mut gs = GsState::new(NullRenderer::new());
        let mut out = vec![0u8; 256 * 256 * 4];
        b.iter(|| {
            arm_transfer(&mut gs, 256, 256, 0, 1);
            black_box(gs.read_fifo(&mut out).unwrap());
        });
    });

    group.bench_function("move_128x128", |b| {
        let mut gs = GsState::new(NullRenderer::new());
        b.iter(|| {
            arm_transfer(&mut gs, 128, 128, 64, 2);
        });
    });

    group.finish();
}

fn freeze_benchmark(c: &mut Criterion) {
    c.bench_function("freeze", |b| {
        let mut gs = GsState::new(NullRenderer::new());
        b.iter(|| black_box(gs.freeze().unwrap()));
    });

    c.bench_function("defrost", |b| {
        let mut gs = GsState::new(NullRenderer::new());
        let image = gs.freeze().unwrap();
        b.iter(|| gs.defrost(black_box(&image)).unwrap());
    });
}

criterion_group!(
    benches,
    gif_benchmark,
    transfer_benchmark,
    freeze_benchmark
);
criterion_main!(benches);
