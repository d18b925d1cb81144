#![allow(dead_code)]

use rcimage::{HeaderInfo, ImageKind};

/// Small deterministic xorshift generator, so test images don't need fixtures.
pub struct XorShift(u32);

impl XorShift {
    pub fn new(seed: u32) -> Self {
        Self(seed.max(1))
    }

    pub fn next_u8(&mut self) -> u8 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        (x >> 24) as u8
    }
}

pub fn header(kind: ImageKind, width: u32, height: u32) -> HeaderInfo {
    HeaderInfo {
        kind,
        width,
        height,
    }
}

/// Uniformly random bytes, very few matches.
pub fn noise(header: &HeaderInfo, seed: u32) -> Vec<u8> {
    let mut rng = XorShift::new(seed);
    (0..header.byte_len().unwrap()).map(|_| rng.next_u8()).collect()
}

/// Random pixels drawn from a handful of colors, lots of short matches in every direction.
pub fn few_colors(header: &HeaderInfo, seed: u32) -> Vec<u8> {
    let depth = header.kind.byte_depth();
    let colors: [[u8; 3]; 4] = [[0, 0, 0], [255, 255, 255], [10, 20, 30], [10, 20, 31]];
    let mut rng = XorShift::new(seed);
    let mut pixels = Vec::with_capacity(header.byte_len().unwrap());
    for _ in 0..header.pixel_count().unwrap() {
        let color = colors[usize::from(rng.next_u8() % 4)];
        pixels.extend_from_slice(&color[..depth]);
    }
    pixels
}

pub fn solid(header: &HeaderInfo) -> Vec<u8> {
    [7u8, 99, 200]
        .iter()
        .copied()
        .take(header.kind.byte_depth())
        .cycle()
        .take(header.byte_len().unwrap())
        .collect()
}

/// Horizontal gradient, every row identical.
pub fn gradient(header: &HeaderInfo) -> Vec<u8> {
    let depth = header.kind.byte_depth();
    let mut pixels = Vec::with_capacity(header.byte_len().unwrap());
    for _ in 0..header.height {
        for x in 0..header.width {
            let v = (x * 255 / header.width.max(1)) as u8;
            pixels.extend_from_slice(&[v, v / 2, 255 - v][..depth]);
        }
    }
    pixels
}

/// Pixels that are all distinct from each other, so nothing can be matched.
pub fn distinct(header: &HeaderInfo) -> Vec<u8> {
    let depth = header.kind.byte_depth();
    let mut pixels = Vec::with_capacity(header.byte_len().unwrap());
    for i in 0..header.pixel_count().unwrap() {
        pixels.extend_from_slice(&[i as u8, (i >> 8) as u8, 0x55][..depth]);
    }
    pixels
}
