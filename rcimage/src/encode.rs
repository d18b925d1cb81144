use crate::{
    consts::*,
    utils::{shift_deltas, BitLayout},
    HeaderInfo,
};
use log::trace;
use snafu::{ensure, OptionExt, Snafu};

#[derive(Debug, Snafu)]
pub enum EncodeError {
    #[snafu(display(
        "Specified image dimensions don't match the pixel data: {width}x{height} needs {expected} bytes, but {len} bytes were given"
    ))]
    InvalidDimensions {
        width: u32,
        height: u32,
        expected: usize,
        len: usize,
    },

    #[snafu(display("{width}x{height} image is too large to address"))]
    DimensionsTooLarge { width: u32, height: u32 },

    #[snafu(display("cannot encode an image without pixels"))]
    EmptyImage,
}

/// Compresses a raw pixel buffer. True-color pixels are expected in BGR order.
pub fn encode(header: &HeaderInfo, pixels: &[u8]) -> Result<Vec<u8>, EncodeError> {
    let mut w = Vec::with_capacity(pixels.len() / 2);
    encode_to_vec(header, pixels, &mut w)?;
    Ok(w)
}

/// Compresses a raw pixel buffer, appending the payload to `w`.
pub fn encode_to_vec(
    header: &HeaderInfo,
    pixels: &[u8],
    w: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    let expected = header.byte_len().context(DimensionsTooLargeSnafu {
        width: header.width,
        height: header.height,
    })?;
    ensure!(
        expected == pixels.len(),
        InvalidDimensionsSnafu {
            width: header.width,
            height: header.height,
            expected,
            len: pixels.len(),
        }
    );
    ensure!(!pixels.is_empty(), EmptyImageSnafu);

    let start = w.len();
    let mut packer = Packer::new(header, pixels, w);
    packer.pack();

    trace!(
        "encoded {} pixels into {} bytes",
        expected / header.kind.byte_depth(),
        w.len() - start
    );

    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct Match {
    shift: usize,
    len: usize,
}

/// Per-call encoder state.
struct Packer<'a> {
    pixels: &'a [u8],
    depth: usize,
    layout: BitLayout,
    deltas: Vec<isize>,
    out: &'a mut Vec<u8>,

    /// Pending literal pixels, not yet written.
    literal: Vec<u8>,
    literal_len: usize,
}

impl<'a> Packer<'a> {
    fn new(header: &HeaderInfo, pixels: &'a [u8], out: &'a mut Vec<u8>) -> Self {
        let kind = header.kind;

        Self {
            pixels,
            depth: kind.byte_depth(),
            layout: kind.layout(),
            deltas: shift_deltas(kind.shift_table(), header.width as usize),
            out,
            literal: Vec::new(),
            literal_len: 0,
        }
    }

    #[inline]
    fn pixel(&self, index: usize) -> &'a [u8] {
        let pixels = self.pixels;
        &pixels[index * self.depth..(index + 1) * self.depth]
    }

    fn pack(&mut self) {
        let total = self.pixels.len() / self.depth;

        // Seed pixel, nothing to reference yet
        let seed = self.pixel(0);
        self.out.extend_from_slice(seed);

        let mut current = 1;
        while current < total {
            let best = self.find_match(current, total);

            if best.len > self.layout.ignore_threshold {
                self.copy_run(best);
                current += best.len;
            } else {
                self.push_literal(current);
                current += 1;
            }
        }

        self.flush_literal();
    }

    /// Longest match over all shifts. Ties go to the lowest shift index.
    fn find_match(&self, current: usize, total: usize) -> Match {
        let limit = (current + MAX_MATCH_SIZE).min(total);
        let mut best = Match { shift: 0, len: 0 };

        for (shift, &delta) in self.deltas.iter().enumerate() {
            if delta >= 0 {
                continue;
            }
            let Some(prev) = current.checked_sub(delta.unsigned_abs()) else {
                continue;
            };

            let len = (current..limit)
                .zip(prev..)
                .take_while(|&(a, b)| self.pixel(a) == self.pixel(b))
                .count();

            if len > best.len {
                best = Match { shift, len };
            }
        }

        best
    }

    fn copy_run(&mut self, m: Match) {
        self.flush_literal();

        let BitLayout {
            count_mask,
            shift_start,
            count_base,
            ..
        } = self.layout;
        let threshold = self.layout.count_threshold();
        let cmd = OP_COPY | (m.shift as u8) << shift_start;

        if m.len >= threshold {
            self.out.push(cmd | count_mask);
            self.out
                .extend_from_slice(&((m.len - threshold) as u16).to_le_bytes());
        } else {
            self.out.push(cmd | (m.len - count_base) as u8);
        }
    }

    fn push_literal(&mut self, index: usize) {
        if self.literal_len == MAX_LITERAL_RUN {
            self.flush_literal();
        }

        let pixel = self.pixel(index);
        self.literal.extend_from_slice(pixel);
        self.literal_len += 1;
    }

    fn flush_literal(&mut self) {
        if self.literal_len == 0 {
            return;
        }

        // 1..=127 fit the command byte directly, everything longer needs the escape
        if self.literal_len > usize::from(OP_LITERAL_ESCAPE) {
            self.out.push(OP_LITERAL_ESCAPE);
            self.out
                .extend_from_slice(&((self.literal_len - 0x80) as u16).to_le_bytes());
        } else {
            self.out.push(OP_LITERAL | (self.literal_len - 1) as u8);
        }

        self.out.append(&mut self.literal);
        self.literal_len = 0;
    }
}
