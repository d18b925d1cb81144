use crate::{
    consts::*,
    utils::{copy_overlapped, shift_deltas},
    HeaderInfo,
};
use byteorder::{ByteOrder, LittleEndian};
use log::trace;
use snafu::{ensure, OptionExt, Snafu};

#[derive(Debug, Snafu)]
#[snafu(module)]
pub enum DecodeError {
    #[snafu(display("unexpected end of compressed data"))]
    UnexpectedEof,

    #[snafu(display(
        "pixel out of bounds: run of {count} bytes with only {remaining} bytes left in the image"
    ))]
    PixelOutOfBounds { count: usize, remaining: usize },

    #[snafu(display(
        "insufficient source data: literal run of {count} bytes with only {available} bytes left"
    ))]
    InsufficientSourceData { count: usize, available: usize },

    #[snafu(display(
        "shift param incorrect: shift {index} points {delta} bytes away from offset {position}"
    ))]
    ShiftParamIncorrect {
        index: usize,
        delta: isize,
        position: usize,
    },

    #[snafu(display(
        "{width}x{height} image can't be decoded from a payload of {payload_len} bytes"
    ))]
    ImageTooLarge {
        width: u32,
        height: u32,
        payload_len: usize,
    },
}

/// Read cursor over the compressed payload.
struct Source<'a> {
    data: &'a [u8],
}

impl<'a> Source<'a> {
    fn byte(&mut self) -> Result<u8, DecodeError> {
        let (&byte, rest) = self
            .data
            .split_first()
            .ok_or(DecodeError::UnexpectedEof)?;
        self.data = rest;
        Ok(byte)
    }

    /// u16le run-length extension.
    fn extension(&mut self) -> Result<usize, DecodeError> {
        ensure!(self.data.len() >= 2, decode_error::UnexpectedEofSnafu);
        let (ext, rest) = self.data.split_at(2);
        self.data = rest;
        Ok(usize::from(LittleEndian::read_u16(ext)))
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], DecodeError> {
        ensure!(
            self.data.len() >= count,
            decode_error::InsufficientSourceDataSnafu {
                count,
                available: self.data.len()
            }
        );
        let (bytes, rest) = self.data.split_at(count);
        self.data = rest;
        Ok(bytes)
    }
}

/// Decompresses a payload into a raw pixel buffer of `header.byte_len()` bytes.
///
/// True-color pixels come out in BGR order.
pub fn decode(header: &HeaderInfo, payload: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let depth = header.kind.byte_depth();
    let table = header.kind.shift_table();
    let layout = header.kind.layout();
    let deltas = shift_deltas(table, header.width as usize);

    // A payload byte expands to at most one saturated copy run with its extension
    let max_run = (0xFFFF + usize::from(layout.count_mask) + layout.count_base) * depth;
    let byte_len = header
        .byte_len()
        .filter(|&len| len <= payload.len().saturating_mul(max_run))
        .context(decode_error::ImageTooLargeSnafu {
            width: header.width,
            height: header.height,
            payload_len: payload.len(),
        })?;

    let mut pixels = vec![0; byte_len];
    if pixels.is_empty() {
        return Ok(pixels);
    }

    let mut src = Source { data: payload };

    // The first pixel can't reference anything, so it's always stored as is
    pixels[..depth].copy_from_slice(src.take(depth)?);

    let mut dst = depth;
    let mut remaining = pixels.len() - depth;

    while remaining > 0 {
        let cmd = src.byte()?;

        let count = if cmd & OP_COPY == 0 {
            let mut run = usize::from(cmd);
            if cmd == OP_LITERAL_ESCAPE {
                run += src.extension()?;
            }

            let count = (run + 1) * depth;
            ensure!(
                count <= remaining,
                decode_error::PixelOutOfBoundsSnafu { count, remaining }
            );

            pixels[dst..dst + count].copy_from_slice(src.take(count)?);
            count
        } else {
            let mut run = usize::from(cmd & layout.count_mask);
            if run == usize::from(layout.count_mask) {
                run += src.extension()?;
            }

            let count = (run + layout.count_base) * depth;
            ensure!(
                count <= remaining,
                decode_error::PixelOutOfBoundsSnafu { count, remaining }
            );

            let index = usize::from(cmd >> layout.shift_start) % table.len();
            let delta = deltas[index] * depth as isize;
            ensure!(
                delta < 0 && delta.unsigned_abs() <= dst,
                decode_error::ShiftParamIncorrectSnafu {
                    index,
                    delta,
                    position: dst
                }
            );

            copy_overlapped(&mut pixels, dst - delta.unsigned_abs(), dst, count);
            count
        };

        remaining -= count;
        dst += count;
    }

    trace!(
        "decoded {}x{} {:?} image, {} trailing payload bytes",
        header.width,
        header.height,
        header.kind,
        src.data.len()
    );

    Ok(pixels)
}
