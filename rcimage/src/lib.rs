//! Codec for the RC image containers used to ship pre-rendered art assets.
//!
//! Two container kinds exist:
//!
//! - **RCT**, 24-bit true color. Pixels are stored blue-green-red.
//! - **RC8**, 8-bit palette indices with a 256-entry palette stored in the header.
//!
//! A true-color image with transparency is shipped as an `name.rct` / `name_.rc8` pair, where the
//! palette image acts as an inverted alpha mask. See [`compose`].
//!
//! # Header
//!
//! All integers are little-endian.
//!
//! ```plain
//! offset  size  field
//!      0     4  magic 0x9A925A98
//!      4     4  type tag: "TC0v" (plain), "TS0v" (encrypted) or "8_00" (palette)
//!      8     4  width
//!     12     4  height
//!     16     4  payload length, signed, > 0
//!     20   768  palette, RC8 only
//! 20/788     n  compressed payload
//! ```
//!
//! # Payload
//!
//! The payload always begins with one verbatim pixel. After that it is a sequence of commands,
//! each either a literal run of raw pixels or a copy run that repeats earlier pixels. Copy runs do
//! not carry an arbitrary offset: they pick one of a small fixed set of 2-D offsets from the
//! [shift table](consts::TRUE_COLOR_SHIFT_TABLE). See [consts] for the command layouts.
//!
//! True-color payloads may be encrypted with a password-derived repeating XOR key, see
//! [`cipher`].

pub mod cipher;
pub mod compose;
pub mod container;
pub mod decode;
pub mod encode;
pub mod utils;

pub use cipher::Cipher;
pub use container::{Palette, PaletteImage, RcImage, TrueColorImage};
pub use utils::BitLayout;

/// The two pixel layouts a container can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    /// 24-bit BGR pixels, 32-entry shift table.
    TrueColor,
    /// 8-bit palette indices, 16-entry shift table.
    Palette,
}

impl ImageKind {
    /// Bytes per pixel.
    pub const fn byte_depth(self) -> usize {
        match self {
            ImageKind::TrueColor => 3,
            ImageKind::Palette => 1,
        }
    }

    pub const fn shift_table(self) -> &'static [i8] {
        match self {
            ImageKind::TrueColor => &consts::TRUE_COLOR_SHIFT_TABLE,
            ImageKind::Palette => &consts::PALETTE_SHIFT_TABLE,
        }
    }

    /// How command bytes are split between shift index and run length for this kind.
    pub const fn layout(self) -> BitLayout {
        BitLayout::new(self.shift_table().len(), self.byte_depth())
    }
}

/// Everything the codec needs to know about an image besides its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderInfo {
    pub kind: ImageKind,
    pub width: u32,
    pub height: u32,
}

impl HeaderInfo {
    /// `None` if the count doesn't fit in `usize`.
    pub fn pixel_count(&self) -> Option<usize> {
        usize::try_from(self.width)
            .ok()?
            .checked_mul(usize::try_from(self.height).ok()?)
    }

    /// Size of the raw pixel buffer in bytes, `None` if it doesn't fit in `usize`.
    pub fn byte_len(&self) -> Option<usize> {
        self.pixel_count()?.checked_mul(self.kind.byte_depth())
    }
}

pub mod consts {
    /// Container magic, `0x9A925A98` stored little-endian.
    pub const MAGIC: u32 = 0x9A92_5A98;

    /// First tag byte of a true-color container.
    pub const TAG_TRUE_COLOR: u8 = b'T';
    /// First tag byte of a palette container.
    pub const TAG_PALETTE: u8 = b'8';
    /// Second tag byte of a plain true-color container.
    pub const TAG_PLAIN: u8 = b'C';
    /// Second tag byte of an encrypted true-color container.
    pub const TAG_ENCRYPTED: u8 = b'S';

    pub const TRUE_COLOR_PLAIN_TAG: [u8; 4] = *b"TC00";
    pub const TRUE_COLOR_ENCRYPTED_TAG: [u8; 4] = *b"TS00";
    pub const PALETTE_TAG: [u8; 4] = *b"8_00";

    /// Size of the palette block in an RC8 header: 256 stored BGR triples.
    pub const PALETTE_SIZE: usize = 0x300;

    /// Size of the cipher keystream, applied cyclically.
    pub const KEY_SIZE: usize = 0x400;

    /// Shift codes for true-color images.
    ///
    /// The low nibble of a code is the number of rows to go up, the (signed) high nibble the
    /// number of columns to move. See [`shift_delta`](crate::utils::shift_delta).
    pub const TRUE_COLOR_SHIFT_TABLE: [i8; 32] = [
        -16, -32, -48, -64, -80, -96, 49, 33, //
        17, 1, -15, -31, -47, 50, 34, 18, //
        2, -14, -30, -46, 51, 35, 19, 3, //
        -13, -29, -45, 36, 20, 4, -12, -28,
    ];

    /// Shift codes for palette images.
    pub const PALETTE_SHIFT_TABLE: [i8; 16] = [
        -16, -32, -48, -64, 49, 33, 17, 1, //
        -15, -31, -47, 34, 18, 2, -14, -30,
    ];

    /// Emits raw pixels copied from the stream.
    ///
    /// ```plain
    /// .- OP_LITERAL ------------.
    /// |         Byte[0]         |
    /// |  7  6  5  4  3  2  1  0 |
    /// |----+--------------------|
    /// |  0 |       run          |
    /// `-------------------------`
    /// ```
    ///
    /// - 1-bit tag b0
    /// - 7-bit run length 1..127, stored with a bias of -1 (`0x00..=0x7E`)
    /// - `run == 0x7F` is an escape: a u16le follows and the run length is `0x80 + u16`
    /// - followed by `run * byte_depth` raw bytes
    pub const OP_LITERAL: u8 = 0b0000_0000;

    /// Literal run escape, see [`OP_LITERAL`].
    pub const OP_LITERAL_ESCAPE: u8 = 0x7F;

    /// Repeats earlier pixels from an offset picked out of the shift table.
    ///
    /// ```plain
    /// .- OP_COPY (RCT) ---------.   .- OP_COPY (RC8) ---------.
    /// |         Byte[0]         |   |         Byte[0]         |
    /// |  7  6  5  4  3  2  1  0 |   |  7  6  5  4  3  2  1  0 |
    /// |----+--------------+-----|   |----+-----------+--------|
    /// |  1 |    shift     | run |   |  1 |   shift   |  run   |
    /// `-------------------------`   `-------------------------`
    /// ```
    ///
    /// - 1-bit tag b1
    /// - 5-bit (RCT) or 4-bit (RC8) index into the shift table
    /// - 2-bit (RCT) or 3-bit (RC8) run length, stored with a bias of `-count_base` (1 for RCT,
    ///   3 for RC8)
    /// - a saturated run field is an escape: a u16le follows and is added to the run length
    /// - source and destination may overlap, in which case the copied pattern repeats
    pub const OP_COPY: u8 = 0b1000_0000;

    /// Longest literal run a single command can express, in pixels.
    pub const MAX_LITERAL_RUN: usize = 0xFFFF + 0x7F;

    /// Upper bound on the length of a match considered by the encoder, in pixels.
    pub const MAX_MATCH_SIZE: usize = 0xFFFF + 1;
}
