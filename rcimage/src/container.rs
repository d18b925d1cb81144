use crate::{
    cipher::Cipher,
    consts::*,
    decode::{decode, DecodeError},
    encode::{encode, EncodeError},
    utils::swap_red_blue,
    HeaderInfo, ImageKind,
};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::debug;
use snafu::{ensure, OptionExt, ResultExt, Snafu};
use std::io::{Read, Write};

#[derive(Debug, Snafu)]
pub enum ReadError {
    #[snafu(display("I/O error: {source}"))]
    ReadIo {
        source: std::io::Error,
    },

    #[snafu(display("invalid magic {magic:#010X}"))]
    InvalidMagic { magic: u32 },

    #[snafu(display("unknown image format {tag:#04X}"))]
    UnknownType { tag: u8 },

    #[snafu(display("malformed type tag {tag:?}"))]
    InvalidTypeTag { tag: [u8; 4] },

    #[snafu(display("unsupported RCT version {version}"))]
    UnsupportedVersion { version: u8 },

    #[snafu(display("invalid payload length {length}"))]
    InvalidPayloadLength { length: i32 },

    #[snafu(display("payload is {actual} bytes, but the header declares {declared}"))]
    TruncatedPayload { declared: usize, actual: usize },

    #[snafu(display("image is encrypted and no password was given"))]
    MissingKey,

    #[snafu(display("decompress error: {source}"))]
    Decode { source: DecodeError },
}

#[derive(Debug, Snafu)]
pub enum WriteError {
    #[snafu(display("I/O error: {source}"))]
    WriteIo {
        source: std::io::Error,
    },

    #[snafu(display("compress error: {source}"))]
    Encode { source: EncodeError },

    #[snafu(display("payload of {len} bytes doesn't fit the header"))]
    PayloadTooLarge { len: usize },
}

/// 256 RGB colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette(pub [[u8; 3]; 256]);

impl Palette {
    /// `entry[i] = (i, i, i)`
    pub fn grayscale() -> Self {
        let mut entries = [[0; 3]; 256];
        for (i, entry) in (0..=u8::MAX).zip(entries.iter_mut()) {
            *entry = [i; 3];
        }
        Self(entries)
    }

    /// Parses the header palette block, which stores each entry as BGR.
    pub fn from_stored(raw: &[u8; PALETTE_SIZE]) -> Self {
        let mut entries = [[0; 3]; 256];
        for (entry, bgr) in entries.iter_mut().zip(raw.chunks_exact(3)) {
            *entry = [bgr[2], bgr[1], bgr[0]];
        }
        Self(entries)
    }

    pub fn to_stored(&self) -> [u8; PALETTE_SIZE] {
        let mut raw = [0; PALETTE_SIZE];
        for (bgr, &[r, g, b]) in raw.chunks_exact_mut(3).zip(self.0.iter()) {
            bgr.copy_from_slice(&[b, g, r]);
        }
        raw
    }

    #[inline]
    pub fn get(&self, index: u8) -> [u8; 3] {
        self.0[usize::from(index)]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::grayscale()
    }
}

/// A decoded RCT image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrueColorImage {
    pub width: u32,
    pub height: u32,
    /// BGR pixels, row-major.
    pub pixels: Vec<u8>,
}

impl TrueColorImage {
    /// Takes RGB pixels and stores them as BGR.
    pub fn from_rgb(width: u32, height: u32, mut rgb: Vec<u8>) -> Self {
        swap_red_blue(&mut rgb);
        Self {
            width,
            height,
            pixels: rgb,
        }
    }

    pub fn to_rgb(&self) -> Vec<u8> {
        let mut rgb = self.pixels.clone();
        swap_red_blue(&mut rgb);
        rgb
    }
}

/// A decoded RC8 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteImage {
    pub width: u32,
    pub height: u32,
    /// One palette index per pixel, row-major.
    pub indices: Vec<u8>,
    pub palette: Palette,
}

impl PaletteImage {
    /// Looks every index up in the palette.
    pub fn to_rgb(&self) -> Vec<u8> {
        self.indices
            .iter()
            .flat_map(|&index| self.palette.get(index))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RcImage {
    TrueColor(TrueColorImage),
    Palette(PaletteImage),
}

impl RcImage {
    pub fn header(&self) -> HeaderInfo {
        match self {
            RcImage::TrueColor(image) => HeaderInfo {
                kind: ImageKind::TrueColor,
                width: image.width,
                height: image.height,
            },
            RcImage::Palette(image) => HeaderInfo {
                kind: ImageKind::Palette,
                width: image.width,
                height: image.height,
            },
        }
    }

    /// Raw pixel buffer as stored in the payload.
    pub fn pixels(&self) -> &[u8] {
        match self {
            RcImage::TrueColor(image) => &image.pixels,
            RcImage::Palette(image) => &image.indices,
        }
    }

    /// RGB rendering of the image.
    pub fn to_rgb(&self) -> Vec<u8> {
        match self {
            RcImage::TrueColor(image) => image.to_rgb(),
            RcImage::Palette(image) => image.to_rgb(),
        }
    }
}

fn parse_tag(tag: [u8; 4]) -> Result<(ImageKind, bool), ReadError> {
    match tag {
        // the rest of the palette tag is not checked
        [TAG_PALETTE, ..] => Ok((ImageKind::Palette, false)),
        [TAG_TRUE_COLOR, mode, b'0', version] => {
            ensure!(
                version == b'0',
                UnsupportedVersionSnafu {
                    version: version.wrapping_sub(b'0')
                }
            );
            Ok((ImageKind::TrueColor, mode == TAG_ENCRYPTED))
        }
        [TAG_TRUE_COLOR, ..] => InvalidTypeTagSnafu { tag }.fail(),
        [other, ..] => UnknownTypeSnafu { tag: other }.fail(),
    }
}

/// Reads and decodes a container.
///
/// `cipher` is only required for encrypted images. It is ignored otherwise.
pub fn read<R: Read>(mut r: R, cipher: Option<&Cipher>) -> Result<RcImage, ReadError> {
    let magic = r.read_u32::<LittleEndian>().context(ReadIoSnafu)?;
    ensure!(magic == MAGIC, InvalidMagicSnafu { magic });

    let mut tag = [0; 4];
    r.read_exact(&mut tag).context(ReadIoSnafu)?;
    let (kind, encrypted) = parse_tag(tag)?;

    let width = r.read_u32::<LittleEndian>().context(ReadIoSnafu)?;
    let height = r.read_u32::<LittleEndian>().context(ReadIoSnafu)?;
    let length = r.read_i32::<LittleEndian>().context(ReadIoSnafu)?;
    ensure!(length > 0, InvalidPayloadLengthSnafu { length });

    let palette = match kind {
        ImageKind::Palette => {
            let mut raw = [0; PALETTE_SIZE];
            r.read_exact(&mut raw).context(ReadIoSnafu)?;
            Some(Palette::from_stored(&raw))
        }
        ImageKind::TrueColor => None,
    };

    let declared = length as usize;
    let mut payload = Vec::new();
    r.take(declared as u64)
        .read_to_end(&mut payload)
        .context(ReadIoSnafu)?;
    ensure!(
        payload.len() == declared,
        TruncatedPayloadSnafu {
            declared,
            actual: payload.len()
        }
    );

    debug!("{kind:?} image {width}x{height}, {declared} byte payload, encrypted: {encrypted}");

    if encrypted {
        cipher.context(MissingKeySnafu)?.apply(&mut payload);
    }

    let header = HeaderInfo {
        kind,
        width,
        height,
    };
    let pixels = decode(&header, &payload).context(DecodeSnafu)?;

    Ok(match palette {
        Some(palette) => RcImage::Palette(PaletteImage {
            width,
            height,
            indices: pixels,
            palette,
        }),
        None => RcImage::TrueColor(TrueColorImage {
            width,
            height,
            pixels,
        }),
    })
}

/// Reads and decodes a container held in memory.
pub fn read_from_slice(data: &[u8], cipher: Option<&Cipher>) -> Result<RcImage, ReadError> {
    read(data, cipher)
}

/// Encodes and writes a container.
///
/// A true-color payload is encrypted if `cipher` is given. Palette images are never encrypted.
pub fn write<W: Write>(
    image: &RcImage,
    cipher: Option<&Cipher>,
    mut w: W,
) -> Result<(), WriteError> {
    let header = image.header();
    let mut payload = encode(&header, image.pixels()).context(EncodeSnafu)?;
    let length = i32::try_from(payload.len())
        .ok()
        .context(PayloadTooLargeSnafu { len: payload.len() })?;

    let tag = match (image, cipher) {
        (RcImage::TrueColor(_), Some(cipher)) => {
            cipher.apply(&mut payload);
            TRUE_COLOR_ENCRYPTED_TAG
        }
        (RcImage::TrueColor(_), None) => TRUE_COLOR_PLAIN_TAG,
        (RcImage::Palette(_), _) => PALETTE_TAG,
    };

    debug!(
        "writing {:?} image {}x{}, {length} byte payload",
        header.kind, header.width, header.height
    );

    w.write_u32::<LittleEndian>(MAGIC).context(WriteIoSnafu)?;
    w.write_all(&tag).context(WriteIoSnafu)?;
    w.write_u32::<LittleEndian>(header.width)
        .context(WriteIoSnafu)?;
    w.write_u32::<LittleEndian>(header.height)
        .context(WriteIoSnafu)?;
    w.write_i32::<LittleEndian>(length).context(WriteIoSnafu)?;
    if let RcImage::Palette(image) = image {
        w.write_all(&image.palette.to_stored())
            .context(WriteIoSnafu)?;
    }
    w.write_all(&payload).context(WriteIoSnafu)?;

    Ok(())
}

/// Encodes a container into a new buffer.
pub fn write_to_vec(image: &RcImage, cipher: Option<&Cipher>) -> Result<Vec<u8>, WriteError> {
    let mut w = Vec::new();
    write(image, cipher, &mut w)?;
    Ok(w)
}
