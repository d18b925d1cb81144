mod common;

use common::{few_colors, header, noise};
use encoding_rs::SHIFT_JIS;
use rcimage::{
    cipher::CRC32_TABLE,
    compose::{compose, mask_alpha, split_alpha, ComposeError},
    container::{self, ReadError},
    consts::{MAGIC, PALETTE_SIZE},
    decode::DecodeError,
    encode::encode,
    Cipher, ImageKind, Palette, PaletteImage, RcImage, TrueColorImage,
};

fn true_color(width: u32, height: u32, seed: u32) -> TrueColorImage {
    let header = header(ImageKind::TrueColor, width, height);
    TrueColorImage {
        width,
        height,
        pixels: few_colors(&header, seed),
    }
}

fn sepia_palette() -> Palette {
    let mut entries = [[0; 3]; 256];
    for (i, entry) in entries.iter_mut().enumerate() {
        let v = i as u8;
        *entry = [v, v / 2, v / 4];
    }
    Palette(entries)
}

fn palette_image(width: u32, height: u32, seed: u32) -> PaletteImage {
    let header = header(ImageKind::Palette, width, height);
    PaletteImage {
        width,
        height,
        indices: noise(&header, seed),
        palette: sepia_palette(),
    }
}

fn u32_at(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
}

#[test]
fn true_color_layout() {
    let image = RcImage::TrueColor(true_color(13, 7, 1));
    let data = container::write_to_vec(&image, None).unwrap();

    assert_eq!(&data[0..4], &[0x98, 0x5A, 0x92, 0x9A]);
    assert_eq!(u32_at(&data, 0), MAGIC);
    assert_eq!(&data[4..8], b"TC00");
    assert_eq!(u32_at(&data, 8), 13);
    assert_eq!(u32_at(&data, 12), 7);
    assert_eq!(u32_at(&data, 16) as usize, data.len() - 20);

    let payload = encode(&image.header(), image.pixels()).unwrap();
    assert_eq!(&data[20..], &payload[..]);

    assert_eq!(container::read_from_slice(&data, None).unwrap(), image);
}

#[test]
fn palette_layout() {
    let image = RcImage::Palette(palette_image(9, 11, 2));
    let data = container::write_to_vec(&image, None).unwrap();

    assert_eq!(&data[4..8], b"8_00");
    assert_eq!(u32_at(&data, 16) as usize, data.len() - 20 - PALETTE_SIZE);

    // entries are stored blue first
    assert_eq!(&data[20 + 3 * 200..20 + 3 * 201], &[50, 100, 200]);

    assert_eq!(container::read_from_slice(&data, None).unwrap(), image);
}

#[test]
fn palette_channel_order() {
    let mut raw = [0; PALETTE_SIZE];
    raw[3..6].copy_from_slice(&[1, 2, 3]);
    let palette = Palette::from_stored(&raw);

    assert_eq!(palette.get(1), [3, 2, 1]);
    assert_eq!(palette.to_stored(), raw);
}

#[test]
fn encrypted_roundtrip() {
    let cipher = Cipher::from_password("majiro");
    let image = RcImage::TrueColor(true_color(20, 20, 3));

    let plain = container::write_to_vec(&image, None).unwrap();
    let encrypted = container::write_to_vec(&image, Some(&cipher)).unwrap();

    assert_eq!(&encrypted[4..8], b"TS00");
    assert_eq!(plain.len(), encrypted.len());
    assert_ne!(&plain[20..], &encrypted[20..]);

    assert_eq!(
        container::read_from_slice(&encrypted, Some(&cipher)).unwrap(),
        image
    );
    assert!(matches!(
        container::read_from_slice(&encrypted, None),
        Err(ReadError::MissingKey)
    ));

    // a key is harmless for plain images
    assert_eq!(
        container::read_from_slice(&plain, Some(&cipher)).unwrap(),
        image
    );
}

#[test]
fn wrong_password() {
    let image = RcImage::TrueColor(true_color(20, 20, 4));
    let encrypted =
        container::write_to_vec(&image, Some(&Cipher::from_password("right"))).unwrap();

    match container::read_from_slice(&encrypted, Some(&Cipher::from_password("wrong"))) {
        Ok(decoded) => assert_ne!(decoded, image),
        Err(e) => assert!(matches!(e, ReadError::Decode { .. })),
    }
}

#[test]
fn palette_is_never_encrypted() {
    let cipher = Cipher::from_password("majiro");
    let image = RcImage::Palette(palette_image(8, 8, 5));

    let data = container::write_to_vec(&image, Some(&cipher)).unwrap();
    assert_eq!(&data[4..8], b"8_00");
    assert_eq!(container::read_from_slice(&data, None).unwrap(), image);
}

#[test]
fn invalid_magic() {
    let mut data = container::write_to_vec(&RcImage::TrueColor(true_color(4, 4, 6)), None).unwrap();
    data[0] ^= 1;
    assert!(matches!(
        container::read_from_slice(&data, None),
        Err(ReadError::InvalidMagic { magic: 0x9A925A99 })
    ));
}

#[test]
fn type_tags() {
    let data = container::write_to_vec(&RcImage::TrueColor(true_color(4, 4, 7)), None).unwrap();

    let with_tag = |tag: &[u8; 4]| {
        let mut data = data.clone();
        data[4..8].copy_from_slice(tag);
        container::read_from_slice(&data, None)
    };

    assert!(matches!(
        with_tag(b"X_00"),
        Err(ReadError::UnknownType { tag: b'X' })
    ));
    assert!(matches!(
        with_tag(b"TC01"),
        Err(ReadError::UnsupportedVersion { version: 1 })
    ));
    assert!(matches!(
        with_tag(b"TCX0"),
        Err(ReadError::InvalidTypeTag { .. })
    ));
    // only 'S' marks encryption
    assert!(with_tag(b"TQ00").is_ok());
}

#[test]
fn invalid_payload_length() {
    let mut data = container::write_to_vec(&RcImage::TrueColor(true_color(4, 4, 8)), None).unwrap();

    data[16..20].copy_from_slice(&0i32.to_le_bytes());
    assert!(matches!(
        container::read_from_slice(&data, None),
        Err(ReadError::InvalidPayloadLength { length: 0 })
    ));

    data[16..20].copy_from_slice(&(-5i32).to_le_bytes());
    assert!(matches!(
        container::read_from_slice(&data, None),
        Err(ReadError::InvalidPayloadLength { length: -5 })
    ));
}

#[test]
fn truncated_container() {
    let data = container::write_to_vec(&RcImage::Palette(palette_image(6, 6, 9)), None).unwrap();
    let declared = data.len() - 20 - PALETTE_SIZE;

    assert!(matches!(
        container::read_from_slice(&data[..data.len() - 1], None),
        Err(ReadError::TruncatedPayload { declared: d, actual }) if d == declared && actual == declared - 1
    ));
    assert!(matches!(
        container::read_from_slice(&data[..100], None),
        Err(ReadError::ReadIo { .. })
    ));
    assert!(matches!(
        container::read_from_slice(&data[..10], None),
        Err(ReadError::ReadIo { .. })
    ));
}

#[test]
fn corrupt_payload() {
    let mut data = container::write_to_vec(&RcImage::TrueColor(true_color(3, 1, 10)), None).unwrap();
    // replace the payload with a seed pixel and a literal run that is too long
    data.truncate(16);
    data.extend_from_slice(&5i32.to_le_bytes());
    data.extend_from_slice(&[0, 0, 0, 0x7E, 0]);

    assert!(matches!(
        container::read_from_slice(&data, None),
        Err(ReadError::Decode {
            source: DecodeError::PixelOutOfBounds { .. }
        })
    ));
}

#[test]
fn oversized_dimensions() {
    for size in [u32::MAX, 0x7FFF_FFFF] {
        let mut data = MAGIC.to_le_bytes().to_vec();
        data.extend_from_slice(b"TC00");
        data.extend_from_slice(&size.to_le_bytes());
        data.extend_from_slice(&size.to_le_bytes());
        data.extend_from_slice(&3i32.to_le_bytes());
        data.extend_from_slice(&[1, 2, 3]);

        assert!(
            matches!(
                container::read_from_slice(&data, None),
                Err(ReadError::Decode {
                    source: DecodeError::ImageTooLarge { payload_len: 3, .. }
                })
            ),
            "{size:#X}x{size:#X}"
        );
    }
}

#[test]
fn io_errors_are_displayed() {
    let err = container::read_from_slice(&[0x98, 0x5A], None).unwrap_err();
    assert!(matches!(err, ReadError::ReadIo { .. }));
    assert!(err.to_string().starts_with("I/O error: "), "{err}");
}

#[test]
fn cipher_is_an_involution() {
    let cipher = Cipher::from_password("password");
    let original: Vec<u8> = (0..5000u32).map(|i| (i * 7) as u8).collect();

    let mut data = original.clone();
    cipher.apply(&mut data);
    assert_ne!(data, original);
    cipher.apply(&mut data);
    assert_eq!(data, original);
}

#[test]
fn cipher_key_schedule() {
    assert_eq!(CRC32_TABLE[0], 0);
    assert_eq!(CRC32_TABLE[1], 0x7707_3096);
    assert_eq!(CRC32_TABLE[255], 0x2D02_EF8D);

    // CRC-32 check value
    let checksum: u32 = 0xCBF4_3926;
    let cipher = Cipher::from_bytes(b"123456789");
    let key = cipher.key();

    for i in [0usize, 1, 100, 255] {
        let word = u32::from_le_bytes(key[i * 4..i * 4 + 4].try_into().unwrap());
        let entry = CRC32_TABLE[(i + checksum as usize) & 0xFF];
        assert_eq!(word, checksum ^ entry, "key word {i}");
    }

    // the key repeats every 1024 bytes
    let mut data = vec![0; 2048];
    cipher.apply(&mut data);
    assert_eq!(&data[..1024], &key[..]);
    assert_eq!(&data[1024..], &key[..]);
}

#[test]
fn password_is_shift_jis() {
    let password = "パスワード";
    let (encoded, _, had_errors) = SHIFT_JIS.encode(password);
    assert!(!had_errors);

    assert_eq!(
        Cipher::from_password(password).key(),
        Cipher::from_bytes(&encoded).key()
    );
    assert_ne!(
        Cipher::from_password(password).key(),
        Cipher::from_bytes(password.as_bytes()).key()
    );
}

#[test]
fn compose_white_mask_is_transparent() {
    let color = TrueColorImage::from_rgb(3, 2, [10, 20, 30].repeat(6));
    let mut palette = sepia_palette();
    palette.0[0] = [255, 255, 255];
    let alpha = PaletteImage {
        width: 3,
        height: 2,
        indices: vec![0; 6],
        palette,
    };

    let rgba = compose(&color, &alpha).unwrap();
    assert_eq!(rgba, [10, 20, 30, 0].repeat(6));
}

#[test]
fn compose_averages_mask_channels() {
    assert_eq!(mask_alpha([0, 0, 0]), 255);
    assert_eq!(mask_alpha([255, 255, 255]), 0);
    assert_eq!(mask_alpha([30, 60, 91]), 255 - 60);

    let color = TrueColorImage::from_rgb(2, 1, vec![1, 2, 3, 4, 5, 6]);
    let alpha = PaletteImage {
        width: 2,
        height: 1,
        indices: vec![10, 200],
        palette: sepia_palette(),
    };

    let rgba = compose(&color, &alpha).unwrap();
    assert_eq!(
        rgba,
        [
            1,
            2,
            3,
            mask_alpha([10, 5, 2]),
            4,
            5,
            6,
            mask_alpha([200, 100, 50])
        ]
    );
}

#[test]
fn compose_dimension_mismatch() {
    let color = true_color(4, 4, 11);
    let alpha = palette_image(4, 5, 12);
    assert!(matches!(
        compose(&color, &alpha),
        Err(ComposeError::DimensionMismatch {
            alpha_height: 5,
            ..
        })
    ));
}

#[test]
fn compose_checks_buffer_lengths() {
    let mut color = true_color(4, 4, 11);
    let alpha = palette_image(4, 4, 12);
    color.pixels.truncate(45);
    assert!(matches!(
        compose(&color, &alpha),
        Err(ComposeError::InvalidPixelCount {
            expected: 48,
            len: 45,
            ..
        })
    ));

    let color = true_color(4, 4, 11);
    let mut alpha = palette_image(4, 4, 12);
    alpha.indices.push(0);
    assert!(matches!(
        compose(&color, &alpha),
        Err(ComposeError::InvalidPixelCount {
            expected: 16,
            len: 17,
            ..
        })
    ));
}

#[test]
fn split_and_compose() {
    let (width, height) = (17, 9);
    let rgba = noise(&header(ImageKind::TrueColor, width * 4, height), 13);
    let rgba = &rgba[..(width * height * 4) as usize];

    let (color, alpha) = split_alpha(width, height, rgba).unwrap();
    assert_eq!(alpha.palette, Palette::grayscale());
    assert_eq!(alpha.indices[0], !rgba[3]);
    assert_eq!(&color.to_rgb()[..3], &rgba[..3]);

    // through the containers and back
    let color_data = container::write_to_vec(&RcImage::TrueColor(color), None).unwrap();
    let alpha_data = container::write_to_vec(&RcImage::Palette(alpha), None).unwrap();
    let RcImage::TrueColor(color) = container::read_from_slice(&color_data, None).unwrap() else {
        panic!("expected a true color image");
    };
    let RcImage::Palette(alpha) = container::read_from_slice(&alpha_data, None).unwrap() else {
        panic!("expected a palette image");
    };

    assert_eq!(compose(&color, &alpha).unwrap(), rgba);
}

#[test]
fn split_wrong_length() {
    assert!(matches!(
        split_alpha(2, 2, &[0; 15]),
        Err(ComposeError::InvalidPixelCount {
            expected: 16,
            len: 15,
            ..
        })
    ));
}

#[test]
fn palette_renders_through_palette() {
    let image = RcImage::Palette(PaletteImage {
        width: 2,
        height: 1,
        indices: vec![4, 8],
        palette: sepia_palette(),
    });
    assert_eq!(image.to_rgb(), [4, 2, 1, 8, 4, 2]);

    let image = RcImage::TrueColor(TrueColorImage::from_rgb(1, 1, vec![1, 2, 3]));
    assert_eq!(image.pixels(), [3, 2, 1]);
    assert_eq!(image.to_rgb(), [1, 2, 3]);
}
