use crate::consts::KEY_SIZE;
use byteorder::{ByteOrder, LittleEndian};
use crc::{Crc, CRC_32_ISO_HDLC};
use encoding_rs::SHIFT_JIS;
use log::warn;
use std::fmt;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Lookup table of the reflected CRC-32 polynomial `0xEDB88320`.
pub const CRC32_TABLE: [u32; 256] = crc32_table();

const fn crc32_table() -> [u32; 256] {
    let mut table = [0; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 == 0 {
                crc >> 1
            } else {
                0xEDB8_8320 ^ (crc >> 1)
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Repeating-XOR payload cipher keyed by a password.
///
/// Applying the cipher twice restores the input.
#[derive(Clone)]
pub struct Cipher {
    key: Box<[u8; KEY_SIZE]>,
}

impl Cipher {
    /// Derives the key from a password, which is encoded as Shift_JIS first.
    pub fn from_password(password: &str) -> Self {
        let (bytes, _, had_errors) = SHIFT_JIS.encode(password);
        if had_errors {
            warn!("password contains characters outside Shift_JIS, they were replaced");
        }

        Self::from_bytes(&bytes)
    }

    /// Derives the key from an already encoded password.
    pub fn from_bytes(password: &[u8]) -> Self {
        let checksum = CRC32.checksum(password);

        let mut key = Box::new([0; KEY_SIZE]);
        for (i, word) in (0u32..).zip(key.chunks_exact_mut(4)) {
            let entry = CRC32_TABLE[(i.wrapping_add(checksum) & 0xFF) as usize];
            LittleEndian::write_u32(word, checksum ^ entry);
        }

        Self { key }
    }

    /// XORs `data` with the keystream, starting at key offset 0.
    pub fn apply(&self, data: &mut [u8]) {
        for (byte, key) in data.iter_mut().zip(self.key.iter().cycle()) {
            *byte ^= key;
        }
    }

    pub fn key(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

impl fmt::Debug for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cipher").finish_non_exhaustive()
    }
}
