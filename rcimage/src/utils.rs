/// Splits copy-run command bytes into a shift index and a run length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitLayout {
    /// Mask of the run-length field. A saturated field means a u16 extension follows.
    pub count_mask: u8,
    /// Position of the lowest shift-index bit.
    pub shift_start: u8,
    /// Run length (in pixels) implied by a zero run-length field.
    pub count_base: usize,
    /// Matches this long or shorter are cheaper as literals. Encoder only.
    pub ignore_threshold: usize,
}

impl BitLayout {
    /// `table_size` is 16 or 32, `byte_depth` 1 or 3.
    pub const fn new(table_size: usize, byte_depth: usize) -> Self {
        let wide = (table_size >> 5) as i8;
        let count_mask = (16 + !(8 + wide * 4)) as u8;
        let shift_start = 3 - wide as u8;
        let (count_base, ignore_threshold) = if byte_depth == 1 { (3, 2) } else { (1, 0) };

        Self {
            count_mask,
            shift_start,
            count_base,
            ignore_threshold,
        }
    }

    /// Shortest run that has to be stored with the u16 extension.
    #[inline]
    pub const fn count_threshold(&self) -> usize {
        self.count_base + self.count_mask as usize
    }
}

/// Splits a shift code into `(rows up, signed column offset)`.
#[inline]
pub const fn split_shift(code: i8) -> (i8, i8) {
    (code & 0x0F, code >> 4)
}

/// Computes the pixel-index delta a shift code refers to in an image `width` pixels wide.
///
/// Valid references are strictly negative. Codes pointing right on the previous row can become
/// zero or positive for very narrow images, those must not be used.
#[inline]
pub const fn shift_delta(code: i8, width: usize) -> isize {
    let (row, col) = split_shift(code);
    col as isize - row as isize * width as isize
}

/// Pixel-index deltas of a whole shift table.
pub fn shift_deltas(table: &[i8], width: usize) -> Vec<isize> {
    table.iter().map(|&code| shift_delta(code, width)).collect()
}

/// Copies `count` bytes within `data` from `src` to `dst`, with `src < dst`.
///
/// If the ranges overlap, the bytes between `src` and `dst` repeat, the same way a byte-by-byte
/// forward copy would behave.
pub fn copy_overlapped(data: &mut [u8], src: usize, mut dst: usize, mut count: usize) {
    debug_assert!(src < dst);

    while count > 0 {
        // everything in `src..dst` is valid and periodic, so the window can grow each round
        let chunk = (dst - src).min(count);
        data.copy_within(src..src + chunk, dst);
        dst += chunk;
        count -= chunk;
    }
}

/// Swaps the first and third byte of every 3-byte pixel, converting between BGR and RGB.
#[inline]
pub fn swap_red_blue(pixels: &mut [u8]) {
    for pixel in pixels.chunks_exact_mut(3) {
        pixel.swap(0, 2);
    }
}
