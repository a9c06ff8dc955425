//! Display frames: packed monochrome bitmaps.
//!
//! One bit per pixel, eight pixels per byte, most significant bit first.
//! Pixel `t` (row-major, `t = y * width + x`) lives in byte `t / 8` at bit
//! `7 - t % 8`. The display channel carries no dimensions of its own; the
//! caller supplies the screen size.

use serde::{Serialize, Deserialize};

use super::error::FrameError;

/// Width and height of the emulated screen, in pixels. Both sides are
/// non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawScreenSize")]
pub struct ScreenSize {
    width: u8,
    height: u8,
}

#[derive(Deserialize)]
struct RawScreenSize {
    width: u8,
    height: u8,
}

impl TryFrom<RawScreenSize> for ScreenSize {
    type Error = FrameError;

    fn try_from(raw: RawScreenSize) -> Result<Self, Self::Error> {
        ScreenSize::new(raw.width, raw.height)
    }
}

impl ScreenSize {
    /// The standard 64x32 screen.
    pub const SMALL: ScreenSize = ScreenSize { width: 64, height: 32 };
    /// ETI-660 64x48 mode.
    pub const ETI660_48: ScreenSize = ScreenSize { width: 64, height: 48 };
    /// ETI-660 64x64 mode.
    pub const ETI660_64: ScreenSize = ScreenSize { width: 64, height: 64 };
    /// SUPER-CHIP high resolution.
    pub const LARGE: ScreenSize = ScreenSize { width: 128, height: 64 };

    /// Create a screen size, rejecting a zero side.
    pub fn new(width: u8, height: u8) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::InvalidDimensions { width, height });
        }
        Ok(Self { width, height })
    }

    #[inline]
    pub fn width(&self) -> u8 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u8 {
        self.height
    }

    /// Number of pixels.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Bytes needed to carry every pixel: `ceil(pixels / 8)`.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.pixel_count().div_ceil(8)
    }
}

impl Default for ScreenSize {
    fn default() -> Self {
        Self::SMALL
    }
}

impl std::fmt::Display for ScreenSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One decoded display snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Framebuffer {
    size: ScreenSize,
    pixels: Vec<bool>,
}

impl Framebuffer {
    /// A screen with every pixel off.
    pub fn blank(size: ScreenSize) -> Self {
        Self {
            size,
            pixels: vec![false; size.pixel_count()],
        }
    }

    /// Build from a row-major pixel grid. Returns `None` when the grid
    /// length does not match the screen size.
    pub fn from_pixels(size: ScreenSize, pixels: Vec<bool>) -> Option<Self> {
        (pixels.len() == size.pixel_count()).then_some(Self { size, pixels })
    }

    pub fn size(&self) -> ScreenSize {
        self.size
    }

    pub fn width(&self) -> usize {
        self.size.width as usize
    }

    pub fn height(&self) -> usize {
        self.size.height as usize
    }

    /// Row-major pixels, `width * height` entries.
    pub fn pixels(&self) -> &[bool] {
        &self.pixels
    }

    /// The pixel at `(x, y)`, or `None` off screen.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> Option<bool> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        self.pixels.get(y * self.width() + x).copied()
    }

    /// Iterate rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[bool]> {
        self.pixels.chunks(self.width())
    }

    /// Number of pixels switched on.
    pub fn lit_count(&self) -> usize {
        self.pixels.iter().filter(|&&p| p).count()
    }
}

impl std::fmt::Display for Framebuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.rows() {
            for &on in row {
                f.write_str(if on { "█" } else { " " })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Unpack a display frame for a screen of the given size.
///
/// Bits are consumed MSB-first across ascending bytes. Bits past the last
/// pixel are padding and are ignored, as are surplus bytes. A buffer with
/// fewer bits than pixels fails with [`FrameError::TruncatedFrame`], and a
/// zero-sided size with [`FrameError::InvalidDimensions`].
pub fn decode_display(frame: &[u8], size: ScreenSize) -> Result<Framebuffer, FrameError> {
    if size.width == 0 || size.height == 0 {
        return Err(FrameError::InvalidDimensions { width: size.width, height: size.height });
    }
    let count = size.pixel_count();
    if frame.len() * 8 < count {
        return Err(FrameError::TruncatedFrame {
            expected: size.byte_len(),
            actual: frame.len(),
        });
    }

    let mut pixels = Vec::with_capacity(count);
    for &byte in &frame[..size.byte_len()] {
        for bit in (0..8).rev() {
            if pixels.len() == count {
                break;
            }
            pixels.push(byte & (1 << bit) != 0);
        }
    }

    Ok(Framebuffer { size, pixels })
}

/// Pack a framebuffer into its wire form, the inverse of [`decode_display`].
/// Padding bits in the final byte are zero.
pub fn pack_pixels(frame: &Framebuffer) -> Vec<u8> {
    let mut out = vec![0u8; frame.size.byte_len()];
    for (t, &on) in frame.pixels.iter().enumerate() {
        if on {
            out[t / 8] |= 0x80 >> (t % 8);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn small_frame(first: u8) -> Vec<u8> {
        let mut buf = vec![0u8; ScreenSize::SMALL.byte_len()];
        buf[0] = first;
        buf
    }

    #[test]
    fn test_screen_sizes() {
        assert_eq!(ScreenSize::SMALL.pixel_count(), 2048);
        assert_eq!(ScreenSize::SMALL.byte_len(), 256);
        assert_eq!(ScreenSize::LARGE.byte_len(), 1024);
        assert_eq!(ScreenSize::new(3, 3).unwrap().byte_len(), 2);
        assert_eq!(
            ScreenSize::new(0, 32),
            Err(FrameError::InvalidDimensions { width: 0, height: 32 })
        );
    }

    #[test]
    fn test_full_byte_lights_first_eight() {
        let fb = decode_display(&small_frame(0xFF), ScreenSize::SMALL).unwrap();
        assert_eq!(fb.pixels().len(), 2048);
        for x in 0..8 {
            assert_eq!(fb.pixel(x, 0), Some(true));
        }
        assert_eq!(fb.pixel(8, 0), Some(false));
        assert_eq!(fb.lit_count(), 8);
    }

    #[test]
    fn test_msb_first() {
        let fb = decode_display(&small_frame(0x80), ScreenSize::SMALL).unwrap();
        assert_eq!(fb.pixel(0, 0), Some(true));
        for x in 1..8 {
            assert_eq!(fb.pixel(x, 0), Some(false));
        }
    }

    #[test]
    fn test_row_major_addressing() {
        // Pixel (1, 1) on a 64-wide screen is index 65: byte 8, second bit.
        let mut buf = small_frame(0);
        buf[8] = 0x40;
        let fb = decode_display(&buf, ScreenSize::SMALL).unwrap();
        assert_eq!(fb.pixel(1, 1), Some(true));
        assert_eq!(fb.lit_count(), 1);
        assert!(fb.rows().nth(1).unwrap()[1]);
    }

    #[test]
    fn test_truncated_display_frame() {
        let buf = vec![0u8; 255];
        assert_eq!(
            decode_display(&buf, ScreenSize::SMALL),
            Err(FrameError::TruncatedFrame { expected: 256, actual: 255 })
        );
    }

    #[test]
    fn test_padding_bits_discarded() {
        // 3x3 = 9 pixels, 2 bytes; the last 7 bits are padding.
        let size = ScreenSize::new(3, 3).unwrap();
        let fb = decode_display(&[0x00, 0xFF], size).unwrap();
        assert_eq!(fb.pixels().len(), 9);
        assert_eq!(fb.lit_count(), 1);
        assert_eq!(fb.pixel(2, 2), Some(true));
    }

    #[test]
    fn test_surplus_bytes_ignored() {
        let mut buf = small_frame(0x01);
        buf.extend_from_slice(&[0xFF; 16]);
        let fb = decode_display(&buf, ScreenSize::SMALL).unwrap();
        assert_eq!(fb.lit_count(), 1);
        assert_eq!(fb.pixel(7, 0), Some(true));
    }

    #[test]
    fn test_zero_side_rejected() {
        let size = ScreenSize { width: 0, height: 4 };
        assert_eq!(
            decode_display(&[], size),
            Err(FrameError::InvalidDimensions { width: 0, height: 4 })
        );
        let size = ScreenSize { width: 8, height: 0 };
        assert_eq!(
            decode_display(&[0xFF], size),
            Err(FrameError::InvalidDimensions { width: 8, height: 0 })
        );
    }

    #[test]
    fn test_deserialize_goes_through_validation() {
        let size: ScreenSize = serde_json::from_str(r#"{ "width": 64, "height": 48 }"#).unwrap();
        assert_eq!(size, ScreenSize::ETI660_48);
        assert!(serde_json::from_str::<ScreenSize>(r#"{ "width": 0, "height": 4 }"#).is_err());
    }

    #[test]
    fn test_pixel_out_of_range() {
        let fb = Framebuffer::blank(ScreenSize::SMALL);
        assert_eq!(fb.pixel(64, 0), None);
        assert_eq!(fb.pixel(0, 32), None);
    }

    #[test]
    fn test_text_rendering() {
        let size = ScreenSize::new(2, 2).unwrap();
        let fb = Framebuffer::from_pixels(size, vec![true, false, false, true]).unwrap();
        assert_eq!(fb.to_string(), "█ \n █\n");
        assert!(Framebuffer::from_pixels(size, vec![true]).is_none());
    }

    proptest! {
        #[test]
        fn prop_pack_then_decode(width in 1u8..=128, height in 1u8..=64, seed in any::<u64>()) {
            let size = ScreenSize::new(width, height).unwrap();
            let pixels: Vec<bool> = (0..size.pixel_count())
                .map(|i| (seed.rotate_left((i % 64) as u32) ^ i as u64) & 1 == 1)
                .collect();
            let fb = Framebuffer::from_pixels(size, pixels).unwrap();
            let wire = pack_pixels(&fb);
            prop_assert_eq!(wire.len(), size.byte_len());
            prop_assert_eq!(decode_display(&wire, size).unwrap(), fb);
        }

        #[test]
        fn prop_decode_is_idempotent(bytes in proptest::collection::vec(any::<u8>(), 256..300)) {
            let a = decode_display(&bytes, ScreenSize::SMALL).unwrap();
            let b = decode_display(&bytes, ScreenSize::SMALL).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
