//! Packed monochrome framebuffer, organized the way the controller RAM is.
//
// The panel is split into horizontal "pages" of 8 rows. Each page stores one
// byte per column; bit 0 of a page byte is the topmost row of that page.
// Storage is a single flat array indexed `page * width + column`, which maps
// 1:1 onto the page/column addressing of the ST7567 family and lets a whole
// page go out over the bus as one contiguous slice.

use alloc::vec;
use alloc::vec::Vec;

/// Minimal pixel capability: dimensions plus a clipped pixel write.
///
/// The generic drawing helpers in [`crate::primitives`] are free functions
/// over this trait, so anything that can set a pixel gets line/rect drawing
/// with static dispatch. [`PageBuffer`] is the one implementation here.
pub trait PixelSurface {
    fn width(&self) -> u16;
    fn height(&self) -> u16;

    /// Set or clear one pixel. Out-of-range coordinates are a silent no-op
    /// (graphics clipping convention, not an error).
    fn set_pixel(&mut self, x: i32, y: i32, on: bool);
}

/// Page-organized 1-bit-per-pixel framebuffer.
///
/// Allocated zero-filled once and owned by whoever drives the display;
/// cloning it yields the snapshot used by the double-buffer swap path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageBuffer {
    width: u16,
    height: u16,
    pages: u16,
    data: Vec<u8>,
}

impl PageBuffer {
    pub fn new(width: u16, height: u16) -> Self {
        let pages = height.div_ceil(8);
        Self {
            width,
            height,
            pages,
            data: vec![0; pages as usize * width as usize],
        }
    }

    #[inline]
    pub fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Number of 8-row pages (`ceil(height / 8)`).
    #[inline]
    pub fn pages(&self) -> u16 {
        self.pages
    }

    /// Raw backing bytes, page-major.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    fn index(&self, page: u16, column: u16) -> usize {
        page as usize * self.width as usize + column as usize
    }

    /// Raw page byte; 0 for out-of-range addresses.
    pub fn byte(&self, page: u16, column: u16) -> u8 {
        if page >= self.pages || column >= self.width {
            return 0;
        }
        self.data[self.index(page, column)]
    }

    /// Raw page byte write; out-of-range addresses are a no-op.
    pub fn set_byte(&mut self, page: u16, column: u16, value: u8) {
        if page >= self.pages || column >= self.width {
            return;
        }
        let i = self.index(page, column);
        self.data[i] = value;
    }

    /// Fill the whole buffer with lit (`0xFF`) or dark (`0x00`) pixels.
    pub fn fill(&mut self, on: bool) {
        let v = if on { 0xFF } else { 0x00 };
        self.data.fill(v);
    }

    /// Read one pixel; false off-panel.
    pub fn pixel(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return false;
        }
        let (x, y) = (x as u16, y as u16);
        self.byte(y / 8, x) & (1 << (y % 8)) != 0
    }

    /// Contiguous view of one page starting at `column`, clipped to at most
    /// `len` bytes. This is what gets handed to the bus for transmission.
    pub fn page_slice(&self, page: u16, column: u16, len: u16) -> &[u8] {
        if page >= self.pages || column >= self.width {
            return &[];
        }
        let start = self.index(page, column);
        let end = start + len.min(self.width - column) as usize;
        &self.data[start..end]
    }

    /// Horizontal line on the byte layout: one page, one bit per column.
    pub fn fast_hline(&mut self, x: i32, y: i32, len: u32, on: bool) {
        if y < 0 || y >= self.height as i32 {
            return;
        }
        let Some((x0, n)) = clip_span(x, len, self.width) else {
            return;
        };
        let page = y as u16 / 8;
        let bit = 1u8 << (y as u16 % 8);
        let base = self.index(page, x0);
        for b in &mut self.data[base..base + n as usize] {
            if on {
                *b |= bit;
            } else {
                *b &= !bit;
            }
        }
    }

    /// Vertical line on the byte layout: one mask per touched page.
    pub fn fast_vline(&mut self, x: i32, y: i32, len: u32, on: bool) {
        if x < 0 || x >= self.width as i32 {
            return;
        }
        let Some((y0, n)) = clip_span(y, len, self.height) else {
            return;
        };
        let y1 = y0 + n - 1;
        let x = x as u16;
        for page in (y0 / 8)..=(y1 / 8) {
            let mask = page_mask(page, y0, y1);
            let i = self.index(page, x);
            if on {
                self.data[i] |= mask;
            } else {
                self.data[i] &= !mask;
            }
        }
    }

    /// Filled rectangle: per-page masks swept across the column span.
    pub fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, on: bool) {
        let Some((x0, nw)) = clip_span(x, w, self.width) else {
            return;
        };
        let Some((y0, nh)) = clip_span(y, h, self.height) else {
            return;
        };
        let y1 = y0 + nh - 1;
        for page in (y0 / 8)..=(y1 / 8) {
            let mask = page_mask(page, y0, y1);
            let base = self.index(page, x0);
            for b in &mut self.data[base..base + nw as usize] {
                if on {
                    *b |= mask;
                } else {
                    *b &= !mask;
                }
            }
        }
    }
}

impl PixelSurface for PageBuffer {
    fn width(&self) -> u16 {
        self.width
    }

    fn height(&self) -> u16 {
        self.height
    }

    fn set_pixel(&mut self, x: i32, y: i32, on: bool) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let (x, y) = (x as u16, y as u16);
        let i = self.index(y / 8, x);
        let bit = 1u8 << (y % 8);
        if on {
            self.data[i] |= bit;
        } else {
            self.data[i] &= !bit;
        }
    }
}

// Bits of one page byte covered by the row range [y0, y1].
fn page_mask(page: u16, y0: u16, y1: u16) -> u8 {
    let top = page * 8;
    let lo = y0.max(top) - top;
    let hi = y1.min(top + 7) - top;
    (0xFFu8 << lo) & (0xFFu8 >> (7 - hi))
}

// Clip the half-open span [start, start + len) to [0, limit); None when
// nothing survives. Returns (start, len).
pub(crate) fn clip_span(start: i32, len: u32, limit: u16) -> Option<(u16, u16)> {
    let s = (start as i64).max(0);
    let e = (start as i64 + len as i64).min(limit as i64);
    if s >= e {
        None
    } else {
        Some((s as u16, (e - s) as u16))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_pixel_bit_position() {
        let mut fb = PageBuffer::new(128, 64);
        for &(x, y) in &[(0i32, 0i32), (5, 3), (127, 63), (64, 8), (17, 31)] {
            fb.set_pixel(x, y, true);
            let byte = fb.byte(y as u16 / 8, x as u16);
            assert_eq!(byte, 1 << (y as u16 % 8), "pixel ({x},{y})");
            assert!(fb.pixel(x, y));
            fb.set_pixel(x, y, false);
            assert_eq!(fb.byte(y as u16 / 8, x as u16), 0);
        }
    }

    #[test]
    fn set_pixel_leaves_other_bits_alone() {
        let mut fb = PageBuffer::new(16, 16);
        fb.set_byte(1, 3, 0b1010_0101);
        fb.set_pixel(3, 9, true); // page 1, bit 1
        assert_eq!(fb.byte(1, 3), 0b1010_0111);
        fb.set_pixel(3, 15, false); // page 1, bit 7
        assert_eq!(fb.byte(1, 3), 0b0010_0111);
    }

    #[test]
    fn out_of_range_set_pixel_is_a_noop() {
        let mut fb = PageBuffer::new(32, 16);
        let before = fb.clone();
        for &(x, y) in &[(-1i32, 0i32), (0, -1), (32, 0), (0, 16), (1000, 1000), (-40, 7)] {
            fb.set_pixel(x, y, true);
        }
        assert_eq!(fb, before);
        assert!(!fb.pixel(-1, 0));
        assert!(!fb.pixel(0, 16));
    }

    #[test]
    fn fill_sets_every_byte() {
        let mut fb = PageBuffer::new(20, 12); // 2 pages
        fb.fill(true);
        assert!(fb.data().iter().all(|&b| b == 0xFF));
        assert_eq!(fb.data().len(), 2 * 20);
        fb.fill(false);
        assert!(fb.data().iter().all(|&b| b == 0x00));
    }

    #[test]
    fn byte_access_is_clipped() {
        let mut fb = PageBuffer::new(8, 8);
        fb.set_byte(1, 0, 0xFF); // page out of range
        fb.set_byte(0, 8, 0xFF); // column out of range
        assert!(fb.data().iter().all(|&b| b == 0));
        assert_eq!(fb.byte(9, 9), 0);
    }

    #[test]
    fn page_slice_is_clipped() {
        let mut fb = PageBuffer::new(8, 8);
        fb.set_byte(0, 6, 0xAA);
        assert_eq!(fb.page_slice(0, 6, 100), &[0xAA, 0x00]);
        assert_eq!(fb.page_slice(3, 0, 8), &[] as &[u8]);
    }

    #[test]
    fn fast_vline_masks_page_edges() {
        let mut fb = PageBuffer::new(8, 24);
        fb.fast_vline(2, 5, 10, true); // rows 5..=14: pages 0..=1
        assert_eq!(fb.byte(0, 2), 0b1110_0000);
        assert_eq!(fb.byte(1, 2), 0b0111_1111);
        assert_eq!(fb.byte(2, 2), 0);
        fb.fast_vline(2, 6, 2, false);
        assert_eq!(fb.byte(0, 2), 0b1010_0000);
    }

    #[test]
    fn fast_hline_clips() {
        let mut fb = PageBuffer::new(8, 8);
        fb.fast_hline(-3, 1, 6, true); // survives as columns 0..=2
        for col in 0..8u16 {
            assert_eq!(fb.byte(0, col), if col < 3 { 0x02 } else { 0 });
        }
        fb.fast_hline(0, 9, 8, true); // fully off-panel
        assert_eq!(fb.byte(0, 0), 0x02);
    }

    #[test]
    fn fill_rect_clips_and_clears() {
        let mut fb = PageBuffer::new(16, 16);
        fb.fill_rect(-4, -4, 8, 8, true); // survives as 4x4 at origin
        for x in 0..16 {
            for y in 0..16 {
                assert_eq!(fb.pixel(x, y), x < 4 && y < 4, "({x},{y})");
            }
        }
        fb.fill(true);
        fb.fill_rect(4, 6, 5, 5, false);
        for x in 0..16 {
            for y in 0..16 {
                let hole = (4..9).contains(&x) && (6..11).contains(&y);
                assert_eq!(fb.pixel(x, y), !hole, "({x},{y})");
            }
        }
    }
}
