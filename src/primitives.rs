//! Per-pixel drawing helpers over any [`PixelSurface`].
//
// These are the straightforward reference paths; `PageBuffer` carries
// byte-level fast versions of the same shapes. Both must agree bit for bit,
// which the tests below pin down.

use crate::framebuffer::PixelSurface;

/// Horizontal line of `len` pixels starting at `(x, y)`. Clips.
pub fn hline<S: PixelSurface>(surface: &mut S, x: i32, y: i32, len: u32, on: bool) {
    for i in 0..len {
        surface.set_pixel(x.saturating_add(i as i32), y, on);
    }
}

/// Vertical line of `len` pixels starting at `(x, y)`. Clips.
pub fn vline<S: PixelSurface>(surface: &mut S, x: i32, y: i32, len: u32, on: bool) {
    for i in 0..len {
        surface.set_pixel(x, y.saturating_add(i as i32), on);
    }
}

/// Filled `w` x `h` rectangle with its top-left corner at `(x, y)`. Clips.
pub fn fill_rect<S: PixelSurface>(surface: &mut S, x: i32, y: i32, w: u32, h: u32, on: bool) {
    for row in 0..h {
        hline(surface, x, y.saturating_add(row as i32), w, on);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framebuffer::PageBuffer;

    // The byte-level fast paths and the per-pixel generic paths must be
    // indistinguishable from the outside.
    #[test]
    fn fast_paths_match_generic_paths() {
        let cases: &[(i32, i32, u32, u32)] = &[
            (0, 0, 128, 64),
            (5, 3, 20, 13),
            (-7, -2, 30, 10),
            (120, 60, 20, 20),
            (3, 62, 1, 5),
            (127, 0, 1, 64),
        ];
        for &(x, y, w, h) in cases {
            let mut fast = PageBuffer::new(128, 64);
            let mut slow = PageBuffer::new(128, 64);
            fast.fill_rect(x, y, w, h, true);
            fill_rect(&mut slow, x, y, w, h, true);
            assert_eq!(fast, slow, "fill_rect {:?}", (x, y, w, h));

            let mut fast = PageBuffer::new(128, 64);
            let mut slow = PageBuffer::new(128, 64);
            fast.fast_hline(x, y, w, true);
            hline(&mut slow, x, y, w, true);
            assert_eq!(fast, slow, "hline {:?}", (x, y, w));

            let mut fast = PageBuffer::new(128, 64);
            let mut slow = PageBuffer::new(128, 64);
            fast.fast_vline(x, y, h, true);
            vline(&mut slow, x, y, h, true);
            assert_eq!(fast, slow, "vline {:?}", (x, y, h));
        }
    }

    #[test]
    fn clearing_matches_too() {
        let mut fast = PageBuffer::new(64, 32);
        let mut slow = PageBuffer::new(64, 32);
        fast.fill(true);
        slow.fill(true);
        fast.fill_rect(10, 5, 9, 17, false);
        fill_rect(&mut slow, 10, 5, 9, 17, false);
        assert_eq!(fast, slow);
    }
}
