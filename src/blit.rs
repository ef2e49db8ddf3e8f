//! Sub-byte blitting: merge a packed source image into the framebuffer at an
//! arbitrary pixel offset without disturbing neighboring bits.
//
// The source is row-major and MSB-first: `ceil(width / 8)` bytes per row, the
// leftmost pixel of a byte in bit 7. The destination offset is pixel-granular,
// so a source byte usually straddles two destination byte columns. Per row the
// source is re-aligned with the classic three-case shift: the first column
// takes `src >> x_bits`, interior columns combine the low bits of the previous
// source byte (`prev << (8 - x_bits)`) with the high bits of the current one,
// and the trailing column carries only left-over low bits. A coverage mask
// then limits the write to the bits actually inside `[x, x + width)`, which is
// what keeps destination bits sharing a byte with the blit region intact.

use crate::framebuffer::{PageBuffer, PixelSurface};

/// Blit geometry does not fit the destination, or the source slice length
/// does not match `ceil(width/8) * height`. Raised before any mutation; a
/// failed blit never partially applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutOfBounds;

impl PageBuffer {
    /// Merge a `width` x `height` source image into the buffer with its
    /// top-left corner at `(x, y)`.
    ///
    /// Every destination bit outside the blit rectangle keeps its value,
    /// including bits that share a byte column with the rectangle.
    pub fn blit(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        src: &[u8],
    ) -> Result<(), OutOfBounds> {
        let stride = (width as usize).div_ceil(8);
        if x as u32 + width as u32 > self.width() as u32
            || y as u32 + height as u32 > self.height() as u32
            || src.len() != stride * height as usize
        {
            return Err(OutOfBounds);
        }
        if width == 0 || height == 0 {
            return Ok(());
        }

        let x_bits = (x % 8) as u32;
        let x_start = x / 8;
        let x_end = (x + width - 1) / 8;

        for row in 0..height {
            let dy = y + row;
            let line = &src[row as usize * stride..][..stride];
            for j in x_start..=x_end {
                let k = (j - x_start) as usize;
                let aligned = aligned_source_byte(line, k, x_bits);
                let mask = coverage_mask(j, x, width);
                self.scatter_row_byte(dy, j, aligned, mask);
            }
        }
        Ok(())
    }

    // Write the masked bits of one aligned row byte into the page store:
    // horizontal position p of byte column j is pixel column j*8 + p, and the
    // row lands on bit `dy % 8` of page `dy / 8`. Bits outside the mask are
    // never touched, so the merge-with-existing contract falls out for free.
    fn scatter_row_byte(&mut self, dy: u16, j: u16, value: u8, mask: u8) {
        for p in 0..8u32 {
            let bit = 0x80u8 >> p;
            if mask & bit != 0 {
                self.set_pixel(j as i32 * 8 + p as i32, dy as i32, value & bit != 0);
            }
        }
    }
}

// Source bits for destination byte column `k` (relative to the first touched
// column), shifted into destination alignment.
fn aligned_source_byte(line: &[u8], k: usize, x_bits: u32) -> u8 {
    if x_bits == 0 {
        return line.get(k).copied().unwrap_or(0);
    }
    let cur = line.get(k).copied().unwrap_or(0) >> x_bits;
    if k == 0 {
        cur
    } else {
        (line[k - 1] << (8 - x_bits)) | cur
    }
}

// Bits of destination byte column `j` that lie inside [x, x + width). MSB is
// the leftmost pixel of the column.
fn coverage_mask(j: u16, x: u16, width: u16) -> u8 {
    let first = j as u32 * 8;
    let last = x as u32 + width as u32 - 1;
    if last < first {
        return 0;
    }
    let lo = (x as u32).max(first) - first;
    let hi = last.min(first + 7) - first;
    if lo > 7 {
        return 0;
    }
    (0xFFu8 >> lo) & (0xFFu8 << (7 - hi))
}
