//! Refresh scheduling: decide what part of the framebuffer goes out over the
//! bus, and when.
//
// The scheduler owns the active framebuffer and the bus. A full refresh walks
// the pages and streams each one; a partial refresh transmits only the page
// rows covering a dirty rectangle, unless the rectangle is so small that the
// per-page addressing overhead eats the savings, in which case it escalates
// to a full refresh. Every address that reaches the wire goes through the
// same `AddressMap`, so the interleaved panels see a consistent page order on
// every path.

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::Pixel;

use crate::address::AddressMap;
use crate::framebuffer::{clip_span, PageBuffer, PixelSurface};
use crate::interface::DisplayBus;

// Command bytes shared by the ST7539/ST7567 controller family.
const CMD_PAGE: u8 = 0xB0;
const CMD_COL_HI: u8 = 0x10;
const CMD_COL_LO: u8 = 0x00;
const CMD_CONTRAST: u8 = 0x81;
const CMD_START_LINE: u8 = 0x40;
const CMD_DISPLAY_OFF: u8 = 0xAE;
const CMD_DISPLAY_ON: u8 = 0xAF;
const CMD_NORMAL: u8 = 0xA6;
const CMD_INVERT: u8 = 0xA7;

/// ST7567 power-up sequence: reset, scan direction, bias, booster, contrast,
/// display on. Callers with other glass hand their own table to
/// [`Display::init_with`].
pub const ST7567_INIT: &[u8] = &[
    0xE2, // soft reset
    0xAE, // display off while configuring
    0x40, // start line 0
    0xA0, // segment remap normal
    0xC8, // COM scan reversed
    0xA6, // non-inverted
    0xA2, // bias 1/9
    0x2F, // booster + regulator + follower on
    0xF8, 0x00, // booster ratio
    0x24, // regulation ratio
    0x81, 0x10, // contrast
    0xAC, 0x00, // static indicator off
    0xAF, // display on
];

/// Driver error: a transport failure passed through from the bus, or
/// geometry that does not fit the panel (blit rectangle, swapped-in buffer).
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    Bus(E),
    OutOfBounds,
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Self::Bus(e)
    }
}

/// Panel geometry and refresh policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub width: u16,
    pub height: u16,
    /// Horizontal RAM offset: controller RAM wider than the glass.
    pub column_offset: u8,
    /// Vertical RAM offset in pages.
    pub page_offset: u8,
    /// Two-bank interleaved page layout (IST3931-style panels).
    pub interleaved: bool,
    /// Dirty regions smaller than this many pixels escalate to a full
    /// refresh; below it the per-page command overhead outweighs the data
    /// savings. The crossover depends on the bus clock, so it is
    /// configuration rather than a constant.
    pub partial_threshold: u32,
    /// Push drawing operations to the panel as they land in the buffer
    /// instead of waiting for an explicit refresh call.
    pub write_through: bool,
}

impl Config {
    pub const fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            column_offset: 0,
            page_offset: 0,
            interleaved: false,
            partial_threshold: 256,
            write_through: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(128, 64)
    }
}

/// Buffered driver for a page-addressed monochrome panel.
///
/// Owns the active [`PageBuffer`] and the bus. All drawing lands in the
/// buffer; [`refresh_full`](Self::refresh_full) /
/// [`refresh_region`](Self::refresh_region) transmit it, or set
/// `write_through` in the config to mirror every drawing call to the panel
/// immediately.
pub struct Display<BUS> {
    bus: BUS,
    buffer: PageBuffer,
    map: AddressMap,
    config: Config,
}

impl<BUS: DisplayBus> Display<BUS> {
    pub fn new(bus: BUS, config: Config) -> Self {
        let buffer = PageBuffer::new(config.width, config.height);
        let map = AddressMap {
            column_offset: config.column_offset,
            page_offset: config.page_offset,
            pages: buffer.pages() as u8,
            interleaved: config.interleaved,
        };
        Self {
            bus,
            buffer,
            map,
            config,
        }
    }

    #[inline]
    pub fn buffer(&self) -> &PageBuffer {
        &self.buffer
    }

    /// Direct buffer access for callers that render themselves and refresh
    /// explicitly.
    #[inline]
    pub fn buffer_mut(&mut self) -> &mut PageBuffer {
        &mut self.buffer
    }

    #[inline]
    pub fn bus_mut(&mut self) -> &mut BUS {
        &mut self.bus
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn release(self) -> (BUS, PageBuffer) {
        (self.bus, self.buffer)
    }

    /// Send a controller init command sequence, then clear the buffer and
    /// push the blank frame (first-frame display).
    pub fn init_with(&mut self, sequence: &[u8]) -> Result<(), Error<BUS::Error>> {
        self.bus.begin_transaction()?;
        for &cmd in sequence {
            self.bus.send_command(cmd)?;
        }
        self.bus.end_transaction()?;
        self.buffer.fill(false);
        self.refresh_full()
    }

    // Page-select plus split column-select, addresses translated. The one
    // place the logical->physical mapping is applied.
    fn set_address(&mut self, page: u8, column: u8) -> Result<(), BUS::Error> {
        let p = self.map.physical_page(page);
        let c = self.map.physical_column(column);
        self.bus.send_command(CMD_PAGE | (p & 0x0F))?;
        self.bus.send_command(CMD_COL_HI | (c >> 4))?;
        self.bus.send_command(CMD_COL_LO | (c & 0x0F))
    }

    /// Transmit the whole framebuffer, page by page.
    pub fn refresh_full(&mut self) -> Result<(), Error<BUS::Error>> {
        self.bus.begin_transaction()?;
        for page in 0..self.buffer.pages() {
            self.set_address(page as u8, 0)?;
            let row = self.buffer.page_slice(page, 0, self.buffer.width());
            self.bus.send_data_bulk(row)?;
        }
        self.bus.end_transaction()?;
        Ok(())
    }

    /// Transmit one rectangle of the framebuffer.
    ///
    /// The rectangle is clipped to the panel; an empty intersection sends
    /// nothing. Rectangles smaller than `partial_threshold` pixels escalate
    /// to [`refresh_full`](Self::refresh_full).
    pub fn refresh_region(
        &mut self,
        x: i32,
        y: i32,
        w: u32,
        h: u32,
    ) -> Result<(), Error<BUS::Error>> {
        let Some((x0, w)) = clip_span(x, w, self.config.width) else {
            return Ok(());
        };
        let Some((y0, h)) = clip_span(y, h, self.config.height) else {
            return Ok(());
        };
        if w as u32 * (h as u32) < self.config.partial_threshold {
            return self.refresh_full();
        }
        self.push_window(x0, y0, w, h)
    }

    // Transmit the page/column window covering an in-range rectangle. No
    // clipping and no escalation; this is also the write-through path.
    fn push_window(&mut self, x: u16, y: u16, w: u16, h: u16) -> Result<(), Error<BUS::Error>> {
        if w == 0 || h == 0 {
            return Ok(());
        }
        self.bus.begin_transaction()?;
        for page in (y / 8)..=((y + h - 1) / 8) {
            self.set_address(page as u8, x as u8)?;
            let row = self.buffer.page_slice(page, x, w);
            self.bus.send_data_bulk(row)?;
        }
        self.bus.end_transaction()?;
        Ok(())
    }

    // Clip a drawing rectangle and mirror it to the panel in write-through
    // mode.
    fn write_through(&mut self, x: i32, y: i32, w: u32, h: u32) -> Result<(), Error<BUS::Error>> {
        if !self.config.write_through {
            return Ok(());
        }
        let Some((x0, w)) = clip_span(x, w, self.config.width) else {
            return Ok(());
        };
        let Some((y0, h)) = clip_span(y, h, self.config.height) else {
            return Ok(());
        };
        self.push_window(x0, y0, w, h)
    }

    /// Set or clear one pixel (clips silently).
    pub fn set_pixel(&mut self, x: i32, y: i32, on: bool) -> Result<(), Error<BUS::Error>> {
        self.buffer.set_pixel(x, y, on);
        self.write_through(x, y, 1, 1)
    }

    /// Horizontal line (clips silently).
    pub fn fast_hline(
        &mut self,
        x: i32,
        y: i32,
        len: u32,
        on: bool,
    ) -> Result<(), Error<BUS::Error>> {
        self.buffer.fast_hline(x, y, len, on);
        self.write_through(x, y, len, 1)
    }

    /// Vertical line (clips silently).
    pub fn fast_vline(
        &mut self,
        x: i32,
        y: i32,
        len: u32,
        on: bool,
    ) -> Result<(), Error<BUS::Error>> {
        self.buffer.fast_vline(x, y, len, on);
        self.write_through(x, y, 1, len)
    }

    /// Filled rectangle (clips silently).
    pub fn fill_rect(
        &mut self,
        x: i32,
        y: i32,
        w: u32,
        h: u32,
        on: bool,
    ) -> Result<(), Error<BUS::Error>> {
        self.buffer.fill_rect(x, y, w, h, on);
        self.write_through(x, y, w, h)
    }

    /// Fill the whole buffer; in write-through mode also pushes the frame.
    pub fn clear(&mut self, on: bool) -> Result<(), Error<BUS::Error>> {
        self.buffer.fill(on);
        if self.config.write_through {
            self.refresh_full()?;
        }
        Ok(())
    }

    /// Merge a packed source image into the framebuffer at `(x, y)`; see
    /// [`PageBuffer::blit`]. In write-through mode the affected page/column
    /// window goes out immediately, with no threshold escalation.
    pub fn blit(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        src: &[u8],
    ) -> Result<(), Error<BUS::Error>> {
        self.buffer
            .blit(x, y, width, height, src)
            .map_err(|_| Error::OutOfBounds)?;
        if self.config.write_through {
            self.push_window(x, y, width, height)?;
        }
        Ok(())
    }

    /// Swap in a new active framebuffer and push it in one full refresh, so
    /// the panel never shows a torn mix of old and new frame.
    ///
    /// `None` installs a clone of the active buffer; `Some` installs the
    /// caller's buffer after a dimension check. The previous buffer is
    /// returned to the caller, who can keep rendering into it for the next
    /// swap.
    pub fn swap_buffer(
        &mut self,
        new: Option<PageBuffer>,
    ) -> Result<PageBuffer, Error<BUS::Error>> {
        let next = match new {
            Some(b) => {
                if b.width() != self.config.width || b.height() != self.config.height {
                    return Err(Error::OutOfBounds);
                }
                b
            }
            None => self.buffer.clone(),
        };
        let old = core::mem::replace(&mut self.buffer, next);
        self.refresh_full()?;
        Ok(old)
    }

    // ---- Controller controls ----

    pub fn set_contrast(&mut self, contrast: u8) -> Result<(), Error<BUS::Error>> {
        self.bus.begin_transaction()?;
        self.bus.send_command(CMD_CONTRAST)?;
        self.bus.send_command(contrast)?;
        self.bus.end_transaction()?;
        Ok(())
    }

    pub fn invert(&mut self, invert: bool) -> Result<(), Error<BUS::Error>> {
        self.bus
            .send_command(if invert { CMD_INVERT } else { CMD_NORMAL })?;
        Ok(())
    }

    pub fn set_display_on(&mut self, on: bool) -> Result<(), Error<BUS::Error>> {
        self.bus
            .send_command(if on { CMD_DISPLAY_ON } else { CMD_DISPLAY_OFF })?;
        Ok(())
    }

    /// Display start line (vertical scroll register, 0..=63).
    pub fn set_start_line(&mut self, line: u8) -> Result<(), Error<BUS::Error>> {
        self.bus.send_command(CMD_START_LINE | (line & 0x3F))?;
        Ok(())
    }
}

// -------------------- embedded-graphics integration --------------------

impl<BUS: DisplayBus> OriginDimensions for Display<BUS> {
    fn size(&self) -> Size {
        Size::new(self.config.width as u32, self.config.height as u32)
    }
}

impl<BUS: DisplayBus> DrawTarget for Display<BUS> {
    type Color = BinaryColor;
    type Error = Error<BUS::Error>;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<BinaryColor>>,
    {
        // Track the dirty rectangle while updating the buffer.
        let mut any = false;
        let mut minx = self.config.width;
        let mut miny = self.config.height;
        let mut maxx: u16 = 0;
        let mut maxy: u16 = 0;

        for Pixel(p, c) in pixels {
            if p.x < 0
                || p.y < 0
                || p.x >= self.config.width as i32
                || p.y >= self.config.height as i32
            {
                continue;
            }
            let (x, y) = (p.x as u16, p.y as u16);
            self.buffer.set_pixel(p.x, p.y, c.is_on());

            if !any {
                any = true;
                minx = x;
                maxx = x;
                miny = y;
                maxy = y;
            } else {
                minx = minx.min(x);
                miny = miny.min(y);
                maxx = maxx.max(x);
                maxy = maxy.max(y);
            }
        }

        if any && self.config.write_through {
            self.push_window(minx, miny, maxx - minx + 1, maxy - miny + 1)?;
        }
        Ok(())
    }

    fn clear(&mut self, color: BinaryColor) -> Result<(), Self::Error> {
        Display::clear(self, color.is_on())
    }
}
