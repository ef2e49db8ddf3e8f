//! Driver for page-addressed monochrome LCD controllers of the
//! ST7567 / ST7539 / IST3931 class.
//!
//! The panel RAM on these controllers is organized as 8-row "pages" with one
//! byte per column, written through a narrow command/data bus (4-wire SPI
//! with a D/C pin, or I2C with control-byte framing). This crate keeps a
//! packed 1bpp framebuffer in the same layout, merges packed images into it
//! at pixel-granular offsets without disturbing neighboring bits, and
//! transmits it either whole or as a dirty window, translating page and
//! column addresses for panels whose RAM is offset or interleaved.
//!
//! Works with embedded-hal 1.0 peripherals and implements
//! `embedded_graphics::draw_target::DrawTarget<BinaryColor>`.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod address;
pub mod blit;
pub mod display;
pub mod framebuffer;
pub mod interface;
pub mod primitives;

pub use address::AddressMap;
pub use blit::OutOfBounds;
pub use display::{Config, Display, Error, ST7567_INIT};
pub use framebuffer::{PageBuffer, PixelSurface};
pub use interface::{DisplayBus, I2cBus, SpiBus, SpiBusError};
