//! This is a [bit banging] driver collection for small peripherals, built
//! on the [`embedded-hal`] traits.
//!
//! [bit banging]: https://en.wikipedia.org/wiki/Bit_banging
//! [`embedded-hal`]: https://github.com/rust-embedded/embedded-hal
//!
//! Every protocol is produced by toggling general purpose lines with a
//! software clock ([`clock::BitClock`]); no SPI peripheral is needed.
//!
//! - [`max7219`]: 8x8 LED matrix driver
//! - [`hc165`]: parallel-in serial-out switch register
//! - [`hc595`]: serial-in parallel-out output register
//! - [`mcp3201`]: 12-bit successive-approximation ADC
//! - [`morse`]: Morse encoder and transmitter
//! - [`meter`]: ADC level shown as a bar on the matrix
//!
//! Drivers accept any `embedded-hal` pins, or [`line::Line`]s opened by
//! number through [`board::Board`].

#![cfg_attr(not(test), no_std)]

pub mod board;
pub mod cancel;
pub mod clock;
pub mod config;
mod error;
pub mod hc165;
pub mod hc595;
pub mod line;
pub mod max7219;
pub mod mcp3201;
pub mod meter;
pub mod morse;
pub mod timing;

pub use crate::error::Error;
