/*!
  # MAX7219 LED matrix driver over bit-banged lines

  This implementation consumes the following hardware resources:
  - A periodic timer ticking once per clock half-period
  - Three GPIO output lines: DIN, CLK and LOAD.

  Each register write is a 16-bit frame (address byte, then value byte)
  shifted in MSB first and committed on the rising edge of LOAD.

  Rows are 1-indexed, matching the digit registers of the chip. One bit of
  a row pattern lights one column.

  ## Example

  ```no_run
    # use bitbang_peripherals::max7219::Max7219;
    # fn demo<DIN, CLK, LOAD, T, E>(din: DIN, clk: CLK, load: LOAD, timer: T) -> Result<(), bitbang_peripherals::Error<E>>
    # where
    #     DIN: embedded_hal::digital::v2::OutputPin<Error = E>,
    #     CLK: embedded_hal::digital::v2::OutputPin<Error = E>,
    #     LOAD: embedded_hal::digital::v2::OutputPin<Error = E>,
    #     T: embedded_hal::timer::CountDown + embedded_hal::timer::Periodic,
    #     T::Time: From<core::time::Duration>,
    # {
    use bitbang_peripherals::config::Config;

    let config = Config::default();
    let mut matrix = Max7219::new(din, clk, load, timer, &config);
    matrix.initialize_display()?;
    matrix.clear_display()?;
    matrix.set_row(1, 0b1000_0001)?;

    // leaves the matrix dark
    let (_din, _clk, _load, _timer) = matrix.release()?;
    # Ok(())
    # }
  ```
*/

use core::time::Duration;

use embedded_hal::digital::v2::OutputPin;
use embedded_hal::timer::{CountDown, Periodic};

use crate::clock::{BitClock, Transfer};
use crate::config::Config;
use crate::error::Error;
use crate::timing::ClockTimer;

/// Number of row (digit) registers
pub const ROWS: u8 = 8;

/// Register map
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Register {
    DecodeMode = 0x09,
    Intensity = 0x0a,
    ScanLimit = 0x0b,
    Shutdown = 0x0c,
    DisplayTest = 0x0f,
}

impl Register {
    pub const fn addr(self) -> u8 {
        self as u8
    }
}

/// Bit-banged MAX7219
pub struct Max7219<DIN, CLK, LOAD, Timer>
where
    DIN: OutputPin,
    CLK: OutputPin,
    LOAD: OutputPin,
    Timer: CountDown + Periodic,
{
    din: DIN,
    clk: CLK,
    load: LOAD,
    clock: BitClock<Timer>,
    brightness: u8,
}

impl<DIN, CLK, LOAD, Timer, E> Max7219<DIN, CLK, LOAD, Timer>
where
    DIN: OutputPin<Error = E>,
    CLK: OutputPin<Error = E>,
    LOAD: OutputPin<Error = E>,
    Timer: CountDown + Periodic,
    Timer::Time: From<Duration>,
{
    /// Create instance, pacing the bit clock with `config.calibration.half_period`
    pub fn new(din: DIN, clk: CLK, load: LOAD, timer: Timer, config: &Config) -> Self {
        let timer = ClockTimer::new(timer, config.calibration.half_period);
        Max7219 {
            din,
            clk,
            load,
            clock: BitClock::new(timer),
            brightness: config.brightness,
        }
    }

    /// Write `value` into register `addr`.
    pub fn write_register(&mut self, addr: u8, value: u8) -> Result<(), Error<E>> {
        self.clk.set_high().map_err(Error::Bus)?;
        self.load.set_low().map_err(Error::Bus)?;

        self.clock
            .transmit(&mut self.din, &mut self.clk, addr as u16, Transfer::BYTE)?;
        self.clock
            .transmit(&mut self.din, &mut self.clk, value as u16, Transfer::BYTE)?;

        self.clk.set_low().map_err(Error::Bus)?;
        self.load.set_high().map_err(Error::Bus)?;
        self.clock.settle();

        Ok(())
    }

    #[inline]
    fn write(&mut self, register: Register, value: u8) -> Result<(), Error<E>> {
        self.write_register(register.addr(), value)
    }

    /// Bring the chip out of shutdown in raw (no decode) mode, scanning all
    /// eight rows at the configured brightness.
    pub fn initialize_display(&mut self) -> Result<(), Error<E>> {
        self.write(Register::Shutdown, 0x01)?;
        self.write(Register::DisplayTest, 0x00)?;
        self.write(Register::DecodeMode, 0x00)?;
        self.write(Register::ScanLimit, ROWS - 1)?;
        self.write(Register::Intensity, self.brightness)?;
        log::debug!("max7219 initialized, intensity {:#04x}", self.brightness);
        Ok(())
    }

    /// Set every row to `pattern`.
    pub fn fill(&mut self, pattern: u8) -> Result<(), Error<E>> {
        for row in 1..=ROWS {
            self.write_register(row, pattern)?;
        }
        Ok(())
    }

    /// Switch every LED off.
    pub fn clear_display(&mut self) -> Result<(), Error<E>> {
        self.fill(0x00)
    }

    /// Show `pattern` on `row` (1 to 8).
    pub fn set_row(&mut self, row: u8, pattern: u8) -> Result<(), Error<E>> {
        if row == 0 || row > ROWS {
            return Err(Error::InvalidData);
        }
        self.write_register(row, pattern)
    }

    /// Clear the display and return the lines and timer.
    pub fn release(mut self) -> Result<(DIN, CLK, LOAD, Timer), Error<E>> {
        self.clear_display()?;
        log::debug!("max7219 cleared and released");
        Ok((self.din, self.clk, self.load, self.clock.free()))
    }
}

/// Next frame of the scrolling bar: shift right, refill when empty.
pub fn scroll_step(pattern: u8) -> u8 {
    if pattern > 1 {
        pattern >> 1
    } else {
        0xff
    }
}
