/*!
  # Bit-clock engine

  Moves one bit per rising clock edge, most-significant bit first, over a
  data line and a clock line. Data is presented while the clock is low and
  the peripheral latches it on the low-to-high transition.

  The engine owns only the half-period timer. Lines are borrowed for each
  transfer so that one engine can serve a component's whole line set.

  Each half-period is a minimum: a slow scheduler stretches the waveform
  but never shortens it. Every transfer restarts the timer, so time spent
  idle between transfers never counts towards the first half-period.
*/

use core::time::Duration;

use embedded_hal::digital::v2::{InputPin, OutputPin};
use embedded_hal::timer::{CountDown, Periodic};

use crate::error::Error;
use crate::timing::ClockTimer;

/// Widest word the engine moves in one transfer
pub const MAX_WIDTH: u8 = 16;

/// Shape of one transfer
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transfer {
    /// Bits per word, 1 to 16
    pub width: u8,
    /// Receive only: edges clocked before the first valid bit
    pub skip_leading: u8,
}

impl Transfer {
    /// A byte
    pub const BYTE: Transfer = Transfer::new(8);

    pub const fn new(width: u8) -> Self {
        Transfer {
            width,
            skip_leading: 0,
        }
    }

    pub const fn skip_leading(self, skip_leading: u8) -> Self {
        Transfer {
            width: self.width,
            skip_leading,
        }
    }

    /// Total edges clocked on receive
    pub const fn edges(&self) -> u16 {
        self.skip_leading as u16 + self.width as u16
    }

    fn check<E>(&self) -> Result<(), Error<E>> {
        if self.width == 0 || self.width > MAX_WIDTH {
            Err(Error::InvalidData)
        } else {
            Ok(())
        }
    }
}

/// Software clock driving synchronous transfers
pub struct BitClock<Timer>
where
    Timer: CountDown + Periodic,
{
    timer: ClockTimer<Timer>,
}

impl<Timer> BitClock<Timer>
where
    Timer: CountDown + Periodic,
    Timer::Time: From<Duration>,
{
    pub fn new(timer: ClockTimer<Timer>) -> Self {
        BitClock { timer }
    }

    /// Begin a transaction with a full half-period ahead.
    #[inline]
    pub fn restart(&mut self) {
        self.timer.restart();
    }

    /// Wait one half-period.
    #[inline]
    pub fn wait_for_clk(&mut self) {
        self.timer.tick();
    }

    /// Wait one settling period after a control-line transition.
    #[inline]
    pub fn settle(&mut self) {
        self.timer.settle();
    }

    /// Shift `value` out on `data`, MSB first.
    pub fn transmit<Data, Clk, E>(
        &mut self,
        data: &mut Data,
        clk: &mut Clk,
        value: u16,
        transfer: Transfer,
    ) -> Result<(), Error<E>>
    where
        Data: OutputPin<Error = E>,
        Clk: OutputPin<Error = E>,
    {
        transfer.check()?;
        self.restart();

        for bit_offset in (0..transfer.width).rev() {
            clk.set_low().map_err(Error::Bus)?;
            self.wait_for_clk();

            if (value >> bit_offset) & 0b1 == 1 {
                data.set_high().map_err(Error::Bus)?;
            } else {
                data.set_low().map_err(Error::Bus)?;
            }
            self.wait_for_clk();

            clk.set_high().map_err(Error::Bus)?;
            self.wait_for_clk();
        }

        Ok(())
    }

    /// Clock `transfer.edges()` rising edges and assemble the bits sampled
    /// after the first `skip_leading` of them, newest bit least-significant.
    pub fn receive<Data, Clk, E>(
        &mut self,
        data: &mut Data,
        clk: &mut Clk,
        transfer: Transfer,
    ) -> Result<u16, Error<E>>
    where
        Data: InputPin<Error = E>,
        Clk: OutputPin<Error = E>,
    {
        transfer.check()?;
        self.restart();

        let mut word: u16 = 0;
        for edge in 0..transfer.edges() {
            clk.set_low().map_err(Error::Bus)?;
            self.wait_for_clk();

            clk.set_high().map_err(Error::Bus)?;
            if edge >= transfer.skip_leading as u16 {
                let bit = data.is_high().map_err(Error::Bus)?;
                word = (word << 1) | bit as u16;
            }
            self.wait_for_clk();
        }

        Ok(word)
    }

    pub fn free(self) -> Timer {
        self.timer.free()
    }
}
