//! Driver construction from numbered lines.
//!
//! Opens the line set of each peripheral through a [`LineController`] using
//! the pin numbers of a [`Config`], and hands back a ready driver. If one
//! line of a set cannot be opened, the lines already opened for that set
//! are released before the error is returned.

use core::time::Duration;

use embedded_hal::timer::{CountDown, Periodic};

use crate::config::Config;
use crate::hc165::Hc165;
use crate::hc595::Hc595;
use crate::line::{Direction, Error, Line, LineController};
use crate::max7219::Max7219;
use crate::mcp3201::Mcp3201;

/// MAX7219 on lines
pub type Display<R, T> = Max7219<Line<R>, Line<R>, Line<R>, T>;
/// 74HC165 on lines
pub type Switches<R, T> = Hc165<Line<R>, Line<R>, Line<R>, Line<R>, T>;
/// MCP3201 on lines
pub type Adc<R, T> = Mcp3201<Line<R>, Line<R>, Line<R>, T>;
/// 74HC595 on lines
pub type Leds<R, T> = Hc595<Line<R>, Line<R>, Line<R>, T>;

/// Line controller plus board configuration
pub struct Board<C>
where
    C: LineController,
{
    controller: C,
    config: Config,
}

impl<C> Board<C>
where
    C: LineController,
{
    pub fn new(controller: C, config: Config) -> Self {
        Board { controller, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn output(&mut self, id: u8) -> Result<Line<C::Raw>, Error> {
        Line::initialize(&mut self.controller, id, Direction::Output)
    }

    fn input(&mut self, id: u8) -> Result<Line<C::Raw>, Error> {
        Line::initialize(&mut self.controller, id, Direction::Input)
    }

    /// Open the LED matrix. The display is not initialized yet.
    pub fn display<T>(&mut self, timer: T) -> Result<Display<C::Raw, T>, Error>
    where
        T: CountDown + Periodic,
        T::Time: From<Duration>,
    {
        let pins = self.config.pins.display;
        let load = self.output(pins.load)?;
        let din = self.output(pins.din)?;
        let clk = self.output(pins.clk)?;
        log::info!("display on lines din={} clk={} load={}", pins.din, pins.clk, pins.load);
        Ok(Max7219::new(din, clk, load, timer, &self.config))
    }

    /// Open the switch register.
    pub fn switches<T>(&mut self, timer: T) -> Result<Switches<C::Raw, T>, Error>
    where
        T: CountDown + Periodic,
        T::Time: From<Duration>,
    {
        let pins = self.config.pins.switches;
        let pl = self.output(pins.pl)?;
        let q7 = self.input(pins.q7)?;
        let ce = self.output(pins.ce)?;
        let cp = self.output(pins.cp)?;
        log::info!(
            "switches on lines pl={} q7={} ce={} cp={}",
            pins.pl,
            pins.q7,
            pins.ce,
            pins.cp
        );
        Ok(Hc165::new(pl, q7, ce, cp, timer, &self.config))
    }

    /// Open the ADC.
    pub fn adc<T>(&mut self, timer: T) -> Result<Adc<C::Raw, T>, Error>
    where
        T: CountDown + Periodic,
        T::Time: From<Duration>,
    {
        let pins = self.config.pins.adc;
        let clk = self.output(pins.clk)?;
        let dout = self.input(pins.dout)?;
        let cs = self.output(pins.cs)?;
        log::info!("adc on lines clk={} dout={} cs={}", pins.clk, pins.dout, pins.cs);
        Ok(Mcp3201::new(dout, clk, cs, timer, &self.config))
    }

    /// Open the LED output register.
    pub fn leds<T>(&mut self, timer: T) -> Result<Leds<C::Raw, T>, Error>
    where
        T: CountDown + Periodic,
        T::Time: From<Duration>,
    {
        let pins = self.config.pins.leds;
        let ds = self.output(pins.ds)?;
        let shcp = self.output(pins.shcp)?;
        let stcp = self.output(pins.stcp)?;
        log::info!("leds on lines ds={} shcp={} stcp={}", pins.ds, pins.shcp, pins.stcp);
        Ok(Hc595::new(ds, shcp, stcp, timer, &self.config))
    }

    pub fn free(self) -> C {
        self.controller
    }
}
