//! Simulated lines, timer and delay shared by the integration tests.
//!
//! Every pin write, pin read, timer tick and delay lands in one ordered
//! trace, and an optional device model reacts to the writes the way the
//! real chip would.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::convert::Infallible;
use std::rc::Rc;
use std::time::Duration;

use bitbang_peripherals::line::{Direction, LineController, LineId, RawLine};
use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::digital::v2::{InputPin, OutputPin};
use embedded_hal::timer::{CountDown, Periodic};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Set(&'static str, bool),
    Read(&'static str, bool),
    Tick,
    Delay(u32),
}

/// Chip model attached to the bus
pub trait Device {
    fn on_set(&mut self, pin: &'static str, level: bool);
    fn output(&mut self, pin: &'static str) -> Option<bool>;
}

#[derive(Default)]
pub struct BusState {
    pub trace: Vec<Event>,
    pub levels: HashMap<&'static str, bool>,
    pub device: Option<Box<dyn Device>>,
}

#[derive(Clone, Default)]
pub struct Bus(pub Rc<RefCell<BusState>>);

impl Bus {
    pub fn new() -> Self {
        Bus::default()
    }

    pub fn with_device<D: Device + 'static>(device: D) -> Self {
        let bus = Bus::new();
        bus.0.borrow_mut().device = Some(Box::new(device));
        bus
    }

    pub fn pin(&self, name: &'static str) -> SimPin {
        SimPin {
            name,
            bus: self.clone(),
        }
    }

    pub fn timer(&self) -> SimTimer {
        SimTimer { bus: self.clone() }
    }

    pub fn delay(&self) -> SimDelay {
        SimDelay { bus: self.clone() }
    }

    pub fn trace(&self) -> Vec<Event> {
        self.0.borrow().trace.clone()
    }

    pub fn clear_trace(&self) {
        self.0.borrow_mut().trace.clear();
    }

    pub fn level(&self, name: &'static str) -> bool {
        self.0.borrow().levels.get(name).copied().unwrap_or(false)
    }

    pub fn set_level(&self, name: &'static str, level: bool) {
        self.0.borrow_mut().levels.insert(name, level);
    }

    fn record(&self, event: Event) {
        self.0.borrow_mut().trace.push(event);
    }

    fn drive(&self, name: &'static str, level: bool) {
        let mut state = self.0.borrow_mut();
        state.trace.push(Event::Set(name, level));
        state.levels.insert(name, level);
        if let Some(device) = state.device.as_mut() {
            device.on_set(name, level);
        }
    }

    fn sense(&self, name: &'static str) -> bool {
        let mut state = self.0.borrow_mut();
        let from_device = state.device.as_mut().and_then(|d| d.output(name));
        let level = from_device.unwrap_or_else(|| state.levels.get(name).copied().unwrap_or(false));
        state.trace.push(Event::Read(name, level));
        level
    }

    /// Total delayed milliseconds
    pub fn delayed_ms(&self) -> u64 {
        self.trace()
            .iter()
            .map(|e| match e {
                Event::Delay(ms) => *ms as u64,
                _ => 0,
            })
            .sum()
    }
}

pub struct SimPin {
    name: &'static str,
    bus: Bus,
}

impl OutputPin for SimPin {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Infallible> {
        self.bus.drive(self.name, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.bus.drive(self.name, true);
        Ok(())
    }
}

impl InputPin for SimPin {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Infallible> {
        Ok(self.bus.sense(self.name))
    }

    fn is_low(&self) -> Result<bool, Infallible> {
        Ok(!self.bus.sense(self.name))
    }
}

pub struct SimTimer {
    bus: Bus,
}

impl CountDown for SimTimer {
    type Time = Duration;

    fn start<T>(&mut self, _count: T)
    where
        T: Into<Self::Time>,
    {
    }

    fn wait(&mut self) -> nb::Result<(), void::Void> {
        self.bus.record(Event::Tick);
        Ok(())
    }
}

impl Periodic for SimTimer {}

pub struct SimDelay {
    bus: Bus,
}

impl DelayMs<u32> for SimDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.bus.record(Event::Delay(ms));
    }
}

/// Rising edges of `clk` in `trace`
pub fn rising_edges(trace: &[Event], clk: &'static str) -> usize {
    let mut level = false;
    let mut edges = 0;
    for event in trace {
        if let Event::Set(name, high) = *event {
            if name == clk {
                if high && !level {
                    edges += 1;
                }
                level = high;
            }
        }
    }
    edges
}

/// Listens to DIN/CLK/LOAD and records every committed 16-bit frame
#[derive(Default)]
pub struct Max7219Model {
    din: bool,
    clk: bool,
    load: bool,
    shift: Vec<bool>,
    pub frames: Rc<RefCell<Vec<(u8, u8)>>>,
    pub registers: Rc<RefCell<[u8; 16]>>,
}

impl Device for Max7219Model {
    fn on_set(&mut self, pin: &'static str, level: bool) {
        match pin {
            "din" => self.din = level,
            "clk" => {
                if level && !self.clk && !self.load {
                    self.shift.push(self.din);
                }
                self.clk = level;
            }
            "load" => {
                if !level {
                    self.shift.clear();
                } else if !self.load && self.shift.len() >= 16 {
                    let bits = &self.shift[self.shift.len() - 16..];
                    let word = bits.iter().fold(0u16, |w, b| (w << 1) | *b as u16);
                    let (addr, value) = ((word >> 8) as u8, word as u8);
                    self.frames.borrow_mut().push((addr, value));
                    self.registers.borrow_mut()[(addr & 0x0f) as usize] = value;
                }
                self.load = level;
            }
            _ => {}
        }
    }

    fn output(&mut self, _pin: &'static str) -> Option<bool> {
        None
    }
}

/// 74HC165 with eight switch inputs, `switches[i]` wired to D`i`
pub struct Hc165Model {
    pub switches: Rc<RefCell<[bool; 8]>>,
    stages: [bool; 8],
    cp: bool,
    ce: bool,
    pl: bool,
}

impl Hc165Model {
    pub fn new(switches: [bool; 8]) -> Self {
        Hc165Model {
            switches: Rc::new(RefCell::new(switches)),
            stages: [false; 8],
            cp: false,
            ce: true,
            pl: true,
        }
    }
}

impl Device for Hc165Model {
    fn on_set(&mut self, pin: &'static str, level: bool) {
        match pin {
            "pl" => {
                if !level {
                    self.stages = *self.switches.borrow();
                }
                self.pl = level;
            }
            "ce" => self.ce = level,
            "cp" => {
                if level && !self.cp && self.pl && !self.ce {
                    for k in (1..8).rev() {
                        self.stages[k] = self.stages[k - 1];
                    }
                    self.stages[0] = false;
                }
                self.cp = level;
            }
            _ => {}
        }
    }

    fn output(&mut self, pin: &'static str) -> Option<bool> {
        if pin == "q7" {
            Some(self.stages[7])
        } else {
            None
        }
    }
}

/// MCP3201 holding a fixed conversion result
pub struct Mcp3201Model {
    pub value: Rc<RefCell<u16>>,
    edges: u32,
    clk: bool,
    cs: bool,
}

impl Mcp3201Model {
    pub fn new(value: u16) -> Self {
        Mcp3201Model {
            value: Rc::new(RefCell::new(value)),
            edges: 0,
            clk: false,
            cs: true,
        }
    }
}

impl Device for Mcp3201Model {
    fn on_set(&mut self, pin: &'static str, level: bool) {
        match pin {
            "cs" => {
                if !level {
                    self.edges = 0;
                }
                self.cs = level;
            }
            "aclk" => {
                if level && !self.clk && !self.cs {
                    self.edges += 1;
                }
                self.clk = level;
            }
            _ => {}
        }
    }

    fn output(&mut self, pin: &'static str) -> Option<bool> {
        if pin != "dout" {
            return None;
        }
        if self.cs {
            return Some(true);
        }
        match self.edges {
            // sampling window and null bit, driven high to expose stray bits
            0..=3 => Some(true),
            e @ 4..=15 => Some((*self.value.borrow() >> (15 - e)) & 1 == 1),
            _ => Some(false),
        }
    }
}

/// Line controller over a [`Bus`], with optional missing lines
pub struct SimController {
    pub bus: Bus,
    pub names: HashMap<LineId, &'static str>,
    pub missing: Vec<LineId>,
    pub released: Rc<RefCell<Vec<LineId>>>,
}

impl SimController {
    pub fn new(bus: Bus, names: &[(LineId, &'static str)]) -> Self {
        SimController {
            bus,
            names: names.iter().copied().collect(),
            missing: Vec::new(),
            released: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

pub struct SimLine {
    id: LineId,
    pin: SimPin,
    released: Rc<RefCell<Vec<LineId>>>,
}

impl RawLine for SimLine {
    fn drive(&mut self, high: bool) {
        if high {
            self.pin.set_high().ok();
        } else {
            self.pin.set_low().ok();
        }
    }

    fn sense(&self) -> bool {
        self.pin.is_high().unwrap_or(false)
    }

    fn release(&mut self) {
        self.released.borrow_mut().push(self.id);
    }
}

impl LineController for SimController {
    type Raw = SimLine;

    fn acquire(&mut self, id: LineId, _direction: Direction) -> Option<SimLine> {
        if self.missing.contains(&id) {
            return None;
        }
        let name = *self.names.get(&id)?;
        Some(SimLine {
            id,
            pin: self.bus.pin(name),
            released: self.released.clone(),
        })
    }
}
