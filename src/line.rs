/*!
  # Digital lines with a fixed direction

  A [`Line`] is a single GPIO acquired by number from a platform
  [`LineController`]. Its direction is chosen when it is opened and never
  changes afterwards: writing an input or reading an output is reported as
  [`Error::DirectionMismatch`].

  Lines implement the `embedded-hal` digital traits, so any driver in this
  crate accepts them in place of HAL pins.

  Dropping a line releases it. When a set of lines is opened with `?`, the
  lines acquired before a failing one are therefore released on the error
  path without extra bookkeeping.
*/

use core::cell::Cell;

use embedded_hal::digital::v2::{InputPin, OutputPin};

/// Opaque line number (board pin mapping)
pub type LineId = u8;

/// Line direction, fixed at initialization
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    Input,
    Output,
}

/// Line error
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The controller could not provide the line
    HardwareUnavailable(LineId),
    /// Read on an output or write on an input
    DirectionMismatch { id: LineId, direction: Direction },
}

/// Raw access to one acquired GPIO, provided by the platform.
pub trait RawLine {
    /// Drive the line to `high`.
    fn drive(&mut self, high: bool);

    /// Sample the line level.
    fn sense(&self) -> bool;

    /// Give the line back to the platform.
    fn release(&mut self);
}

/// Source of lines, addressed by number.
pub trait LineController {
    type Raw: RawLine;

    /// Acquire line `id` configured for `direction`, or `None` if the
    /// hardware cannot provide it.
    fn acquire(&mut self, id: LineId, direction: Direction) -> Option<Self::Raw>;
}

/// An owned digital line
pub struct Line<R>
where
    R: RawLine,
{
    id: LineId,
    direction: Direction,
    state: Cell<bool>,
    raw: Option<R>,
}

impl<R> Line<R>
where
    R: RawLine,
{
    /// Acquire line `id` from `controller` with a fixed `direction`.
    pub fn initialize<C>(controller: &mut C, id: LineId, direction: Direction) -> Result<Self, Error>
    where
        C: LineController<Raw = R>,
    {
        match controller.acquire(id, direction) {
            Some(raw) => {
                log::trace!("line {} opened as {:?}", id, direction);
                let state = Cell::new(raw.sense());
                Ok(Line {
                    id,
                    direction,
                    state,
                    raw: Some(raw),
                })
            }
            None => {
                log::warn!("line {} unavailable", id);
                Err(Error::HardwareUnavailable(id))
            }
        }
    }

    pub fn id(&self) -> LineId {
        self.id
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Last written (outputs) or last read (inputs) level
    pub fn state(&self) -> bool {
        self.state.get()
    }

    /// Drive an output line.
    pub fn write(&mut self, bit: bool) -> Result<(), Error> {
        self.check_direction(Direction::Output)?;
        if let Some(raw) = self.raw.as_mut() {
            raw.drive(bit);
        }
        self.state.set(bit);
        Ok(())
    }

    /// Sample an input line, refreshing its state.
    pub fn read(&self) -> Result<bool, Error> {
        self.check_direction(Direction::Input)?;
        let bit = self.raw.as_ref().map_or(false, RawLine::sense);
        self.state.set(bit);
        Ok(bit)
    }

    /// Release the line now instead of at drop.
    pub fn close(mut self) {
        self.release();
    }

    #[inline]
    fn check_direction(&self, direction: Direction) -> Result<(), Error> {
        if self.direction == direction {
            Ok(())
        } else {
            Err(Error::DirectionMismatch {
                id: self.id,
                direction: self.direction,
            })
        }
    }

    fn release(&mut self) {
        if let Some(mut raw) = self.raw.take() {
            raw.release();
            log::trace!("line {} closed", self.id);
        }
    }
}

impl<R> Drop for Line<R>
where
    R: RawLine,
{
    fn drop(&mut self) {
        self.release();
    }
}

impl<R> OutputPin for Line<R>
where
    R: RawLine,
{
    type Error = Error;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}

impl<R> InputPin for Line<R>
where
    R: RawLine,
{
    type Error = Error;

    fn is_high(&self) -> Result<bool, Self::Error> {
        self.read()
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        self.read().map(|bit| !bit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::vec::Vec;

    #[derive(Default)]
    struct Board {
        levels: [bool; 8],
        open: Vec<LineId>,
        released: Vec<LineId>,
        missing: Vec<LineId>,
    }

    struct FakeLine {
        id: LineId,
        board: Rc<RefCell<Board>>,
    }

    impl RawLine for FakeLine {
        fn drive(&mut self, high: bool) {
            self.board.borrow_mut().levels[self.id as usize] = high;
        }

        fn sense(&self) -> bool {
            self.board.borrow().levels[self.id as usize]
        }

        fn release(&mut self) {
            let mut board = self.board.borrow_mut();
            board.open.retain(|id| *id != self.id);
            board.released.push(self.id);
        }
    }

    struct Controller(Rc<RefCell<Board>>);

    impl LineController for Controller {
        type Raw = FakeLine;

        fn acquire(&mut self, id: LineId, _direction: Direction) -> Option<FakeLine> {
            if self.0.borrow().missing.contains(&id) {
                return None;
            }
            self.0.borrow_mut().open.push(id);
            Some(FakeLine {
                id,
                board: self.0.clone(),
            })
        }
    }

    fn controller() -> (Controller, Rc<RefCell<Board>>) {
        let board = Rc::new(RefCell::new(Board::default()));
        (Controller(board.clone()), board)
    }

    #[test]
    fn test_output_line_drives_level() {
        let (mut ctrl, board) = controller();
        let mut line = Line::initialize(&mut ctrl, 3, Direction::Output).unwrap();

        line.write(true).unwrap();
        assert!(board.borrow().levels[3]);
        assert!(line.state());

        line.set_low().unwrap();
        assert!(!board.borrow().levels[3]);
        assert!(!line.state());
    }

    #[test]
    fn test_input_line_refreshes_on_read() {
        let (mut ctrl, board) = controller();
        let line = Line::initialize(&mut ctrl, 2, Direction::Input).unwrap();
        assert!(!line.state());

        board.borrow_mut().levels[2] = true;
        assert!(!line.state());
        assert_eq!(line.read(), Ok(true));
        assert!(line.state());
        assert_eq!(line.is_low(), Ok(false));
    }

    #[test]
    fn test_direction_mismatch() {
        let (mut ctrl, _board) = controller();
        let mut input = Line::initialize(&mut ctrl, 1, Direction::Input).unwrap();
        let output = Line::initialize(&mut ctrl, 4, Direction::Output).unwrap();

        assert_eq!(
            input.write(true),
            Err(Error::DirectionMismatch {
                id: 1,
                direction: Direction::Input
            })
        );
        assert_eq!(
            output.is_high(),
            Err(Error::DirectionMismatch {
                id: 4,
                direction: Direction::Output
            })
        );
    }

    #[test]
    fn test_unavailable_line() {
        let (mut ctrl, board) = controller();
        board.borrow_mut().missing.push(5);

        let result = Line::initialize(&mut ctrl, 5, Direction::Output);
        assert_eq!(result.err(), Some(Error::HardwareUnavailable(5)));
    }

    #[test]
    fn test_partial_initialization_releases_siblings() {
        let (mut ctrl, board) = controller();
        board.borrow_mut().missing.push(7);

        fn open_three(ctrl: &mut Controller) -> Result<[Line<FakeLine>; 3], Error> {
            let a = Line::initialize(ctrl, 0, Direction::Output)?;
            let b = Line::initialize(ctrl, 1, Direction::Output)?;
            let c = Line::initialize(ctrl, 7, Direction::Output)?;
            Ok([a, b, c])
        }

        assert!(open_three(&mut ctrl).is_err());
        assert!(board.borrow().open.is_empty());
        assert_eq!(board.borrow().released, [1, 0]);
    }

    #[test]
    fn test_close_releases_once() {
        let (mut ctrl, board) = controller();
        let line = Line::initialize(&mut ctrl, 6, Direction::Output).unwrap();
        line.close();
        assert_eq!(board.borrow().released, [6]);
    }
}
