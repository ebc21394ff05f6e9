/*!
  # Morse encoder and transmitter

  Text is encoded one character at a time through a fixed table. Letters
  are case-insensitive; digits, space and the punctuation marks
  `! " $ & ' ( ) + , - . / : ; = ? @ _` are also supported. Any other
  character stops the encoder.

  All durations are multiples of one timing unit:

  | element                | units |
  |------------------------|-------|
  | dot (short mark)       | 1     |
  | dash (long mark)       | 3     |
  | gap inside a character | 1     |
  | gap between characters | 3     |
  | gap for a space        | 7     |

  The [`Transmitter`] plays the elements on an [`Indicator`]: either the
  LED matrix through [`MatrixIndicator`], or a single output such as an LED
  or a buzzer through [`PinIndicator`].
*/

use core::iter::Peekable;
use core::str::Chars;
use core::time::Duration;

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::digital::v2::OutputPin;
use embedded_hal::timer::{CountDown, Periodic};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::cancel::CancelToken;
use crate::config::{Calibration, MorseConfig};
use crate::error::Error;
use crate::max7219::Max7219;
use crate::timing::pause;

const TABLE: &[(char, &str)] = &[
    ('A', ".-"),
    ('B', "-..."),
    ('C', "-.-."),
    ('D', "-.."),
    ('E', "."),
    ('F', "..-."),
    ('G', "--."),
    ('H', "...."),
    ('I', ".."),
    ('J', ".---"),
    ('K', "-.-"),
    ('L', ".-.."),
    ('M', "--"),
    ('N', "-."),
    ('O', "---"),
    ('P', ".--."),
    ('Q', "--.-"),
    ('R', ".-."),
    ('S', "..."),
    ('T', "-"),
    ('U', "..-"),
    ('V', "...-"),
    ('W', ".--"),
    ('X', "-..-"),
    ('Y', "-.--"),
    ('Z', "--.."),
    ('0', "-----"),
    ('1', ".----"),
    ('2', "..---"),
    ('3', "...--"),
    ('4', "....-"),
    ('5', "....."),
    ('6', "-...."),
    ('7', "--..."),
    ('8', "---.."),
    ('9', "----."),
    ('!', "-.-.--"),
    ('"', ".-..-."),
    ('$', "...-..-"),
    ('&', ".-..."),
    ('\'', ".----."),
    ('(', "-.--."),
    (')', "-.--.-"),
    ('+', ".-.-."),
    (',', "--..--"),
    ('-', "-....-"),
    ('.', ".-.-.-"),
    ('/', "-..-."),
    (':', "---..."),
    (';', "-.-.-."),
    ('=', "-...-"),
    ('?', "..--.."),
    ('@', ".--.-."),
    ('_', "..--.-"),
];

/// A mark
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Symbol {
    Dot,
    Dash,
}

impl Symbol {
    pub const fn units(self) -> u32 {
        match self {
            Symbol::Dot => 1,
            Symbol::Dash => 3,
        }
    }
}

/// A silence
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gap {
    /// Between the marks of one character
    Symbol,
    /// Between two characters of a word
    Letter,
    /// For a space
    Word,
}

impl Gap {
    pub const fn units(self) -> u32 {
        match self {
            Gap::Symbol => 1,
            Gap::Letter => 3,
            Gap::Word => 7,
        }
    }
}

/// One step of the keying timeline
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Element {
    Mark(Symbol),
    Gap(Gap),
}

impl Element {
    pub const fn units(self) -> u32 {
        match self {
            Element::Mark(symbol) => symbol.units(),
            Element::Gap(gap) => gap.units(),
        }
    }

    /// On/off keying, one character per unit
    pub const fn keying(self) -> &'static str {
        match self {
            Element::Mark(Symbol::Dot) => "1",
            Element::Mark(Symbol::Dash) => "111",
            Element::Gap(Gap::Symbol) => "0",
            Element::Gap(Gap::Letter) => "000",
            Element::Gap(Gap::Word) => "0000000",
        }
    }
}

/// Code of one character, as dots and dashes
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Code(&'static str);

impl Code {
    pub fn as_str(&self) -> &'static str {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn symbols(&self) -> Symbols {
        Symbols(self.0.chars())
    }
}

/// Symbols of a [`Code`]
#[derive(Debug, Clone)]
pub struct Symbols(Chars<'static>);

impl Iterator for Symbols {
    type Item = Symbol;

    fn next(&mut self) -> Option<Symbol> {
        self.0.next().map(|c| match c {
            '.' => Symbol::Dot,
            _ => Symbol::Dash,
        })
    }
}

/// Look up the code of `ch`.
pub fn lookup(ch: char) -> Option<Code> {
    let key = ch.to_ascii_uppercase();
    TABLE
        .iter()
        .find(|(c, _)| *c == key)
        .map(|(_, code)| Code(*code))
}

/// Character with no Morse code
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Unencodable(pub char);

/// One character of text, ready to key
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Token {
    Letter {
        ch: char,
        code: Code,
        /// Followed by another character of the same word
        gap_after: bool,
    },
    Space,
}

impl Token {
    pub fn elements(&self) -> TokenElements {
        match *self {
            Token::Letter {
                code, gap_after, ..
            } => TokenElements {
                symbols: code.symbols().peekable(),
                between: false,
                trailer: if gap_after { Some(Gap::Letter) } else { None },
            },
            Token::Space => TokenElements {
                symbols: Code("").symbols().peekable(),
                between: false,
                trailer: Some(Gap::Word),
            },
        }
    }

    pub fn units(&self) -> u32 {
        self.elements().map(Element::units).sum()
    }
}

/// Timeline of one [`Token`]
#[derive(Debug, Clone)]
pub struct TokenElements {
    symbols: Peekable<Symbols>,
    between: bool,
    trailer: Option<Gap>,
}

impl Iterator for TokenElements {
    type Item = Element;

    fn next(&mut self) -> Option<Element> {
        if self.between {
            self.between = false;
            return Some(Element::Gap(Gap::Symbol));
        }
        if let Some(symbol) = self.symbols.next() {
            self.between = self.symbols.peek().is_some();
            return Some(Element::Mark(symbol));
        }
        self.trailer.take().map(Element::Gap)
    }
}

/// Character-by-character encoder, stops after the first unencodable
/// character.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    chars: Peekable<Chars<'a>>,
    failed: bool,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Result<Token, Unencodable>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let ch = self.chars.next()?;
        if ch == ' ' {
            return Some(Ok(Token::Space));
        }

        match lookup(ch) {
            Some(code) => {
                let gap_after = matches!(self.chars.peek(), Some(&next) if next != ' ');
                Some(Ok(Token::Letter {
                    ch,
                    code,
                    gap_after,
                }))
            }
            None => {
                self.failed = true;
                Some(Err(Unencodable(ch)))
            }
        }
    }
}

/// Encode `text` into tokens.
pub fn encode(text: &str) -> Tokens<'_> {
    Tokens {
        chars: text.chars().peekable(),
        failed: false,
    }
}

/// Flat keying timeline of a text
#[derive(Debug, Clone)]
pub struct Elements<'a> {
    tokens: Tokens<'a>,
    current: Option<TokenElements>,
}

impl<'a> Iterator for Elements<'a> {
    type Item = Result<Element, Unencodable>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(element) = self.current.as_mut().and_then(Iterator::next) {
                return Some(Ok(element));
            }
            match self.tokens.next()? {
                Ok(token) => self.current = Some(token.elements()),
                Err(e) => {
                    self.current = None;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Keying timeline of `text`.
pub fn elements(text: &str) -> Elements<'_> {
    Elements {
        tokens: encode(text),
        current: None,
    }
}

/// Total length of `text` in units.
pub fn units(text: &str) -> Result<u32, Unencodable> {
    elements(text).map(|e| e.map(Element::units)).sum()
}

/// Unit-based durations
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Timing {
    pub unit: Duration,
}

impl Timing {
    pub const fn new(unit: Duration) -> Self {
        Timing { unit }
    }

    pub fn duration(&self, units: u32) -> Duration {
        self.unit * units
    }
}

impl From<&Calibration> for Timing {
    fn from(calibration: &Calibration) -> Self {
        Timing::new(calibration.morse_unit)
    }
}

/// How a mark looks on the matrix
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Representation {
    /// Two centre columns
    Dot,
    /// Full rows
    Bar,
}

impl Representation {
    pub const fn pattern(self) -> u8 {
        match self {
            Representation::Dot => 0x18,
            Representation::Bar => 0xff,
        }
    }
}

/// Output that shows marks
pub trait Indicator {
    type Error;

    /// Switch on for `symbol`.
    fn show(&mut self, symbol: Symbol) -> Result<(), Error<Self::Error>>;

    /// Switch off.
    fn clear(&mut self) -> Result<(), Error<Self::Error>>;
}

/// Marks drawn on rows of a MAX7219 matrix
pub struct MatrixIndicator<'a, DIN, CLK, LOAD, Timer>
where
    DIN: OutputPin,
    CLK: OutputPin,
    LOAD: OutputPin,
    Timer: CountDown + Periodic,
{
    display: &'a mut Max7219<DIN, CLK, LOAD, Timer>,
    pattern: u8,
    rows: [u8; 2],
}

impl<'a, DIN, CLK, LOAD, Timer, E> MatrixIndicator<'a, DIN, CLK, LOAD, Timer>
where
    DIN: OutputPin<Error = E>,
    CLK: OutputPin<Error = E>,
    LOAD: OutputPin<Error = E>,
    Timer: CountDown + Periodic,
    Timer::Time: From<Duration>,
{
    pub fn new(display: &'a mut Max7219<DIN, CLK, LOAD, Timer>, config: &MorseConfig) -> Self {
        MatrixIndicator {
            display,
            pattern: config.representation.pattern(),
            rows: config.rows,
        }
    }

    fn paint(&mut self, pattern: u8) -> Result<(), Error<E>> {
        for row in self.rows {
            self.display.set_row(row, pattern)?;
        }
        Ok(())
    }
}

impl<'a, DIN, CLK, LOAD, Timer, E> Indicator for MatrixIndicator<'a, DIN, CLK, LOAD, Timer>
where
    DIN: OutputPin<Error = E>,
    CLK: OutputPin<Error = E>,
    LOAD: OutputPin<Error = E>,
    Timer: CountDown + Periodic,
    Timer::Time: From<Duration>,
{
    type Error = E;

    fn show(&mut self, _symbol: Symbol) -> Result<(), Error<E>> {
        self.paint(self.pattern)
    }

    fn clear(&mut self) -> Result<(), Error<E>> {
        self.paint(0x00)
    }
}

/// Marks keyed on a single output (LED, buzzer)
pub struct PinIndicator<P> {
    pin: P,
}

impl<P, E> PinIndicator<P>
where
    P: OutputPin<Error = E>,
{
    pub fn new(pin: P) -> Self {
        PinIndicator { pin }
    }

    pub fn free(self) -> P {
        self.pin
    }
}

impl<P, E> Indicator for PinIndicator<P>
where
    P: OutputPin<Error = E>,
{
    type Error = E;

    fn show(&mut self, _symbol: Symbol) -> Result<(), Error<E>> {
        self.pin.set_high().map_err(Error::Bus)
    }

    fn clear(&mut self) -> Result<(), Error<E>> {
        self.pin.set_low().map_err(Error::Bus)
    }
}

/// Outcome of one transmission
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Report {
    /// Non-space characters keyed
    pub characters: u32,
    /// Elapsed units, marks and gaps
    pub units: u32,
    /// Stopped early by the cancel token
    pub cancelled: bool,
}

/// Plays text on an [`Indicator`]
pub struct Transmitter<I, D>
where
    I: Indicator,
    D: DelayMs<u32>,
{
    indicator: I,
    delay: D,
    timing: Timing,
}

impl<I, D> Transmitter<I, D>
where
    I: Indicator,
    D: DelayMs<u32>,
{
    pub fn new(indicator: I, delay: D, timing: Timing) -> Self {
        Transmitter {
            indicator,
            delay,
            timing,
        }
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// Key one line of text.
    ///
    /// Line terminators at the end are ignored. `cancel` is checked before
    /// each character; a character that has started is always finished.
    /// An unencodable character aborts the rest of the line with
    /// [`Error::UnencodableCharacter`] before anything is shown for it.
    pub fn transmit(&mut self, text: &str, cancel: &CancelToken) -> Result<Report, Error<I::Error>> {
        let text = text.trim_end_matches(|c: char| c == '\n' || c == '\r');
        let mut report = Report::default();

        for token in encode(text) {
            if cancel.is_cancelled() {
                log::debug!("morse: cancelled after {} characters", report.characters);
                report.cancelled = true;
                break;
            }

            let token = token.map_err(|Unencodable(ch)| {
                log::warn!("morse: no code for {:?}, line aborted", ch);
                Error::UnencodableCharacter(ch)
            })?;

            if let Token::Letter { ch, code, .. } = token {
                log::debug!("morse: {:?} {}", ch, code.as_str());
                report.characters += 1;
            }

            for element in token.elements() {
                self.key(element)?;
                report.units += element.units();
            }
        }

        Ok(report)
    }

    fn key(&mut self, element: Element) -> Result<(), Error<I::Error>> {
        log::debug!("{}", element.keying());
        match element {
            Element::Mark(symbol) => {
                self.indicator.show(symbol)?;
                self.wait(symbol.units());
                self.indicator.clear()
            }
            Element::Gap(gap) => {
                self.wait(gap.units());
                Ok(())
            }
        }
    }

    #[inline]
    fn wait(&mut self, units: u32) {
        pause(&mut self.delay, self.timing.duration(units));
    }

    pub fn release(self) -> (I, D) {
        (self.indicator, self.delay)
    }
}
