/// Protocol error
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// GPIO error
    Bus(E),
    /// Invalid input (transfer width or row out of range)
    InvalidData,
    /// Character has no Morse code
    UnencodableCharacter(char),
}
