//! Flash map error types and methods

use crate::drivers::stm32g4::flash::ProgramFlag;
use ufmt::{uWrite, uwrite, uwriteln};

/// Value returned through the C interface on any failure. Callers only
/// branch on the sign, detail is only available through logs.
pub const FAILURE: i32 = -1;

/// Top level error type for the flash map. Every variant is returned
/// to the caller as is, nothing is retried at this level.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// No area with the requested id exists in the partition table
    NotFound,
    /// The area lives on a flash device other than the MCU internal flash
    UnsupportedDevice,
    /// Offset plus length runs past the end of the area
    OutOfBounds,
    /// Erase offset or length isn't a whole number of sectors
    AlignmentError,
    /// The flash controller raised an error flag during the operation
    ProgramError(ProgramFlag),
    /// Slot index (or area id) doesn't correspond to an image slot
    InvalidSlot,
    /// The flash controller didn't leave its busy state in time
    BusyTimeout,
}

/// Conversion of results into the C return convention.
pub trait ReturnCode {
    fn return_code(self) -> i32;
}

impl ReturnCode for Result<(), Error> {
    fn return_code(self) -> i32 {
        match self {
            Ok(()) => 0,
            Err(_) => FAILURE,
        }
    }
}

impl Error {
    /// Reports error via abstract serial device
    pub fn report<W: uWrite>(&self, serial: &mut W) -> Result<(), W::Error> {
        match self {
            Error::NotFound => uwriteln!(serial, "[Flash Map Error] -> Area not found"),
            Error::UnsupportedDevice => {
                uwriteln!(serial, "[Flash Map Error] -> Area is not on the internal flash")
            }
            Error::OutOfBounds => uwriteln!(serial, "[Flash Map Error] -> Access out of bounds"),
            Error::AlignmentError => {
                uwriteln!(serial, "[Flash Map Error] -> Erase not aligned to sectors")
            }
            Error::ProgramError(flag) => {
                uwrite!(serial, "[Driver Error] -> Flash controller flagged ")?;
                uwriteln!(serial, "{}", flag.name())
            }
            Error::InvalidSlot => uwriteln!(serial, "[Flash Map Error] -> Invalid image slot"),
            Error::BusyTimeout => {
                uwriteln!(serial, "[Driver Error] -> Timed out waiting for flash controller")
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use core::convert::Infallible;

    #[derive(Default)]
    struct FakeSerial {
        text: String,
    }

    impl uWrite for FakeSerial {
        type Error = Infallible;
        fn write_str(&mut self, s: &str) -> Result<(), Infallible> {
            self.text.push_str(s);
            Ok(())
        }
    }

    #[test]
    fn results_collapse_to_c_return_codes() {
        let success: Result<(), Error> = Ok(());
        let not_found: Result<(), Error> = Err(Error::NotFound);
        let protected: Result<(), Error> = Err(Error::ProgramError(ProgramFlag::WriteProtection));

        assert_eq!(success.return_code(), 0);
        assert_eq!(not_found.return_code(), FAILURE);
        assert_eq!(protected.return_code(), FAILURE);
        assert!(FAILURE < 0);
    }

    #[test]
    fn reports_name_the_failing_flag() {
        // Given
        let mut serial = FakeSerial::default();

        // When
        Error::ProgramError(ProgramFlag::ProgrammingSequence).report(&mut serial).unwrap();
        Error::OutOfBounds.report(&mut serial).unwrap();

        // Then
        assert_eq!(
            serial.text,
            "[Driver Error] -> Flash controller flagged PGSERR\n\
             [Flash Map Error] -> Access out of bounds\n"
        );
    }
}
