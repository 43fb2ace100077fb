//! Displayed timecode value and BCD conversion

use std::fmt;

/// Split a field into its BCD (tens, ones) digits.
///
/// Any hundreds digit is silently truncated (131 → (3, 1)); every field the
/// encoder feeds through here is already in range by construction.
pub(crate) fn to_bcd(number: u8) -> (u8, u8) {
    ((number / 10) % 10, number % 10)
}

/// One displayed hour:minute:second:frame position.
///
/// Drop-frame timecode is conventionally written with a semicolon before the
/// frame field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeCode {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub frame: u8,
    pub drop_frame: bool,
}

impl fmt::Display for TimeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = if self.drop_frame { ';' } else { ':' };
        write!(
            f,
            "{:02}:{:02}:{:02}{}{:02}",
            self.hour, self.minute, self.second, sep, self.frame
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bcd_splits_tens_and_ones() {
        assert_eq!(to_bcd(7), (0, 7));
        assert_eq!(to_bcd(31), (3, 1));
    }

    #[test]
    fn bcd_truncates_excess_digits() {
        assert_eq!(to_bcd(131), (3, 1));
    }

    #[test]
    fn display_uses_colon_separators() {
        let tc = TimeCode { hour: 23, minute: 14, second: 21, frame: 2, drop_frame: false };
        assert_eq!(tc.to_string(), "23:14:21:02");
    }

    #[test]
    fn display_marks_drop_frame_with_semicolon() {
        let tc = TimeCode { hour: 23, minute: 14, second: 21, frame: 2, drop_frame: true };
        assert_eq!(tc.to_string(), "23:14:21;02");
    }
}
