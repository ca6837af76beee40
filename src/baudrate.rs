//! Baud rate divisor encoding for the FT232R/FT245R (BM-type) clock
//! generator.
//!
//! The chip divides a 48 MHz clock by 16 and then by a divisor with
//! eighth-step sub-integer resolution. The sub-integer part is encoded
//! through a fraction-code table in bits 14-16 of the divisor word;
//! divisors 0, 1 and 2 are reserved encodings for 3 MBaud, 2 MBaud and
//! 1.5 MBaud. In bit-bang mode the pin clock runs at 4x the configured
//! baud rate.

/// Core clock feeding the baud generator.
const BASE_CLOCK: u32 = 48_000_000;

/// Fraction codes for the eighth sub-divisor, indexed by `divisor & 7`.
const FRAC_CODE: [u32; 8] = [0, 3, 2, 4, 1, 5, 6, 7];

/// An encoded divisor ready for the SET_BAUDRATE control request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaudSetting {
    /// wValue of the control transfer.
    pub value: u16,
    /// wIndex of the control transfer (bit 16 of the encoded divisor on
    /// this chip family).
    pub index: u16,
    /// The baud rate the divisor actually produces.
    pub actual: u32,
}

/// Encodes `baud_rate` into the closest divisor the BM-type generator
/// supports. Returns `None` for a zero rate. Callers are expected to
/// reject results whose `actual` deviates too far from the request.
pub fn encode(baud_rate: u32) -> Option<BaudSetting> {
    if baud_rate == 0 {
        return None;
    }

    // Reserved encodings for the top rates.
    let (encoded, actual): (u32, u32) = if baud_rate >= BASE_CLOCK / 16 {
        (0, BASE_CLOCK / 16)
    } else if baud_rate >= BASE_CLOCK / 24 {
        (1, BASE_CLOCK / 24)
    } else if baud_rate >= BASE_CLOCK / 32 {
        (2, BASE_CLOCK / 32)
    } else {
        // Divisor in sixteenths, rounded to the nearest eighth.
        let divisor16 = BASE_CLOCK / baud_rate;
        let mut divisor8 = if divisor16 & 1 != 0 {
            divisor16 / 2 + 1
        } else {
            divisor16 / 2
        };
        if divisor8 > 0x20000 {
            divisor8 = 0x1FFFF;
        }

        let raw = BASE_CLOCK / divisor8;
        let actual = if raw & 1 != 0 { raw / 2 + 1 } else { raw / 2 };

        let encoded = (divisor8 >> 3) | (FRAC_CODE[(divisor8 & 7) as usize] << 14);
        (encoded, actual)
    };

    Some(BaudSetting {
        value: (encoded & 0xFFFF) as u16,
        index: (encoded >> 16) as u16,
        actual,
    })
}

/// Whether `actual` is within the ~5% tolerance the chip family is
/// specified for, relative to `requested`.
pub fn within_tolerance(requested: u32, actual: u32) -> bool {
    if (actual as u64) * 2 < requested as u64 {
        return false;
    }
    if actual < requested {
        (actual as u64) * 21 >= (requested as u64) * 20
    } else {
        (requested as u64) * 21 >= (actual as u64) * 20
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_default_board_rate() {
        // 9600 baud: divisor 312.5 -> frac code 1 in bits 14-15
        let s = encode(9600).unwrap();
        assert_eq!(s.value, 0x4138);
        assert_eq!(s.index, 0);
        assert_eq!(s.actual, 9600);
    }

    #[test]
    fn encodes_common_serial_rate() {
        let s = encode(115_200).unwrap();
        assert_eq!(s.value, 0x001A);
        assert_eq!(s.index, 0);
        assert_eq!(s.actual, 115_385);
        assert!(within_tolerance(115_200, s.actual));
    }

    #[test]
    fn reserved_top_rate_encodings() {
        assert_eq!(
            encode(3_000_000).unwrap(),
            BaudSetting { value: 0, index: 0, actual: 3_000_000 }
        );
        assert_eq!(
            encode(2_000_000).unwrap(),
            BaudSetting { value: 1, index: 0, actual: 2_000_000 }
        );
        assert_eq!(
            encode(1_500_000).unwrap(),
            BaudSetting { value: 2, index: 0, actual: 1_500_000 }
        );
        // Anything between the reserved points snaps down
        assert_eq!(encode(2_500_000).unwrap().actual, 2_000_000);
    }

    #[test]
    fn fraction_overflow_lands_in_index() {
        // divisor 2.75 -> frac code 6 sets bit 16 of the encoded word
        let s = encode(1_090_909).unwrap();
        assert_eq!(s.value, 0x8002);
        assert_eq!(s.index, 1);
        assert_eq!(s.actual, 1_090_909);
    }

    #[test]
    fn slow_rate_exact() {
        let s = encode(300).unwrap();
        assert_eq!(s.value, 0x2710);
        assert_eq!(s.index, 0);
        assert_eq!(s.actual, 300);
    }

    #[test]
    fn zero_rate_rejected() {
        assert!(encode(0).is_none());
    }

    #[test]
    fn unreachable_rate_out_of_tolerance() {
        // Divisor caps at 0x1FFFF; 1 baud is not even close
        let s = encode(1).unwrap();
        assert!(!within_tolerance(1, s.actual));
    }

    #[test]
    fn tolerance_bounds() {
        assert!(within_tolerance(9600, 9600));
        assert!(within_tolerance(10000, 9600)); // -4%
        assert!(!within_tolerance(10600, 9600)); // under by >5%
        assert!(!within_tolerance(9600, 10200)); // over by >5%
    }
}
