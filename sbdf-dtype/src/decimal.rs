use std::fmt::{Display, Formatter};
use std::str::FromStr;

use sbdf_error::{SbdfError, SbdfResult, sbdf_bail, sbdf_err};

/// The bias added to a decimal exponent before it is stored.
pub const DECIMAL_EXPONENT_BIAS: i32 = 6176;

/// The largest coefficient that fits the 96 coefficient bits of the wire layout.
pub const DECIMAL_MAX_COEFFICIENT: u128 = (1u128 << 96) - 1;

/// The smallest exponent representable by the 14-bit biased exponent field.
pub const DECIMAL_MIN_EXPONENT: i32 = -DECIMAL_EXPONENT_BIAS;

/// The largest exponent representable by the 14-bit biased exponent field.
pub const DECIMAL_MAX_EXPONENT: i32 = 0x3FFF - DECIMAL_EXPONENT_BIAS;

/// The size of a decimal on the wire.
pub const DECIMAL_WIDTH: usize = 16;

const COEFFICIENT_BYTES: usize = 12;
const SIGN_MASK: u16 = 0x8000;
const EXPONENT_MASK: u16 = 0x3FFF;

/// A decimal number `(-1)^sign * coefficient * 10^exponent`.
///
/// On the wire a decimal occupies 16 bytes, laid out like an IEEE-754-2008 decimal128 in binary
/// integer decimal form, restricted to coefficients that fit in 96 bits:
///
/// ```text
/// bytes 0..12   coefficient, unsigned little-endian
/// bytes 12..14  reserved, zero
/// bytes 14..16  u16 little-endian: bit 15 sign, bits 1..=14 exponent + 6176
/// ```
///
/// Equality is representational: `1.0` and `1.00` differ in exponent and are not equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Decimal {
    coefficient: u128,
    exponent: i16,
    negative: bool,
}

impl Decimal {
    /// Zero, with exponent zero.
    pub const ZERO: Decimal = Decimal {
        coefficient: 0,
        exponent: 0,
        negative: false,
    };

    /// Checked constructor.
    pub fn try_new(coefficient: u128, exponent: i32, negative: bool) -> SbdfResult<Self> {
        if coefficient > DECIMAL_MAX_COEFFICIENT {
            sbdf_bail!(
                "decimal coefficient {} does not fit in 96 bits",
                coefficient
            );
        }
        if !(DECIMAL_MIN_EXPONENT..=DECIMAL_MAX_EXPONENT).contains(&exponent) {
            sbdf_bail!(
                "decimal exponent {} is outside [{}, {}]",
                exponent,
                DECIMAL_MIN_EXPONENT,
                DECIMAL_MAX_EXPONENT
            );
        }
        let exponent = i16::try_from(exponent)
            .map_err(|_| sbdf_err!("decimal exponent {} does not fit in i16", exponent))?;
        Ok(Self {
            coefficient,
            exponent,
            negative,
        })
    }

    /// The unsigned coefficient.
    pub fn coefficient(&self) -> u128 {
        self.coefficient
    }

    /// The power of ten the coefficient is scaled by.
    pub fn exponent(&self) -> i32 {
        i32::from(self.exponent)
    }

    /// Whether the sign bit is set.
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// Encode into the 16-byte wire layout.
    pub fn to_le_bytes(&self) -> [u8; DECIMAL_WIDTH] {
        let mut bytes = [0u8; DECIMAL_WIDTH];
        bytes[..COEFFICIENT_BYTES]
            .copy_from_slice(&self.coefficient.to_le_bytes()[..COEFFICIENT_BYTES]);

        let biased = i32::from(self.exponent) + DECIMAL_EXPONENT_BIAS;
        // try_new keeps the biased exponent within 14 bits
        let mut top = (u16::try_from(biased).unwrap_or_default() & EXPONENT_MASK) << 1;
        if self.negative {
            top |= SIGN_MASK;
        }
        bytes[14..].copy_from_slice(&top.to_le_bytes());
        bytes
    }

    /// Decode from the 16-byte wire layout. Reserved bits are ignored.
    pub fn from_le_bytes(bytes: [u8; DECIMAL_WIDTH]) -> Self {
        let mut coefficient = [0u8; 16];
        coefficient[..COEFFICIENT_BYTES].copy_from_slice(&bytes[..COEFFICIENT_BYTES]);
        let top = u16::from_le_bytes([bytes[14], bytes[15]]);
        let biased = i32::from((top >> 1) & EXPONENT_MASK);
        Self {
            coefficient: u128::from_le_bytes(coefficient),
            // 14 bits minus the bias always fits an i16
            exponent: i16::try_from(biased - DECIMAL_EXPONENT_BIAS).unwrap_or_default(),
            negative: top & SIGN_MASK != 0,
        }
    }

    /// The closest `f64` to this decimal.
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64(&self) -> f64 {
        let magnitude = self.coefficient as f64 * 10f64.powi(self.exponent());
        if self.negative { -magnitude } else { magnitude }
    }
}

impl FromStr for Decimal {
    type Err = SbdfError;

    /// Parses plain (`-101.45`) and scientific (`1.2e-3`) notation.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (negative, unsigned) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        let (mantissa, exp) = match unsigned.find(['e', 'E']) {
            Some(idx) => {
                let exp = unsigned[idx + 1..]
                    .parse::<i32>()
                    .map_err(|e| sbdf_err!("invalid decimal exponent in {}: {}", s, e))?;
                (&unsigned[..idx], exp)
            }
            None => (unsigned, 0),
        };
        let (integral, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if integral.is_empty() && fraction.is_empty() {
            sbdf_bail!("invalid decimal {}", s);
        }

        let mut coefficient = 0u128;
        for ch in integral.chars().chain(fraction.chars()) {
            let digit = ch
                .to_digit(10)
                .ok_or_else(|| sbdf_err!("invalid digit {} in decimal {}", ch, s))?;
            coefficient = coefficient
                .checked_mul(10)
                .and_then(|c| c.checked_add(u128::from(digit)))
                .ok_or_else(|| sbdf_err!("decimal {} has too many digits", s))?;
        }

        let fraction_digits = i32::try_from(fraction.len())
            .map_err(|_| sbdf_err!("decimal {} has too many digits", s))?;
        let exponent = exp
            .checked_sub(fraction_digits)
            .ok_or_else(|| sbdf_err!("decimal exponent of {} is out of range", s))?;
        Decimal::try_new(coefficient, exponent, negative)
    }
}

impl Display for Decimal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let digits = self.coefficient.to_string();
        if self.negative {
            f.write_str("-")?;
        }
        let exponent = self.exponent();
        if exponent >= 0 {
            f.write_str(&digits)?;
            for _ in 0..exponent {
                f.write_str("0")?;
            }
            return Ok(());
        }

        let scale = exponent.unsigned_abs() as usize;
        if digits.len() > scale {
            let (int, frac) = digits.split_at(digits.len() - scale);
            write!(f, "{}.{}", int, frac)
        } else {
            write!(f, "0.{}{}", "0".repeat(scale - digits.len()), digits)
        }
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;
    use sbdf_error::ErrorKind;

    use super::*;

    #[test]
    fn parse_and_layout() {
        let decimal: Decimal = "101.45".parse().unwrap();
        assert_eq!(decimal.coefficient(), 10145);
        assert_eq!(decimal.exponent(), -2);
        assert!(!decimal.is_negative());

        let bytes = decimal.to_le_bytes();
        assert_eq!(&bytes[..2], &10145u16.to_le_bytes());
        assert_eq!(&bytes[2..14], &[0u8; 12]);
        // (6176 - 2) << 1 == 0x303C
        assert_eq!(&bytes[14..], &[0x3C, 0x30]);

        let decoded = Decimal::from_le_bytes(bytes);
        assert_eq!(decoded, decimal);
        assert_eq!(decoded.to_string(), "101.45");
    }

    #[rstest]
    #[case("0", "0")]
    #[case("-0.005", "-0.005")]
    #[case("12e3", "12000")]
    #[case("1.5E-2", "0.015")]
    #[case("+7.10", "7.10")]
    #[case("79228162514264337593543950335", "79228162514264337593543950335")]
    fn round_trips(#[case] input: &str, #[case] display: &str) {
        let decimal: Decimal = input.parse().unwrap();
        let decoded = Decimal::from_le_bytes(decimal.to_le_bytes());
        assert_eq!(decoded, decimal);
        assert_eq!(decoded.to_string(), display);
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("1.2.3")]
    #[case("12a")]
    #[case("79228162514264337593543950336")]
    #[case("0.5e-2147483648")]
    #[case("1e2147483647")]
    fn rejects(#[case] input: &str) {
        assert_eq!(
            input.parse::<Decimal>().unwrap_err().kind(),
            ErrorKind::ArgumentInvalid
        );
    }

    #[test]
    fn exponent_bounds() {
        assert!(Decimal::try_new(1, DECIMAL_MIN_EXPONENT, true).is_ok());
        assert!(Decimal::try_new(1, DECIMAL_MAX_EXPONENT, false).is_ok());
        assert!(Decimal::try_new(1, DECIMAL_MIN_EXPONENT - 1, false).is_err());
        assert!(Decimal::try_new(1, DECIMAL_MAX_EXPONENT + 1, false).is_err());

        let extreme = Decimal::try_new(DECIMAL_MAX_COEFFICIENT, DECIMAL_MIN_EXPONENT, true).unwrap();
        assert_eq!(Decimal::from_le_bytes(extreme.to_le_bytes()), extreme);
    }

    #[test]
    fn negative_sign_bit() {
        let decimal: Decimal = "-1".parse().unwrap();
        assert_eq!(decimal.to_le_bytes()[15] & 0x80, 0x80);
        assert_eq!(decimal.to_f64(), -1.0);
    }
}
