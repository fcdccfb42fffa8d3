use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use rust_decimal::Decimal;

/// An exact decimal number of any precision.
///
/// The digits are kept as text, so values wider than any native decimal type survive a
/// dump and reload unchanged. The scale is the number of fraction digits as written,
/// which makes `1.50` and `1.5` different values that compare as equal in order.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Numeric {
    Finite {
        negative: bool,
        /// No leading zeros, `"0"` for values below one.
        integer: String,
        fraction: String,
    },
    PositiveInfinity,
    NegativeInfinity,
    NaN,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ParseNumericError(String);

impl Display for ParseNumericError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "`{}` is not a decimal number", self.0)
    }
}

impl std::error::Error for ParseNumericError {}

impl Numeric {
    pub fn zero() -> Self {
        Numeric::Finite {
            negative: false,
            integer: "0".to_string(),
            fraction: String::new(),
        }
    }

    pub(crate) fn from_parts(negative: bool, integer: &str, fraction: &str) -> Self {
        let integer = match integer.trim_start_matches('0') {
            "" => "0",
            digits => digits,
        };
        let is_zero = integer == "0" && fraction.bytes().all(|b| b == b'0');

        Numeric::Finite {
            negative: negative && !is_zero,
            integer: integer.to_string(),
            fraction: fraction.to_string(),
        }
    }

    /// Number of fraction digits.
    pub fn scale(&self) -> usize {
        match self {
            Numeric::Finite { fraction, .. } => fraction.len(),
            _ => 0,
        }
    }

    pub fn is_finite(&self) -> bool {
        matches!(self, Numeric::Finite { .. })
    }

    /// The value as an integer, when it has no fraction and fits.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Numeric::Finite { negative, integer, fraction } if fraction.bytes().all(|b| b == b'0') => {
                let magnitude = integer.parse::<i128>().ok()?;
                i64::try_from(if *negative { -magnitude } else { magnitude }).ok()
            }
            _ => None,
        }
    }

    pub fn to_f64(&self) -> f64 {
        match self {
            Numeric::PositiveInfinity => f64::INFINITY,
            Numeric::NegativeInfinity => f64::NEG_INFINITY,
            Numeric::NaN => f64::NAN,
            finite => finite.to_string().parse().unwrap_or(f64::NAN),
        }
    }

    pub fn from_f64(value: f64) -> Self {
        if value.is_nan() {
            Numeric::NaN
        } else if value.is_infinite() {
            if value > 0.0 {
                Numeric::PositiveInfinity
            } else {
                Numeric::NegativeInfinity
            }
        } else {
            // Display of a finite f64 is always plain positional notation.
            value.to_string().parse().unwrap_or_else(|_| Numeric::zero())
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Numeric::NegativeInfinity => 0,
            Numeric::Finite { .. } => 1,
            Numeric::PositiveInfinity => 2,
            Numeric::NaN => 3,
        }
    }
}

fn compare_magnitude(a_int: &str, a_frac: &str, b_int: &str, b_frac: &str) -> Ordering {
    a_int
        .len()
        .cmp(&b_int.len())
        .then_with(|| a_int.cmp(b_int))
        .then_with(|| {
            let width = a_frac.len().max(b_frac.len());
            format!("{:0<width$}", a_frac).cmp(&format!("{:0<width$}", b_frac))
        })
}

impl Ord for Numeric {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (
                Numeric::Finite { negative: a_neg, integer: a_int, fraction: a_frac },
                Numeric::Finite { negative: b_neg, integer: b_int, fraction: b_frac },
            ) => {
                let by_value = match (*a_neg, *b_neg) {
                    (false, true) => Ordering::Greater,
                    (true, false) => Ordering::Less,
                    (false, false) => compare_magnitude(a_int, a_frac, b_int, b_frac),
                    (true, true) => compare_magnitude(b_int, b_frac, a_int, a_frac),
                };
                by_value.then_with(|| a_frac.len().cmp(&b_frac.len()))
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Numeric {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Numeric {
    type Err = ParseNumericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "nan" => return Ok(Numeric::NaN),
            "infinity" | "+infinity" | "inf" | "+inf" => return Ok(Numeric::PositiveInfinity),
            "-infinity" | "-inf" => return Ok(Numeric::NegativeInfinity),
            _ => {}
        }

        let (negative, unsigned) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        let (integer, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));

        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if integer.len() + fraction.len() == 0 || !all_digits(integer) || !all_digits(fraction) {
            return Err(ParseNumericError(s.to_string()));
        }

        Ok(Numeric::from_parts(negative, integer, fraction))
    }
}

impl Display for Numeric {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Numeric::Finite { negative, integer, fraction } => {
                if *negative {
                    f.write_str("-")?;
                }
                f.write_str(integer)?;
                if !fraction.is_empty() {
                    write!(f, ".{}", fraction)?;
                }
                Ok(())
            }
            Numeric::PositiveInfinity => f.write_str("Infinity"),
            Numeric::NegativeInfinity => f.write_str("-Infinity"),
            Numeric::NaN => f.write_str("NaN"),
        }
    }
}

impl From<i64> for Numeric {
    fn from(value: i64) -> Self {
        Numeric::from_parts(value < 0, &value.unsigned_abs().to_string(), "")
    }
}

impl From<Decimal> for Numeric {
    fn from(value: Decimal) -> Self {
        let s = value.to_string();
        s.parse().unwrap_or_else(|_| Numeric::zero())
    }
}

impl TryFrom<&Numeric> for Decimal {
    type Error = rust_decimal::Error;

    fn try_from(value: &Numeric) -> Result<Self, Self::Error> {
        Decimal::from_str_exact(&value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(s: &str) -> Numeric {
        s.parse().unwrap()
    }

    #[test]
    fn keeps_every_digit_of_wide_values() {
        let wide = "12345678901234567890123456789012345678";
        assert_eq!(n(wide).to_string(), wide);
        assert_eq!(n("-0.00000000000000000000000000000000000001").to_string(), "-0.00000000000000000000000000000000000001");
        assert_eq!(n("1.50").scale(), 2);
    }

    #[test]
    fn normalizes_leading_zeros_and_negative_zero() {
        assert_eq!(n("007.10").to_string(), "7.10");
        assert_eq!(n("-0.000"), n("0.000"));
        assert_eq!(n(".5").to_string(), "0.5");
        assert_eq!(n("+3").to_string(), "3");
    }

    #[test]
    fn rejects_garbage() {
        assert!("".parse::<Numeric>().is_err());
        assert!("1.2.3".parse::<Numeric>().is_err());
        assert!("12a".parse::<Numeric>().is_err());
        assert!("-".parse::<Numeric>().is_err());
    }

    #[test]
    fn parses_special_values() {
        assert_eq!(n("NaN"), Numeric::NaN);
        assert_eq!(n("-Infinity"), Numeric::NegativeInfinity);
        assert_eq!(Numeric::PositiveInfinity.to_string(), "Infinity");
    }

    #[test]
    fn orders_by_value() {
        let mut values = vec![n("10"), n("-2.5"), Numeric::NaN, n("9.99"), n("-10"), Numeric::NegativeInfinity, n("0.001")];
        values.sort();
        assert_eq!(
            values.iter().map(|v| v.to_string()).collect::<Vec<_>>(),
            vec!["-Infinity", "-10", "-2.5", "0.001", "9.99", "10", "NaN"]
        );
        assert_eq!(n("1.5").cmp(&n("1.50")), Ordering::Less);
    }

    #[test]
    fn converts_to_native_numbers() {
        assert_eq!(n("-42.000").to_i64(), Some(-42));
        assert_eq!(n("42.5").to_i64(), None);
        assert_eq!(n("99999999999999999999").to_i64(), None);
        assert_eq!(n("2.25").to_f64(), 2.25);
        assert_eq!(Numeric::from_f64(-0.125), n("-0.125"));
        assert_eq!(Numeric::from(i64::MIN).to_string(), i64::MIN.to_string());
        assert_eq!(Decimal::try_from(&n("1.25")).unwrap(), Decimal::new(125, 2));
        assert!(Decimal::try_from(&n("12345678901234567890123456789012345678")).is_err());
    }
}
