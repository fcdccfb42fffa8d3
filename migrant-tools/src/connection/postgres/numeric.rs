use std::error::Error;
use std::fmt::Write;
use bytes::{BufMut, BytesMut};
use tokio_postgres::types::{to_sql_checked, FromSql, IsNull, ToSql, Type};
use crate::connection::Numeric;

// NUMERIC binary format: ndigits, weight, sign and dscale as i16, followed by ndigits
// base 10000 digits. The weight is the power of 10000 of the first digit.
const SIGN_POSITIVE: u16 = 0x0000;
const SIGN_NEGATIVE: u16 = 0x4000;
const SIGN_NAN: u16 = 0xC000;
const SIGN_PINF: u16 = 0xD000;
const SIGN_NINF: u16 = 0xF000;

type BoxError = Box<dyn Error + Sync + Send>;

fn read_i16(raw: &[u8], offset: usize) -> Result<i16, BoxError> {
    raw.get(offset..offset + 2)
        .map(|b| i16::from_be_bytes([b[0], b[1]]))
        .ok_or_else(|| "NUMERIC data too short".into())
}

impl<'a> FromSql<'a> for Numeric {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let ndigits = read_i16(raw, 0)?;
        let weight = read_i16(raw, 2)? as i32;
        let sign = read_i16(raw, 4)? as u16;
        let dscale = read_i16(raw, 6)?;

        let negative = match sign {
            SIGN_POSITIVE => false,
            SIGN_NEGATIVE => true,
            SIGN_NAN => return Ok(Numeric::NaN),
            SIGN_PINF => return Ok(Numeric::PositiveInfinity),
            SIGN_NINF => return Ok(Numeric::NegativeInfinity),
            other => return Err(format!("Invalid NUMERIC sign: {other:#x}").into()),
        };
        if ndigits < 0 || dscale < 0 {
            return Err("Invalid NUMERIC header".into());
        }

        let digits = (0..ndigits as usize)
            .map(|i| -> Result<i16, BoxError> {
                let digit = read_i16(raw, 8 + i * 2)?;
                if !(0..10000).contains(&digit) {
                    return Err(format!("Invalid NUMERIC digit: {digit}").into());
                }
                Ok(digit)
            })
            .collect::<Result<Vec<_>, BoxError>>()?;
        let digit = |i: i32| usize::try_from(i).ok().and_then(|i| digits.get(i).copied()).unwrap_or(0);

        let mut integer = String::new();
        for i in 0..=weight {
            if integer.is_empty() {
                if digit(i) != 0 {
                    write!(integer, "{}", digit(i))?;
                }
            } else {
                write!(integer, "{:04}", digit(i))?;
            }
        }

        let scale = dscale as usize;
        let mut fraction = String::with_capacity(scale + 4);
        let mut i = weight + 1;
        while fraction.len() < scale {
            write!(fraction, "{:04}", digit(i))?;
            i += 1;
        }
        fraction.truncate(scale);

        Ok(Numeric::from_parts(negative, &integer, &fraction))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

fn write_header(out: &mut BytesMut, ndigits: i16, weight: i16, sign: u16, dscale: i16) {
    out.put_i16(ndigits);
    out.put_i16(weight);
    out.put_u16(sign);
    out.put_i16(dscale);
}

impl ToSql for Numeric {
    fn to_sql(&self, _ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        let (negative, integer, fraction) = match self {
            Numeric::Finite { negative, integer, fraction } => (*negative, integer, fraction),
            Numeric::NaN => {
                write_header(out, 0, 0, SIGN_NAN, 0);
                return Ok(IsNull::No);
            }
            Numeric::PositiveInfinity => {
                write_header(out, 0, 0, SIGN_PINF, 0);
                return Ok(IsNull::No);
            }
            Numeric::NegativeInfinity => {
                write_header(out, 0, 0, SIGN_NINF, 0);
                return Ok(IsNull::No);
            }
        };

        let int_pad = (4 - integer.len() % 4) % 4;
        let frac_pad = (4 - fraction.len() % 4) % 4;
        let padded = format!("{}{}{}{}", "0".repeat(int_pad), integer, fraction, "0".repeat(frac_pad));

        let mut groups = padded
            .as_bytes()
            .chunks(4)
            .map(|chunk| chunk.iter().fold(0i16, |acc, b| acc * 10 + (b - b'0') as i16))
            .collect::<Vec<_>>();
        let mut weight = ((int_pad + integer.len()) / 4) as i32 - 1;

        let leading = groups.iter().take_while(|g| **g == 0).count();
        groups.drain(..leading);
        weight -= leading as i32;
        while groups.last() == Some(&0) {
            groups.pop();
        }
        if groups.is_empty() {
            weight = 0;
        }

        let ndigits = i16::try_from(groups.len()).map_err(|_| "NUMERIC value has too many digits")?;
        let weight = i16::try_from(weight).map_err(|_| "NUMERIC value out of range")?;
        let dscale = i16::try_from(fraction.len()).map_err(|_| "NUMERIC scale out of range")?;
        let sign = if negative { SIGN_NEGATIVE } else { SIGN_POSITIVE };

        write_header(out, ndigits, weight, sign, dscale);
        for group in groups {
            out.put_i16(group);
        }

        Ok(IsNull::No)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: &str) -> Vec<u8> {
        let mut out = BytesMut::new();
        value.parse::<Numeric>().unwrap().to_sql(&Type::NUMERIC, &mut out).unwrap();
        out.to_vec()
    }

    fn words(words: &[i16]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_be_bytes()).collect()
    }

    #[test]
    fn encodes_base_10000_groups() {
        assert_eq!(encode("12345.678"), words(&[3, 1, 0, 3, 1, 2345, 6780]));
        assert_eq!(encode("-0.0005"), words(&[1, -1, 0x4000, 4, 5]));
        assert_eq!(encode("0"), words(&[0, 0, 0, 0]));
        assert_eq!(encode("10000"), words(&[1, 1, 0, 0, 1]));
    }

    #[test]
    fn wide_values_survive_the_wire_format() {
        for value in [
            "12345678901234567890123456789012345678",
            "-98765432109876543210.123456789012345678",
            "0.00000000000000000000000000000000000001",
            "1.50",
            "0.000",
            "NaN",
            "-Infinity",
        ] {
            let raw = encode(value);
            let back = Numeric::from_sql(&Type::NUMERIC, &raw).unwrap();
            assert_eq!(back.to_string(), value);
        }
    }

    #[test]
    fn rejects_truncated_data() {
        assert!(Numeric::from_sql(&Type::NUMERIC, &[0, 1, 0, 0]).is_err());
        assert!(Numeric::from_sql(&Type::NUMERIC, &words(&[2, 0, 0, 0, 1])).is_err());
    }
}
