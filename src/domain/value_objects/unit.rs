use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// A unit tag from the closed set the system understands. Every stored
/// quantity carries one; comparisons and arithmetic never cross units
/// without going through [`Unit::convert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    None,
    B,
    KiB,
    MiB,
    GiB,
    TiB,
    PiB,
    EiB,
    Unspecified,
}

/// The base a unit is measured in, and its multiple relative to that base.
/// Two units are convertible only when their bases match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Base {
    base: &'static str,
    multiple: u128,
}

impl Unit {
    fn base(self) -> Base {
        match self {
            Unit::None => Base { base: "none", multiple: 1 },
            Unit::Unspecified => Base { base: "unspecified", multiple: 1 },
            Unit::B => Base { base: "B", multiple: 1 },
            Unit::KiB => Base { base: "B", multiple: 1 << 10 },
            Unit::MiB => Base { base: "B", multiple: 1 << 20 },
            Unit::GiB => Base { base: "B", multiple: 1 << 30 },
            Unit::TiB => Base { base: "B", multiple: 1u128 << 40 },
            Unit::PiB => Base { base: "B", multiple: 1u128 << 50 },
            Unit::EiB => Base { base: "B", multiple: 1u128 << 60 },
        }
    }

    /// Converts `value` (expressed in `self`) into `dst`. Returns
    /// `UnitIncompatible` when the two units have different bases, and
    /// `UnitFractional` when the conversion would lose precision.
    pub fn convert(self, value: u64, dst: Unit) -> Result<u64> {
        let src_base = self.base();
        let dst_base = dst.base();
        if src_base.base != dst_base.base {
            return Err(Error::UnitIncompatible {
                src: self.to_string(),
                dst: dst.to_string(),
            });
        }
        let base_value = (value as u128) * src_base.multiple;
        if base_value % dst_base.multiple != 0 {
            return Err(Error::UnitFractional {
                src: self.to_string(),
                dst: dst.to_string(),
            });
        }
        let converted = base_value / dst_base.multiple;
        u64::try_from(converted).map_err(|_| Error::UnitFractional {
            src: self.to_string(),
            dst: dst.to_string(),
        })
    }

    /// Parses a textual value in the given unit: `"<integer>"` for
    /// `Unit::None`, `"<integer> <unit>"` otherwise. The parsed value is
    /// converted into `self` before being returned, so callers always get
    /// back a value already expressed in their target unit.
    pub fn parse(self, input: &str) -> Result<u64> {
        let input = input.trim();
        if matches!(self, Unit::None | Unit::Unspecified) {
            return input
                .parse::<u64>()
                .map_err(|_| Error::ConstraintSyntax(format!("not a decimal integer: {input:?}")));
        }
        let mut parts = input.splitn(2, char::is_whitespace);
        let number = parts
            .next()
            .ok_or_else(|| Error::ConstraintSyntax(format!("empty value: {input:?}")))?;
        let unit_str = parts
            .next()
            .ok_or_else(|| Error::ConstraintSyntax(format!("missing unit in {input:?}")))?
            .trim();
        let n: u64 = number
            .parse()
            .map_err(|_| Error::ConstraintSyntax(format!("not a number: {number:?}")))?;
        let src_unit = Unit::from_str(unit_str)
            .ok_or_else(|| Error::ConstraintSyntax(format!("unknown unit: {unit_str:?}")))?;
        src_unit.convert(n, self)
    }

    /// Formats a value in this unit for error messages only; never a
    /// stable machine-readable contract.
    pub fn format(self, value: u64) -> String {
        if matches!(self, Unit::None | Unit::Unspecified) {
            value.to_string()
        } else {
            format!("{value} {self}")
        }
    }

    fn from_str(s: &str) -> Option<Unit> {
        match s {
            "B" => Some(Unit::B),
            "KiB" => Some(Unit::KiB),
            "MiB" => Some(Unit::MiB),
            "GiB" => Some(Unit::GiB),
            "TiB" => Some(Unit::TiB),
            "PiB" => Some(Unit::PiB),
            "EiB" => Some(Unit::EiB),
            _ => None,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Unit::None => "none",
            Unit::B => "B",
            Unit::KiB => "KiB",
            Unit::MiB => "MiB",
            Unit::GiB => "GiB",
            Unit::TiB => "TiB",
            Unit::PiB => "PiB",
            Unit::EiB => "EiB",
            Unit::Unspecified => "unspecified",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_through_base() {
        for (unit, mult) in [
            (Unit::KiB, 1u64 << 10),
            (Unit::MiB, 1u64 << 20),
            (Unit::GiB, 1u64 << 30),
        ] {
            let v = 5u64;
            let base_value = v * mult;
            let to_base = unit.convert(v, Unit::B).unwrap();
            assert_eq!(to_base, base_value);
            let back = Unit::B.convert(to_base, unit).unwrap();
            assert_eq!(back, v);
        }
    }

    #[test]
    fn convert_is_exact() {
        assert_eq!(Unit::MiB.convert(5, Unit::B).unwrap(), 5 * (1 << 20));
        assert_eq!(Unit::B.convert(5 * (1 << 20), Unit::MiB).unwrap(), 5);
    }

    #[test]
    fn convert_rejects_fractional() {
        let err = Unit::B.convert(42, Unit::MiB).unwrap_err();
        assert!(matches!(err, Error::UnitFractional { .. }));
    }

    #[test]
    fn convert_rejects_incompatible_bases() {
        let err = Unit::MiB.convert(5, Unit::None).unwrap_err();
        assert!(matches!(err, Error::UnitIncompatible { .. }));
    }

    #[test]
    fn parse_bare_integer_for_none() {
        assert_eq!(Unit::None.parse("42").unwrap(), 42);
    }

    #[test]
    fn parse_measured_value() {
        assert_eq!(Unit::MiB.parse("10 MiB").unwrap(), 10);
        assert_eq!(Unit::B.parse("1 KiB").unwrap(), 1024);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Unit::None.parse("ten").is_err());
        assert!(Unit::MiB.parse("10").is_err());
    }
}
