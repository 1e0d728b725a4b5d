use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use tracing::warn;

const PX_PER_INCH: f64 = 96.0;

static UNIT_EXPRESSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+\.?\d*)(px|mm|cm|m|in)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Px,
    Mm,
    Cm,
    M,
    In,
}

impl Unit {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "px" => Some(Self::Px),
            "mm" => Some(Self::Mm),
            "cm" => Some(Self::Cm),
            "m" => Some(Self::M),
            "in" => Some(Self::In),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Px => "px",
            Self::Mm => "mm",
            Self::Cm => "cm",
            Self::M => "m",
            Self::In => "in",
        }
    }

    /// User units (px) per one of this unit.
    pub fn px_factor(&self) -> f64 {
        match self {
            Self::Px => 1.0,
            Self::Mm => PX_PER_INCH / 25.4,
            Self::Cm => PX_PER_INCH / 2.54,
            Self::M => PX_PER_INCH / 0.0254,
            Self::In => PX_PER_INCH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Length {
    pub value: f64,
    pub unit: Unit,
}

impl Length {
    pub fn to_px(&self) -> f64 {
        self.value * self.unit.px_factor()
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.as_str())
    }
}

/// Parses a leading `<number><unit>` expression such as `10mm` or `0.5px`.
/// Trailing text after the unit is ignored.
pub fn parse_unit_expression(text: &str) -> Option<Length> {
    let Some(caps) = UNIT_EXPRESSION_RE.captures(text) else {
        warn!(expression = text, "unit expression did not match <number><unit>");
        return None;
    };
    let value = match caps[1].parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => {
            warn!(expression = text, "could not convert unit number to float");
            return None;
        }
    };
    let unit = Unit::from_token(&caps[2])?;
    Some(Length { value, unit })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_units() {
        assert_eq!(
            parse_unit_expression("10mm"),
            Some(Length {
                value: 10.0,
                unit: Unit::Mm
            })
        );
        assert_eq!(parse_unit_expression("5.5in").map(|l| l.unit), Some(Unit::In));
        assert_eq!(parse_unit_expression("2m").map(|l| l.unit), Some(Unit::M));
        assert_eq!(parse_unit_expression("0.01px").map(|l| l.value), Some(0.01));
        assert_eq!(parse_unit_expression("3.px").map(|l| l.value), Some(3.0));
    }

    #[test]
    fn rejects_malformed_expressions() {
        assert_eq!(parse_unit_expression("0.01"), None);
        assert_eq!(parse_unit_expression("px"), None);
        assert_eq!(parse_unit_expression("-1px"), None);
        assert_eq!(parse_unit_expression(".5mm"), None);
        assert_eq!(parse_unit_expression(""), None);
    }

    #[test]
    fn only_the_leading_expression_counts() {
        assert_eq!(parse_unit_expression("10px-in-border").map(|l| l.to_px()), Some(10.0));
    }

    #[test]
    fn converts_to_user_units() {
        assert_eq!(parse_unit_expression("1in").unwrap().to_px(), 96.0);
        assert!((parse_unit_expression("25.4mm").unwrap().to_px() - 96.0).abs() < 1e-9);
        assert!((parse_unit_expression("2.54cm").unwrap().to_px() - 96.0).abs() < 1e-9);
    }
}
