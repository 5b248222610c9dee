//! Quarter-unit measurement codec.
//!
//! Measurements are stored as decimals but entered and shown as a whole
//! number plus one of `0`, `1/4`, `1/2`, `3/4`. None of these functions fail:
//! dirty operator input degrades to `None` or an empty string.

use serde::{Deserialize, Serialize};

/// Fraction labels offered by the editing selector.
pub const FRACTIONS: [&str; 4] = ["0", "1/4", "1/2", "3/4"];

const EPSILON: f64 = 0.01;

/// A measurement as it arrives from a form: either already numeric or text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawMeasurement {
    Number(f64),
    Text(String),
}

impl RawMeasurement {
    pub fn is_blank(&self) -> bool {
        matches!(self, RawMeasurement::Text(text) if text.trim().is_empty())
    }
}

impl From<f64> for RawMeasurement {
    fn from(value: f64) -> Self {
        RawMeasurement::Number(value)
    }
}

impl From<&str> for RawMeasurement {
    fn from(value: &str) -> Self {
        RawMeasurement::Text(value.to_string())
    }
}

/// Display string for a stored or entered value.
pub fn encode(value: Option<&RawMeasurement>) -> String {
    match value {
        None => String::new(),
        Some(RawMeasurement::Number(number)) => encode_decimal(*number),
        Some(RawMeasurement::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return String::new();
            }
            if text.contains('/') {
                return text.clone();
            }
            match trimmed.parse::<f64>() {
                Ok(number) if number.is_finite() => encode_decimal(number),
                _ => text.clone(),
            }
        }
    }
}

/// `12.25` becomes `"12 1/4"`; remainders off the quarter grid fall back to
/// two decimals.
pub fn encode_decimal(value: f64) -> String {
    let whole = value.floor();
    let remainder = value - whole;

    if remainder < EPSILON {
        return format!("{}", whole as i64);
    }
    for (quarter, label) in [(0.25, "1/4"), (0.5, "1/2"), (0.75, "3/4")] {
        if (remainder - quarter).abs() < EPSILON {
            return format!("{} {}", whole as i64, label);
        }
    }

    format!("{}", (value * 100.0).round() / 100.0)
}

/// Inverse of [`encode`].
pub fn decode(value: Option<&RawMeasurement>) -> Option<f64> {
    match value? {
        RawMeasurement::Number(number) => Some(*number),
        RawMeasurement::Text(text) => decode_str(text),
    }
}

pub fn decode_str(value: &str) -> Option<f64> {
    let tokens: Vec<&str> = value.split_whitespace().collect();
    match tokens.as_slice() {
        [] => None,
        [single] if single.contains('/') => parse_fraction(single),
        [single] => parse_number(single),
        [whole, fraction] => {
            let whole = parse_number(whole)?;
            Some(whole + parse_fraction(fraction).unwrap_or(0.0))
        }
        [first, ..] => parse_number(first),
    }
}

fn parse_number(token: &str) -> Option<f64> {
    token.parse::<f64>().ok().filter(|number| number.is_finite())
}

fn parse_fraction(token: &str) -> Option<f64> {
    let (numerator, denominator) = token.split_once('/')?;
    let numerator = parse_number(numerator)?;
    let denominator = parse_number(denominator)?;
    if denominator == 0.0 {
        return None;
    }
    Some(numerator / denominator)
}

/// The two inputs of the editing widget: a whole-number box and a fraction
/// selector holding one of [`FRACTIONS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FractionalParts {
    pub whole: String,
    pub fraction: String,
}

impl FractionalParts {
    pub fn compose(&self) -> String {
        compose(&self.whole, &self.fraction)
    }
}

pub fn split_for_editing(value: &str) -> FractionalParts {
    let tokens: Vec<&str> = value.split_whitespace().collect();
    let (whole, fraction) = match tokens.as_slice() {
        [] => ("", "0"),
        [whole, fraction] => (*whole, *fraction),
        [single] if FRACTIONS.contains(single) => ("0", *single),
        [first, ..] => (*first, "0"),
    };
    FractionalParts {
        whole: whole.to_string(),
        fraction: fraction.to_string(),
    }
}

pub fn compose(whole: &str, fraction: &str) -> String {
    if fraction == "0" {
        whole.to_string()
    } else {
        format!("{} {}", whole, fraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(value: f64) -> RawMeasurement {
        RawMeasurement::Number(value)
    }

    #[test]
    fn encodes_quarters_without_spurious_fraction() {
        assert_eq!(encode(Some(&num(12.0))), "12");
        assert_eq!(encode(Some(&num(12.25))), "12 1/4");
        assert_eq!(encode(Some(&num(12.5))), "12 1/2");
        assert_eq!(encode(Some(&num(12.75))), "12 3/4");
        assert_eq!(encode(Some(&num(0.5))), "0 1/2");
    }

    #[test]
    fn falls_back_to_two_decimals_off_the_grid() {
        assert_eq!(encode(Some(&num(12.33))), "12.33");
        assert_eq!(encode(Some(&num(12.456))), "12.46");
    }

    #[test]
    fn tolerates_float_noise_near_quarters() {
        assert_eq!(encode(Some(&num(12.004))), "12");
        assert_eq!(encode(Some(&num(12.249))), "12 1/4");
        assert_eq!(encode(Some(&num(12.7501))), "12 3/4");
    }

    #[test]
    fn encode_handles_text_input() {
        assert_eq!(encode(None), "");
        assert_eq!(encode(Some(&"".into())), "");
        assert_eq!(encode(Some(&"12 1/2".into())), "12 1/2");
        assert_eq!(encode(Some(&"3/4".into())), "3/4");
        assert_eq!(encode(Some(&"14.5".into())), "14 1/2");
        assert_eq!(encode(Some(&"abc".into())), "abc");
        assert_eq!(encode(Some(&" 12 1/2 ".into())), " 12 1/2 ");
        assert_eq!(encode(Some(&"  ".into())), "");
    }

    #[test]
    fn decodes_every_supported_shape() {
        assert_eq!(decode(None), None);
        assert_eq!(decode(Some(&"".into())), None);
        assert_eq!(decode(Some(&"   ".into())), None);
        assert_eq!(decode(Some(&num(7.5))), Some(7.5));
        assert_eq!(decode(Some(&"1/2".into())), Some(0.5));
        assert_eq!(decode(Some(&"12 1/2".into())), Some(12.5));
        assert_eq!(decode(Some(&"5".into())), Some(5.0));
        assert_eq!(decode(Some(&"12 junk".into())), Some(12.0));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert_eq!(decode_str("abc"), None);
        assert_eq!(decode_str("1/0"), None);
        assert_eq!(decode_str("x 1/2"), None);
        assert_eq!(decode_str("NaN"), None);
    }

    #[test]
    fn quarter_values_survive_encode_then_decode() {
        for whole in 0..60 {
            for quarter in [0.0, 0.25, 0.5, 0.75] {
                let value = whole as f64 + quarter;
                let shown = encode(Some(&num(value)));
                assert_eq!(decode_str(&shown), Some(value), "{shown}");
            }
        }
    }

    #[test]
    fn splits_for_the_editing_widget() {
        let parts = |whole: &str, fraction: &str| FractionalParts {
            whole: whole.into(),
            fraction: fraction.into(),
        };
        assert_eq!(split_for_editing("12 1/4"), parts("12", "1/4"));
        assert_eq!(split_for_editing(""), parts("", "0"));
        assert_eq!(split_for_editing("1/2"), parts("0", "1/2"));
        assert_eq!(split_for_editing("12"), parts("12", "0"));
        assert_eq!(split_for_editing("12.33"), parts("12.33", "0"));
    }

    #[test]
    fn split_is_left_inverse_of_compose_for_encoded_values() {
        for whole in 0..40 {
            for quarter in [0.0, 0.25, 0.5, 0.75, 0.33] {
                let shown = encode_decimal(whole as f64 + quarter);
                assert_eq!(split_for_editing(&shown).compose(), shown);
            }
        }
    }
}
