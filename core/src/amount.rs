//! Amount entry: a validated decimal text value and the normalizer that keeps
//! it within the active balance ceiling.
//!
//! The stored text is what the user sees. It always matches `^\d*\.?\d*$`,
//! carries at most 18 fractional digits, and never exceeds the ceiling it was
//! last checked against. When an edit overshoots, the text is replaced by the
//! ceiling's canonical form (see [`format_units`]) rather than the raw input.

use std::fmt;

use thiserror::Error;

use crate::display::{format_units, BASE_PER_UNIT, DECIMALS};

/// Slider granularity: 0.01 display units.
pub const SLIDER_STEP: u128 = BASE_PER_UNIT / 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("'{0}' is not a decimal number")]
    Malformed(String),

    #[error("'{0}' has more than 18 decimal places")]
    TooPrecise(String),
}

/// Decimal text that has passed pattern validation. The empty string and a
/// lone `.` are accepted as transient typing states worth zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountText(String);

impl AmountText {
    pub fn zero() -> Self {
        Self("0".to_string())
    }

    pub fn parse(raw: &str) -> Result<Self, AmountError> {
        let (whole, frac) = match raw.split_once('.') {
            Some((w, f)) => (w, f),
            None => (raw, ""),
        };
        let digits_only = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if !digits_only(whole) || !digits_only(frac) {
            return Err(AmountError::Malformed(raw.to_string()));
        }
        if frac.len() > DECIMALS {
            return Err(AmountError::TooPrecise(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// Canonical text for a base-unit value.
    pub fn from_base_units(value: u128) -> Self {
        Self(format_units(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the transient typing states `""` and `"."`.
    pub fn is_blank(&self) -> bool {
        self.0.is_empty() || self.0 == "."
    }

    /// Value in base units. `None` when the integer part does not fit.
    pub fn base_units(&self) -> Option<u128> {
        if self.is_blank() {
            return Some(0);
        }
        let (whole, frac) = match self.0.split_once('.') {
            Some((w, f)) => (w, f),
            None => (self.0.as_str(), ""),
        };
        let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let frac: u128 = if frac.is_empty() {
            0
        } else {
            format!("{frac:0<width$}", width = DECIMALS).parse().ok()?
        };
        whole.checked_mul(BASE_PER_UNIT)?.checked_add(frac)
    }
}

impl fmt::Display for AmountText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a text edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    /// Stored exactly as typed.
    Accepted,
    /// Exceeded the ceiling; stored as the ceiling's canonical text.
    Clamped,
    /// Left the stored value untouched.
    Rejected,
}

/// The amount field of the staking form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountInput {
    text: AmountText,
}

impl Default for AmountInput {
    fn default() -> Self {
        Self {
            text: AmountText::zero(),
        }
    }
}

impl AmountInput {
    pub fn text(&self) -> &AmountText {
        &self.text
    }

    pub fn as_str(&self) -> &str {
        self.text.as_str()
    }

    /// Apply free-text input against `ceiling` (base units).
    pub fn set_amount(&mut self, raw: &str, ceiling: u128) -> Edit {
        let ceiling_text = format_units(ceiling);

        // Once the field sits at the ceiling, typing more digits after it
        // must not re-trigger the clamp on every keystroke.
        if self.text.as_str() == ceiling_text
            && raw.len() > ceiling_text.len()
            && raw.starts_with(&ceiling_text)
        {
            return Edit::Rejected;
        }

        let Ok(parsed) = AmountText::parse(raw) else {
            return Edit::Rejected;
        };

        match parsed.base_units() {
            Some(value) if value <= ceiling => {
                self.text = parsed;
                Edit::Accepted
            }
            _ => {
                self.text = AmountText(ceiling_text);
                Edit::Clamped
            }
        }
    }

    pub fn set_max(&mut self, ceiling: u128) {
        self.text = AmountText::from_base_units(ceiling);
    }

    /// Slider values are bounded by the slider's own range, so no check here.
    pub fn set_by_slider(&mut self, value: u128) {
        self.text = AmountText::from_base_units(value);
    }

    pub fn reset(&mut self) {
        self.text = AmountText::zero();
    }
}

/// Map a slider position (0–100 %) to a base-unit value on the 0.01 grid.
/// 100 % is the exact ceiling; positions above 100 are treated as 100.
pub fn slider_value(percent: u8, ceiling: u128) -> u128 {
    if percent >= 100 {
        return ceiling;
    }
    let percent = u128::from(percent);
    // ceiling * percent / 100 without overflowing
    let raw = (ceiling / 100) * percent + (ceiling % 100) * percent / 100;
    raw - raw % SLIDER_STEP
}
