// 🧩 BIN Pattern Expander
// Templates of literal digits and `x` wildcards → concrete digit strings

use crate::error::{ForgeError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Wildcard marker (accepted in either case, normalised to lowercase)
pub const WILDCARD: char = 'x';

/// Accepted length range for patterns and expanded sequences
pub const MIN_PATTERN_LENGTH: usize = 6;
pub const MAX_PATTERN_LENGTH: usize = 19;

// ============================================================================
// CARD TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    Visa,
    Mastercard,
    Amex,
    Discover,
    Jcb,
    Diners,
    Unionpay,
    Unknown,
}

impl CardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::Visa => "visa",
            CardType::Mastercard => "mastercard",
            CardType::Amex => "amex",
            CardType::Discover => "discover",
            CardType::Jcb => "jcb",
            CardType::Diners => "diners",
            CardType::Unionpay => "unionpay",
            CardType::Unknown => "unknown",
        }
    }

    /// Human-readable name for display
    pub fn name(&self) -> &'static str {
        match self {
            CardType::Visa => "Visa",
            CardType::Mastercard => "Mastercard",
            CardType::Amex => "American Express",
            CardType::Discover => "Discover",
            CardType::Jcb => "JCB",
            CardType::Diners => "Diners Club",
            CardType::Unionpay => "UnionPay",
            CardType::Unknown => "Unknown",
        }
    }

    /// Security code length: 4 for American Express, 3 otherwise
    pub fn cvv_length(&self) -> usize {
        match self {
            CardType::Amex => 4,
            _ => 3,
        }
    }

    /// Detect the network from the leading digits of a number or pattern
    pub fn detect(leading_digits: &str) -> CardType {
        let digits: String = leading_digits
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();

        if digits.is_empty() {
            return CardType::Unknown;
        }

        let prefix = |n: usize| -> Option<u32> {
            digits.get(..n).and_then(|s| s.parse().ok())
        };

        if digits.starts_with('4') {
            return CardType::Visa;
        }

        if let Some(two) = prefix(2) {
            if (51..=55).contains(&two) {
                return CardType::Mastercard;
            }
        }
        if let Some(four) = prefix(4) {
            if (2221..=2720).contains(&four) {
                return CardType::Mastercard;
            }
        }

        if matches!(prefix(2), Some(34) | Some(37)) {
            return CardType::Amex;
        }

        if prefix(4) == Some(6011) || matches!(prefix(2), Some(64) | Some(65)) {
            return CardType::Discover;
        }

        if let Some(four) = prefix(4) {
            if (3528..=3589).contains(&four) {
                return CardType::Jcb;
            }
        }

        if matches!(prefix(2), Some(36) | Some(38)) {
            return CardType::Diners;
        }
        if let Some(three) = prefix(3) {
            if (300..=305).contains(&three) {
                return CardType::Diners;
            }
        }

        if prefix(2) == Some(62) {
            return CardType::Unionpay;
        }

        CardType::Unknown
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardType {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "visa" => Ok(CardType::Visa),
            "mastercard" | "master card" => Ok(CardType::Mastercard),
            "amex" | "american express" => Ok(CardType::Amex),
            "discover" => Ok(CardType::Discover),
            "jcb" => Ok(CardType::Jcb),
            "diners" | "diners club" => Ok(CardType::Diners),
            "unionpay" => Ok(CardType::Unionpay),
            "unknown" => Ok(CardType::Unknown),
            other => Err(ForgeError::InvalidPattern(format!(
                "unknown card type '{}'",
                other
            ))),
        }
    }
}

// ============================================================================
// PATTERN
// ============================================================================

/// A parsed BIN template: `None` slots are wildcards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    slots: Vec<Option<u8>>,
}

impl Pattern {
    /// Parse a template, ignoring whitespace
    ///
    /// Only digits and the wildcard marker are accepted. Length is checked at
    /// expansion time, since an override length may truncate or pad.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut slots = Vec::with_capacity(raw.len());

        for c in raw.chars().filter(|c| !c.is_whitespace()) {
            match c {
                '0'..='9' => slots.push(Some(c as u8 - b'0')),
                'x' | 'X' => slots.push(None),
                other => {
                    return Err(ForgeError::InvalidPattern(format!(
                        "'{}' is neither a digit nor the wildcard '{}'",
                        other, WILDCARD
                    )))
                }
            }
        }

        if slots.is_empty() {
            return Err(ForgeError::InvalidPattern(
                "pattern must not be empty".to_string(),
            ));
        }

        Ok(Pattern { slots })
    }

    /// Natural length (number of slots)
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn wildcard_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }

    pub fn has_wildcard(&self) -> bool {
        self.wildcard_count() > 0
    }

    /// Literal digits before the first wildcard
    pub fn literal_prefix(&self) -> String {
        self.slots
            .iter()
            .map_while(|slot| slot.map(|d| char::from(b'0' + d)))
            .collect()
    }

    /// Card network implied by the literal prefix
    pub fn card_type(&self) -> CardType {
        CardType::detect(&self.literal_prefix())
    }

    /// Canonical text form (lowercase wildcard, no whitespace)
    pub fn normalized(&self) -> String {
        self.slots
            .iter()
            .map(|slot| match slot {
                Some(d) => char::from(b'0' + d),
                None => WILDCARD,
            })
            .collect()
    }

    /// Fill every wildcard with a uniform random digit
    ///
    /// With `override_length`, the template is truncated or right-padded
    /// with extra wildcard positions to reach that length.
    pub fn expand<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        override_length: Option<usize>,
    ) -> Result<String> {
        let target = override_length.unwrap_or(self.slots.len());

        if !(MIN_PATTERN_LENGTH..=MAX_PATTERN_LENGTH).contains(&target) {
            return Err(ForgeError::InvalidPattern(format!(
                "expanded length {} is outside {}-{}",
                target, MIN_PATTERN_LENGTH, MAX_PATTERN_LENGTH
            )));
        }

        let digits = (0..target)
            .map(|i| match self.slots.get(i).copied().flatten() {
                Some(d) => char::from(b'0' + d),
                None => char::from(b'0' + rng.gen_range(0..10u8)),
            })
            .collect();

        Ok(digits)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized())
    }
}

/// Parse and expand in one step
pub fn expand<R: Rng + ?Sized>(
    rng: &mut R,
    pattern: &str,
    override_length: Option<usize>,
) -> Result<String> {
    Pattern::parse(pattern)?.expand(rng, override_length)
}

/// Rules a stored BIN template must satisfy: valid syntax, 6-19 positions,
/// at least one wildcard. Returns the normalised form.
pub fn validate_template(raw: &str) -> Result<String> {
    let pattern = Pattern::parse(raw)?;

    if !(MIN_PATTERN_LENGTH..=MAX_PATTERN_LENGTH).contains(&pattern.len()) {
        return Err(ForgeError::InvalidPattern(format!(
            "pattern length {} is outside {}-{}",
            pattern.len(),
            MIN_PATTERN_LENGTH,
            MAX_PATTERN_LENGTH
        )));
    }

    if !pattern.has_wildcard() {
        return Err(ForgeError::InvalidPattern(format!(
            "pattern needs at least one '{}' wildcard",
            WILDCARD
        )));
    }

    Ok(pattern.normalized())
}
