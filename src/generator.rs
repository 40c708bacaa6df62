// 💳 Card Generator
// Pattern expansion + Luhn check digit + expiry + CVV

use crate::config::CardConfig;
use crate::error::{ForgeError, Result};
use crate::luhn;
use crate::pattern::{CardType, Pattern};
use chrono::{Datelike, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

// ============================================================================
// CARD RECORD
// ============================================================================

/// One synthesized test card. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRecord {
    pub number: String,
    pub exp_month: u32,
    pub exp_year: i32,
    pub cvv: String,
    pub card_type: CardType,
}

/// Per-call generation options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Total digit count; `None` uses the pattern's natural length
    #[serde(default)]
    pub length: Option<usize>,

    /// Expiry horizon in years; `None` uses the configured default
    #[serde(default)]
    pub years_ahead: Option<u32>,

    /// Overrides detection from the pattern prefix
    #[serde(default)]
    pub card_type: Option<CardType>,

    /// Fixed expiry month (1-12), shared by every card of the call; needs `exp_year`
    #[serde(default)]
    pub exp_month: Option<u32>,

    /// Fixed expiry year, two or four digits; needs `exp_month`
    #[serde(default)]
    pub exp_year: Option<i32>,

    /// CVV length override, 3 or 4
    #[serde(default)]
    pub cvv_length: Option<usize>,
}

/// Accepted CVV lengths
pub const CVV_LENGTHS: [usize; 2] = [3, 4];

// ============================================================================
// EXPIRY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiry {
    pub month: u32,
    pub year: i32,
}

impl Expiry {
    /// Random expiry strictly after the month of `today`
    ///
    /// Year is uniform over `[current, current + years_ahead]`; when the current
    /// year is drawn the month is limited to the remaining months. In December
    /// the current year has no remaining month, so the draw moves to the next.
    pub fn random<R: Rng + ?Sized>(
        rng: &mut R,
        today: NaiveDate,
        years_ahead: u32,
    ) -> Result<Expiry> {
        let current_year = today.year();
        let current_month = today.month();
        let last_year = horizon_end(current_year, years_ahead)?;

        let mut year = rng.gen_range(current_year..=last_year);
        if year == current_year && current_month == 12 {
            year += 1;
        }

        let month = if year == current_year {
            rng.gen_range(current_month + 1..=12)
        } else {
            rng.gen_range(1..=12)
        };

        Ok(Expiry { month, year })
    }

    /// Caller-chosen expiry, checked against `today` and the horizon
    ///
    /// Two-digit years are read as 20YY.
    pub fn fixed(month: u32, year: i32, today: NaiveDate, years_ahead: u32) -> Result<Expiry> {
        if !(1..=12).contains(&month) {
            return Err(ForgeError::InvalidOptions(format!(
                "expiry month {} must be between 1 and 12",
                month
            )));
        }

        let year = if (0..100).contains(&year) { year + 2000 } else { year };
        let last_year = horizon_end(today.year(), years_ahead)?;
        let expiry = Expiry { month, year };

        if !expiry.is_after(today) || year > last_year {
            return Err(ForgeError::InvalidOptions(format!(
                "expiry {:02}/{} must be after {:02}/{} and no later than {}",
                month,
                year,
                today.month(),
                today.year(),
                last_year
            )));
        }

        Ok(expiry)
    }

    /// True when this expiry month lies strictly after the month of `today`
    pub fn is_after(&self, today: NaiveDate) -> bool {
        self.year > today.year() || (self.year == today.year() && self.month > today.month())
    }
}

fn horizon_end(current_year: i32, years_ahead: u32) -> Result<i32> {
    i32::try_from(years_ahead)
        .ok()
        .and_then(|years| current_year.checked_add(years))
        .ok_or_else(|| {
            ForgeError::InvalidOptions(format!("years_ahead {} is out of range", years_ahead))
        })
}

/// Expiry handling decided once per call
#[derive(Debug, Clone, Copy)]
enum ExpiryPlan {
    Fixed(Expiry),
    Random { years_ahead: u32 },
}

/// Everything about a call that does not change from card to card
#[derive(Debug, Clone, Copy)]
struct BatchPlan {
    length: usize,
    expiry: ExpiryPlan,
    cvv_length: Option<usize>,
}

// ============================================================================
// CARD GENERATOR
// ============================================================================

/// Stateless apart from its policy configuration; safe to share
#[derive(Debug, Clone)]
pub struct CardGenerator {
    config: CardConfig,
}

impl CardGenerator {
    pub fn new(config: CardConfig) -> Self {
        CardGenerator { config }
    }

    pub fn config(&self) -> &CardConfig {
        &self.config
    }

    /// Total card length for `pattern`
    ///
    /// An explicit length wins; otherwise a pattern with wildcards keeps its own
    /// length and a bare BIN grows to the default length.
    pub fn card_length(&self, pattern: &Pattern, requested: Option<usize>) -> Result<usize> {
        let length = match requested {
            Some(length) => length,
            None if pattern.has_wildcard() => pattern.len(),
            None => pattern.len().max(self.config.default_length),
        };

        if length < self.config.min_length || length > self.config.max_length {
            return Err(ForgeError::InvalidPattern(format!(
                "card length {} must be between {} and {}",
                length, self.config.min_length, self.config.max_length
            )));
        }

        Ok(length)
    }

    /// Generate one card, with expiry relative to today (UTC)
    pub fn generate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        pattern: &str,
        options: &GenerateOptions,
    ) -> Result<CardRecord> {
        self.generate_on(rng, pattern, options, Utc::now().date_naive())
    }

    /// Generate one card, with expiry relative to `today`
    pub fn generate_on<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        pattern: &str,
        options: &GenerateOptions,
        today: NaiveDate,
    ) -> Result<CardRecord> {
        let pattern = Pattern::parse(pattern)?;
        let plan = self.plan(&pattern, options, today)?;
        self.build(rng, &pattern, &plan, options, today)
    }

    /// Generate `count` independent cards; duplicates are possible
    pub fn generate_bulk<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        pattern: &str,
        count: i64,
        options: &GenerateOptions,
    ) -> Result<Vec<CardRecord>> {
        self.generate_bulk_on(rng, pattern, count, options, Utc::now().date_naive())
    }

    pub fn generate_bulk_on<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        pattern: &str,
        count: i64,
        options: &GenerateOptions,
        today: NaiveDate,
    ) -> Result<Vec<CardRecord>> {
        let max = self.config.max_bulk;
        if count <= 0 || count as u64 > max as u64 {
            return Err(ForgeError::InvalidCount { got: count, max });
        }

        let pattern = Pattern::parse(pattern)?;
        let plan = self.plan(&pattern, options, today)?;

        (0..count)
            .map(|_| self.build(rng, &pattern, &plan, options, today))
            .collect()
    }

    /// `length` uniform random digits
    pub fn generate_cvv<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
        (0..length)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect()
    }

    /// Validate the per-call options before any card is drawn
    fn plan(
        &self,
        pattern: &Pattern,
        options: &GenerateOptions,
        today: NaiveDate,
    ) -> Result<BatchPlan> {
        let length = self.card_length(pattern, options.length)?;

        let years_ahead = options
            .years_ahead
            .unwrap_or(self.config.default_years_ahead);
        if years_ahead > self.config.max_years_ahead {
            return Err(ForgeError::InvalidOptions(format!(
                "years_ahead {} exceeds the maximum of {}",
                years_ahead, self.config.max_years_ahead
            )));
        }

        let expiry = match (options.exp_month, options.exp_year) {
            (None, None) => ExpiryPlan::Random { years_ahead },
            (Some(month), Some(year)) => {
                ExpiryPlan::Fixed(Expiry::fixed(month, year, today, years_ahead)?)
            }
            _ => {
                return Err(ForgeError::InvalidOptions(
                    "exp_month and exp_year must be given together".to_string(),
                ))
            }
        };

        if let Some(cvv_length) = options.cvv_length {
            if !CVV_LENGTHS.contains(&cvv_length) {
                return Err(ForgeError::InvalidOptions(format!(
                    "CVV length must be 3 or 4, got {}",
                    cvv_length
                )));
            }
        }

        Ok(BatchPlan {
            length,
            expiry,
            cvv_length: options.cvv_length,
        })
    }

    fn build<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        pattern: &Pattern,
        plan: &BatchPlan,
        options: &GenerateOptions,
        today: NaiveDate,
    ) -> Result<CardRecord> {
        // last position is reserved for the check digit
        let body = pattern.expand(rng, Some(plan.length - 1))?;
        let body_digits = luhn::digits(&body).ok_or_else(|| {
            ForgeError::InvalidPattern("pattern did not resolve to digits".to_string())
        })?;

        let mut number = body;
        number.push(char::from(b'0' + luhn::check_digit(&body_digits)));

        let card_type = options
            .card_type
            .unwrap_or_else(|| CardType::detect(&number));
        let expiry = match plan.expiry {
            ExpiryPlan::Fixed(expiry) => expiry,
            ExpiryPlan::Random { years_ahead } => Expiry::random(rng, today, years_ahead)?,
        };
        let cvv_length = plan.cvv_length.unwrap_or_else(|| card_type.cvv_length());

        Ok(CardRecord {
            number,
            exp_month: expiry.month,
            exp_year: expiry.year,
            cvv: Self::generate_cvv(rng, cvv_length),
            card_type,
        })
    }
}

impl Default for CardGenerator {
    fn default() -> Self {
        Self::new(CardConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_generated_numbers_pass_luhn() {
        let generator = CardGenerator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        for pattern in [
            "411111xxxxxxxxxx",
            "552461xxxxxxxxxx",
            "559888039xxxxxxx",
            "37xxxxxxxxxxxxx",
            "6011xxxxxxxxxxxxxxx",
            "552461",
        ] {
            for _ in 0..50 {
                let card = generator
                    .generate(&mut rng, pattern, &GenerateOptions::default())
                    .unwrap();
                assert!(luhn::is_valid(&card.number), "{} failed Luhn", card.number);
            }
        }
    }

    #[test]
    fn test_length_follows_pattern_or_override() {
        let generator = CardGenerator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let defaults = GenerateOptions::default();

        let card = generator.generate(&mut rng, "411111xxxxxxxxx", &defaults).unwrap();
        assert_eq!(card.number.len(), 15);

        // a bare BIN grows to the default length
        let card = generator.generate(&mut rng, "552461", &defaults).unwrap();
        assert_eq!(card.number.len(), 16);
        assert!(card.number.starts_with("552461"));

        let options = GenerateOptions {
            length: Some(19),
            ..Default::default()
        };
        let card = generator.generate(&mut rng, "411111xxxxxxxxxx", &options).unwrap();
        assert_eq!(card.number.len(), 19);
        assert!(luhn::is_valid(&card.number));
    }

    #[test]
    fn test_length_outside_card_range_is_rejected() {
        let generator = CardGenerator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        let options = GenerateOptions {
            length: Some(12),
            ..Default::default()
        };
        assert!(matches!(
            generator.generate(&mut rng, "411111xxxxxx", &options),
            Err(ForgeError::InvalidPattern(_))
        ));

        assert!(matches!(
            generator.generate(&mut rng, "4111xx-xxxx", &GenerateOptions::default()),
            Err(ForgeError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_expiry_is_strictly_in_the_future() {
        let generator = CardGenerator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(99);

        for today in [date(2026, 1, 15), date(2026, 11, 30), date(2026, 12, 31)] {
            for _ in 0..200 {
                let card = generator
                    .generate_on(&mut rng, "411111xxxxxxxxxx", &GenerateOptions::default(), today)
                    .unwrap();
                let expiry = Expiry {
                    month: card.exp_month,
                    year: card.exp_year,
                };
                assert!(expiry.is_after(today), "{:?} not after {}", expiry, today);
                assert!((1..=12).contains(&card.exp_month));
                assert!(card.exp_year <= today.year() + 5 + 1);
            }
        }
    }

    #[test]
    fn test_expiry_respects_horizon() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let today = date(2026, 6, 1);

        for _ in 0..500 {
            let expiry = Expiry::random(&mut rng, today, 2).unwrap();
            assert!(expiry.year >= 2026 && expiry.year <= 2028);
            assert!(expiry.is_after(today));
        }
    }

    #[test]
    fn test_zero_horizon_in_december_rolls_over() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let expiry = Expiry::random(&mut rng, date(2026, 12, 10), 0).unwrap();
        assert_eq!(expiry.year, 2027);
    }

    #[test]
    fn test_cvv_length_by_card_type() {
        let generator = CardGenerator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(2);

        let amex = generator
            .generate(&mut rng, "37xxxxxxxxxxxxx", &GenerateOptions::default())
            .unwrap();
        assert_eq!(amex.card_type, CardType::Amex);
        assert_eq!(amex.cvv.len(), 4);

        let visa = generator
            .generate(&mut rng, "411111xxxxxxxxxx", &GenerateOptions::default())
            .unwrap();
        assert_eq!(visa.card_type, CardType::Visa);
        assert_eq!(visa.cvv.len(), 3);
        assert!(visa.cvv.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_explicit_card_type_overrides_detection() {
        let generator = CardGenerator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let options = GenerateOptions {
            card_type: Some(CardType::Amex),
            ..Default::default()
        };

        let card = generator.generate(&mut rng, "411111xxxxxxxxxx", &options).unwrap();
        assert_eq!(card.card_type, CardType::Amex);
        assert_eq!(card.cvv.len(), 4);
    }

    #[test]
    fn test_bulk_returns_exact_count() {
        let generator = CardGenerator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(4);

        for n in [1, 2, 37, 100] {
            let cards = generator
                .generate_bulk(&mut rng, "552461xxxxxxxxxx", n, &GenerateOptions::default())
                .unwrap();
            assert_eq!(cards.len(), n as usize);
            assert!(cards.iter().all(|c| luhn::is_valid(&c.number)));
        }
    }

    #[test]
    fn test_bulk_rejects_bad_counts() {
        let generator = CardGenerator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let options = GenerateOptions::default();

        for n in [0, -1, 101] {
            let result = generator.generate_bulk(&mut rng, "552461xxxxxxxxxx", n, &options);
            assert!(
                matches!(result, Err(ForgeError::InvalidCount { .. })),
                "count {} was accepted",
                n
            );
        }
    }

    #[test]
    fn test_bulk_propagates_pattern_errors() {
        let generator = CardGenerator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(4);

        let result = generator.generate_bulk(&mut rng, "55z461", 3, &GenerateOptions::default());
        assert!(matches!(result, Err(ForgeError::InvalidPattern(_))));
    }

    #[test]
    fn test_same_seed_same_cards() {
        let generator = CardGenerator::default();
        let today = date(2026, 3, 3);
        let options = GenerateOptions::default();

        let a = generator
            .generate_bulk_on(&mut ChaCha8Rng::seed_from_u64(77), "411111xxxxxxxxxx", 5, &options, today)
            .unwrap();
        let b = generator
            .generate_bulk_on(&mut ChaCha8Rng::seed_from_u64(77), "411111xxxxxxxxxx", 5, &options, today)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_oversized_horizon_is_rejected_not_panicking() {
        let generator = CardGenerator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        for years in [u32::MAX, 10_000, 11] {
            let options = GenerateOptions {
                years_ahead: Some(years),
                ..Default::default()
            };
            let result = generator.generate(&mut rng, "411111xxxxxxxxxx", &options);
            assert!(
                matches!(result, Err(ForgeError::InvalidOptions(_))),
                "years_ahead {} was accepted",
                years
            );
        }

        let options = GenerateOptions {
            years_ahead: Some(10),
            ..Default::default()
        };
        let card = generator.generate(&mut rng, "411111xxxxxxxxxx", &options).unwrap();
        assert_eq!(card.exp_year.to_string().len(), 4);
    }

    #[test]
    fn test_expiry_random_rejects_overflowing_horizon() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(matches!(
            Expiry::random(&mut rng, date(2026, 6, 1), u32::MAX),
            Err(ForgeError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_fixed_expiry_is_shared_across_bulk() {
        let generator = CardGenerator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let options = GenerateOptions {
            exp_month: Some(3),
            exp_year: Some(28),
            ..Default::default()
        };

        let cards = generator
            .generate_bulk_on(&mut rng, "552461xxxxxxxxxx", 20, &options, date(2026, 6, 1))
            .unwrap();
        assert!(cards.iter().all(|c| c.exp_month == 3 && c.exp_year == 2028));
    }

    #[test]
    fn test_fixed_expiry_must_be_future_and_within_horizon() {
        let today = date(2026, 6, 1);

        assert!(Expiry::fixed(7, 2026, today, 5).is_ok());
        assert_eq!(
            Expiry::fixed(12, 31, today, 5).unwrap(),
            Expiry { month: 12, year: 2031 }
        );

        for (month, year) in [(6, 2026), (5, 2026), (1, 2032), (13, 2027), (0, 2027)] {
            assert!(
                matches!(
                    Expiry::fixed(month, year, today, 5),
                    Err(ForgeError::InvalidOptions(_))
                ),
                "{}/{} was accepted",
                month,
                year
            );
        }
    }

    #[test]
    fn test_fixed_expiry_needs_both_parts() {
        let generator = CardGenerator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let options = GenerateOptions {
            exp_month: Some(3),
            ..Default::default()
        };

        assert!(matches!(
            generator.generate(&mut rng, "552461xxxxxxxxxx", &options),
            Err(ForgeError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_cvv_length_override() {
        let generator = CardGenerator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let four = GenerateOptions {
            cvv_length: Some(4),
            ..Default::default()
        };
        let card = generator.generate(&mut rng, "411111xxxxxxxxxx", &four).unwrap();
        assert_eq!(card.card_type, CardType::Visa);
        assert_eq!(card.cvv.len(), 4);

        for bad in [0, 2, 5] {
            let options = GenerateOptions {
                cvv_length: Some(bad),
                ..Default::default()
            };
            assert!(matches!(
                generator.generate(&mut rng, "411111xxxxxxxxxx", &options),
                Err(ForgeError::InvalidOptions(_))
            ));
        }
    }
}
