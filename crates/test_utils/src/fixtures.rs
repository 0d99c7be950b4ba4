//! Test fixtures
//!
//! Stable values for the things most tests need: future slots, past
//! dates, typical clinic fees, and plausible free-text fields.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use fake::faker::lorem::en::Sentence;
use fake::faker::name::en::Name;
use fake::Fake;
use rust_decimal_macros::dec;

use core_kernel::{Currency, Money};

/// Temporal fixtures
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// A slot tomorrow at the given hour, on the hour
    pub fn tomorrow_at(hour: u32) -> DateTime<Utc> {
        (Utc::now() + Duration::days(1))
            .date_naive()
            .and_hms_opt(hour, 0, 0)
            .expect("whole hours are always valid")
            .and_utc()
    }

    /// A slot one week out
    pub fn next_week() -> DateTime<Utc> {
        Utc::now() + Duration::days(7)
    }

    /// An instant safely in the past
    pub fn yesterday() -> DateTime<Utc> {
        Utc::now() - Duration::days(1)
    }

    /// A due date thirty days out
    pub fn due_in_a_month() -> NaiveDate {
        (Utc::now() + Duration::days(30)).date_naive()
    }

    /// A due date already passed
    pub fn overdue_date() -> NaiveDate {
        (Utc::now() - Duration::days(14)).date_naive()
    }
}

/// Money fixtures
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// A USD amount
    pub fn usd(amount: rust_decimal::Decimal) -> Money {
        Money::new(amount, Currency::USD)
    }

    /// Standard consultation fee
    pub fn consultation_fee() -> Money {
        Self::usd(dec!(150.00))
    }

    /// Standard lab work fee
    pub fn lab_fee() -> Money {
        Self::usd(dec!(75.00))
    }
}

/// Free-text fixtures backed by generated data
pub struct TextFixtures;

impl TextFixtures {
    /// A plausible visit reason
    pub fn visit_reason() -> String {
        Sentence(3..8).fake()
    }

    /// A plausible clinical note
    pub fn clinical_note() -> String {
        Sentence(8..16).fake()
    }

    /// A staff member name
    pub fn staff_name() -> String {
        Name().fake()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tomorrow_is_in_the_future() {
        assert!(TemporalFixtures::tomorrow_at(9) > Utc::now());
    }

    #[test]
    fn test_text_fixtures_are_non_empty() {
        assert!(!TextFixtures::visit_reason().is_empty());
        assert!(!TextFixtures::clinical_note().is_empty());
        assert!(!TextFixtures::staff_name().is_empty());
    }
}
