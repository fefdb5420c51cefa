//! Shortlet stay pricing. Every amount is exact; only the discount is rounded.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::workflows::directory::Property;

pub const SERVICE_CHARGE_PERCENT: Decimal = Decimal::from_parts(8, 0, 0, false, 0);
const WEEKLY_NIGHTS: i64 = 7;
const MONTHLY_NIGHTS: i64 = 30;
const SECONDS_PER_DAY: i64 = 86_400;

/// Breakdown stored on the booking and shown to the guest before checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortletQuote {
    pub nights: i64,
    pub nightly_rate: Decimal,
    pub base_price: Decimal,
    pub discount_percent: Decimal,
    pub discount_amount: Decimal,
    pub subtotal: Decimal,
    pub cleaning_fee: Decimal,
    pub security_deposit: Decimal,
    pub service_charge: Decimal,
    pub total_price: Decimal,
}

/// Rates a stay is priced with, detached from the listing they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StayRates {
    pub nightly_rate: Decimal,
    pub weekly_discount_percent: Decimal,
    pub monthly_discount_percent: Decimal,
    pub cleaning_fee: Decimal,
    pub security_deposit: Decimal,
}

impl StayRates {
    /// Falls back to the flat listing price when no nightly rate is configured.
    pub fn for_property(property: &Property) -> Self {
        let terms = &property.shortlet;
        Self {
            nightly_rate: terms.nightly_rate.unwrap_or(property.price),
            weekly_discount_percent: terms.weekly_discount_percent,
            monthly_discount_percent: terms.monthly_discount_percent,
            cleaning_fee: terms.cleaning_fee,
            security_deposit: terms.security_deposit,
        }
    }

    pub fn discount_percent(&self, nights: i64) -> Decimal {
        if nights >= MONTHLY_NIGHTS {
            self.monthly_discount_percent
        } else if nights >= WEEKLY_NIGHTS {
            self.weekly_discount_percent
        } else {
            Decimal::ZERO
        }
    }

    pub fn quote_nights(&self, nights: i64) -> ShortletQuote {
        let nights = nights.max(0);
        let base_price = self.nightly_rate * Decimal::from(nights);
        let discount_percent = self.discount_percent(nights);
        let discount_amount = (base_price * discount_percent / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        let subtotal = (base_price - discount_amount).max(Decimal::ZERO);
        let chargeable = subtotal + self.cleaning_fee + self.security_deposit;
        let service_charge = chargeable * SERVICE_CHARGE_PERCENT / Decimal::ONE_HUNDRED;

        ShortletQuote {
            nights,
            nightly_rate: self.nightly_rate.normalize(),
            base_price: base_price.normalize(),
            discount_percent: discount_percent.normalize(),
            discount_amount: discount_amount.normalize(),
            subtotal: subtotal.normalize(),
            cleaning_fee: self.cleaning_fee.normalize(),
            security_deposit: self.security_deposit.normalize(),
            service_charge: service_charge.normalize(),
            total_price: (chargeable + service_charge).normalize(),
        }
    }

    pub fn quote(&self, check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> ShortletQuote {
        self.quote_nights(nights_between(check_in, check_out))
    }
}

/// Whole nights, rounding partial days up; never negative.
pub fn nights_between(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> i64 {
    let seconds = (check_out - check_in).num_seconds();
    if seconds <= 0 {
        0
    } else {
        (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
    }
}

pub fn calculate_shortlet_amount(
    property: &Property,
    check_in: DateTime<Utc>,
    check_out: DateTime<Utc>,
) -> ShortletQuote {
    StayRates::for_property(property).quote(check_in, check_out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::directory::{
        PartyContact, PropertyId, PropertyType, ShortletTerms, UserId,
    };
    use crate::workflows::http::parse_instant;
    use rust_decimal_macros::dec;

    fn property(terms: ShortletTerms) -> Property {
        Property {
            id: PropertyId("prop-ikoyi-loft".into()),
            title: "Ikoyi Loft".into(),
            location: "Ikoyi, Lagos".into(),
            property_type: PropertyType::Shortlet,
            price: dec!(100000),
            inspection_fee: dec!(5000),
            shortlet: terms,
            is_available: true,
            owner: PartyContact {
                id: UserId("owner-1".into()),
                full_name: "Ada Owner".into(),
                email: "ada@example.com".into(),
            },
        }
    }

    fn weekly_ten_percent() -> ShortletTerms {
        ShortletTerms {
            weekly_discount_percent: dec!(10),
            monthly_discount_percent: dec!(20),
            ..ShortletTerms::default()
        }
    }

    fn at(raw: &str) -> DateTime<Utc> {
        parse_instant(raw).expect("valid instant")
    }

    #[test]
    fn seven_night_stay_with_weekly_discount() {
        let quote = calculate_shortlet_amount(
            &property(weekly_ten_percent()),
            at("2024-01-01"),
            at("2024-01-08"),
        );

        assert_eq!(quote.nights, 7);
        assert_eq!(quote.nightly_rate, dec!(100000));
        assert_eq!(quote.base_price, dec!(700000));
        assert_eq!(quote.discount_amount, dec!(70000));
        assert_eq!(quote.subtotal, dec!(630000));
        assert_eq!(quote.service_charge, dec!(50400));
        assert_eq!(quote.total_price, dec!(680400));
        assert_eq!(quote.total_price.to_string(), "680400");
    }

    #[test]
    fn discount_tiers_switch_at_seven_and_thirty_nights() {
        let rates = StayRates::for_property(&property(weekly_ten_percent()));
        assert_eq!(rates.quote_nights(6).discount_percent, dec!(0));
        assert_eq!(rates.quote_nights(7).discount_percent, dec!(10));
        assert_eq!(rates.quote_nights(29).discount_percent, dec!(10));
        assert_eq!(rates.quote_nights(30).discount_percent, dec!(20));
    }

    #[test]
    fn total_never_decreases_with_more_nights_without_discounts() {
        let rates = StayRates::for_property(&property(ShortletTerms {
            cleaning_fee: dec!(15000),
            security_deposit: dec!(50000),
            ..ShortletTerms::default()
        }));
        let mut previous = Decimal::ZERO;
        for nights in 0..60 {
            let total = rates.quote_nights(nights).total_price;
            assert!(total >= previous, "total dropped at {nights} nights");
            previous = total;
        }
    }

    #[test]
    fn partial_days_round_up_and_reversed_ranges_are_empty() {
        assert_eq!(
            nights_between(at("2024-01-01T14:00:00Z"), at("2024-01-03T11:00:00Z")),
            2
        );
        assert_eq!(nights_between(at("2024-01-08"), at("2024-01-01")), 0);
        let quote = calculate_shortlet_amount(
            &property(ShortletTerms::default()),
            at("2024-01-08"),
            at("2024-01-01"),
        );
        assert_eq!(quote.total_price, dec!(0));
    }

    #[test]
    fn nightly_rate_and_fees_override_flat_price() {
        let quote = calculate_shortlet_amount(
            &property(ShortletTerms {
                nightly_rate: Some(dec!(45000)),
                cleaning_fee: dec!(10000),
                security_deposit: dec!(25000),
                ..ShortletTerms::default()
            }),
            at("2024-02-10"),
            at("2024-02-12"),
        );

        assert_eq!(quote.base_price, dec!(90000));
        assert_eq!(quote.service_charge, dec!(10000));
        assert_eq!(quote.total_price, dec!(135000));
    }

    #[test]
    fn discount_rounds_half_away_from_zero() {
        let rates = StayRates {
            nightly_rate: dec!(1005),
            weekly_discount_percent: dec!(5),
            monthly_discount_percent: dec!(5),
            cleaning_fee: dec!(0),
            security_deposit: dec!(0),
        };
        // 7035 * 5% = 351.75
        assert_eq!(rates.quote_nights(7).discount_amount, dec!(352));
        let rates = StayRates {
            nightly_rate: dec!(10),
            ..rates
        };
        // 70 * 5% = 3.5
        assert_eq!(rates.quote_nights(7).discount_amount, dec!(4));
    }
}
