//! Core subscription domain types.

use std::{fmt::Display, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::{Error, UserID, category::CategoryId};

/// Database identifier for a subscription.
pub type SubscriptionId = i64;

/// Check that `id` could be a subscription ID.
///
/// # Errors
///
/// Returns [Error::InvalidSubscriptionId] if `id` is not a positive integer.
pub fn parse_subscription_id(id: i64) -> Result<SubscriptionId, Error> {
    if id > 0 {
        Ok(id)
    } else {
        Err(Error::InvalidSubscriptionId)
    }
}

/// A validated, non-empty subscription name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct SubscriptionName(String);

impl SubscriptionName {
    /// Create a subscription name with surrounding whitespace removed.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptySubscriptionName] if `name` is empty after trimming.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptySubscriptionName)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a subscription name without validation.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for SubscriptionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for SubscriptionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How often a subscription is billed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Day,
    Week,
    Month,
    Annual,
}

impl BillingCycle {
    /// The name used in requests, responses and the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Day => "day",
            BillingCycle::Week => "week",
            BillingCycle::Month => "month",
            BillingCycle::Annual => "annual",
        }
    }
}

impl FromStr for BillingCycle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(BillingCycle::Day),
            "week" => Ok(BillingCycle::Week),
            "month" => Ok(BillingCycle::Month),
            "annual" => Ok(BillingCycle::Annual),
            other => Err(Error::InvalidBillingCycle(other.to_owned())),
        }
    }
}

impl Display for BillingCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The day of the month a subscription renews on, from 1 to 31.
///
/// Days that do not exist in shorter months are still stored as given.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct RenewalDay(u8);

impl RenewalDay {
    /// # Errors
    ///
    /// Returns [Error::InvalidRenewalDay] if `day` is outside of 1 to 31.
    pub fn new(day: i64) -> Result<Self, Error> {
        match u8::try_from(day) {
            Ok(day @ 1..=31) => Ok(Self(day)),
            _ => Err(Error::InvalidRenewalDay(day)),
        }
    }

    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

/// The largest cost a subscription may have, one billion.
///
/// Totals over any realistic number of subscriptions stay far below [Decimal::MAX].
pub const MAX_COST: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Round `cost` to cents.
///
/// # Errors
///
/// Returns [Error::InvalidCost] if `cost` is negative or greater than [MAX_COST].
pub fn parse_cost(cost: Decimal) -> Result<Decimal, Error> {
    if (cost.is_sign_negative() && !cost.is_zero()) || cost > MAX_COST {
        return Err(Error::InvalidCost);
    }

    Ok(round_to_cents(cost))
}

/// Round `amount` to two decimal places, keeping trailing zeros (e.g., "5.00").
pub fn round_to_cents(amount: Decimal) -> Decimal {
    let mut amount = amount.round_dp(2);
    amount.rescale(2);

    amount
}

/// A validated subscription that has not been saved yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubscription {
    pub name: SubscriptionName,
    pub cost: Decimal,
    pub billing_cycle: BillingCycle,
    pub renewal_date: RenewalDay,
    pub account_info: String,
    pub category_id: CategoryId,
}

/// A recurring payment that a user tracks.
///
/// The subscription is active while `cancelled_at` is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub name: SubscriptionName,
    pub cost: Decimal,
    pub billing_cycle: BillingCycle,
    pub renewal_date: RenewalDay,
    pub account_info: String,
    pub category_id: CategoryId,
    pub user_id: UserID,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub cancelled_at: Option<OffsetDateTime>,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        self.cancelled_at.is_none()
    }
}

/// The raw request body for creating a subscription.
///
/// Fields are loosely typed so that each invalid field gets its own error message.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubscriptionFormData {
    pub name: String,
    pub cost: Value,
    pub billing_cycle: String,
    pub renewal_date: i64,
    #[serde(default)]
    pub account_info: Option<String>,
    pub category_id: i64,
}

impl TryFrom<SubscriptionFormData> for NewSubscription {
    type Error = Error;

    fn try_from(form: SubscriptionFormData) -> Result<Self, Self::Error> {
        let cost = match &form.cost {
            Value::Number(number) => Decimal::from_str(&number.to_string()),
            Value::String(string) => Decimal::from_str(string.trim()),
            _ => return Err(Error::InvalidCost),
        }
        .map_err(|_| Error::InvalidCost)?;

        Ok(NewSubscription {
            name: SubscriptionName::new(&form.name)?,
            cost: parse_cost(cost)?,
            billing_cycle: form.billing_cycle.parse()?,
            renewal_date: RenewalDay::new(form.renewal_date)?,
            account_info: form.account_info.unwrap_or_default(),
            category_id: crate::category::parse_category_id(form.category_id)?,
        })
    }
}

/// The request body for setting or clearing a cancellation.
///
/// `cancelled_at` must be an RFC 3339 date-time string or null.
#[derive(Debug, Serialize, Deserialize)]
pub struct CancellationFormData {
    pub id: i64,
    pub cancelled_at: Value,
}

/// Interpret the `cancelled_at` field of a request.
///
/// # Errors
///
/// Returns [Error::InvalidCancelledAt] if `value` is neither null nor an RFC 3339 date-time.
pub fn parse_cancelled_at(value: &Value) -> Result<Option<OffsetDateTime>, Error> {
    match value {
        Value::Null => Ok(None),
        Value::String(string) => {
            OffsetDateTime::parse(string, &time::format_description::well_known::Rfc3339)
                .map(Some)
                .map_err(|_| Error::InvalidCancelledAt)
        }
        _ => Err(Error::InvalidCancelledAt),
    }
}

/// The request body for deleting a subscription.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubscriptionIdData {
    pub id: i64,
}

#[cfg(test)]
mod renewal_day_tests {
    use crate::{Error, subscription::RenewalDay};

    #[test]
    fn first_and_last_day_are_valid() {
        assert_eq!(RenewalDay::new(1).unwrap().as_u8(), 1);
        assert_eq!(RenewalDay::new(31).unwrap().as_u8(), 31);
    }

    #[test]
    fn out_of_range_days_are_rejected() {
        assert_eq!(RenewalDay::new(0), Err(Error::InvalidRenewalDay(0)));
        assert_eq!(RenewalDay::new(32), Err(Error::InvalidRenewalDay(32)));
        assert_eq!(RenewalDay::new(-1), Err(Error::InvalidRenewalDay(-1)));
        assert_eq!(RenewalDay::new(256 + 1), Err(Error::InvalidRenewalDay(257)));
    }
}

#[cfg(test)]
mod billing_cycle_tests {
    use crate::{BillingCycle, Error};

    #[test]
    fn parses_known_cycles() {
        assert_eq!("day".parse::<BillingCycle>(), Ok(BillingCycle::Day));
        assert_eq!("week".parse::<BillingCycle>(), Ok(BillingCycle::Week));
        assert_eq!("month".parse::<BillingCycle>(), Ok(BillingCycle::Month));
        assert_eq!("annual".parse::<BillingCycle>(), Ok(BillingCycle::Annual));
    }

    #[test]
    fn rejects_unknown_cycle() {
        assert_eq!(
            "fortnight".parse::<BillingCycle>(),
            Err(Error::InvalidBillingCycle("fortnight".to_owned()))
        );
    }

    #[test]
    fn serializes_as_lowercase() {
        assert_eq!(
            serde_json::to_string(&BillingCycle::Annual).unwrap(),
            r#""annual""#
        );
    }
}

#[cfg(test)]
mod form_tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;
    use serde_json::{Value, json};
    use time::macros::datetime;

    use crate::{
        BillingCycle, Error, NewSubscription,
        subscription::domain::{MAX_COST, SubscriptionFormData, parse_cancelled_at, parse_cost},
    };

    fn form(body: Value) -> SubscriptionFormData {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn cost_is_rounded_to_cents() {
        assert_eq!(
            parse_cost(Decimal::from_str("9.999").unwrap()).unwrap().to_string(),
            "10.00"
        );
        assert_eq!(
            parse_cost(Decimal::from_str("5").unwrap()).unwrap().to_string(),
            "5.00"
        );
    }

    #[test]
    fn zero_cost_is_allowed() {
        assert_eq!(parse_cost(Decimal::ZERO).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn negative_cost_is_rejected() {
        assert_eq!(
            parse_cost(Decimal::from_str("-0.01").unwrap()),
            Err(Error::InvalidCost)
        );
    }

    #[test]
    fn cost_above_maximum_is_rejected() {
        assert_eq!(parse_cost(MAX_COST).unwrap(), MAX_COST);
        assert_eq!(
            parse_cost(MAX_COST + Decimal::new(1, 2)),
            Err(Error::InvalidCost)
        );
        assert_eq!(parse_cost(Decimal::MAX), Err(Error::InvalidCost));
    }

    #[test]
    fn largest_decimal_cost_is_rejected() {
        let result = NewSubscription::try_from(form(json!({
            "name": "Netflix",
            "cost": "79228162514264337593543950335",
            "billing_cycle": "month",
            "renewal_date": 14,
            "category_id": 3,
        })));

        assert_eq!(result, Err(Error::InvalidCost));
    }

    #[test]
    fn valid_form_converts() {
        let new_subscription = NewSubscription::try_from(form(json!({
            "name": " Netflix ",
            "cost": 15.49,
            "billing_cycle": "month",
            "renewal_date": 14,
            "category_id": 3,
        })))
        .unwrap();

        assert_eq!(new_subscription.name.as_ref(), "Netflix");
        assert_eq!(new_subscription.cost.to_string(), "15.49");
        assert_eq!(new_subscription.billing_cycle, BillingCycle::Month);
        assert_eq!(new_subscription.renewal_date.as_u8(), 14);
        assert_eq!(new_subscription.account_info, "");
        assert_eq!(new_subscription.category_id, 3);
    }

    #[test]
    fn cost_may_be_a_string() {
        let new_subscription = NewSubscription::try_from(form(json!({
            "name": "Netflix",
            "cost": "15.49",
            "billing_cycle": "month",
            "renewal_date": 14,
            "category_id": 3,
        })))
        .unwrap();

        assert_eq!(new_subscription.cost.to_string(), "15.49");
    }

    #[test]
    fn non_numeric_cost_is_rejected() {
        let result = NewSubscription::try_from(form(json!({
            "name": "Netflix",
            "cost": "a lot",
            "billing_cycle": "month",
            "renewal_date": 14,
            "category_id": 3,
        })));

        assert_eq!(result, Err(Error::InvalidCost));
    }

    #[test]
    fn invalid_category_id_is_rejected() {
        let result = NewSubscription::try_from(form(json!({
            "name": "Netflix",
            "cost": 1,
            "billing_cycle": "month",
            "renewal_date": 14,
            "category_id": 0,
        })));

        assert_eq!(result, Err(Error::InvalidCategoryId));
    }

    #[test]
    fn cancelled_at_accepts_rfc3339_and_null() {
        assert_eq!(
            parse_cancelled_at(&json!("2026-03-14T15:09:26Z")),
            Ok(Some(datetime!(2026-03-14 15:09:26 UTC)))
        );
        assert_eq!(parse_cancelled_at(&Value::Null), Ok(None));
    }

    #[test]
    fn cancelled_at_rejects_other_values() {
        assert_eq!(
            parse_cancelled_at(&json!("yesterday")),
            Err(Error::InvalidCancelledAt)
        );
        assert_eq!(parse_cancelled_at(&json!(42)), Err(Error::InvalidCancelledAt));
    }
}
