//! Discount code Aggregate
//!
//! Edit windows are computed in the business timezone through `chrono-tz`,
//! never with a fixed UTC offset.

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::domain::validation::{self, FormErrors};
use crate::domain::value_objects::Money;

pub const MIN_ORDER_VALUE: i64 = 1000;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiscountCode {
    pub id: String,
    pub code: String,
    pub percentage: i64,
    pub min_order_value: Money,
    pub expires_at: DateTime<Utc>,
    pub usage_limit: i64,
    #[serde(default)]
    pub used_count: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl DiscountCode {
    /// First instant of the day after creation, in the business timezone.
    pub fn edit_deadline(&self, tz: Tz) -> DateTime<Utc> {
        let created_local = self.created_at.with_timezone(&tz).date_naive();
        created_local
            .succ_opt()
            .and_then(|next| next.and_time(NaiveTime::MIN).and_local_timezone(tz).earliest())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(self.created_at)
    }

    /// Codes are editable until the end of the local calendar day they were
    /// created. `created_at` is server time and may be ahead of `now`.
    pub fn is_editable(&self, now: DateTime<Utc>, tz: Tz) -> bool { now < self.edit_deadline(tz) }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool { now >= self.expires_at }
    pub fn remaining_uses(&self) -> i64 { (self.usage_limit - self.used_count).max(0) }
}

fn validate_min_order(value: &Money) -> Result<(), validator::ValidationError> {
    if value.amount() < Decimal::from(MIN_ORDER_VALUE) {
        let mut err = validator::ValidationError::new("min_order_value");
        err.message = Some(format!("Minimum order value must be at least {}", Money::dong(MIN_ORDER_VALUE)).into());
        return Err(err);
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Serialize, Validate)]
pub struct NewDiscountCode {
    #[validate(length(min = 1, max = 10, message = "Code must be 1 to 10 characters"))]
    pub code: String,
    #[validate(range(min = 0, max = 100, message = "Percentage must be an integer between 0 and 100"))]
    pub percentage: i64,
    #[validate(custom = "validate_min_order")]
    pub min_order_value: Money,
    pub expires_at: DateTime<Utc>,
    #[validate(range(min = 1, message = "Usage limit must be at least 1"))]
    pub usage_limit: i64,
}

impl NewDiscountCode {
    /// Rules checked before creation; the expiration must lie after `now`.
    pub fn check(&self, now: DateTime<Utc>) -> crate::Result<()> {
        let mut errors = validation::check(self);
        if self.code.trim() != self.code || self.code.contains(char::is_whitespace) {
            errors.add("code", "Code must not contain spaces");
        }
        if self.expires_at <= now {
            errors.add("expires_at", "Expiration must be in the future");
        }
        errors.into_result()
    }
}

/// Editable fields; the expiration date is fixed at creation.
#[derive(Clone, Debug, PartialEq, Serialize, Validate)]
pub struct DiscountUpdate {
    #[validate(range(min = 0, max = 100, message = "Percentage must be an integer between 0 and 100"))]
    pub percentage: i64,
    #[validate(custom = "validate_min_order")]
    pub min_order_value: Money,
    #[validate(range(min = 1, message = "Usage limit must be at least 1"))]
    pub usage_limit: i64,
}

impl DiscountUpdate {
    pub fn from_code(code: &DiscountCode) -> Self {
        Self { percentage: code.percentage, min_order_value: code.min_order_value, usage_limit: code.usage_limit }
    }

    pub fn check(&self) -> crate::Result<()> { validation::check(self).into_result() }
}

/// Field errors of a create form, for inline display without submitting.
pub fn preview_errors(form: &NewDiscountCode, now: DateTime<Utc>) -> FormErrors {
    match form.check(now) {
        Err(crate::AdminError::Validation(errors)) => errors,
        _ => FormErrors::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use chrono_tz::Asia::Ho_Chi_Minh;

    fn form(percentage: i64) -> NewDiscountCode {
        NewDiscountCode {
            code: "SUMMER10".into(),
            percentage,
            min_order_value: Money::dong(100_000),
            expires_at: Utc::now() + Duration::days(7),
            usage_limit: 50,
        }
    }

    #[test]
    fn test_percentage_bounds() {
        let now = Utc::now();
        assert!(form(50).check(now).is_ok());
        assert!(form(0).check(now).is_ok());
        assert!(form(100).check(now).is_ok());
        assert!(preview_errors(&form(101), now).has("percentage"));
        assert!(preview_errors(&form(-1), now).has("percentage"));
    }

    #[test]
    fn test_other_create_rules() {
        let now = Utc::now();
        let mut f = form(10);
        f.code = "TOOLONGCODE1".into();
        f.min_order_value = Money::dong(999);
        f.usage_limit = 0;
        f.expires_at = now - Duration::minutes(1);
        let errors = preview_errors(&f, now);
        for field in ["code", "min_order_value", "usage_limit", "expires_at"] {
            assert!(errors.has(field), "missing error for {field}");
        }
        f = form(10);
        f.code = "TEN CHARS".into();
        assert!(preview_errors(&f, now).has("code"));
    }

    #[test]
    fn test_update_rules() {
        let update = DiscountUpdate { percentage: 101, min_order_value: Money::dong(1000), usage_limit: 1 };
        assert!(update.check().is_err());
        let update = DiscountUpdate { percentage: 20, ..update };
        assert!(update.check().is_ok());
    }

    fn code_created_at(created_at: DateTime<Utc>) -> DiscountCode {
        DiscountCode {
            id: "d1".into(),
            code: "TET".into(),
            percentage: 10,
            min_order_value: Money::dong(1000),
            expires_at: created_at + Duration::days(30),
            usage_limit: 10,
            used_count: 3,
            created_at,
            updated_at: None,
        }
    }

    #[test]
    fn test_edit_window_ends_at_local_midnight() {
        // 2024-03-10 16:30 UTC is 23:30 in Ho Chi Minh City.
        let created = Utc.with_ymd_and_hms(2024, 3, 10, 16, 30, 0).unwrap();
        let code = code_created_at(created);
        let deadline = code.edit_deadline(Ho_Chi_Minh);
        assert_eq!(deadline, Utc.with_ymd_and_hms(2024, 3, 10, 17, 0, 0).unwrap());
        assert!(code.is_editable(created + Duration::minutes(29), Ho_Chi_Minh));
        assert!(!code.is_editable(created + Duration::minutes(30), Ho_Chi_Minh));
        // Same instant, but still the creation day in UTC.
        assert!(code.is_editable(created + Duration::minutes(45), chrono_tz::UTC));
        assert_eq!(code.remaining_uses(), 7);
        assert!(!code.is_expired(created));
    }

    #[test]
    fn test_code_stamped_ahead_of_local_clock_is_editable() {
        let created = Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap();
        let code = code_created_at(created);
        assert!(code.is_editable(created - Duration::seconds(5), Ho_Chi_Minh));
    }
}
