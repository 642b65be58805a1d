//! Dashboard aggregates and sales statistics bucketing

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use crate::domain::value_objects::Money;

/// Pre-aggregated summary returned by the backend.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSummary {
    pub total_orders: u64,
    pub pending_orders: u64,
    pub completed_orders: u64,
    pub canceled_orders: u64,
    pub total_revenue: Money,
    pub total_products: u64,
    pub total_users: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatCard { pub label: &'static str, pub value: String }

impl DashboardSummary {
    pub fn stat_cards(&self) -> Vec<StatCard> {
        vec![
            StatCard { label: "Revenue", value: self.total_revenue.format() },
            StatCard { label: "Orders", value: self.total_orders.to_string() },
            StatCard { label: "Pending", value: self.pending_orders.to_string() },
            StatCard { label: "Completed", value: self.completed_orders.to_string() },
            StatCard { label: "Canceled", value: self.canceled_orders.to_string() },
            StatCard { label: "Products", value: self.total_products.to_string() },
            StatCard { label: "Users", value: self.total_users.to_string() },
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RevenuePoint {
    pub date: NaiveDate,
    pub revenue: Money,
    #[serde(default)]
    pub orders: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Granularity {
    #[default]
    Day,
    /// One bucket per ISO week.
    Week,
    /// Totals per weekday across the whole range.
    WeekAggregate,
    Month,
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "weekday" | "week-aggregate" => Ok(Self::WeekAggregate),
            "month" => Ok(Self::Month),
            other => Err(format!("unknown granularity '{other}'")),
        }
    }
}

/// Inclusive date range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange { pub from: NaiveDate, pub to: NaiveDate }

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Option<Self> { (from <= to).then_some(Self { from, to }) }
    pub fn contains(&self, date: NaiveDate) -> bool { self.from <= date && date <= self.to }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SalesBucket { pub key: String, pub revenue: Money, pub orders: u32 }

impl fmt::Display for SalesBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<10} {:>16} {:>6}", self.key, self.revenue.format(), self.orders)
    }
}

fn bucket_key(date: NaiveDate, granularity: Granularity) -> (String, String) {
    match granularity {
        Granularity::Day => { let k = date.format("%Y-%m-%d").to_string(); (k.clone(), k) }
        Granularity::Week => { let k = date.format("%G-W%V").to_string(); (k.clone(), k) }
        Granularity::Month => { let k = date.format("%Y-%m").to_string(); (k.clone(), k) }
        Granularity::WeekAggregate => {
            let weekday = date.weekday();
            (weekday.num_days_from_monday().to_string(), date.format("%a").to_string())
        }
    }
}

/// Groups points inside `range` by the formatted key of `granularity`.
///
/// Output is ordered chronologically, or Monday first for weekday totals.
pub fn bucket(points: &[RevenuePoint], range: DateRange, granularity: Granularity) -> Vec<SalesBucket> {
    let mut grouped: BTreeMap<String, SalesBucket> = BTreeMap::new();
    for p in points.iter().filter(|p| range.contains(p.date)) {
        let (sort_key, label) = bucket_key(p.date, granularity);
        let entry = grouped.entry(sort_key).or_insert_with(|| SalesBucket { key: label, revenue: Money::zero(), orders: 0 });
        entry.revenue = entry.revenue + p.revenue;
        entry.orders += p.orders;
    }
    grouped.into_values().collect()
}

/// Deterministic demo series for the statistics screen.
pub fn sample_series(start: NaiveDate, days: u32) -> Vec<RevenuePoint> {
    (0..days)
        .map(|i| {
            let date = start + Duration::days(i64::from(i));
            let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
            let orders = 8 + (i * 7 % 13) + if weekend { 6 } else { 0 };
            RevenuePoint { date, revenue: Money::dong(i64::from(orders) * 185_000), orders }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, day).unwrap() }

    fn point(date: NaiveDate, revenue: i64, orders: u32) -> RevenuePoint {
        RevenuePoint { date, revenue: Money::dong(revenue), orders }
    }

    #[test]
    fn test_bucket_by_day_and_range() {
        let points = vec![point(d(2024, 1, 1), 100, 1), point(d(2024, 1, 2), 200, 2), point(d(2024, 1, 1), 50, 1), point(d(2024, 2, 1), 999, 9)];
        let range = DateRange::new(d(2024, 1, 1), d(2024, 1, 31)).unwrap();
        let buckets = bucket(&points, range, Granularity::Day);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0], SalesBucket { key: "2024-01-01".into(), revenue: Money::dong(150), orders: 2 });
        assert_eq!(buckets[1].key, "2024-01-02");
    }

    #[test]
    fn test_bucket_by_week_month_and_weekday() {
        // 2024-01-01 is a Monday.
        let points: Vec<_> = (0..14).map(|i| point(d(2024, 1, 1) + Duration::days(i), 10, 1)).collect();
        let range = DateRange::new(d(2024, 1, 1), d(2024, 12, 31)).unwrap();

        let weeks = bucket(&points, range, Granularity::Week);
        assert_eq!(weeks.iter().map(|b| b.key.as_str()).collect::<Vec<_>>(), ["2024-W01", "2024-W02"]);
        assert!(weeks.iter().all(|b| b.orders == 7));

        let months = bucket(&points, range, Granularity::Month);
        assert_eq!(months.len(), 1);
        assert_eq!(months[0].revenue, Money::dong(140));

        let weekdays = bucket(&points, range, Granularity::WeekAggregate);
        assert_eq!(weekdays.len(), 7);
        assert_eq!(weekdays[0].key, "Mon");
        assert_eq!(weekdays[6].key, "Sun");
        assert!(weekdays.iter().all(|b| b.orders == 2));
    }

    #[test]
    fn test_sample_series_and_cards() {
        let series = sample_series(d(2024, 3, 1), 31);
        assert_eq!(series.len(), 31);
        assert_eq!(series, sample_series(d(2024, 3, 1), 31));
        assert!(DateRange::new(d(2024, 3, 2), d(2024, 3, 1)).is_none());

        let summary = DashboardSummary { total_orders: 12, total_revenue: Money::dong(3_500_000), ..Default::default() };
        let cards = summary.stat_cards();
        assert_eq!(cards[0].value, "3.500.000 ₫");
        assert_eq!(cards[1].value, "12");
    }
}
