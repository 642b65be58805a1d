//! Dashboard and statistics

use chrono::NaiveDate;

use crate::api::{paths, Envelope};
use crate::data::{DataLayer, ViewScope};
use crate::domain::aggregates::report::{self, StatCard};
use crate::domain::{DashboardSummary, DateRange, Granularity, RevenuePoint, SalesBucket};
use crate::Result;

#[derive(Debug)]
pub struct DashboardView {
    data: DataLayer,
    scope: ViewScope,
    pub summary: DashboardSummary,
    pub revenue: Vec<RevenuePoint>,
}

impl DashboardView {
    pub fn new(data: &DataLayer) -> Self {
        Self { data: data.clone(), scope: data.scope("dashboard"), summary: DashboardSummary::default(), revenue: Vec::new() }
    }

    /// Loads the summary and the revenue series concurrently.
    pub async fn load(&mut self, range: DateRange) -> Result<()> {
        let revenue_path = paths::revenue(range.from, range.to);
        let (summary, revenue) = tokio::try_join!(
            self.data.fetch::<Envelope<DashboardSummary>>(&self.scope, paths::DASHBOARD_SUMMARY),
            self.data.fetch::<Envelope<Vec<RevenuePoint>>>(&self.scope, &revenue_path),
        )?;
        self.summary = summary.data.unwrap_or_default();
        self.revenue = revenue.data.unwrap_or_default();
        Ok(())
    }

    pub fn stat_cards(&self) -> Vec<StatCard> { self.summary.stat_cards() }

    /// Revenue chart series, one bucket per day.
    pub fn chart(&self, range: DateRange) -> Vec<SalesBucket> { report::bucket(&self.revenue, range, Granularity::Day) }
}

/// Client-side statistics over a generated series; no backend call.
#[derive(Debug, Clone)]
pub struct StatisticsView {
    points: Vec<RevenuePoint>,
}

impl StatisticsView {
    /// Series covering `range`.
    pub fn sample(range: DateRange) -> Self {
        let days = (range.to - range.from).num_days() + 1;
        let days = u32::try_from(days).unwrap_or(0);
        Self { points: report::sample_series(range.from, days) }
    }

    pub fn with_points(points: Vec<RevenuePoint>) -> Self { Self { points } }

    pub fn buckets(&self, range: DateRange, granularity: Granularity) -> Vec<SalesBucket> {
        report::bucket(&self.points, range, granularity)
    }

    pub fn first_date(&self) -> Option<NaiveDate> { self.points.first().map(|p| p.date) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics_cover_range() {
        let from = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let range = DateRange::new(from, to).unwrap();
        let view = StatisticsView::sample(range);
        assert_eq!(view.first_date(), Some(from));
        assert_eq!(view.buckets(range, Granularity::Day).len(), 29);
        assert_eq!(view.buckets(range, Granularity::Month).len(), 1);
        assert_eq!(view.buckets(range, Granularity::WeekAggregate).len(), 7);
    }
}
