//! Admin dashboard aggregates
//!
//! Read-only reporting over the ledger. Independent facets are queried
//! concurrently and joined.

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use tracing::instrument;

use linkup_db::{CountSubject, HostRevenue, PurchaseTotals, RevenueSource};
use linkup_types::{EventId, PromotionKind, UserId};

use crate::error::{PaymentsError, PaymentsResult};
use crate::ledger::Ledger;

/// Hosts listed in the leaderboard
pub const TOP_HOSTS: u32 = 5;
/// Placeholder when no event qualifies as top event
pub const NO_EVENT: &str = "No event found";

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Growth of the last week relative to everything before it
///
/// Reported as a flat 100 when the last week is empty or nothing preceded it.
pub fn weekly_delta(total: i64, last_week: i64) -> f64 {
    let before = total - last_week;
    if last_week == 0 || before <= 0 {
        return 100.0;
    }
    round2(last_week as f64 / before as f64 * 100.0)
}

/// Percentage change from `previous` to `current`
///
/// A flat 100 whenever the previous period is empty.
pub fn increase_percent(current: i64, previous: i64) -> f64 {
    if previous == 0 {
        return 100.0;
    }
    round2((current - previous) as f64 / previous as f64 * 100.0)
}

/// Start of the week (Sunday 00:00 UTC) containing `now`
pub fn week_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let days_back = i64::from(now.weekday().num_days_from_sunday());
    (now.date_naive() - Duration::days(days_back))
        .and_time(NaiveTime::MIN)
        .and_utc()
}

/// First day of the month eleven months before `now`'s month
pub fn revenue_window_start(now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let months = now.year() * 12 + now.month0() as i32 - 11;
    let (year, month0) = (months.div_euclid(12), months.rem_euclid(12));
    Utc.with_ymd_and_hms(year, month0 as u32 + 1, 1, 0, 0, 0).single()
}

/// One stats facet
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatFacet {
    pub total: i64,
    pub last_week: i64,
    pub delta: f64,
}

impl StatFacet {
    fn new(total: i64, last_week: i64) -> Self {
        Self {
            total,
            last_week,
            delta: weekly_delta(total, last_week),
        }
    }
}

/// Headline dashboard numbers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub events: StatFacet,
    pub users: StatFacet,
    pub sponsorships: StatFacet,
    /// Confirmed booking revenue in cents
    pub revenue: StatFacet,
    pub top_hosts: Vec<TopHost>,
}

/// Leaderboard entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopHost {
    pub host_id: UserId,
    pub full_name: String,
    pub event_count: i64,
    pub total_revenue_cents: i64,
}

impl From<HostRevenue> for TopHost {
    fn from(host: HostRevenue) -> Self {
        Self {
            host_id: host.host_id,
            full_name: host.full_name,
            event_count: host.event_count,
            total_revenue_cents: host.total_revenue_cents,
        }
    }
}

/// Revenue of one calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthRevenue {
    pub month: &'static str,
    pub total_cents: i64,
}

/// Product line reported by weekly analytics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticsProduct {
    Sponsored,
    Boosted,
    Bookings,
}

impl std::str::FromStr for AnalyticsProduct {
    type Err = PaymentsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sponsored" => Ok(Self::Sponsored),
            "boosted" | "boost" => Ok(Self::Boosted),
            "bookings" | "booking" => Ok(Self::Bookings),
            other => Err(PaymentsError::BadRequest(format!(
                "unknown analytics product: {other}"
            ))),
        }
    }
}

/// This week's numbers for one product line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyAnalytics {
    pub product: AnalyticsProduct,
    pub revenue_cents: i64,
    pub purchases: i64,
    /// Average purchase in cents
    pub average_cents: f64,
    /// Purchase growth over the previous week
    pub increase_percent: f64,
    pub top_event: String,
}

/// Dashboard aggregator
#[derive(Clone)]
pub struct Dashboard {
    ledger: Ledger,
}

impl Dashboard {
    /// Create a new dashboard
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    /// Totals, last-7-day counts and deltas plus the host leaderboard
    #[instrument(skip(self))]
    pub async fn stats(&self, now: DateTime<Utc>) -> PaymentsResult<DashboardStats> {
        let since = Some(now - Duration::days(7));
        let analytics = &self.ledger.analytics;

        let (
            events,
            events_week,
            users,
            users_week,
            sponsorships,
            sponsorships_week,
            revenue,
            revenue_week,
            hosts,
        ) = tokio::try_join!(
            analytics.count(CountSubject::Events, None),
            analytics.count(CountSubject::Events, since),
            analytics.count(CountSubject::Users, None),
            analytics.count(CountSubject::Users, since),
            analytics.count(CountSubject::ApprovedSponsorships, None),
            analytics.count(CountSubject::ApprovedSponsorships, since),
            analytics.confirmed_booking_revenue(None),
            analytics.confirmed_booking_revenue(since),
            analytics.top_hosts(TOP_HOSTS),
        )?;

        Ok(DashboardStats {
            events: StatFacet::new(events, events_week),
            users: StatFacet::new(users, users_week),
            sponsorships: StatFacet::new(sponsorships, sponsorships_week),
            revenue: StatFacet::new(revenue, revenue_week),
            top_hosts: hosts.into_iter().map(TopHost::from).collect(),
        })
    }

    /// Revenue for the last twelve months, oldest first, zero-filled
    #[instrument(skip(self))]
    pub async fn monthly_revenue(
        &self,
        source: RevenueSource,
        now: DateTime<Utc>,
    ) -> PaymentsResult<Vec<MonthRevenue>> {
        let since = revenue_window_start(now)
            .ok_or_else(|| PaymentsError::Internal("revenue window out of range".into()))?;
        let rows = self.ledger.analytics.monthly_revenue(source, since).await?;

        let mut by_month = [0i64; 12];
        for row in rows {
            if let Some(slot) = row.month.checked_sub(1).and_then(|i| by_month.get_mut(i as usize)) {
                *slot += row.total_cents;
            }
        }

        let first = since.month0() as usize;
        Ok((0..12)
            .map(|offset| {
                let index = (first + offset) % 12;
                MonthRevenue {
                    month: MONTH_NAMES[index],
                    total_cents: by_month[index],
                }
            })
            .collect())
    }

    /// This week's revenue, purchases and top event for a product line
    #[instrument(skip(self))]
    pub async fn weekly_analytics(
        &self,
        product: AnalyticsProduct,
        now: DateTime<Utc>,
    ) -> PaymentsResult<WeeklyAnalytics> {
        let this_week = week_start(now);
        let last_week = now - Duration::days(7);
        let analytics = &self.ledger.analytics;

        let (current, previous, top_event) = match product {
            AnalyticsProduct::Sponsored | AnalyticsProduct::Boosted => {
                let kind = if product == AnalyticsProduct::Sponsored {
                    PromotionKind::Sponsored
                } else {
                    PromotionKind::Boosted
                };
                let (current, previous) = tokio::try_join!(
                    analytics.approved_sponsorships_between(kind, this_week, None),
                    analytics.approved_sponsorships_between(kind, last_week, Some(this_week)),
                )?;

                let event_ids: Vec<EventId> = current.iter().map(|s| s.event_id).collect();
                let top = analytics.top_booked_event(Some(&event_ids), false).await?;

                let totals = |rows: &[linkup_types::Sponsorship]| PurchaseTotals {
                    count: rows.len() as i64,
                    revenue_cents: rows.iter().map(|s| s.amount_cents).sum(),
                };
                (totals(&current), totals(&previous), top)
            }
            AnalyticsProduct::Bookings => tokio::try_join!(
                analytics.confirmed_bookings_between(this_week, None),
                analytics.confirmed_bookings_between(last_week, Some(this_week)),
                analytics.top_booked_event(None, true),
            )?,
        };

        let average_cents = if current.count > 0 {
            round2(current.revenue_cents as f64 / current.count as f64)
        } else {
            0.0
        };

        Ok(WeeklyAnalytics {
            product,
            revenue_cents: current.revenue_cents,
            purchases: current.count,
            average_cents,
            increase_percent: increase_percent(current.count, previous.count),
            top_event: top_event.unwrap_or_else(|| NO_EVENT.to_string()),
        })
    }
}
