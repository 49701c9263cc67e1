//! In-memory reporting queries

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};

use linkup_types::{BookingStatus, EventId, PaymentStatus, PromotionKind, SponsorStatus, Sponsorship};

use super::MemoryStore;
use crate::error::DbResult;
use crate::repo::{
    AnalyticsRepository, CountSubject, HostRevenue, MonthlyRevenue, PurchaseTotals, RevenueSource,
};

fn after(at: DateTime<Utc>, since: Option<DateTime<Utc>>) -> bool {
    since.map_or(true, |since| at >= since)
}

fn within(at: DateTime<Utc>, from: DateTime<Utc>, to: Option<DateTime<Utc>>) -> bool {
    at >= from && to.map_or(true, |to| at < to)
}

impl MemoryStore {
    fn booking_amount(&self, payment_id: Option<linkup_types::PaymentId>) -> i64 {
        payment_id
            .and_then(|id| self.payments.get(&id).map(|p| p.amount_cents))
            .unwrap_or(0)
    }
}

#[async_trait]
impl AnalyticsRepository for MemoryStore {
    async fn count(&self, subject: CountSubject, since: Option<DateTime<Utc>>) -> DbResult<i64> {
        let count = match subject {
            CountSubject::Events => self
                .events
                .iter()
                .filter(|e| after(e.created_at, since))
                .count(),
            CountSubject::Users => self
                .users
                .iter()
                .filter(|u| after(u.created_at, since))
                .count(),
            CountSubject::ApprovedSponsorships => self
                .sponsorships
                .iter()
                .filter(|s| s.status == SponsorStatus::Approved && after(s.created_at, since))
                .count(),
        };
        Ok(count as i64)
    }

    async fn confirmed_booking_revenue(&self, since: Option<DateTime<Utc>>) -> DbResult<i64> {
        Ok(self
            .bookings
            .iter()
            .filter(|b| b.status == BookingStatus::Confirmed && after(b.created_at, since))
            .map(|b| self.booking_amount(b.payment_id))
            .sum())
    }

    async fn top_hosts(&self, limit: u32) -> DbResult<Vec<HostRevenue>> {
        let mut event_counts: HashMap<_, i64> = HashMap::new();
        let mut hosts_by_event = HashMap::new();
        for event in self.events.iter() {
            *event_counts.entry(event.host_id).or_default() += 1;
            hosts_by_event.insert(event.id, event.host_id);
        }

        let mut revenue: HashMap<_, i64> = HashMap::new();
        for booking in self.bookings.iter() {
            if booking.status != BookingStatus::Confirmed {
                continue;
            }
            if let Some(host) = hosts_by_event.get(&booking.event_id) {
                *revenue.entry(*host).or_default() += self.booking_amount(booking.payment_id);
            }
        }

        let mut hosts: Vec<HostRevenue> = event_counts
            .into_iter()
            .filter_map(|(host_id, event_count)| {
                let user = self.users.get(&host_id)?;
                Some(HostRevenue {
                    host_id,
                    full_name: user.full_name.clone(),
                    event_count,
                    total_revenue_cents: revenue.get(&host_id).copied().unwrap_or(0),
                })
            })
            .collect();
        hosts.sort_by(|a, b| {
            b.total_revenue_cents
                .cmp(&a.total_revenue_cents)
                .then(a.host_id.cmp(&b.host_id))
        });
        hosts.truncate(limit as usize);
        Ok(hosts)
    }

    async fn monthly_revenue(
        &self,
        source: RevenueSource,
        since: DateTime<Utc>,
    ) -> DbResult<Vec<MonthlyRevenue>> {
        let mut totals: HashMap<u32, i64> = HashMap::new();
        match source {
            RevenueSource::Booking => {
                for p in self.payments.iter() {
                    let is_booking = matches!(p.owner, linkup_types::PaymentOwner::Booking(_));
                    if is_booking && p.status == PaymentStatus::Paid && p.created_at >= since {
                        *totals.entry(p.created_at.month()).or_default() += p.amount_cents;
                    }
                }
            }
            RevenueSource::Sponsorship => {
                for s in self.sponsorships.iter() {
                    let Some(start) = s.start_date else { continue };
                    if s.status == SponsorStatus::Approved && start >= since {
                        *totals.entry(start.month()).or_default() += s.amount_cents;
                    }
                }
            }
        }

        let mut rows: Vec<MonthlyRevenue> = totals
            .into_iter()
            .map(|(month, total_cents)| MonthlyRevenue { month, total_cents })
            .collect();
        rows.sort_by_key(|r| r.month);
        Ok(rows)
    }

    async fn approved_sponsorships_between(
        &self,
        kind: PromotionKind,
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<Sponsorship>> {
        Ok(self
            .sponsorships
            .iter()
            .filter(|s| {
                s.kind == kind
                    && s.status == SponsorStatus::Approved
                    && within(s.created_at, from, to)
            })
            .map(|s| s.value().clone())
            .collect())
    }

    async fn confirmed_bookings_between(
        &self,
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
    ) -> DbResult<PurchaseTotals> {
        let mut totals = PurchaseTotals::default();
        for booking in self.bookings.iter() {
            if booking.status == BookingStatus::Confirmed && within(booking.created_at, from, to) {
                totals.count += 1;
                totals.revenue_cents += self.booking_amount(booking.payment_id);
            }
        }
        Ok(totals)
    }

    async fn top_booked_event(
        &self,
        among: Option<&[EventId]>,
        confirmed_only: bool,
    ) -> DbResult<Option<String>> {
        let mut counts: HashMap<EventId, i64> = HashMap::new();
        for booking in self.bookings.iter() {
            if confirmed_only && booking.status != BookingStatus::Confirmed {
                continue;
            }
            if among.is_some_and(|ids| !ids.contains(&booking.event_id)) {
                continue;
            }
            *counts.entry(booking.event_id).or_default() += 1;
        }

        let top = counts
            .into_iter()
            .max_by(|(a_id, a), (b_id, b)| a.cmp(b).then(b_id.cmp(a_id)))
            .map(|(id, _)| id);

        Ok(top.and_then(|id| self.event(id)).map(|event| event.title))
    }
}
