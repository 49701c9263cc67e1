//! Daily expiry sweep
//!
//! Boosts whose window has ended are marked `EXPIRED` and their events lose
//! the `boosted` flag, unless another boost on the same event is still running.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use chrono::{DateTime, Days, NaiveTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use linkup_types::{EventId, PromotionKind, SponsorshipId};

use crate::error::PaymentsResult;
use crate::ledger::Ledger;

const SWEEP_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Result of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Sponsorships moved to `EXPIRED`
    pub expired: u64,
    /// Events whose `boosted` flag was cleared
    pub unboosted: u64,
}

/// Expires lapsed boosts
#[derive(Clone)]
pub struct ExpirySweep {
    ledger: Ledger,
}

impl ExpirySweep {
    /// Create a new sweep
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    /// Expire every boost that lapsed at or before `now`
    #[instrument(skip(self))]
    pub async fn run_once(&self, now: DateTime<Utc>) -> PaymentsResult<SweepReport> {
        let lapsed = self
            .ledger
            .sponsorships
            .find_lapsed(PromotionKind::Boosted, now)
            .await?;

        if lapsed.is_empty() {
            return Ok(SweepReport::default());
        }

        let ids: Vec<SponsorshipId> = lapsed.iter().map(|s| s.id).collect();
        let expired = self.ledger.sponsorships.mark_expired(&ids).await?;

        let mut to_clear = Vec::new();
        let events: BTreeSet<EventId> = lapsed.iter().map(|s| s.event_id).collect();
        for event_id in events {
            if !self
                .ledger
                .sponsorships
                .has_active_on_event(event_id, PromotionKind::Boosted, now)
                .await?
            {
                to_clear.push(event_id);
            }
        }
        let unboosted = self.ledger.events.clear_boosted(&to_clear).await?;

        metrics::counter!("payments_sponsorships_expired_total").increment(expired);
        info!(expired, unboosted, "Expiry sweep finished");

        Ok(SweepReport { expired, unboosted })
    }

    /// Run at every UTC midnight until the task is aborted
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                // Re-anchored each day so sweep duration never accumulates
                let wait = until_next_midnight(Utc::now());
                debug!(next_run_in_secs = wait.as_secs(), "Expiry sweep scheduled");
                tokio::time::sleep(wait).await;

                let start = Instant::now();
                let result = self.run_once(Utc::now()).await;
                let label = if result.is_ok() { "success" } else { "error" };
                if let Err(e) = result {
                    error!(error = %e, "Expiry sweep failed");
                }
                metrics::histogram!(
                    "payments_operation_duration_seconds",
                    "operation" => "expiry_sweep",
                    "result" => label
                )
                .record(start.elapsed().as_secs_f64());
            }
        })
    }
}

/// Time from `now` to the next UTC midnight
pub fn until_next_midnight(now: DateTime<Utc>) -> Duration {
    let next = now
        .date_naive()
        .checked_add_days(Days::new(1))
        .map(|day| day.and_time(NaiveTime::MIN).and_utc());

    match next {
        Some(next) => (next - now).to_std().unwrap_or(SWEEP_PERIOD),
        None => SWEEP_PERIOD,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_until_next_midnight() {
        let now = Utc.with_ymd_and_hms(2026, 5, 10, 22, 30, 0).unwrap();
        assert_eq!(until_next_midnight(now), Duration::from_secs(90 * 60));

        let midnight = Utc.with_ymd_and_hms(2026, 5, 10, 0, 0, 0).unwrap();
        assert_eq!(until_next_midnight(midnight), SWEEP_PERIOD);
    }

    #[test]
    fn test_slow_sweep_still_lands_on_midnight() {
        // A sweep started at midnight that took 90s schedules the next run for
        // the following midnight, not 90s past it
        let finished = Utc.with_ymd_and_hms(2026, 5, 11, 0, 1, 30).unwrap();
        let wait = until_next_midnight(finished);
        assert_eq!(wait, SWEEP_PERIOD - Duration::from_secs(90));

        let next_run = finished + chrono::Duration::from_std(wait).unwrap();
        assert_eq!(next_run, Utc.with_ymd_and_hms(2026, 5, 12, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_until_next_midnight_crosses_year() {
        let now = Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(until_next_midnight(now), Duration::from_secs(1));
    }
}
