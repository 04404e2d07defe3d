use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tracing::{info, warn};

use crate::error::{Result, RotapaperError};

pub const MIN_PERIOD: Duration = Duration::from_secs(10);

/// A unit of work repeated by [`run_periodic`].
#[async_trait]
pub trait Cycle: Send {
    async fn run_cycle(&mut self) -> Result<()>;
}

pub fn validate_period(period: Duration) -> Result<()> {
    if period < MIN_PERIOD {
        return Err(RotapaperError::InvalidPeriod(period));
    }
    Ok(())
}

/// Advance `previous` by whole periods until it lies past `now`, and at least
/// one period. Returns the new target and the number of periods skipped.
pub fn next_target(previous: Instant, now: Instant, period: Duration) -> (Instant, u32) {
    let elapsed = now.saturating_duration_since(previous).as_nanos();
    let step = period.as_nanos().max(1);
    let periods = elapsed.div_ceil(step).max(1);
    let periods = u32::try_from(periods).unwrap_or(u32::MAX);
    (previous + period * periods, periods - 1)
}

/// Run `cycle` every `period` until `shutdown` flips to true. With
/// `immediate` the first cycle starts right away instead of one period in.
///
/// Cancellation is only observed while waiting, so a running cycle always
/// completes. A failing cycle is logged and the schedule continues, unless the
/// error says the daemon is gone.
pub async fn run_periodic<C: Cycle + ?Sized>(
    period: Duration,
    cycle: &mut C,
    mut shutdown: watch::Receiver<bool>,
    immediate: bool,
) -> Result<()> {
    validate_period(period)?;
    info!(period_secs = period.as_secs(), immediate, "starting timed rotation");

    let mut target = Instant::now();
    if !immediate {
        target += period;
    }

    loop {
        if *shutdown.borrow_and_update() {
            info!("shutdown requested, stopping rotation");
            return Ok(());
        }

        tokio::select! {
            _ = sleep_until(target) => {}
            _ = shutdown.changed() => {
                info!("shutdown signal received");
                return Ok(());
            }
        }

        match cycle.run_cycle().await {
            Ok(()) => {}
            Err(e) if e.is_fatal_for_schedule() => return Err(e),
            Err(e) => warn!("rotation cycle failed: {e}"),
        }

        let (next, skipped) = next_target(target, Instant::now(), period);
        if skipped > 0 {
            warn!(skipped, "rotation cycle overran, skipping missed ticks");
        }
        target = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sleeps for `work` per cycle and requests shutdown after `limit` runs.
    struct TimedCycle {
        work: Duration,
        limit: usize,
        starts: Vec<Instant>,
        ends: Vec<Instant>,
        fail_with: Option<fn() -> RotapaperError>,
        shutdown: watch::Sender<bool>,
    }

    impl TimedCycle {
        fn new(work: Duration, limit: usize) -> (Self, watch::Receiver<bool>) {
            let (tx, rx) = watch::channel(false);
            let cycle = Self {
                work,
                limit,
                starts: Vec::new(),
                ends: Vec::new(),
                fail_with: None,
                shutdown: tx,
            };
            (cycle, rx)
        }
    }

    #[async_trait]
    impl Cycle for TimedCycle {
        async fn run_cycle(&mut self) -> Result<()> {
            self.starts.push(Instant::now());
            tokio::time::sleep(self.work).await;
            self.ends.push(Instant::now());
            if self.ends.len() >= self.limit {
                let _ = self.shutdown.send(true);
            }
            match self.fail_with {
                Some(make) => Err(make()),
                None => Ok(()),
            }
        }
    }

    fn protocol_failure() -> RotapaperError {
        RotapaperError::protocol("preload", b"nope".to_vec())
    }

    fn daemon_gone() -> RotapaperError {
        RotapaperError::DaemonUnavailable("socket gone".into())
    }

    #[test]
    fn test_validate_period() {
        assert!(validate_period(Duration::from_secs(10)).is_ok());
        assert!(validate_period(Duration::from_secs(3600)).is_ok());
        assert!(matches!(
            validate_period(Duration::from_secs(5)),
            Err(RotapaperError::InvalidPeriod(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_target() {
        let period = Duration::from_secs(10);
        let t0 = Instant::now();

        assert_eq!(next_target(t0, t0, period), (t0 + period, 0));
        assert_eq!(
            next_target(t0, t0 + Duration::from_secs(3), period),
            (t0 + period, 0)
        );
        assert_eq!(
            next_target(t0, t0 + Duration::from_secs(10), period),
            (t0 + period, 0)
        );
        assert_eq!(
            next_target(t0, t0 + Duration::from_secs(13), period),
            (t0 + Duration::from_secs(20), 1)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_drift_stays_within_one_cycle() {
        let (mut cycle, rx) = TimedCycle::new(Duration::from_secs(3), 5);
        let start = Instant::now();

        run_periodic(Duration::from_secs(10), &mut cycle, rx, false).await.unwrap();

        assert_eq!(cycle.starts.len(), 5);
        let offsets: Vec<u64> = cycle.starts.iter().map(|t| (*t - start).as_secs()).collect();
        assert_eq!(offsets, vec![10, 20, 30, 40, 50]);
        let drift = (*cycle.ends.last().unwrap() - start) - Duration::from_secs(50);
        assert!(drift <= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrun_skips_to_next_period_boundary() {
        let (mut cycle, rx) = TimedCycle::new(Duration::from_secs(25), 3);
        let start = Instant::now();

        run_periodic(Duration::from_secs(10), &mut cycle, rx, false).await.unwrap();

        let offsets: Vec<u64> = cycle.starts.iter().map(|t| (*t - start).as_secs()).collect();
        assert_eq!(offsets, vec![10, 40, 70]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_period_rejected_before_any_cycle() {
        let (mut cycle, rx) = TimedCycle::new(Duration::ZERO, 1);
        let err = run_periodic(Duration::from_secs(5), &mut cycle, rx, false)
            .await
            .unwrap_err();
        assert!(matches!(err, RotapaperError::InvalidPeriod(_)));
        assert!(cycle.starts.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_waiting() {
        let (mut cycle, _) = TimedCycle::new(Duration::ZERO, usize::MAX);
        let (tx, rx) = watch::channel(false);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(25)).await;
            let _ = tx.send(true);
        });

        run_periodic(Duration::from_secs(10), &mut cycle, rx, false).await.unwrap();
        assert_eq!(cycle.starts.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_protocol_errors_do_not_stop_schedule() {
        let (mut cycle, rx) = TimedCycle::new(Duration::from_secs(1), 3);
        cycle.fail_with = Some(protocol_failure);

        run_periodic(Duration::from_secs(10), &mut cycle, rx, false).await.unwrap();
        assert_eq!(cycle.starts.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_start_keeps_period_grid() {
        let (mut cycle, rx) = TimedCycle::new(Duration::from_secs(2), 3);
        let start = Instant::now();

        run_periodic(Duration::from_secs(10), &mut cycle, rx, true)
            .await
            .unwrap();

        let offsets: Vec<u64> = cycle.starts.iter().map(|t| (*t - start).as_secs()).collect();
        assert_eq!(offsets, vec![0, 10, 20]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_first_cycle_keeps_schedule_running() {
        let (mut cycle, rx) = TimedCycle::new(Duration::from_secs(1), 2);
        cycle.fail_with = Some(protocol_failure);
        let start = Instant::now();

        run_periodic(Duration::from_secs(10), &mut cycle, rx, true)
            .await
            .unwrap();

        let offsets: Vec<u64> = cycle.starts.iter().map(|t| (*t - start).as_secs()).collect();
        assert_eq!(offsets, vec![0, 10]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_daemon_loss_ends_schedule() {
        let (mut cycle, rx) = TimedCycle::new(Duration::from_secs(1), 3);
        cycle.fail_with = Some(daemon_gone);

        let err = run_periodic(Duration::from_secs(10), &mut cycle, rx, false)
            .await
            .unwrap_err();
        assert!(matches!(err, RotapaperError::DaemonUnavailable(_)));
        assert_eq!(cycle.starts.len(), 1);
    }
}
