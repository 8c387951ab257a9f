//! Drives participants: one periodic tick loop each, plus coordinated shutdown.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::participant::{Participant, ShutdownReport, TickOutcome};
use crate::traits::{MessageTransport, RandomSource, StateStore, TimeProvider};

pub struct Scheduler<T, C, R, S>
where
    T: MessageTransport,
    C: TimeProvider,
    R: RandomSource,
    S: StateStore,
{
    participants: Vec<Arc<Participant<T, C, R, S>>>,
    tick_interval: Duration,
    start_delay: Duration,
    token: CancellationToken,
    loops: JoinSet<()>,
}

impl<T, C, R, S> Scheduler<T, C, R, S>
where
    T: MessageTransport + 'static,
    C: TimeProvider + 'static,
    R: RandomSource + 'static,
    S: StateStore + 'static,
{
    pub fn new(tick_interval: Duration, start_delay: Duration) -> Self {
        Self {
            participants: Vec::new(),
            tick_interval,
            start_delay,
            token: CancellationToken::new(),
            loops: JoinSet::new(),
        }
    }

    pub fn participants(&self) -> &[Arc<Participant<T, C, R, S>>] {
        &self.participants
    }

    /// Start driving an initialised participant.
    ///
    /// After the start delay the participant becomes LIVING and ticks every
    /// `tick_interval`. Ticks of one participant never overlap: a tick that
    /// is due while the previous one still runs is dropped.
    pub fn spawn(&mut self, participant: Arc<Participant<T, C, R, S>>) {
        let token = self.token.clone();
        let tick_interval = self.tick_interval;
        let start_delay = self.start_delay;
        let p = Arc::clone(&participant);
        self.participants.push(participant);

        self.loops.spawn(async move {
            tokio::select! {
                () = token.cancelled() => return,
                () = tokio::time::sleep(start_delay) => {}
            }
            if let Err(e) = p.start_living() {
                error!("[{}] cannot start: {}", p.display_id(), e);
                return;
            }

            let mut interval = tokio::time::interval(tick_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut tick_count: u64 = 0;
            loop {
                tokio::select! {
                    () = token.cancelled() => {
                        debug!("[{}] tick loop stopping", p.display_id());
                        break;
                    }
                    _ = interval.tick() => {}
                }
                tick_count = tick_count.wrapping_add(1);
                match p.participate().await {
                    TickOutcome::Ran(report) => debug!(
                        "[{}] tick {}: {} greeted, {} pulled, {} failures, auction {:?}",
                        p.display_id(),
                        tick_count,
                        report.greeted,
                        report.pulled,
                        report.failures,
                        report.auction
                    ),
                    TickOutcome::Skipped => {}
                    TickOutcome::ShutDown(_) | TickOutcome::Dead => break,
                }
            }
        });
    }

    /// Stop all tick loops, then shut every participant down concurrently.
    pub async fn shutdown_all(&mut self) -> Vec<ShutdownReport> {
        info!("stopping {} participants", self.participants.len());
        self.token.cancel();
        while let Some(joined) = self.loops.join_next().await {
            if let Err(e) = joined {
                warn!("tick loop ended abnormally: {}", e);
            }
        }

        let mut shutdowns = JoinSet::new();
        for participant in &self.participants {
            let p = Arc::clone(participant);
            shutdowns.spawn(async move { p.shutdown().await });
        }
        let mut reports = Vec::with_capacity(self.participants.len());
        while let Some(joined) = shutdowns.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(e) => error!("shutdown task panicked: {}", e),
            }
        }
        reports
    }
}
