use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use super::{LifecycleState, Participant, Settlement};
use crate::traits::{MessageTransport, RandomSource, StateStore, TimeProvider};

/// What the shutdown sequence managed to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Owned auctions closed during shutdown, with their settlement.
    pub settlements: Vec<Settlement>,
    pub farewells_sent: usize,
    /// Steps that failed and were skipped.
    pub failures: usize,
    /// Set when the participant was already shutting down or dead.
    pub already_terminated: bool,
}

impl<T, C, R, S> Participant<T, C, R, S>
where
    T: MessageTransport + 'static,
    C: TimeProvider + 'static,
    R: RandomSource + 'static,
    S: StateStore + 'static,
{
    /// Close owned auctions, say farewell to every peer, release resources.
    ///
    /// Every step is best effort: failures are logged and the sequence
    /// continues. Always ends DEAD.
    pub async fn shutdown(self: &Arc<Self>) -> ShutdownReport {
        let _tick = self.tick_lock.lock().await;
        let mut report = ShutdownReport::default();

        let was_listening = {
            let mut lifecycle = self.lifecycle.write();
            if lifecycle.is_terminating() {
                report.already_terminated = true;
                return report;
            }
            let was_listening = *lifecycle != LifecycleState::Born;
            *lifecycle = LifecycleState::Dying;
            was_listening
        };
        info!("[{}] shutting down", self.display_id());

        let owned = self.inspect(|state| state.registry.owned_ids());
        for auction_id in owned {
            match self.close_auction(&auction_id).await {
                Ok(settlement) => {
                    if matches!(settlement, Settlement::Failed { .. }) {
                        report.failures += 1;
                    }
                    report.settlements.push(settlement);
                }
                Err(e) => {
                    report.failures += 1;
                    warn!("[{}] could not close {}: {}", self.display_id(), auction_id, e);
                }
            }
        }

        let peers = self.inspect(|state| state.peers.keys());
        let mut farewells = JoinSet::new();
        for peer in peers {
            let this = Arc::clone(self);
            farewells.spawn(async move { (peer, this.say_farewell(peer).await) });
        }
        while let Some(joined) = farewells.join_next().await {
            match joined {
                Ok((_, Ok(()))) => report.farewells_sent += 1,
                Ok((peer, Err(e))) => {
                    report.failures += 1;
                    warn!("[{}] farewell to {} failed: {}", self.display_id(), peer.short(), e);
                }
                Err(e) => {
                    report.failures += 1;
                    error!("[{}] farewell task panicked: {}", self.display_id(), e);
                }
            }
        }

        self.checkpoint().await;

        if was_listening {
            if let Err(e) = self.transport.close(&self.public_key()).await {
                report.failures += 1;
                warn!("[{}] teardown of transport failed: {}", self.display_id(), e);
            }
        }
        if let Err(e) = self.store.close().await {
            report.failures += 1;
            warn!("[{}] teardown of storage failed: {}", self.display_id(), e);
        }

        *self.lifecycle.write() = LifecycleState::Dead;
        info!(
            "[{}] dead ({} auctions settled, {} farewells, {} failures)",
            self.display_id(),
            report.settlements.len(),
            report.farewells_sent,
            report.failures
        );
        report
    }
}
