//! Recurring timers that feed ticks into the manager queue.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc::WeakUnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

/// Sends `make()` into the queue every `period`. A tick is skipped while the
/// previous one has not been acknowledged with [`Ticker::finish_tick`].
///
/// Holds only a weak sender so a running ticker never keeps the queue alive.
pub(crate) struct Ticker<C> {
    handle: JoinHandle<()>,
    in_flight: Arc<AtomicBool>,
    _command: std::marker::PhantomData<fn() -> C>,
}

impl<C: Send + 'static> Ticker<C> {
    pub(crate) fn start(period: Duration, tx: WeakUnboundedSender<C>, make: fn() -> C) -> Self {
        let in_flight = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&in_flight);
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if flag.swap(true, Ordering::AcqRel) {
                    continue;
                }
                let Some(tx) = tx.upgrade() else { break };
                if tx.send(make()).is_err() {
                    break;
                }
            }
        });
        Self {
            handle,
            in_flight,
            _command: std::marker::PhantomData,
        }
    }

    pub(crate) fn finish_tick(&self) {
        self.in_flight.store(false, Ordering::Release);
    }

    pub(crate) fn stop(self) {
        self.handle.abort();
    }
}
