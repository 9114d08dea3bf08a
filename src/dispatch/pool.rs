//! The bounded-concurrency dispatch loop
//!
//! Owns a fixed pool of connection slots, keeps each one saturated with
//! single-key GET requests until a termination bound is reached, then
//! closes the pool and builds the final [`Report`].
//!
//! Every slot event (connect outcomes as well as request completions)
//! funnels through one `FuturesUnordered` consumer, so the counters and
//! slot states are only ever touched from a single logical thread of
//! control and need no synchronization.

use std::future::Future;

use futures::future::LocalBoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, error, trace};

use super::counters::RunCounters;
use super::slot::Slot;
use crate::client::Connection;
use crate::config::HarnessConfig;
use crate::error::{ConnectionError, RequestError};
use crate::report::Report;

/// One event from the pool: a connect outcome or a request completion
enum SlotEvent<C> {
    Connected(usize, Result<C, ConnectionError>),
    Completed(usize, C, Result<Option<Vec<u8>>, RequestError>),
}

/// Bounded-concurrency dispatch loop over a pool of N connection slots
pub struct DispatchLoop<C> {
    slots: Vec<Slot<C>>,
    counters: RunCounters,
    key: String,
    max_requests: Option<u64>,
    max_seconds: Option<f64>,
    finished: bool,
}

impl<C: Connection> DispatchLoop<C> {
    /// Create the pool; the run start time is captured here.
    pub fn new(config: &HarnessConfig) -> Self {
        let mut slots = Vec::with_capacity(config.concurrency);
        for _ in 0..config.concurrency {
            slots.push(Slot::Connecting);
        }
        Self {
            slots,
            counters: RunCounters::new(),
            key: config.key.clone(),
            max_requests: config.max_requests,
            max_seconds: config.max_seconds,
            finished: false,
        }
    }

    /// Drive the run to completion and return the report
    ///
    /// Boots one asynchronous connect per slot through `factory`; each
    /// slot is dispatched as soon as its connect lands and re-armed on
    /// every completion until the termination predicate holds. Returns
    /// exactly once.
    pub async fn run<F, Fut>(mut self, factory: F) -> Report
    where
        F: Fn(usize) -> Fut,
        Fut: Future<Output = Result<C, ConnectionError>>,
    {
        let mut events: FuturesUnordered<LocalBoxFuture<'_, SlotEvent<C>>> =
            FuturesUnordered::new();

        for index in 0..self.slots.len() {
            let connect = factory(index);
            events.push(Box::pin(async move {
                SlotEvent::Connected(index, connect.await)
            }));
        }

        // Single consumer: at most one event body runs at a time. When
        // the stream drains (every slot failed, or the request bound kept
        // all idle slots parked), the run is over as well.
        while let Some(event) = events.next().await {
            match event {
                SlotEvent::Connected(index, Ok(conn)) => {
                    trace!("Slot {} connected", index);
                    if !self.slots[index].connected(conn) {
                        error!(
                            "Connect landed on {} slot {}",
                            self.slots[index].state_name(),
                            index
                        );
                        debug_assert!(false, "connect outcome for non-connecting slot");
                        continue;
                    }
                    self.dispatch(index, &mut events);
                }
                SlotEvent::Connected(index, Err(e)) => {
                    // Not fatal: the run continues with reduced concurrency
                    error!("Could not connect slot {}: {}", index, e);
                    self.slots[index] = Slot::Failed;
                }
                SlotEvent::Completed(index, conn, result) => {
                    trace!("Receiving using slot {}", index);
                    match result {
                        Ok(_value) => self.counters.record_success(),
                        Err(e) => {
                            error!("Received error: {}", e);
                            self.counters.record_error();
                        }
                    }
                    if !self.slots[index].land(conn) {
                        error!(
                            "Completion for {} slot {}",
                            self.slots[index].state_name(),
                            index
                        );
                        debug_assert!(false, "completion for slot not in flight");
                        continue;
                    }
                    // Evaluated only here, never preemptively mid-flight
                    if self.terminated() {
                        break;
                    }
                    self.dispatch(index, &mut events);
                }
            }
        }

        // Dropping `events` drops any still-outstanding request futures;
        // their late responses are never observed.
        drop(events);
        self.finish().await
    }

    /// Issue the next request on an idle slot
    ///
    /// Silent no-op when the request bound is already reached: the slot
    /// stays idle and is flushed during finish.
    fn dispatch<'a>(
        &mut self,
        index: usize,
        events: &mut FuturesUnordered<LocalBoxFuture<'a, SlotEvent<C>>>,
    ) where
        C: 'a,
    {
        if let Some(bound) = self.max_requests {
            if self.counters.issued() >= bound {
                return;
            }
        }
        let Some(mut conn) = self.slots[index].begin_flight() else {
            error!(
                "Dispatch on {} slot {}",
                self.slots[index].state_name(),
                index
            );
            debug_assert!(false, "dispatch on non-idle slot");
            return;
        };
        self.counters.record_issued();
        debug!(
            "Sending using slot {}: {} / {:?}",
            index,
            self.counters.issued(),
            self.max_requests
        );

        let key = self.key.clone();
        events.push(Box::pin(async move {
            let result = conn.get(&key).await;
            SlotEvent::Completed(index, conn, result)
        }));
    }

    /// Termination predicate, checked after every completion
    fn terminated(&self) -> bool {
        if let Some(bound) = self.max_requests {
            if self.counters.responses() >= bound {
                return true;
            }
        }
        if let Some(bound) = self.max_seconds {
            if self.counters.elapsed().as_secs_f64() >= bound {
                return true;
            }
        }
        false
    }

    /// Close every idle connection and build the report
    ///
    /// Idempotent: a second invocation closes nothing further and
    /// rebuilds the same totals.
    async fn finish(&mut self) -> Report {
        if !self.finished {
            self.finished = true;
            for (index, slot) in self.slots.iter_mut().enumerate() {
                if let Some(conn) = slot.take_for_close() {
                    trace!("Closing slot {}", index);
                    conn.close().await;
                }
            }
        }
        Report::build(&self.counters, self.counters.elapsed(), self.slots.len())
    }
}
