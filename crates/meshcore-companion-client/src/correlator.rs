//! Command/response correlation.
//!
//! A command's success and failure arrive as different event kinds on the
//! same channel as unrelated pushes. Each `send` registers one one-shot
//! waiter per expected kind before transmitting, then races them; the
//! losers are dropped, which removes them from the dispatcher.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::select_all;
use meshcore_companion_protocol::{AttributeFilter, Command, ErrorDetail, Event, EventKind};
use tracing::debug;

use crate::dispatcher::{EventDispatcher, Waiter};
use crate::error::WaitError;
use crate::transport::Transport;

/// Sends payloads and resolves them to the first matching response.
pub struct Correlator<T> {
    dispatcher: EventDispatcher,
    transport: Arc<T>,
    default_timeout_ms: Arc<AtomicU64>,
}

impl<T> Clone for Correlator<T> {
    fn clone(&self) -> Self {
        Correlator {
            dispatcher: self.dispatcher.clone(),
            transport: Arc::clone(&self.transport),
            default_timeout_ms: Arc::clone(&self.default_timeout_ms),
        }
    }
}

impl<T: Transport> Correlator<T> {
    pub fn new(dispatcher: EventDispatcher, transport: Arc<T>, default_timeout: Duration) -> Self {
        Correlator {
            dispatcher,
            transport,
            default_timeout_ms: Arc::new(AtomicU64::new(default_timeout.as_millis() as u64)),
        }
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms.load(Ordering::Relaxed))
    }

    /// Change the timeout used when a call does not give its own.
    /// Shared by every clone of this correlator.
    pub fn set_default_timeout(&self, timeout: Duration) {
        self.default_timeout_ms
            .store(timeout.as_millis() as u64, Ordering::Relaxed);
    }

    /// Transmit `payload` and wait for the first event of any `expected` kind.
    ///
    /// With no expected kinds the call returns a local OK immediately. When
    /// every wait expires the result is an ERROR event with reason
    /// `timeout`. Never returns `Err`: all failures are ERROR events.
    pub async fn send(&self, payload: &[u8], expected: &[EventKind], timeout: Option<Duration>) -> Event {
        let timeout = timeout.unwrap_or_else(|| self.default_timeout());
        let waiters: Vec<Waiter> = expected
            .iter()
            .map(|kind| self.dispatcher.waiter(*kind, AttributeFilter::any()))
            .collect();

        debug!(
            code = payload.first().copied().unwrap_or_default(),
            len = payload.len(),
            ?expected,
            "sending command"
        );
        self.transport.send(payload);

        if waiters.is_empty() {
            return Event::ok();
        }
        race(waiters, timeout).await
    }

    /// Encode and send a typed command, awaiting its response kinds.
    pub async fn send_command(&self, command: &Command, timeout: Option<Duration>) -> Event {
        self.send(&command.encode(), command.expected_responses(), timeout)
            .await
    }
}

async fn race(waiters: Vec<Waiter>, timeout: Duration) -> Event {
    let mut pending: Vec<_> = waiters
        .into_iter()
        .map(|w| Box::pin(w.wait(timeout)))
        .collect();

    loop {
        let (result, _, rest) = select_all(pending).await;
        match result {
            Ok(event) => return event,
            Err(WaitError::Timeout) if rest.is_empty() => {
                debug!(?timeout, "no response before deadline");
                return Event::error(ErrorDetail::Timeout);
            }
            Err(WaitError::Timeout) => pending = rest,
            Err(err @ WaitError::Closed) => return Event::error(err.into()),
        }
    }
}
