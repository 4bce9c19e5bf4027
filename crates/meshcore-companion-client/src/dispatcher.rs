//! Publish/subscribe hub for decoded events.
//!
//! Subscriptions are long-lived callbacks. Waiters are one-shot: they are
//! registered the moment they are created and removed when they resolve or
//! are dropped, so a cancelled wait never leaks and never fires late.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::time::Duration;

use meshcore_companion_protocol::{AttributeFilter, Event, EventKind};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::error::WaitError;

type Callback = Arc<dyn Fn(&Event) + Send + Sync>;

struct SubscriptionEntry {
    id: u64,
    kind: Option<EventKind>,
    filter: AttributeFilter,
    callback: Callback,
}

struct WaiterEntry {
    id: u64,
    kind: EventKind,
    filter: AttributeFilter,
    tx: oneshot::Sender<Event>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscriptions: Vec<SubscriptionEntry>,
    waiters: Vec<WaiterEntry>,
}

impl Registry {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Cloneable handle to a shared subscription registry.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    registry: Arc<Mutex<Registry>>,
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reg = self.registry.lock();
        f.debug_struct("EventDispatcher")
            .field("subscriptions", &reg.subscriptions.len())
            .field("waiters", &reg.waiters.len())
            .finish()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for events of `kind` (all kinds when `None`)
    /// whose attributes match `filter`.
    pub fn subscribe<F>(&self, kind: Option<EventKind>, filter: AttributeFilter, callback: F) -> Subscription
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let mut reg = self.registry.lock();
        let id = reg.allocate_id();
        reg.subscriptions.push(SubscriptionEntry {
            id,
            kind,
            filter,
            callback: Arc::new(callback),
        });
        trace!(id, ?kind, "subscribed");
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Cancel a subscription. Unknown or already cancelled handles are ignored.
    pub fn unsubscribe(&self, subscription: &Subscription) {
        remove_subscription(&self.registry, subscription.id);
    }

    /// Deliver an event to every matching subscription and waiter.
    ///
    /// Callbacks run after the registry lock is released, so they may
    /// subscribe, unsubscribe or publish themselves. A panicking callback is
    /// logged and does not affect the others.
    pub fn publish(&self, event: Event) {
        let kind = event.kind();
        let (callbacks, resolved) = {
            let mut reg = self.registry.lock();
            let callbacks: Vec<Callback> = reg
                .subscriptions
                .iter()
                .filter(|s| s.kind.map_or(true, |k| k == kind) && s.filter.matches(&event.attributes))
                .map(|s| Arc::clone(&s.callback))
                .collect();
            let (resolved, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut reg.waiters)
                .into_iter()
                .partition(|w| w.kind == kind && w.filter.matches(&event.attributes));
            reg.waiters = pending;
            (callbacks, resolved)
        };

        debug!(
            %kind,
            subscribers = callbacks.len(),
            waiters = resolved.len(),
            "dispatching event"
        );

        for callback in callbacks {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback(&event))) {
                let msg = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_default();
                warn!(%kind, "event callback panicked: {}", msg);
            }
        }

        for waiter in resolved {
            // The receiver may have been dropped between match and send.
            let _ = waiter.tx.send(event.clone());
        }
    }

    /// Register a one-shot waiter without suspending.
    pub fn waiter(&self, kind: EventKind, filter: AttributeFilter) -> Waiter {
        let (tx, rx) = oneshot::channel();
        let mut reg = self.registry.lock();
        let id = reg.allocate_id();
        reg.waiters.push(WaiterEntry {
            id,
            kind,
            filter,
            tx,
        });
        Waiter {
            id,
            kind,
            rx,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Wait for the next matching event, or time out.
    pub async fn wait_for(
        &self,
        kind: EventKind,
        filter: AttributeFilter,
        timeout: Duration,
    ) -> Result<Event, WaitError> {
        self.waiter(kind, filter).wait(timeout).await
    }

    /// Drop every pending waiter; their waits resolve with [`WaitError::Closed`].
    pub fn cancel_all_waiters(&self) {
        let dropped = std::mem::take(&mut self.registry.lock().waiters);
        if !dropped.is_empty() {
            debug!(count = dropped.len(), "cancelled pending waiters");
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.registry.lock().subscriptions.len()
    }

    pub fn waiter_count(&self) -> usize {
        self.registry.lock().waiters.len()
    }
}

fn remove_subscription(registry: &Mutex<Registry>, id: u64) {
    registry.lock().subscriptions.retain(|s| s.id != id);
}

/// Handle to a registered callback.
///
/// Dropping the handle leaves the subscription active; call
/// [`unsubscribe`](Subscription::unsubscribe) to cancel it.
#[derive(Clone)]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Cancel this subscription.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            remove_subscription(&registry, self.id);
        }
    }
}

/// A pending one-shot wait, removed from the registry when dropped.
pub struct Waiter {
    id: u64,
    kind: EventKind,
    rx: oneshot::Receiver<Event>,
    registry: Weak<Mutex<Registry>>,
}

impl std::fmt::Debug for Waiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Waiter")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish()
    }
}

impl Waiter {
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Suspend until the waiter resolves or `timeout` elapses.
    pub async fn wait(mut self, timeout: Duration) -> Result<Event, WaitError> {
        match tokio::time::timeout(timeout, &mut self.rx).await {
            Ok(Ok(event)) => Ok(event),
            Ok(Err(_)) => Err(WaitError::Closed),
            Err(_) => Err(WaitError::Timeout),
        }
    }
}

impl Drop for Waiter {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().waiters.retain(|w| w.id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshcore_companion_protocol::EventPayload;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&Event) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, move |_: &Event| {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn channel_event(idx: u8) -> Event {
        Event::new(EventPayload::MessagesWaiting).with_attribute("channel_idx", idx)
    }

    #[test]
    fn test_subscribe_by_kind() {
        let dispatcher = EventDispatcher::new();
        let (oks, on_ok) = counter();
        let (all, on_any) = counter();
        dispatcher.subscribe(Some(EventKind::Ok), AttributeFilter::any(), on_ok);
        dispatcher.subscribe(None, AttributeFilter::any(), on_any);

        dispatcher.publish(Event::ok());
        dispatcher.publish(Event::new(EventPayload::NoMoreMsgs));

        assert_eq!(oks.load(Ordering::SeqCst), 1);
        assert_eq!(all.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_subscribe_with_filter() {
        let dispatcher = EventDispatcher::new();
        let (hits, cb) = counter();
        dispatcher.subscribe(
            Some(EventKind::MessagesWaiting),
            AttributeFilter::any().with("channel_idx", 2u8),
            cb,
        );

        dispatcher.publish(channel_event(1));
        dispatcher.publish(channel_event(2));
        dispatcher.publish(Event::new(EventPayload::MessagesWaiting));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let dispatcher = EventDispatcher::new();
        let (hits, cb) = counter();
        let sub = dispatcher.subscribe(None, AttributeFilter::any(), cb);
        let (_, other) = counter();
        let keep = dispatcher.subscribe(None, AttributeFilter::any(), other);
        assert_eq!(dispatcher.subscription_count(), 2);

        dispatcher.publish(Event::ok());
        sub.unsubscribe();
        dispatcher.publish(Event::ok());
        dispatcher.unsubscribe(&sub);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.subscription_count(), 1);
        dispatcher.unsubscribe(&keep);
        assert_eq!(dispatcher.subscription_count(), 0);
    }

    #[test]
    fn test_panicking_callback_is_isolated() {
        let dispatcher = EventDispatcher::new();
        dispatcher.subscribe(None, AttributeFilter::any(), |_| panic!("boom"));
        let (hits, cb) = counter();
        dispatcher.subscribe(None, AttributeFilter::any(), cb);

        dispatcher.publish(Event::ok());
        dispatcher.publish(Event::ok());

        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_callback_may_reenter_dispatcher() {
        let dispatcher = EventDispatcher::new();
        let inner = dispatcher.clone();
        let seen = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&seen);
        dispatcher.subscribe(Some(EventKind::Ok), AttributeFilter::any(), move |_| {
            s.store(inner.subscription_count(), Ordering::SeqCst);
            inner.publish(Event::new(EventPayload::NoMoreMsgs));
        });

        dispatcher.publish(Event::ok());
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_times_out() {
        let dispatcher = EventDispatcher::new();
        let res = dispatcher
            .wait_for(EventKind::MsgSent, AttributeFilter::any(), Duration::from_millis(50))
            .await;
        assert_eq!(res, Err(WaitError::Timeout));
        assert_eq!(dispatcher.waiter_count(), 0);
    }

    #[tokio::test]
    async fn test_wait_for_resolves_on_publish() {
        let dispatcher = EventDispatcher::new();
        let publisher = dispatcher.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            publisher.publish(channel_event(1));
            publisher.publish(channel_event(3));
        });

        let event = dispatcher
            .wait_for(
                EventKind::MessagesWaiting,
                AttributeFilter::any().with("channel_idx", 3u8),
                Duration::from_secs(1),
            )
            .await
            .unwrap();
        assert_eq!(event.attribute("channel_idx"), Some(&3u8.into()));
        assert_eq!(dispatcher.waiter_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_waiters_do_not_interfere() {
        let dispatcher = EventDispatcher::new();
        let ok = dispatcher.waiter(EventKind::Ok, AttributeFilter::any());
        let sent = dispatcher.waiter(EventKind::MsgSent, AttributeFilter::any());
        let ok_again = dispatcher.waiter(EventKind::Ok, AttributeFilter::any());
        assert_eq!(dispatcher.waiter_count(), 3);

        dispatcher.publish(Event::ok());
        assert_eq!(dispatcher.waiter_count(), 1);

        assert!(ok.wait(Duration::from_millis(10)).await.is_ok());
        assert!(ok_again.wait(Duration::from_millis(10)).await.is_ok());
        assert_eq!(sent.wait(Duration::from_millis(10)).await, Err(WaitError::Timeout));
        assert_eq!(dispatcher.waiter_count(), 0);
    }

    #[test]
    fn test_dropped_waiter_is_removed() {
        let dispatcher = EventDispatcher::new();
        let waiter = dispatcher.waiter(EventKind::Ack, AttributeFilter::any());
        assert_eq!(dispatcher.waiter_count(), 1);
        drop(waiter);
        assert_eq!(dispatcher.waiter_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_reports_closed() {
        let dispatcher = EventDispatcher::new();
        let waiter = dispatcher.waiter(EventKind::Ok, AttributeFilter::any());
        dispatcher.cancel_all_waiters();
        assert_eq!(waiter.wait(Duration::from_secs(1)).await, Err(WaitError::Closed));
    }
}
