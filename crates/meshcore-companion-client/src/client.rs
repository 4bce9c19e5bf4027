//! High-level client facade.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use meshcore_companion_protocol::{
    AttributeFilter, Contact, Event, EventKind, EventPayload, SelfInfo,
};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::commands::CommandHandler;
use crate::config::ClientConfig;
use crate::correlator::Correlator;
use crate::dispatcher::{EventDispatcher, Subscription};
use crate::error::{TransportError, WaitError};
use crate::transport::{FeedHandle, Transport};

/// Device state observed from events.
#[derive(Debug, Default)]
struct Snapshot {
    contacts: BTreeMap<String, Contact>,
    self_info: Option<SelfInfo>,
    time: Option<u32>,
}

impl Snapshot {
    fn apply(&mut self, event: &Event) {
        match &event.payload {
            EventPayload::Contacts(contacts) => self.contacts = contacts.clone(),
            EventPayload::NewContact(contact) => {
                self.contacts
                    .insert(contact.public_key.to_hex(), contact.clone());
            }
            EventPayload::SelfInfo(info) => self.self_info = Some(info.clone()),
            EventPayload::CurrentTime(time) => self.time = Some(*time),
            _ => {}
        }
    }
}

struct AutoFetch {
    subscription: Subscription,
    task: JoinHandle<()>,
}

/// A session with one companion radio.
///
/// Owns the event pipeline, the command API and a cache of contacts, self
/// info and device time that is only ever written by event subscriptions.
pub struct MeshCore<T: Transport> {
    config: ClientConfig,
    transport: Arc<T>,
    dispatcher: EventDispatcher,
    feed: FeedHandle,
    commands: CommandHandler<T>,
    cache: Arc<Mutex<Snapshot>>,
    cache_subscriptions: Vec<Subscription>,
    auto_fetch: Mutex<Option<AutoFetch>>,
}

impl<T: Transport> MeshCore<T> {
    pub fn new(transport: T, config: ClientConfig) -> Self {
        let transport = Arc::new(transport);
        let dispatcher = EventDispatcher::new();
        let feed = FeedHandle::new(dispatcher.clone(), config.max_frame_len);
        let correlator = Correlator::new(
            dispatcher.clone(),
            Arc::clone(&transport),
            config.default_timeout(),
        );
        let commands = CommandHandler::new(correlator, config.message_timeout());

        let cache = Arc::new(Mutex::new(Snapshot::default()));
        let cache_subscriptions = [
            EventKind::Contacts,
            EventKind::NewContact,
            EventKind::SelfInfo,
            EventKind::CurrentTime,
        ]
        .into_iter()
        .map(|kind| {
            let cache = Arc::clone(&cache);
            dispatcher.subscribe(Some(kind), AttributeFilter::any(), move |event| {
                cache.lock().apply(event)
            })
        })
        .collect();

        MeshCore {
            config,
            transport,
            dispatcher,
            feed,
            commands,
            cache,
            cache_subscriptions,
            auto_fetch: Mutex::new(None),
        }
    }

    /// Open the transport and announce this client.
    ///
    /// Returns the APP_START result: SELF_INFO, or an ERROR event when the
    /// device did not answer.
    pub async fn connect(&self) -> Result<Event, TransportError> {
        self.feed.reset();
        self.transport.connect(self.feed.clone()).await?;
        let event = self
            .commands
            .send_appstart(self.config.app_version, &self.config.app_name)
            .await;
        if let EventPayload::SelfInfo(info) = &event.payload {
            info!(name = %info.name, key = %info.public_key, "session started");
        }
        Ok(event)
    }

    /// Close the transport. Pending waits resolve as closed.
    pub fn disconnect(&self) {
        self.stop_auto_message_fetching();
        self.transport.disconnect();
        self.dispatcher.cancel_all_waiters();
    }

    pub fn commands(&self) -> &CommandHandler<T> {
        &self.commands
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    /// Byte entry point handed to the transport on connect.
    pub fn feed(&self) -> &FeedHandle {
        &self.feed
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn subscribe<F>(&self, kind: Option<EventKind>, filter: AttributeFilter, callback: F) -> Subscription
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.dispatcher.subscribe(kind, filter, callback)
    }

    pub fn unsubscribe(&self, subscription: &Subscription) {
        self.dispatcher.unsubscribe(subscription);
    }

    /// Wait for an event, using the default timeout when none is given.
    pub async fn wait_for_event(
        &self,
        kind: EventKind,
        filter: AttributeFilter,
        timeout: Option<Duration>,
    ) -> Result<Event, WaitError> {
        let timeout = timeout.unwrap_or_else(|| self.default_timeout());
        self.dispatcher.wait_for(kind, filter, timeout).await
    }

    pub fn default_timeout(&self) -> Duration {
        self.commands.correlator().default_timeout()
    }

    pub fn set_default_timeout(&self, timeout: Duration) {
        self.commands.correlator().set_default_timeout(timeout);
    }

    // ------------------------------------------------------------------
    // Cached state
    // ------------------------------------------------------------------

    /// Last contact list received, keyed by public key hex.
    pub fn contacts(&self) -> BTreeMap<String, Contact> {
        self.cache.lock().contacts.clone()
    }

    pub fn self_info(&self) -> Option<SelfInfo> {
        self.cache.lock().self_info.clone()
    }

    /// Last device time received.
    pub fn time(&self) -> Option<u32> {
        self.cache.lock().time
    }

    /// Find a cached contact by advertised name, ignoring case.
    pub fn get_contact_by_name(&self, name: &str) -> Option<Contact> {
        let name = name.to_lowercase();
        self.cache
            .lock()
            .contacts
            .values()
            .find(|c| c.adv_name.to_lowercase() == name)
            .cloned()
    }

    /// Find a cached contact whose key starts with a hex prefix, ignoring case.
    pub fn get_contact_by_key_prefix(&self, prefix: &str) -> Option<Contact> {
        if prefix.is_empty() {
            return None;
        }
        let prefix = prefix.to_lowercase();
        self.cache
            .lock()
            .contacts
            .iter()
            .find(|(key, _)| key.starts_with(&prefix))
            .map(|(_, c)| c.clone())
    }

    /// Fetch contacts if none are cached yet. Returns true when a fetch was made.
    pub async fn ensure_contacts(&self) -> bool {
        if !self.cache.lock().contacts.is_empty() {
            return false;
        }
        let event = self.commands.get_contacts(None).await;
        if event.is_error() {
            debug!("contact fetch failed");
        }
        true
    }

    // ------------------------------------------------------------------
    // Message fetching
    // ------------------------------------------------------------------

    /// Drain the message queue now and whenever MESSAGES_WAITING arrives.
    /// Does nothing when already running.
    pub fn start_auto_message_fetching(&self) {
        let mut auto_fetch = self.auto_fetch.lock();
        if auto_fetch.is_some() {
            return;
        }

        let wake = Arc::new(Notify::new());
        let w = Arc::clone(&wake);
        let subscription = self.dispatcher.subscribe(
            Some(EventKind::MessagesWaiting),
            AttributeFilter::any(),
            move |_| w.notify_one(),
        );

        // Messages may already be queued.
        wake.notify_one();

        let commands = self.commands.clone();
        let delay = self.config.auto_fetch_delay();
        let task = tokio::spawn(async move {
            loop {
                wake.notified().await;
                tokio::time::sleep(delay).await;
                drain_messages(&commands).await;
            }
        });

        *auto_fetch = Some(AutoFetch { subscription, task });
        debug!("auto message fetching started");
    }

    pub fn stop_auto_message_fetching(&self) {
        if let Some(auto_fetch) = self.auto_fetch.lock().take() {
            auto_fetch.subscription.unsubscribe();
            auto_fetch.task.abort();
            debug!("auto message fetching stopped");
        }
    }

    pub fn is_auto_fetching(&self) -> bool {
        self.auto_fetch.lock().is_some()
    }
}

impl<T: Transport> Drop for MeshCore<T> {
    fn drop(&mut self) {
        if let Some(auto_fetch) = self.auto_fetch.get_mut().take() {
            auto_fetch.subscription.unsubscribe();
            auto_fetch.task.abort();
        }
        for subscription in &self.cache_subscriptions {
            subscription.unsubscribe();
        }
    }
}

/// Call `get_msg` until the queue is empty or a call fails.
async fn drain_messages<T: Transport>(commands: &CommandHandler<T>) -> usize {
    let mut fetched = 0;
    loop {
        let event = commands.get_msg().await;
        match event.kind() {
            EventKind::ContactMsgRecv | EventKind::ChannelMsgRecv => fetched += 1,
            stop => {
                debug!(fetched, %stop, "message queue drained");
                return fetched;
            }
        }
    }
}
