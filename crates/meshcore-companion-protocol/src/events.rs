//! Decoded events and attribute filters.
//!
//! Every frame the device sends decodes to at most one [`Event`]. Local
//! results (send-only acknowledgements, timeouts, encode faults) are events
//! of the same shape, so callers see a single failure channel.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{EncodeError, FirmwareErrorCode};
use crate::types::*;

/// Kind of an event. Subscriptions and waits select on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Ok,
    Error,
    Contacts,
    SelfInfo,
    MsgSent,
    ContactMsgRecv,
    ChannelMsgRecv,
    CurrentTime,
    NoMoreMsgs,
    ContactShare,
    Battery,
    DeviceInfo,
    CliResponse,
    Advertisement,
    PathUpdate,
    Ack,
    MessagesWaiting,
    RawData,
    LoginSuccess,
    LoginFailed,
    StatusResponse,
    LogData,
    TraceData,
    NewContact,
    TelemetryResponse,
    BinaryResponse,
    PathResponse,
}

impl EventKind {
    /// Stable snake_case name, used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Ok => "command_ok",
            EventKind::Error => "command_error",
            EventKind::Contacts => "contacts",
            EventKind::SelfInfo => "self_info",
            EventKind::MsgSent => "message_sent",
            EventKind::ContactMsgRecv => "contact_message",
            EventKind::ChannelMsgRecv => "channel_message",
            EventKind::CurrentTime => "time_update",
            EventKind::NoMoreMsgs => "no_more_messages",
            EventKind::ContactShare => "contact_share",
            EventKind::Battery => "battery_info",
            EventKind::DeviceInfo => "device_info",
            EventKind::CliResponse => "cli_response",
            EventKind::Advertisement => "advertisement",
            EventKind::PathUpdate => "path_update",
            EventKind::Ack => "acknowledgement",
            EventKind::MessagesWaiting => "messages_waiting",
            EventKind::RawData => "raw_data",
            EventKind::LoginSuccess => "login_success",
            EventKind::LoginFailed => "login_failed",
            EventKind::StatusResponse => "status_response",
            EventKind::LogData => "log_data",
            EventKind::TraceData => "trace_data",
            EventKind::NewContact => "new_contact",
            EventKind::TelemetryResponse => "telemetry_response",
            EventKind::BinaryResponse => "binary_response",
            EventKind::PathResponse => "path_response",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an ERROR event was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorDetail {
    /// The device answered with an error frame.
    Device(Option<FirmwareErrorCode>),
    /// No expected response arrived in time.
    Timeout,
    /// The command could not be encoded.
    Encode(EncodeError),
    /// The dispatch machinery failed.
    Dispatch(String),
}

impl ErrorDetail {
    /// Machine-readable reason of a locally synthesized error.
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            ErrorDetail::Device(_) => None,
            ErrorDetail::Timeout => Some("timeout"),
            ErrorDetail::Encode(e) => Some(e.reason()),
            ErrorDetail::Dispatch(_) => Some("dispatch"),
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorDetail::Device(Some(code)) => write!(f, "device error: {code}"),
            ErrorDetail::Device(None) => write!(f, "device error"),
            ErrorDetail::Timeout => write!(f, "timed out waiting for a response"),
            ErrorDetail::Encode(e) => write!(f, "{e}"),
            ErrorDetail::Dispatch(msg) => write!(f, "dispatch failure: {msg}"),
        }
    }
}

/// Structured payload of an event, one variant per [`EventKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    /// Generic OK, with the optional u32 result.
    Ok(Option<u32>),
    Error(ErrorDetail),
    /// Complete contact list keyed by public key hex.
    Contacts(BTreeMap<String, Contact>),
    SelfInfo(SelfInfo),
    MsgSent(MsgSent),
    ContactMsgRecv(ContactMessage),
    ChannelMsgRecv(ChannelMessage),
    /// Device clock, seconds since the epoch.
    CurrentTime(u32),
    NoMoreMsgs,
    /// Exported contact as a `meshcore://` URI.
    ContactShare(String),
    /// Battery voltage in millivolts.
    Battery(u16),
    DeviceInfo(DeviceInfo),
    CliResponse(String),
    Advertisement(Option<PublicKey>),
    PathUpdate(Option<PublicKey>),
    Ack(Ack),
    MessagesWaiting,
    RawData(RawData),
    LoginSuccess(LoginResult),
    LoginFailed(LoginResult),
    StatusResponse(StatusReport),
    LogData(String),
    TraceData(TraceData),
    NewContact(Contact),
    TelemetryResponse(TelemetryResponse),
    BinaryResponse(BinaryResponse),
    PathResponse(PathResponse),
}

impl EventPayload {
    /// Kind of this payload.
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::Ok(_) => EventKind::Ok,
            EventPayload::Error(_) => EventKind::Error,
            EventPayload::Contacts(_) => EventKind::Contacts,
            EventPayload::SelfInfo(_) => EventKind::SelfInfo,
            EventPayload::MsgSent(_) => EventKind::MsgSent,
            EventPayload::ContactMsgRecv(_) => EventKind::ContactMsgRecv,
            EventPayload::ChannelMsgRecv(_) => EventKind::ChannelMsgRecv,
            EventPayload::CurrentTime(_) => EventKind::CurrentTime,
            EventPayload::NoMoreMsgs => EventKind::NoMoreMsgs,
            EventPayload::ContactShare(_) => EventKind::ContactShare,
            EventPayload::Battery(_) => EventKind::Battery,
            EventPayload::DeviceInfo(_) => EventKind::DeviceInfo,
            EventPayload::CliResponse(_) => EventKind::CliResponse,
            EventPayload::Advertisement(_) => EventKind::Advertisement,
            EventPayload::PathUpdate(_) => EventKind::PathUpdate,
            EventPayload::Ack(_) => EventKind::Ack,
            EventPayload::MessagesWaiting => EventKind::MessagesWaiting,
            EventPayload::RawData(_) => EventKind::RawData,
            EventPayload::LoginSuccess(_) => EventKind::LoginSuccess,
            EventPayload::LoginFailed(_) => EventKind::LoginFailed,
            EventPayload::StatusResponse(_) => EventKind::StatusResponse,
            EventPayload::LogData(_) => EventKind::LogData,
            EventPayload::TraceData(_) => EventKind::TraceData,
            EventPayload::NewContact(_) => EventKind::NewContact,
            EventPayload::TelemetryResponse(_) => EventKind::TelemetryResponse,
            EventPayload::BinaryResponse(_) => EventKind::BinaryResponse,
            EventPayload::PathResponse(_) => EventKind::PathResponse,
        }
    }
}

/// Comparable attribute value used for filtering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<u8> for AttrValue {
    fn from(v: u8) -> Self {
        AttrValue::Int(v.into())
    }
}

impl From<u32> for AttrValue {
    fn from(v: u32) -> Self {
        AttrValue::Int(v.into())
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Text(v.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Text(v)
    }
}

/// Attributes attached to an event.
pub type Attributes = BTreeMap<String, AttrValue>;

/// Required attribute values. An event matches when every key is present
/// with an equal value; an empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeFilter(BTreeMap<String, AttrValue>);

impl AttributeFilter {
    /// Filter that matches every event.
    pub fn any() -> Self {
        Self::default()
    }

    /// Add a required attribute.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Check an attribute set against this filter.
    pub fn matches(&self, attributes: &Attributes) -> bool {
        self.0
            .iter()
            .all(|(k, v)| attributes.get(k).is_some_and(|actual| actual == v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A decoded or synthesized event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub payload: EventPayload,
    pub attributes: Attributes,
}

impl Event {
    /// Create an event without attributes.
    pub fn new(payload: EventPayload) -> Self {
        Event {
            payload,
            attributes: Attributes::new(),
        }
    }

    /// Attach an attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Local OK result.
    pub fn ok() -> Self {
        Event::new(EventPayload::Ok(None))
    }

    /// Error event; locally synthesized errors carry a `reason` attribute.
    pub fn error(detail: ErrorDetail) -> Self {
        let reason = detail.reason();
        let event = Event::new(EventPayload::Error(detail));
        match reason {
            Some(reason) => event.with_attribute("reason", reason),
            None => event,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    pub fn is_error(&self) -> bool {
        matches!(self.payload, EventPayload::Error(_))
    }

    /// Look up an attribute.
    pub fn attribute(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_matches_everything() {
        let event = Event::new(EventPayload::NoMoreMsgs);
        assert!(AttributeFilter::any().matches(&event.attributes));
    }

    #[test]
    fn test_filter_requires_every_key() {
        let event = Event::new(EventPayload::MessagesWaiting)
            .with_attribute("extended", true)
            .with_attribute("channel_idx", 3u8);

        assert!(AttributeFilter::any()
            .with("channel_idx", 3u8)
            .matches(&event.attributes));
        assert!(AttributeFilter::any()
            .with("channel_idx", 3u8)
            .with("extended", true)
            .matches(&event.attributes));
        assert!(!AttributeFilter::any()
            .with("channel_idx", 4u8)
            .matches(&event.attributes));
        assert!(!AttributeFilter::any()
            .with("pubkey_prefix", "abcdef")
            .matches(&event.attributes));
    }

    #[test]
    fn test_filter_value_types_are_distinct() {
        let event = Event::ok().with_attribute("code", "1");
        assert!(!AttributeFilter::any().with("code", 1u32).matches(&event.attributes));
    }

    #[test]
    fn test_synthesized_error_reason() {
        let timeout = Event::error(ErrorDetail::Timeout);
        assert_eq!(timeout.kind(), EventKind::Error);
        assert_eq!(timeout.attribute("reason"), Some(&AttrValue::from("timeout")));

        let device = Event::error(ErrorDetail::Device(Some(FirmwareErrorCode::NotFound)));
        assert!(device.is_error());
        assert_eq!(device.attribute("reason"), None);
    }
}
