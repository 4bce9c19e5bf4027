//! Scripted in-memory device for client tests.

#![allow(dead_code)]

use std::time::Duration;

use meshcore_companion_client::{ClientConfig, FeedHandle, MeshCore, Transport, TransportError};
use meshcore_companion_protocol::*;
use parking_lot::Mutex;

type Responder = Box<dyn Fn(&[u8]) -> Vec<Vec<u8>> + Send + Sync>;

/// Records every payload sent and answers through a responder closure.
///
/// Replies are fed back synchronously from inside `send`, so they arrive
/// before the caller starts waiting.
#[derive(Default)]
pub struct MockTransport {
    feed: Mutex<Option<FeedHandle>>,
    sent: Mutex<Vec<Vec<u8>>>,
    responder: Mutex<Option<Responder>>,
}

impl MockTransport {
    pub fn respond_with<F>(&self, responder: F)
    where
        F: Fn(&[u8]) -> Vec<Vec<u8>> + Send + Sync + 'static,
    {
        *self.responder.lock() = Some(Box::new(responder));
    }

    /// Deliver a device payload as one framed chunk.
    pub fn inject(&self, payload: &[u8]) {
        let feed = self.feed.lock().clone();
        if let Some(feed) = feed {
            feed.feed(&encode_frame_with_marker(FRAME_MARKER_INBOUND, payload));
        }
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().clone()
    }

    pub fn sent_with_code(&self, code: u8) -> usize {
        self.sent.lock().iter().filter(|p| p.first() == Some(&code)).count()
    }
}

impl Transport for MockTransport {
    async fn connect(&self, feed: FeedHandle) -> Result<(), TransportError> {
        *self.feed.lock() = Some(feed);
        Ok(())
    }

    fn send(&self, payload: &[u8]) {
        self.sent.lock().push(payload.to_vec());
        let replies = match self.responder.lock().as_ref() {
            Some(responder) => responder(payload),
            None => Vec::new(),
        };
        for reply in replies {
            self.inject(&reply);
        }
    }

    fn disconnect(&self) {
        self.feed.lock().take();
    }
}

pub fn test_config() -> ClientConfig {
    ClientConfig {
        default_timeout_ms: 200,
        message_timeout_ms: 200,
        auto_fetch_delay_ms: 10,
        ..ClientConfig::default()
    }
}

/// A connected client whose device answers through `responder`.
pub async fn connected_client<F>(responder: F) -> MeshCore<MockTransport>
where
    F: Fn(&[u8]) -> Vec<Vec<u8>> + Send + Sync + 'static,
{
    let client = MeshCore::new(MockTransport::default(), test_config());
    client.transport().respond_with(responder);
    client.connect().await.expect("mock connect");
    client
}

pub const SHORT: Duration = Duration::from_millis(50);

// ----------------------------------------------------------------------------
// Device payloads
// ----------------------------------------------------------------------------

pub fn self_info_payload(name: &str) -> Vec<u8> {
    let mut f = vec![0u8; 58];
    f[0] = RESP_CODE_SELF_INFO;
    f[1] = 1;
    f[2] = 20;
    f[3] = 22;
    f[4..36].copy_from_slice(&[0x5a; 32]);
    f[36..40].copy_from_slice(&45_500_000i32.to_le_bytes());
    f[40..44].copy_from_slice(&(-73_600_000i32).to_le_bytes());
    f[48..52].copy_from_slice(&869_525u32.to_le_bytes());
    f[52..56].copy_from_slice(&250_000u32.to_le_bytes());
    f[56] = 11;
    f[57] = 5;
    f.extend_from_slice(name.as_bytes());
    f
}

pub fn contact_payload(key: u8, name: &str) -> Vec<u8> {
    let mut f = vec![RESP_CODE_CONTACT];
    f.extend_from_slice(&[key; PUB_KEY_SIZE]);
    f.extend_from_slice(&[1, 0, 0xff]);
    f.extend_from_slice(&[0u8; MAX_PATH_SIZE]);
    let mut name_buf = [0u8; CONTACT_NAME_SIZE];
    name_buf[..name.len()].copy_from_slice(name.as_bytes());
    f.extend_from_slice(&name_buf);
    f.extend_from_slice(&100u32.to_le_bytes());
    f
}

pub fn contact_list(contacts: &[(u8, &str)]) -> Vec<Vec<u8>> {
    let mut frames = vec![{
        let mut start = vec![RESP_CODE_CONTACTS_START];
        start.extend_from_slice(&(contacts.len() as u32).to_le_bytes());
        start
    }];
    frames.extend(contacts.iter().map(|(key, name)| contact_payload(*key, name)));
    frames.push(vec![RESP_CODE_END_OF_CONTACTS]);
    frames
}

pub fn msg_sent_payload(expected_ack: [u8; 4]) -> Vec<u8> {
    let mut f = vec![RESP_CODE_SENT, 1];
    f.extend_from_slice(&expected_ack);
    f.extend_from_slice(&3000u32.to_le_bytes());
    f
}

pub fn ack_payload(code: [u8; 4]) -> Vec<u8> {
    let mut f = vec![PUSH_CODE_SEND_CONFIRMED];
    f.extend_from_slice(&code);
    f.extend_from_slice(&420u32.to_le_bytes());
    f
}

pub fn channel_msg_payload(channel_idx: u8, text: &str) -> Vec<u8> {
    let mut f = vec![RESP_CODE_CHANNEL_MSG_RECV, channel_idx, 0xff, TXT_TYPE_PLAIN];
    f.extend_from_slice(&1_700_000_000u32.to_le_bytes());
    f.extend_from_slice(text.as_bytes());
    f
}

/// Answers APP_START like a device called `node`.
pub fn app_start_reply(payload: &[u8]) -> Option<Vec<Vec<u8>>> {
    (payload.first() == Some(&CMD_APP_START)).then(|| vec![self_info_payload("node")])
}
