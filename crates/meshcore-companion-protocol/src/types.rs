//! Record types carried by decoded events.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::*;

/// A 32-byte public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey(pub [u8; PUB_KEY_SIZE]);

impl PublicKey {
    /// Create a new public key from bytes.
    pub fn new(bytes: [u8; PUB_KEY_SIZE]) -> Self {
        PublicKey(bytes)
    }

    /// Create from a slice. Returns None if slice is wrong length.
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        let bytes: [u8; PUB_KEY_SIZE] = slice.try_into().ok()?;
        Some(PublicKey(bytes))
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Option<Self> {
        hex::decode(s).ok().and_then(|b| Self::from_slice(&b))
    }

    /// Get the 6-byte prefix used for message addressing.
    pub fn prefix(&self) -> PublicKeyPrefix {
        PublicKeyPrefix::from(self)
    }

    /// Get the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; PUB_KEY_SIZE] {
        &self.0
    }

    /// Get the bytes as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Default for PublicKey {
    fn default() -> Self {
        PublicKey([0u8; PUB_KEY_SIZE])
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        PublicKey::from_hex(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid public key: {s:?}")))
    }
}

/// A 6-byte public key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKeyPrefix(pub [u8; PUB_KEY_PREFIX_SIZE]);

impl PublicKeyPrefix {
    /// Create a new prefix from bytes.
    pub fn new(bytes: [u8; PUB_KEY_PREFIX_SIZE]) -> Self {
        PublicKeyPrefix(bytes)
    }

    /// Take the first six bytes of a slice. Returns None if it is shorter.
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        let bytes: [u8; PUB_KEY_PREFIX_SIZE] = slice.get(..PUB_KEY_PREFIX_SIZE)?.try_into().ok()?;
        Some(PublicKeyPrefix(bytes))
    }

    /// Get the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; PUB_KEY_PREFIX_SIZE] {
        &self.0
    }

    /// Get the bytes as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Default for PublicKeyPrefix {
    fn default() -> Self {
        PublicKeyPrefix([0u8; PUB_KEY_PREFIX_SIZE])
    }
}

impl From<&PublicKey> for PublicKeyPrefix {
    fn from(key: &PublicKey) -> Self {
        let mut prefix = [0u8; PUB_KEY_PREFIX_SIZE];
        prefix.copy_from_slice(&key.0[..PUB_KEY_PREFIX_SIZE]);
        PublicKeyPrefix(prefix)
    }
}

impl Serialize for PublicKeyPrefix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}

/// A contact record from the device's address book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Contact's public key.
    pub public_key: PublicKey,
    /// Contact type (chat, repeater, room server).
    #[serde(rename = "type")]
    pub contact_type: u8,
    /// Contact flags.
    pub flags: u8,
    /// Outbound path length as sent by the device (-1 if unknown/flood).
    pub out_path_len: i8,
    /// Outbound path bytes; empty when the path is unknown.
    #[serde(with = "hex_bytes")]
    pub out_path: Vec<u8>,
    /// Advertised name.
    pub adv_name: String,
    /// Timestamp of last advertisement.
    pub last_advert: u32,
    /// Advertised latitude in degrees.
    pub adv_lat: f64,
    /// Advertised longitude in degrees.
    pub adv_lon: f64,
    /// Last modification timestamp.
    pub lastmod: u32,
}

impl Default for Contact {
    fn default() -> Self {
        Contact {
            public_key: PublicKey::default(),
            contact_type: 0,
            flags: 0,
            out_path_len: -1,
            out_path: Vec::new(),
            adv_name: String::new(),
            last_advert: 0,
            adv_lat: 0.0,
            adv_lon: 0.0,
            lastmod: 0,
        }
    }
}

impl Contact {
    /// Check if the contact has a known direct path.
    pub fn has_direct_path(&self) -> bool {
        self.out_path_len >= 0
    }
}

/// Node information returned by APP_START.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SelfInfo {
    /// Node advertisement type.
    pub adv_type: u8,
    /// Current TX power in dBm.
    pub tx_power: u8,
    /// Maximum TX power supported.
    pub max_tx_power: u8,
    /// Node's public key.
    pub public_key: PublicKey,
    /// Advertised latitude in degrees.
    pub adv_lat: f64,
    /// Advertised longitude in degrees.
    pub adv_lon: f64,
    /// Radio frequency in MHz.
    pub radio_freq: f64,
    /// Radio bandwidth in kHz.
    pub radio_bw: f64,
    /// Spreading factor.
    pub radio_sf: u8,
    /// Coding rate.
    pub radio_cr: u8,
    /// Node name.
    pub name: String,
}

/// Device information returned by DEVICE_QUERY.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceInfo {
    /// Firmware version code.
    pub fw_ver: u8,
    /// Extended fields, reported by firmware version 3 and later.
    pub capabilities: Option<DeviceCapabilities>,
}

/// Extended device information.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceCapabilities {
    /// Maximum number of contacts.
    pub max_contacts: u16,
    /// Maximum group channels.
    pub max_channels: u8,
    /// BLE PIN code.
    pub ble_pin: u32,
    /// Firmware build date.
    pub fw_build: String,
    /// Hardware model.
    pub model: String,
    /// Firmware version string.
    pub version: String,
}

/// Reply to a queued outgoing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MsgSent {
    /// Send type (0 = direct, 1 = flood).
    pub send_type: u8,
    /// Code the recipient's ACK will carry.
    pub expected_ack: [u8; 4],
    /// Suggested wait for the ACK, in milliseconds.
    pub suggested_timeout: u32,
}

impl MsgSent {
    /// Check if the message was sent as flood.
    pub fn is_flood(&self) -> bool {
        self.send_type == 1
    }
}

/// Message type for text messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TextType {
    /// Plain text message.
    Plain,
    /// CLI/command data.
    CliData,
    /// Signed plain text.
    SignedPlain,
    /// Unknown type.
    Unknown(u8),
}

impl From<u8> for TextType {
    fn from(value: u8) -> Self {
        match value {
            TXT_TYPE_PLAIN => TextType::Plain,
            TXT_TYPE_CLI_DATA => TextType::CliData,
            TXT_TYPE_SIGNED_PLAIN => TextType::SignedPlain,
            _ => TextType::Unknown(value),
        }
    }
}

impl From<TextType> for u8 {
    fn from(value: TextType) -> Self {
        match value {
            TextType::Plain => TXT_TYPE_PLAIN,
            TextType::CliData => TXT_TYPE_CLI_DATA,
            TextType::SignedPlain => TXT_TYPE_SIGNED_PLAIN,
            TextType::Unknown(v) => v,
        }
    }
}

/// A text message received from a contact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactMessage {
    /// Sender's public key prefix.
    pub pubkey_prefix: PublicKeyPrefix,
    /// Path length (0xFF = flood).
    pub path_len: u8,
    /// Message type.
    pub txt_type: TextType,
    /// Sender's timestamp.
    pub sender_timestamp: u32,
    /// Signature bytes of a signed message.
    pub signature: Option<[u8; 4]>,
    /// Message text.
    pub text: String,
    /// SNR header value (signed byte ×4), only in the extended layout.
    pub snr: Option<f32>,
}

/// A text message received on a channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelMessage {
    /// Channel index.
    pub channel_idx: u8,
    /// Path length (0xFF = flood).
    pub path_len: u8,
    /// Message type.
    pub txt_type: TextType,
    /// Sender's timestamp.
    pub sender_timestamp: u32,
    /// Message text.
    pub text: String,
    /// SNR header value (signed byte ×4), only in the extended layout.
    pub snr: Option<f32>,
}

/// Raw radio data pushed by the device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawData {
    /// SNR in dB.
    pub snr: f32,
    /// RSSI byte as reported.
    pub rssi: u8,
    /// Payload bytes.
    #[serde(with = "hex_bytes")]
    pub payload: Vec<u8>,
}

/// Delivery acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ack {
    /// ACK code, matching a previous [`MsgSent::expected_ack`].
    pub code: Option<[u8; 4]>,
    /// Round trip time in milliseconds.
    pub trip_time_ms: Option<u32>,
}

/// Result of a login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoginResult {
    /// Whether the session has admin rights (success only).
    pub is_admin: Option<bool>,
    /// Server public key prefix.
    pub pubkey_prefix: Option<PublicKeyPrefix>,
}

/// Status report from a repeater or room server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    /// Responder public key prefix.
    pub pubkey_prefix: PublicKeyPrefix,
    /// Battery voltage in millivolts.
    pub bat: u16,
    /// Outbound queue depth.
    pub tx_queue_len: u16,
    /// Free packet pool size.
    pub free_queue_len: u16,
    /// Last RSSI in dBm.
    pub last_rssi: i16,
    /// Packets received.
    pub nb_recv: u32,
    /// Packets sent.
    pub nb_sent: u32,
    /// Total TX airtime in seconds.
    pub airtime: u32,
    /// Uptime in seconds.
    pub uptime: u32,
    /// Flood packets sent.
    pub sent_flood: u32,
    /// Direct packets sent.
    pub sent_direct: u32,
    /// Flood packets received.
    pub recv_flood: u32,
    /// Direct packets received.
    pub recv_direct: u32,
    /// Queue-full events.
    pub full_evts: u16,
    /// Last SNR in dB.
    pub last_snr: f32,
    /// Duplicate direct packets.
    pub direct_dups: u16,
    /// Duplicate flood packets.
    pub flood_dups: u16,
}

/// Result of a trace along a repeater path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceData {
    /// Path length in bytes.
    pub path_len: u8,
    /// Trace flags.
    pub flags: u8,
    /// Tag given to the trace command.
    pub tag: u32,
    /// Auth code given to the trace command.
    pub auth_code: u32,
    /// Repeater hashes along the path.
    #[serde(with = "hex_bytes")]
    pub path_hashes: Vec<u8>,
    /// SNR at each hop, in dB.
    pub path_snrs: Vec<f32>,
    /// SNR of the final hop, in dB.
    pub final_snr: f32,
}

/// Telemetry reply from a remote node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryResponse {
    /// Responder public key prefix.
    pub pubkey_prefix: PublicKeyPrefix,
    /// Telemetry blob (LPP encoded).
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
}

/// Reply to a binary request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinaryResponse {
    /// Tag matching the request's expected ACK.
    pub tag: [u8; 4],
    /// Reply data.
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
}

/// Path discovery reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathResponse {
    /// Target public key prefix.
    pub pubkey_prefix: PublicKeyPrefix,
    /// Outbound path.
    #[serde(with = "hex_bytes")]
    pub out_path: Vec<u8>,
    /// Inbound path.
    #[serde(with = "hex_bytes")]
    pub in_path: Vec<u8>,
}
