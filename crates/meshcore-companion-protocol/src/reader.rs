//! Packet decoder.
//!
//! [`PacketReader`] maps one frame payload to at most one [`Event`]. The
//! first byte selects the layout; every other offset is fixed by firmware.
//! Contact lists arrive as START, one CONTACT per entry, then END, and are
//! staged privately until END publishes them as a single CONTACTS event.

use std::collections::BTreeMap;

use tracing::{debug, trace, warn};

use crate::constants::*;
use crate::error::{FirmwareErrorCode, ProtocolError};
use crate::events::{ErrorDetail, Event, EventPayload};
use crate::types::*;

/// Stateful frame decoder.
#[derive(Debug, Default)]
pub struct PacketReader {
    contacts: BTreeMap<String, Contact>,
    expected_contacts: Option<u32>,
}

impl PacketReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a frame, logging and dropping anything malformed or unknown.
    pub fn decode(&mut self, frame: &[u8]) -> Option<Event> {
        trace!(frame = %hex::encode(frame), "decoding frame");
        match self.try_decode(frame) {
            Ok(event) => event,
            Err(e) => {
                debug!(error = %e, frame = %hex::encode(frame), "dropping frame");
                None
            }
        }
    }

    /// Whether a contact list is being staged.
    pub fn is_staging_contacts(&self) -> bool {
        self.expected_contacts.is_some()
    }

    /// Decode a frame. `Ok(None)` means the frame was consumed without
    /// producing an event (contact staging).
    pub fn try_decode(&mut self, frame: &[u8]) -> Result<Option<Event>, ProtocolError> {
        let tag = *frame.first().ok_or(ProtocolError::FrameTooShort {
            expected: 1,
            actual: 0,
        })?;

        let event = match tag {
            RESP_CODE_OK => {
                let result = if frame.len() == 5 {
                    Some(u32_at(frame, 1)?)
                } else {
                    None
                };
                Event::new(EventPayload::Ok(result))
            }

            RESP_CODE_ERR => {
                let code = frame.get(1).copied().map(FirmwareErrorCode::from);
                Event::new(EventPayload::Error(ErrorDetail::Device(code)))
            }

            RESP_CODE_CONTACTS_START => {
                let count = u32_at(frame, 1)?;
                self.contacts.clear();
                self.expected_contacts = Some(count);
                return Ok(None);
            }

            RESP_CODE_CONTACT => {
                let contact = decode_contact(&frame[1..])?;
                if self.expected_contacts.is_none() {
                    debug!(key = %contact.public_key, "contact outside a contact list, ignored");
                    return Ok(None);
                }
                self.contacts.insert(contact.public_key.to_hex(), contact);
                return Ok(None);
            }

            RESP_CODE_END_OF_CONTACTS => {
                // An END without a START has no list to complete.
                let Some(expected) = self.expected_contacts.take() else {
                    debug!("end of contacts without start, ignored");
                    return Ok(None);
                };
                let contacts = std::mem::take(&mut self.contacts);
                if expected as usize != contacts.len() {
                    warn!(
                        expected,
                        received = contacts.len(),
                        "contact count mismatch"
                    );
                }
                let mut event = Event::new(EventPayload::Contacts(contacts));
                if frame.len() >= 5 {
                    event = event.with_attribute("lastmod", u32_at(frame, 1)?);
                }
                event
            }

            RESP_CODE_SELF_INFO => Event::new(EventPayload::SelfInfo(decode_self_info(frame)?)),

            RESP_CODE_SENT => {
                let sent = MsgSent {
                    send_type: byte_at(frame, 1)?,
                    expected_ack: bytes_at(frame, 2)?,
                    suggested_timeout: u32_at(frame, 6)?,
                };
                Event::new(EventPayload::MsgSent(sent))
                    .with_attribute("expected_ack", hex::encode(sent.expected_ack))
            }

            RESP_CODE_CONTACT_MSG_RECV => {
                let msg = decode_contact_message(frame, 1, None)?;
                Event::new(EventPayload::ContactMsgRecv(msg))
                    .with_attribute("pubkey_prefix", pubkey_hex(frame, 1)?)
            }

            RESP_CODE_CONTACT_MSG_RECV_EXT => {
                let snr = extended_snr_at(frame, 1)?;
                let msg = decode_contact_message(frame, 4, Some(snr))?;
                Event::new(EventPayload::ContactMsgRecv(msg))
                    .with_attribute("pubkey_prefix", pubkey_hex(frame, 4)?)
                    .with_attribute("extended", true)
            }

            RESP_CODE_CHANNEL_MSG_RECV => {
                let msg = decode_channel_message(frame, 1, None)?;
                let idx = msg.channel_idx;
                Event::new(EventPayload::ChannelMsgRecv(msg)).with_attribute("channel_idx", idx)
            }

            RESP_CODE_CHANNEL_MSG_RECV_EXT => {
                let snr = extended_snr_at(frame, 1)?;
                let msg = decode_channel_message(frame, 4, Some(snr))?;
                let idx = msg.channel_idx;
                Event::new(EventPayload::ChannelMsgRecv(msg))
                    .with_attribute("channel_idx", idx)
                    .with_attribute("extended", true)
            }

            RESP_CODE_CURR_TIME => Event::new(EventPayload::CurrentTime(u32_at(frame, 1)?)),

            RESP_CODE_NO_MORE_MESSAGES => Event::new(EventPayload::NoMoreMsgs),

            RESP_CODE_EXPORT_CONTACT => {
                let uri = format!("{}{}", CONTACT_URI_SCHEME, hex::encode(&frame[1..]));
                Event::new(EventPayload::ContactShare(uri))
            }

            RESP_CODE_BATTERY => Event::new(EventPayload::Battery(u16_at(frame, 1)?)),

            RESP_CODE_DEVICE_INFO => Event::new(EventPayload::DeviceInfo(decode_device_info(frame)?)),

            RESP_CODE_CLI_RESPONSE => Event::new(EventPayload::CliResponse(text(&frame[1..]))),

            PUSH_CODE_ADVERT => {
                debug!("advertisement received");
                Event::new(EventPayload::Advertisement(optional_key(frame)))
            }

            PUSH_CODE_PATH_UPDATED => {
                debug!("path updated");
                Event::new(EventPayload::PathUpdate(optional_key(frame)))
            }

            PUSH_CODE_SEND_CONFIRMED => {
                let ack = Ack {
                    code: bytes_at(frame, 1).ok(),
                    trip_time_ms: u32_at(frame, 5).ok(),
                };
                let event = Event::new(EventPayload::Ack(ack));
                match ack.code {
                    Some(code) => event.with_attribute("code", hex::encode(code)),
                    None => event,
                }
            }

            PUSH_CODE_MSG_WAITING => Event::new(EventPayload::MessagesWaiting),

            PUSH_CODE_RAW_DATA => {
                require(frame, 4)?;
                // frame[3] is reserved
                let raw = RawData {
                    snr: frame[1] as f32 / 4.0,
                    rssi: frame[2],
                    payload: frame[4..].to_vec(),
                };
                Event::new(EventPayload::RawData(raw))
            }

            PUSH_CODE_LOGIN_SUCCESS => {
                let result = LoginResult {
                    is_admin: (frame.len() >= 8).then(|| frame[1] != 0),
                    pubkey_prefix: frame.get(2..).and_then(PublicKeyPrefix::from_slice),
                };
                with_prefix(Event::new(EventPayload::LoginSuccess(result)), result.pubkey_prefix)
            }

            PUSH_CODE_LOGIN_FAIL => {
                let result = LoginResult {
                    is_admin: None,
                    pubkey_prefix: frame.get(2..).and_then(PublicKeyPrefix::from_slice),
                };
                with_prefix(Event::new(EventPayload::LoginFailed(result)), result.pubkey_prefix)
            }

            PUSH_CODE_STATUS_RESPONSE => {
                let report = decode_status(frame)?;
                let prefix = report.pubkey_prefix;
                with_prefix(Event::new(EventPayload::StatusResponse(report)), Some(prefix))
            }

            PUSH_CODE_LOG_DATA => Event::new(EventPayload::LogData(text(&frame[1..]))),

            PUSH_CODE_TRACE_DATA => {
                let trace = decode_trace(frame)?;
                let tag = trace.tag;
                Event::new(EventPayload::TraceData(trace)).with_attribute("tag", tag)
            }

            PUSH_CODE_NEW_ADVERT => Event::new(EventPayload::NewContact(decode_contact(&frame[1..])?)),

            PUSH_CODE_TELEMETRY_RESPONSE => {
                let pubkey_prefix = prefix_at(frame, 2)?;
                let telemetry = TelemetryResponse {
                    pubkey_prefix,
                    data: frame[8..].to_vec(),
                };
                with_prefix(
                    Event::new(EventPayload::TelemetryResponse(telemetry)),
                    Some(pubkey_prefix),
                )
            }

            PUSH_CODE_BINARY_RESPONSE => {
                let tag: [u8; 4] = bytes_at(frame, 2)?;
                let response = BinaryResponse {
                    tag,
                    data: frame[6..].to_vec(),
                };
                Event::new(EventPayload::BinaryResponse(response))
                    .with_attribute("tag", hex::encode(tag))
            }

            PUSH_CODE_PATH_DISCOVERY_RESPONSE => {
                let response = decode_path_response(frame)?;
                let prefix = response.pubkey_prefix;
                with_prefix(Event::new(EventPayload::PathResponse(response)), Some(prefix))
            }

            _ => return Err(ProtocolError::UnknownTag(tag)),
        };

        Ok(Some(event))
    }
}

// ============================================================================
// Field readers
// ============================================================================

fn too_short(expected: usize, actual: usize) -> ProtocolError {
    ProtocolError::FrameTooShort { expected, actual }
}

fn require(data: &[u8], expected: usize) -> Result<(), ProtocolError> {
    if data.len() < expected {
        return Err(too_short(expected, data.len()));
    }
    Ok(())
}

fn bytes_at<const N: usize>(data: &[u8], i: usize) -> Result<[u8; N], ProtocolError> {
    data.get(i..i + N)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| too_short(i + N, data.len()))
}

fn byte_at(data: &[u8], i: usize) -> Result<u8, ProtocolError> {
    data.get(i).copied().ok_or_else(|| too_short(i + 1, data.len()))
}

fn u16_at(data: &[u8], i: usize) -> Result<u16, ProtocolError> {
    bytes_at(data, i).map(u16::from_le_bytes)
}

fn i16_at(data: &[u8], i: usize) -> Result<i16, ProtocolError> {
    bytes_at(data, i).map(i16::from_le_bytes)
}

fn u32_at(data: &[u8], i: usize) -> Result<u32, ProtocolError> {
    bytes_at(data, i).map(u32::from_le_bytes)
}

fn i32_at(data: &[u8], i: usize) -> Result<i32, ProtocolError> {
    bytes_at(data, i).map(i32::from_le_bytes)
}

fn coord_at(data: &[u8], i: usize) -> Result<f64, ProtocolError> {
    i32_at(data, i).map(|v| v as f64 / COORD_SCALE)
}

/// Signed SNR byte in quarter-dB steps.
fn snr_at(data: &[u8], i: usize) -> Result<f32, ProtocolError> {
    byte_at(data, i).map(|b| b as i8 as f32 / 4.0)
}

/// SNR header of the extended message layouts: signed byte scaled by 4.
fn extended_snr_at(data: &[u8], i: usize) -> Result<f32, ProtocolError> {
    byte_at(data, i).map(|b| b as i8 as f32 * 4.0)
}

fn prefix_at(data: &[u8], i: usize) -> Result<PublicKeyPrefix, ProtocolError> {
    bytes_at(data, i).map(PublicKeyPrefix::new)
}

fn pubkey_hex(data: &[u8], i: usize) -> Result<String, ProtocolError> {
    prefix_at(data, i).map(|p| p.to_hex())
}

/// Lossy UTF-8 with NUL padding removed.
fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).replace('\0', "")
}

fn optional_key(frame: &[u8]) -> Option<PublicKey> {
    frame
        .get(1..1 + PUB_KEY_SIZE)
        .and_then(PublicKey::from_slice)
}

fn with_prefix(event: Event, prefix: Option<PublicKeyPrefix>) -> Event {
    match prefix {
        Some(p) => event.with_attribute("pubkey_prefix", p.to_hex()),
        None => event,
    }
}

// ============================================================================
// Layout decoders
// ============================================================================

/// Contact record, without its leading tag byte.
fn decode_contact(data: &[u8]) -> Result<Contact, ProtocolError> {
    const PATH_OFFSET: usize = PUB_KEY_SIZE + 3;
    const NAME_OFFSET: usize = PATH_OFFSET + MAX_PATH_SIZE;
    const ADVERT_OFFSET: usize = NAME_OFFSET + CONTACT_NAME_SIZE;

    require(data, ADVERT_OFFSET + 4)?;

    let out_path_len = data[PUB_KEY_SIZE + 2] as i8;
    let plen = (out_path_len.max(0) as usize).min(MAX_PATH_SIZE);

    let mut contact = Contact {
        public_key: PublicKey::from_slice(&data[..PUB_KEY_SIZE]).unwrap_or_default(),
        contact_type: data[PUB_KEY_SIZE],
        flags: data[PUB_KEY_SIZE + 1],
        out_path_len,
        out_path: data[PATH_OFFSET..PATH_OFFSET + plen].to_vec(),
        adv_name: text(&data[NAME_OFFSET..ADVERT_OFFSET]),
        last_advert: u32_at(data, ADVERT_OFFSET)?,
        ..Default::default()
    };

    // Location and lastmod trail the fixed record on newer firmware.
    if let (Ok(lat), Ok(lon)) = (coord_at(data, ADVERT_OFFSET + 4), coord_at(data, ADVERT_OFFSET + 8)) {
        contact.adv_lat = lat;
        contact.adv_lon = lon;
    }
    if let Ok(lastmod) = u32_at(data, ADVERT_OFFSET + 12) {
        contact.lastmod = lastmod;
    }

    Ok(contact)
}

fn decode_self_info(frame: &[u8]) -> Result<SelfInfo, ProtocolError> {
    require(frame, 58)?;
    Ok(SelfInfo {
        adv_type: frame[1],
        tx_power: frame[2],
        max_tx_power: frame[3],
        public_key: PublicKey::from_slice(&frame[4..36]).unwrap_or_default(),
        adv_lat: coord_at(frame, 36)?,
        adv_lon: coord_at(frame, 40)?,
        radio_freq: u32_at(frame, 48)? as f64 / 1000.0,
        radio_bw: u32_at(frame, 52)? as f64 / 1000.0,
        radio_sf: frame[56],
        radio_cr: frame[57],
        name: text(&frame[58..]),
    })
}

fn decode_device_info(frame: &[u8]) -> Result<DeviceInfo, ProtocolError> {
    let fw_ver = byte_at(frame, 1)?;
    if fw_ver < 3 {
        return Ok(DeviceInfo {
            fw_ver,
            capabilities: None,
        });
    }

    require(frame, 80)?;
    Ok(DeviceInfo {
        fw_ver,
        capabilities: Some(DeviceCapabilities {
            max_contacts: frame[2] as u16 * 2,
            max_channels: frame[3],
            ble_pin: u32_at(frame, 4)?,
            fw_build: text(&frame[8..20]),
            model: text(&frame[20..60]),
            version: text(&frame[60..80]),
        }),
    })
}

/// Contact message fields starting at `base` (1 for the base layout, 4 for
/// the extended one).
fn decode_contact_message(
    frame: &[u8],
    base: usize,
    snr: Option<f32>,
) -> Result<ContactMessage, ProtocolError> {
    let body = base + 12;
    require(frame, body)?;

    let txt_type = TextType::from(frame[base + 7]);
    let (signature, text_start) = if txt_type == TextType::SignedPlain {
        (Some(bytes_at(frame, body)?), body + 4)
    } else {
        (None, body)
    };

    Ok(ContactMessage {
        pubkey_prefix: prefix_at(frame, base)?,
        path_len: frame[base + 6],
        txt_type,
        sender_timestamp: u32_at(frame, base + 8)?,
        signature,
        text: text(&frame[text_start..]),
        snr,
    })
}

fn decode_channel_message(
    frame: &[u8],
    base: usize,
    snr: Option<f32>,
) -> Result<ChannelMessage, ProtocolError> {
    let body = base + 7;
    require(frame, body)?;

    Ok(ChannelMessage {
        channel_idx: frame[base],
        path_len: frame[base + 1],
        txt_type: TextType::from(frame[base + 2]),
        sender_timestamp: u32_at(frame, base + 3)?,
        text: text(&frame[body..]),
        snr,
    })
}

fn decode_status(frame: &[u8]) -> Result<StatusReport, ProtocolError> {
    require(frame, 56)?;
    Ok(StatusReport {
        pubkey_prefix: prefix_at(frame, 2)?,
        bat: u16_at(frame, 8)?,
        tx_queue_len: u16_at(frame, 10)?,
        free_queue_len: u16_at(frame, 12)?,
        last_rssi: i16_at(frame, 14)?,
        nb_recv: u32_at(frame, 16)?,
        nb_sent: u32_at(frame, 20)?,
        airtime: u32_at(frame, 24)?,
        uptime: u32_at(frame, 28)?,
        sent_flood: u32_at(frame, 32)?,
        sent_direct: u32_at(frame, 36)?,
        recv_flood: u32_at(frame, 40)?,
        recv_direct: u32_at(frame, 44)?,
        full_evts: u16_at(frame, 48)?,
        last_snr: i16_at(frame, 50)? as f32 / 4.0,
        direct_dups: u16_at(frame, 52)?,
        flood_dups: u16_at(frame, 54)?,
    })
}

fn decode_trace(frame: &[u8]) -> Result<TraceData, ProtocolError> {
    require(frame, 12)?;
    // frame[1] is reserved
    let path_len = frame[2];
    let flags = frame[3];
    let tag = u32_at(frame, 4)?;
    let auth_code = u32_at(frame, 8)?;

    let hashes_end = 12 + path_len as usize;
    let snr_count = (path_len as usize) >> (flags & 0x03);
    let snrs_end = hashes_end + snr_count;
    require(frame, snrs_end + 1)?;

    Ok(TraceData {
        path_len,
        flags,
        tag,
        auth_code,
        path_hashes: frame[12..hashes_end].to_vec(),
        path_snrs: frame[hashes_end..snrs_end]
            .iter()
            .map(|&b| b as i8 as f32 / 4.0)
            .collect(),
        final_snr: snr_at(frame, snrs_end)?,
    })
}

fn decode_path_response(frame: &[u8]) -> Result<PathResponse, ProtocolError> {
    // frame[1] is reserved
    let pubkey_prefix = prefix_at(frame, 2)?;
    let out_len = byte_at(frame, 8)? as usize;
    let out_end = 9 + out_len;
    let in_len = byte_at(frame, out_end)? as usize;
    let in_start = out_end + 1;
    require(frame, in_start + in_len)?;

    Ok(PathResponse {
        pubkey_prefix,
        out_path: frame[9..out_end].to_vec(),
        in_path: frame[in_start..in_start + in_len].to_vec(),
    })
}
