//! Commands that can be sent to the companion firmware.

use crate::constants::*;
use crate::destination::Destination;
use crate::error::EncodeError;
use crate::events::EventKind;
use crate::types::*;

/// Repeater path argument of a trace command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TracePath {
    /// Raw path bytes.
    Bytes(Vec<u8>),
    /// Comma-separated hex bytes, e.g. `"23,5f,3a"`.
    Hex(String),
}

impl TracePath {
    /// Resolve the path to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        match self {
            TracePath::Bytes(bytes) => Ok(bytes.clone()),
            TracePath::Hex(s) if s.is_empty() => Ok(Vec::new()),
            TracePath::Hex(s) => s
                .split(',')
                .map(|tok| {
                    u8::from_str_radix(tok.trim(), 16)
                        .map_err(|e| EncodeError::InvalidPathFormat(format!("{s:?}: {e}")))
                })
                .collect(),
        }
    }
}

/// Commands that can be sent to the companion firmware.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Start the app session and get self info.
    AppStart {
        /// Protocol version the app understands.
        app_version: u8,
        /// App name string.
        app_name: String,
    },

    /// Query device information.
    DeviceQuery {
        /// Protocol version the app understands.
        app_version: u8,
    },

    /// Send a self-advertisement.
    SendSelfAdvert {
        /// Whether to flood (true) or zero-hop (false).
        flood: bool,
    },

    /// Set the advertisement name.
    SetAdvertName { name: String },

    /// Set advertisement latitude/longitude.
    SetAdvertLatLon {
        /// Latitude in microdegrees.
        lat: i32,
        /// Longitude in microdegrees.
        lon: i32,
        /// Altitude, currently always sent as 0.
        alt: i32,
    },

    /// Add or update a contact record.
    AddUpdateContact { contact: Contact },

    /// Get the list of contacts.
    GetContacts {
        /// Only return contacts modified after this time.
        since: Option<u32>,
    },

    /// Reset the path to a contact.
    ResetPath { public_key: PublicKey },

    /// Share a contact via zero-hop broadcast.
    ShareContact { public_key: PublicKey },

    /// Export a contact (or self if no key provided).
    ExportContact { public_key: Option<PublicKey> },

    /// Remove a contact.
    RemoveContact { public_key: PublicKey },

    /// Get the current device time.
    GetDeviceTime,

    /// Set the device time.
    SetDeviceTime {
        /// Unix timestamp in seconds.
        time_secs: u32,
    },

    /// Pop the next message from the offline queue.
    SyncNextMessage,

    /// Send a text message to a contact.
    SendTextMessage {
        /// Plain text or CLI data.
        text_type: TextType,
        /// Retry attempt number.
        attempt: u8,
        /// Message timestamp.
        timestamp: u32,
        /// Recipient's public key prefix.
        recipient_prefix: PublicKeyPrefix,
        text: String,
    },

    /// Send a text message to a channel.
    SendChannelTextMessage {
        text_type: TextType,
        channel_idx: u8,
        timestamp: u32,
        text: String,
    },

    /// Set the radio TX power.
    SetRadioTxPower { power_dbm: u32 },

    /// Set radio parameters.
    SetRadioParams {
        /// Frequency in kHz.
        freq_khz: u32,
        /// Bandwidth in Hz.
        bandwidth_hz: u32,
        spreading_factor: u8,
        coding_rate: u8,
    },

    /// Reboot the device. The firmware does not reply.
    Reboot,

    /// Get the battery voltage.
    GetBattery,

    /// Set tuning parameters.
    SetTuningParams {
        /// RX delay base (scaled by 1000).
        rx_delay: u32,
        /// Airtime factor (scaled by 1000).
        airtime_factor: u32,
    },

    /// Set the BLE pairing PIN.
    SetDevicePin { pin: u32 },

    /// Log in to a repeater or room server.
    SendLogin {
        public_key: PublicKey,
        password: String,
    },

    /// Request status from a repeater or room server.
    SendStatusRequest { public_key: PublicKey },

    /// Log out of a repeater or room server.
    Logout { public_key: PublicKey },

    /// Run a CLI command on the attached device.
    SendCli { command: String },

    /// Send a trace packet along a repeater path.
    SendTracePath {
        /// Correlation tag, echoed in TRACE_DATA.
        tag: u32,
        auth_code: u32,
        flags: u8,
        path: Vec<u8>,
    },
}

fn full_key(dst: Destination<'_>) -> Result<PublicKey, EncodeError> {
    let bytes = dst.normalize(PUB_KEY_SIZE)?;
    Ok(PublicKey::from_slice(&bytes).unwrap_or_default())
}

fn short_key(dst: Destination<'_>) -> Result<PublicKeyPrefix, EncodeError> {
    let bytes = dst.normalize(PUB_KEY_PREFIX_SIZE)?;
    Ok(PublicKeyPrefix::from_slice(&bytes).unwrap_or_default())
}

fn to_fixed_point(degrees: f64) -> i32 {
    (degrees * COORD_SCALE).round() as i32
}

// ============================================================================
// Constructors
// ============================================================================

impl Command {
    /// APP_START announcing this client.
    pub fn app_start(app_version: u8, app_name: impl Into<String>) -> Self {
        Command::AppStart {
            app_version,
            app_name: app_name.into(),
        }
    }

    /// Set the advertised position in degrees.
    pub fn set_coords(lat: f64, lon: f64) -> Self {
        Command::SetAdvertLatLon {
            lat: to_fixed_point(lat),
            lon: to_fixed_point(lon),
            alt: 0,
        }
    }

    /// Set radio parameters from MHz / kHz values.
    pub fn set_radio(freq_mhz: f64, bw_khz: f64, spreading_factor: u8, coding_rate: u8) -> Self {
        Command::SetRadioParams {
            freq_khz: (freq_mhz * 1000.0).round() as u32,
            bandwidth_hz: (bw_khz * 1000.0).round() as u32,
            spreading_factor,
            coding_rate,
        }
    }

    /// Replace a contact's out path, keeping the rest of the record.
    pub fn change_contact_path(contact: &Contact, path: &[u8]) -> Self {
        let mut contact = contact.clone();
        contact.out_path = path.iter().copied().take(MAX_PATH_SIZE).collect();
        contact.out_path_len = contact.out_path.len() as i8;
        Command::AddUpdateContact { contact }
    }

    pub fn reset_path(dst: Destination<'_>) -> Result<Self, EncodeError> {
        Ok(Command::ResetPath {
            public_key: full_key(dst)?,
        })
    }

    pub fn share_contact(dst: Destination<'_>) -> Result<Self, EncodeError> {
        Ok(Command::ShareContact {
            public_key: full_key(dst)?,
        })
    }

    /// Export a contact, or self when `dst` is `None`.
    pub fn export_contact(dst: Option<Destination<'_>>) -> Result<Self, EncodeError> {
        Ok(Command::ExportContact {
            public_key: dst.map(full_key).transpose()?,
        })
    }

    pub fn remove_contact(dst: Destination<'_>) -> Result<Self, EncodeError> {
        Ok(Command::RemoveContact {
            public_key: full_key(dst)?,
        })
    }

    /// Plain text message to a contact.
    pub fn send_msg(dst: Destination<'_>, text: &str, timestamp: u32) -> Result<Self, EncodeError> {
        Ok(Command::SendTextMessage {
            text_type: TextType::Plain,
            attempt: 0,
            timestamp,
            recipient_prefix: short_key(dst)?,
            text: text.to_owned(),
        })
    }

    /// CLI command addressed to a remote node.
    pub fn send_cmd(dst: Destination<'_>, cmd: &str, timestamp: u32) -> Result<Self, EncodeError> {
        Ok(Command::SendTextMessage {
            text_type: TextType::CliData,
            attempt: 0,
            timestamp,
            recipient_prefix: short_key(dst)?,
            text: cmd.to_owned(),
        })
    }

    pub fn send_chan_msg(channel_idx: u8, text: &str, timestamp: u32) -> Self {
        Command::SendChannelTextMessage {
            text_type: TextType::Plain,
            channel_idx,
            timestamp,
            text: text.to_owned(),
        }
    }

    pub fn send_login(dst: Destination<'_>, password: &str) -> Result<Self, EncodeError> {
        Ok(Command::SendLogin {
            public_key: full_key(dst)?,
            password: password.to_owned(),
        })
    }

    pub fn send_logout(dst: Destination<'_>) -> Result<Self, EncodeError> {
        Ok(Command::Logout {
            public_key: full_key(dst)?,
        })
    }

    pub fn send_statusreq(dst: Destination<'_>) -> Result<Self, EncodeError> {
        Ok(Command::SendStatusRequest {
            public_key: full_key(dst)?,
        })
    }

    /// Trace along an optional repeater path.
    pub fn send_trace(
        tag: u32,
        auth_code: u32,
        flags: u8,
        path: Option<&TracePath>,
    ) -> Result<Self, EncodeError> {
        Ok(Command::SendTracePath {
            tag,
            auth_code,
            flags,
            path: path.map(TracePath::to_bytes).transpose()?.unwrap_or_default(),
        })
    }
}

// ============================================================================
// Encoding
// ============================================================================

impl Command {
    /// Get the command code.
    pub fn code(&self) -> u8 {
        match self {
            Command::AppStart { .. } => CMD_APP_START,
            Command::DeviceQuery { .. } => CMD_DEVICE_QUERY,
            Command::SendSelfAdvert { .. } => CMD_SEND_SELF_ADVERT,
            Command::SetAdvertName { .. } => CMD_SET_ADVERT_NAME,
            Command::SetAdvertLatLon { .. } => CMD_SET_ADVERT_LATLON,
            Command::AddUpdateContact { .. } => CMD_ADD_UPDATE_CONTACT,
            Command::GetContacts { .. } => CMD_GET_CONTACTS,
            Command::ResetPath { .. } => CMD_RESET_PATH,
            Command::ShareContact { .. } => CMD_SHARE_CONTACT,
            Command::ExportContact { .. } => CMD_EXPORT_CONTACT,
            Command::RemoveContact { .. } => CMD_REMOVE_CONTACT,
            Command::GetDeviceTime => CMD_GET_DEVICE_TIME,
            Command::SetDeviceTime { .. } => CMD_SET_DEVICE_TIME,
            Command::SyncNextMessage => CMD_SYNC_NEXT_MESSAGE,
            Command::SendTextMessage { .. } => CMD_SEND_TXT_MSG,
            Command::SendChannelTextMessage { .. } => CMD_SEND_CHANNEL_TXT_MSG,
            Command::SetRadioTxPower { .. } => CMD_SET_RADIO_TX_POWER,
            Command::SetRadioParams { .. } => CMD_SET_RADIO_PARAMS,
            Command::Reboot => CMD_REBOOT,
            Command::GetBattery => CMD_GET_BATTERY,
            Command::SetTuningParams { .. } => CMD_SET_TUNING_PARAMS,
            Command::SetDevicePin { .. } => CMD_SET_DEVICE_PIN,
            Command::SendLogin { .. } => CMD_SEND_LOGIN,
            Command::SendStatusRequest { .. } => CMD_SEND_STATUS_REQ,
            Command::Logout { .. } => CMD_LOGOUT,
            Command::SendCli { .. } => CMD_SEND_CLI,
            Command::SendTracePath { .. } => CMD_SEND_TRACE_PATH,
        }
    }

    /// Event kinds that answer this command. Empty for send-only commands.
    pub fn expected_responses(&self) -> &'static [EventKind] {
        match self {
            Command::AppStart { .. } => &[EventKind::SelfInfo],
            Command::DeviceQuery { .. } => &[EventKind::DeviceInfo, EventKind::Error],
            Command::GetContacts { .. } => &[EventKind::Contacts, EventKind::Error],
            Command::ExportContact { .. } => &[EventKind::ContactShare, EventKind::Error],
            Command::GetDeviceTime => &[EventKind::CurrentTime, EventKind::Error],
            Command::SyncNextMessage => &[
                EventKind::ContactMsgRecv,
                EventKind::ChannelMsgRecv,
                EventKind::NoMoreMsgs,
                EventKind::Error,
            ],
            Command::SendTextMessage { .. }
            | Command::SendLogin { .. }
            | Command::SendStatusRequest { .. }
            | Command::SendTracePath { .. } => &[EventKind::MsgSent, EventKind::Error],
            Command::GetBattery => &[EventKind::Battery, EventKind::Error],
            Command::SendCli { .. } => &[EventKind::CliResponse, EventKind::Error],
            Command::Reboot => &[],
            Command::SendSelfAdvert { .. }
            | Command::SetAdvertName { .. }
            | Command::SetAdvertLatLon { .. }
            | Command::AddUpdateContact { .. }
            | Command::ResetPath { .. }
            | Command::ShareContact { .. }
            | Command::RemoveContact { .. }
            | Command::SetDeviceTime { .. }
            | Command::SendChannelTextMessage { .. }
            | Command::SetRadioTxPower { .. }
            | Command::SetRadioParams { .. }
            | Command::SetTuningParams { .. }
            | Command::SetDevicePin { .. }
            | Command::Logout { .. } => &[EventKind::Ok, EventKind::Error],
        }
    }

    /// Encode the command payload (unframed).
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        buf.push(self.code());

        match self {
            Command::AppStart {
                app_version,
                app_name,
            } => {
                buf.push(*app_version);
                buf.extend_from_slice(&[b' '; 6]);
                buf.extend_from_slice(app_name.as_bytes());
            }

            Command::DeviceQuery { app_version } => {
                buf.push(*app_version);
            }

            Command::SendSelfAdvert { flood } => {
                if *flood {
                    buf.push(1);
                }
            }

            Command::SetAdvertName { name } => {
                buf.extend_from_slice(name.as_bytes());
            }

            Command::SetAdvertLatLon { lat, lon, alt } => {
                buf.extend_from_slice(&lat.to_le_bytes());
                buf.extend_from_slice(&lon.to_le_bytes());
                buf.extend_from_slice(&alt.to_le_bytes());
            }

            Command::AddUpdateContact { contact } => {
                buf.extend_from_slice(contact.public_key.as_bytes());
                buf.push(contact.contact_type);
                buf.push(contact.flags);
                buf.push(contact.out_path_len as u8);
                let mut path_buf = [0u8; MAX_PATH_SIZE];
                let len = contact.out_path.len().min(MAX_PATH_SIZE);
                path_buf[..len].copy_from_slice(&contact.out_path[..len]);
                buf.extend_from_slice(&path_buf);
                // Name is 32 bytes, null-padded
                let mut name_buf = [0u8; CONTACT_NAME_SIZE];
                let name_bytes = contact.adv_name.as_bytes();
                let len = name_bytes.len().min(CONTACT_NAME_SIZE - 1);
                name_buf[..len].copy_from_slice(&name_bytes[..len]);
                buf.extend_from_slice(&name_buf);
                buf.extend_from_slice(&contact.last_advert.to_le_bytes());
                buf.extend_from_slice(&to_fixed_point(contact.adv_lat).to_le_bytes());
                buf.extend_from_slice(&to_fixed_point(contact.adv_lon).to_le_bytes());
            }

            Command::GetContacts { since } => {
                if let Some(since) = since {
                    buf.extend_from_slice(&since.to_le_bytes());
                }
            }

            Command::ResetPath { public_key }
            | Command::ShareContact { public_key }
            | Command::RemoveContact { public_key }
            | Command::SendStatusRequest { public_key }
            | Command::Logout { public_key } => {
                buf.extend_from_slice(public_key.as_bytes());
            }

            Command::ExportContact { public_key } => {
                if let Some(key) = public_key {
                    buf.extend_from_slice(key.as_bytes());
                }
            }

            Command::GetDeviceTime | Command::SyncNextMessage | Command::GetBattery => {}

            Command::SetDeviceTime { time_secs } => {
                buf.extend_from_slice(&time_secs.to_le_bytes());
            }

            Command::SendTextMessage {
                text_type,
                attempt,
                timestamp,
                recipient_prefix,
                text,
            } => {
                buf.push((*text_type).into());
                buf.push(*attempt);
                buf.extend_from_slice(&timestamp.to_le_bytes());
                buf.extend_from_slice(recipient_prefix.as_bytes());
                buf.extend_from_slice(text.as_bytes());
            }

            Command::SendChannelTextMessage {
                text_type,
                channel_idx,
                timestamp,
                text,
            } => {
                buf.push((*text_type).into());
                buf.push(*channel_idx);
                buf.extend_from_slice(&timestamp.to_le_bytes());
                buf.extend_from_slice(text.as_bytes());
            }

            Command::SetRadioTxPower { power_dbm } => {
                buf.extend_from_slice(&power_dbm.to_le_bytes());
            }

            Command::SetRadioParams {
                freq_khz,
                bandwidth_hz,
                spreading_factor,
                coding_rate,
            } => {
                buf.extend_from_slice(&freq_khz.to_le_bytes());
                buf.extend_from_slice(&bandwidth_hz.to_le_bytes());
                buf.push(*spreading_factor);
                buf.push(*coding_rate);
            }

            Command::Reboot => {
                buf.extend_from_slice(b"reboot");
            }

            Command::SetTuningParams {
                rx_delay,
                airtime_factor,
            } => {
                buf.extend_from_slice(&rx_delay.to_le_bytes());
                buf.extend_from_slice(&airtime_factor.to_le_bytes());
                buf.push(0);
                buf.push(0);
            }

            Command::SetDevicePin { pin } => {
                buf.extend_from_slice(&pin.to_le_bytes());
            }

            Command::SendLogin {
                public_key,
                password,
            } => {
                buf.extend_from_slice(public_key.as_bytes());
                buf.extend_from_slice(password.as_bytes());
            }

            Command::SendCli { command } => {
                buf.extend_from_slice(command.as_bytes());
            }

            Command::SendTracePath {
                tag,
                auth_code,
                flags,
                path,
            } => {
                buf.extend_from_slice(&tag.to_le_bytes());
                buf.extend_from_slice(&auth_code.to_le_bytes());
                buf.push(*flags);
                buf.extend_from_slice(path);
            }
        }

        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DestinationError;

    fn key_hex() -> String {
        "ab".repeat(32)
    }

    #[test]
    fn test_app_start() {
        let cmd = Command::app_start(APP_PROTOCOL_VERSION, "mccli");
        assert_eq!(cmd.encode(), b"\x01\x03      mccli".to_vec());
        assert_eq!(cmd.expected_responses(), &[EventKind::SelfInfo]);
    }

    #[test]
    fn test_simple_opcodes() {
        assert_eq!(Command::DeviceQuery { app_version: 3 }.encode(), vec![0x16, 0x03]);
        assert_eq!(Command::SendSelfAdvert { flood: false }.encode(), vec![0x07]);
        assert_eq!(Command::SendSelfAdvert { flood: true }.encode(), vec![0x07, 0x01]);
        assert_eq!(Command::GetDeviceTime.encode(), vec![0x05]);
        assert_eq!(Command::SyncNextMessage.encode(), vec![0x0a]);
        assert_eq!(Command::GetBattery.encode(), vec![0x14]);
        assert_eq!(Command::GetContacts { since: None }.encode(), vec![0x04]);
        assert_eq!(
            Command::GetContacts { since: Some(1) }.encode(),
            vec![0x04, 1, 0, 0, 0]
        );
    }

    #[test]
    fn test_reboot_is_send_only() {
        let cmd = Command::Reboot;
        assert_eq!(cmd.encode(), b"\x13reboot".to_vec());
        assert!(cmd.expected_responses().is_empty());
    }

    #[test]
    fn test_set_coords() {
        let payload = Command::set_coords(45.5, -73.6).encode();
        assert_eq!(payload.len(), 13);
        assert_eq!(payload[0], CMD_SET_ADVERT_LATLON);
        assert_eq!(i32::from_le_bytes(payload[1..5].try_into().unwrap()), 45_500_000);
        assert_eq!(i32::from_le_bytes(payload[5..9].try_into().unwrap()), -73_600_000);
        assert_eq!(&payload[9..13], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_set_radio_and_tuning() {
        let payload = Command::set_radio(869.525, 250.0, 11, 5).encode();
        assert_eq!(payload[0], CMD_SET_RADIO_PARAMS);
        assert_eq!(u32::from_le_bytes(payload[1..5].try_into().unwrap()), 869_525);
        assert_eq!(u32::from_le_bytes(payload[5..9].try_into().unwrap()), 250_000);
        assert_eq!(&payload[9..], &[11, 5]);

        let payload = Command::SetTuningParams {
            rx_delay: 10,
            airtime_factor: 20,
        }
        .encode();
        assert_eq!(payload, vec![0x15, 10, 0, 0, 0, 20, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_send_msg_layout() {
        let hex = key_hex();
        let cmd = Command::send_msg(Destination::Hex(&hex), "hi", 0x01020304).unwrap();
        let mut expected = vec![0x02, 0x00, 0x00, 4, 3, 2, 1];
        expected.extend_from_slice(&[0xab; 6]);
        expected.extend_from_slice(b"hi");
        assert_eq!(cmd.encode(), expected);
        assert_eq!(cmd.expected_responses(), &[EventKind::MsgSent, EventKind::Error]);

        let cmd = Command::send_cmd(Destination::Hex(&hex), "ver", 0).unwrap();
        assert_eq!(&cmd.encode()[..3], &[0x02, 0x01, 0x00]);
    }

    #[test]
    fn test_send_chan_msg_layout() {
        let cmd = Command::send_chan_msg(2, "yo", 5);
        assert_eq!(cmd.encode(), vec![0x03, 0x00, 2, 5, 0, 0, 0, b'y', b'o']);
        assert_eq!(cmd.expected_responses(), &[EventKind::Ok, EventKind::Error]);
    }

    #[test]
    fn test_full_key_commands() {
        let hex = key_hex();
        for cmd in [
            Command::reset_path(Destination::Hex(&hex)).unwrap(),
            Command::share_contact(Destination::Hex(&hex)).unwrap(),
            Command::remove_contact(Destination::Hex(&hex)).unwrap(),
            Command::send_statusreq(Destination::Hex(&hex)).unwrap(),
            Command::send_logout(Destination::Hex(&hex)).unwrap(),
        ] {
            let payload = cmd.encode();
            assert_eq!(payload.len(), 33);
            assert_eq!(&payload[1..], &[0xab; 32]);
        }

        let login = Command::send_login(Destination::Hex(&hex), "pw").unwrap().encode();
        assert_eq!(login[0], 0x1a);
        assert_eq!(&login[33..], b"pw");

        assert_eq!(Command::export_contact(None).unwrap().encode(), vec![0x11]);
    }

    #[test]
    fn test_short_destination_is_an_encode_error() {
        let err = Command::send_login(Destination::Hex("abcd"), "pw").unwrap_err();
        assert_eq!(err.reason(), "invalid_destination");
        assert!(matches!(
            err,
            EncodeError::Destination(DestinationError::KeyTooShort { .. })
        ));
    }

    #[test]
    fn test_trace_path_forms() {
        let cmd = Command::send_trace(7, 0, 1, Some(&TracePath::Hex("23, 5f,3a".into()))).unwrap();
        assert_eq!(
            cmd.encode(),
            vec![0x24, 7, 0, 0, 0, 0, 0, 0, 0, 1, 0x23, 0x5f, 0x3a]
        );

        let cmd = Command::send_trace(1, 2, 0, Some(&TracePath::Bytes(vec![9]))).unwrap();
        assert_eq!(cmd.encode().last(), Some(&9));

        let cmd = Command::send_trace(1, 2, 0, None).unwrap();
        assert_eq!(cmd.encode().len(), 10);

        let err = Command::send_trace(1, 0, 0, Some(&TracePath::Hex("23,zz".into()))).unwrap_err();
        assert_eq!(err.reason(), "invalid_path_format");
        assert!(TracePath::Hex("1ff".into()).to_bytes().is_err());
    }

    #[test]
    fn test_change_contact_path() {
        let contact = Contact {
            public_key: PublicKey::new([1; 32]),
            contact_type: 2,
            adv_name: "repeater".into(),
            last_advert: 99,
            adv_lat: 1.5,
            ..Default::default()
        };
        let payload = Command::change_contact_path(&contact, &[0xaa, 0xbb]).encode();
        assert_eq!(payload.len(), 1 + 32 + 3 + MAX_PATH_SIZE + CONTACT_NAME_SIZE + 12);
        assert_eq!(payload[0], CMD_ADD_UPDATE_CONTACT);
        assert_eq!(payload[33], 2);
        assert_eq!(payload[35], 2);
        assert_eq!(&payload[36..38], &[0xaa, 0xbb]);
        assert_eq!(&payload[100..108], b"repeater");
        assert_eq!(u32::from_le_bytes(payload[132..136].try_into().unwrap()), 99);
        assert_eq!(
            i32::from_le_bytes(payload[136..140].try_into().unwrap()),
            1_500_000
        );
    }
}
