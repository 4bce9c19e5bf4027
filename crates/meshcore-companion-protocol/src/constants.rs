//! Protocol constants
//!
//! Opcodes, response tags, push tags and sizes of the MeshCore companion
//! protocol. Every value here is a compatibility contract with firmware.

// ============================================================================
// Frame Markers
// ============================================================================

/// Marker byte of frames travelling device → host.
pub const FRAME_MARKER_INBOUND: u8 = b'>';
/// Marker byte of frames travelling host → device.
pub const FRAME_MARKER_OUTBOUND: u8 = b'<';
/// Marker byte plus the little-endian u16 payload length.
pub const FRAME_HEADER_SIZE: usize = 3;
/// Default upper bound for an inbound frame payload.
pub const MAX_FRAME_LEN: usize = 1024;

// ============================================================================
// Command Codes (host → firmware)
// ============================================================================

/// Start the app session; answered with SELF_INFO.
pub const CMD_APP_START: u8 = 0x01;
/// Send a direct text message (plain or CLI data).
pub const CMD_SEND_TXT_MSG: u8 = 0x02;
/// Send a text message to a channel.
pub const CMD_SEND_CHANNEL_TXT_MSG: u8 = 0x03;
/// Get the list of contacts.
pub const CMD_GET_CONTACTS: u8 = 0x04;
/// Get the device clock.
pub const CMD_GET_DEVICE_TIME: u8 = 0x05;
/// Set the device clock.
pub const CMD_SET_DEVICE_TIME: u8 = 0x06;
/// Send a self advertisement.
pub const CMD_SEND_SELF_ADVERT: u8 = 0x07;
/// Set the advertised name.
pub const CMD_SET_ADVERT_NAME: u8 = 0x08;
/// Add or update a contact record.
pub const CMD_ADD_UPDATE_CONTACT: u8 = 0x09;
/// Pop the next message from the offline queue.
pub const CMD_SYNC_NEXT_MESSAGE: u8 = 0x0A;
/// Set radio parameters.
pub const CMD_SET_RADIO_PARAMS: u8 = 0x0B;
/// Set TX power.
pub const CMD_SET_RADIO_TX_POWER: u8 = 0x0C;
/// Forget the path to a contact.
pub const CMD_RESET_PATH: u8 = 0x0D;
/// Set advertised latitude/longitude.
pub const CMD_SET_ADVERT_LATLON: u8 = 0x0E;
/// Remove a contact.
pub const CMD_REMOVE_CONTACT: u8 = 0x0F;
/// Share a contact by zero-hop broadcast.
pub const CMD_SHARE_CONTACT: u8 = 0x10;
/// Export a contact (or self) as a URI blob.
pub const CMD_EXPORT_CONTACT: u8 = 0x11;
/// Reboot the device.
pub const CMD_REBOOT: u8 = 0x13;
/// Get battery voltage.
pub const CMD_GET_BATTERY: u8 = 0x14;
/// Set tuning parameters.
pub const CMD_SET_TUNING_PARAMS: u8 = 0x15;
/// Query device information.
pub const CMD_DEVICE_QUERY: u8 = 0x16;
/// Log in to a repeater or room server.
pub const CMD_SEND_LOGIN: u8 = 0x1A;
/// Request status from a repeater or room server.
pub const CMD_SEND_STATUS_REQ: u8 = 0x1B;
/// Log out of a repeater or room server.
pub const CMD_LOGOUT: u8 = 0x1D;
/// Send a trace packet along a repeater path.
pub const CMD_SEND_TRACE_PATH: u8 = 0x24;
/// Set the BLE pairing PIN.
pub const CMD_SET_DEVICE_PIN: u8 = 0x25;
/// Run a CLI command on the attached device.
pub const CMD_SEND_CLI: u8 = 0x32;

/// Protocol version announced by DEVICE_QUERY and APP_START.
pub const APP_PROTOCOL_VERSION: u8 = 0x03;

// ============================================================================
// Response Tags (firmware → host)
// ============================================================================

/// Generic OK, optionally carrying a u32 result.
pub const RESP_CODE_OK: u8 = 0;
/// Generic error, optionally carrying an error code.
pub const RESP_CODE_ERR: u8 = 1;
/// Start of a contact list.
pub const RESP_CODE_CONTACTS_START: u8 = 2;
/// One contact record.
pub const RESP_CODE_CONTACT: u8 = 3;
/// End of a contact list.
pub const RESP_CODE_END_OF_CONTACTS: u8 = 4;
/// Self info (reply to APP_START).
pub const RESP_CODE_SELF_INFO: u8 = 5;
/// Message queued for sending.
pub const RESP_CODE_SENT: u8 = 6;
/// Contact message, base layout.
pub const RESP_CODE_CONTACT_MSG_RECV: u8 = 7;
/// Channel message, base layout.
pub const RESP_CODE_CHANNEL_MSG_RECV: u8 = 8;
/// Device clock.
pub const RESP_CODE_CURR_TIME: u8 = 9;
/// Offline queue is empty.
pub const RESP_CODE_NO_MORE_MESSAGES: u8 = 10;
/// Exported contact blob.
pub const RESP_CODE_EXPORT_CONTACT: u8 = 11;
/// Battery voltage.
pub const RESP_CODE_BATTERY: u8 = 12;
/// Device info.
pub const RESP_CODE_DEVICE_INFO: u8 = 13;
/// Contact message, extended layout with leading SNR.
pub const RESP_CODE_CONTACT_MSG_RECV_EXT: u8 = 16;
/// Channel message, extended layout with leading SNR.
pub const RESP_CODE_CHANNEL_MSG_RECV_EXT: u8 = 17;
/// CLI command output.
pub const RESP_CODE_CLI_RESPONSE: u8 = 50;

// ============================================================================
// Push Tags (unsolicited firmware → host)
// ============================================================================

/// Advertisement heard.
pub const PUSH_CODE_ADVERT: u8 = 0x80;
/// Path to a contact changed.
pub const PUSH_CODE_PATH_UPDATED: u8 = 0x81;
/// Delivery acknowledgement received.
pub const PUSH_CODE_SEND_CONFIRMED: u8 = 0x82;
/// Messages are waiting in the offline queue.
pub const PUSH_CODE_MSG_WAITING: u8 = 0x83;
/// Raw radio data.
pub const PUSH_CODE_RAW_DATA: u8 = 0x84;
/// Login accepted.
pub const PUSH_CODE_LOGIN_SUCCESS: u8 = 0x85;
/// Login rejected.
pub const PUSH_CODE_LOGIN_FAIL: u8 = 0x86;
/// Status report from a repeater or room server.
pub const PUSH_CODE_STATUS_RESPONSE: u8 = 0x87;
/// Device log line.
pub const PUSH_CODE_LOG_DATA: u8 = 0x88;
/// Trace result.
pub const PUSH_CODE_TRACE_DATA: u8 = 0x89;
/// New contact heard while auto-add is off.
pub const PUSH_CODE_NEW_ADVERT: u8 = 0x8A;
/// Telemetry reply.
pub const PUSH_CODE_TELEMETRY_RESPONSE: u8 = 0x8B;
/// Binary request reply.
pub const PUSH_CODE_BINARY_RESPONSE: u8 = 0x8C;
/// Path discovery reply.
pub const PUSH_CODE_PATH_DISCOVERY_RESPONSE: u8 = 0x8D;

// ============================================================================
// Error Codes
// ============================================================================

/// Unsupported command.
pub const ERR_CODE_UNSUPPORTED_CMD: u8 = 1;
/// Contact/item not found.
pub const ERR_CODE_NOT_FOUND: u8 = 2;
/// Table (contacts, packets, etc.) is full.
pub const ERR_CODE_TABLE_FULL: u8 = 3;
/// Bad state for this operation.
pub const ERR_CODE_BAD_STATE: u8 = 4;
/// File I/O error.
pub const ERR_CODE_FILE_IO_ERROR: u8 = 5;
/// Illegal argument.
pub const ERR_CODE_ILLEGAL_ARG: u8 = 6;

// ============================================================================
// Text Types
// ============================================================================

/// Plain text message.
pub const TXT_TYPE_PLAIN: u8 = 0;
/// CLI/command data.
pub const TXT_TYPE_CLI_DATA: u8 = 1;
/// Signed plain text message.
pub const TXT_TYPE_SIGNED_PLAIN: u8 = 2;

// ============================================================================
// Sizes
// ============================================================================

/// Size of a public key in bytes.
pub const PUB_KEY_SIZE: usize = 32;
/// Size of the key prefix used for message addressing.
pub const PUB_KEY_PREFIX_SIZE: usize = 6;
/// Size of the out_path field in a contact record.
pub const MAX_PATH_SIZE: usize = 64;
/// Size of the name field in a contact record.
pub const CONTACT_NAME_SIZE: usize = 32;
/// Fixed-point scale of coordinates (microdegrees).
pub const COORD_SCALE: f64 = 1_000_000.0;

/// Scheme prefix of exported contact URIs.
pub const CONTACT_URI_SCHEME: &str = "meshcore://";
