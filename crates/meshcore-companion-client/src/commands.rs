//! Per-command API.
//!
//! Every method returns an [`Event`]: the device's answer, a local OK for
//! send-only commands, or an ERROR event for device errors, timeouts and
//! arguments that could not be encoded.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use meshcore_companion_protocol::{
    AttributeFilter, Command, Contact, Destination, EncodeError, ErrorDetail, Event, EventKind,
    TracePath, APP_PROTOCOL_VERSION,
};
use rand::Rng;
use tracing::debug;

use crate::correlator::Correlator;
use crate::transport::Transport;

/// Typed command methods on top of a [`Correlator`].
pub struct CommandHandler<T> {
    correlator: Correlator<T>,
    message_timeout: Duration,
    timeout: Option<Duration>,
}

impl<T> Clone for CommandHandler<T> {
    fn clone(&self) -> Self {
        CommandHandler {
            correlator: self.correlator.clone(),
            message_timeout: self.message_timeout,
            timeout: self.timeout,
        }
    }
}

fn now_secs() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or_default()
}

impl<T: Transport> CommandHandler<T> {
    pub fn new(correlator: Correlator<T>, message_timeout: Duration) -> Self {
        CommandHandler {
            correlator,
            message_timeout,
            timeout: None,
        }
    }

    /// A handler whose commands use `timeout` instead of the default.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        CommandHandler {
            timeout: Some(timeout),
            ..self.clone()
        }
    }

    pub fn correlator(&self) -> &Correlator<T> {
        &self.correlator
    }

    async fn execute(&self, command: Command) -> Event {
        self.correlator.send_command(&command, self.timeout).await
    }

    async fn try_execute(&self, command: Result<Command, EncodeError>) -> Event {
        match command {
            Ok(command) => self.execute(command).await,
            Err(err) => {
                debug!("command not sent: {}", err);
                Event::error(ErrorDetail::Encode(err))
            }
        }
    }

    // ------------------------------------------------------------------
    // Device
    // ------------------------------------------------------------------

    /// Start the session; answered with SELF_INFO.
    pub async fn send_appstart(&self, app_version: u8, app_name: &str) -> Event {
        self.execute(Command::app_start(app_version, app_name)).await
    }

    pub async fn send_device_query(&self) -> Event {
        self.execute(Command::DeviceQuery {
            app_version: APP_PROTOCOL_VERSION,
        })
        .await
    }

    pub async fn send_advert(&self, flood: bool) -> Event {
        self.execute(Command::SendSelfAdvert { flood }).await
    }

    pub async fn set_name(&self, name: &str) -> Event {
        self.execute(Command::SetAdvertName { name: name.to_owned() })
            .await
    }

    /// Set the advertised position in degrees.
    pub async fn set_coords(&self, lat: f64, lon: f64) -> Event {
        self.execute(Command::set_coords(lat, lon)).await
    }

    pub async fn set_tx_power(&self, power_dbm: u32) -> Event {
        self.execute(Command::SetRadioTxPower { power_dbm }).await
    }

    /// Set radio parameters; frequency in MHz, bandwidth in kHz.
    pub async fn set_radio(&self, freq_mhz: f64, bw_khz: f64, sf: u8, cr: u8) -> Event {
        self.execute(Command::set_radio(freq_mhz, bw_khz, sf, cr))
            .await
    }

    /// Set tuning parameters. Values go on the wire as given.
    pub async fn set_tuning(&self, rx_delay: u32, airtime_factor: u32) -> Event {
        self.execute(Command::SetTuningParams {
            rx_delay,
            airtime_factor,
        })
        .await
    }

    pub async fn set_devicepin(&self, pin: u32) -> Event {
        self.execute(Command::SetDevicePin { pin }).await
    }

    /// Reboot the device. Returns a local OK; the firmware never answers.
    pub async fn reboot(&self) -> Event {
        self.execute(Command::Reboot).await
    }

    pub async fn get_bat(&self) -> Event {
        self.execute(Command::GetBattery).await
    }

    pub async fn get_time(&self) -> Event {
        self.execute(Command::GetDeviceTime).await
    }

    pub async fn set_time(&self, time_secs: u32) -> Event {
        self.execute(Command::SetDeviceTime { time_secs }).await
    }

    /// Set the device clock from the host clock.
    pub async fn sync_time(&self) -> Event {
        self.set_time(now_secs()).await
    }

    /// Run a CLI command on the attached device.
    pub async fn send_cli(&self, command: &str) -> Event {
        self.execute(Command::SendCli {
            command: command.to_owned(),
        })
        .await
    }

    // ------------------------------------------------------------------
    // Contacts
    // ------------------------------------------------------------------

    /// Fetch the contact list, optionally only entries modified after `since`.
    pub async fn get_contacts(&self, since: Option<u32>) -> Event {
        self.execute(Command::GetContacts { since }).await
    }

    pub async fn reset_path<'a>(&self, dst: impl Into<Destination<'a>>) -> Event {
        self.try_execute(Command::reset_path(dst.into())).await
    }

    pub async fn share_contact<'a>(&self, dst: impl Into<Destination<'a>>) -> Event {
        self.try_execute(Command::share_contact(dst.into())).await
    }

    /// Export a contact as a `meshcore://` URI, or this node when `dst` is `None`.
    pub async fn export_contact<'a>(&self, dst: Option<Destination<'a>>) -> Event {
        self.try_execute(Command::export_contact(dst)).await
    }

    pub async fn remove_contact<'a>(&self, dst: impl Into<Destination<'a>>) -> Event {
        self.try_execute(Command::remove_contact(dst.into())).await
    }

    pub async fn update_contact(&self, contact: &Contact) -> Event {
        self.execute(Command::AddUpdateContact {
            contact: contact.clone(),
        })
        .await
    }

    pub async fn change_contact_path(&self, contact: &Contact, path: &[u8]) -> Event {
        self.execute(Command::change_contact_path(contact, path))
            .await
    }

    // ------------------------------------------------------------------
    // Messaging
    // ------------------------------------------------------------------

    /// Pop the next queued message. Uses the message timeout unless this
    /// handler carries its own.
    pub async fn get_msg(&self) -> Event {
        let command = Command::SyncNextMessage;
        self.correlator
            .send_command(&command, Some(self.timeout.unwrap_or(self.message_timeout)))
            .await
    }

    /// Send a text message. `timestamp` defaults to the current time.
    pub async fn send_msg<'a>(
        &self,
        dst: impl Into<Destination<'a>>,
        text: &str,
        timestamp: Option<u32>,
    ) -> Event {
        let timestamp = timestamp.unwrap_or_else(now_secs);
        self.try_execute(Command::send_msg(dst.into(), text, timestamp))
            .await
    }

    /// Send a CLI command to a remote node as a text message.
    pub async fn send_cmd<'a>(
        &self,
        dst: impl Into<Destination<'a>>,
        cmd: &str,
        timestamp: Option<u32>,
    ) -> Event {
        let timestamp = timestamp.unwrap_or_else(now_secs);
        self.try_execute(Command::send_cmd(dst.into(), cmd, timestamp))
            .await
    }

    pub async fn send_chan_msg(&self, channel_idx: u8, text: &str, timestamp: Option<u32>) -> Event {
        let timestamp = timestamp.unwrap_or_else(now_secs);
        self.execute(Command::send_chan_msg(channel_idx, text, timestamp))
            .await
    }

    /// Wait for the ACK whose code matches a MSG_SENT `expected_ack`.
    pub async fn wait_for_ack(&self, expected_ack: [u8; 4], timeout: Option<Duration>) -> Event {
        let timeout = timeout
            .or(self.timeout)
            .unwrap_or_else(|| self.correlator.default_timeout());
        let filter = AttributeFilter::any().with("code", hex::encode(expected_ack));
        match self
            .correlator
            .dispatcher()
            .wait_for(EventKind::Ack, filter, timeout)
            .await
        {
            Ok(event) => event,
            Err(err) => Event::error(err.into()),
        }
    }

    // ------------------------------------------------------------------
    // Remote nodes
    // ------------------------------------------------------------------

    pub async fn send_login<'a>(&self, dst: impl Into<Destination<'a>>, password: &str) -> Event {
        self.try_execute(Command::send_login(dst.into(), password))
            .await
    }

    pub async fn send_logout<'a>(&self, dst: impl Into<Destination<'a>>) -> Event {
        self.try_execute(Command::send_logout(dst.into())).await
    }

    pub async fn send_statusreq<'a>(&self, dst: impl Into<Destination<'a>>) -> Event {
        self.try_execute(Command::send_statusreq(dst.into())).await
    }

    /// Send a trace packet. A random non-zero tag is used when none is given.
    pub async fn send_trace(
        &self,
        auth_code: Option<u32>,
        tag: Option<u32>,
        flags: u8,
        path: Option<&TracePath>,
    ) -> Event {
        let tag = tag.unwrap_or_else(|| rand::thread_rng().gen_range(1..=u32::MAX));
        self.try_execute(Command::send_trace(tag, auth_code.unwrap_or_default(), flags, path))
            .await
    }
}
