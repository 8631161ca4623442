//! Serial link to the mesh coordinator device.
//!
//! The coordinator shares one serial line between firmware chatter and
//! gateway traffic, framed as newline-terminated text.  This module owns the
//! device end of that line:
//!
//! 1. Finding the device (explicit path, or USB enumeration when omitted).
//! 2. Opening it at the coordinator's fixed baud rate.
//! 3. Reading it line-by-line and feeding each line to the dispatcher as a
//!    [`GatewayEvent::HardwareLine`].
//!
//! Frame interpretation happens in the dispatcher (via
//! [`gateway_core::packet::frame`]), not here — this module only moves lines.

use futures_util::StreamExt;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tokio_serial::{SerialPortBuilderExt, SerialPortType, SerialStream};
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing::{debug, info, warn};

use crate::application::dispatch::GatewayEvent;
use crate::domain::config::SERIAL_BAUD_RATE;

/// USB manufacturer string of the coordinator's on-board debug interface.
///
/// Auto-discovery accepts a port only when its USB descriptor reports this
/// manufacturer, which is how the coordinator dev kits enumerate.
pub const COORDINATOR_MANUFACTURER: &str = "SEGGER";

/// Errors from device selection and opening.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Enumeration found no candidate coordinator device.
    #[error("no coordinator serial device found")]
    NoDevice,

    /// Enumeration found more than one candidate; the caller must pass an
    /// explicit device path to disambiguate.
    #[error("{0} candidate coordinator devices found; pass the device explicitly")]
    AmbiguousDevice(usize),

    /// The serial subsystem could not list ports at all.
    #[error("serial port enumeration failed: {0}")]
    Enumeration(#[from] tokio_serial::Error),
}

/// Resolves the serial device to use.
///
/// An explicitly configured path always wins.  Otherwise every available port
/// is enumerated and exactly one must identify as a coordinator
/// ([`COORDINATOR_MANUFACTURER`]); zero or several candidates is an error the
/// caller turns into the usage message.
pub fn resolve_device(explicit: Option<String>) -> Result<String, LinkError> {
    if let Some(device) = explicit {
        return Ok(device);
    }

    let candidates: Vec<String> = tokio_serial::available_ports()?
        .into_iter()
        .filter(|port| match &port.port_type {
            SerialPortType::UsbPort(usb) => {
                usb.manufacturer.as_deref() == Some(COORDINATOR_MANUFACTURER)
            }
            _ => false,
        })
        .map(|port| port.port_name)
        .collect();

    match candidates.len() {
        0 => Err(LinkError::NoDevice),
        1 => Ok(candidates.into_iter().next().unwrap()),
        n => Err(LinkError::AmbiguousDevice(n)),
    }
}

/// Opens the serial device at the coordinator's fixed baud rate.
///
/// # Errors
///
/// Returns the underlying serial error when the device cannot be opened
/// (missing node, permission denied, already in use).  The caller treats this
/// as fatal at startup.
pub fn open_link(device: &str) -> tokio_serial::Result<SerialStream> {
    info!("Opening serial port {device}");
    tokio_serial::new(device, SERIAL_BAUD_RATE).open_native_async()
}

/// Reads the serial link line-by-line until it closes.
///
/// Each complete line becomes a [`GatewayEvent::HardwareLine`]; the
/// dispatcher decides whether it carries a message.  Returns when the device
/// disappears, the line errors out, or the dispatcher is gone.
pub async fn run_serial_reader(stream: SerialStream, events: UnboundedSender<GatewayEvent>) {
    // LinesCodec splits the byte stream at '\n' and strips the terminator,
    // handing us owned Strings — the same framing the coordinator writes.
    let mut lines = FramedRead::new(stream, LinesCodec::new());

    while let Some(item) = lines.next().await {
        match item {
            Ok(line) => {
                if events.send(GatewayEvent::HardwareLine(line)).is_err() {
                    debug!("dispatcher gone; serial reader exiting");
                    return;
                }
            }
            Err(e) => {
                warn!("serial link read failed: {e}");
                return;
            }
        }
    }
    warn!("serial link closed");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
