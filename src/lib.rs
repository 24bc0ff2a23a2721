#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # solelink
//!
//! A Rust client for the proprietary control/telemetry protocol spoken by
//! Sole treadmills (F80 family) over Bluetooth Low Energy.
//!
//! The console frames every message as `0x5B | len | payload | 0x5D`, with
//! the first payload byte selecting one of roughly twenty-five fixed-layout
//! message variants. The protocol is half duplex and chatty: the console
//! streams unsolicited telemetry that the client must acknowledge, while
//! client requests are answered either by an ACK frame or by echoing the
//! request back. This crate implements the wire codec and the session
//! machinery around it:
//!
//! - **Codec** ([`protocol`], [`frame`]): bit-exact encode/decode for every
//!   message variant, validated against traffic captures.
//! - **Session** ([`device`]): serialized writes, request/response with the
//!   console's 300 ms retransmission cadence, listener fan-out for
//!   telemetry, automatic acknowledgements, and the reconnect ritual the
//!   console forces when a workout starts.
//! - **Transport** ([`ble`]): a small GATT seam with a btleplug-backed
//!   implementation, kept behind a trait so sessions can run over fakes.
//!
//! ## Quick start
//!
//! ```no_run
//! use solelink::Treadmill;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let treadmill = Treadmill::new("AA:BB:CC:DD:EE:FF")?;
//!     treadmill.connect(&CancellationToken::new()).await?;
//!
//!     let info = treadmill.get_device_info().await?;
//!     println!("connected to a {} (max speed {})", info.model, info.max_speed);
//!
//!     treadmill.add_listener(|event| {
//!         if let Ok(msg) = event {
//!             println!("<- {msg}");
//!         }
//!     });
//!
//!     treadmill.start_workout().await?;
//!     Ok(())
//! }
//! ```

/// Bluetooth Low Energy transport seam and btleplug implementation
pub mod ble;
/// Treadmill session: connection lifecycle, commands, telemetry fan-out
pub mod device;
/// Error types and handling
pub mod error;
/// Wire envelope codec
pub mod frame;
/// One-shot response waiters keyed by message type
mod pending;
/// Protocol message structures, encoding and decoding
pub mod protocol;
/// Protocol enumerations and session configuration
pub mod types;

pub use device::{MessageListener, Treadmill};
pub use error::{Result, TreadmillError};
pub use protocol::{DeviceInfo, EndWorkout, Message, UserProfile, WorkoutData};
pub use types::{
    CommandType, DeviceModel, MessageType, Program, SessionConfig, SexType, UnitsType, WorkoutMode,
};

use uuid::{uuid, Uuid};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// GATT service the console exposes its serial bridge on
///
/// The service is a Microchip/ISSC UART bridge; the console tunnels its
/// framed protocol through it unchanged.
pub const SERVICE_UUID: Uuid = uuid!("49535343-FE7D-4AE5-8FA9-9FAFD205E455");

/// Characteristic for client-to-console writes
pub const WRITE_CHARACTERISTIC_UUID: Uuid = uuid!("49535343-8841-43F4-A8D4-ECBE34729BB3");

/// Characteristic the console pushes notifications through
pub const NOTIFY_CHARACTERISTIC_UUID: Uuid = uuid!("49535343-1E4D-4BD9-BA61-23C647249616");
