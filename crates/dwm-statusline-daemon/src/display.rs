//! X11 display session.
//!
//! Owns the connection for the lifetime of the process, publishes the
//! status line as the root window name and reads the RandR backlight.

use dwm_statusline_hw::percent_of_range;
use thiserror::Error;
use tracing::{debug, info, warn};
use x11rb::connection::Connection;
use x11rb::errors::{ConnectError, ConnectionError, ReplyError};
use x11rb::protocol::randr::{ConnectionExt as _, Output};
use x11rb::protocol::xproto::{Atom, AtomEnum, ConnectionExt as _, PropMode, Window};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

/// Errors from the display connection.
#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("Cannot connect to X display: {0}")]
    Connect(#[from] ConnectError),

    #[error("X connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("X request failed: {0}")]
    Reply(#[from] ReplyError),

    #[error("X screen {0} does not exist")]
    NoScreen(usize),

    #[error("no RandR output exposes a Backlight property")]
    NoBacklight,
}

impl DisplayError {
    /// Returns the OS error code behind a connection failure, if any.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            DisplayError::Connect(ConnectError::IoError(e))
            | DisplayError::Connection(ConnectionError::IoError(e)) => e.raw_os_error(),
            _ => None,
        }
    }
}

/// Where the status line is published.
pub trait StatusDisplay {
    /// Returns the backlight level, if the display reports one.
    fn brightness_percent(&self) -> Option<u8>;

    /// Replaces the published status text and flushes it to the server.
    fn publish(&mut self, text: &str) -> Result<(), DisplayError>;

    /// Closes the display. Consumes the session so it runs exactly once.
    fn shutdown(self);
}

/// RandR output and the interned "Backlight" property atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RandrBacklight {
    output: Output,
    property: Atom,
}

/// An open X11 connection and the identifiers resolved at startup.
pub struct DisplaySession {
    conn: RustConnection,
    root: Window,
    backlight: Option<RandrBacklight>,
}

impl DisplaySession {
    /// Connects to the display (`None` uses `$DISPLAY`) and resolves the
    /// root window of the default screen.
    ///
    /// When `with_backlight` is set the RandR backlight is resolved too; a
    /// display without one is logged and otherwise ignored.
    pub fn connect(name: Option<&str>, with_backlight: bool) -> Result<Self, DisplayError> {
        let (conn, screen_num) = RustConnection::connect(name)?;
        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .ok_or(DisplayError::NoScreen(screen_num))?
            .root;
        info!("Connected to X display, root window 0x{:x}", root);

        let mut session = Self {
            conn,
            root,
            backlight: None,
        };

        if with_backlight {
            match session.resolve_backlight() {
                Ok(backlight) => {
                    debug!(
                        "Backlight on RandR output 0x{:x}, atom {}",
                        backlight.output, backlight.property
                    );
                    session.backlight = Some(backlight);
                }
                Err(e) => warn!("Backlight support missing: {}", e),
            }
        }

        Ok(session)
    }

    /// Returns true if the RandR backlight was resolved.
    pub fn has_backlight(&self) -> bool {
        self.backlight.is_some()
    }

    fn resolve_backlight(&self) -> Result<RandrBacklight, DisplayError> {
        let property = self.conn.intern_atom(true, b"Backlight")?.reply()?.atom;
        if property == x11rb::NONE {
            return Err(DisplayError::NoBacklight);
        }

        let resources = self.conn.randr_get_screen_resources(self.root)?.reply()?;
        for &output in &resources.outputs {
            let backlight = RandrBacklight { output, property };
            if self.read_raw(backlight)?.is_some() {
                return Ok(backlight);
            }
        }
        Err(DisplayError::NoBacklight)
    }

    fn read_raw(&self, backlight: RandrBacklight) -> Result<Option<i32>, DisplayError> {
        let reply = self
            .conn
            .randr_get_output_property(
                backlight.output,
                backlight.property,
                AtomEnum::NONE,
                0,
                4,
                false,
                false,
            )?
            .reply()?;
        Ok(decode_integer_property(
            reply.type_,
            reply.format,
            reply.num_items,
            &reply.data,
        ))
    }

    fn read_brightness(&self, backlight: RandrBacklight) -> Result<Option<u8>, DisplayError> {
        let Some(current) = self.read_raw(backlight)? else {
            return Ok(None);
        };
        let valid = self
            .conn
            .randr_query_output_property(backlight.output, backlight.property)?
            .reply()?;
        Ok(brightness_in_range(current, valid.range, &valid.valid_values))
    }
}

impl StatusDisplay for DisplaySession {
    fn brightness_percent(&self) -> Option<u8> {
        let backlight = self.backlight?;
        match self.read_brightness(backlight) {
            Ok(percent) => percent,
            Err(e) => {
                debug!("Backlight read failed: {}", e);
                None
            }
        }
    }

    fn publish(&mut self, text: &str) -> Result<(), DisplayError> {
        let bytes = encode_latin1(text);
        self.conn.change_property8(
            PropMode::REPLACE,
            self.root,
            AtomEnum::WM_NAME,
            AtomEnum::STRING,
            &bytes,
        )?;
        self.conn.flush()?;
        Ok(())
    }

    fn shutdown(self) {
        info!("Closing X connection");
        drop(self.conn);
    }
}

/// Decodes a single 32-bit INTEGER property value.
fn decode_integer_property(type_: Atom, format: u8, num_items: u32, data: &[u8]) -> Option<i32> {
    if type_ != Atom::from(AtomEnum::INTEGER) || format != 32 || num_items != 1 {
        return None;
    }
    let bytes: [u8; 4] = data.get(..4)?.try_into().ok()?;
    Some(i32::from_ne_bytes(bytes))
}

/// Converts a raw backlight value to a percentage of its valid range.
///
/// The property must advertise a two-value range and `current` must lie
/// inside it.
fn brightness_in_range(current: i32, range: bool, valid_values: &[i32]) -> Option<u8> {
    match valid_values {
        [min, max] if range && min < max && (*min..=*max).contains(&current) => Some(
            percent_of_range(i64::from(current), i64::from(*min), i64::from(*max)),
        ),
        _ => None,
    }
}

/// Encodes text for a STRING property, which is Latin-1.
fn encode_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}
