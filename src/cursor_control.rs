//! Desktop pointer output for X11-based systems.
//!
//! Consumer-side only: [`X11CursorSink`] listens to published cursor
//! positions and warps the real pointer to follow them.

use crate::{
    dispatch::{GazeEvent, Subscriber},
    geometry::{ScreenPoint, ScreenSize},
    Error, Result,
};
use log::{debug, info};
use x11rb::{
    connection::Connection,
    protocol::xproto::{ConnectionExt, Screen},
    rust_connection::RustConnection,
};

/// Round a surface coordinate to a pixel inside `[0, extent)`
#[allow(clippy::cast_possible_truncation)] // Clamped to the i16 range first
fn to_pixel(value: f64, extent: u16) -> i16 {
    let max = f64::from(extent.saturating_sub(1)).min(f64::from(i16::MAX));
    if value.is_finite() {
        value.round().clamp(0.0, max) as i16
    } else {
        0
    }
}

/// Moves the X11 pointer to published cursor positions
pub struct X11CursorSink {
    connection: RustConnection,
    screen: Screen,
}

impl X11CursorSink {
    /// Connect to the default display
    pub fn new() -> Result<Self> {
        info!("Initializing X11 cursor sink");

        let (connection, screen_num) = RustConnection::connect(None)
            .map_err(|e| Error::CursorControl(format!("Failed to connect to X11: {e}")))?;

        let screen = connection
            .setup()
            .roots
            .get(screen_num)
            .ok_or_else(|| Error::CursorControl("Failed to get screen".to_string()))?
            .clone();

        info!(
            "Connected to X11 display, screen: {}x{}",
            screen.width_in_pixels, screen.height_in_pixels
        );

        Ok(Self { connection, screen })
    }

    /// Size of the root window, for sizing the pipeline surface
    #[must_use]
    pub fn screen_size(&self) -> ScreenSize {
        ScreenSize::new(
            f64::from(self.screen.width_in_pixels),
            f64::from(self.screen.height_in_pixels),
        )
    }

    /// Current pointer position
    pub fn position(&self) -> Result<ScreenPoint> {
        let reply = self
            .connection
            .query_pointer(self.screen.root)
            .map_err(|e| Error::CursorControl(format!("Failed to send query pointer: {e}")))?
            .reply()
            .map_err(|e| Error::CursorControl(format!("Failed to query pointer: {e}")))?;

        Ok(ScreenPoint::new(f64::from(reply.root_x), f64::from(reply.root_y)))
    }

    /// Warp the pointer to a surface point
    pub fn warp(&self, point: ScreenPoint) -> Result<()> {
        let x = to_pixel(point.x, self.screen.width_in_pixels);
        let y = to_pixel(point.y, self.screen.height_in_pixels);
        debug!("Setting cursor position to ({}, {})", x, y);

        self.connection
            .warp_pointer(x11rb::NONE, self.screen.root, 0, 0, 0, 0, x, y)
            .map_err(|e| Error::CursorControl(format!("Failed to warp pointer: {e}")))?;

        self.connection
            .flush()
            .map_err(|e| Error::CursorControl(format!("Failed to flush connection: {e}")))?;

        Ok(())
    }

    /// Follow cursor events until the dispatcher goes away; returns the
    /// number of warps
    pub fn follow(&self, events: &Subscriber) -> Result<u64> {
        let mut warps = 0;
        while let Ok(envelope) = events.recv() {
            if let GazeEvent::Cursor(point) = envelope.event {
                self.warp(point)?;
                warps += 1;
            }
        }
        info!("Cursor sink finished after {} warps", warps);
        Ok(warps)
    }
}
