//! Console Logging
//!
//! Routes `tracing` output from the app and the client core to the
//! browser console.

use std::io::{self, Write};
use tracing::Level;

/// Buffers one formatted event and hands it to `console` on flush
#[derive(Default)]
pub struct ConsoleWriter {
    buf: Vec<u8>,
}

impl Write for ConsoleWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&self.buf);
        let line = line.trim_end();
        if line.contains(" ERROR ") || line.starts_with("ERROR") {
            web_sys::console::error_1(&line.into());
        } else if line.contains(" WARN ") || line.starts_with("WARN") {
            web_sys::console::warn_1(&line.into());
        } else {
            web_sys::console::log_1(&line.into());
        }
        self.buf.clear();
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

pub fn init() {
    let level = if cfg!(debug_assertions) {
        Level::DEBUG
    } else {
        Level::INFO
    };

    // The browser has no system clock for the fmt timer
    let result = tracing_subscriber::fmt()
        .with_writer(ConsoleWriter::default)
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .try_init();

    if let Err(e) = result {
        web_sys::console::warn_1(&format!("Logging already initialized: {}", e).into());
    }
}
