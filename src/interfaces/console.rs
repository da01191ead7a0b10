use crate::domain::pinning::SecurityEvent;
use crate::domain::ports::{BrickResultSink, SecurityEventSink};
use crate::domain::response::{ResultCode, SdkResponse};
use crate::error::{GamePayError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

/// Writes brick results to `out`, errors and security warnings to `err`.
pub struct ConsoleSink<O: Write + Send, E: Write + Send> {
    out: Mutex<O>,
    err: Mutex<E>,
    failed: AtomicBool,
}

impl<O: Write + Send, E: Write + Send> ConsoleSink<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self {
            out: Mutex::new(out),
            err: Mutex::new(err),
            failed: AtomicBool::new(false),
        }
    }

    /// Whether an error was reported.
    pub fn failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn into_inner(self) -> (O, E) {
        (self.out.into_inner(), self.err.into_inner())
    }
}

impl<O: Write + Send, E: Write + Send> BrickResultSink for ConsoleSink<O, E> {
    fn set_response(&self, body: String) {
        let _ = writeln!(self.out.lock(), "{body}");
    }

    fn set_error(&self, message: String) {
        self.failed.store(true, Ordering::SeqCst);
        let _ = writeln!(self.err.lock(), "Payment error: {message}");
    }
}

impl<O: Write + Send, E: Write + Send> SecurityEventSink for ConsoleSink<O, E> {
    fn report(&self, event: SecurityEvent) {
        let _ = writeln!(self.err.lock(), "SECURITY WARNING: {event}");
    }
}

/// Builds an SDK callback from a result code and an optional JSON object of extras.
pub fn sdk_response(code: &str, extras_json: Option<&str>) -> Result<SdkResponse> {
    let result_code: ResultCode = code.parse().unwrap_or(ResultCode::Unrecognized);
    let extras = match extras_json {
        Some(raw) => serde_json::from_str::<HashMap<String, String>>(raw)
            .map_err(|e| GamePayError::Sdk(format!("invalid extras: {e}")))?,
        None => HashMap::new(),
    };
    Ok(SdkResponse {
        result_code,
        extras,
    })
}
