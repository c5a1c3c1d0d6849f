//! Token masking — redacts the credential from anything leaving the process.
//!
//! Every externally observable channel goes through a [`Masker`]: structured
//! log calls via [`Masker::secure_log`], the tracing output stream via
//! [`MaskedMakeWriter`], and user-facing error text via
//! [`Masker::user_message`].

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;
use zipgate_core::{Credential, Error};

/// Replacement for every occurrence of a masked secret.
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Stand-in for a log argument that could not be serialized.
pub const UNSERIALIZABLE_PLACEHOLDER: &str = "[Unserializable Object]";

/// Replace every occurrence of `secret` in `text`. No-op for an empty secret.
pub fn mask_token(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        return text.to_string();
    }
    text.replace(secret, REDACTION_MARKER)
}

/// Masks the live credential out of text and structured values.
#[derive(Debug, Clone, Default)]
pub struct Masker {
    credential: Option<Credential>,
}

/// An extra argument to [`Masker::secure_log`].
#[derive(Debug, Clone)]
pub enum LogArg {
    Text(String),
    Structured(Value),
    Unserializable,
}

impl LogArg {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Serialize now; a failure becomes the opaque placeholder, never an error.
    pub fn structured<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(v) => Self::Structured(v),
            Err(_) => Self::Unserializable,
        }
    }
}

impl Masker {
    pub fn new(credential: Option<Credential>) -> Self {
        Self { credential }
    }

    /// Mask the configured credential out of `text`.
    pub fn mask_sensitive_data(&self, text: &str) -> String {
        match &self.credential {
            Some(credential) => mask_token(text, credential.expose()),
            None => text.to_string(),
        }
    }

    /// Mask every string (keys included) inside a JSON value.
    pub fn mask_value(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.mask_sensitive_data(s)),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.mask_value(v)).collect()),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (self.mask_sensitive_data(k), self.mask_value(v)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Render and mask the extra arguments of a log call.
    pub fn render_args(&self, args: &[LogArg]) -> String {
        args.iter()
            .map(|arg| match arg {
                LogArg::Text(s) => self.mask_sensitive_data(s),
                LogArg::Structured(v) => self.mask_value(v).to_string(),
                LogArg::Unserializable => UNSERIALIZABLE_PLACEHOLDER.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Emit a log event with the message and every argument masked.
    pub fn secure_log(&self, level: Level, message: &str, args: &[LogArg]) {
        let message = self.mask_sensitive_data(message);
        let args = self.render_args(args);
        if level == Level::ERROR {
            tracing::error!(args = %args, "{message}");
        } else if level == Level::WARN {
            tracing::warn!(args = %args, "{message}");
        } else if level == Level::INFO {
            tracing::info!(args = %args, "{message}");
        } else if level == Level::DEBUG {
            tracing::debug!(args = %args, "{message}");
        } else {
            tracing::trace!(args = %args, "{message}");
        }
    }

    /// Masked, user-facing text for an error, with its resolution guidance.
    pub fn user_message(&self, err: &Error) -> String {
        let mut text = err.to_string();
        if let Error::Zipline(e) = err
            && let Some(body) = &e.response_body
            && !body.is_empty()
        {
            text.push_str("\nResponse: ");
            text.push_str(body);
        }
        if let Some(guidance) = err.resolution_guidance() {
            text.push_str("\nResolution: ");
            text.push_str(guidance);
        }
        self.mask_sensitive_data(&text)
    }
}

/// A `MakeWriter` that masks each formatted log event before writing it to
/// stderr.
#[derive(Debug, Clone)]
pub struct MaskedMakeWriter {
    masker: Arc<Masker>,
}

impl MaskedMakeWriter {
    pub fn new(masker: Masker) -> Self {
        Self {
            masker: Arc::new(masker),
        }
    }
}

impl<'a> MakeWriter<'a> for MaskedMakeWriter {
    type Writer = MaskedWriter<std::io::Stderr>;

    fn make_writer(&'a self) -> Self::Writer {
        MaskedWriter::new(self.masker.clone(), std::io::stderr())
    }
}

/// Buffers one event and writes it masked on flush or drop.
pub struct MaskedWriter<W: Write> {
    masker: Arc<Masker>,
    inner: W,
    buf: Vec<u8>,
}

impl<W: Write> MaskedWriter<W> {
    pub fn new(masker: Arc<Masker>, inner: W) -> Self {
        Self {
            masker,
            inner,
            buf: Vec::new(),
        }
    }
}

impl<W: Write> Write for MaskedWriter<W> {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if self.buf.is_empty() {
            return self.inner.flush();
        }
        let text = String::from_utf8_lossy(&self.buf);
        let masked = self.masker.mask_sensitive_data(&text);
        self.buf.clear();
        self.inner.write_all(masked.as_bytes())?;
        self.inner.flush()
    }
}

impl<W: Write> Drop for MaskedWriter<W> {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
