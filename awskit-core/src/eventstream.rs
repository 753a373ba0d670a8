//! Helpers over `application/vnd.amazon.eventstream` bodies.
//!
//! Streaming responses are read to completion first and then split into messages with
//! the smithy frame codec, which verifies the prelude and message checksums.

use aws_smithy_eventstream::frame::{read_message_from, write_message_to};
use aws_smithy_types::event_stream::{Header, HeaderValue};
use thiserror::Error;

use crate::error::ToolError;

pub use aws_smithy_types::event_stream::Message;

#[derive(Debug, Error)]
pub enum EventStreamError {
    #[error("bad frame at byte {offset}: {source}")]
    Frame {
        offset: usize,
        #[source]
        source: aws_smithy_eventstream::error::Error,
    },
}

impl From<EventStreamError> for ToolError {
    fn from(err: EventStreamError) -> Self {
        ToolError::Custom(format!("Malformed event stream: {}", err))
    }
}

/// Header lookups on decoded messages.
pub trait MessageExt {
    /// String header by name.
    fn header_str(&self, name: &str) -> Option<&str>;

    /// `:event-type` for events.
    fn event_type(&self) -> Option<&str> {
        self.header_str(":event-type")
    }

    fn is_exception(&self) -> bool {
        matches!(self.header_str(":message-type"), Some("exception" | "error"))
    }

    /// `:exception-type` for modeled errors, `:error-code` otherwise.
    fn exception_type(&self) -> Option<&str> {
        self.header_str(":exception-type")
            .or_else(|| self.header_str(":error-code"))
    }
}

impl MessageExt for Message {
    fn header_str(&self, name: &str) -> Option<&str> {
        self.headers()
            .iter()
            .filter(|header| header.name().as_str() == name)
            .find_map(|header| header.value().as_string().ok())
            .map(|value| value.as_str())
    }
}

/// Split a complete event-stream body into messages.
pub fn decode_messages(bytes: &[u8]) -> Result<Vec<Message>, EventStreamError> {
    let mut rest = bytes;
    let mut messages = Vec::new();

    while !rest.is_empty() {
        let offset = bytes.len() - rest.len();
        let message = read_message_from(&mut rest)
            .map_err(|source| EventStreamError::Frame { offset, source })?;
        messages.push(message);
    }

    Ok(messages)
}

/// Encode a message with string headers, e.g. to build stream fixtures.
pub fn encode_message(headers: &[(&str, &str)], payload: &[u8]) -> Result<Vec<u8>, EventStreamError> {
    let mut message = Message::new(payload.to_vec());
    for (name, value) in headers {
        message = message.add_header(Header::new(
            name.to_string(),
            HeaderValue::String(value.to_string().into()),
        ));
    }

    let mut out = Vec::new();
    write_message_to(&message, &mut out)
        .map_err(|source| EventStreamError::Frame { offset: 0, source })?;
    Ok(out)
}
