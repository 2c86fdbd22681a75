//! Newline-delimited framing.
//!
//! Outbound messages are compact JSON followed by exactly one `\n` (JSON
//! string escaping guarantees the payload itself contains no raw newline).
//! Inbound bytes are split on `\n` boundaries, tolerating `\r\n`; partial
//! lines are buffered across reads. JSON parsing happens above this layer,
//! so a line that is not valid JSON poisons only itself, but a stream that
//! ends mid-line is a framing desync and fails the connection.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::Error;
use crate::jsonrpc::Request;

/// Framing codec for [`tokio_util::codec::Framed`].
///
/// Not stock `LinesCodec`: that codec hands back an unterminated trailing
/// fragment at EOF as if it were a complete line, while this protocol must
/// treat it as desync.
#[derive(Debug, Default)]
pub struct LineCodec {
    // Offset already scanned for a terminator, so partial lines are not
    // rescanned on every read.
    scanned: usize,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, Error> {
        match src[self.scanned..].iter().position(|b| *b == b'\n') {
            Some(offset) => {
                let end = self.scanned + offset;
                self.scanned = 0;
                let mut line = src.split_to(end + 1);
                line.truncate(line.len() - 1);
                if line.last() == Some(&b'\r') {
                    line.truncate(line.len() - 1);
                }
                let line = String::from_utf8(line.to_vec())
                    .map_err(|e| Error::Protocol(format!("frame is not valid utf-8: {e}")))?;
                Ok(Some(line))
            }
            None => {
                self.scanned = src.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        if src.is_empty() {
            Ok(None)
        } else {
            Err(Error::Protocol(format!(
                "stream ended with {} unterminated bytes in the frame buffer",
                src.len()
            )))
        }
    }
}

impl Encoder<Request> for LineCodec {
    type Error = Error;

    fn encode(&mut self, request: Request, dst: &mut BytesMut) -> Result<(), Error> {
        let json = serde_json::to_string(&request)
            .map_err(|e| Error::Protocol(format!("failed to serialize request: {e}")))?;
        dst.reserve(json.len() + 1);
        dst.put_slice(json.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}
