use std::io;

use bytes::{Buf as _, BufMut as _, BytesMut};
use imap_proto::Request;
use log::trace;
use tokio_util::codec::{Decoder, Encoder};

use crate::imap::response::Response;

/// Frames the byte stream of an IMAP connection into [`Response`]s and serializes tagged
/// [`Request`]s.
#[derive(Debug, Default)]
pub struct ImapCodec {
    // parsing is skipped until at least this many bytes are buffered
    needed: usize,
}

impl Decoder for ImapCodec {
    type Item = Response;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if buf.is_empty() || buf.len() < self.needed {
            return Ok(None);
        }

        let (consumed, response) = match imap_proto::parser::parse_response(&buf[..]) {
            Ok((remaining, response)) => (buf.len() - remaining.len(), Response::from(&response)),
            Err(nom::Err::Incomplete(needed)) => {
                self.needed = match needed {
                    nom::Needed::Size(size) => buf.len() + size.get(),
                    nom::Needed::Unknown => buf.len() + 1,
                };
                return Ok(None);
            }
            Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
                let line = buf[..]
                    .split(|byte| *byte == b'\n')
                    .next()
                    .map(String::from_utf8_lossy)
                    .unwrap_or_default();
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unparsable server response ({:?}): {line}", e.code),
                ));
            }
        };

        buf.advance(consumed);
        self.needed = 0;
        trace!("decoded {consumed} bytes into {}", summary(&response));

        Ok(Some(response))
    }
}

impl<'a> Encoder<&'a Request<'a>> for ImapCodec {
    type Error = io::Error;

    fn encode(&mut self, item: &'a Request<'a>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let Request(tag, command) = item;
        dst.reserve(tag.len() + command.len() + 3);
        if !tag.is_empty() {
            dst.put_slice(tag);
            dst.put_u8(b' ');
        }
        dst.put_slice(command);
        dst.put_slice(b"\r\n");

        Ok(())
    }
}

// message bodies should not end up in trace logs
fn summary(response: &Response) -> String {
    match response {
        Response::Fetch {
            sequence_number, ..
        } => format!("FETCH {sequence_number}"),
        other => format!("{other:?}"),
    }
}
