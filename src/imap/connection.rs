use std::borrow::Cow;

use futures::{SinkExt as _, StreamExt as _};
use imap_proto::Request;
use log::{debug, trace, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};
use tokio_native_tls::{TlsConnector, TlsStream, native_tls};
use tokio_util::codec::Framed;

use crate::imap::{
    ImapError,
    codec::ImapCodec,
    response::{Response, Status},
    tag_generator::TagGenerator,
};

pub type TlsConnection = Connection<TlsStream<TcpStream>>;

#[derive(Debug)]
pub struct Connection<S> {
    stream: Framed<S, ImapCodec>,
    tag_generator: TagGenerator,
}

impl TlsConnection {
    pub async fn connect_to(host: &str, port: u16) -> Result<(Self, Response), ImapError> {
        debug!("Connecting to {host}:{port}");
        let tls = native_tls::TlsConnector::new().map_err(|source| ImapError::Tls {
            host: host.to_string(),
            source,
        })?;
        let tls = TlsConnector::from(tls);
        let stream =
            TcpStream::connect((host, port))
                .await
                .map_err(|source| ImapError::Connect {
                    host: host.to_string(),
                    port,
                    source,
                })?;
        let stream = tls
            .connect(host, stream)
            .await
            .map_err(|source| ImapError::Tls {
                host: host.to_string(),
                source,
            })?;

        Self::start(stream).await
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Connection<S> {
    /// Wraps an established stream and waits for the server greeting.
    pub async fn start(stream: S) -> Result<(Self, Response), ImapError> {
        let mut stream = Framed::new(stream, ImapCodec::default());

        let greeting = stream.next().await.ok_or(ImapError::ConnectionClosed)??;
        trace!("greeting = {greeting:?}");
        match &greeting {
            Response::Status {
                status: Status::Ok | Status::PreAuth,
                ..
            } => Ok((
                Connection {
                    stream,
                    tag_generator: TagGenerator::default(),
                },
                greeting,
            )),
            Response::Status {
                information: Some(information),
                ..
            } => Err(ImapError::Greeting(information.clone())),
            other => Err(ImapError::Greeting(format!("{other:?}"))),
        }
    }

    /// Sends `command` and collects the untagged responses up to its tagged completion.
    pub async fn send(&mut self, command: &str) -> Result<Vec<Response>, ImapError> {
        let tag = self.tag_generator.next();
        trace!("{tag}: sending {}", loggable(command));
        let request = Request(
            Cow::Borrowed(tag.as_bytes()),
            Cow::Borrowed(command.as_bytes()),
        );
        self.stream.send(&request).await?;

        let mut untagged = Vec::new();
        loop {
            let response = self
                .stream
                .next()
                .await
                .ok_or(ImapError::ConnectionClosed)??;
            match response {
                Response::Done {
                    tag: done_tag,
                    status,
                    information,
                } if done_tag == tag => {
                    let information = information.unwrap_or_default();
                    trace!("{tag}: {status:?} {information}");
                    return match status {
                        Status::Ok => Ok(untagged),
                        Status::No => Err(ImapError::No {
                            command: loggable(command).to_string(),
                            information,
                        }),
                        Status::Bad | Status::PreAuth => Err(ImapError::Bad {
                            command: loggable(command).to_string(),
                            information,
                        }),
                        Status::Bye => Err(ImapError::ConnectionClosed),
                    };
                }
                Response::Done { tag: other, .. } => {
                    warn!("ignoring completion of unknown command {other} while waiting for {tag}");
                }
                Response::Status {
                    status: Status::Bye,
                    information,
                    ..
                } => {
                    debug!(
                        "server is closing the connection: {}",
                        information.unwrap_or_default()
                    );
                }
                response => untagged.push(response),
            }
        }
    }
}

// credentials never leave this module
fn loggable(command: &str) -> &str {
    if command
        .get(..5)
        .is_some_and(|verb| verb.eq_ignore_ascii_case("LOGIN"))
    {
        "LOGIN"
    } else {
        command
    }
}

/// Quotes `value` as an IMAP quoted string.
pub fn quoted(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
