use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImapError {
    #[error("cannot connect to {host}:{port}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },
    #[error("cannot establish tls with {host}")]
    Tls {
        host: String,
        #[source]
        source: tokio_native_tls::native_tls::Error,
    },
    #[error("connection to server failed")]
    Io(#[from] io::Error),
    #[error("server closed the connection")]
    ConnectionClosed,
    #[error("server rejected the greeting: {0}")]
    Greeting(String),
    #[error("username or password rejected")]
    Login,
    #[error("{command} failed: {information}")]
    No {
        command: String,
        information: String,
    },
    #[error("{command} was refused as invalid: {information}")]
    Bad {
        command: String,
        information: String,
    },
    #[error("response to {command} lacks {missing}")]
    MissingData {
        command: String,
        missing: &'static str,
    },
}

impl ImapError {
    /// Whether the connection is unusable after this error, as opposed to a single command
    /// having failed.
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. } | Self::Tls { .. } | Self::Io(_) | Self::ConnectionClosed
        )
    }
}
