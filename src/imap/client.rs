use log::{debug, info};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};
use tokio_native_tls::TlsStream;

use crate::imap::{
    ImapError, Session,
    connection::{Connection, TlsConnection, quoted},
    response::{Response, ResponseCode, Status},
};

pub struct Client;

impl Client {
    pub async fn login(
        host: &str,
        port: u16,
        user: &str,
        password: &str,
    ) -> Result<Session<TlsStream<TcpStream>>, ImapError> {
        let (connection, greeting) = TlsConnection::connect_to(host, port).await?;
        let session = Self::authenticate(connection, &greeting, user, password).await?;
        info!("logged in to {host} as {user}");
        Ok(session)
    }

    pub async fn authenticate<S: AsyncRead + AsyncWrite + Unpin>(
        mut connection: Connection<S>,
        greeting: &Response,
        user: &str,
        password: &str,
    ) -> Result<Session<S>, ImapError> {
        if matches!(
            greeting,
            Response::Status {
                status: Status::PreAuth,
                ..
            }
        ) {
            debug!("connection is preauthenticated");
            return Ok(Session::new(connection));
        }

        let responses = connection
            .send(&format!("LOGIN {} {}", quoted(user), quoted(password)))
            .await
            .map_err(|e| match e {
                ImapError::No { .. } => ImapError::Login,
                e => e,
            })?;
        for response in &responses {
            match response {
                Response::Capabilities(capabilities)
                | Response::Status {
                    code: Some(ResponseCode::Capabilities(capabilities)),
                    ..
                } => debug!("server capabilities: {}", capabilities.join(" ")),
                _ => {}
            }
        }

        Ok(Session::new(connection))
    }
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use rstest::*;

    use super::*;
    use crate::imap::connection::tests::fake_server;

    #[rstest]
    #[tokio::test]
    async fn test_login_quotes_credentials() {
        let (stream, server) = fake_server(
            "* OK Gimap ready\r\n",
            vec![(
                "LOGIN \"someone@example.com\" \"pa\\\"ss\"",
                vec![
                    "* CAPABILITY IMAP4rev1 UIDPLUS\r\n".to_string(),
                    "{tag} OK someone@example.com authenticated (Success)\r\n".to_string(),
                ],
            )],
        );
        let (connection, greeting) = assert_ok!(Connection::start(stream).await);

        assert_ok!(
            Client::authenticate(connection, &greeting, "someone@example.com", "pa\"ss").await
        );
        assert_ok!(server.await);
    }

    #[rstest]
    #[tokio::test]
    async fn test_rejected_login_is_reported() {
        let (stream, server) = fake_server(
            "* OK Gimap ready\r\n",
            vec![(
                "LOGIN \"someone\" \"wrong\"",
                vec!["{tag} NO Invalid credentials\r\n".to_string()],
            )],
        );
        let (connection, greeting) = assert_ok!(Connection::start(stream).await);

        let error = assert_err!(Client::authenticate(connection, &greeting, "someone", "wrong").await);

        assert!(matches!(error, ImapError::Login));
        assert_ok!(server.await);
    }

    #[rstest]
    #[tokio::test]
    async fn test_preauthenticated_connection_skips_login() {
        let (stream, _server) = fake_server("* PREAUTH welcome back\r\n", Vec::new());
        let (connection, greeting) = assert_ok!(Connection::start(stream).await);

        assert_ok!(Client::authenticate(connection, &greeting, "someone", "unused").await);
    }
}
