use anyhow::{Context, Result};
use log::{debug, warn};
use std::collections::HashMap;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Query parameters of the OAuth redirect, as delivered by the browser.
pub type QueryValues = HashMap<String, Vec<String>>;

// Only registered redirect hosts can be used with the Azure CLI client id:
// "localhost" works but "127.0.0.1" does not.
pub const REDIRECT_HOST: &str = "localhost";

const FAIL_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8" />
    <title>Login failed</title>
</head>
<body>
    <h4>Some failures occurred during the authentication</h4>
    <p>You can log an issue at <a href="https://github.com/azure/azure-cli/issues">Azure CLI GitHub Repository</a> and we will assist you in resolving it.</p>
</body>
</html>
"#;

const SUCCESS_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8" />
    <meta http-equiv="refresh" content="10;url=https://docs.docker.com/engine/context/aci-integration/">
    <title>Login successfully</title>
</head>
<body>
    <h4>You have logged into Microsoft Azure!</h4>
    <p>You can close this window, or we will redirect you to the <a href="https://docs.docker.com/engine/context/aci-integration/">Docker ACI integration documentation</a> in 10 seconds.</p>
</body>
</html>
"#;

/// Short-lived local HTTP server acting as the OAuth redirect target.
///
/// Bound to an ephemeral port on `localhost`; the query parameters of the
/// first callback request are delivered exactly once on the channel handed to
/// [`LocalServer::bind`]. The server keeps accepting connections until
/// [`LocalServer::close`] (or drop), so the confirmation page always renders.
pub struct LocalServer {
    port: u16,
    listener: Option<TcpListener>,
    query_tx: mpsc::Sender<QueryValues>,
    handle: Option<JoinHandle<()>>,
}

impl LocalServer {
    /// Bind a TCP listener on an OS-chosen port without serving yet.
    pub async fn bind(query_tx: mpsc::Sender<QueryValues>) -> Result<Self> {
        let listener = TcpListener::bind((REDIRECT_HOST, 0))
            .await
            .context("unable to start login server")?;
        let port = listener.local_addr()?.port();
        if port == 0 {
            anyhow::bail!("unable to allocate login server port");
        }
        debug!("Login callback server bound on port {}", port);
        Ok(Self {
            port,
            listener: Some(listener),
            query_tx,
            handle: None,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Redirect URL the identity provider should send the browser back to.
    pub fn addr(&self) -> String {
        format!("http://{}:{}", REDIRECT_HOST, self.port)
    }

    /// Start serving HTTP on a background task.
    pub fn serve(&mut self) {
        let listener = match self.listener.take() {
            Some(l) => l,
            None => return,
        };
        let query_tx = self.query_tx.clone();
        self.handle = Some(tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _)) => handle_connection(stream, &query_tx).await,
                    Err(e) => {
                        let _ = query_tx
                            .send(synthetic_error(format!(
                                "error running local login server: {}",
                                e
                            )))
                            .await;
                        break;
                    }
                }
            }
        }));
    }

    /// Stop the background task and release the port.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for LocalServer {
    fn drop(&mut self) {
        self.close();
    }
}

fn synthetic_error(message: String) -> QueryValues {
    let mut values = QueryValues::new();
    values.insert("error".to_string(), vec![message]);
    values
}

async fn handle_connection<S>(mut stream: S, query_tx: &mpsc::Sender<QueryValues>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let values = match read_request_query(&mut stream).await {
        Ok(values) => values,
        Err(e) => {
            warn!("Malformed callback request: {}", e);
            return;
        }
    };

    let body = if values.contains_key("code") {
        SUCCESS_HTML
    } else {
        FAIL_HTML
    };

    // A failed response write still unblocks the waiting login call.
    if let Err(e) = write_response(&mut stream, body).await {
        let _ = query_tx
            .send(synthetic_error(format!("unable to write response: {}", e)))
            .await;
    } else {
        let _ = query_tx.send(values).await;
    }
}

/// Read the request head and decode the query string of the request target.
async fn read_request_query<S: AsyncRead + Unpin>(stream: &mut S) -> Result<QueryValues> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 512];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") || buf.len() > 8192 {
            break;
        }
    }

    let head = String::from_utf8_lossy(&buf);
    let request_line = head.lines().next().unwrap_or_default();
    let target = request_line
        .split_whitespace()
        .nth(1)
        .context("missing request target")?;

    let mut values = QueryValues::new();
    if let Some(query) = target.splitn(2, '?').nth(1) {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            values
                .entry(key.into_owned())
                .or_insert_with(Vec::new)
                .push(value.into_owned());
        }
    }
    Ok(values)
}

async fn write_response<S: AsyncWrite + Unpin>(stream: &mut S, body: &str) -> Result<()> {
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}
