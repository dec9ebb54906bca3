//! Data-plane client
//!
//! One connection per command: connect, authenticate, send, read the reply,
//! drop the connection. Node addresses churn between calls, so nothing is
//! pooled.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use resp::{ReplyReader, RespEncoder, RespValue};
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{self, RootCertStore};
use tokio_rustls::TlsConnector;
use tracing::{debug, trace};

use crate::command::Command;
use crate::error::{MeshError, Result};

/// TLS parameters for one connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsOptions {
    pub ca_path: PathBuf,
    /// Name the node's certificate is issued for
    pub server_name: String,
}

/// Everything needed to open one client connection to a node
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// `host:port`
    pub addr: String,
    pub password: Option<String>,
    pub tls: Option<TlsOptions>,
    pub timeout: Duration,
}

/// Sends a single command to a node and returns its textual reply
#[async_trait]
pub trait DataPlane: Send + Sync {
    async fn send(&self, options: &ClientOptions, command: &Command) -> Result<String>;
}

/// Production data plane speaking RESP over TCP or TLS
#[derive(Debug, Default, Clone)]
pub struct RespDataPlane;

impl RespDataPlane {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DataPlane for RespDataPlane {
    async fn send(&self, options: &ClientOptions, command: &Command) -> Result<String> {
        let attempt = async {
            let tcp = TcpStream::connect(&options.addr)
                .await
                .map_err(|e| MeshError::Command(format!("connect {}: {}", options.addr, e)))?;
            tcp.set_nodelay(true).ok();

            match &options.tls {
                Some(tls) => {
                    let stream = connect_tls(tcp, tls).await?;
                    exchange(stream, options.password.as_deref(), command).await
                }
                None => exchange(tcp, options.password.as_deref(), command).await,
            }
        };

        match tokio::time::timeout(options.timeout, attempt).await {
            Ok(result) => result,
            Err(_) => Err(MeshError::Command(format!(
                "{} on {} timed out after {:?}",
                command, options.addr, options.timeout
            ))),
        }
    }
}

async fn exchange<S>(stream: S, password: Option<&str>, command: &Command) -> Result<String>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let mut encoder = RespEncoder::new(write_half);
    let mut replies = ReplyReader::new(BufReader::new(read_half));

    if let Some(password) = password {
        let auth = Command::auth(password);
        encoder.send(&RespValue::command(auth.args())).await.map_err(io_error)?;
        let reply = replies.read_reply().await?;
        if let Some(msg) = reply.as_error() {
            return Err(MeshError::Command(format!("authentication rejected: {}", msg)));
        }
        trace!("Authenticated");
    }

    debug!(command = %command, "Sending command");
    encoder
        .send(&RespValue::command(command.args()))
        .await
        .map_err(io_error)?;
    let reply = replies.read_reply().await?;
    reply
        .into_text()
        .map_err(|msg| MeshError::Command(format!("{}: {}", command, msg)))
}

async fn connect_tls(
    tcp: TcpStream,
    tls: &TlsOptions,
) -> Result<tokio_rustls::client::TlsStream<TcpStream>> {
    let (connector, server_name) = tls_connector(tls).await?;
    connector
        .connect(server_name, tcp)
        .await
        .map_err(|e| MeshError::Command(format!("TLS handshake with {}: {}", tls.server_name, e)))
}

/// Client TLS setup trusting only the configured CA bundle
async fn tls_connector(tls: &TlsOptions) -> Result<(TlsConnector, ServerName<'static>)> {
    let server_name = ServerName::try_from(tls.server_name.clone()).map_err(|e| {
        MeshError::Command(format!("invalid TLS server name {}: {}", tls.server_name, e))
    })?;

    let pem = tokio::fs::read(&tls.ca_path).await.map_err(|e| {
        MeshError::Command(format!("read CA bundle {}: {}", tls.ca_path.display(), e))
    })?;

    let mut roots = RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut pem.as_slice()) {
        let cert = cert.map_err(|e| MeshError::Command(format!("parse CA bundle: {}", e)))?;
        roots
            .add(cert)
            .map_err(|e| MeshError::Command(format!("load CA certificate: {}", e)))?;
    }
    if roots.is_empty() {
        return Err(MeshError::Command(format!(
            "no certificates in CA bundle {}",
            tls.ca_path.display()
        )));
    }

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| MeshError::Command(format!("TLS setup: {}", e)))?
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok((TlsConnector::from(Arc::new(config)), server_name))
}

fn io_error(e: std::io::Error) -> MeshError {
    MeshError::Command(format!("write failed: {}", e))
}
