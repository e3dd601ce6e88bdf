//! TCP and TLS transport for TN3270 sessions
//!
//! Opens the connection only. Reading, negotiation and decoding happen in
//! the session's receive task.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

use crate::config::SessionConfig;
use crate::error::NetworkError;

/// Connect to `host:port`, giving up after `timeout`
pub async fn connect_with_timeout(
    host: &str,
    port: u16,
    timeout: Duration,
) -> Result<TcpStream, NetworkError> {
    let address = format!("{host}:{port}");
    debug!("Connecting to {address} (timeout {}ms)", timeout.as_millis());

    let stream = match tokio::time::timeout(timeout, TcpStream::connect(&address)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            return Err(NetworkError::ConnectFailed {
                host: host.to_string(),
                port,
                reason: e.to_string(),
            })
        }
        Err(_) => {
            return Err(NetworkError::ConnectTimeout {
                host: host.to_string(),
                port,
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    };

    // 3270 records are small and latency bound
    if let Err(e) = stream.set_nodelay(true) {
        debug!("Could not set TCP_NODELAY: {e}");
    }

    info!("Connected to {address}");
    Ok(stream)
}

/// Connect to the configured host and complete a TLS handshake.
///
/// `connect_timeout` bounds the TCP connect and the handshake together.
pub async fn connect_tls(config: &SessionConfig) -> Result<TlsStream<TcpStream>, NetworkError> {
    let host = config.host.as_str();
    let connector = tls_connector(config)?;
    let server_name = ServerName::try_from(host.to_string()).map_err(|e| tls_failed(host, e))?;

    let timeout = config.connect_timeout();
    let handshake = async {
        let tcp = connect_with_timeout(host, config.port, timeout).await?;
        let tls = connector
            .connect(server_name, tcp)
            .await
            .map_err(|e| tls_failed(host, e))?;
        Ok::<_, NetworkError>(tls)
    };
    let stream = tokio::time::timeout(timeout, handshake)
        .await
        .map_err(|_| NetworkError::ConnectTimeout {
            host: host.to_string(),
            port: config.port,
            timeout_ms: config.connect_timeout_ms,
        })??;

    info!("TLS established with {host}:{}", config.port);
    Ok(stream)
}

/// Build the TLS connector for `config`
pub fn tls_connector(config: &SessionConfig) -> Result<TlsConnector, NetworkError> {
    let client_config = if config.tls_insecure {
        warn!("Certificate verification disabled for {}", config.host);
        ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoCertificateVerification))
            .with_no_client_auth()
    } else {
        let roots = root_store(&config.host, config.tls_ca_bundle_path.as_deref())?;
        ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth()
    };
    Ok(TlsConnector::from(Arc::new(client_config)))
}

/// Bundled web roots, the platform store and an optional PEM bundle
fn root_store(host: &str, ca_bundle: Option<&Path>) -> Result<RootCertStore, NetworkError> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    match rustls_native_certs::load_native_certs() {
        Ok(certs) => {
            let (added, ignored) = roots.add_parsable_certificates(certs);
            debug!("Loaded {added} platform certificates ({ignored} ignored)");
        }
        Err(e) => debug!("Platform certificate store unavailable: {e}"),
    }

    if let Some(path) = ca_bundle {
        let certs = load_certificates(path).map_err(|reason| NetworkError::TlsFailed {
            host: host.to_string(),
            reason,
        })?;
        for cert in certs {
            roots.add(cert).map_err(|e| tls_failed(host, e))?;
        }
        debug!("Trusting CA bundle {}", path.display());
    }
    Ok(roots)
}

fn load_certificates(path: &Path) -> Result<Vec<CertificateDer<'static>>, String> {
    let file = File::open(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let certs = rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("{}: {e}", path.display()))?;
    if certs.is_empty() {
        return Err(format!("{}: no certificates found", path.display()));
    }
    Ok(certs)
}

fn tls_failed(host: &str, error: impl std::fmt::Display) -> NetworkError {
    NetworkError::TlsFailed {
        host: host.to_string(),
        reason: error.to_string(),
    }
}

/// Accepts any server certificate when `tls_insecure` is set
#[derive(Debug)]
struct NoCertificateVerification;

impl ServerCertVerifier for NoCertificateVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ED25519,
        ]
    }
}
