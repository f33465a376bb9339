//! Builds the TLS gRPC channel `GrpcUploader` ships envelopes over.

use std::str::FromStr;
use std::sync::Arc;

use hyper::Uri;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tokio_rustls::rustls::client::danger::ServerCertVerifier;
use tokio_rustls::rustls::{crypto::aws_lc_rs, ClientConfig, RootCertStore};

use super::super::proto::cobalt::shuffler::shuffler_client::ShufflerClient;
use crate::status::{Status, StatusCode};

pub type ChannelType =
    hyper_util::client::legacy::Client<hyper_rustls::HttpsConnector<HttpConnector>, tonic::body::Body>;

/// Connects to a shuffler endpoint over HTTP/2 with the platform's trust
/// roots, or over an unverified TLS connection if `insecure` is set (for
/// local development against a self-signed shuffler).
pub fn connect(endpoint: &str, insecure: bool) -> Result<ShufflerClient<ChannelType>, Status> {
    let tls = ClientConfig::builder_with_provider(Arc::new(aws_lc_rs::default_provider()))
        .with_safe_default_protocol_versions()
        .map_err(|e| Status::new(StatusCode::Other, format!("tls protocol versions: {e}")))?;
    let tls = if insecure {
        let mut config = tls
            .with_root_certificates(RootCertStore::empty())
            .with_no_client_auth();
        config
            .dangerous()
            .set_certificate_verifier(Arc::new(AcceptAnyServerCert));
        config
    } else {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        tls.with_root_certificates(roots).with_no_client_auth()
    };

    let mut http_connector = HttpConnector::new();
    http_connector.enforce_http(false);
    let https_connector = tower::ServiceBuilder::new()
        .layer_fn(move |http_connector| {
            hyper_rustls::HttpsConnectorBuilder::new()
                .with_tls_config(tls.clone())
                .https_or_http()
                .enable_http2()
                .wrap_connector(http_connector)
        })
        .service(http_connector);

    let channel = hyper_util::client::legacy::Client::builder(TokioExecutor::new())
        .http2_only(true)
        .build(https_connector);
    let uri = Uri::from_str(endpoint).map_err(|e| Status::new(StatusCode::InvalidConfig, format!("bad shuffler endpoint: {e}")))?;

    Ok(ShufflerClient::with_origin(channel, uri))
}

/// Skips certificate validation entirely. Only ever reachable via `connect`'s
/// `insecure` flag, which production configuration should never set.
#[derive(Debug)]
struct AcceptAnyServerCert;

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &tonic::transport::CertificateDer<'_>,
        _intermediates: &[tonic::transport::CertificateDer<'_>],
        _server_name: &tokio_rustls::rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: tokio_rustls::rustls::pki_types::UnixTime,
    ) -> Result<tokio_rustls::rustls::client::danger::ServerCertVerified, tokio_rustls::rustls::Error> {
        Ok(tokio_rustls::rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &tonic::transport::CertificateDer<'_>,
        _dss: &tokio_rustls::rustls::DigitallySignedStruct,
    ) -> Result<tokio_rustls::rustls::client::danger::HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        Ok(tokio_rustls::rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &tonic::transport::CertificateDer<'_>,
        _dss: &tokio_rustls::rustls::DigitallySignedStruct,
    ) -> Result<tokio_rustls::rustls::client::danger::HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        Ok(tokio_rustls::rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<tokio_rustls::rustls::SignatureScheme> {
        tokio_rustls::rustls::crypto::aws_lc_rs::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
