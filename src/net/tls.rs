//! TLS configuration and certificate loading.

use std::path::{Path, PathBuf};

use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;

use crate::config::TlsConfig;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("certificate file not found: {}", .0.display())]
    CertificateMissing(PathBuf),
    #[error("private key file not found: {}", .0.display())]
    KeyMissing(PathBuf),
    #[error("failed to load certificate pair: {0}")]
    Load(#[from] std::io::Error),
}

/// Load the PEM certificate chain and private key named by `tls`.
pub async fn load_tls_config(tls: &TlsConfig) -> Result<RustlsConfig, TlsError> {
    let cert_path = Path::new(&tls.cert_path);
    let key_path = Path::new(&tls.key_path);

    if !cert_path.exists() {
        return Err(TlsError::CertificateMissing(cert_path.to_path_buf()));
    }
    if !key_path.exists() {
        return Err(TlsError::KeyMissing(key_path.to_path_buf()));
    }

    Ok(RustlsConfig::from_pem_file(cert_path, key_path).await?)
}
