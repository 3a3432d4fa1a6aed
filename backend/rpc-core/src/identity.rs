//! Self-signed TLS identity, regenerated on every server start.
//!
//! # Ephemeral certificate
//!
//! Only the certificate PEM is written to disk (so the front-end can pin it);
//! the private key lives in memory for the life of the process. A restart
//! therefore invalidates any previously persisted certificate: the file is
//! advisory and is overwritten on the next start.

use crate::error::identity::IdentityError;

use common::ErrorLocation;

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use rand::RngCore;
use rand::rngs::OsRng;
use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair,
    KeyUsagePurpose, PKCS_ECDSA_P256_SHA256, SanType, SerialNumber,
};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use sysinfo::{Networks, System};
use time::{Duration as TimeDuration, OffsetDateTime};

pub const LOCALHOST: &str = "localhost";
pub const CERTIFICATE_ORGANIZATION: &str = "NoteKeeper.io";
const HTTP1_ALPN: &[u8] = b"http/1.1";
const SERIAL_NUMBER_BYTES: usize = 16;

/// Names the certificate is valid for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectNames {
    pub hostname: String,
    pub dns_names: Vec<String>,
    pub ip_addresses: Vec<IpAddr>,
}

impl SubjectNames {
    /// Hostname plus `localhost`, loopback v4/v6 and the given interface
    /// addresses, deduplicated in first-seen order.
    pub fn new(hostname: impl Into<String>, interface_addrs: impl IntoIterator<Item = IpAddr>) -> Self {
        let hostname = hostname.into();

        let mut dns_names = vec![hostname.clone()];
        if hostname != LOCALHOST {
            dns_names.push(String::from(LOCALHOST));
        }

        let mut ip_addresses = vec![IpAddr::V4(Ipv4Addr::LOCALHOST), IpAddr::V6(Ipv6Addr::LOCALHOST)];
        for addr in interface_addrs {
            if !ip_addresses.contains(&addr) {
                ip_addresses.push(addr);
            }
        }

        Self {
            hostname,
            dns_names,
            ip_addresses,
        }
    }

    /// Reads the hostname and every local interface address from the OS.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Hostname`] if the hostname cannot be resolved.
    pub fn detect() -> Result<Self, IdentityError> {
        let hostname = System::host_name().ok_or_else(|| IdentityError::Hostname {
            message: String::from("Unable to resolve local hostname"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let networks = Networks::new_with_refreshed_list();
        let addrs: Vec<IpAddr> = networks
            .list()
            .iter()
            .flat_map(|(_, data)| data.ip_networks().iter().map(|network| network.addr))
            .collect();

        debug!(
            "Detected hostname {} with {} interface addresses",
            hostname,
            addrs.len()
        );

        Ok(Self::new(hostname, addrs))
    }

    fn to_san_entries(&self) -> Result<Vec<SanType>, IdentityError> {
        let mut entries = Vec::with_capacity(self.dns_names.len() + self.ip_addresses.len());
        for name in &self.dns_names {
            entries.push(SanType::DnsName(name.clone().try_into()?));
        }
        entries.extend(self.ip_addresses.iter().copied().map(SanType::IpAddress));
        Ok(entries)
    }
}

/// The server's TLS certificate and in-memory private key.
pub struct ServerIdentity {
    certificate_pem: String,
    certificate_der: CertificateDer<'static>,
    private_key_der: PrivatePkcs8KeyDer<'static>,
}

impl ServerIdentity {
    /// Generates an identity for this machine.
    pub fn generate() -> Result<Self, IdentityError> {
        Self::generate_for(SubjectNames::detect()?)
    }

    /// Generates a P-256 key and a self-signed, CA-capable certificate valid
    /// from 24 hours ago until the end of 2049.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError`] if randomness, key generation or encoding fails.
    pub fn generate_for(subject_names: SubjectNames) -> Result<Self, IdentityError> {
        let key_pair = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256)?;

        let mut distinguished_name = DistinguishedName::new();
        distinguished_name.push(DnType::OrganizationName, CERTIFICATE_ORGANIZATION);
        distinguished_name.push(DnType::CommonName, subject_names.hostname.as_str());

        let mut params = CertificateParams::default();
        params.distinguished_name = distinguished_name;
        params.subject_alt_names = subject_names.to_san_entries()?;
        params.serial_number = Some(random_serial_number()?);
        params.not_before = OffsetDateTime::now_utc() - TimeDuration::hours(24);
        params.not_after = not_after();
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::KeyEncipherment,
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyCertSign,
        ];

        let certificate = params.self_signed(&key_pair)?;

        info!(
            "Generated self-signed certificate for {} DNS names and {} IP addresses",
            subject_names.dns_names.len(),
            subject_names.ip_addresses.len()
        );

        Ok(Self {
            certificate_pem: certificate.pem(),
            certificate_der: certificate.der().clone(),
            private_key_der: PrivatePkcs8KeyDer::from(key_pair.serialize_der()),
        })
    }

    pub fn certificate_pem(&self) -> &str {
        &self.certificate_pem
    }

    pub fn certificate_der(&self) -> &CertificateDer<'static> {
        &self.certificate_der
    }

    /// Writes the certificate PEM (never the key) to `dir/file_name`,
    /// creating `dir` if needed.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Persist`] if the directory or file cannot be written.
    pub fn persist(&self, dir: &Path, file_name: &str) -> Result<PathBuf, IdentityError> {
        if !dir.exists() {
            debug!("Creating missing config directory {}", dir.display());
            fs::create_dir_all(dir).map_err(|e| IdentityError::Persist {
                location: ErrorLocation::from(Location::caller()),
                path: dir.to_path_buf(),
                source: e,
            })?;
        }

        let path = dir.join(file_name);
        write_private_file(&path, self.certificate_pem.as_bytes()).map_err(|e| {
            IdentityError::Persist {
                location: ErrorLocation::from(Location::caller()),
                path: path.clone(),
                source: e,
            }
        })?;

        debug!("Wrote certificate to {}", path.display());
        Ok(path)
    }

    /// TLS server configuration using this identity, HTTP/1.1 only.
    pub fn tls_config(&self) -> Result<Arc<rustls::ServerConfig>, IdentityError> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let mut config = rustls::ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .with_no_client_auth()
            .with_single_cert(
                vec![self.certificate_der.clone()],
                PrivateKeyDer::Pkcs8(self.private_key_der.clone_key()),
            )?;
        config.alpn_protocols = vec![HTTP1_ALPN.to_vec()];
        Ok(Arc::new(config))
    }
}

/// Uniformly random 128-bit serial.
fn random_serial_number() -> Result<SerialNumber, IdentityError> {
    let mut bytes = [0u8; SERIAL_NUMBER_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| IdentityError::SerialNumber {
            message: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;
    Ok(SerialNumber::from_slice(&bytes))
}

/// 2049-12-31 23:59:59 UTC, the last instant UTCTime can express.
fn not_after() -> OffsetDateTime {
    rcgen::date_time_ymd(2049, 12, 31) + TimeDuration::seconds(86_399)
}

#[cfg(unix)]
fn write_private_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents)
}

#[cfg(not(unix))]
fn write_private_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(contents)
}
