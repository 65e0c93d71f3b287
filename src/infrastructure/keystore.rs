use crate::error::{Pacs008Error, Result};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fmt;
use std::path::{Path, PathBuf};
use x509_cert::Certificate;
use x509_cert::der::{DecodePem, Encode};

/// Where the signing key and certificate live.
///
/// The keystore is a directory holding `<alias>.key.pem` (PKCS#8, plain or
/// encrypted, or PKCS#1) and `<alias>.crt.pem` (X.509). Passed explicitly
/// at startup; nothing is read from process-wide state.
#[derive(Clone, Default)]
pub struct KeystoreConfig {
    pub path: PathBuf,
    /// Store password; also decrypts the key when `key_password` is unset.
    pub password: Option<String>,
    pub alias: String,
    pub key_password: Option<String>,
}

impl KeystoreConfig {
    pub fn key_path(&self) -> PathBuf {
        self.path.join(format!("{}.key.pem", self.alias))
    }

    pub fn certificate_path(&self) -> PathBuf {
        self.path.join(format!("{}.crt.pem", self.alias))
    }
}

impl fmt::Debug for KeystoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeystoreConfig")
            .field("path", &self.path)
            .field("alias", &self.alias)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("key_password", &self.key_password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// RSA private key plus the X.509 certificate carrying its public half.
///
/// Read-only after construction; share it behind an `Arc`.
pub struct SigningMaterial {
    private_key: RsaPrivateKey,
    certificate: Certificate,
}

impl SigningMaterial {
    /// Pairs a key with its certificate, refusing certificates issued for
    /// another key.
    pub fn new(private_key: RsaPrivateKey, certificate: Certificate) -> Result<Self> {
        let certified = certificate_public_key(&certificate)?;
        if RsaPublicKey::from(&private_key) != certified {
            return Err(Pacs008Error::keystore(
                "certificate does not match the private key",
            ));
        }
        Ok(Self {
            private_key,
            certificate,
        })
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn public_key(&self) -> RsaPublicKey {
        RsaPublicKey::from(&self.private_key)
    }

    /// Subject distinguished name in RFC 4514 form.
    pub fn subject_name(&self) -> String {
        self.certificate.tbs_certificate.subject.to_string()
    }

    pub fn certificate_der(&self) -> Result<Vec<u8>> {
        self.certificate
            .to_der()
            .map_err(|e| Pacs008Error::keystore(format!("cannot encode certificate: {e}")))
    }
}

impl fmt::Debug for SigningMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningMaterial")
            .field("subject", &self.subject_name())
            .finish_non_exhaustive()
    }
}

/// Loads the key and certificate registered under `config.alias`.
pub fn load_signing_material(config: &KeystoreConfig) -> Result<SigningMaterial> {
    if config.alias.trim().is_empty() {
        return Err(Pacs008Error::keystore("key alias is required"));
    }
    if !config.path.is_dir() {
        return Err(Pacs008Error::keystore(format!(
            "keystore directory {} not found",
            config.path.display()
        )));
    }

    let key_pem = read_pem(&config.key_path())?;
    let password = config.key_password.as_ref().or(config.password.as_ref());
    let private_key = decode_private_key(&key_pem, password.map(String::as_str))?;
    let certificate = load_certificate(&config.certificate_path())?;

    SigningMaterial::new(private_key, certificate)
}

pub fn load_certificate(path: &Path) -> Result<Certificate> {
    let pem = read_pem(path)?;
    Certificate::from_pem(pem.as_bytes())
        .map_err(|e| Pacs008Error::keystore(format!("invalid certificate {}: {e}", path.display())))
}

/// RSA public key from a certificate's subject public key info.
pub fn certificate_public_key(certificate: &Certificate) -> Result<RsaPublicKey> {
    let spki = certificate
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| Pacs008Error::keystore(format!("cannot encode public key info: {e}")))?;
    RsaPublicKey::from_public_key_der(&spki)
        .map_err(|e| Pacs008Error::keystore(format!("certificate key is not RSA: {e}")))
}

fn read_pem(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| Pacs008Error::keystore(format!("cannot read {}: {e}", path.display())))
}

fn decode_private_key(pem: &str, password: Option<&str>) -> Result<RsaPrivateKey> {
    let key = if pem.contains("BEGIN ENCRYPTED PRIVATE KEY") {
        let password = password
            .ok_or_else(|| Pacs008Error::keystore("private key is encrypted, no password given"))?;
        RsaPrivateKey::from_pkcs8_encrypted_pem(pem, password.as_bytes())
            .map_err(|e| Pacs008Error::keystore(format!("cannot decrypt private key: {e}")))?
    } else if pem.contains("BEGIN RSA PRIVATE KEY") {
        RsaPrivateKey::from_pkcs1_pem(pem)
            .map_err(|e| Pacs008Error::keystore(format!("invalid PKCS#1 private key: {e}")))?
    } else {
        RsaPrivateKey::from_pkcs8_pem(pem)
            .map_err(|e| Pacs008Error::keystore(format!("invalid PKCS#8 private key: {e}")))?
    };
    key.validate()
        .map_err(|e| Pacs008Error::keystore(format!("invalid RSA key: {e}")))?;
    Ok(key)
}
