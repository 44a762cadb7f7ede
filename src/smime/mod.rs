//! S/MIME sealing: sign with the sender identity, encrypt for the
//! recipient certificates, and produce the wire form the transport
//! will carry. All cryptographic work is delegated to OpenSSL
//! (CMS/PKCS#7 SignedData and EnvelopedData).
//!
//! Nothing is read or validated at configuration time. Unreadable
//! files, garbage PEM or a wrong passphrase surface from OpenSSL when
//! a message is sealed, never earlier and never silently.

mod error;

pub use self::error::*;
use crate::types::Envelope;
use openssl::pkcs7::{Pkcs7, Pkcs7Flags};
use openssl::pkey::{PKey, Private};
use openssl::stack::Stack;
use openssl::symm::Cipher;
use openssl::x509::X509;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// PEM material given either as a file path or as raw bytes.
///
/// Files are read within the scope of a single seal call; no handle
/// outlives it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertSource {
    File(PathBuf),
    Bytes(Vec<u8>),
}

impl CertSource {
    pub fn file<P: AsRef<Path>>(path: P) -> Self {
        CertSource::File(path.as_ref().to_path_buf())
    }

    pub fn bytes<B: Into<Vec<u8>>>(bytes: B) -> Self {
        CertSource::Bytes(bytes.into())
    }

    async fn read(&self) -> SealResult<Vec<u8>> {
        match self {
            CertSource::File(path) => Ok(async_std::fs::read(path).await?),
            CertSource::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

/// The sender's signing certificate and private key.
///
/// The key must correspond to the certificate. A passphrase is needed
/// only when the key is encrypted; an absent passphrase is treated as
/// an empty one when the key is loaded.
#[derive(Debug, Clone)]
pub struct SigningIdentity {
    certificate: CertSource,
    private_key: CertSource,
    passphrase: Option<String>,
}

impl SigningIdentity {
    pub fn new(certificate: CertSource, private_key: CertSource) -> Self {
        SigningIdentity {
            certificate,
            private_key,
            passphrase: None,
        }
    }

    pub fn with_passphrase<S: Into<String>>(mut self, passphrase: S) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    async fn load(&self) -> SealResult<(X509, PKey<Private>)> {
        let certificate = X509::from_pem(&self.certificate.read().await?)?;
        let passphrase = self.passphrase.as_deref().unwrap_or("");
        let private_key = PKey::private_key_from_pem_passphrase(
            &self.private_key.read().await?,
            passphrase.as_bytes(),
        )?;
        Ok((certificate, private_key))
    }
}

/// Which certificates to encrypt for.
#[derive(Debug, Clone)]
pub enum EncryptionCerts {
    /// One certificate, applied to the whole envelope
    Single(CertSource),
    /// Several certificates, all applied to the whole envelope
    List(Vec<CertSource>),
    /// One sealed copy per recipient, each encrypted to the
    /// certificate keyed by that recipient's address
    ByRecipient(HashMap<String, CertSource>),
}

/// Options passed through verbatim to the OpenSSL PKCS#7 calls.
///
/// Which flag values are meaningful is defined by OpenSSL, not by this
/// layer. The default is a detached signature and AES-256-CBC
/// enveloping, both in streaming mode.
#[derive(Clone, Copy)]
pub struct SealerOptions {
    pub sign_flags: Pkcs7Flags,
    pub encrypt_flags: Pkcs7Flags,
    pub cipher: Cipher,
}

impl Default for SealerOptions {
    fn default() -> Self {
        SealerOptions {
            sign_flags: Pkcs7Flags::STREAM | Pkcs7Flags::DETACHED,
            encrypt_flags: Pkcs7Flags::STREAM,
            cipher: Cipher::aes_256_cbc(),
        }
    }
}

impl fmt::Debug for SealerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealerOptions")
            .field("sign_flags", &self.sign_flags)
            .field("encrypt_flags", &self.encrypt_flags)
            .field("cipher", &self.cipher.nid().as_raw())
            .finish()
    }
}

/// Sealing configuration: what to sign with, whom to encrypt for, and
/// the options bag for the underlying calls.
#[derive(Debug, Clone, Default)]
pub struct SealerConfig {
    signing: Option<SigningIdentity>,
    encryption: Option<EncryptionCerts>,
    options: SealerOptions,
}

impl SealerConfig {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn sign_with(mut self, identity: SigningIdentity) -> Self {
        self.signing = Some(identity);
        self
    }

    pub fn encrypt_for(mut self, certs: EncryptionCerts) -> Self {
        self.encryption = Some(certs);
        self
    }

    pub fn options(mut self, options: SealerOptions) -> Self {
        self.options = options;
        self
    }
}

/// One wire-ready copy of the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedMessage {
    envelope: Envelope,
    body: Vec<u8>,
}

impl SealedMessage {
    fn new(envelope: Envelope, body: Vec<u8>) -> Self {
        SealedMessage { envelope, body }
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn body(&self) -> &[u8] {
        self.body.as_slice()
    }
}

/// A single-use sealing context over a [`SealerConfig`].
///
/// A fresh sealer is constructed for every send so that no state leaks
/// from one message into the next.
#[derive(Debug, Clone, Copy)]
pub struct Sealer<'a> {
    config: &'a SealerConfig,
}

impl<'a> Sealer<'a> {
    pub fn new(config: &'a SealerConfig) -> Self {
        Sealer { config }
    }

    /// Produce the wire-ready copies of the message for this envelope.
    ///
    /// The body is signed first if a signing identity is configured,
    /// then encrypted if encryption certificates are configured. With
    /// neither, the single copy is the body untouched. A
    /// recipient-keyed certificate map yields one copy per recipient,
    /// each carrying a single-address envelope; an envelope recipient
    /// with no mapped certificate fails the seal.
    pub async fn seal(&self, envelope: &Envelope, body: &[u8]) -> SealResult<Vec<SealedMessage>> {
        let signed = match self.config.signing {
            Some(ref identity) => self.sign(identity, body).await?,
            None => body.to_vec(),
        };
        match self.config.encryption {
            None => Ok(vec![SealedMessage::new(envelope.clone(), signed)]),
            Some(EncryptionCerts::Single(ref cert)) => {
                let sealed = self.encrypt(std::slice::from_ref(cert), &signed).await?;
                Ok(vec![SealedMessage::new(envelope.clone(), sealed)])
            }
            Some(EncryptionCerts::List(ref certs)) => {
                let sealed = self.encrypt(certs, &signed).await?;
                Ok(vec![SealedMessage::new(envelope.clone(), sealed)])
            }
            Some(EncryptionCerts::ByRecipient(ref map)) => {
                let mut copies = Vec::with_capacity(envelope.to().len());
                for rcpt in envelope.to() {
                    let cert = map
                        .get(AsRef::<str>::as_ref(rcpt))
                        .ok_or_else(|| Error::MissingRecipientCert(rcpt.to_string()))?;
                    let sealed = self.encrypt(std::slice::from_ref(cert), &signed).await?;
                    let copy = Envelope::new(
                        envelope.from().cloned(),
                        vec![rcpt.clone()],
                        envelope.message_id().to_string(),
                    )?;
                    copies.push(SealedMessage::new(copy, sealed));
                }
                Ok(copies)
            }
        }
    }

    async fn sign(&self, identity: &SigningIdentity, body: &[u8]) -> SealResult<Vec<u8>> {
        trace!("signing {} bytes", body.len());
        let (certificate, private_key) = identity.load().await?;
        let extra: Stack<X509> = Stack::new()?;
        let flags = self.config.options.sign_flags;
        let pkcs7 = Pkcs7::sign(&certificate, &private_key, &extra, body, flags)?;
        Ok(pkcs7.to_smime(body, flags)?)
    }

    async fn encrypt(&self, certs: &[CertSource], body: &[u8]) -> SealResult<Vec<u8>> {
        trace!(
            "encrypting {} bytes for {} certificate(s)",
            body.len(),
            certs.len()
        );
        let mut stack = Stack::new()?;
        for source in certs {
            stack.push(X509::from_pem(&source.read().await?)?)?;
        }
        let options = &self.config.options;
        let pkcs7 = Pkcs7::encrypt(&stack, body, options.cipher, options.encrypt_flags)?;
        Ok(pkcs7.to_smime(body, options.encrypt_flags)?)
    }
}
