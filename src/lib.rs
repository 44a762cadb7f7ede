/*!

# S/MIME mail sealing

mailseal takes an outgoing mail message, optionally signs it with the
sender's certificate and private key, optionally encrypts it for the
recipients' certificates, and hands the sealed form to a mail transport
for delivery. The cryptographic work (CMS/PKCS#7 SignedData and
EnvelopedData per RFC 5751) is delegated to OpenSSL; this crate wires
certificate material and options into those calls and reports a
per-recipient delivery outcome.

## Example
```rust,no_run
use mailseal::prelude::*;

async fn send_signed() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let envelope = Envelope::new(
        Some("user@localhost".parse()?),
        vec!["root@localhost".parse()?],
        "id".to_string(),
    )?;
    let body = b"From: user@localhost\r\n\
                 Content-Type: text/plain\r\n\
                 \r\n\
                 Hello example\r\n"
        .to_vec();

    let config = SealerConfig::new().sign_with(SigningIdentity::new(
        CertSource::file("certs/sender.crt"),
        CertSource::file("certs/sender.key"),
    ));
    let mailer = SMimeMailer::new(config, StubTransport::new_positive());

    let mut mail = OutgoingMail::new(envelope, body);
    let delivered = mailer.send(&mut mail).await?;
    assert!(delivered);
    Ok(())
}
```

# Features
 - [x] Sign with the sender identity (detached CMS signature by default)
 - [x] Encrypt for one certificate, a list, or one certificate per recipient
 - [x] Pass OpenSSL flags and cipher choice through untouched
 - [x] Send plain when neither signing nor encryption is configured
 - [x] Report which recipients the transport rejected

The transport is a seam: implement [`Transport`] for your delivery
mechanism, or use the bundled [`stub::StubTransport`] in tests.

*/

#![deny(
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    missing_debug_implementations,
    clippy::unwrap_used
)]

#[macro_use]
extern crate log;

pub mod mailer;
pub mod smime;
pub mod stub;
pub mod types;

pub mod prelude {
    pub use crate::mailer::SMimeMailer;
    pub use crate::smime::{
        CertSource, EncryptionCerts, SealerConfig, SealerOptions, SigningIdentity,
    };
    pub use crate::stub::StubTransport;
    pub use crate::types::*;
    pub use crate::{DeliveryOutcome, SyncFuture, Transport};
}

use crate::types::{EmailAddress, Envelope};
use std::future::Future;
use std::pin::Pin;

pub type SyncFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Sync + Send + 'a>>;

/// Transport method for sealed mail
pub trait Transport: std::fmt::Debug {
    /// Error type for the transport
    type Error;

    /// Attempt once to deliver the message to the envelope recipients.
    ///
    /// The transport reports how many recipients accepted the message
    /// and which ones it could not deliver to. A broken-down transport
    /// that cannot report a per-recipient outcome returns an error.
    fn send_sealed<'s, 'a>(
        &'s self,
        envelope: Envelope,
        message: &'a [u8],
    ) -> SyncFuture<'a, Result<DeliveryOutcome, Self::Error>>
    where
        's: 'a;
}

/// Per-recipient result of a single delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    accepted: usize,
    failed: Vec<EmailAddress>,
}

impl DeliveryOutcome {
    pub fn new(accepted: usize, failed: Vec<EmailAddress>) -> Self {
        DeliveryOutcome { accepted, failed }
    }

    /// Number of recipients the transport queued or delivered to
    pub fn accepted(&self) -> usize {
        self.accepted
    }

    /// Recipients the transport could not deliver to
    pub fn failed(&self) -> &[EmailAddress] {
        self.failed.as_slice()
    }

    pub fn into_failed(self) -> Vec<EmailAddress> {
        self.failed
    }
}
