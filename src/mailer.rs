//! The mailer binds a sealing configuration to a mail transport and
//! performs the single best-effort send.

use crate::smime::{self, Sealer, SealerConfig};
use crate::types::OutgoingMail;
use crate::Transport;

/// An enum of all error kinds.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Signing or encryption was configured but could not be applied
    #[error("seal error: {0}")]
    Seal(#[from] smime::Error),
    /// The transport broke down before reporting a per-recipient outcome
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

/// Send result type
pub type SendResult = Result<bool, Error>;

/// Seals outgoing mail according to the configuration and hands each
/// copy to the transport.
///
/// Both collaborators are supplied at construction and are swappable:
/// any [`Transport`] implementation will do, including a test fake.
/// The configuration is expected to be complete before the first send
/// and not to change while a send is in flight.
#[derive(Debug)]
pub struct SMimeMailer<T> {
    config: SealerConfig,
    transport: T,
}

impl<T> SMimeMailer<T>
where
    T: Transport + Send + Sync,
    T::Error: std::error::Error + Send + Sync + 'static,
{
    pub fn new(config: SealerConfig, transport: T) -> Self {
        SMimeMailer { config, transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// One best-effort attempt to deliver the message. No retries.
    ///
    /// Returns `Ok(true)` iff the transport accepted the message for
    /// at least one recipient and `Ok(false)` when it accepted none.
    /// The recipients the transport rejected are recorded on the mail,
    /// replacing the record of any previous attempt. Seal failures and
    /// transport breakdowns propagate as errors; a fully rejected send
    /// does not.
    pub async fn send(&self, mail: &mut OutgoingMail) -> SendResult {
        let sealer = Sealer::new(&self.config);
        let copies = sealer.seal(mail.envelope(), mail.body()).await?;

        let mut accepted = 0;
        let mut failed = Vec::new();
        for copy in copies {
            debug!(
                "{}: dispatching to {:?}",
                copy.envelope().message_id(),
                copy.envelope().to()
            );
            let outcome = self
                .transport
                .send_sealed(copy.envelope().clone(), copy.body())
                .await
                .map_err(|e| Error::Transport(Box::new(e)))?;
            accepted += outcome.accepted();
            failed.extend(outcome.into_failed());
        }

        if accepted == 0 {
            warn!(
                "{}: no recipient accepted the message",
                mail.envelope().message_id()
            );
        }
        mail.record_failed(failed);
        Ok(accepted > 0)
    }
}
