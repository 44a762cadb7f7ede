//! The stub transport logs the message envelope, records what it was
//! handed and returns a programmable per-recipient outcome. It can be
//! useful for testing purposes.

mod error;

pub use self::error::*;
use crate::types::{EmailAddress, Envelope};
use crate::{DeliveryOutcome, SyncFuture, Transport};
use std::future::ready;
use std::sync::Mutex;

/// This transport accepts every recipient except those it was told to
/// reject and keeps a record of every handoff.
#[derive(Debug, Default)]
pub struct StubTransport {
    rejects: Vec<EmailAddress>,
    breakdown: Option<Error>,
    sent: Mutex<Vec<(Envelope, Vec<u8>)>>,
}

impl StubTransport {
    /// Creates a new transport that accepts all recipients
    pub fn new_positive() -> StubTransport {
        Default::default()
    }

    /// Creates a new transport that rejects the given recipients
    pub fn rejecting(rejects: Vec<EmailAddress>) -> StubTransport {
        StubTransport {
            rejects,
            ..Default::default()
        }
    }

    /// Creates a new transport that fails outright instead of
    /// reporting an outcome
    pub fn broken(reason: &'static str) -> StubTransport {
        StubTransport {
            breakdown: Some(Error::Client(reason)),
            ..Default::default()
        }
    }

    /// Every envelope and message body handed to this transport so far
    pub fn sent(&self) -> Vec<(Envelope, Vec<u8>)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Transport for StubTransport {
    type Error = Error;

    fn send_sealed<'s, 'a>(
        &'s self,
        envelope: Envelope,
        message: &'a [u8],
    ) -> SyncFuture<'a, Result<DeliveryOutcome, Error>>
    where
        's: 'a,
    {
        info!(
            "{}: from=<{}> to=<{:?}>",
            envelope.message_id(),
            match envelope.from() {
                Some(address) => address.to_string(),
                None => "".to_string(),
            },
            envelope.to()
        );
        let response = match self.breakdown {
            Some(ref error) => Err(error.clone()),
            None => {
                let failed: Vec<EmailAddress> = envelope
                    .to()
                    .iter()
                    .filter(|rcpt| self.rejects.contains(*rcpt))
                    .cloned()
                    .collect();
                let accepted = envelope.to().len() - failed.len();
                Ok(DeliveryOutcome::new(accepted, failed))
            }
        };
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((envelope, message.to_vec()));
        Box::pin(ready(response))
    }
}
