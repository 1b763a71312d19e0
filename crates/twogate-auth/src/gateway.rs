//! Outbound delivery gateways for channel codes.
//!
//! The orchestrator persists a code before dispatching it, so a
//! delivery failure is surfaced to the caller while the stored code
//! stays valid. Implementations deliver a single message and report
//! success or failure; retries are the implementation's business.

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct DeliveryError(pub String);

pub trait SmsGateway: Send + Sync {
    fn send(
        &self,
        to: &str,
        body: &str,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

pub trait MailGateway: Send + Sync {
    fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

/// Local dev sender that logs the message instead of sending a real
/// SMS. The logged body includes the code; that is the point of the
/// stub.
#[derive(Debug, Clone, Default)]
pub struct LogSmsGateway;

impl SmsGateway for LogSmsGateway {
    async fn send(&self, to: &str, body: &str) -> Result<(), DeliveryError> {
        info!(to = %to, body = %body, "sms send stub");
        Ok(())
    }
}

/// Local dev sender that logs the message instead of sending real
/// email.
#[derive(Debug, Clone, Default)]
pub struct LogMailGateway;

impl MailGateway for LogMailGateway {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DeliveryError> {
        info!(to = %to, subject = %subject, body = %body, "email send stub");
        Ok(())
    }
}
