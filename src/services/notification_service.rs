//! Outbound messages to users. Delivery is pluggable; the stock notifier
//! only writes the message to the log, which is enough for local setups
//! and tests.

use async_trait::async_trait;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodePurpose {
    VerifyEmail,
    ResetPassword,
}

impl CodePurpose {
    pub fn subject(&self) -> &'static str {
        match self {
            CodePurpose::VerifyEmail => "Verify your email",
            CodePurpose::ResetPassword => "Reset your password",
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_code(&self, email: &str, purpose: CodePurpose, code: &str) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_code(&self, email: &str, purpose: CodePurpose, code: &str) -> Result<()> {
        tracing::info!(%email, subject = purpose.subject(), %code, "one-time code issued");
        Ok(())
    }
}
