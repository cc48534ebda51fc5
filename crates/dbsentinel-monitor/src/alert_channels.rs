//! Alert channel implementations.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use tracing::info;

use dbsentinel_config::EmailConfig;

use crate::alerts::AlertChannel;
use crate::error::MonitorError;

/// Email channel over async SMTP (STARTTLS relay).
pub struct EmailChannel {
    config: EmailConfig,
}

impl EmailChannel {
    /// Create a new email channel.
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, subject: &str, body: &str) -> Result<Message, MonitorError> {
        let mut builder = Message::builder()
            .from(Mailbox::new(
                Some("dbsentinel".to_string()),
                self.config.from.parse()?,
            ))
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);

        for to in &self.config.to {
            builder = builder.to(to.parse::<Mailbox>()?);
        }

        builder
            .body(body.to_string())
            .map_err(|e| MonitorError::Build(e.to_string()))
    }
}

#[async_trait]
impl AlertChannel for EmailChannel {
    fn name(&self) -> &str {
        "email"
    }

    async fn send(&self, subject: &str, body: &str) -> Result<(), MonitorError> {
        let email = self.build_message(subject, body)?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_server)?
                .port(self.config.smtp_port);

        if !self.config.username.is_empty() && !self.config.password.is_empty() {
            transport_builder = transport_builder.credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            ));
        }

        let mailer = transport_builder.build();
        mailer.send(email).await?;

        info!(subject, recipients = self.config.to.len(), "Alert email sent");
        Ok(())
    }
}
