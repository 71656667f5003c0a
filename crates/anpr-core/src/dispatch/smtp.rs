use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;

use super::AlertTransport;
use crate::config::{SmtpAuth, SmtpSettings, SmtpTls};
use crate::error::CoreError;
use crate::model::AlertNotification;

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Mail transport over SMTP.
pub struct SmtpTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpTransport {
    pub fn new(settings: &SmtpSettings) -> Result<Self, CoreError> {
        let from: Mailbox = settings.from.parse().map_err(|e| CoreError::Config {
            message: format!("invalid sender address '{}': {e}", settings.from),
        })?;

        let host = settings.host.as_str();
        let builder = match settings.tls {
            SmtpTls::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
            SmtpTls::Opportunistic => {
                let params = TlsParameters::new(host.into()).map_err(config_error)?;
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
                    .tls(Tls::Opportunistic(params))
            }
            SmtpTls::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host).map_err(config_error)?
            }
            SmtpTls::Tls => {
                AsyncSmtpTransport::<Tokio1Executor>::relay(host).map_err(config_error)?
            }
        }
        .port(settings.port)
        .timeout(Some(SMTP_TIMEOUT));

        let builder = match (&settings.username, &settings.password, settings.auth) {
            (_, _, SmtpAuth::None) | (None, _, _) => builder,
            (Some(user), password, auth) => {
                let password = password
                    .as_ref()
                    .map(|p| p.expose_secret().to_string())
                    .unwrap_or_default();
                let builder = builder.credentials(Credentials::new(user.clone(), password));
                match auth {
                    SmtpAuth::Plain => builder.authentication(vec![Mechanism::Plain]),
                    SmtpAuth::Login => builder.authentication(vec![Mechanism::Login]),
                    SmtpAuth::Auto | SmtpAuth::None => builder,
                }
            }
        };

        Ok(Self {
            mailer: builder.build(),
            from,
        })
    }

    fn message(&self, notification: &AlertNotification) -> Result<Message, CoreError> {
        let to: Mailbox = match notification.recipient.as_deref() {
            Some(recipient) => recipient.parse().map_err(|e| CoreError::Dispatch {
                transport: "smtp",
                message: format!("invalid recipient '{recipient}': {e}"),
            })?,
            None => self.from.clone(),
        };

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(notification.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(notification.body.clone())
            .map_err(|e| dispatch_error(&e))
    }
}

#[async_trait]
impl AlertTransport for SmtpTransport {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn send(&self, notification: &AlertNotification) -> Result<(), CoreError> {
        let message = self.message(notification)?;
        self.mailer
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| dispatch_error(&e))
    }
}

fn config_error(err: lettre::transport::smtp::Error) -> CoreError {
    CoreError::Config {
        message: format!("SMTP transport: {err}"),
    }
}

fn dispatch_error(err: &dyn std::error::Error) -> CoreError {
    CoreError::Dispatch {
        transport: "smtp",
        message: err.to_string(),
    }
}
