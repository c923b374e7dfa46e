//! Email service for delivering password reset tickets.

use lettre::{
    AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::path::Path;
use std::time::Duration;

use crate::{config::Config, errors::Error};

pub struct EmailService {
    transport: EmailTransport,
    from_email: String,
    from_name: String,
    reply_to: Option<String>,
    base_url: String,
    reset_token_duration: Duration,
}

enum EmailTransport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File(AsyncFileTransport<Tokio1Executor>),
}

impl EmailService {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let email_config = &config.email;

        let transport = match &email_config.transport {
            crate::config::EmailTransportConfig::Smtp {
                host,
                port,
                username,
                password,
                use_tls,
            } => {
                // Use SMTP transport
                if !use_tls {
                    tracing::warn!("SMTP TLS is disabled - this is not recommended for production");
                }

                let smtp_builder = if *use_tls {
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                } else {
                    Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host))
                }
                .map_err(|e| Error::Internal {
                    operation: format!("create SMTP transport: {e}"),
                })?
                .port(*port)
                .credentials(Credentials::new(username.clone(), password.clone()));

                EmailTransport::Smtp(smtp_builder.build())
            }
            crate::config::EmailTransportConfig::File { path } => {
                // Use file transport for development/testing
                let emails_dir = Path::new(path);
                if !emails_dir.exists() {
                    std::fs::create_dir_all(emails_dir).map_err(|e| Error::Internal {
                        operation: format!("create emails directory: {e}"),
                    })?;
                }
                let file_transport = AsyncFileTransport::<Tokio1Executor>::new(emails_dir);
                EmailTransport::File(file_transport)
            }
        };

        Ok(Self {
            transport,
            from_email: email_config.from_email.clone(),
            from_name: email_config.from_name.clone(),
            reply_to: email_config.reply_to.clone(),
            base_url: config.base_url.clone(),
            reset_token_duration: config.auth.native.password_reset_token_duration,
        })
    }

    /// Email a password reset link carrying the raw ticket.
    ///
    /// The raw ticket appears only here; the database holds its digest.
    pub async fn send_password_reset_email(&self, to_email: &str, to_name: &str, token: &str) -> Result<(), Error> {
        let reset_link = format!("{}/api/v1/users/resetPassword/{}", self.base_url, token);
        let minutes = self.reset_token_duration.as_secs() / 60;

        let subject = format!("Your password reset token (valid for {minutes} min)");
        let body = self.create_password_reset_body(to_name, &reset_link, minutes);

        self.send_email(to_email, to_name, &subject, &body).await
    }

    async fn send_email(&self, to_email: &str, to_name: &str, subject: &str, body: &str) -> Result<(), Error> {
        let from = format!("{} <{}>", self.from_name, self.from_email)
            .parse::<Mailbox>()
            .map_err(|e| Error::Internal {
                operation: format!("parse from email: {e}"),
            })?;

        let to = format!("{to_name} <{to_email}>").parse::<Mailbox>().map_err(|e| Error::Internal {
            operation: format!("parse to email: {e}"),
        })?;

        let mut builder = Message::builder().from(from).to(to);
        if let Some(reply_to) = &self.reply_to {
            let mailbox = reply_to.parse::<Mailbox>().map_err(|e| Error::Internal {
                operation: format!("parse reply-to email: {e}"),
            })?;
            builder = builder.reply_to(mailbox);
        }

        let message = builder
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body.to_string())
            .map_err(|e| Error::Internal {
                operation: format!("build email message: {e}"),
            })?;

        // Delivery failures are the caller's signal to roll back reset state,
        // so they get their own error variant instead of a generic internal
        match &self.transport {
            EmailTransport::Smtp(smtp) => {
                if let Err(e) = smtp.send(message).await {
                    tracing::error!("SMTP delivery failed: {e}");
                    return Err(Error::EmailDeliveryFailed);
                }
            }
            EmailTransport::File(file) => {
                if let Err(e) = file.send(message).await {
                    tracing::error!("File delivery failed: {e}");
                    return Err(Error::EmailDeliveryFailed);
                }
            }
        }

        Ok(())
    }

    fn create_password_reset_body(&self, to_name: &str, reset_link: &str, minutes: u64) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Password Reset Request</title>
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
        .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
        .footer {{ margin-top: 30px; font-size: 12px; color: #666; }}
    </style>
</head>
<body>
    <div class="container">
        <h2>Password Reset Request</h2>

        <p>Hello {to_name},</p>

        <p>Forgot your password? If you didn't make this request, you can safely ignore this email.</p>

        <p>To reset your password, submit a PATCH request with your new password to the link below:</p>

        <p><a href="{reset_link}">Reset your password</a></p>

        <p>Or copy and paste this link into your browser:</p>
        <p>{reset_link}</p>

        <p>This link will expire in {minutes} minutes.</p>

        <div class="footer">
            <p>This is an automated message, please do not reply to this email.</p>
        </div>
    </div>
</body>
</html>"#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_config;

    #[tokio::test]
    async fn test_email_service_creation() {
        let config = create_test_config();
        let email_service = EmailService::new(&config);
        assert!(email_service.is_ok());
    }

    #[tokio::test]
    async fn test_password_reset_email_body() {
        let config = create_test_config();
        let email_service = EmailService::new(&config).unwrap();

        let body = email_service.create_password_reset_body("Jane Doe", "https://example.com/api/v1/users/resetPassword/abc123", 5);

        assert!(body.contains("Hello Jane Doe,"));
        assert!(body.contains("https://example.com/api/v1/users/resetPassword/abc123"));
        assert!(body.contains("Reset your password"));
        assert!(body.contains("expire in 5 minutes"));
    }

    #[tokio::test]
    async fn test_file_transport_writes_email() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = create_test_config();
        config.email.transport = crate::config::EmailTransportConfig::File {
            path: temp_dir.path().to_string_lossy().to_string(),
        };
        let email_service = EmailService::new(&config).unwrap();

        let token = "k3qmZx8vQ1rT5wY7u9iB2cD4eF6gH0jLmN8pR1sT3uV";
        email_service
            .send_password_reset_email("reset-test@example.com", "Reset Test", token)
            .await
            .unwrap();

        // The file transport drops one .eml per delivered message
        let written = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "eml"))
            .count();
        assert_eq!(written, 1);
    }
}
