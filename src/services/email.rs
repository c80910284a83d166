use crate::config::email::{server_url, EmailConfig};
use crate::templates;
use anyhow::Result;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

#[derive(Clone)]
pub struct EmailService {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from_address: Option<String>,
    server_url: String,
}

impl EmailService {
    /// Build from environment variables. Without SMTP settings, sends are
    /// skipped and logged.
    pub fn from_env() -> Self {
        let server_url = server_url();
        let Some(cfg) = EmailConfig::from_env() else {
            return Self::disabled(server_url);
        };

        let creds = Credentials::new(cfg.smtp_username.clone(), cfg.smtp_password.clone());
        match AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.smtp_host)
            .map(|builder| builder.port(cfg.smtp_port).credentials(creds).build())
        {
            Ok(transport) => Self {
                transport: Some(transport),
                from_address: Some(cfg.from_address),
                server_url,
            },
            Err(e) => {
                tracing::warn!("Failed to build SMTP transport: {e}");
                Self::disabled(server_url)
            }
        }
    }

    pub fn disabled(server_url: String) -> Self {
        Self {
            transport: None,
            from_address: None,
            server_url,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    pub fn reset_url(&self, token: &str) -> String {
        format!("{}/reset_password/{}", self.server_url, token)
    }

    pub async fn send_password_reset_email(
        &self,
        to: &str,
        username: &str,
        token: &str,
    ) -> Result<()> {
        let mut context = tera::Context::new();
        context.insert("username", username);
        context.insert("reset_url", &self.reset_url(token));
        let body = templates::render_text("email/reset_password.txt", &context)
            .map_err(|e| anyhow::anyhow!("Failed to render reset email: {e}"))?;

        self.send_email(to, "[Microblog] Reset Your Password", &body)
            .await
    }

    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let (Some(transport), Some(from_address)) = (&self.transport, &self.from_address) else {
            tracing::debug!("SMTP not configured, skipping email to {to}");
            return Ok(());
        };

        let from_mailbox: Mailbox =
            from_address
                .parse()
                .map_err(|e: lettre::address::AddressError| {
                    anyhow::anyhow!("Invalid from address '{}': {}", from_address, e)
                })?;
        let to_mailbox: Mailbox = to.parse().map_err(|e: lettre::address::AddressError| {
            anyhow::anyhow!("Invalid to address '{}': {}", to, e)
        })?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        transport.send(email).await?;
        tracing::info!("Email sent to {to}: {subject}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_service_skips_sending() {
        let service = EmailService::disabled("http://localhost:5000".to_string());
        assert!(!service.is_configured());
        service
            .send_password_reset_email("susan@example.com", "susan", "tok")
            .await
            .unwrap();
    }

    #[test]
    fn reset_url_points_at_reset_page() {
        let service = EmailService::disabled("https://blog.example".to_string());
        assert_eq!(
            service.reset_url("abc.def"),
            "https://blog.example/reset_password/abc.def"
        );
    }
}
