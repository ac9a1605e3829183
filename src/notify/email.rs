use anyhow::{anyhow, Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::Publisher;

const DEFAULT_SUBJECT: &str = "Aviso de suspensión del servicio de agua";

pub struct EmailPublisher {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
    subject: String,
}

fn env_required(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("{key} missing"))
}

impl EmailPublisher {
    pub fn from_env() -> Result<Self> {
        let host = env_required("SMTP_HOST")?;
        let user = env_required("SMTP_USER")?;
        let pass = env_required("SMTP_PASS")?;
        let from_addr = env_required("NOTIFY_EMAIL_FROM")?;
        let to_addr = env_required("NOTIFY_EMAIL_TO")?;

        let creds = Credentials::new(user, pass);
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
            .context("invalid SMTP_HOST")?
            .credentials(creds)
            .build();

        let from = from_addr.parse().context("invalid NOTIFY_EMAIL_FROM")?;
        let to = to_addr.parse().context("invalid NOTIFY_EMAIL_TO")?;

        Ok(Self {
            mailer,
            from,
            to,
            subject: std::env::var("NOTIFY_EMAIL_SUBJECT").unwrap_or_else(|_| DEFAULT_SUBJECT.to_string()),
        })
    }

    fn message(&self, text: &str) -> Result<Message> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(self.subject.clone())
            .header(header::ContentType::TEXT_PLAIN)
            .body(text.to_string())
            .context("build email")
    }
}

#[async_trait::async_trait]
impl Publisher for EmailPublisher {
    async fn publish(&self, text: &str) -> Result<()> {
        let msg = self.message(text)?;
        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "email"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 5] = [
        "SMTP_HOST",
        "SMTP_USER",
        "SMTP_PASS",
        "NOTIFY_EMAIL_FROM",
        "NOTIFY_EMAIL_TO",
    ];

    #[serial_test::serial]
    #[test]
    fn from_env_reports_missing_vars() {
        for v in VARS {
            std::env::remove_var(v);
        }
        let err = EmailPublisher::from_env().err().unwrap();
        assert!(err.to_string().contains("SMTP_HOST"));
    }

    #[serial_test::serial]
    #[tokio::test]
    async fn builds_plain_text_message() {
        std::env::set_var("SMTP_HOST", "smtp.example.org");
        std::env::set_var("SMTP_USER", "u");
        std::env::set_var("SMTP_PASS", "p");
        std::env::set_var("NOTIFY_EMAIL_FROM", "Avisos <avisos@example.org>");
        std::env::set_var("NOTIFY_EMAIL_TO", "vecinos@example.org");

        let p = EmailPublisher::from_env().unwrap();
        let msg = p.message("- Colonia Centro").unwrap();
        let raw = String::from_utf8(msg.formatted()).unwrap();
        assert!(raw.contains("To: vecinos@example.org"));
        assert!(raw.contains("- Colonia Centro"));

        for v in VARS {
            std::env::remove_var(v);
        }
    }
}
