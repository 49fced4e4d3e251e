use tracing::info;

/// Outbound mail. Delivery failures are the caller's to log; they never
/// abort the request that triggered them.
pub trait Mailer: Send + Sync {
    fn send_welcome(&self, to: &str, name: &str) -> anyhow::Result<()>;

    /// `token` is the raw reset token; only its hash is stored.
    fn send_password_reset(&self, to: &str, token: &str) -> anyhow::Result<()>;
}

/// Writes deliveries to the log instead of sending them.
pub struct LogMailer {
    pub frontend_url: String,
}

impl Default for LogMailer {
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
        }
    }
}

impl LogMailer {
    pub fn reset_link(&self, token: &str) -> String {
        format!(
            "{}/reset-password?token={}",
            self.frontend_url.trim_end_matches('/'),
            token
        )
    }
}

impl Mailer for LogMailer {
    fn send_welcome(&self, to: &str, name: &str) -> anyhow::Result<()> {
        info!("Welcome mail to {} ({})", to, name);
        Ok(())
    }

    fn send_password_reset(&self, to: &str, token: &str) -> anyhow::Result<()> {
        info!("Password reset mail to {}: {}", to, self.reset_link(token));
        Ok(())
    }
}
