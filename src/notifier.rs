//! Error Notifier (C9): SMTP alerts on worker/scheduler failure.
//!
//! Fetches the active recipient list fresh at send time (no caching — the
//! original re-queries per send so a newly-added recipient is never missed),
//! composes an HTML message, and sends over STARTTLS. Failure is logged and
//! swallowed; this must never poison the caller's error path.

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{error, info};

use crate::store::Store;

pub struct ErrorNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_email: String,
    store: Store,
}

impl ErrorNotifier {
    pub fn new(
        store: Store,
        smtp_server: &str,
        smtp_port: u16,
        smtp_email: &str,
        smtp_password: &str,
    ) -> anyhow::Result<Self> {
        let creds = Credentials::new(smtp_email.to_string(), smtp_password.to_string());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(smtp_server)?
            .port(smtp_port)
            .credentials(creds)
            .build();

        Ok(Self {
            transport,
            from_email: smtp_email.to_string(),
            store,
        })
    }

    /// Notifies every active recipient that `job_id` (processing `source_url`)
    /// failed with `error`, optionally including a `traceback`.
    pub async fn notify(&self, job_id: &str, source_url: &str, error: &str, traceback: Option<&str>) {
        let recipients = match self.store.active_recipients().await {
            Ok(r) => r,
            Err(e) => {
                error!("notifier: failed to load recipient list: {e}");
                return;
            }
        };
        if recipients.is_empty() {
            return;
        }

        let html = render_html(job_id, source_url, error, traceback);
        let subject = format!("NewsAgent job failed: {job_id}");

        for recipient in recipients {
            let message = Message::builder()
                .from(match self.from_email.parse() {
                    Ok(addr) => addr,
                    Err(e) => {
                        error!("notifier: invalid from address {}: {e}", self.from_email);
                        return;
                    }
                })
                .to(match recipient.email.parse() {
                    Ok(addr) => addr,
                    Err(e) => {
                        error!("notifier: invalid recipient address {}: {e}", recipient.email);
                        continue;
                    }
                })
                .subject(&subject)
                .header(ContentType::TEXT_HTML)
                .body(html.clone());

            let message = match message {
                Ok(m) => m,
                Err(e) => {
                    error!("notifier: failed to build message: {e}");
                    continue;
                }
            };

            match self.transport.send(message).await {
                Ok(_) => info!("notifier: alert sent to {}", recipient.email),
                Err(e) => error!("notifier: failed to send to {}: {e}", recipient.email),
            }
        }
    }
}

fn render_html(job_id: &str, source_url: &str, error: &str, traceback: Option<&str>) -> String {
    let traceback_block = traceback
        .map(|t| format!("<pre>{}</pre>", html_escape(t)))
        .unwrap_or_default();

    format!(
        "<h2>NewsAgent job failed</h2>\
         <p><b>Job ID:</b> {job_id}</p>\
         <p><b>Source URL:</b> {source_url}</p>\
         <p><b>Error:</b> {}</p>\
         {traceback_block}",
        html_escape(error)
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_html_in_error_message() {
        let html = render_html("job-1", "https://example.com", "<script>bad</script>", None);
        assert!(html.contains("&lt;script&gt;"));
    }
}
