//!
//! # Outbound account email
//!
//! Welcome and cancellation notifications go through the SendGrid v3 HTTP API
//! with a single attempt each. Callers fire them from a spawned task, so a
//! provider outage can only produce a log line — never a failed request.

use serde_json::{json, Value};

use crate::error::AppError;

const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

#[derive(Clone)]
pub struct Mailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
}

impl Mailer {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            from,
        }
    }

    pub async fn send_welcome_email(&self, email: &str, name: &str) -> Result<(), AppError> {
        self.send(
            email,
            "Thanks for joining in",
            &format!(
                "Welcome to the app, {}. Let me know how you get along with the app.",
                name
            ),
        )
        .await
    }

    pub async fn send_cancellation_email(&self, email: &str, name: &str) -> Result<(), AppError> {
        self.send(
            email,
            "It's sad to see you go",
            &format!(
                "Hi {}. Kindly tell us if there's anything we can do to get you back.",
                name
            ),
        )
        .await
    }

    async fn send(&self, to: &str, subject: &str, text: &str) -> Result<(), AppError> {
        let body = message_body(&self.from, to, subject, text);

        self.client
            .post(SENDGRID_SEND_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::InternalServerError(format!("Mail request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| {
                AppError::InternalServerError(format!("Mail provider rejected message: {}", e))
            })?;

        Ok(())
    }
}

fn message_body(from: &str, to: &str, subject: &str, text: &str) -> Value {
    json!({
        "personalizations": [{ "to": [{ "email": to }] }],
        "from": { "email": from },
        "subject": subject,
        "content": [{ "type": "text/plain", "value": text }],
    })
}
