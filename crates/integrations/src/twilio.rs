//! WhatsApp delivery through the Twilio Messages API

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info};
use urbanova_core::contact::whatsapp_address;
use urbanova_core::ports::{DeliveryResult, MessagingChannel};
use urbanova_core::{ConciergeError, ConciergeResult};

use crate::config::TwilioConfig;

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    code: Option<i64>,
    message: String,
}

pub struct TwilioWhatsApp {
    client: Client,
    config: TwilioConfig,
}

impl TwilioWhatsApp {
    pub fn new(client: Client, config: TwilioConfig) -> Self {
        Self { client, config }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.config.account_sid)
        )
    }
}

#[async_trait]
impl MessagingChannel for TwilioWhatsApp {
    async fn send_whatsapp(&self, to: &str, body: &str) -> ConciergeResult<DeliveryResult> {
        let to = whatsapp_address(to).map_err(|e| ConciergeError::validation(e.to_string()))?;
        let from = whatsapp_address(&self.config.from_number)
            .map_err(|e| ConciergeError::validation(e.to_string()))?;

        let res = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[("From", from.as_str()), ("To", to.as_str()), ("Body", body)])
            .send()
            .await
            .map_err(|e| {
                error!("Twilio connection error: {}", e);
                ConciergeError::external("twilio", e)
            })?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            let detail = match serde_json::from_str::<ErrorResponse>(&text) {
                Ok(err) => format!("{} (code {})", err.message, err.code.unwrap_or_default()),
                Err(_) => text,
            };
            error!(%status, "Twilio rejected message: {}", detail);
            return Err(ConciergeError::external(
                "twilio",
                format!("status {status}: {detail}"),
            ));
        }

        let message: MessageResponse = res
            .json()
            .await
            .map_err(|e| ConciergeError::external("twilio", e))?;
        info!(sid = %message.sid, "WhatsApp message queued");

        Ok(DeliveryResult {
            provider_id: message.sid,
            accepted_at: Utc::now(),
        })
    }
}
