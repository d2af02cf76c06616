use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::config::SmsConfig;

/// Provider acknowledgement for an accepted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsReceipt {
    pub message_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SmsError {
    #[error("SMS gateway is not configured")]
    NotConfigured,
    #[error("SMS gateway rejected the message ({status}): {detail}")]
    Rejected { status: u16, detail: String },
    #[error("SMS gateway unreachable: {0}")]
    Transport(String),
}

/// Outbound SMS transport. Receives numbers already in `+<cc><number>` form.
#[async_trait]
pub trait SmsGateway: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> Result<SmsReceipt, SmsError>;
}

/// Client for the Twilio Messages REST endpoint.
#[derive(Debug, Clone)]
pub struct TwilioGateway {
    http: reqwest::Client,
    api_base: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResource {
    message: Option<String>,
}

impl TwilioGateway {
    /// Returns `None` unless SID, token and sender number are all set.
    pub fn from_config(config: &SmsConfig) -> Result<Option<Self>, SmsError> {
        let (Some(account_sid), Some(auth_token), Some(from_number)) = (
            config.account_sid.clone(),
            config.auth_token.clone(),
            config.from_number.clone(),
        ) else {
            return Ok(None);
        };

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| SmsError::Transport(err.to_string()))?;

        Ok(Some(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            account_sid,
            auth_token,
            from_number,
        }))
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        )
    }
}

#[async_trait]
impl SmsGateway for TwilioGateway {
    async fn send(&self, to: &str, body: &str) -> Result<SmsReceipt, SmsError> {
        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", self.from_number.as_str()), ("Body", body)])
            .send()
            .await
            .map_err(|err| SmsError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<ErrorResource>()
                .await
                .ok()
                .and_then(|resource| resource.message)
                .unwrap_or_else(|| status.to_string());
            return Err(SmsError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        let resource = response
            .json::<MessageResource>()
            .await
            .map_err(|err| SmsError::Transport(err.to_string()))?;

        Ok(SmsReceipt {
            message_id: resource.sid,
        })
    }
}

/// Gateway chosen at bootstrap: a live provider or a disabled stub.
#[derive(Debug, Clone)]
pub enum SmsClient {
    Twilio(TwilioGateway),
    Disabled,
}

impl SmsClient {
    pub fn from_config(config: &SmsConfig) -> Result<Self, SmsError> {
        match TwilioGateway::from_config(config)? {
            Some(gateway) => Ok(Self::Twilio(gateway)),
            None => {
                warn!("SMS credentials not configured; SMS notifications are disabled");
                Ok(Self::Disabled)
            }
        }
    }
}

#[async_trait]
impl SmsGateway for SmsClient {
    async fn send(&self, to: &str, body: &str) -> Result<SmsReceipt, SmsError> {
        match self {
            SmsClient::Twilio(gateway) => gateway.send(to, body).await,
            SmsClient::Disabled => Err(SmsError::NotConfigured),
        }
    }
}
