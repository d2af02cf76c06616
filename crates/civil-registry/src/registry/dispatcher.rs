use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{
    Application, ApplicationStatus, Branch, DocumentType, Notification, NotificationId,
    NotificationKind, User,
};
use super::phone;
use super::repository::NotificationRepository;
use super::sms::{SmsError, SmsGateway};
use super::templates::{self, InAppMessage, MessageContext};

/// Why a channel was not attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoPhoneNumber,
    OptedOut,
}

/// Non-fatal delivery failure. Only ever reported, never propagated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DeliveryError {
    #[error("invalid phone number: {0}")]
    InvalidPhoneNumber(String),
    #[error("SMS gateway is not configured")]
    NotConfigured,
    #[error("gateway error: {0}")]
    Gateway(String),
    #[error("gateway did not answer within {seconds}s")]
    TimedOut { seconds: u64 },
    #[error("notification could not be stored: {0}")]
    Storage(String),
}

impl From<SmsError> for DeliveryError {
    fn from(value: SmsError) -> Self {
        match value {
            SmsError::NotConfigured => DeliveryError::NotConfigured,
            other => DeliveryError::Gateway(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ChannelOutcome {
    Delivered { reference: String },
    Skipped { reason: SkipReason },
    Failed { error: DeliveryError },
}

impl ChannelOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, ChannelOutcome::Delivered { .. })
    }
}

/// Per-channel result of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub in_app: ChannelOutcome,
    pub sms: ChannelOutcome,
}

/// Which SMS wording to use for a status notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Submission,
    Transition,
}

/// Application plus the lookups its messages interpolate.
#[derive(Debug, Clone, Copy)]
pub struct StatusNotice<'a> {
    pub application: &'a Application,
    pub document_type: &'a DocumentType,
    pub branch: Option<&'a Branch>,
}

impl<'a> StatusNotice<'a> {
    fn context(&self) -> MessageContext<'a> {
        MessageContext {
            reference: self.application.reference_number.as_str(),
            document_type: &self.document_type.name,
            rejection_reason: self.application.rejection_reason.as_deref(),
            branch: self.branch,
            qr_reference: self.application.qr_code.as_ref().map(|qr| qr.url.as_str()),
        }
    }
}

/// Writes in-app notifications and sends best-effort SMS for registry events.
pub struct NotificationDispatcher<N, S> {
    notifications: Arc<N>,
    sms: Arc<S>,
    sms_timeout: Duration,
    country_code: String,
}

impl<N, S> NotificationDispatcher<N, S>
where
    N: NotificationRepository + 'static,
    S: SmsGateway + 'static,
{
    pub fn new(
        notifications: Arc<N>,
        sms: Arc<S>,
        sms_timeout: Duration,
        country_code: impl Into<String>,
    ) -> Self {
        Self {
            notifications,
            sms,
            sms_timeout,
            country_code: country_code.into(),
        }
    }

    /// Notify `user` that the application is now in its current status.
    pub async fn dispatch_status(
        &self,
        user: &User,
        notice: StatusNotice<'_>,
        kind: NoticeKind,
    ) -> DispatchReport {
        let status = notice.application.status;
        let ctx = notice.context();

        let in_app = self.record(
            user,
            Some(notice.application),
            NotificationKind::for_status(status),
            templates::in_app(status, &ctx),
        );

        let body = match (kind, status) {
            (NoticeKind::Submission, ApplicationStatus::Submitted) => templates::submission_sms(&ctx),
            _ => templates::sms(status, &ctx),
        };
        let sms = self.send_sms(user, &body).await;

        info!(
            application = %notice.application.id,
            reference = %notice.application.reference_number,
            status = %status,
            in_app = in_app.is_delivered(),
            sms = sms.is_delivered(),
            "status notification dispatched"
        );

        DispatchReport { in_app, sms }
    }

    /// Greeting for a freshly registered account.
    pub async fn dispatch_welcome(&self, user: &User) -> DispatchReport {
        let (message, body) = templates::welcome(user.display_name());
        let in_app = self.record(user, None, NotificationKind::System, message);
        let sms = self.send_sms(user, &body).await;
        DispatchReport { in_app, sms }
    }

    fn record(
        &self,
        user: &User,
        application: Option<&Application>,
        kind: NotificationKind,
        message: InAppMessage,
    ) -> ChannelOutcome {
        let notification = Notification {
            id: NotificationId::new(),
            recipient: user.id,
            application: application.map(|application| application.id),
            kind,
            title: message.title,
            message: message.message,
            created_at: Utc::now(),
        };
        let id = notification.id;

        match self.notifications.insert_notification(notification) {
            Ok(()) => ChannelOutcome::Delivered {
                reference: id.to_string(),
            },
            Err(err) => {
                warn!(recipient = %user.id, channel = "in_app", reason = %err, "notification not stored");
                ChannelOutcome::Failed {
                    error: DeliveryError::Storage(err.to_string()),
                }
            }
        }
    }

    async fn send_sms(&self, user: &User, body: &str) -> ChannelOutcome {
        let Some(raw) = user.phone_number.as_deref().filter(|raw| !raw.trim().is_empty()) else {
            return ChannelOutcome::Skipped {
                reason: SkipReason::NoPhoneNumber,
            };
        };
        if !user.sms_notifications_enabled {
            return ChannelOutcome::Skipped {
                reason: SkipReason::OptedOut,
            };
        }

        let destination = match phone::normalize(raw, &self.country_code) {
            Ok(number) => number,
            Err(err) => {
                warn!(recipient = %user.id, channel = "sms", reason = %err, "sms not sent");
                return ChannelOutcome::Failed {
                    error: DeliveryError::InvalidPhoneNumber(err.to_string()),
                };
            }
        };

        let error = match tokio::time::timeout(self.sms_timeout, self.sms.send(&destination, body))
            .await
        {
            Ok(Ok(receipt)) => {
                info!(recipient = %user.id, to = %destination, message_id = %receipt.message_id, "sms sent");
                return ChannelOutcome::Delivered {
                    reference: receipt.message_id,
                };
            }
            Ok(Err(err)) => DeliveryError::from(err),
            Err(_) => DeliveryError::TimedOut {
                seconds: self.sms_timeout.as_secs(),
            },
        };

        warn!(recipient = %user.id, to = %destination, channel = "sms", reason = %error, "sms delivery failed");
        ChannelOutcome::Failed { error }
    }
}
