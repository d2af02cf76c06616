use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_id!(
    /// Identifier for a submitted document application.
    ApplicationId
);
uuid_id!(UserId);
uuid_id!(BranchId);
uuid_id!(DocumentTypeId);
uuid_id!(NotificationId);
uuid_id!(AttachmentId);

/// Public tracking code in the form `XX-XXXXXXXXXX`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceNumber(pub String);

impl ReferenceNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReferenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Processing stage of an application.
///
/// Transitions are not restricted: staff may move an application from any
/// status to any other, including back out of `Collected` or `Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Submitted,
    Review,
    Approved,
    Printed,
    Ready,
    Collected,
    Rejected,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 7] = [
        ApplicationStatus::Submitted,
        ApplicationStatus::Review,
        ApplicationStatus::Approved,
        ApplicationStatus::Printed,
        ApplicationStatus::Ready,
        ApplicationStatus::Collected,
        ApplicationStatus::Rejected,
    ];

    pub const fn slug(self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::Review => "review",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Printed => "printed",
            ApplicationStatus::Ready => "ready",
            ApplicationStatus::Collected => "collected",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "Submitted",
            ApplicationStatus::Review => "Under Review",
            ApplicationStatus::Approved => "Approved",
            ApplicationStatus::Printed => "Printed",
            ApplicationStatus::Ready => "Ready for Collection",
            ApplicationStatus::Collected => "Collected",
            ApplicationStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown application status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for ApplicationStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.slug() == normalized)
            .ok_or_else(|| UnknownStatus(value.to_string()))
    }
}

/// Handle to a stored binary object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRef {
    pub key: String,
    pub url: String,
}

impl fmt::Display for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub reference_number: ReferenceNumber,
    pub applicant: UserId,
    pub document_type: DocumentTypeId,
    pub branch: BranchId,
    pub status: ApplicationStatus,
    pub rejection_reason: Option<String>,
    pub qr_code: Option<BlobRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub is_staff: bool,
    pub sms_notifications_enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Name shown to staff and on tracking pages.
    pub fn display_name(&self) -> &str {
        match self.full_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => &self.username,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: BranchId,
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
}

impl Branch {
    pub fn contact(&self) -> Option<&str> {
        self.phone.as_deref().or(self.email.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentType {
    pub id: DocumentTypeId,
    pub name: String,
    pub description: String,
    pub processing_days: u32,
    /// Fee in minor currency units.
    pub fee: u64,
    pub requirements: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    StatusUpdate,
    ApplicationApproved,
    ApplicationRejected,
    ApplicationReady,
    System,
}

impl NotificationKind {
    pub const fn for_status(status: ApplicationStatus) -> Self {
        match status {
            ApplicationStatus::Approved => NotificationKind::ApplicationApproved,
            ApplicationStatus::Rejected => NotificationKind::ApplicationRejected,
            ApplicationStatus::Ready => NotificationKind::ApplicationReady,
            ApplicationStatus::Submitted
            | ApplicationStatus::Review
            | ApplicationStatus::Printed
            | ApplicationStatus::Collected => NotificationKind::StatusUpdate,
        }
    }
}

/// In-app message delivered to one user. Written once, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient: UserId,
    pub application: Option<ApplicationId>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: AttachmentId,
    pub application: ApplicationId,
    pub file: BlobRef,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub description: String,
    pub uploaded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_slugs_case_insensitively() {
        assert_eq!(
            " Review ".parse::<ApplicationStatus>(),
            Ok(ApplicationStatus::Review)
        );
        for status in ApplicationStatus::ALL {
            assert_eq!(status.slug().parse::<ApplicationStatus>(), Ok(status));
        }
        assert_eq!(
            "archived".parse::<ApplicationStatus>(),
            Err(UnknownStatus("archived".to_string()))
        );
    }

    #[test]
    fn status_serializes_as_slug() {
        let json = serde_json::to_string(&ApplicationStatus::Ready).expect("serializes");
        assert_eq!(json, "\"ready\"");
        assert_eq!(ApplicationStatus::Ready.label(), "Ready for Collection");
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let mut user = User {
            id: UserId::new(),
            username: "tmoyo".to_string(),
            email: "t@example.org".to_string(),
            full_name: Some("  ".to_string()),
            phone_number: None,
            is_staff: false,
            sms_notifications_enabled: true,
            created_at: Utc::now(),
        };
        assert_eq!(user.display_name(), "tmoyo");
        user.full_name = Some("Tendai Moyo".to_string());
        assert_eq!(user.display_name(), "Tendai Moyo");
    }
}
