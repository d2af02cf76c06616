use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{Application, ApplicationStatus, Attachment, Branch, DocumentType, User};

/// Public projection of an application, safe to show to anyone holding its reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackingView {
    pub reference_number: String,
    pub applicant: String,
    pub document_type: DocumentTypeSummary,
    pub status: ApplicationStatus,
    pub status_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub branch: BranchSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub qr_code: Option<String>,
    pub attachments: Vec<AttachmentSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentTypeSummary {
    pub name: String,
    pub description: String,
    pub processing_days: u32,
    pub fee: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchSummary {
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentSummary {
    pub description: String,
    pub file_name: String,
    pub url: String,
}

impl TrackingView {
    pub fn new(
        application: &Application,
        applicant: &User,
        document_type: &DocumentType,
        branch: &Branch,
        attachments: &[Attachment],
    ) -> Self {
        Self {
            reference_number: application.reference_number.to_string(),
            applicant: applicant.display_name().to_string(),
            document_type: DocumentTypeSummary {
                name: document_type.name.clone(),
                description: document_type.description.clone(),
                processing_days: document_type.processing_days,
                fee: document_type.fee,
            },
            status: application.status,
            status_label: application.status.label(),
            rejection_reason: match application.status {
                ApplicationStatus::Rejected => application.rejection_reason.clone(),
                _ => None,
            },
            branch: BranchSummary {
                name: branch.name.clone(),
                address: branch.address.clone(),
                phone: branch.phone.clone(),
                email: branch.email.clone(),
            },
            created_at: application.created_at,
            updated_at: application.updated_at,
            qr_code: application.qr_code.as_ref().map(|qr| qr.url.clone()),
            attachments: attachments
                .iter()
                .map(|attachment| AttachmentSummary {
                    description: attachment.description.clone(),
                    file_name: attachment.file_name.clone(),
                    url: attachment.file.url.clone(),
                })
                .collect(),
        }
    }
}

/// Canonical form of a user-typed reference code; `None` when blank.
pub fn normalize_reference(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_ascii_uppercase())
    }
}
