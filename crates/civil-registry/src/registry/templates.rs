//! Human-readable messages for status transitions and account events.

use std::fmt::Write as _;

use super::domain::{ApplicationStatus, Branch};

pub const SIGNATURE: &str = "Civil Registry System";

/// Everything a status message may interpolate.
#[derive(Debug, Clone, Copy)]
pub struct MessageContext<'a> {
    pub reference: &'a str,
    pub document_type: &'a str,
    pub rejection_reason: Option<&'a str>,
    pub branch: Option<&'a Branch>,
    pub qr_reference: Option<&'a str>,
}

/// Rendered in-app notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InAppMessage {
    pub title: String,
    pub message: String,
}

const fn headline(status: ApplicationStatus) -> &'static str {
    match status {
        ApplicationStatus::Submitted => "APPLICATION SUBMITTED",
        ApplicationStatus::Review => "APPLICATION UNDER REVIEW",
        ApplicationStatus::Approved => "APPLICATION APPROVED",
        ApplicationStatus::Printed => "DOCUMENT PRINTED",
        ApplicationStatus::Ready => "READY FOR COLLECTION",
        ApplicationStatus::Collected => "DOCUMENT COLLECTED",
        ApplicationStatus::Rejected => "APPLICATION REJECTED",
    }
}

const fn title(status: ApplicationStatus) -> &'static str {
    match status {
        ApplicationStatus::Submitted => "Application Submitted",
        ApplicationStatus::Review => "Application Under Review",
        ApplicationStatus::Approved => "Application Approved",
        ApplicationStatus::Printed => "Document Printed",
        ApplicationStatus::Ready => "Ready for Collection",
        ApplicationStatus::Collected => "Document Collected",
        ApplicationStatus::Rejected => "Application Rejected",
    }
}

fn summary(status: ApplicationStatus, rejection_reason: Option<&str>) -> String {
    match status {
        ApplicationStatus::Submitted => {
            "Your application has been received and is under review.".to_string()
        }
        ApplicationStatus::Review => {
            "Your application is currently being reviewed by our team.".to_string()
        }
        ApplicationStatus::Approved => {
            "Great news! Your application has been approved and will be processed.".to_string()
        }
        ApplicationStatus::Printed => {
            "Your document has been printed and is being processed.".to_string()
        }
        ApplicationStatus::Ready => {
            "Your document is ready! Please visit the branch to collect it.".to_string()
        }
        ApplicationStatus::Collected => {
            "Your document has been successfully collected.".to_string()
        }
        ApplicationStatus::Rejected => match rejection_reason.map(str::trim) {
            Some(reason) if !reason.is_empty() => format!(
                "Unfortunately, your application has been rejected. Reason: {reason}. \
                 Please contact us for more information."
            ),
            _ => "Unfortunately, your application has been rejected. \
                  Please contact us for more information."
                .to_string(),
        },
    }
}

fn details(out: &mut String, ctx: &MessageContext<'_>, status_text: &str) {
    let _ = write!(
        out,
        "Ref: {}\nDocument: {}\nStatus: {}",
        ctx.reference, ctx.document_type, status_text
    );
}

fn branch_block(out: &mut String, branch: Option<&Branch>) {
    let Some(branch) = branch else {
        return;
    };
    let _ = write!(out, "\nBranch: {}", branch.name);
    if !branch.address.trim().is_empty() {
        let _ = write!(out, "\nLocation: {}", branch.address);
    }
    if let Some(contact) = branch.contact() {
        let _ = write!(out, "\nContact: {contact}");
    }
}

fn sign(out: &mut String, ctx: &MessageContext<'_>) {
    if let Some(qr) = ctx.qr_reference {
        let _ = write!(out, "\n\nQR Code: {qr}");
    }
    let _ = write!(out, "\n\n{SIGNATURE}");
}

/// In-app notification for a transition into `status`.
pub fn in_app(status: ApplicationStatus, ctx: &MessageContext<'_>) -> InAppMessage {
    let mut message = String::new();
    details(&mut message, ctx, status.label());
    let _ = write!(
        message,
        "\n\n{}",
        summary(status, ctx.rejection_reason)
    );

    InAppMessage {
        title: title(status).to_string(),
        message,
    }
}

/// SMS body for a transition into `status`.
pub fn sms(status: ApplicationStatus, ctx: &MessageContext<'_>) -> String {
    let mut body = String::new();
    let _ = write!(body, "{}\n\n", headline(status));
    details(&mut body, ctx, status.label());
    branch_block(&mut body, ctx.branch);
    let _ = write!(body, "\n\n{}", summary(status, ctx.rejection_reason));
    sign(&mut body, ctx);
    body
}

/// SMS sent right after a citizen submits, which also promises follow-ups.
pub fn submission_sms(ctx: &MessageContext<'_>) -> String {
    let mut body = String::new();
    let _ = write!(
        body,
        "{}\n\n",
        headline(ApplicationStatus::Submitted)
    );
    details(&mut body, ctx, "Submitted for Review");
    branch_block(&mut body, ctx.branch);
    body.push_str(
        "\n\nYour application has been successfully submitted and is now under review. \
         You will receive updates via SMS as the status changes.",
    );
    sign(&mut body, ctx);
    body
}

/// SMS for a raw status label; labels outside the known set get a generic update.
pub fn compose_for_label(label: &str, ctx: &MessageContext<'_>) -> String {
    match label.parse::<ApplicationStatus>() {
        Ok(status) => sms(status, ctx),
        Err(_) => {
            let mut body = String::from("APPLICATION UPDATE\n\n");
            details(&mut body, ctx, label.trim());
            branch_block(&mut body, ctx.branch);
            body.push_str("\n\nYour application status has been updated.");
            sign(&mut body, ctx);
            body
        }
    }
}

/// In-app greeting and SMS for a newly registered account.
pub fn welcome(display_name: &str) -> (InAppMessage, String) {
    let in_app = InAppMessage {
        title: "Welcome to the Civil Registry".to_string(),
        message: format!(
            "Hello {display_name}, your account is ready. You can now submit applications \
             for civil documents and track them with your reference number."
        ),
    };
    let sms = format!(
        "Welcome to {SIGNATURE}, {display_name}! You can now submit applications for \
         various documents. Visit our website to get started."
    );
    (in_app, sms)
}
