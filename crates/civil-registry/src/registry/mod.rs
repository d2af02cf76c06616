//! Document applications for the civil registry.
//!
//! Citizens submit applications for civil documents and follow them with a
//! public reference number. Staff move applications through the review
//! pipeline; every status change produces an in-app notification and a
//! best-effort SMS.

pub mod attachments;
pub mod dispatcher;
pub mod domain;
pub mod memory;
pub mod phone;
pub mod qr;
pub mod reference;
pub mod repository;
pub mod router;
pub mod service;
pub mod sms;
pub mod storage;
pub mod templates;
pub mod tracking;

#[cfg(test)]
mod tests;

pub use dispatcher::{ChannelOutcome, DeliveryError, DispatchReport, NotificationDispatcher, SkipReason};
pub use domain::{
    Application, ApplicationId, ApplicationStatus, Attachment, AttachmentId, BlobRef, Branch,
    BranchId, DocumentType, DocumentTypeId, Notification, NotificationId, NotificationKind,
    ReferenceNumber, User, UserId,
};
pub use memory::InMemoryRegistryStore;
pub use reference::ReferenceGenerator;
pub use repository::{
    ApplicationRepository, BlobError, BlobStore, DirectoryRepository, NotificationRepository,
    RegistryStore, RepositoryError,
};
pub use router::registry_router;
pub use service::{
    NewApplication, NewUser, Registration, RegistryService, ServiceError, StatusChange,
    StatusUpdate, Submission,
};
pub use sms::{SmsClient, SmsError, SmsGateway, SmsReceipt, TwilioGateway};
pub use storage::LocalBlobStore;
pub use tracking::TrackingView;
