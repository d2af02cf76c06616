use super::domain::{
    Application, ApplicationId, ApplicationStatus, Attachment, BlobRef, Branch, BranchId,
    DocumentType, DocumentTypeId, Notification, ReferenceNumber, User, UserId,
};

/// Durable application rows.
///
/// Implementations must enforce uniqueness of `reference_number` on insert and
/// report violations as [`RepositoryError::Conflict`] naming the field.
pub trait ApplicationRepository: Send + Sync {
    fn insert_application(&self, application: Application) -> Result<(), RepositoryError>;
    fn update_application(&self, application: Application) -> Result<(), RepositoryError>;
    /// Store `qr_code` unless the row already carries one, touching no other field.
    /// Returns the row as stored afterwards.
    fn set_qr_code(
        &self,
        id: &ApplicationId,
        qr_code: BlobRef,
    ) -> Result<Application, RepositoryError>;
    fn application(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError>;
    fn application_by_reference(
        &self,
        reference: &ReferenceNumber,
    ) -> Result<Option<Application>, RepositoryError>;
    /// Newest first; `None` matches every applicant/status.
    fn list_applications(
        &self,
        applicant: Option<&UserId>,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<Application>, RepositoryError>;
}

/// Append-only in-app notifications.
pub trait NotificationRepository: Send + Sync {
    fn insert_notification(&self, notification: Notification) -> Result<(), RepositoryError>;
    /// Newest first.
    fn notifications_for(&self, user: &UserId) -> Result<Vec<Notification>, RepositoryError>;
}

/// Accounts, branches, document types and attachments owned by the wider system.
pub trait DirectoryRepository: Send + Sync {
    fn insert_user(&self, user: User) -> Result<(), RepositoryError>;
    fn update_user(&self, user: User) -> Result<(), RepositoryError>;
    fn user(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
    fn branch(&self, id: &BranchId) -> Result<Option<Branch>, RepositoryError>;
    fn document_type(&self, id: &DocumentTypeId) -> Result<Option<DocumentType>, RepositoryError>;
    fn insert_attachment(&self, attachment: Attachment) -> Result<(), RepositoryError>;
    fn attachments_for(
        &self,
        application: &ApplicationId,
    ) -> Result<Vec<Attachment>, RepositoryError>;
}

/// The full persistence surface the registry service relies on.
pub trait RegistryStore: ApplicationRepository + NotificationRepository + DirectoryRepository {}

impl<T> RegistryStore for T where T: ApplicationRepository + NotificationRepository + DirectoryRepository {}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("unique constraint violated on {field}")]
    Conflict { field: &'static str },
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Binary object storage for QR images and uploaded files.
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `folder/name` and return a retrievable reference.
    fn put(&self, folder: &str, name: &str, bytes: &[u8]) -> Result<BlobRef, BlobError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("invalid blob name '{0}'")]
    InvalidName(String),
    #[error("blob storage failed: {0}")]
    Io(#[from] std::io::Error),
}
