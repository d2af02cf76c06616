use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::attachments::{self, AttachmentError, AttachmentUpload, ATTACHMENT_FOLDER};
use super::dispatcher::{DispatchReport, NoticeKind, NotificationDispatcher, StatusNotice};
use super::domain::{
    Application, ApplicationId, ApplicationStatus, Attachment, AttachmentId, Branch, BranchId,
    DocumentType, DocumentTypeId, Notification, ReferenceNumber, User, UserId,
};
use super::phone;
use super::qr::{self, QrError};
use super::reference::ReferenceGenerator;
use super::repository::{BlobError, BlobStore, RegistryStore, RepositoryError};
use super::sms::SmsGateway;
use super::tracking::{self, TrackingView};
use crate::config::{RegistryConfig, SmsConfig};

const QR_FOLDER: &str = "qr_codes";

/// Citizen request to open a new application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewApplication {
    pub document_type: DocumentTypeId,
    pub branch: BranchId,
}

/// Staff request to move an application to another status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: ApplicationStatus,
    pub rejection_reason: Option<String>,
}

/// Account details handed over by the auth layer at sign-up.
///
/// Self-registered accounts are never staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub application: Application,
    pub dispatch: DispatchReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusChange {
    pub application: Application,
    pub previous: ApplicationStatus,
    pub changed: bool,
    /// `None` when nothing changed or the recipient could not be loaded.
    pub dispatch: Option<DispatchReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub user: User,
    pub dispatch: DispatchReport,
}

/// Application lifecycle engine: creation, status transitions and their side effects.
pub struct RegistryService<R, B, S> {
    store: Arc<R>,
    blobs: Arc<B>,
    dispatcher: NotificationDispatcher<R, S>,
    references: ReferenceGenerator,
    settings: RegistryConfig,
    country_code: String,
}

impl<R, B, S> RegistryService<R, B, S>
where
    R: RegistryStore + 'static,
    B: BlobStore + 'static,
    S: SmsGateway + 'static,
{
    pub fn new(
        store: Arc<R>,
        blobs: Arc<B>,
        sms: Arc<S>,
        sms_config: &SmsConfig,
        settings: RegistryConfig,
    ) -> Self {
        let dispatcher = NotificationDispatcher::new(
            store.clone(),
            sms,
            sms_config.timeout,
            sms_config.default_country_code.clone(),
        );

        Self {
            store,
            blobs,
            dispatcher,
            references: ReferenceGenerator,
            settings,
            country_code: sms_config.default_country_code.clone(),
        }
    }

    pub fn settings(&self) -> &RegistryConfig {
        &self.settings
    }

    pub fn application(&self, id: &ApplicationId) -> Result<Application, ServiceError> {
        self.store
            .application(id)?
            .ok_or(ServiceError::NotFound("application"))
    }

    /// Open a new application for `applicant` in status `submitted`.
    pub async fn create_application(
        &self,
        applicant: &UserId,
        request: NewApplication,
    ) -> Result<Submission, ServiceError> {
        let user = self.store.user(applicant)?.ok_or(ServiceError::NotFound("user"))?;
        let document_type = self
            .store
            .document_type(&request.document_type)?
            .filter(|document_type| document_type.is_active)
            .ok_or_else(|| ServiceError::Validation("invalid document_type".to_string()))?;
        let branch = self
            .store
            .branch(&request.branch)?
            .filter(|branch| branch.is_active)
            .ok_or_else(|| ServiceError::Validation("invalid branch".to_string()))?;

        let application = self.insert_with_unique_reference(&user, &request)?;

        let application = match self.attach_qr(application.clone()) {
            Ok(application) => application,
            Err(err @ (ServiceError::Qr(_) | ServiceError::Storage(_))) => {
                warn!(
                    application = %application.id,
                    reference = %application.reference_number,
                    reason = %err,
                    "QR code not generated; continuing without it"
                );
                application
            }
            Err(err) => return Err(err),
        };

        info!(
            application = %application.id,
            reference = %application.reference_number,
            applicant = %user.id,
            "application submitted"
        );

        let notice = StatusNotice {
            application: &application,
            document_type: &document_type,
            branch: Some(&branch),
        };
        let dispatch = self
            .dispatcher
            .dispatch_status(&user, notice, NoticeKind::Submission)
            .await;

        Ok(Submission {
            application,
            dispatch,
        })
    }

    fn insert_with_unique_reference(
        &self,
        user: &User,
        request: &NewApplication,
    ) -> Result<Application, ServiceError> {
        let id = ApplicationId::new();
        let attempts = self.settings.reference_attempts;

        for attempt in 1..=attempts {
            let now = Utc::now();
            let application = Application {
                id,
                reference_number: self.references.generate(user.full_name.as_deref()),
                applicant: user.id,
                document_type: request.document_type,
                branch: request.branch,
                status: ApplicationStatus::Submitted,
                rejection_reason: None,
                qr_code: None,
                created_at: now,
                updated_at: now,
            };

            match self.store.insert_application(application.clone()) {
                Ok(()) => return Ok(application),
                Err(RepositoryError::Conflict {
                    field: "reference_number",
                }) => {
                    warn!(
                        attempt,
                        reference = %application.reference_number,
                        "reference number collision; regenerating"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(ServiceError::ReferenceExhausted { attempts })
    }

    /// Generate and store the QR artifact unless the record already has one.
    pub fn ensure_qr_code(&self, id: &ApplicationId) -> Result<Application, ServiceError> {
        let application = self.application(id)?;
        self.attach_qr(application)
    }

    fn attach_qr(&self, application: Application) -> Result<Application, ServiceError> {
        if application.qr_code.is_some() {
            return Ok(application);
        }

        let artifact = qr::encode(&application.reference_number)?;
        let blob = self
            .blobs
            .put(QR_FOLDER, &artifact.file_name, &artifact.bytes)?;
        Ok(self.store.set_qr_code(&application.id, blob)?)
    }

    /// Move an application to `update.status`, notifying the applicant on change.
    pub async fn update_status(
        &self,
        id: &ApplicationId,
        update: StatusUpdate,
    ) -> Result<StatusChange, ServiceError> {
        let mut application = self.application(id)?;
        let previous = application.status;

        if previous == update.status {
            return Ok(StatusChange {
                application,
                previous,
                changed: false,
                dispatch: None,
            });
        }

        application.status = update.status;
        application.rejection_reason = match update.status {
            ApplicationStatus::Rejected => update
                .rejection_reason
                .map(|reason| reason.trim().to_string())
                .filter(|reason| !reason.is_empty()),
            _ => None,
        };
        application.updated_at = Utc::now();
        self.store.update_application(application.clone())?;

        info!(
            application = %application.id,
            reference = %application.reference_number,
            from = %previous,
            to = %application.status,
            "application status changed"
        );

        let dispatch = self.notify_transition(&application).await;

        Ok(StatusChange {
            application,
            previous,
            changed: true,
            dispatch,
        })
    }

    async fn notify_transition(&self, application: &Application) -> Option<DispatchReport> {
        let (user, document_type, branch) = match self.recipient_context(application) {
            Ok(Some(found)) => found,
            Ok(None) => {
                warn!(application = %application.id, "notification skipped: applicant or document type missing");
                return None;
            }
            Err(err) => {
                warn!(application = %application.id, reason = %err, "notification skipped: lookup failed");
                return None;
            }
        };

        let notice = StatusNotice {
            application,
            document_type: &document_type,
            branch: branch.as_ref(),
        };
        Some(
            self.dispatcher
                .dispatch_status(&user, notice, NoticeKind::Transition)
                .await,
        )
    }

    fn recipient_context(
        &self,
        application: &Application,
    ) -> Result<Option<(User, DocumentType, Option<Branch>)>, RepositoryError> {
        let Some(user) = self.store.user(&application.applicant)? else {
            return Ok(None);
        };
        let Some(document_type) = self.store.document_type(&application.document_type)? else {
            return Ok(None);
        };
        let branch = self.store.branch(&application.branch)?;
        Ok(Some((user, document_type, branch)))
    }

    /// Public lookup by reference code. Unknown codes yield `Ok(None)`.
    pub fn track(&self, raw_reference: &str) -> Result<Option<TrackingView>, ServiceError> {
        let reference = tracking::normalize_reference(raw_reference)
            .ok_or_else(|| ServiceError::Validation("Reference number is required.".to_string()))?;

        let Some(application) = self
            .store
            .application_by_reference(&ReferenceNumber(reference))?
        else {
            return Ok(None);
        };

        let applicant = self
            .store
            .user(&application.applicant)?
            .ok_or(ServiceError::NotFound("user"))?;
        let document_type = self
            .store
            .document_type(&application.document_type)?
            .ok_or(ServiceError::NotFound("document type"))?;
        let branch = self
            .store
            .branch(&application.branch)?
            .ok_or(ServiceError::NotFound("branch"))?;
        let attachments = self.store.attachments_for(&application.id)?;

        Ok(Some(TrackingView::new(
            &application,
            &applicant,
            &document_type,
            &branch,
            &attachments,
        )))
    }

    /// In-app notifications for `user`, newest first.
    pub fn list_notifications(&self, user: &UserId) -> Result<Vec<Notification>, ServiceError> {
        let mut notifications = self.store.notifications_for(user)?;
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    /// The applicant's own applications, newest first.
    pub fn applications_for(&self, applicant: &UserId) -> Result<Vec<Application>, ServiceError> {
        Ok(self.store.list_applications(Some(applicant), None)?)
    }

    /// Staff queue, optionally narrowed to one status.
    pub fn applications(
        &self,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<Application>, ServiceError> {
        Ok(self.store.list_applications(None, status)?)
    }

    pub fn user(&self, id: &UserId) -> Result<User, ServiceError> {
        self.store.user(id)?.ok_or(ServiceError::NotFound("user"))
    }

    /// Create an account and greet it in-app and by SMS.
    pub async fn register_user(&self, request: NewUser) -> Result<Registration, ServiceError> {
        let username = request.username.trim().to_string();
        let email = request.email.trim().to_ascii_lowercase();
        if username.is_empty() {
            return Err(ServiceError::Validation("username is required".to_string()));
        }
        if email.is_empty() || !email.contains('@') {
            return Err(ServiceError::Validation("a valid email is required".to_string()));
        }

        let phone_number = match request
            .phone_number
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
        {
            Some(raw) => Some(
                phone::normalize(raw, &self.country_code)
                    .map_err(|err| ServiceError::Validation(err.to_string()))?,
            ),
            None => None,
        };

        let user = User {
            id: UserId::new(),
            username,
            email,
            full_name: request
                .full_name
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
            phone_number,
            is_staff: false,
            sms_notifications_enabled: true,
            created_at: Utc::now(),
        };

        match self.store.insert_user(user.clone()) {
            Ok(()) => {}
            Err(RepositoryError::Conflict { field }) => {
                return Err(ServiceError::Conflict(format!("this {field} is already taken")));
            }
            Err(err) => return Err(err.into()),
        }

        info!(user = %user.id, "account registered");
        let dispatch = self.dispatcher.dispatch_welcome(&user).await;
        Ok(Registration { user, dispatch })
    }

    pub fn set_sms_notifications(
        &self,
        user: &UserId,
        enabled: bool,
    ) -> Result<User, ServiceError> {
        let mut account = self.user(user)?;
        account.sms_notifications_enabled = enabled;
        self.store.update_user(account.clone())?;
        Ok(account)
    }

    /// Validate and store a supporting document for an application.
    pub fn add_attachment(
        &self,
        application: &ApplicationId,
        upload: AttachmentUpload,
    ) -> Result<Attachment, ServiceError> {
        let application = self.application(application)?;

        let validated = attachments::validate(&upload, self.settings.max_upload_bytes)?;
        let file = self
            .blobs
            .put(ATTACHMENT_FOLDER, &validated.stored_name, &upload.bytes)?;

        let attachment = Attachment {
            id: AttachmentId::new(),
            application: application.id,
            file,
            file_name: upload.file_name.trim().to_string(),
            content_type: validated.content_type.to_string(),
            size_bytes: upload.bytes.len() as u64,
            description: upload.description.trim().to_string(),
            uploaded_at: Utc::now(),
        };
        self.store.insert_attachment(attachment.clone())?;
        Ok(attachment)
    }
}

/// Error raised by the registry service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("no unique reference number after {attempts} attempts")]
    ReferenceExhausted { attempts: u32 },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Storage(#[from] BlobError),
    #[error(transparent)]
    Qr(#[from] QrError),
}

impl From<AttachmentError> for ServiceError {
    fn from(value: AttachmentError) -> Self {
        ServiceError::Validation(value.to_string())
    }
}
