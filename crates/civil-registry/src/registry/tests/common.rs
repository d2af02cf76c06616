use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::Utc;
use serde_json::Value;

use crate::config::{RegistryConfig, SmsConfig};
use crate::registry::domain::{
    Application, ApplicationId, ApplicationStatus, Attachment, BlobRef, Branch, BranchId,
    DocumentType, DocumentTypeId, Notification, ReferenceNumber, User, UserId,
};
use crate::registry::memory::InMemoryRegistryStore;
use crate::registry::repository::{
    ApplicationRepository, BlobError, BlobStore, DirectoryRepository, NotificationRepository,
    RepositoryError,
};
use crate::registry::service::RegistryService;
use crate::registry::sms::{SmsError, SmsGateway, SmsReceipt};

pub(super) const SMS_TIMEOUT: Duration = Duration::from_millis(100);

pub(super) fn sms_config() -> SmsConfig {
    SmsConfig {
        timeout: SMS_TIMEOUT,
        ..SmsConfig::default()
    }
}

pub(super) fn registry_config() -> RegistryConfig {
    RegistryConfig {
        reference_attempts: 3,
        max_upload_bytes: 1024,
    }
}

pub(super) struct Fixture {
    pub(super) applicant: User,
    pub(super) staff: User,
    pub(super) document_type: DocumentType,
    pub(super) branch: Branch,
}

pub(super) fn user(full_name: &str, phone_number: Option<&str>) -> User {
    let username = full_name.to_ascii_lowercase().replace(' ', ".");
    User {
        id: UserId::new(),
        email: format!("{username}@example.org"),
        username,
        full_name: Some(full_name.to_string()),
        phone_number: phone_number.map(str::to_string),
        is_staff: false,
        sms_notifications_enabled: true,
        created_at: Utc::now(),
    }
}

pub(super) fn seed(store: &InMemoryRegistryStore) -> Fixture {
    let applicant = user("Jane Doe", Some("+263772123456"));
    let mut staff = user("Tendai Moyo", None);
    staff.is_staff = true;

    let document_type = DocumentType {
        id: DocumentTypeId::new(),
        name: "Birth Certificate".to_string(),
        description: "Full birth certificate".to_string(),
        processing_days: 14,
        fee: 2000,
        requirements: "Hospital record, parent IDs".to_string(),
        is_active: true,
    };
    let branch = Branch {
        id: BranchId::new(),
        name: "Harare Central".to_string(),
        address: "Makombe Building, Harare".to_string(),
        phone: Some("+263242791000".to_string()),
        email: None,
        is_active: true,
    };

    store.insert_user(applicant.clone()).expect("seed applicant");
    store.insert_user(staff.clone()).expect("seed staff");
    store
        .add_document_type(document_type.clone())
        .expect("seed document type");
    store.add_branch(branch.clone()).expect("seed branch");

    Fixture {
        applicant,
        staff,
        document_type,
        branch,
    }
}

pub(super) type TestService = RegistryService<InMemoryRegistryStore, MemoryBlobs, RecordingSms>;

pub(super) fn build_service() -> (
    TestService,
    Arc<InMemoryRegistryStore>,
    Arc<MemoryBlobs>,
    Arc<RecordingSms>,
    Fixture,
) {
    let store = Arc::new(InMemoryRegistryStore::default());
    let blobs = Arc::new(MemoryBlobs::default());
    let sms = Arc::new(RecordingSms::default());
    let fixture = seed(&store);
    let service = RegistryService::new(
        store.clone(),
        blobs.clone(),
        sms.clone(),
        &sms_config(),
        registry_config(),
    );
    (service, store, blobs, sms, fixture)
}

pub(super) fn build_service_with<B, S>(
    store: Arc<InMemoryRegistryStore>,
    blobs: Arc<B>,
    sms: Arc<S>,
) -> RegistryService<InMemoryRegistryStore, B, S>
where
    B: BlobStore + 'static,
    S: SmsGateway + 'static,
{
    RegistryService::new(store, blobs, sms, &sms_config(), registry_config())
}

#[derive(Default)]
pub(super) struct MemoryBlobs {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    puts: AtomicU32,
}

impl MemoryBlobs {
    pub(super) fn puts(&self) -> u32 {
        self.puts.load(Ordering::SeqCst)
    }

    pub(super) fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().expect("blob mutex poisoned").get(key).cloned()
    }
}

impl BlobStore for MemoryBlobs {
    fn put(&self, folder: &str, name: &str, bytes: &[u8]) -> Result<BlobRef, BlobError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        let key = format!("{folder}/{name}");
        self.objects
            .lock()
            .expect("blob mutex poisoned")
            .insert(key.clone(), bytes.to_vec());
        Ok(BlobRef {
            url: format!("https://media.registry.test/{key}"),
            key,
        })
    }
}

/// Approves `application` in the store while the QR image is being written.
pub(super) struct ApprovingBlobs {
    pub(super) store: Arc<InMemoryRegistryStore>,
    pub(super) application: ApplicationId,
    pub(super) inner: MemoryBlobs,
}

impl BlobStore for ApprovingBlobs {
    fn put(&self, folder: &str, name: &str, bytes: &[u8]) -> Result<BlobRef, BlobError> {
        let mut row = self
            .store
            .application(&self.application)
            .expect("lookup")
            .expect("application stored");
        row.status = ApplicationStatus::Approved;
        self.store.update_application(row).expect("approved");
        self.inner.put(folder, name, bytes)
    }
}

pub(super) struct FailingBlobs;

impl BlobStore for FailingBlobs {
    fn put(&self, _folder: &str, _name: &str, _bytes: &[u8]) -> Result<BlobRef, BlobError> {
        Err(BlobError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        )))
    }
}

#[derive(Default)]
pub(super) struct RecordingSms {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingSms {
    pub(super) fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("sms mutex poisoned").clone()
    }
}

#[async_trait]
impl SmsGateway for RecordingSms {
    async fn send(&self, to: &str, body: &str) -> Result<SmsReceipt, SmsError> {
        let mut sent = self.sent.lock().expect("sms mutex poisoned");
        sent.push((to.to_string(), body.to_string()));
        Ok(SmsReceipt {
            message_id: format!("SM{:04}", sent.len()),
        })
    }
}

pub(super) struct UnreachableSms;

#[async_trait]
impl SmsGateway for UnreachableSms {
    async fn send(&self, _to: &str, _body: &str) -> Result<SmsReceipt, SmsError> {
        Err(SmsError::Transport("connection refused".to_string()))
    }
}

pub(super) struct StalledSms;

#[async_trait]
impl SmsGateway for StalledSms {
    async fn send(&self, _to: &str, _body: &str) -> Result<SmsReceipt, SmsError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(SmsReceipt {
            message_id: "never".to_string(),
        })
    }
}

/// Reports a reference-number collision for the first `collisions` inserts.
pub(super) struct CollidingStore {
    pub(super) inner: InMemoryRegistryStore,
    collisions: AtomicU32,
    pub(super) attempts: AtomicU32,
}

impl CollidingStore {
    pub(super) fn new(inner: InMemoryRegistryStore, collisions: u32) -> Self {
        Self {
            inner,
            collisions: AtomicU32::new(collisions),
            attempts: AtomicU32::new(0),
        }
    }
}

impl ApplicationRepository for CollidingStore {
    fn insert_application(&self, application: Application) -> Result<(), RepositoryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.collisions.load(Ordering::SeqCst);
        if remaining > 0 {
            self.collisions.store(remaining - 1, Ordering::SeqCst);
            return Err(RepositoryError::Conflict {
                field: "reference_number",
            });
        }
        self.inner.insert_application(application)
    }

    fn update_application(&self, application: Application) -> Result<(), RepositoryError> {
        self.inner.update_application(application)
    }

    fn set_qr_code(
        &self,
        id: &ApplicationId,
        qr_code: BlobRef,
    ) -> Result<Application, RepositoryError> {
        self.inner.set_qr_code(id, qr_code)
    }

    fn application(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        self.inner.application(id)
    }

    fn application_by_reference(
        &self,
        reference: &ReferenceNumber,
    ) -> Result<Option<Application>, RepositoryError> {
        self.inner.application_by_reference(reference)
    }

    fn list_applications(
        &self,
        applicant: Option<&UserId>,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<Application>, RepositoryError> {
        self.inner.list_applications(applicant, status)
    }
}

impl NotificationRepository for CollidingStore {
    fn insert_notification(&self, notification: Notification) -> Result<(), RepositoryError> {
        self.inner.insert_notification(notification)
    }

    fn notifications_for(&self, user: &UserId) -> Result<Vec<Notification>, RepositoryError> {
        self.inner.notifications_for(user)
    }
}

impl DirectoryRepository for CollidingStore {
    fn insert_user(&self, user: User) -> Result<(), RepositoryError> {
        self.inner.insert_user(user)
    }

    fn update_user(&self, user: User) -> Result<(), RepositoryError> {
        self.inner.update_user(user)
    }

    fn user(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        self.inner.user(id)
    }

    fn branch(&self, id: &BranchId) -> Result<Option<Branch>, RepositoryError> {
        self.inner.branch(id)
    }

    fn document_type(&self, id: &DocumentTypeId) -> Result<Option<DocumentType>, RepositoryError> {
        self.inner.document_type(id)
    }

    fn insert_attachment(&self, attachment: Attachment) -> Result<(), RepositoryError> {
        self.inner.insert_attachment(attachment)
    }

    fn attachments_for(
        &self,
        application: &ApplicationId,
    ) -> Result<Vec<Attachment>, RepositoryError> {
        self.inner.attachments_for(application)
    }
}

/// Every notification write fails; everything else is delegated.
pub(super) struct NotificationOutage(pub(super) InMemoryRegistryStore);

impl NotificationRepository for NotificationOutage {
    fn insert_notification(&self, _notification: Notification) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("notifications table locked".to_string()))
    }

    fn notifications_for(&self, user: &UserId) -> Result<Vec<Notification>, RepositoryError> {
        self.0.notifications_for(user)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
