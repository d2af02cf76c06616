use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{
    Application, ApplicationId, ApplicationStatus, Attachment, BlobRef, Branch, BranchId,
    DocumentType, DocumentTypeId, Notification, ReferenceNumber, User, UserId,
};
use super::repository::{
    ApplicationRepository, DirectoryRepository, NotificationRepository, RepositoryError,
};

#[derive(Debug, Default)]
struct Tables {
    applications: HashMap<ApplicationId, Application>,
    references: HashMap<ReferenceNumber, ApplicationId>,
    notifications: Vec<Notification>,
    users: HashMap<UserId, User>,
    branches: HashMap<BranchId, Branch>,
    document_types: HashMap<DocumentTypeId, DocumentType>,
    attachments: Vec<Attachment>,
}

/// Process-local store with the same uniqueness rules as the relational schema.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRegistryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryRegistryStore {
    fn tables(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store lock poisoned".to_string()))
    }

    pub fn add_branch(&self, branch: Branch) -> Result<(), RepositoryError> {
        self.tables()?.branches.insert(branch.id, branch);
        Ok(())
    }

    pub fn add_document_type(&self, document_type: DocumentType) -> Result<(), RepositoryError> {
        self.tables()?
            .document_types
            .insert(document_type.id, document_type);
        Ok(())
    }

    pub fn branches(&self) -> Result<Vec<Branch>, RepositoryError> {
        let mut branches: Vec<_> = self.tables()?.branches.values().cloned().collect();
        branches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(branches)
    }

    pub fn document_types(&self) -> Result<Vec<DocumentType>, RepositoryError> {
        let mut document_types: Vec<_> = self.tables()?.document_types.values().cloned().collect();
        document_types.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(document_types)
    }
}

impl ApplicationRepository for InMemoryRegistryStore {
    fn insert_application(&self, application: Application) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        if tables.applications.contains_key(&application.id) {
            return Err(RepositoryError::Conflict { field: "id" });
        }
        if tables.references.contains_key(&application.reference_number) {
            return Err(RepositoryError::Conflict {
                field: "reference_number",
            });
        }
        tables
            .references
            .insert(application.reference_number.clone(), application.id);
        tables.applications.insert(application.id, application);
        Ok(())
    }

    fn update_application(&self, application: Application) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        match tables.applications.get_mut(&application.id) {
            Some(existing) => {
                *existing = application;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn set_qr_code(
        &self,
        id: &ApplicationId,
        qr_code: BlobRef,
    ) -> Result<Application, RepositoryError> {
        let mut tables = self.tables()?;
        let existing = tables
            .applications
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        if existing.qr_code.is_none() {
            existing.qr_code = Some(qr_code);
        }
        Ok(existing.clone())
    }

    fn application(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Ok(self.tables()?.applications.get(id).cloned())
    }

    fn application_by_reference(
        &self,
        reference: &ReferenceNumber,
    ) -> Result<Option<Application>, RepositoryError> {
        let tables = self.tables()?;
        Ok(tables
            .references
            .get(reference)
            .and_then(|id| tables.applications.get(id))
            .cloned())
    }

    fn list_applications(
        &self,
        applicant: Option<&UserId>,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<Application>, RepositoryError> {
        let tables = self.tables()?;
        let mut applications: Vec<_> = tables
            .applications
            .values()
            .filter(|application| applicant.map_or(true, |id| application.applicant == *id))
            .filter(|application| status.map_or(true, |wanted| application.status == wanted))
            .cloned()
            .collect();
        applications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(applications)
    }
}

impl NotificationRepository for InMemoryRegistryStore {
    fn insert_notification(&self, notification: Notification) -> Result<(), RepositoryError> {
        self.tables()?.notifications.push(notification);
        Ok(())
    }

    fn notifications_for(&self, user: &UserId) -> Result<Vec<Notification>, RepositoryError> {
        let tables = self.tables()?;
        let mut notifications: Vec<_> = tables
            .notifications
            .iter()
            .filter(|notification| notification.recipient == *user)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }
}

impl DirectoryRepository for InMemoryRegistryStore {
    fn insert_user(&self, user: User) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        for existing in tables.users.values() {
            if existing.email.eq_ignore_ascii_case(&user.email) {
                return Err(RepositoryError::Conflict { field: "email" });
            }
            if existing.username == user.username {
                return Err(RepositoryError::Conflict { field: "username" });
            }
        }
        tables.users.insert(user.id, user);
        Ok(())
    }

    fn update_user(&self, user: User) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        match tables.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn user(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.tables()?.users.get(id).cloned())
    }

    fn branch(&self, id: &BranchId) -> Result<Option<Branch>, RepositoryError> {
        Ok(self.tables()?.branches.get(id).cloned())
    }

    fn document_type(&self, id: &DocumentTypeId) -> Result<Option<DocumentType>, RepositoryError> {
        Ok(self.tables()?.document_types.get(id).cloned())
    }

    fn insert_attachment(&self, attachment: Attachment) -> Result<(), RepositoryError> {
        self.tables()?.attachments.push(attachment);
        Ok(())
    }

    fn attachments_for(
        &self,
        application: &ApplicationId,
    ) -> Result<Vec<Attachment>, RepositoryError> {
        Ok(self
            .tables()?
            .attachments
            .iter()
            .filter(|attachment| attachment.application == *application)
            .cloned()
            .collect())
    }
}
