use civil_registry::registry::{
    Branch, BranchId, DocumentType, DocumentTypeId, InMemoryRegistryStore, RepositoryError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Document types offered by every registry office.
fn standard_document_types() -> Vec<DocumentType> {
    [
        ("Birth Certificate", "Full birth certificate for a registered birth", 14, 2000, "Hospital birth record; parents' national IDs"),
        ("National ID", "National identity card", 7, 1000, "Birth certificate; proof of residence"),
        ("Passport", "Ordinary passport booklet", 30, 12000, "National ID; birth certificate; two passport photos"),
        ("Death Certificate", "Certified copy of a death entry", 7, 1500, "Medical certificate of cause of death; informant ID"),
        ("Marriage Certificate", "Certified copy of a marriage entry", 10, 2500, "Marriage register extract; spouses' national IDs"),
    ]
    .into_iter()
    .map(|(name, description, processing_days, fee, requirements)| DocumentType {
        id: DocumentTypeId::new(),
        name: name.to_string(),
        description: description.to_string(),
        processing_days,
        fee,
        requirements: requirements.to_string(),
        is_active: true,
    })
    .collect()
}

fn standard_branches() -> Vec<Branch> {
    [
        ("Harare Central", "Makombe Building, Harare", Some("+263242791000")),
        ("Bulawayo", "Tredgold Building, Bulawayo", Some("+263292260000")),
        ("Mutare", "Civic Centre, Mutare", None),
    ]
    .into_iter()
    .map(|(name, address, phone)| Branch {
        id: BranchId::new(),
        name: name.to_string(),
        address: address.to_string(),
        phone: phone.map(str::to_string),
        email: None,
        is_active: true,
    })
    .collect()
}

pub(crate) fn seed_catalog(store: &InMemoryRegistryStore) -> Result<(), RepositoryError> {
    for document_type in standard_document_types() {
        store.add_document_type(document_type)?;
    }
    for branch in standard_branches() {
        store.add_branch(branch)?;
    }
    Ok(())
}
