use super::*;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

use async_trait::async_trait;
use client_core::SubmitError;
use serde_json::json;
use shared::{
    domain::CompanyId,
    protocol::{
        CompanyNameCandidate, CompanySubmission, GroupedServices, ServiceCatalog, ServiceEntry,
    },
};

struct FakeDirectory {
    catalog_down: AtomicBool,
    companies: Vec<CompanyNameCandidate>,
    submissions: Mutex<Vec<CompanySubmission>>,
}

impl FakeDirectory {
    fn new(catalog_down: bool) -> Arc<Self> {
        Arc::new(Self {
            catalog_down: AtomicBool::new(catalog_down),
            companies: vec![
                CompanyNameCandidate {
                    id: CompanyId(7),
                    name: "Acme Corp".into(),
                },
                CompanyNameCandidate {
                    id: CompanyId(8),
                    name: "Acme Corporation".into(),
                },
            ],
            submissions: Mutex::new(Vec::new()),
        })
    }

    fn submissions(&self) -> Vec<CompanySubmission> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl DirectoryApi for FakeDirectory {
    async fn search_locations(&self, _term: &str) -> Result<Vec<LocationCandidate>> {
        Ok(Vec::new())
    }

    async fn search_companies_by_name(&self, term: &str) -> Result<Vec<CompanyNameCandidate>> {
        let term = term.to_lowercase();
        Ok(self
            .companies
            .iter()
            .filter(|c| c.name.to_lowercase().contains(&term))
            .cloned()
            .collect())
    }

    async fn load_service_catalog(&self) -> Result<ServiceCatalog> {
        if self.catalog_down.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("services endpoint returned 503"));
        }
        let mut grouped = GroupedServices::new();
        grouped.insert(
            "Engineering".into(),
            vec![ServiceEntry {
                id: ServiceId(1),
                name: "Backend".into(),
            }],
        );
        Ok(ServiceCatalog::from_grouped(grouped))
    }

    async fn submit_company(
        &self,
        payload: &CompanySubmission,
        _credential: &Credential,
    ) -> std::result::Result<CreatedCompany, SubmitError> {
        self.submissions.lock().unwrap().push(payload.clone());
        Ok(CreatedCompany {
            id: CompanyId(42),
            name: payload.name.clone(),
            created_at: None,
        })
    }
}

#[derive(Default)]
struct RecordingNavigator {
    created: Mutex<Vec<CompanyId>>,
}

impl Navigator for RecordingNavigator {
    fn company_created(&self, record: &CreatedCompany) {
        self.created.lock().unwrap().push(record.id);
    }
}

fn document(client: &str) -> DraftDocument {
    serde_json::from_value(json!({
        "name": "Northwind",
        "founded_year": 2004,
        "address": "12 Harbour Rd",
        "phone": "(555) 123-4567",
        "location": { "id": 3, "city": "Oslo", "country": "Norway" },
        "service_ids": [1],
        "projects": [{
            "name": "Ledger",
            "client": client,
            "provider": "Northwind",
            "technologies": ["Rust", "Postgres"],
            "service_ids": [1]
        }]
    }))
    .expect("draft document")
}

async fn run(api: Arc<FakeDirectory>, client: &str) -> (Result<()>, Arc<RecordingNavigator>) {
    let navigator = Arc::new(RecordingNavigator::default());
    let result = submit(
        api,
        navigator.clone(),
        &Settings::default(),
        document(client),
        Credential::new("token"),
    )
    .await;
    (result, navigator)
}

#[tokio::test(start_paused = true)]
async fn down_catalog_still_submits_without_services() {
    let api = FakeDirectory::new(true);
    let (result, navigator) = run(api.clone(), "Acme Corp").await;

    result.expect("submission succeeds");
    let submissions = api.submissions();
    assert_eq!(submissions.len(), 1);
    assert!(submissions[0].service_ids.is_empty());
    assert!(submissions[0].projects[0].service_ids.is_empty());
    assert_eq!(submissions[0].projects[0].technologies, vec!["Rust", "Postgres"]);
    assert_eq!(*navigator.created.lock().unwrap(), vec![CompanyId(42)]);
}

#[tokio::test(start_paused = true)]
async fn available_catalog_sends_requested_services() {
    let api = FakeDirectory::new(false);
    let (result, _) = run(api.clone(), "Acme Corp").await;

    result.expect("submission succeeds");
    let submissions = api.submissions();
    let submission = &submissions[0];
    assert_eq!(submission.service_ids, vec![ServiceId(1)]);
    assert_eq!(submission.projects[0].service_ids, vec![ServiceId(1)]);
}

#[tokio::test(start_paused = true)]
async fn exact_company_name_is_sent_with_its_id() {
    let api = FakeDirectory::new(false);
    let (result, _) = run(api.clone(), " acme corp ").await;

    result.expect("submission succeeds");
    let submissions = api.submissions();
    let project = &submissions[0].projects[0];
    assert_eq!(project.client_company_name, "Acme Corp");
    assert_eq!(project.client_company_id, Some(CompanyId(7)));
    assert_eq!(project.provider_company_name, "Northwind");
    assert_eq!(project.provider_company_id, None);
}

#[tokio::test(start_paused = true)]
async fn unmatched_company_name_stays_typed() {
    let api = FakeDirectory::new(false);
    let (result, _) = run(api.clone(), "Acme").await;

    result.expect("submission succeeds");
    let submissions = api.submissions();
    let project = &submissions[0].projects[0];
    assert_eq!(project.client_company_name, "Acme");
    assert_eq!(project.client_company_id, None);
}
