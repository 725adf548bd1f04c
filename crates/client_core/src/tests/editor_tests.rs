use super::*;
use crate::session::{Scheduler, SearchKey};
use shared::{
    domain::CompanyId,
    protocol::{ServiceCategory, ServiceEntry},
};
use std::time::Duration;
use tokio::sync::mpsc;

fn project(name: &str) -> ProjectDraft {
    ProjectDraft {
        name: name.into(),
        client: Some(CounterpartName::Typed("Northwind".into())),
        ..ProjectDraft::default()
    }
}

fn acme() -> CompanyNameCandidate {
    CompanyNameCandidate {
        id: CompanyId(11),
        name: "Acme".into(),
    }
}

#[test]
fn create_appends_after_commit() {
    let mut editor = ProjectEditor::new();
    let mut projects = vec![project("One")];

    let form = editor.open_for_create().expect("open");
    assert!(form.is_new());
    form.draft_mut().name = "Two".into();
    assert_eq!(projects.len(), 1);

    assert_eq!(editor.commit(&mut projects), Ok(CommitOutcome::Appended(1)));
    assert!(!editor.is_open());
    assert_eq!(projects[1].name, "Two");
}

#[test]
fn edit_replaces_in_place_and_keeps_length() {
    let mut editor = ProjectEditor::new();
    let mut projects = vec![project("One"), project("Two"), project("Three")];

    let form = editor.open_for_edit(&projects, 1).expect("open");
    assert_eq!(form.original_index(), Some(1));
    form.draft_mut().name = "Two (phase 2)".into();
    assert_eq!(projects[1].name, "Two");

    assert_eq!(editor.commit(&mut projects), Ok(CommitOutcome::Replaced(1)));
    assert_eq!(projects.len(), 3);
    assert_eq!(projects[1].name, "Two (phase 2)");
    assert_eq!(projects[1].client, Some(CounterpartName::Typed("Northwind".into())));
}

#[test]
fn cancel_leaves_committed_projects_untouched() {
    let mut editor = ProjectEditor::new();
    let mut projects = vec![project("One")];
    let before = projects.clone();

    editor.open_for_edit(&projects, 0).expect("open").draft_mut().name = "Changed".into();
    assert!(editor.cancel());
    assert!(!editor.cancel());
    assert_eq!(projects, before);

    assert_eq!(editor.commit(&mut projects), Err(EditorError::NotEditing));
}

#[test]
fn rejected_commit_keeps_form_open_with_errors() {
    let mut editor = ProjectEditor::new();
    let mut projects = Vec::new();

    editor.open_for_create().expect("open");
    assert_eq!(editor.commit(&mut projects), Ok(CommitOutcome::Rejected));
    assert!(editor.is_open());
    assert!(projects.is_empty());
    let form = editor.form().expect("still open");
    assert!(form.errors().first("name").is_some());
}

#[test]
fn only_one_form_at_a_time() {
    let mut editor = ProjectEditor::new();
    let mut projects = vec![project("One")];

    editor.open_for_create().expect("open");
    assert!(matches!(editor.open_for_create(), Err(EditorError::AlreadyEditing)));
    assert!(matches!(
        editor.open_for_edit(&projects, 0),
        Err(EditorError::AlreadyEditing)
    ));
    assert_eq!(
        editor.remove(&mut projects, 0),
        Err(EditorError::AlreadyEditing)
    );
    assert_eq!(projects.len(), 1);
}

#[test]
fn remove_and_out_of_range_edit() {
    let mut editor = ProjectEditor::new();
    let mut projects = vec![project("One"), project("Two")];

    assert!(matches!(
        editor.open_for_edit(&projects, 5),
        Err(EditorError::IndexOutOfRange { index: 5, len: 2 })
    ));
    let removed = editor.remove(&mut projects, 0).expect("remove");
    assert_eq!(removed.name, "One");
    assert_eq!(projects.len(), 1);
    assert_eq!(
        editor.remove(&mut projects, 1),
        Err(EditorError::IndexOutOfRange { index: 1, len: 1 })
    );
}

#[test]
fn technologies_are_normalized_on_commit() {
    let mut editor = ProjectEditor::new();
    let mut projects = Vec::new();

    let form = editor.open_for_create().expect("open");
    form.draft_mut().name = "Search".into();
    form.set_technologies_text("Rust, Tokio\nRust");
    assert!(form.add_technology(" Postgres "));
    assert!(!form.add_technology("Tokio"));
    assert!(!form.add_technology("  "));
    form.draft_mut().technologies.push("  Axum ".into());
    assert_eq!(form.remove_technology(9), None);

    editor.commit(&mut projects).expect("commit");
    assert_eq!(projects[0].technologies, vec!["Rust", "Tokio", "Postgres", "Axum"]);
}

#[test]
fn project_services_follow_the_catalog() {
    let catalog = ServiceCatalog {
        categories: vec![ServiceCategory {
            name: "Engineering".into(),
            services: vec![ServiceEntry {
                id: ServiceId(4),
                name: "Backend".into(),
            }],
        }],
    };
    let mut editor = ProjectEditor::new();
    let form = editor.open_for_create().expect("open");

    assert_eq!(form.services(Some(&catalog)).toggle(ServiceId(4)), Ok(true));
    assert!(form.services(None).toggle(ServiceId(4)).is_err());
    assert!(form.service_ids().contains(&ServiceId(4)));
}

#[tokio::test]
async fn counterparts_resolve_from_search_state() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut scheduler = Scheduler::new(tx);
    let mut editor = ProjectEditor::new();
    let mut projects = vec![ProjectDraft {
        name: "Portal".into(),
        client: Some(CounterpartName::Selected(acme())),
        provider: Some(CounterpartName::Typed("Northwind".into())),
        ..ProjectDraft::default()
    }];

    let form = editor.open_for_edit(&projects, 0).expect("open");
    assert_eq!(
        form.resolved_counterpart(CounterpartRole::Client),
        Some(CounterpartName::Selected(acme()))
    );
    assert_eq!(form.search(CounterpartRole::Provider).query(), "Northwind");

    form.search_mut(CounterpartRole::Provider).on_input(
        "Acme Freelance",
        SearchKey::Counterpart(CounterpartRole::Provider),
        Duration::from_millis(300),
        &mut scheduler,
    );
    editor.commit(&mut projects).expect("commit");

    assert_eq!(projects[0].client, Some(CounterpartName::Selected(acme())));
    assert_eq!(
        projects[0].provider,
        Some(CounterpartName::Typed("Acme Freelance".into()))
    );
}
