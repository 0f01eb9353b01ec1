mod common;

use anyhow::Result;
use serde_json::json;
use vet_clinic::collection::{ControllerOptions, ControllerState, SortDirection};
use vet_clinic::models::Pet;
use vet_clinic::notify::{Level, NotificationLog};
use vet_clinic::session::{MemoryTokenStore, SessionStore};
use vet_clinic::ApiError;

async fn signed_in(
    server: &common::MockServer,
    id: i64,
    role: &str,
    log: &NotificationLog,
) -> Result<SessionStore> {
    let email = format!("{}@clinic.test", role);
    let token = format!("tok-{}", role);
    server.add_account(id, &email, "secret", role, &token);
    let session = server.session(&MemoryTokenStore::new(), log).await?;
    session.login(&email, "secret").await?;
    log.drain();
    Ok(session)
}

fn names(pets: &[Pet]) -> Vec<String> {
    pets.iter().map(|p| p.name.clone()).collect()
}

#[tokio::test]
async fn client_only_sees_own_pets() -> Result<()> {
    let server = common::MockServer::spawn().await?;
    server.insert_pet(json!({ "name": "Luna", "species": "Cat", "owner_id": 5 }));
    server.insert_pet(json!({ "name": "Rex", "species": "Dog", "owner_id": 6 }));
    server.insert_pet(json!({ "name": "Milo", "species": "Dog", "owner_id": 5 }));

    let log = NotificationLog::new();
    let session = signed_in(&server, 5, "client", &log).await?;
    let pets = session.controller::<Pet>(ControllerOptions::default())?;
    pets.mount().await?;

    assert_eq!(pets.state(), ControllerState::Ready);
    assert_eq!(names(&pets.visible_items()), vec!["Luna", "Milo"]);
    assert!(server.seen().contains(&"/pets owner_id=5".to_string()));
    Ok(())
}

#[tokio::test]
async fn admin_browses_with_search_sort_and_pages() -> Result<()> {
    let server = common::MockServer::spawn().await?;
    for name in ["Bella", "Luna", "Lucky", "Max", "Charlie", "Lulu", "Oscar"] {
        server.insert_pet(json!({ "name": name, "species": "Dog" }));
    }

    let log = NotificationLog::new();
    let session = signed_in(&server, 1, "admin", &log).await?;
    let pets = session.controller::<Pet>(ControllerOptions { page_size: 3, ..Default::default() })?;
    pets.mount().await?;

    // Default ordering is by name, ascending
    assert_eq!(names(&pets.visible_items()), vec!["Bella", "Charlie", "Lucky"]);
    assert_eq!(pets.page_count(), 3);

    pets.set_page(2);
    assert_eq!(names(&pets.visible_items()), vec!["Oscar"]);

    pets.set_search_term("LU");
    assert_eq!(pets.filtered_count(), 3);
    assert!(pets.is_empty_page());

    pets.set_page(0);
    pets.set_sort("name");
    assert_eq!(pets.view_state().sort_direction, SortDirection::Desc);
    assert_eq!(names(&pets.visible_items()), vec!["Luna", "Lulu", "Lucky"]);
    Ok(())
}

#[tokio::test]
async fn create_and_update_reconcile_with_server() -> Result<()> {
    let server = common::MockServer::spawn().await?;
    server.insert_pet(json!({ "name": "Rex", "species": "Dog" }));

    let log = NotificationLog::new();
    let session = signed_in(&server, 1, "admin", &log).await?;
    let pets = session.controller::<Pet>(ControllerOptions::default())?;
    pets.mount().await?;

    let created = pets.create(json!({ "name": "Nala", "species": "Cat" })).await?;
    assert!(pets.contains(created.id));
    assert_eq!(server.pet_names(), vec!["Rex", "Nala"]);

    let updated = pets.update(created.id, json!({ "breed": "Siamese" })).await?;
    assert_eq!(updated.breed.as_deref(), Some("Siamese"));
    assert_eq!(
        pets.items().iter().find(|p| p.id == created.id).and_then(|p| p.breed.clone()).as_deref(),
        Some("Siamese")
    );

    let messages: Vec<_> = log.entries().into_iter().map(|n| n.message).collect();
    assert_eq!(messages, vec!["Pet created successfully", "Pet updated successfully"]);
    Ok(())
}

#[tokio::test]
async fn rejected_create_surfaces_validation_error() -> Result<()> {
    let server = common::MockServer::spawn().await?;

    let log = NotificationLog::new();
    let session = signed_in(&server, 1, "admin", &log).await?;
    let pets = session.controller::<Pet>(ControllerOptions::default())?;
    pets.mount().await?;

    let err = pets.create(json!({ "species": "Cat" })).await.unwrap_err();
    match &err {
        ApiError::Validation { field_errors, .. } => {
            assert!(field_errors.as_ref().is_some_and(|f| f.contains_key("name")));
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    assert!(pets.items().is_empty());
    let errors = log.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.starts_with("Could not create pet"));
    Ok(())
}

#[tokio::test]
async fn failed_delete_restores_the_item() -> Result<()> {
    let server = common::MockServer::spawn().await?;
    server.insert_pet(json!({ "name": "Alpha" }));
    let doomed = server.insert_pet(json!({ "name": "Beta" }));
    server.insert_pet(json!({ "name": "Gamma" }));

    let log = NotificationLog::new();
    let session = signed_in(&server, 1, "admin", &log).await?;
    let pets = session.controller::<Pet>(ControllerOptions::default())?;
    pets.mount().await?;

    server.with_state(|s| s.fail_next_delete = Some(500));
    assert!(pets.delete(doomed).await.is_err());
    assert_eq!(names(&pets.items()), vec!["Alpha", "Beta", "Gamma"]);
    assert_eq!(log.errors().len(), 1);

    pets.delete(doomed).await?;
    assert!(!pets.contains(doomed));
    assert_eq!(server.pet_names(), vec!["Alpha", "Gamma"]);
    assert!(log
        .entries()
        .iter()
        .any(|n| n.level == Level::Success && n.message == "Pet deleted successfully"));
    Ok(())
}

#[tokio::test]
async fn client_cannot_delete_pets() -> Result<()> {
    let server = common::MockServer::spawn().await?;
    let id = server.insert_pet(json!({ "name": "Luna", "owner_id": 5 }));

    let log = NotificationLog::new();
    let session = signed_in(&server, 5, "client", &log).await?;
    let pets = session.controller::<Pet>(ControllerOptions::default())?;
    pets.mount().await?;

    let err = pets.delete(id).await.unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));
    assert!(pets.contains(id));
    assert_eq!(server.pet_names(), vec!["Luna"]);
    Ok(())
}

#[tokio::test]
async fn controller_requires_a_signed_in_principal() -> Result<()> {
    let server = common::MockServer::spawn().await?;
    let log = NotificationLog::new();
    let session = server.session(&MemoryTokenStore::new(), &log).await?;

    let err = session.controller::<Pet>(ControllerOptions::default()).err();
    assert!(matches!(err, Some(ApiError::Auth { .. })));
    Ok(())
}
