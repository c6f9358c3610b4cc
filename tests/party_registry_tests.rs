//! Party registration, search and soft/hard deletion.

use anyhow::Result;
use bookkeeping::error::ErrorKind;
use bookkeeping::models::party::{PartyKind, PartyStatus};
use bookkeeping::repositories::obligation::NewObligation;
use bookkeeping::repositories::party::{PartyChanges, PartyFilter};
use bookkeeping::repositories::{ObligationRepository, PartyRepository};
use rust_decimal_macros::dec;

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{TENANT_A, TENANT_B, create_party, date, member, new_party, setup_test_db};

#[tokio::test]
async fn create_normalizes_and_validates_fields() -> Result<()> {
    let db = setup_test_db().await?;
    let user = member(TENANT_A);
    let repo = PartyRepository::new(&db);

    let mut request = new_party("  Acme Supplies  ", PartyKind::Supplier);
    request.state = Some("sp".to_string());
    request.email = Some("ap@acme.test".to_string());
    request.document = Some("12.345.678/0001-90".to_string());
    let party = repo.create(&user, request).await?;

    assert_eq!(party.display_name, "Acme Supplies");
    assert_eq!(party.state.as_deref(), Some("SP"));
    assert_eq!(party.status, PartyStatus::Active);
    assert_eq!(party.company_id, TENANT_A.company_id);
    assert_eq!(party.created_by, Some(user.user_id));

    let blank = repo
        .create(&user, new_party("   ", PartyKind::Customer))
        .await
        .unwrap_err();
    assert_eq!(blank.kind(), ErrorKind::Validation);

    let mut bad_email = new_party("Beta", PartyKind::Customer);
    bad_email.email = Some("not-an-email".to_string());
    let err = repo.create(&user, bad_email).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    Ok(())
}

#[tokio::test]
async fn document_is_unique_per_tenant_and_kind() -> Result<()> {
    let db = setup_test_db().await?;
    let repo = PartyRepository::new(&db);
    let with_doc = |name: &str, kind| {
        let mut request = new_party(name, kind);
        request.document = Some("123.456.789-00".to_string());
        request
    };

    repo.create(&member(TENANT_A), with_doc("First", PartyKind::Supplier))
        .await?;

    let duplicate = repo
        .create(&member(TENANT_A), with_doc("Second", PartyKind::Supplier))
        .await
        .unwrap_err();
    assert_eq!(duplicate.kind(), ErrorKind::Conflict);

    // Same document as a customer, or in another tenant, is fine
    repo.create(&member(TENANT_A), with_doc("Third", PartyKind::Customer))
        .await?;
    repo.create(&member(TENANT_B), with_doc("Fourth", PartyKind::Supplier))
        .await?;
    Ok(())
}

#[tokio::test]
async fn list_filters_and_orders_by_name() -> Result<()> {
    let db = setup_test_db().await?;
    let user = member(TENANT_A);
    create_party(&db, &user, "Zeta Foods", PartyKind::Supplier).await?;
    create_party(&db, &user, "Alpha Parts", PartyKind::Supplier).await?;
    let customer = create_party(&db, &user, "Mid Retail", PartyKind::Customer).await?;
    let repo = PartyRepository::new(&db);

    let all = repo.list(&user.own_scope(), PartyFilter::default()).await?;
    let names: Vec<&str> = all.iter().map(|p| p.display_name.as_str()).collect();
    assert_eq!(names, vec!["Alpha Parts", "Mid Retail", "Zeta Foods"]);

    let suppliers = repo
        .list(
            &user.own_scope(),
            PartyFilter {
                kind: Some(PartyKind::Supplier),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(suppliers.len(), 2);

    let searched = repo
        .list(
            &user.own_scope(),
            PartyFilter {
                search: Some("Retail".to_string()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(searched.iter().map(|p| p.id).collect::<Vec<_>>(), vec![customer.id]);

    let paged = repo
        .list(
            &user.own_scope(),
            PartyFilter {
                offset: Some(1),
                limit: Some(1),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(paged.len(), 1);
    assert_eq!(paged[0].display_name, "Mid Retail");
    Ok(())
}

#[tokio::test]
async fn update_and_deactivate() -> Result<()> {
    let db = setup_test_db().await?;
    let user = member(TENANT_A);
    let party = create_party(&db, &user, "Acme", PartyKind::Supplier).await?;
    let repo = PartyRepository::new(&db);

    let updated = repo
        .update(
            &user,
            party.id,
            PartyChanges {
                display_name: Some("Acme Industrial".to_string()),
                city: Some("Campinas".to_string()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(updated.display_name, "Acme Industrial");
    assert_eq!(updated.city.as_deref(), Some("Campinas"));
    assert_eq!(updated.kind, PartyKind::Supplier);

    let inactive = repo.deactivate(&user, party.id).await?;
    assert_eq!(inactive.status, PartyStatus::Inactive);

    let only_active = repo
        .list(
            &user.own_scope(),
            PartyFilter {
                status: Some(PartyStatus::Active),
                ..Default::default()
            },
        )
        .await?;
    assert!(only_active.is_empty());
    Ok(())
}

#[tokio::test]
async fn delete_refused_while_referenced() -> Result<()> {
    let db = setup_test_db().await?;
    let user = member(TENANT_A);
    let referenced = create_party(&db, &user, "Acme", PartyKind::Supplier).await?;
    let unused = create_party(&db, &user, "Spare", PartyKind::Other).await?;
    ObligationRepository::new(&db)
        .create_payable(
            &user,
            NewObligation {
                counterparty_id: referenced.id,
                amount: dec!(10.00),
                due_date: date(2025, 1, 1),
                category: None,
                settlement_method: None,
                document_ref: None,
                notes: None,
            },
        )
        .await?;
    let repo = PartyRepository::new(&db);

    let err = repo.delete(&user, referenced.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    repo.delete(&user, unused.id).await?;
    let gone = repo.get(&user.own_scope(), unused.id).await.unwrap_err();
    assert_eq!(gone.kind(), ErrorKind::NotFound);
    Ok(())
}

#[tokio::test]
async fn counts_report_every_kind() -> Result<()> {
    let db = setup_test_db().await?;
    let user = member(TENANT_A);
    create_party(&db, &user, "S1", PartyKind::Supplier).await?;
    create_party(&db, &user, "S2", PartyKind::Supplier).await?;
    let c1 = create_party(&db, &user, "C1", PartyKind::Customer).await?;
    create_party(&db, &user, "C2", PartyKind::Customer).await?;
    PartyRepository::new(&db).deactivate(&user, c1.id).await?;
    create_party(&db, &member(TENANT_B), "Elsewhere", PartyKind::Supplier).await?;

    let counts = PartyRepository::new(&db)
        .counts_by_kind(&user.own_scope())
        .await?;
    let pairs: Vec<(PartyKind, u64)> = counts.iter().map(|c| (c.kind, c.count)).collect();
    assert_eq!(
        pairs,
        vec![
            (PartyKind::Supplier, 2),
            (PartyKind::Customer, 1),
            (PartyKind::User, 0),
            (PartyKind::Other, 0),
        ]
    );
    Ok(())
}
