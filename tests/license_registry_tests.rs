//! License issuance, renewal and entitlement checks.

use anyhow::Result;
use bookkeeping::config::LicenseConfig;
use bookkeeping::error::ErrorKind;
use bookkeeping::license_key;
use bookkeeping::models::license::PaymentStatus;
use bookkeeping::repositories::LicenseRepository;
use bookkeeping::repositories::license::{LicenseChanges, LicenseFilter};
use bookkeeping::tenant::TenantScope;

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{
    TENANT_A, TENANT_B, admin, date, issue_license, license_request, member, root, setup_test_db,
};

#[tokio::test]
async fn issue_creates_active_license_with_formatted_key() -> Result<()> {
    let db = setup_test_db().await?;
    let today = date(2025, 1, 1);

    let license = issue_license(&db, TENANT_A, today, date(2025, 12, 31), today).await?;

    assert!(license.active);
    assert_eq!(license.company_id, TENANT_A.company_id);
    assert_eq!(license.payment_status, PaymentStatus::Pending);
    assert_eq!(license.license_key.len(), license_key::LICENSE_KEY_LEN);
    assert!(license_key::is_well_formed(&license.license_key));
    assert!(license.entitles(date(2025, 6, 1)));
    Ok(())
}

#[tokio::test]
async fn only_superadmins_manage_licenses() -> Result<()> {
    let db = setup_test_db().await?;
    let today = date(2025, 1, 1);
    let repo = LicenseRepository::new(&db);

    for caller in [member(TENANT_A), admin(TENANT_A)] {
        let err = repo
            .issue(
                &caller,
                license_request(TENANT_A, today, date(2025, 12, 31)),
                today,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    let license = issue_license(&db, TENANT_A, today, date(2025, 12, 31), today).await?;
    let err = repo
        .renew(&admin(TENANT_A), license.id, date(2026, 12, 31))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    let err = repo
        .deactivate(&member(TENANT_A), license.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    Ok(())
}

#[tokio::test]
async fn second_active_license_conflicts() -> Result<()> {
    let db = setup_test_db().await?;
    let today = date(2025, 1, 1);
    let first = issue_license(&db, TENANT_A, today, date(2025, 12, 31), today).await?;

    let err = issue_license(&db, TENANT_A, date(2025, 6, 1), date(2026, 5, 31), today)
        .await
        .unwrap_err();
    let err = err
        .downcast_ref::<bookkeeping::error::LedgerError>()
        .expect("ledger error");
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(err.to_string().contains(&first.id.to_string()));

    // Other tenants are unaffected
    issue_license(&db, TENANT_B, today, date(2025, 12, 31), today).await?;
    Ok(())
}

#[tokio::test]
async fn expired_active_license_is_retired_on_issue() -> Result<()> {
    let db = setup_test_db().await?;
    let old = issue_license(
        &db,
        TENANT_A,
        date(2024, 1, 1),
        date(2024, 12, 31),
        date(2024, 1, 1),
    )
    .await?;

    let today = date(2025, 1, 10);
    let fresh = issue_license(&db, TENANT_A, today, date(2025, 12, 31), today).await?;
    assert!(fresh.active);

    let repo = LicenseRepository::new(&db);
    let retired = repo.get(&root(), old.id).await?;
    assert!(!retired.active);

    let active = repo
        .list(
            &TenantScope::Tenant(TENANT_A),
            LicenseFilter {
                active: Some(true),
                ..Default::default()
            },
            today,
        )
        .await?;
    assert_eq!(active.iter().map(|l| l.id).collect::<Vec<_>>(), vec![fresh.id]);
    Ok(())
}

#[tokio::test]
async fn issue_rejects_inverted_window() -> Result<()> {
    let db = setup_test_db().await?;
    let err = LicenseRepository::new(&db)
        .issue(
            &root(),
            license_request(TENANT_A, date(2025, 12, 31), date(2025, 1, 1)),
            date(2025, 1, 1),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    Ok(())
}

#[tokio::test]
async fn renew_must_move_valid_to_forward() -> Result<()> {
    let db = setup_test_db().await?;
    let today = date(2025, 1, 1);
    let license = issue_license(&db, TENANT_A, today, date(2025, 12, 31), today).await?;
    let repo = LicenseRepository::new(&db);

    for not_later in [date(2025, 12, 31), date(2025, 6, 30)] {
        let err = repo
            .renew(&root(), license.id, not_later)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    repo.deactivate(&root(), license.id).await?;
    let renewed = repo.renew(&root(), license.id, date(2026, 12, 31)).await?;
    assert_eq!(renewed.valid_to, date(2026, 12, 31));
    // Renewal reactivates
    assert!(renewed.active);

    let missing = repo
        .renew(&root(), 9_999, date(2030, 1, 1))
        .await
        .unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::NotFound);
    Ok(())
}

#[tokio::test]
async fn activating_a_second_license_hits_the_storage_guard() -> Result<()> {
    let db = setup_test_db().await?;
    let today = date(2025, 1, 1);
    let repo = LicenseRepository::new(&db);

    let first = issue_license(&db, TENANT_A, today, date(2025, 12, 31), today).await?;
    repo.deactivate(&root(), first.id).await?;
    issue_license(&db, TENANT_A, today, date(2025, 12, 31), today).await?;

    let err = repo.activate(&root(), first.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    Ok(())
}

#[tokio::test]
async fn entitlement_follows_window_and_activation() -> Result<()> {
    let db = setup_test_db().await?;
    let repo = LicenseRepository::new(&db);

    let none = repo
        .check_entitlement(TENANT_A, date(2025, 3, 1))
        .await
        .unwrap_err();
    assert_eq!(none.kind(), ErrorKind::Forbidden);

    let license = issue_license(
        &db,
        TENANT_A,
        date(2025, 1, 1),
        date(2025, 12, 31),
        date(2025, 1, 1),
    )
    .await?;

    // Both window edges are inclusive
    repo.check_entitlement(TENANT_A, date(2025, 1, 1)).await?;
    let entitled = repo.check_entitlement(TENANT_A, date(2025, 12, 31)).await?;
    assert_eq!(entitled.id, license.id);

    for outside in [date(2024, 12, 31), date(2026, 1, 1)] {
        let err = repo
            .check_entitlement(TENANT_A, outside)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    repo.deactivate(&root(), license.id).await?;
    let err = repo
        .check_entitlement(TENANT_A, date(2025, 6, 1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    // Another tenant's license does not count
    let err = repo
        .check_entitlement(TENANT_B, date(2025, 6, 1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    Ok(())
}

#[tokio::test]
async fn update_validates_window_and_sets_payment() -> Result<()> {
    let db = setup_test_db().await?;
    let today = date(2025, 1, 1);
    let license = issue_license(&db, TENANT_A, today, date(2025, 12, 31), today).await?;
    let repo = LicenseRepository::new(&db);

    let err = repo
        .update(
            &root(),
            license.id,
            LicenseChanges {
                valid_from: Some(date(2026, 6, 1)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let updated = repo
        .update(
            &root(),
            license.id,
            LicenseChanges {
                payment_status: Some(PaymentStatus::Paid),
                legal_name: Some("Acme Holding".to_string()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(updated.payment_status, PaymentStatus::Paid);
    assert_eq!(updated.legal_name, "Acme Holding");
    assert_eq!(updated.license_key, license.license_key);
    Ok(())
}

#[tokio::test]
async fn tenants_see_only_their_own_license() -> Result<()> {
    let db = setup_test_db().await?;
    let today = date(2025, 1, 1);
    let license = issue_license(&db, TENANT_A, today, date(2025, 12, 31), today).await?;
    let repo = LicenseRepository::new(&db);

    let own = repo.get(&member(TENANT_A), license.id).await?;
    assert_eq!(own.id, license.id);

    let err = repo.get(&member(TENANT_B), license.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    Ok(())
}

#[tokio::test]
async fn delete_removes_the_license() -> Result<()> {
    let db = setup_test_db().await?;
    let today = date(2025, 1, 1);
    let license = issue_license(&db, TENANT_A, today, date(2025, 12, 31), today).await?;
    let repo = LicenseRepository::new(&db);

    repo.delete(&root(), license.id).await?;
    let err = repo.get(&root(), license.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

#[tokio::test]
async fn dashboard_counts_license_states() -> Result<()> {
    let db = setup_test_db().await?;
    let today = date(2025, 6, 1);
    let repo = LicenseRepository::with_config(
        &db,
        &LicenseConfig {
            expiry_warning_days: 30,
            ..Default::default()
        },
    );

    // Expiring within the warning window, payment pending
    issue_license(&db, TENANT_A, date(2025, 1, 1), date(2025, 6, 20), today).await?;
    // Healthy and paid
    let paid = issue_license(&db, TENANT_B, date(2025, 1, 1), date(2025, 12, 31), today).await?;
    repo.update(
        &root(),
        paid.id,
        LicenseChanges {
            payment_status: Some(PaymentStatus::Paid),
            ..Default::default()
        },
    )
    .await?;
    // Inactive
    let third = bookkeeping::tenant::TenantId::new(3, 1);
    let dormant = issue_license(&db, third, date(2025, 1, 1), date(2025, 12, 31), today).await?;
    repo.deactivate(&root(), dormant.id).await?;
    // Active but already expired
    let fourth = bookkeeping::tenant::TenantId::new(4, 1);
    issue_license(&db, fourth, date(2024, 1, 1), date(2025, 5, 1), date(2024, 1, 1)).await?;

    let dashboard = repo.dashboard(&TenantScope::All, today).await?;
    assert_eq!(dashboard.total, 4);
    assert_eq!(dashboard.active, 3);
    assert_eq!(dashboard.inactive, 1);
    assert_eq!(dashboard.expired, 1);
    assert_eq!(dashboard.expiring_soon, 1);
    assert_eq!(dashboard.pending_payment, 2);

    let own = repo
        .dashboard(&TenantScope::Tenant(TENANT_A), today)
        .await?;
    assert_eq!(own.total, 1);
    assert_eq!(own.expiring_soon, 1);
    Ok(())
}
