//! Tests ensuring tenant isolation and role checks across repositories.

use anyhow::Result;
use bookkeeping::access::resolve_scope;
use bookkeeping::error::ErrorKind;
use bookkeeping::models::party::PartyKind;
use bookkeeping::models::user::UserStatus;
use bookkeeping::repositories::party::{PartyChanges, PartyFilter};
use bookkeeping::repositories::user::{NewUser, UserChanges};
use bookkeeping::repositories::{PartyRepository, UserRepository};
use bookkeeping::tenant::{Identity, TenantScope};

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{TENANT_A, TENANT_B, admin, create_party, member, root, setup_test_db};

fn new_user(login: &str) -> NewUser {
    NewUser {
        tenant: None,
        login: login.to_string(),
        name: format!("User {login}"),
        email: None,
        is_tenant_admin: false,
    }
}

#[tokio::test]
async fn party_reads_never_cross_tenants() -> Result<()> {
    let db = setup_test_db().await?;
    let a = create_party(&db, &member(TENANT_A), "Shared Name", PartyKind::Supplier).await?;
    let b = create_party(&db, &member(TENANT_B), "Shared Name", PartyKind::Supplier).await?;
    let repo = PartyRepository::new(&db);

    let visible = repo
        .list(&member(TENANT_A).own_scope(), PartyFilter::default())
        .await?;
    assert_eq!(visible.iter().map(|p| p.id).collect::<Vec<_>>(), vec![a.id]);

    let hidden = repo
        .get(&member(TENANT_A).own_scope(), b.id)
        .await
        .unwrap_err();
    assert_eq!(hidden.kind(), ErrorKind::NotFound);

    let everything = repo.list(&TenantScope::All, PartyFilter::default()).await?;
    assert_eq!(everything.len(), 2);
    Ok(())
}

#[tokio::test]
async fn party_writes_across_tenants_are_forbidden() -> Result<()> {
    let db = setup_test_db().await?;
    let party = create_party(&db, &member(TENANT_B), "Beta", PartyKind::Customer).await?;
    let repo = PartyRepository::new(&db);
    let intruder = member(TENANT_A);

    let update = repo
        .update(&intruder, party.id, PartyChanges::default())
        .await
        .unwrap_err();
    assert_eq!(update.kind(), ErrorKind::Forbidden);

    let delete = repo.delete(&intruder, party.id).await.unwrap_err();
    assert_eq!(delete.kind(), ErrorKind::Forbidden);

    // Superadmins act on any tenant, and the row keeps its owner
    let updated = repo
        .update(
            &root(),
            party.id,
            PartyChanges {
                notes: Some("checked".to_string()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(updated.company_id, TENANT_B.company_id);
    Ok(())
}

#[test]
fn scope_resolution_follows_roles() {
    let user = member(TENANT_A);
    assert_eq!(
        resolve_scope(&user, None).unwrap(),
        TenantScope::Tenant(TENANT_A)
    );
    assert_eq!(
        resolve_scope(&user, Some(TenantScope::Tenant(TENANT_A))).unwrap(),
        TenantScope::Tenant(TENANT_A)
    );
    assert_eq!(
        resolve_scope(&user, Some(TenantScope::Tenant(TENANT_B)))
            .unwrap_err()
            .kind(),
        ErrorKind::Forbidden
    );
    assert_eq!(
        resolve_scope(&admin(TENANT_A), Some(TenantScope::All))
            .unwrap_err()
            .kind(),
        ErrorKind::Forbidden
    );
    assert_eq!(
        resolve_scope(&root(), Some(TenantScope::All)).unwrap(),
        TenantScope::All
    );
    assert_eq!(
        resolve_scope(&root(), Some(TenantScope::Tenant(TENANT_B))).unwrap(),
        TenantScope::Tenant(TENANT_B)
    );
}

#[tokio::test]
async fn only_tenant_admins_manage_users() -> Result<()> {
    let db = setup_test_db().await?;
    let repo = UserRepository::new(&db);

    let err = repo
        .create(&member(TENANT_A), new_user("maria"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let created = repo
        .create(&admin(TENANT_A), new_user("  Maria "))
        .await?;
    assert_eq!(created.login, "maria");
    assert_eq!(created.company_id, TENANT_A.company_id);
    assert_eq!(created.status, UserStatus::Active);
    assert!(!created.is_superadmin);

    let err = repo
        .update(&member(TENANT_A), created.id, UserChanges::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    Ok(())
}

#[tokio::test]
async fn logins_are_unique_within_a_tenant() -> Result<()> {
    let db = setup_test_db().await?;
    let repo = UserRepository::new(&db);

    repo.create(&admin(TENANT_A), new_user("joao")).await?;
    let duplicate = repo
        .create(&admin(TENANT_A), new_user("JOAO"))
        .await
        .unwrap_err();
    assert_eq!(duplicate.kind(), ErrorKind::Conflict);

    repo.create(&admin(TENANT_B), new_user("joao")).await?;
    Ok(())
}

#[tokio::test]
async fn users_are_listed_and_mutated_per_tenant() -> Result<()> {
    let db = setup_test_db().await?;
    let repo = UserRepository::new(&db);
    let b_user = repo.create(&admin(TENANT_B), new_user("bruno")).await?;
    repo.create(&admin(TENANT_A), new_user("carla")).await?;
    repo.create(&admin(TENANT_A), new_user("ana")).await?;

    let listed = repo.list(&member(TENANT_A).own_scope()).await?;
    let logins: Vec<&str> = listed.iter().map(|u| u.login.as_str()).collect();
    assert_eq!(logins, vec!["ana", "carla"]);

    let err = repo.get(&member(TENANT_A), b_user.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = repo
        .set_admin(&admin(TENANT_A), b_user.id, true)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let promoted = repo.set_admin(&admin(TENANT_B), b_user.id, true).await?;
    assert!(promoted.is_tenant_admin);

    let deactivated = repo
        .update(
            &root(),
            b_user.id,
            UserChanges {
                status: Some(UserStatus::Inactive),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(deactivated.status, UserStatus::Inactive);
    Ok(())
}

#[tokio::test]
async fn users_cannot_delete_themselves() -> Result<()> {
    let db = setup_test_db().await?;
    let repo = UserRepository::new(&db);
    let admin_row = repo
        .create(
            &admin(TENANT_A),
            NewUser {
                is_tenant_admin: true,
                ..new_user("boss")
            },
        )
        .await?;
    let other = repo.create(&admin(TENANT_A), new_user("temp")).await?;

    let me = Identity::tenant_admin(admin_row.id, TENANT_A);
    let err = repo.delete(&me, admin_row.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    repo.delete(&me, other.id).await?;
    let gone = repo.get(&me, other.id).await.unwrap_err();
    assert_eq!(gone.kind(), ErrorKind::NotFound);
    Ok(())
}

#[tokio::test]
async fn superadmins_administer_users_in_any_tenant() -> Result<()> {
    let db = setup_test_db().await?;
    let repo = UserRepository::new(&db);

    let placed = repo
        .create(
            &root(),
            NewUser {
                tenant: Some(TENANT_B),
                is_tenant_admin: true,
                ..new_user("beatriz")
            },
        )
        .await?;
    assert_eq!(placed.company_id, TENANT_B.company_id);
    assert_eq!(placed.branch_id, TENANT_B.branch_id);
    assert!(placed.is_tenant_admin);

    // Without a target the superadmin's own tenant is used
    let own = repo.create(&root(), new_user("root-helper")).await?;
    assert_eq!(own.company_id, 99);

    let err = repo
        .create(
            &admin(TENANT_A),
            NewUser {
                tenant: Some(TENANT_B),
                ..new_user("intruder")
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    // Naming one's own tenant explicitly is fine
    repo.create(
        &admin(TENANT_A),
        NewUser {
            tenant: Some(TENANT_A),
            ..new_user("explicit")
        },
    )
    .await?;
    Ok(())
}

#[tokio::test]
async fn user_listing_follows_resolved_scope() -> Result<()> {
    let db = setup_test_db().await?;
    let repo = UserRepository::new(&db);
    repo.create(&admin(TENANT_A), new_user("ana")).await?;
    repo.create(&admin(TENANT_B), new_user("bruno")).await?;
    repo.create(&admin(TENANT_B), new_user("alice")).await?;

    let everyone = repo
        .list(&resolve_scope(&root(), Some(TenantScope::All))?)
        .await?;
    let logins: Vec<&str> = everyone.iter().map(|u| u.login.as_str()).collect();
    assert_eq!(logins, vec!["ana", "alice", "bruno"]);

    let only_b = repo
        .list(&resolve_scope(&root(), Some(TenantScope::Tenant(TENANT_B)))?)
        .await?;
    assert_eq!(only_b.len(), 2);
    assert!(only_b.iter().all(|u| u.company_id == TENANT_B.company_id));

    let denied = resolve_scope(&admin(TENANT_A), Some(TenantScope::Tenant(TENANT_B))).unwrap_err();
    assert_eq!(denied.kind(), ErrorKind::Forbidden);
    Ok(())
}
