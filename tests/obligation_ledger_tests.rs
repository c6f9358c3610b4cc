//! Obligation lifecycle against a migrated in-memory database.

use anyhow::Result;
use bookkeeping::error::ErrorKind;
use bookkeeping::models::obligation::{Direction, ObligationStatus};
use bookkeeping::models::party::PartyKind;
use bookkeeping::repositories::obligation::{
    NewInstallmentPlan, NewObligation, ObligationChanges, ObligationFilter, Reschedule, Settlement,
};
use bookkeeping::repositories::{ObligationRepository, PartyRepository};
use bookkeeping::tenant::TenantScope;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{TENANT_A, TENANT_B, create_party, date, member, root, setup_test_db};

fn payable(counterparty_id: i32, amount: Decimal, due: chrono::NaiveDate) -> NewObligation {
    NewObligation {
        counterparty_id,
        amount,
        due_date: due,
        category: Some("Rent".to_string()),
        settlement_method: None,
        document_ref: None,
        notes: None,
    }
}

fn plan(counterparty_id: i32, total: Decimal, count: u32) -> NewInstallmentPlan {
    NewInstallmentPlan {
        counterparty_id,
        total_amount: total,
        installment_count: count,
        first_due_date: date(2025, 1, 1),
        interval_days: Some(30),
        category: None,
        settlement_method: None,
        document_ref: Some("NF-1001".to_string()),
        notes: None,
    }
}

fn settlement(day: chrono::NaiveDate) -> Settlement {
    Settlement {
        settled_date: day,
        settlement_method: Some("PIX".to_string()),
        notes: None,
    }
}

#[tokio::test]
async fn single_obligation_starts_pending_as_one_of_one() -> Result<()> {
    let db = setup_test_db().await?;
    let user = member(TENANT_A);
    let supplier = create_party(&db, &user, "Acme Supplies", PartyKind::Supplier).await?;

    let obligation = ObligationRepository::new(&db)
        .create_payable(&user, payable(supplier.id, dec!(150.00), date(2025, 1, 10)))
        .await?;

    assert_eq!(obligation.direction, Direction::Payable);
    assert_eq!(obligation.status, ObligationStatus::Pending);
    assert_eq!(obligation.amount, dec!(150.00));
    assert_eq!(obligation.installment_index, 1);
    assert_eq!(obligation.installment_count, 1);
    assert_eq!(obligation.installment_group_id, None);
    assert_eq!(obligation.company_id, TENANT_A.company_id);
    assert_eq!(obligation.created_by, Some(user.user_id));
    Ok(())
}

#[tokio::test]
async fn create_rejects_bad_amount_and_foreign_counterparty() -> Result<()> {
    let db = setup_test_db().await?;
    let user = member(TENANT_A);
    let supplier = create_party(&db, &user, "Acme Supplies", PartyKind::Supplier).await?;
    let other = create_party(&db, &member(TENANT_B), "Other", PartyKind::Supplier).await?;
    let repo = ObligationRepository::new(&db);

    let zero = repo
        .create_payable(&user, payable(supplier.id, dec!(0), date(2025, 1, 10)))
        .await
        .unwrap_err();
    assert_eq!(zero.kind(), ErrorKind::Validation);

    let foreign = repo
        .create_payable(&user, payable(other.id, dec!(10), date(2025, 1, 10)))
        .await
        .unwrap_err();
    assert_eq!(foreign.kind(), ErrorKind::NotFound);
    Ok(())
}

#[tokio::test]
async fn inactive_counterparty_is_rejected() -> Result<()> {
    let db = setup_test_db().await?;
    let user = member(TENANT_A);
    let supplier = create_party(&db, &user, "Gone Ltd", PartyKind::Supplier).await?;
    PartyRepository::new(&db)
        .deactivate(&user, supplier.id)
        .await?;

    let err = ObligationRepository::new(&db)
        .create_payable(&user, payable(supplier.id, dec!(10), date(2025, 1, 10)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    Ok(())
}

#[tokio::test]
async fn amounts_beyond_money_precision_are_rejected() -> Result<()> {
    let db = setup_test_db().await?;
    let user = member(TENANT_A);
    let supplier = create_party(&db, &user, "Acme Supplies", PartyKind::Supplier).await?;
    let repo = ObligationRepository::new(&db);

    for amount in [dec!(98765432109876.54), dec!(99999999999999.99)] {
        let err = repo
            .create_payable(&user, payable(supplier.id, amount, date(2025, 1, 10)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = repo
            .create_payable_plan(&user, plan(supplier.id, amount, 4))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    let stored = repo
        .list(&user.own_scope(), ObligationFilter::default(), date(2025, 1, 1))
        .await?;
    assert!(stored.is_empty());
    Ok(())
}

#[tokio::test]
async fn installment_plan_splits_hundred_into_three() -> Result<()> {
    let db = setup_test_db().await?;
    let user = member(TENANT_A);
    let customer = create_party(&db, &user, "Beta Retail", PartyKind::Customer).await?;

    let siblings = ObligationRepository::new(&db)
        .create_receivable_plan(&user, plan(customer.id, dec!(100.00), 3))
        .await?;

    let amounts: Vec<Decimal> = siblings.iter().map(|o| o.amount).collect();
    assert_eq!(amounts, vec![dec!(33.33), dec!(33.33), dec!(33.34)]);
    let dates: Vec<_> = siblings.iter().map(|o| o.due_date).collect();
    assert_eq!(
        dates,
        vec![date(2025, 1, 1), date(2025, 1, 31), date(2025, 3, 2)]
    );
    let indexes: Vec<i32> = siblings.iter().map(|o| o.installment_index).collect();
    assert_eq!(indexes, vec![1, 2, 3]);

    let group = siblings[0].installment_group_id.expect("group id");
    assert!(siblings.iter().all(|o| o.installment_group_id == Some(group)));
    assert!(siblings.iter().all(|o| o.installment_count == 3));
    assert!(siblings.iter().all(|o| o.direction == Direction::Receivable));
    assert!(
        siblings
            .iter()
            .all(|o| o.document_ref.as_deref() == Some("NF-1001"))
    );
    assert_eq!(amounts.iter().copied().sum::<Decimal>(), dec!(100.00));
    Ok(())
}

#[tokio::test]
async fn installment_plan_validates_count() -> Result<()> {
    let db = setup_test_db().await?;
    let user = member(TENANT_A);
    let supplier = create_party(&db, &user, "Acme Supplies", PartyKind::Supplier).await?;
    let repo = ObligationRepository::new(&db);

    let err = repo
        .create_payable_plan(&user, plan(supplier.id, dec!(100.00), 1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    // Nothing was written
    let rows = repo
        .list(&user.own_scope(), ObligationFilter::default(), date(2025, 1, 1))
        .await?;
    assert!(rows.is_empty());
    Ok(())
}

#[tokio::test]
async fn plan_uses_default_interval_when_omitted() -> Result<()> {
    let db = setup_test_db().await?;
    let user = member(TENANT_A);
    let supplier = create_party(&db, &user, "Acme Supplies", PartyKind::Supplier).await?;

    let mut request = plan(supplier.id, dec!(90.00), 3);
    request.interval_days = None;
    let siblings = ObligationRepository::new(&db)
        .with_default_interval(7)
        .create_payable_plan(&user, request)
        .await?;

    let dates: Vec<_> = siblings.iter().map(|o| o.due_date).collect();
    assert_eq!(
        dates,
        vec![date(2025, 1, 1), date(2025, 1, 8), date(2025, 1, 15)]
    );
    Ok(())
}

#[tokio::test]
async fn settle_then_settle_again_is_invalid_state() -> Result<()> {
    let db = setup_test_db().await?;
    let user = member(TENANT_A);
    let supplier = create_party(&db, &user, "Acme Supplies", PartyKind::Supplier).await?;
    let repo = ObligationRepository::new(&db);
    let obligation = repo
        .create_payable(&user, payable(supplier.id, dec!(80.00), date(2025, 1, 10)))
        .await?;

    let settled = repo
        .settle(&user, obligation.id, settlement(date(2025, 1, 9)))
        .await?;
    assert_eq!(settled.status, ObligationStatus::Settled);
    assert_eq!(settled.settled_date, Some(date(2025, 1, 9)));
    assert_eq!(settled.settlement_method.as_deref(), Some("PIX"));
    // Never overdue once settled
    assert_eq!(
        settled.runtime_status(date(2030, 1, 1)),
        ObligationStatus::Settled
    );

    let again = repo
        .settle(&user, obligation.id, settlement(date(2025, 1, 9)))
        .await
        .unwrap_err();
    assert_eq!(again.kind(), ErrorKind::InvalidState);

    let cancel = repo
        .cancel(&user, obligation.id, "too late")
        .await
        .unwrap_err();
    assert_eq!(cancel.kind(), ErrorKind::InvalidState);
    Ok(())
}

#[tokio::test]
async fn cancel_requires_motive_and_is_terminal() -> Result<()> {
    let db = setup_test_db().await?;
    let user = member(TENANT_A);
    let supplier = create_party(&db, &user, "Acme Supplies", PartyKind::Supplier).await?;
    let repo = ObligationRepository::new(&db);
    let obligation = repo
        .create_payable(&user, payable(supplier.id, dec!(80.00), date(2025, 1, 10)))
        .await?;

    let blank = repo.cancel(&user, obligation.id, "   ").await.unwrap_err();
    assert_eq!(blank.kind(), ErrorKind::Validation);

    let cancelled = repo
        .cancel(&user, obligation.id, "Duplicated invoice")
        .await?;
    assert_eq!(cancelled.status, ObligationStatus::Cancelled);
    assert_eq!(
        cancelled.cancel_reason.as_deref(),
        Some("Duplicated invoice")
    );

    let twice = repo
        .cancel(&user, obligation.id, "again")
        .await
        .unwrap_err();
    assert_eq!(twice.kind(), ErrorKind::InvalidState);

    let settle = repo
        .settle(&user, obligation.id, settlement(date(2025, 1, 9)))
        .await
        .unwrap_err();
    assert_eq!(settle.kind(), ErrorKind::InvalidState);
    Ok(())
}

#[tokio::test]
async fn overdue_row_can_still_be_settled() -> Result<()> {
    let db = setup_test_db().await?;
    let user = member(TENANT_A);
    let supplier = create_party(&db, &user, "Acme Supplies", PartyKind::Supplier).await?;
    let repo = ObligationRepository::new(&db);
    let obligation = repo
        .create_payable(&user, payable(supplier.id, dec!(80.00), date(2025, 1, 10)))
        .await?;

    let touched = repo
        .refresh_overdue(&TenantScope::All, date(2025, 2, 1))
        .await?;
    assert_eq!(touched, 1);
    let stored = repo.get(&user.own_scope(), obligation.id).await?;
    assert_eq!(stored.status, ObligationStatus::Overdue);

    let settled = repo
        .settle(&user, obligation.id, settlement(date(2025, 2, 2)))
        .await?;
    assert_eq!(settled.status, ObligationStatus::Settled);
    Ok(())
}

#[tokio::test]
async fn concurrent_settles_have_one_winner() -> Result<()> {
    let db = setup_test_db().await?;
    let user = member(TENANT_A);
    let supplier = create_party(&db, &user, "Acme Supplies", PartyKind::Supplier).await?;
    let repo = ObligationRepository::new(&db);
    let obligation = repo
        .create_payable(&user, payable(supplier.id, dec!(80.00), date(2025, 1, 10)))
        .await?;

    let (first, second) = tokio::join!(
        repo.settle(&user, obligation.id, settlement(date(2025, 1, 9))),
        repo.settle(&user, obligation.id, settlement(date(2025, 1, 9))),
    );

    let outcomes = [first, second];
    let wins = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1);
    let loser = outcomes.into_iter().find_map(|r| r.err()).expect("one failure");
    assert_eq!(loser.kind(), ErrorKind::InvalidState);
    Ok(())
}

#[tokio::test]
async fn cross_tenant_mutation_is_forbidden() -> Result<()> {
    let db = setup_test_db().await?;
    let owner = member(TENANT_A);
    let supplier = create_party(&db, &owner, "Acme Supplies", PartyKind::Supplier).await?;
    let repo = ObligationRepository::new(&db);
    let obligation = repo
        .create_payable(&owner, payable(supplier.id, dec!(80.00), date(2025, 1, 10)))
        .await?;

    let intruder = member(TENANT_B);
    let err = repo
        .settle(&intruder, obligation.id, settlement(date(2025, 1, 9)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let hidden = repo
        .get(&intruder.own_scope(), obligation.id)
        .await
        .unwrap_err();
    assert_eq!(hidden.kind(), ErrorKind::NotFound);

    let missing = repo
        .settle(&owner, 9_999, settlement(date(2025, 1, 9)))
        .await
        .unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::NotFound);

    // A superadmin may act on any tenant
    let settled = repo
        .settle(&root(), obligation.id, settlement(date(2025, 1, 9)))
        .await?;
    assert_eq!(settled.status, ObligationStatus::Settled);
    Ok(())
}

#[tokio::test]
async fn reschedule_replaces_only_the_open_remainder() -> Result<()> {
    let db = setup_test_db().await?;
    let user = member(TENANT_A);
    let supplier = create_party(&db, &user, "Acme Supplies", PartyKind::Supplier).await?;
    let repo = ObligationRepository::new(&db);

    let siblings = repo
        .create_payable_plan(&user, plan(supplier.id, dec!(100.00), 3))
        .await?;
    let group = siblings[0].installment_group_id.expect("group id");
    repo.settle(&user, siblings[0].id, settlement(date(2025, 1, 1)))
        .await?;

    let replacements = repo
        .reschedule_group(
            &user,
            group,
            Reschedule {
                first_due_date: date(2025, 6, 1),
                installment_count: 4,
                interval_days: Some(15),
                notes: Some("renegotiated".to_string()),
            },
        )
        .await?;

    // 33.33 + 33.34 outstanding
    let total: Decimal = replacements.iter().map(|o| o.amount).sum();
    assert_eq!(total, dec!(66.67));
    assert_eq!(replacements.len(), 4);
    let amounts: Vec<Decimal> = replacements.iter().map(|o| o.amount).collect();
    assert_eq!(amounts, vec![dec!(16.66), dec!(16.66), dec!(16.66), dec!(16.69)]);
    let new_group = replacements[0].installment_group_id.expect("new group");
    assert_ne!(new_group, group);
    assert!(replacements.iter().all(|o| o.parent_obligation_id == Some(siblings[1].id)));
    assert!(replacements.iter().all(|o| o.notes.as_deref() == Some("renegotiated")));

    let old_group = repo.group(&user.own_scope(), group).await?;
    let statuses: Vec<ObligationStatus> = old_group.iter().map(|o| o.status).collect();
    assert_eq!(
        statuses,
        vec![
            ObligationStatus::Settled,
            ObligationStatus::Cancelled,
            ObligationStatus::Cancelled
        ]
    );
    assert!(
        old_group[1]
            .cancel_reason
            .as_deref()
            .unwrap_or_default()
            .contains(&new_group.to_string())
    );
    Ok(())
}

#[tokio::test]
async fn reschedule_of_closed_or_unknown_group_fails() -> Result<()> {
    let db = setup_test_db().await?;
    let user = member(TENANT_A);
    let supplier = create_party(&db, &user, "Acme Supplies", PartyKind::Supplier).await?;
    let repo = ObligationRepository::new(&db);
    let reschedule = Reschedule {
        first_due_date: date(2025, 6, 1),
        installment_count: 2,
        interval_days: None,
        notes: None,
    };

    let unknown = repo
        .reschedule_group(&user, uuid::Uuid::new_v4(), reschedule.clone())
        .await
        .unwrap_err();
    assert_eq!(unknown.kind(), ErrorKind::NotFound);

    let siblings = repo
        .create_payable_plan(&user, plan(supplier.id, dec!(50.00), 2))
        .await?;
    for sibling in &siblings {
        repo.settle(&user, sibling.id, settlement(date(2025, 1, 1)))
            .await?;
    }
    let group = siblings[0].installment_group_id.expect("group id");
    let closed = repo
        .reschedule_group(&user, group, reschedule.clone())
        .await
        .unwrap_err();
    assert_eq!(closed.kind(), ErrorKind::InvalidState);

    let foreign = repo
        .reschedule_group(&member(TENANT_B), group, reschedule)
        .await
        .unwrap_err();
    assert_eq!(foreign.kind(), ErrorKind::Forbidden);
    Ok(())
}

#[tokio::test]
async fn failed_reschedule_leaves_group_untouched() -> Result<()> {
    let db = setup_test_db().await?;
    let user = member(TENANT_A);
    let supplier = create_party(&db, &user, "Acme Supplies", PartyKind::Supplier).await?;
    let repo = ObligationRepository::new(&db);
    let siblings = repo
        .create_payable_plan(&user, plan(supplier.id, dec!(100.00), 2))
        .await?;
    let group = siblings[0].installment_group_id.expect("group id");

    let err = repo
        .reschedule_group(
            &user,
            group,
            Reschedule {
                first_due_date: date(2025, 6, 1),
                installment_count: 1,
                interval_days: Some(30),
                notes: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let still = repo.group(&user.own_scope(), group).await?;
    assert!(still.iter().all(|o| o.status == ObligationStatus::Pending));
    Ok(())
}

#[tokio::test]
async fn split_reparcels_a_single_obligation() -> Result<()> {
    let db = setup_test_db().await?;
    let user = member(TENANT_A);
    let customer = create_party(&db, &user, "Beta Retail", PartyKind::Customer).await?;
    let repo = ObligationRepository::new(&db);
    let original = repo
        .create_receivable(&user, payable(customer.id, dec!(1000.00), date(2025, 3, 1)))
        .await?;

    let children = repo
        .split(
            &user,
            original.id,
            Reschedule {
                first_due_date: date(2025, 3, 1),
                installment_count: 3,
                interval_days: Some(30),
                notes: None,
            },
        )
        .await?;

    let amounts: Vec<Decimal> = children.iter().map(|o| o.amount).collect();
    assert_eq!(amounts, vec![dec!(333.33), dec!(333.33), dec!(333.34)]);
    assert!(children.iter().all(|o| o.parent_obligation_id == Some(original.id)));
    assert!(children.iter().all(|o| o.direction == Direction::Receivable));
    assert!(children.iter().all(|o| o.category.as_deref() == Some("Rent")));

    let parent = repo.get(&user.own_scope(), original.id).await?;
    assert_eq!(parent.status, ObligationStatus::Cancelled);
    assert!(
        parent
            .cancel_reason
            .as_deref()
            .unwrap_or_default()
            .starts_with("split into installment group")
    );

    let linked = repo.parent(&user.own_scope(), children[2].id).await?;
    assert_eq!(linked.map(|o| o.id), Some(original.id));
    assert!(repo.parent(&user.own_scope(), original.id).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn list_filters_by_runtime_status() -> Result<()> {
    let db = setup_test_db().await?;
    let user = member(TENANT_A);
    let supplier = create_party(&db, &user, "Acme Supplies", PartyKind::Supplier).await?;
    let repo = ObligationRepository::new(&db);

    let late = repo
        .create_payable(&user, payable(supplier.id, dec!(10), date(2025, 1, 1)))
        .await?;
    let upcoming = repo
        .create_payable(&user, payable(supplier.id, dec!(20), date(2025, 3, 1)))
        .await?;
    let paid = repo
        .create_payable(&user, payable(supplier.id, dec!(30), date(2024, 12, 1)))
        .await?;
    repo.settle(&user, paid.id, settlement(date(2024, 12, 1)))
        .await?;

    let as_of = date(2025, 2, 1);
    let scope = user.own_scope();
    let by_status = |status| ObligationFilter {
        status: Some(status),
        ..Default::default()
    };

    let overdue = repo
        .list(&scope, by_status(ObligationStatus::Overdue), as_of)
        .await?;
    assert_eq!(overdue.iter().map(|o| o.id).collect::<Vec<_>>(), vec![late.id]);
    assert_eq!(overdue[0].runtime_status(as_of), ObligationStatus::Overdue);

    let pending = repo
        .list(&scope, by_status(ObligationStatus::Pending), as_of)
        .await?;
    assert_eq!(
        pending.iter().map(|o| o.id).collect::<Vec<_>>(),
        vec![upcoming.id]
    );

    let settled = repo
        .list(&scope, by_status(ObligationStatus::Settled), as_of)
        .await?;
    assert_eq!(settled.iter().map(|o| o.id).collect::<Vec<_>>(), vec![paid.id]);

    // Ordered by due date
    let all = repo.list(&scope, ObligationFilter::default(), as_of).await?;
    assert_eq!(
        all.iter().map(|o| o.id).collect::<Vec<_>>(),
        vec![paid.id, late.id, upcoming.id]
    );
    Ok(())
}

#[tokio::test]
async fn details_are_editable_only_while_open() -> Result<()> {
    let db = setup_test_db().await?;
    let user = member(TENANT_A);
    let supplier = create_party(&db, &user, "Acme Supplies", PartyKind::Supplier).await?;
    let repo = ObligationRepository::new(&db);
    let obligation = repo
        .create_payable(&user, payable(supplier.id, dec!(10), date(2025, 1, 1)))
        .await?;

    let updated = repo
        .update_details(
            &user,
            obligation.id,
            ObligationChanges {
                category: Some("Utilities".to_string()),
                due_date: Some(date(2025, 1, 15)),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(updated.category.as_deref(), Some("Utilities"));
    assert_eq!(updated.due_date, date(2025, 1, 15));

    repo.settle(&user, obligation.id, settlement(date(2025, 1, 2)))
        .await?;
    let err = repo
        .update_details(&user, obligation.id, ObligationChanges::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    Ok(())
}

#[tokio::test]
async fn refresh_overdue_respects_scope_and_terminal_rows() -> Result<()> {
    let db = setup_test_db().await?;
    let a = member(TENANT_A);
    let b = member(TENANT_B);
    let supplier_a = create_party(&db, &a, "A Supplies", PartyKind::Supplier).await?;
    let supplier_b = create_party(&db, &b, "B Supplies", PartyKind::Supplier).await?;
    let repo = ObligationRepository::new(&db);

    repo.create_payable(&a, payable(supplier_a.id, dec!(10), date(2025, 1, 1)))
        .await?;
    let cancelled = repo
        .create_payable(&a, payable(supplier_a.id, dec!(10), date(2025, 1, 1)))
        .await?;
    repo.cancel(&a, cancelled.id, "void").await?;
    repo.create_payable(&b, payable(supplier_b.id, dec!(10), date(2025, 1, 1)))
        .await?;

    let touched = repo
        .refresh_overdue(&a.own_scope(), date(2025, 2, 1))
        .await?;
    assert_eq!(touched, 1);

    let remaining = repo
        .refresh_overdue(&TenantScope::All, date(2025, 2, 1))
        .await?;
    assert_eq!(remaining, 1);
    Ok(())
}
