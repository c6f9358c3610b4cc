//! # Obligation Repository
//!
//! Payables and receivables: creation (single or as an installment plan),
//! the settle/cancel state machine, group rescheduling and single-row splits.
//!
//! State transitions are compare-and-set updates guarded by the expected
//! status, run inside a transaction, so of two concurrent writers on the same
//! row exactly one wins and the other observes `InvalidState`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, IntoActiveModel, ModelTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::access;
use crate::error::LedgerError;
use crate::ledger::{self, PlannedInstallment};
use crate::models::obligation::{
    ActiveModel as ObligationActiveModel, Column, Direction, Entity as Obligation,
    Model as ObligationModel, ObligationStatus, ParentLink,
};
use crate::repositories::party::ensure_active_counterparty;
use crate::repositories::{now, optional_text, page_limit, required_text};
use crate::tenant::{Identity, TenantId, TenantOwned, TenantScope};

/// Default days between installments when a request leaves it out.
pub const DEFAULT_INTERVAL_DAYS: u32 = 30;

/// Request data for a single obligation
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewObligation {
    pub counterparty_id: i32,
    #[schema(value_type = String, example = "150.00")]
    pub amount: Decimal,
    pub due_date: NaiveDate,
    #[schema(example = "Rent")]
    pub category: Option<String>,
    #[schema(example = "PIX")]
    pub settlement_method: Option<String>,
    pub document_ref: Option<String>,
    pub notes: Option<String>,
}

/// Request data for an installment plan
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewInstallmentPlan {
    pub counterparty_id: i32,
    #[schema(value_type = String, example = "100.00")]
    pub total_amount: Decimal,
    #[schema(example = 3, minimum = 2)]
    pub installment_count: u32,
    pub first_due_date: NaiveDate,
    #[schema(example = 30, minimum = 1)]
    pub interval_days: Option<u32>,
    pub category: Option<String>,
    pub settlement_method: Option<String>,
    pub document_ref: Option<String>,
    pub notes: Option<String>,
}

/// Settlement details
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct Settlement {
    pub settled_date: NaiveDate,
    pub settlement_method: Option<String>,
    pub notes: Option<String>,
}

/// New installment structure for a group reschedule or a split
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct Reschedule {
    pub first_due_date: NaiveDate,
    #[schema(example = 4, minimum = 2)]
    pub installment_count: u32,
    #[schema(example = 30, minimum = 1)]
    pub interval_days: Option<u32>,
    pub notes: Option<String>,
}

/// Editable descriptive fields of an open obligation
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ObligationChanges {
    pub category: Option<String>,
    pub settlement_method: Option<String>,
    pub notes: Option<String>,
    pub document_ref: Option<String>,
    pub due_date: Option<NaiveDate>,
}

/// List filters; `status` is matched against the runtime status
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ObligationFilter {
    pub direction: Option<Direction>,
    pub status: Option<ObligationStatus>,
    pub counterparty_id: Option<i32>,
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
    pub installment_group_id: Option<Uuid>,
    pub category: Option<String>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

/// Repository for Obligation database operations
pub struct ObligationRepository<'a> {
    db: &'a DatabaseConnection,
    default_interval_days: u32,
}

impl<'a> ObligationRepository<'a> {
    /// Create a new ObligationRepository with the given database connection
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self {
            db,
            default_interval_days: DEFAULT_INTERVAL_DAYS,
        }
    }

    /// Override the interval used when plan requests omit `interval_days`
    pub fn with_default_interval(mut self, days: u32) -> Self {
        self.default_interval_days = days.max(1);
        self
    }

    /// Create one PENDING obligation with `installment_index = installment_count = 1`
    pub async fn create_single(
        &self,
        identity: &Identity,
        direction: Direction,
        request: NewObligation,
    ) -> Result<ObligationModel, LedgerError> {
        let amount = ledger::validate_amount(request.amount)?;
        let details = Details::parse(
            request.category,
            request.settlement_method,
            request.document_ref,
            request.notes,
        )?;
        ensure_active_counterparty(self.db, identity.tenant, request.counterparty_id).await?;

        let row = new_row(
            identity,
            identity.tenant,
            direction,
            request.counterparty_id,
            &details,
            &PlannedInstallment {
                index: 1,
                count: 1,
                amount,
                due_date: request.due_date,
            },
            None,
            None,
        );
        let obligation = row.insert(self.db).await?;

        tracing::info!(
            tenant = %identity.tenant,
            obligation_id = obligation.id,
            direction = ?direction,
            amount = %obligation.amount,
            "Obligation created"
        );
        Ok(obligation)
    }

    pub async fn create_payable(
        &self,
        identity: &Identity,
        request: NewObligation,
    ) -> Result<ObligationModel, LedgerError> {
        self.create_single(identity, Direction::Payable, request).await
    }

    pub async fn create_receivable(
        &self,
        identity: &Identity,
        request: NewObligation,
    ) -> Result<ObligationModel, LedgerError> {
        self.create_single(identity, Direction::Receivable, request)
            .await
    }

    /// Split `total_amount` into sibling obligations sharing a new group id.
    /// All rows are written in one transaction.
    pub async fn create_installment_plan(
        &self,
        identity: &Identity,
        direction: Direction,
        request: NewInstallmentPlan,
    ) -> Result<Vec<ObligationModel>, LedgerError> {
        let interval = request.interval_days.unwrap_or(self.default_interval_days);
        let plan = ledger::plan_installments(
            request.total_amount,
            request.installment_count,
            request.first_due_date,
            interval,
        )?;
        let details = Details::parse(
            request.category,
            request.settlement_method,
            request.document_ref,
            request.notes,
        )?;

        let group_id = Uuid::new_v4();
        let txn = self.db.begin().await?;
        ensure_active_counterparty(&txn, identity.tenant, request.counterparty_id).await?;

        let created = insert_plan(
            &txn,
            identity,
            identity.tenant,
            direction,
            request.counterparty_id,
            &details,
            &plan,
            group_id,
            None,
        )
        .await?;
        txn.commit().await?;

        tracing::info!(
            tenant = %identity.tenant,
            installment_group_id = %group_id,
            installments = created.len(),
            total = %request.total_amount,
            "Installment plan created"
        );
        Ok(created)
    }

    pub async fn create_payable_plan(
        &self,
        identity: &Identity,
        request: NewInstallmentPlan,
    ) -> Result<Vec<ObligationModel>, LedgerError> {
        self.create_installment_plan(identity, Direction::Payable, request)
            .await
    }

    pub async fn create_receivable_plan(
        &self,
        identity: &Identity,
        request: NewInstallmentPlan,
    ) -> Result<Vec<ObligationModel>, LedgerError> {
        self.create_installment_plan(identity, Direction::Receivable, request)
            .await
    }

    /// PENDING/OVERDUE -> SETTLED
    pub async fn settle(
        &self,
        identity: &Identity,
        id: i32,
        settlement: Settlement,
    ) -> Result<ObligationModel, LedgerError> {
        let method = optional_text("settlement_method", settlement.settlement_method, 50)?;
        let notes = optional_text("notes", settlement.notes, 1000)?;

        let txn = self.db.begin().await?;
        let current = load_owned(&txn, identity, id).await?;
        if !current.is_open() {
            return Err(LedgerError::invalid_state(format!(
                "obligation {id} is {:?} and cannot be settled",
                current.status
            )));
        }

        let patch = ObligationActiveModel {
            status: Set(ObligationStatus::Settled),
            settled_date: Set(Some(settlement.settled_date)),
            settlement_method: Set(method.or(current.settlement_method)),
            notes: Set(notes.or(current.notes)),
            updated_at: Set(now()),
            updated_by: Set(Some(identity.user_id)),
            ..Default::default()
        };
        let settled = transition(&txn, id, &ObligationStatus::OPEN, patch).await?;
        txn.commit().await?;

        tracing::info!(
            tenant = %settled.tenant(),
            obligation_id = id,
            settled_date = %settlement.settled_date,
            "Obligation settled"
        );
        Ok(settled)
    }

    /// PENDING/OVERDUE -> CANCELLED; terminal
    pub async fn cancel(
        &self,
        identity: &Identity,
        id: i32,
        motive: &str,
    ) -> Result<ObligationModel, LedgerError> {
        let motive = required_text("motive", motive, 1000)?;

        let txn = self.db.begin().await?;
        let current = load_owned(&txn, identity, id).await?;
        if !current.is_open() {
            return Err(LedgerError::invalid_state(format!(
                "obligation {id} is {:?} and cannot be cancelled",
                current.status
            )));
        }

        let cancelled = transition(&txn, id, &ObligationStatus::OPEN, cancel_patch(identity, motive))
            .await?;
        txn.commit().await?;

        tracing::info!(tenant = %cancelled.tenant(), obligation_id = id, "Obligation cancelled");
        Ok(cancelled)
    }

    /// Replace the unsettled remainder of an installment group with a new
    /// group of `installment_count` rows carrying the same outstanding total.
    /// Settled and cancelled siblings are left as they are.
    pub async fn reschedule_group(
        &self,
        identity: &Identity,
        installment_group_id: Uuid,
        reschedule: Reschedule,
    ) -> Result<Vec<ObligationModel>, LedgerError> {
        let txn = self.db.begin().await?;

        let siblings = Obligation::find()
            .filter(Column::InstallmentGroupId.eq(installment_group_id))
            .order_by_asc(Column::InstallmentIndex)
            .order_by_asc(Column::Id)
            .lock_exclusive()
            .all(&txn)
            .await?;
        let Some(first) = siblings.first() else {
            return Err(LedgerError::not_found(format!(
                "installment group {installment_group_id} not found"
            )));
        };
        access::ensure_same_tenant(identity, first.tenant())?;

        let open: Vec<ObligationModel> = siblings.into_iter().filter(|o| o.is_open()).collect();
        if open.is_empty() {
            return Err(LedgerError::invalid_state(format!(
                "installment group {installment_group_id} has no open installments"
            )));
        }

        let replaced = self
            .replace_open_rows(&txn, identity, open, reschedule, "rescheduled")
            .await?;
        txn.commit().await?;

        tracing::info!(
            tenant = %identity.tenant,
            previous_group_id = %installment_group_id,
            installment_group_id = ?replaced.first().and_then(|o| o.installment_group_id),
            installments = replaced.len(),
            "Installment group rescheduled"
        );
        Ok(replaced)
    }

    /// Reparcel a single open obligation into a new installment group whose
    /// rows point back to it through `parent_obligation_id`.
    pub async fn split(
        &self,
        identity: &Identity,
        id: i32,
        reschedule: Reschedule,
    ) -> Result<Vec<ObligationModel>, LedgerError> {
        let txn = self.db.begin().await?;
        let current = load_owned(&txn, identity, id).await?;
        if !current.is_open() {
            return Err(LedgerError::invalid_state(format!(
                "obligation {id} is {:?} and cannot be split",
                current.status
            )));
        }

        let children = self
            .replace_open_rows(&txn, identity, vec![current], reschedule, "split")
            .await?;
        txn.commit().await?;

        tracing::info!(
            tenant = %identity.tenant,
            obligation_id = id,
            installments = children.len(),
            "Obligation split into installments"
        );
        Ok(children)
    }

    /// Edit descriptive fields or the due date of an open obligation
    pub async fn update_details(
        &self,
        identity: &Identity,
        id: i32,
        changes: ObligationChanges,
    ) -> Result<ObligationModel, LedgerError> {
        let current = load_owned(self.db, identity, id).await?;
        if !current.is_open() {
            return Err(LedgerError::invalid_state(format!(
                "obligation {id} is {:?} and can no longer be edited",
                current.status
            )));
        }

        let mut active = current.into_active_model();
        if let Some(value) = changes.category {
            active.category = Set(optional_text("category", Some(value), 100)?);
        }
        if let Some(value) = changes.settlement_method {
            active.settlement_method = Set(optional_text("settlement_method", Some(value), 50)?);
        }
        if let Some(value) = changes.notes {
            active.notes = Set(optional_text("notes", Some(value), 1000)?);
        }
        if let Some(value) = changes.document_ref {
            active.document_ref = Set(optional_text("document_ref", Some(value), 50)?);
        }
        if let Some(due_date) = changes.due_date {
            active.due_date = Set(due_date);
        }
        active.updated_at = Set(now());
        active.updated_by = Set(Some(identity.user_id));

        Ok(active.update(self.db).await?)
    }

    /// Get an obligation visible in `scope`
    pub async fn get(
        &self,
        scope: &TenantScope,
        id: i32,
    ) -> Result<ObligationModel, LedgerError> {
        scope
            .apply::<Obligation, _>(Obligation::find_by_id(id))
            .one(self.db)
            .await?
            .ok_or_else(|| LedgerError::not_found(format!("obligation {id} not found")))
    }

    /// The obligation `id` was split or rescheduled from, if any
    pub async fn parent(
        &self,
        scope: &TenantScope,
        id: i32,
    ) -> Result<Option<ObligationModel>, LedgerError> {
        let child = self.get(scope, id).await?;
        Ok(child.find_linked(ParentLink).one(self.db).await?)
    }

    /// List obligations ordered by due date; the status filter is evaluated as of `as_of`
    pub async fn list(
        &self,
        scope: &TenantScope,
        filter: ObligationFilter,
        as_of: NaiveDate,
    ) -> Result<Vec<ObligationModel>, LedgerError> {
        let mut query = scope.apply::<Obligation, _>(Obligation::find());

        if let Some(direction) = filter.direction {
            query = query.filter(Column::Direction.eq(direction));
        }
        if let Some(counterparty_id) = filter.counterparty_id {
            query = query.filter(Column::CounterpartyId.eq(counterparty_id));
        }
        if let Some(from) = filter.due_from {
            query = query.filter(Column::DueDate.gte(from));
        }
        if let Some(to) = filter.due_to {
            query = query.filter(Column::DueDate.lte(to));
        }
        if let Some(group_id) = filter.installment_group_id {
            query = query.filter(Column::InstallmentGroupId.eq(group_id));
        }
        if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
            query = query.filter(Column::Category.eq(category));
        }
        match filter.status {
            Some(ObligationStatus::Overdue) => {
                query = query
                    .filter(Column::Status.is_in(ObligationStatus::OPEN))
                    .filter(Column::DueDate.lt(as_of));
            }
            Some(ObligationStatus::Pending) => {
                query = query
                    .filter(Column::Status.is_in(ObligationStatus::OPEN))
                    .filter(Column::DueDate.gte(as_of));
            }
            Some(status) => query = query.filter(Column::Status.eq(status)),
            None => {}
        }

        Ok(query
            .order_by_asc(Column::DueDate)
            .order_by_asc(Column::Id)
            .offset(filter.offset.unwrap_or(0))
            .limit(page_limit(filter.limit))
            .all(self.db)
            .await?)
    }

    /// Installment siblings ordered by index
    pub async fn group(
        &self,
        scope: &TenantScope,
        installment_group_id: Uuid,
    ) -> Result<Vec<ObligationModel>, LedgerError> {
        let siblings = scope
            .apply::<Obligation, _>(Obligation::find())
            .filter(Column::InstallmentGroupId.eq(installment_group_id))
            .order_by_asc(Column::InstallmentIndex)
            .order_by_asc(Column::Id)
            .all(self.db)
            .await?;
        if siblings.is_empty() {
            return Err(LedgerError::not_found(format!(
                "installment group {installment_group_id} not found"
            )));
        }
        Ok(siblings)
    }

    /// Persist PENDING -> OVERDUE for unsettled rows due before `as_of`.
    /// Returns the number of rows touched.
    pub async fn refresh_overdue(
        &self,
        scope: &TenantScope,
        as_of: NaiveDate,
    ) -> Result<u64, LedgerError> {
        let patch = ObligationActiveModel {
            status: Set(ObligationStatus::Overdue),
            updated_at: Set(now()),
            ..Default::default()
        };

        let result = Obligation::update_many()
            .set(patch)
            .filter(scope.condition::<Obligation>())
            .filter(Column::Status.eq(ObligationStatus::Pending))
            .filter(Column::DueDate.lt(as_of))
            .exec(self.db)
            .await?;

        tracing::info!(
            scope = ?scope,
            as_of = %as_of,
            updated = result.rows_affected,
            "Overdue statuses refreshed"
        );
        Ok(result.rows_affected)
    }

    /// Cancel `open` rows and insert their replacement group inside `txn`.
    async fn replace_open_rows(
        &self,
        txn: &DatabaseTransaction,
        identity: &Identity,
        open: Vec<ObligationModel>,
        reschedule: Reschedule,
        verb: &str,
    ) -> Result<Vec<ObligationModel>, LedgerError> {
        let outstanding: Decimal = open.iter().map(|o| o.amount).sum();
        let interval = reschedule
            .interval_days
            .unwrap_or(self.default_interval_days);
        let plan = ledger::plan_installments(
            outstanding.round_dp(ledger::MONEY_SCALE),
            reschedule.installment_count,
            reschedule.first_due_date,
            interval,
        )?;

        let template = &open[0];
        let details = Details {
            category: template.category.clone(),
            settlement_method: template.settlement_method.clone(),
            document_ref: template.document_ref.clone(),
            notes: match optional_text("notes", reschedule.notes, 1000)? {
                Some(notes) => Some(notes),
                None => template.notes.clone(),
            },
        };
        let new_group_id = Uuid::new_v4();
        let reason = format!("{verb} into installment group {new_group_id}");

        let ids: Vec<i32> = open.iter().map(|o| o.id).collect();
        let result = Obligation::update_many()
            .set(cancel_patch(identity, reason))
            .filter(Column::Id.is_in(ids.clone()))
            .filter(Column::Status.is_in(ObligationStatus::OPEN))
            .exec(txn)
            .await?;
        if result.rows_affected != ids.len() as u64 {
            tracing::warn!(
                obligation_ids = ?ids,
                updated = result.rows_affected,
                "Concurrent transition while replacing installments"
            );
            return Err(LedgerError::invalid_state(
                "installments changed concurrently; nothing was replaced",
            ));
        }

        insert_plan(
            txn,
            identity,
            template.tenant(),
            template.direction,
            template.counterparty_id,
            &details,
            &plan,
            new_group_id,
            Some(template.id),
        )
        .await
    }
}

/// Optional descriptive fields shared by every row of a request.
struct Details {
    category: Option<String>,
    settlement_method: Option<String>,
    document_ref: Option<String>,
    notes: Option<String>,
}

impl Details {
    fn parse(
        category: Option<String>,
        settlement_method: Option<String>,
        document_ref: Option<String>,
        notes: Option<String>,
    ) -> Result<Self, LedgerError> {
        Ok(Self {
            category: optional_text("category", category, 100)?,
            settlement_method: optional_text("settlement_method", settlement_method, 50)?,
            document_ref: optional_text("document_ref", document_ref, 50)?,
            notes: optional_text("notes", notes, 1000)?,
        })
    }
}

fn new_row(
    identity: &Identity,
    tenant: TenantId,
    direction: Direction,
    counterparty_id: i32,
    details: &Details,
    installment: &PlannedInstallment,
    group_id: Option<Uuid>,
    parent_id: Option<i32>,
) -> ObligationActiveModel {
    let timestamp = now();
    ObligationActiveModel {
        company_id: Set(tenant.company_id),
        branch_id: Set(tenant.branch_id),
        direction: Set(direction),
        counterparty_id: Set(counterparty_id),
        amount: Set(installment.amount),
        due_date: Set(installment.due_date),
        settled_date: Set(None),
        status: Set(ObligationStatus::Pending),
        category: Set(details.category.clone()),
        settlement_method: Set(details.settlement_method.clone()),
        installment_index: Set(installment.index as i32),
        installment_count: Set(installment.count as i32),
        installment_group_id: Set(group_id),
        parent_obligation_id: Set(parent_id),
        notes: Set(details.notes.clone()),
        document_ref: Set(details.document_ref.clone()),
        cancel_reason: Set(None),
        created_at: Set(timestamp),
        created_by: Set(Some(identity.user_id)),
        updated_at: Set(timestamp),
        updated_by: Set(Some(identity.user_id)),
        ..Default::default()
    }
}

#[allow(clippy::too_many_arguments)]
async fn insert_plan<C: ConnectionTrait>(
    conn: &C,
    identity: &Identity,
    tenant: TenantId,
    direction: Direction,
    counterparty_id: i32,
    details: &Details,
    plan: &[PlannedInstallment],
    group_id: Uuid,
    parent_id: Option<i32>,
) -> Result<Vec<ObligationModel>, LedgerError> {
    let mut created = Vec::with_capacity(plan.len());
    for installment in plan {
        let row = new_row(
            identity,
            tenant,
            direction,
            counterparty_id,
            details,
            installment,
            Some(group_id),
            parent_id,
        );
        created.push(row.insert(conn).await?);
    }
    Ok(created)
}

fn cancel_patch(identity: &Identity, reason: String) -> ObligationActiveModel {
    ObligationActiveModel {
        status: Set(ObligationStatus::Cancelled),
        cancel_reason: Set(Some(reason)),
        updated_at: Set(now()),
        updated_by: Set(Some(identity.user_id)),
        ..Default::default()
    }
}

/// Load a row for mutation: NotFound when absent, Forbidden across tenants.
async fn load_owned<C: ConnectionTrait>(
    conn: &C,
    identity: &Identity,
    id: i32,
) -> Result<ObligationModel, LedgerError> {
    let obligation = Obligation::find_by_id(id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| LedgerError::not_found(format!("obligation {id} not found")))?;
    access::ensure_same_tenant(identity, obligation.tenant())?;
    Ok(obligation)
}

/// Apply `patch` to row `id` only while its status is one of `expected`.
async fn transition(
    txn: &DatabaseTransaction,
    id: i32,
    expected: &[ObligationStatus],
    patch: ObligationActiveModel,
) -> Result<ObligationModel, LedgerError> {
    let result = Obligation::update_many()
        .set(patch)
        .filter(Column::Id.eq(id))
        .filter(Column::Status.is_in(expected.iter().copied()))
        .exec(txn)
        .await?;

    if result.rows_affected == 0 {
        tracing::warn!(obligation_id = id, "Lost a concurrent status transition");
        return Err(LedgerError::invalid_state(format!(
            "obligation {id} was modified concurrently"
        )));
    }

    Obligation::find_by_id(id)
        .one(txn)
        .await?
        .ok_or_else(|| LedgerError::not_found(format!("obligation {id} not found")))
}
