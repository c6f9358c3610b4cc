//! # Reporting Engine
//!
//! Read-only aggregations over obligations: cash flow for a period, the
//! overdue book and the dashboard summary. Every figure is computed from the
//! runtime status as of a caller-supplied date, and every sum is exact decimal
//! arithmetic done in Rust rather than in SQL.
//!
//! A missing counterparty never fails a report; the line item carries a
//! placeholder label instead.

use std::cmp::Reverse;

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::LedgerError;
use crate::ledger;
use crate::models::obligation::{
    Column, Direction, Entity as Obligation, Model as ObligationModel, ObligationStatus,
};
use crate::models::party::{Entity as Party, Model as PartyModel};
use crate::tenant::TenantScope;

/// Label used when a payable's counterparty row is gone
pub const UNKNOWN_SUPPLIER: &str = "Supplier";
/// Label used when a receivable's counterparty row is gone
pub const UNKNOWN_CUSTOMER: &str = "Customer";

/// Cash-flow period and filters
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CashFlowQuery {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    #[serde(default)]
    pub include_cancelled: bool,
    #[serde(default)]
    pub only_settled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CashFlowItem {
    pub obligation_id: i32,
    pub company_id: i32,
    pub branch_id: i32,
    pub direction: Direction,
    pub counterparty_id: i32,
    pub counterparty_name: String,
    #[schema(value_type = String, example = "33.33")]
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub settled_date: Option<NaiveDate>,
    /// Runtime status as of the report date
    pub status: ObligationStatus,
    pub category: Option<String>,
    pub installment_index: i32,
    pub installment_count: i32,
    pub installment_group_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct CashFlowSummary {
    #[schema(value_type = String)]
    pub realized_in: Decimal,
    #[schema(value_type = String)]
    pub realized_out: Decimal,
    #[schema(value_type = String)]
    pub projected_in: Decimal,
    #[schema(value_type = String)]
    pub projected_out: Decimal,
    #[schema(value_type = String)]
    pub net_realized: Decimal,
    #[schema(value_type = String)]
    pub net_projected: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CashFlowReport {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub as_of: NaiveDate,
    pub summary: CashFlowSummary,
    pub items: Vec<CashFlowItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct OverdueItem {
    pub obligation_id: i32,
    pub company_id: i32,
    pub branch_id: i32,
    pub direction: Direction,
    pub counterparty_id: i32,
    pub counterparty_name: String,
    #[schema(value_type = String, example = "150.00")]
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub days_overdue: i64,
    pub category: Option<String>,
    pub installment_index: i32,
    pub installment_count: i32,
}

/// Row count and amount sum
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct Totals {
    pub count: u64,
    #[schema(value_type = String, example = "0.00")]
    pub total: Decimal,
}

impl Totals {
    fn add(&mut self, amount: Decimal) {
        self.count += 1;
        self.total += amount;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct OverdueReport {
    pub as_of: NaiveDate,
    pub payables: Totals,
    pub receivables: Totals,
    /// Most overdue first
    pub items: Vec<OverdueItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct DashboardSummary {
    pub open_payables: Totals,
    pub overdue_payables: Totals,
    pub open_receivables: Totals,
    pub overdue_receivables: Totals,
    /// Open receivables minus open payables
    #[schema(value_type = String, example = "0.00")]
    pub projected_balance: Decimal,
}

/// Aggregation queries over the obligation ledger
pub struct ReportingEngine<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> ReportingEngine<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Obligations of both directions due inside the period, with realized and
    /// projected totals.
    pub async fn cash_flow(
        &self,
        scope: &TenantScope,
        query: &CashFlowQuery,
        as_of: NaiveDate,
    ) -> Result<CashFlowReport, LedgerError> {
        if query.period_start > query.period_end {
            return Err(LedgerError::validation(format!(
                "period_start {} must not be after period_end {}",
                query.period_start, query.period_end
            )));
        }

        let mut select = scope
            .apply::<Obligation, _>(Obligation::find())
            .filter(Column::DueDate.gte(query.period_start))
            .filter(Column::DueDate.lte(query.period_end));
        if query.only_settled {
            select = select.filter(Column::Status.eq(ObligationStatus::Settled));
        } else if !query.include_cancelled {
            select = select.filter(Column::Status.ne(ObligationStatus::Cancelled));
        }

        let rows = select
            .find_also_related(Party)
            .order_by_asc(Column::DueDate)
            .order_by_asc(Column::Id)
            .all(self.db)
            .await?;

        let mut summary = CashFlowSummary::default();
        let mut items = Vec::with_capacity(rows.len());
        for (obligation, party) in rows {
            let status = obligation.runtime_status(as_of);
            match (obligation.direction, status) {
                (Direction::Receivable, ObligationStatus::Settled) => {
                    summary.realized_in += obligation.amount
                }
                (Direction::Payable, ObligationStatus::Settled) => {
                    summary.realized_out += obligation.amount
                }
                (Direction::Receivable, s) if s.is_open() => {
                    summary.projected_in += obligation.amount
                }
                (Direction::Payable, s) if s.is_open() => {
                    summary.projected_out += obligation.amount
                }
                _ => {}
            }
            items.push(CashFlowItem {
                counterparty_name: counterparty_name(&obligation, party.as_ref()),
                obligation_id: obligation.id,
                company_id: obligation.company_id,
                branch_id: obligation.branch_id,
                direction: obligation.direction,
                counterparty_id: obligation.counterparty_id,
                amount: obligation.amount,
                due_date: obligation.due_date,
                settled_date: obligation.settled_date,
                status,
                category: obligation.category,
                installment_index: obligation.installment_index,
                installment_count: obligation.installment_count,
                installment_group_id: obligation.installment_group_id,
            });
        }
        summary.net_realized = summary.realized_in - summary.realized_out;
        summary.net_projected = (summary.realized_in + summary.projected_in)
            - (summary.realized_out + summary.projected_out);

        tracing::debug!(
            scope = ?scope,
            items = items.len(),
            net_projected = %summary.net_projected,
            "Cash flow computed"
        );
        Ok(CashFlowReport {
            period_start: query.period_start,
            period_end: query.period_end,
            as_of,
            summary,
            items,
        })
    }

    /// Open obligations past due, optionally limited to the last
    /// `max_days_overdue` days.
    pub async fn overdue_report(
        &self,
        scope: &TenantScope,
        max_days_overdue: Option<u32>,
        as_of: NaiveDate,
    ) -> Result<OverdueReport, LedgerError> {
        let mut select = scope
            .apply::<Obligation, _>(Obligation::find())
            .filter(Column::Status.is_in(ObligationStatus::OPEN))
            .filter(Column::DueDate.lt(as_of));
        if let Some(max_days) = max_days_overdue {
            let earliest = as_of
                .checked_sub_days(Days::new(u64::from(max_days)))
                .unwrap_or(NaiveDate::MIN);
            select = select.filter(Column::DueDate.gte(earliest));
        }

        let rows = select
            .find_also_related(Party)
            .order_by_asc(Column::DueDate)
            .order_by_asc(Column::Id)
            .all(self.db)
            .await?;

        let mut payables = Totals::default();
        let mut receivables = Totals::default();
        let mut items: Vec<OverdueItem> = rows
            .into_iter()
            .map(|(obligation, party)| {
                match obligation.direction {
                    Direction::Payable => payables.add(obligation.amount),
                    Direction::Receivable => receivables.add(obligation.amount),
                }
                OverdueItem {
                    counterparty_name: counterparty_name(&obligation, party.as_ref()),
                    days_overdue: ledger::days_overdue(obligation.due_date, as_of),
                    obligation_id: obligation.id,
                    company_id: obligation.company_id,
                    branch_id: obligation.branch_id,
                    direction: obligation.direction,
                    counterparty_id: obligation.counterparty_id,
                    amount: obligation.amount,
                    due_date: obligation.due_date,
                    category: obligation.category,
                    installment_index: obligation.installment_index,
                    installment_count: obligation.installment_count,
                }
            })
            .collect();
        items.sort_by_key(|item| (Reverse(item.days_overdue), item.obligation_id));

        Ok(OverdueReport {
            as_of,
            payables,
            receivables,
            items,
        })
    }

    /// Open and overdue counts and sums per direction
    pub async fn dashboard_summary(
        &self,
        scope: &TenantScope,
        as_of: NaiveDate,
    ) -> Result<DashboardSummary, LedgerError> {
        let open = scope
            .apply::<Obligation, _>(Obligation::find())
            .filter(Column::Status.is_in(ObligationStatus::OPEN))
            .all(self.db)
            .await?;

        let mut summary = DashboardSummary::default();
        for obligation in &open {
            let overdue = obligation.runtime_status(as_of) == ObligationStatus::Overdue;
            let (open_totals, overdue_totals) = match obligation.direction {
                Direction::Payable => (&mut summary.open_payables, &mut summary.overdue_payables),
                Direction::Receivable => (
                    &mut summary.open_receivables,
                    &mut summary.overdue_receivables,
                ),
            };
            open_totals.add(obligation.amount);
            if overdue {
                overdue_totals.add(obligation.amount);
            }
        }
        summary.projected_balance = summary.open_receivables.total - summary.open_payables.total;
        Ok(summary)
    }
}

fn counterparty_name(obligation: &ObligationModel, party: Option<&PartyModel>) -> String {
    match party {
        Some(party) => party.display_name.clone(),
        None => match obligation.direction {
            Direction::Payable => UNKNOWN_SUPPLIER.to_string(),
            Direction::Receivable => UNKNOWN_CUSTOMER.to_string(),
        },
    }
}
