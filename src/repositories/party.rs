//! # Party Repository
//!
//! Customers, suppliers and other parties a tenant transacts with.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, Iterable, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Set,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::access;
use crate::error::LedgerError;
use crate::models::obligation;
use crate::models::party::{
    ActiveModel as PartyActiveModel, Column, Entity as Party, Model as PartyModel, PartyKind,
    PartyStatus,
};
use crate::repositories::{now, optional_text, page_limit, required_text};
use crate::tenant::{Identity, TenantId, TenantOwned, TenantScope};

/// Request data for registering a party
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewParty {
    #[schema(example = "Acme Supplies Ltda")]
    pub display_name: String,
    pub kind: PartyKind,
    #[schema(example = "12.345.678/0001-90")]
    pub document: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    #[schema(example = "SP")]
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
}

/// Partial update; blank strings clear optional fields
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PartyChanges {
    pub display_name: Option<String>,
    pub kind: Option<PartyKind>,
    pub document: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub status: Option<PartyStatus>,
    pub notes: Option<String>,
}

/// List filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PartyFilter {
    pub kind: Option<PartyKind>,
    pub status: Option<PartyStatus>,
    /// Substring of the display name or document
    pub search: Option<String>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

/// Active party count for one kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PartyKindCount {
    pub kind: PartyKind,
    pub count: u64,
}

/// Repository for Party database operations
pub struct PartyRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> PartyRepository<'a> {
    /// Create a new PartyRepository with the given database connection
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Register a party in the caller's tenant
    pub async fn create(
        &self,
        identity: &Identity,
        request: NewParty,
    ) -> Result<PartyModel, LedgerError> {
        let tenant = identity.tenant;
        let display_name = required_text("display_name", &request.display_name, 100)?;
        let document = optional_text("document", request.document, 18)?;
        let email = validate_email(optional_text("email", request.email, 120)?)?;

        if let Some(document) = &document {
            self.ensure_document_free(tenant, request.kind, document, None)
                .await?;
        }

        let timestamp = now();
        let party = PartyActiveModel {
            company_id: Set(tenant.company_id),
            branch_id: Set(tenant.branch_id),
            display_name: Set(display_name),
            kind: Set(request.kind),
            document: Set(document),
            address: Set(optional_text("address", request.address, 200)?),
            city: Set(optional_text("city", request.city, 100)?),
            state: Set(optional_text("state", request.state, 2)?.map(|s| s.to_uppercase())),
            postal_code: Set(optional_text("postal_code", request.postal_code, 10)?),
            phone: Set(optional_text("phone", request.phone, 20)?),
            mobile: Set(optional_text("mobile", request.mobile, 20)?),
            email: Set(email),
            status: Set(PartyStatus::Active),
            notes: Set(optional_text("notes", request.notes, 1000)?),
            created_at: Set(timestamp),
            created_by: Set(Some(identity.user_id)),
            updated_at: Set(timestamp),
            updated_by: Set(Some(identity.user_id)),
            ..Default::default()
        };

        let party = party.insert(self.db).await?;
        tracing::info!(tenant = %tenant, party_id = party.id, kind = ?party.kind, "Party registered");
        Ok(party)
    }

    /// Get a party visible in `scope`
    pub async fn get(&self, scope: &TenantScope, id: i32) -> Result<PartyModel, LedgerError> {
        scope
            .apply::<Party, _>(Party::find_by_id(id))
            .one(self.db)
            .await?
            .ok_or_else(|| LedgerError::not_found(format!("party {id} not found")))
    }

    /// List parties ordered by display name
    pub async fn list(
        &self,
        scope: &TenantScope,
        filter: PartyFilter,
    ) -> Result<Vec<PartyModel>, LedgerError> {
        let mut query = scope.apply::<Party, _>(Party::find());

        if let Some(kind) = filter.kind {
            query = query.filter(Column::Kind.eq(kind));
        }
        if let Some(status) = filter.status {
            query = query.filter(Column::Status.eq(status));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(Column::DisplayName.contains(search))
                    .add(Column::Document.contains(search)),
            );
        }

        Ok(query
            .order_by_asc(Column::DisplayName)
            .order_by_asc(Column::Id)
            .offset(filter.offset.unwrap_or(0))
            .limit(page_limit(filter.limit))
            .all(self.db)
            .await?)
    }

    /// Apply a partial update; tenant fields never change
    pub async fn update(
        &self,
        identity: &Identity,
        id: i32,
        changes: PartyChanges,
    ) -> Result<PartyModel, LedgerError> {
        let party = self.load_owned(identity, id).await?;
        let tenant = party.tenant();

        let kind = changes.kind.unwrap_or(party.kind);
        let document = match changes.document {
            Some(document) => optional_text("document", Some(document), 18)?,
            None => party.document.clone(),
        };
        if let Some(document) = &document {
            if kind != party.kind || party.document.as_ref() != Some(document) {
                self.ensure_document_free(tenant, kind, document, Some(party.id))
                    .await?;
            }
        }

        let mut active = party.into_active_model();
        if let Some(name) = changes.display_name {
            active.display_name = Set(required_text("display_name", &name, 100)?);
        }
        if let Some(value) = changes.address {
            active.address = Set(optional_text("address", Some(value), 200)?);
        }
        if let Some(value) = changes.city {
            active.city = Set(optional_text("city", Some(value), 100)?);
        }
        if let Some(value) = changes.state {
            active.state =
                Set(optional_text("state", Some(value), 2)?.map(|s| s.to_uppercase()));
        }
        if let Some(value) = changes.postal_code {
            active.postal_code = Set(optional_text("postal_code", Some(value), 10)?);
        }
        if let Some(value) = changes.phone {
            active.phone = Set(optional_text("phone", Some(value), 20)?);
        }
        if let Some(value) = changes.mobile {
            active.mobile = Set(optional_text("mobile", Some(value), 20)?);
        }
        if let Some(value) = changes.email {
            active.email = Set(validate_email(optional_text("email", Some(value), 120)?)?);
        }
        if let Some(value) = changes.notes {
            active.notes = Set(optional_text("notes", Some(value), 1000)?);
        }
        if let Some(status) = changes.status {
            active.status = Set(status);
        }
        active.kind = Set(kind);
        active.document = Set(document);
        active.updated_at = Set(now());
        active.updated_by = Set(Some(identity.user_id));

        let party = active.update(self.db).await?;
        tracing::info!(tenant = %tenant, party_id = party.id, "Party updated");
        Ok(party)
    }

    /// Soft delete: flip status to INACTIVE
    pub async fn deactivate(
        &self,
        identity: &Identity,
        id: i32,
    ) -> Result<PartyModel, LedgerError> {
        self.update(
            identity,
            id,
            PartyChanges {
                status: Some(PartyStatus::Inactive),
                ..Default::default()
            },
        )
        .await
    }

    /// Hard delete, refused while any obligation references the party
    pub async fn delete(&self, identity: &Identity, id: i32) -> Result<(), LedgerError> {
        let party = self.load_owned(identity, id).await?;

        let references = obligation::Entity::find()
            .filter(obligation::Column::CounterpartyId.eq(party.id))
            .count(self.db)
            .await?;
        if references > 0 {
            return Err(LedgerError::conflict(format!(
                "party {id} is referenced by {references} obligation(s); deactivate it instead"
            )));
        }

        let tenant = party.tenant();
        party.delete(self.db).await?;
        tracing::info!(tenant = %tenant, party_id = id, "Party deleted");
        Ok(())
    }

    /// Active parties per kind; kinds without parties report zero
    pub async fn counts_by_kind(
        &self,
        scope: &TenantScope,
    ) -> Result<Vec<PartyKindCount>, LedgerError> {
        let mut counts = Vec::new();
        for kind in PartyKind::iter() {
            let count = scope
                .apply::<Party, _>(Party::find())
                .filter(Column::Kind.eq(kind))
                .filter(Column::Status.eq(PartyStatus::Active))
                .count(self.db)
                .await?;
            counts.push(PartyKindCount { kind, count });
        }
        Ok(counts)
    }

    async fn load_owned(&self, identity: &Identity, id: i32) -> Result<PartyModel, LedgerError> {
        let party = Party::find_by_id(id)
            .one(self.db)
            .await?
            .ok_or_else(|| LedgerError::not_found(format!("party {id} not found")))?;
        access::ensure_same_tenant(identity, party.tenant())?;
        Ok(party)
    }

    async fn ensure_document_free(
        &self,
        tenant: TenantId,
        kind: PartyKind,
        document: &str,
        except_id: Option<i32>,
    ) -> Result<(), LedgerError> {
        let mut query = TenantScope::Tenant(tenant)
            .apply::<Party, _>(Party::find())
            .filter(Column::Kind.eq(kind))
            .filter(Column::Document.eq(document));
        if let Some(id) = except_id {
            query = query.filter(Column::Id.ne(id));
        }

        match query.one(self.db).await? {
            Some(existing) => Err(LedgerError::conflict(format!(
                "document {document} is already registered as {kind:?} (party {})",
                existing.id
            ))),
            None => Ok(()),
        }
    }
}

/// Counterparty check used when obligations are created: the party must exist
/// in `tenant` and be active.
pub(crate) async fn ensure_active_counterparty<C: ConnectionTrait>(
    conn: &C,
    tenant: TenantId,
    party_id: i32,
) -> Result<PartyModel, LedgerError> {
    let party = TenantScope::Tenant(tenant)
        .apply::<Party, _>(Party::find_by_id(party_id))
        .one(conn)
        .await?
        .ok_or_else(|| {
            LedgerError::not_found(format!("counterparty {party_id} not found in tenant {tenant}"))
        })?;

    if party.status != PartyStatus::Active {
        return Err(LedgerError::validation(format!(
            "counterparty {party_id} is inactive"
        )));
    }
    Ok(party)
}

fn validate_email(email: Option<String>) -> Result<Option<String>, LedgerError> {
    match email {
        Some(email) if !email.contains('@') => Err(LedgerError::validation(format!(
            "invalid email address: {email}"
        ))),
        other => Ok(other),
    }
}
