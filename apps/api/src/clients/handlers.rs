//! Axum route handlers for the Clients API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::clients::queries::{self, ClientFields, ClientFilters};
use crate::errors::AppError;
use crate::models::client::Client;
use crate::pagination::{PageParams, Paginated};
use crate::state::AppState;
use crate::validation;

#[derive(Debug, Deserialize)]
pub struct ClientListQuery {
    pub search: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Deserialize)]
pub struct ClientRequest {
    pub name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl ClientRequest {
    fn into_fields(self) -> Result<ClientFields, AppError> {
        Ok(ClientFields {
            name: validation::required_text("name", &self.name, 200)?,
            contact_person: validation::optional_text(self.contact_person),
            email: validation::optional_email("email", self.email)?,
            phone: validation::optional_text(self.phone),
            address: validation::optional_text(self.address),
        })
    }
}

/// GET /api/v1/clients
pub async fn handle_list_clients(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(page): Query<PageParams>,
    Query(filters): Query<ClientListQuery>,
) -> Result<Json<Paginated<Client>>, AppError> {
    let page = page.resolve()?;
    let filters = ClientFilters {
        search: validation::optional_text(filters.search),
        include_inactive: filters.include_inactive,
    };
    let (clients, total) = queries::list(&state.db, &filters, page).await?;
    Ok(Json(Paginated::new(clients, total, page)))
}

/// POST /api/v1/clients
pub async fn handle_create_client(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<ClientRequest>,
) -> Result<(StatusCode, Json<Client>), AppError> {
    auth.require(auth.role.can_manage_clients(), "Not authorized to manage clients")?;

    let client = queries::insert(&state.db, &req.into_fields()?).await?;
    tracing::info!("Client '{}' created by {}", client.name, auth.username);
    Ok((StatusCode::CREATED, Json(client)))
}

/// GET /api/v1/clients/:id
pub async fn handle_get_client(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Client>, AppError> {
    let client = queries::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Client"))?;
    Ok(Json(client))
}

/// PUT /api/v1/clients/:id
pub async fn handle_update_client(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ClientRequest>,
) -> Result<Json<Client>, AppError> {
    auth.require(auth.role.can_manage_clients(), "Not authorized to manage clients")?;

    let client = queries::update(&state.db, id, &req.into_fields()?).await?;
    Ok(Json(client))
}

/// DELETE /api/v1/clients/:id
pub async fn handle_deactivate_client(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Client>, AppError> {
    auth.require(
        auth.role.can_deactivate_clients(),
        "Admin access required to deactivate clients",
    )?;

    let client = queries::deactivate(&state.db, id).await?;
    tracing::info!("Client '{}' deactivated by {}", client.name, auth.username);
    Ok(Json(client))
}
