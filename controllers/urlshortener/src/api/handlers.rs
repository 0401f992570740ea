//! Authenticated Shortlink CRUD handlers

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Extension;
use crds::{RedirectCode, Shortlink, ShortlinkSpec, ShortlinkStatus};
use kube::ResourceExt;
use serde::{Deserialize, Serialize};
use shortlink_client::ClientError;
use tracing::info;

use super::ApiState;
use super::auth::CurrentUser;
use super::error::ApiError;

/// Body of POST and PUT. The owner is optional: it is always replaced by the
/// caller on create and by the stored owner on update.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ShortlinkRequest {
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub owners: Vec<String>,
    pub target: String,
    #[serde(default)]
    pub after: u32,
    #[serde(default)]
    pub code: RedirectCode,
}

impl ShortlinkRequest {
    pub fn into_spec(self, owner: &str) -> ShortlinkSpec {
        ShortlinkSpec {
            owner: owner.to_string(),
            co_owners: self.owners,
            target: self.target,
            redirect_after: self.after,
            code: self.code,
        }
    }
}

/// Shortlink as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortlinkView {
    pub name: String,
    pub spec: ShortlinkSpec,
    pub status: ShortlinkStatus,
}

impl From<Shortlink> for ShortlinkView {
    fn from(link: Shortlink) -> Self {
        Self {
            name: link.name_any(),
            status: link.status.unwrap_or_default(),
            spec: link.spec,
        }
    }
}

fn decode(body: Result<Json<ShortlinkRequest>, JsonRejection>) -> Result<ShortlinkRequest, ApiError> {
    body.map(|Json(request)| request)
        .map_err(|rejection| ApiError::InvalidBody(rejection.body_text()))
}

pub async fn list_shortlinks(
    State(state): State<ApiState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<Vec<ShortlinkView>>, ApiError> {
    let links = state.shortlinks.list(&user).await?;
    Ok(Json(links.into_iter().map(ShortlinkView::from).collect()))
}

pub async fn get_shortlink(
    State(state): State<ApiState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(name): Path<String>,
) -> Result<Json<ShortlinkView>, ApiError> {
    let link = state.shortlinks.get(&user, &name).await?;
    Ok(Json(link.into()))
}

pub async fn create_shortlink(
    State(state): State<ApiState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(name): Path<String>,
    body: Result<Json<ShortlinkRequest>, JsonRejection>,
) -> Result<Json<ShortlinkView>, ApiError> {
    let spec = decode(body)?.into_spec(&user);
    spec.validate().map_err(ClientError::from)?;

    let created = state.shortlinks.create(&user, Shortlink::new(&name, spec)).await?;
    info!(user = %user, name = %name, "Shortlink created through API");
    Ok(Json(created.into()))
}

pub async fn update_shortlink(
    State(state): State<ApiState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(name): Path<String>,
    body: Result<Json<ShortlinkRequest>, JsonRejection>,
) -> Result<Json<ShortlinkView>, ApiError> {
    let request = decode(body)?;
    let mut link = state.shortlinks.get(&user, &name).await?;

    let spec = request.into_spec(&link.spec.owner);
    spec.validate().map_err(ClientError::from)?;
    link.spec = spec;

    let updated = state.shortlinks.update(&user, link).await?;
    info!(user = %user, name = %name, "Shortlink updated through API");
    Ok(Json(updated.into()))
}

pub async fn delete_shortlink(
    State(state): State<ApiState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(name): Path<String>,
) -> Result<Json<ShortlinkView>, ApiError> {
    let deleted = state.shortlinks.delete(&user, &name).await?;
    info!(user = %user, name = %name, "Shortlink deleted through API");
    Ok(Json(deleted.into()))
}
