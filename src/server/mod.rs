//! The ingestion server: the HTTP endpoint surface accepting uploads.
//!
//! Two route families, each with a GET form and a POST handler:
//! `/upload?cid=&aid=` for appointment photos and
//! `/upload_profile_pic?cid=` for the single profile picture. Validation
//! runs in a fixed order before any filesystem or database write: required
//! parameters, then client existence, then (for the photo flow) appointment
//! existence. Per-file failures inside a POST batch are isolated; one bad
//! file never aborts the others.

mod pages;

use anyhow::{anyhow, Context, Result};
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db::Store;
use crate::error::UploadError;
use crate::normalize;
use crate::storage;

/// Phone cameras produce files in the 5-15 MB range and a batch holds
/// several of them.
const MAX_BODY_BYTES: usize = 256 * 1024 * 1024;

/// Multipart field name the upload form posts files under.
const PHOTOS_FIELD: &str = "photos";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<Store>,
}

impl AppState {
    pub fn new(config: Config, store: Store) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
        }
    }
}

/// Build the ingestion router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/upload", get(upload_form).post(upload_photos))
        .route(
            "/upload_profile_pic",
            get(profile_form).post(upload_profile_pic),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct UploadParams {
    cid: Option<String>,
    aid: Option<String>,
}

/// Parse a query-string id. A missing parameter is the caller's fault; a
/// malformed one behaves like an id that matches nothing, as it would if
/// passed straight into the lookup.
fn parse_id(
    value: Option<&str>,
    missing: &'static str,
    entity: &'static str,
) -> Result<i64, UploadError> {
    let raw = value.ok_or(UploadError::MissingParameter(missing))?;
    raw.parse::<i64>()
        .map_err(|_| UploadError::NotFound(entity))
}

fn resolve_client(store: &Store, client_id: i64) -> Result<String, UploadError> {
    store
        .client_name(client_id)
        .map_err(UploadError::Persistence)?
        .ok_or(UploadError::NotFound("Client"))
}

fn resolve_appointment(
    store: &Store,
    appointment_id: i64,
) -> Result<crate::db::AppointmentInfo, UploadError> {
    store
        .appointment_info(appointment_id)
        .map_err(UploadError::Persistence)?
        .ok_or(UploadError::NotFound("Appointment"))
}

// ============================================================================
// Appointment-photo flow
// ============================================================================

async fn upload_form(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
) -> Result<Html<String>, UploadError> {
    let client_id = parse_id(params.cid.as_deref(), "client or appointment ID", "Client")?;
    let appointment_id = parse_id(
        params.aid.as_deref(),
        "client or appointment ID",
        "Appointment",
    )?;

    let full_name = resolve_client(&state.store, client_id)?;
    let appt = resolve_appointment(&state.store, appointment_id)?;

    let action = format!("/upload?cid={client_id}&aid={appointment_id}");
    Ok(Html(pages::upload_form(
        &full_name,
        &appt.date,
        &appt.appt_type,
        &action,
    )))
}

async fn upload_photos(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    mut multipart: Multipart,
) -> Result<Html<String>, UploadError> {
    let client_id = parse_id(params.cid.as_deref(), "client or appointment ID", "Client")?;
    let appointment_id = parse_id(
        params.aid.as_deref(),
        "client or appointment ID",
        "Appointment",
    )?;

    let full_name = resolve_client(&state.store, client_id)?;
    let appt = resolve_appointment(&state.store, appointment_id)?;

    let target_dir = storage::appointment_dir(
        &state.config.photos,
        &full_name,
        client_id,
        &appt.date,
    )
    .map_err(UploadError::Storage)?;

    let mut saved = 0usize;
    let mut attempted = 0usize;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| UploadError::MissingParameter(PHOTOS_FIELD))?
    {
        if field.name() != Some(PHOTOS_FIELD) {
            continue;
        }
        let raw_name = field.file_name().unwrap_or("photo").to_string();
        let bytes = match field.bytes().await {
            Ok(b) => b,
            Err(e) => {
                warn!(file = %raw_name, error = %e, "failed to read uploaded file");
                continue;
            }
        };
        if bytes.is_empty() {
            continue;
        }

        attempted += 1;
        match ingest_photo_file(
            &state,
            client_id,
            appointment_id,
            &appt,
            &target_dir,
            &raw_name,
            &bytes,
        ) {
            Ok(path) => {
                saved += 1;
                info!(path = %path.display(), "photo saved and recorded");
            }
            Err(e) => {
                // Fault isolation: this file failed, the rest of the batch
                // continues.
                error!(file = %raw_name, error = %e, "failed to process photo");
            }
        }
    }

    if saved > 0 {
        if let Err(e) = state.store.mark_photos_taken(appointment_id) {
            error!(appointment_id, error = %e, "failed to update photos_taken");
        }
    }

    info!(
        client_id,
        appointment_id, saved, attempted, "upload batch finished"
    );
    Ok(Html(pages::upload_success(
        saved,
        &full_name,
        &appt.date,
        &appt.appt_type,
    )))
}

/// The per-file pipeline: place on disk without overwriting, rotate
/// upright, record the row. A row failure leaves the file on disk; the
/// orphan is logged rather than rolled back.
fn ingest_photo_file(
    state: &AppState,
    client_id: i64,
    appointment_id: i64,
    appt: &crate::db::AppointmentInfo,
    target_dir: &std::path::Path,
    raw_name: &str,
    bytes: &[u8],
) -> Result<PathBuf> {
    let filename = storage::sanitize_filename(raw_name);
    let save_path = storage::save_unique(target_dir, &filename, bytes)?;

    if let Err(e) = normalize::normalize_orientation(&save_path) {
        warn!(path = %save_path.display(), error = %e, "could not fix orientation, keeping file as uploaded");
    }

    state
        .store
        .record_photo(
            client_id,
            appointment_id,
            &appt.date,
            &save_path,
            &appt.appt_type,
        )
        .map_err(|e| {
            warn!(path = %save_path.display(), "file saved but row not recorded");
            e.context("failed to insert photo row")
        })?;

    Ok(save_path)
}

// ============================================================================
// Profile-picture flow
// ============================================================================

async fn profile_form(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
) -> Result<Html<String>, UploadError> {
    let client_id = parse_id(params.cid.as_deref(), "client ID", "Client")?;
    let full_name = resolve_client(&state.store, client_id)?;

    let action = format!("/upload_profile_pic?cid={client_id}");
    Ok(Html(pages::upload_form(
        &full_name,
        "Profile Picture",
        "Upload",
        &action,
    )))
}

async fn upload_profile_pic(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    mut multipart: Multipart,
) -> Result<Html<String>, UploadError> {
    let client_id = parse_id(params.cid.as_deref(), "client ID", "Client")?;
    let full_name = resolve_client(&state.store, client_id)?;

    // Exactly one file: the first photos field with content.
    let mut file_bytes = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| UploadError::MissingParameter(PHOTOS_FIELD))?
    {
        if field.name() != Some(PHOTOS_FIELD) {
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| UploadError::Storage(anyhow!("failed to read file: {e}")))?;
        if !bytes.is_empty() {
            file_bytes = Some(bytes);
            break;
        }
    }
    let bytes = file_bytes.ok_or(UploadError::MissingParameter(PHOTOS_FIELD))?;

    let save_path = save_profile_picture(&state, client_id, &full_name, &bytes)
        .map_err(UploadError::Storage)?;

    state
        .store
        .set_profile_picture(client_id, &save_path)
        .map_err(UploadError::Persistence)?;

    info!(client_id, path = %save_path.display(), "profile picture saved");
    Ok(Html(pages::upload_success(
        1,
        &full_name,
        "Profile Picture",
        "Upload",
    )))
}

/// Write the profile image to its deterministic path. Repeated uploads
/// overwrite the prior image by design; there is only ever one current
/// profile picture per client.
fn save_profile_picture(
    state: &AppState,
    client_id: i64,
    full_name: &str,
    bytes: &[u8],
) -> Result<PathBuf> {
    let dir = &state.config.profile_pictures;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create profile picture directory {dir:?}"))?;

    let filename = format!("{}.png", storage::client_dir_name(full_name, client_id));
    let save_path = dir.join(filename);
    std::fs::write(&save_path, bytes)
        .with_context(|| format!("failed to write {save_path:?}"))?;

    if let Err(e) = normalize::normalize_orientation(&save_path) {
        warn!(path = %save_path.display(), error = %e, "could not fix orientation, keeping file as uploaded");
    }
    Ok(save_path)
}
