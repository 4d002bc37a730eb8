//! Entry management endpoints.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::Json;
use tracing::{debug, info};

use crate::error::{RegistryError, RegistryResult};
use crate::store::{NewEntry, StoredEntry};

use super::AppState;

/// Maximum length of any entry field.
const MAX_FIELD_LENGTH: usize = 255;

/// List every registered entry. An empty registry is 404, not an empty
/// list.
pub async fn list_entries(State(state): State<AppState>) -> RegistryResult<Json<Vec<StoredEntry>>> {
    let entries = state.store.all().await?;
    if entries.is_empty() {
        return Err(RegistryError::NotFound("No entries found".to_owned()));
    }
    Ok(Json(entries))
}

/// Entries of one service type. A type with no live entries is 404 so
/// clients can surface the message in their lookup results.
pub async fn entries_by_type(
    State(state): State<AppState>,
    Path(type_name): Path<String>,
) -> RegistryResult<Json<Vec<StoredEntry>>> {
    let entries = state.store.find_by_type(&type_name).await?;
    debug!(type_name = %type_name, count = entries.len(), "lookup");
    if entries.is_empty() {
        return Err(RegistryError::NotFound(format!(
            "No {type_name} entries found"
        )));
    }
    Ok(Json(entries))
}

/// Register a new entry, or renew the lease of an existing one with the
/// same uri, version and type.
pub async fn register_entry(
    State(state): State<AppState>,
    Json(entry): Json<NewEntry>,
) -> RegistryResult<Json<StoredEntry>> {
    validate(&entry)?;

    let stored = state.store.register_or_renew(entry).await?;
    info!(
        id = stored.id,
        type_name = %stored.type_name,
        uri = %stored.uri,
        version = %stored.version,
        "entry registered"
    );
    Ok(Json(stored))
}

/// Remove an entry by server-assigned id, returning its representation.
pub async fn delete_entry(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> RegistryResult<Json<StoredEntry>> {
    let Some(deleted) = state.store.delete(id).await? else {
        return Err(RegistryError::NotFound(format!(
            "Couldn't find Entry with id={id}"
        )));
    };

    info!(id = deleted.id, type_name = %deleted.type_name, "entry deleted");
    Ok(Json(deleted))
}

fn validate(entry: &NewEntry) -> RegistryResult<()> {
    let fields = [
        ("type_name", &entry.type_name),
        ("description", &entry.description),
        ("uri", &entry.uri),
        ("version", &entry.version),
    ];

    let mut problems: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in fields {
        let mut messages = Vec::new();
        if value.trim().is_empty() {
            messages.push("can't be blank".to_owned());
        }
        if value.chars().count() > MAX_FIELD_LENGTH {
            messages.push(format!(
                "is too long (maximum is {MAX_FIELD_LENGTH} characters)"
            ));
        }
        if !messages.is_empty() {
            problems.insert(name.to_owned(), messages);
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(RegistryError::Validation(problems))
    }
}
