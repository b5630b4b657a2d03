//! Model selection from a live catalog.
//!
//! Backend catalogs change under a fixed key: a model that existed last
//! month may now 404. Selection therefore runs against the catalog fetched
//! for this very call, preferring known-good identifiers and falling back to
//! whatever the backend lists first.

use crate::backend::ModelInfo;
use crate::error::NexusPathError;
use tracing::debug;

/// Identifiers of catalog entries that can generate content.
///
/// The backend's `models/` resource prefix is stripped and duplicates are
/// dropped; catalog order is kept.
pub fn compatible_models(catalog: &[ModelInfo]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for model in catalog.iter().filter(|m| m.supports_generation()) {
        let id = model.id.strip_prefix("models/").unwrap_or(&model.id);
        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
    }
    ids
}

/// Pick a model: the first `priority` entry present in `available`, else the
/// first available model.
///
/// # Errors
/// [`NexusPathError::NoCompatibleModels`] when `available` is empty.
pub fn select_model<S: AsRef<str>>(
    available: &[String],
    priority: &[S],
) -> Result<String, NexusPathError> {
    if let Some(preferred) = priority
        .iter()
        .map(|p| p.as_ref())
        .find(|p: &&str| available.iter().any(|a| a == p))
    {
        debug!("Selected preferred model {}", preferred);
        return Ok(preferred.to_string());
    }

    let fallback = available.first().ok_or(NexusPathError::NoCompatibleModels)?;
    debug!("No preferred model available; falling back to {}", fallback);
    Ok(fallback.clone())
}
