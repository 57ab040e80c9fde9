//! Schema normalization for status payloads.
//!
//! The gateway has shipped several payload revisions: the track list has
//! moved between key paths, the `response` object is sometimes delivered
//! as a JSON-encoded string, and per-track fields have camelCase and
//! snake_case variants. All of it collapses into one
//! [`NormalizedStatus`] here so the polling loop never sees a raw
//! payload.

use serde_json::Value;

use vscore_models::{GenerationStatus, NormalizedStatus};

use crate::extract::extract_tracks;

/// Normalize a raw status payload.
///
/// This never fails: a shape the normalizer does not recognize yields
/// `GenerationStatus::Unknown` with no tracks, which the polling loop
/// treats as non-terminal. An in-flight task is never aborted just
/// because the gateway added a status string we have not seen.
pub fn normalize(payload: &Value) -> NormalizedStatus {
    let data = payload.get("data").unwrap_or(payload);

    let raw_status = data
        .get("status")
        .and_then(Value::as_str)
        .map(str::to_owned);

    let status = raw_status
        .as_deref()
        .map(status_from_upstream)
        .unwrap_or(GenerationStatus::Unknown);

    let entries = track_entries(data);
    let tracks = extract_tracks(&entries);

    let error_message = data
        .get("errorMessage")
        .or_else(|| data.get("error_message"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned);

    NormalizedStatus {
        status,
        raw_status,
        tracks,
        error_message,
    }
}

/// Collapse an upstream status string.
fn status_from_upstream(raw: &str) -> GenerationStatus {
    match raw {
        "PENDING" | "SUBMITTED" | "QUEUED" | "RUNNING" => GenerationStatus::Pending,
        "TEXT_SUCCESS" | "FIRST_SUCCESS" | "PARTIAL" => GenerationStatus::Partial,
        "SUCCESS" | "COMPLETE" => GenerationStatus::Success,
        "CREATE_TASK_FAILED" | "GENERATE_AUDIO_FAILED" | "CALLBACK_EXCEPTION"
        | "SENSITIVE_WORD_ERROR" | "FAILED" => GenerationStatus::Failed,
        _ => GenerationStatus::Unknown,
    }
}

/// Locate the raw track list.
///
/// Candidate locations are tried most-specific-first; the first one that
/// is structurally present wins and the rest are ignored, so conflicting
/// locations are never merged:
///
/// 1. `response.sunoData` (current revision)
/// 2. `response` delivered as a JSON-encoded string of either shape
/// 3. `response.data` (previous revision)
/// 4. `data` (flat array, oldest revision)
fn track_entries(data: &Value) -> Vec<Value> {
    if let Some(response) = data.get("response") {
        if let Some(entries) = response.get("sunoData").and_then(Value::as_array) {
            return entries.clone();
        }
        if let Some(encoded) = response.as_str() {
            if let Ok(decoded) = serde_json::from_str::<Value>(encoded) {
                return track_entries_from_decoded(&decoded);
            }
            return Vec::new();
        }
        if let Some(entries) = response.get("data").and_then(Value::as_array) {
            return entries.clone();
        }
    }

    data.get("data")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn track_entries_from_decoded(decoded: &Value) -> Vec<Value> {
    if let Some(entries) = decoded.get("sunoData").and_then(Value::as_array) {
        return entries.clone();
    }
    if let Some(entries) = decoded.get("data").and_then(Value::as_array) {
        return entries.clone();
    }
    decoded.as_array().cloned().unwrap_or_default()
}
