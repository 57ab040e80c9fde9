//! Result extraction: raw track entries to playable tracks.

use serde_json::Value;
use uuid::Uuid;

use vscore_models::Track;

/// Audio URL field names across gateway revisions, most specific first.
const AUDIO_URL_KEYS: [&str; 6] = [
    "audioUrl",
    "audio_url",
    "sourceAudioUrl",
    "source_audio_url",
    "streamAudioUrl",
    "stream_audio_url",
];

/// Image URL field names across gateway revisions.
const IMAGE_URL_KEYS: [&str; 4] = [
    "imageUrl",
    "image_url",
    "sourceImageUrl",
    "source_image_url",
];

/// Extract playable tracks from raw upstream entries.
///
/// Entries without a resolvable non-empty audio URL are dropped; an entry
/// without an id gets a synthesized one. Upstream order is preserved.
pub fn extract_tracks(entries: &[Value]) -> Vec<Track> {
    entries.iter().filter_map(track_from_entry).collect()
}

fn track_from_entry(entry: &Value) -> Option<Track> {
    let audio_url = first_string(entry, &AUDIO_URL_KEYS)?;

    let id = entry
        .get("id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    Some(Track {
        id,
        audio_url,
        image_url: first_string(entry, &IMAGE_URL_KEYS),
        title: first_string(entry, &["title"]),
        prompt: first_string(entry, &["prompt"]),
        duration_secs: entry.get("duration").and_then(Value::as_f64),
    })
}

fn first_string(entry: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| entry.get(key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_owned)
}
