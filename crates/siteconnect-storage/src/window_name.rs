//! `window.name` payload codec.
//!
//! `window.name` is the only per-tab value that survives a full top-level
//! navigation to another origin. Each platform owns one segment,
//! `"{PLATFORM}_OAUTH::" + base64(JSON)`, and segments are joined with `;`
//! so concurrent flows for different platforms do not overwrite each other.
//! Anything else already in `window.name` is preserved untouched.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use siteconnect_core::{PendingAuthFlow, PlatformId};

const SEGMENT_SEPARATOR: char = ';';
const TAG_SEPARATOR: &str = "::";

/// Encode one platform segment
pub fn encode_segment(flow: &PendingAuthFlow) -> Result<String> {
    let json = serde_json::to_string(flow).context("Failed to serialize pending flow")?;
    Ok(format!(
        "{}{}{}",
        flow.platform.window_name_tag(),
        TAG_SEPARATOR,
        STANDARD.encode(json)
    ))
}

/// Extract the platform's pending flow, if its segment is present and valid
pub fn read_flow(window_name: &str, platform: &PlatformId) -> Option<PendingAuthFlow> {
    let tag = platform.window_name_tag();
    window_name
        .split(SEGMENT_SEPARATOR)
        .filter_map(|segment| segment.split_once(TAG_SEPARATOR))
        .find(|(segment_tag, _)| *segment_tag == tag)
        .and_then(|(_, encoded)| STANDARD.decode(encoded).ok())
        .and_then(|bytes| serde_json::from_slice::<PendingAuthFlow>(&bytes).ok())
        .filter(|flow| flow.platform == *platform)
}

/// Return `window_name` with the flow's segment inserted or replaced
pub fn upsert(window_name: &str, flow: &PendingAuthFlow) -> Result<String> {
    let segment = encode_segment(flow)?;
    let mut segments = retain_others(window_name, &flow.platform);
    segments.push(segment);
    Ok(segments.join(&SEGMENT_SEPARATOR.to_string()))
}

/// Return `window_name` without the platform's segment
pub fn remove(window_name: &str, platform: &PlatformId) -> String {
    retain_others(window_name, platform).join(&SEGMENT_SEPARATOR.to_string())
}

fn retain_others(window_name: &str, platform: &PlatformId) -> Vec<String> {
    let prefix = format!("{}{}", platform.window_name_tag(), TAG_SEPARATOR);
    window_name
        .split(SEGMENT_SEPARATOR)
        .filter(|segment| !segment.is_empty() && !segment.starts_with(&prefix))
        .map(str::to_string)
        .collect()
}
