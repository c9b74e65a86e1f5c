#![forbid(unsafe_code)]

//! The pre-rendered page block carrying a request snapshot.
//!
//! The snapshot travels inside `<script type="text/wadehttp">…</script>`.
//! Script content is raw text, so the only escaping needed is keeping `</`
//! from closing the element early; `<\/` is still valid JSON.

use regex::RegexBuilder;

use crate::error::SnapshotError;

/// Compiled size cap for the script element matcher.
const MATCHER_SIZE_LIMIT: usize = 1 << 20;

/// Text of the first `<script>` element whose `type` is `script_type`.
///
/// Fails only when no matcher can be built for `script_type`.
pub fn snapshot_from_html(
    html: &str,
    script_type: &str,
) -> Result<Option<String>, SnapshotError> {
    let pattern = format!(
        r#"(?is)<script\b[^>]*\btype\s*=\s*["']{}["'][^>]*>(.*?)</script\s*>"#,
        regex::escape(script_type)
    );
    let re = RegexBuilder::new(&pattern)
        .size_limit(MATCHER_SIZE_LIMIT)
        .build()
        .map_err(|source| SnapshotError::ScriptType {
            script_type: script_type.to_string(),
            source,
        })?;
    Ok(re
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string()))
}

/// Script element embedding `snapshot_json`.
#[must_use]
pub fn render_snapshot_block(snapshot_json: &str, script_type: &str) -> String {
    format!(
        r#"<script type="{}">{}</script>"#,
        script_type.replace('"', "&quot;"),
        snapshot_json.replace("</", "<\\/")
    )
}
