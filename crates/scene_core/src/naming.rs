use url::Url;

use crate::settings::DEFAULT_FOLDER_NAME;
use crate::PromptId;

const FALLBACK_EXTENSION: &str = "png";
const KNOWN_EXTENSIONS: &[&str] = &["png", "jpg", "webp", "gif", "avif"];
const MAX_FOLDER_CHARS: usize = 80;

/// Deterministic output name: `{folder}/Scene {id} Image {n}.{ext}`, `n` 1-based.
pub fn output_filename(folder: &str, prompt_id: PromptId, image_index: usize, url: &str) -> String {
    let ext = output_extension(url);
    format!("{folder}/Scene {prompt_id} Image {image_index}.{ext}")
}

/// Picks a file extension from the output URL. `blob:` URLs carry no type
/// information, so they and anything unrecognised fall back to `png`.
pub fn output_extension(url: &str) -> &'static str {
    if let Some(rest) = url.strip_prefix("data:image/") {
        let subtype = rest.split([';', ',']).next().unwrap_or_default();
        return known_extension(subtype);
    }
    let Ok(parsed) = Url::parse(url) else {
        return FALLBACK_EXTENSION;
    };
    if !matches!(parsed.scheme(), "http" | "https" | "file") {
        return FALLBACK_EXTENSION;
    }
    parsed
        .path_segments()
        .and_then(|segments| segments.last())
        .and_then(|last| last.rsplit_once('.'))
        .map_or(FALLBACK_EXTENSION, |(_, ext)| known_extension(ext))
}

fn known_extension(raw: &str) -> &'static str {
    let lowered = raw.to_ascii_lowercase();
    let normalized = match lowered.as_str() {
        "jpeg" => "jpg",
        other => other,
    };
    KNOWN_EXTENSIONS
        .iter()
        .copied()
        .find(|known| *known == normalized)
        .unwrap_or(FALLBACK_EXTENSION)
}

/// Single path segment safe on every desktop platform. Separators are
/// replaced, so a folder name never escapes the download root.
pub fn sanitize_folder_name(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]);

    // Collapse multiple underscores
    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' {
            if !prev_underscore {
                compacted.push(c);
            }
            prev_underscore = true;
        } else {
            compacted.push(c);
            prev_underscore = false;
        }
    }

    let truncated: String = compacted.chars().take(MAX_FOLDER_CHARS).collect();
    let mut final_name = truncated.trim_end_matches(&[' ', '.'][..]).to_string();
    if final_name.is_empty() {
        return DEFAULT_FOLDER_NAME.to_string();
    }
    if is_reserved_windows_name(&final_name) {
        final_name.push('_');
    }
    final_name
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}
