use sha2::{Digest, Sha256};

use omni_core::TargetFormat;

/// Output name for a converted file: `omni_{stem}.{ext}`.
///
/// The stem is everything before the first dot of the input name, made safe
/// for every common filesystem.
pub fn output_filename(input_name: &str, target: TargetFormat) -> String {
    let base = input_name.rsplit(['/', '\\']).next().unwrap_or(input_name);
    let stem = base.split('.').next().unwrap_or(base);
    format!("omni_{}.{}", sanitize(stem, "output"), target.extension())
}

/// `variant` 1 is `name` itself; later variants insert `-{variant}` before
/// the extension: `omni_clip.mp4`, `omni_clip-2.mp4`, ...
pub fn numbered_filename(name: &str, variant: usize) -> String {
    if variant <= 1 {
        return name.to_string();
    }
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}-{}{}", &name[..dot], variant, &name[dot..]),
        _ => format!("{name}-{variant}"),
    }
}

/// Stable on-disk name for a key-value entry: `{sanitized_key}--{short_hash(key)}.value`.
///
/// The hash keeps keys distinct even when sanitizing maps two of them to the
/// same text.
pub fn key_filename(key: &str) -> String {
    format!("{}--{}.value", sanitize(key, "key"), short_hash(key))
}

fn sanitize(input: &str, fallback: &str) -> String {
    let replaced: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let trimmed = replaced.trim_matches(&['_', ' ', '.'][..]);
    if trimmed.is_empty() {
        return fallback.to_string();
    }
    // Collapse runs of underscores.
    let mut compacted = String::with_capacity(trimmed.len());
    let mut prev_underscore = false;
    for c in trimmed.chars() {
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
    if compacted.chars().count() > 80 {
        compacted = compacted.chars().take(80).collect();
    }
    if is_reserved_windows_name(&compacted) {
        compacted.push('_');
    }
    compacted
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

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut hex = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
