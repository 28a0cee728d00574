use std::path::Path;

/// Audio extensions a car stereo plays. Matched as an exact,
/// case-sensitive suffix of the file name.
pub const AUDIO_EXTENSIONS: [&str; 5] = [".mp3", ".wav", ".aac", ".flac", ".wma"];

/// Marker appended to a file stem when the sanitized name is already taken.
pub const RENAMED_MARKER: &str = "-RENAMED";

const CYRILLIC: &str = "АБВГДЕЁЖЗИЙКЛМНОПРСТУФХЦЧШЩЪЫЬЭЮЯабвгдеёжзийклмнопрстуфхцчшщъыьэюя";

/// Check whether a character may appear in a filename on the stereo.
pub fn is_allowed_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ' ') || CYRILLIC.contains(c)
}

/// Check whether a file name carries one of the supported audio extensions.
pub fn is_audio_file_name(name: &str) -> bool {
    AUDIO_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// Sanitize a filename by keeping only allow-listed characters
pub fn sanitize_filename(name: &str) -> String {
    name.chars().filter(|c| is_allowed_char(*c)).collect()
}

/// Split a file name into stem and extension (extension includes the dot).
///
/// Audio extensions always split off, even from an empty stem, so a name
/// sanitized down to `.mp3` keeps playing after a rename. For other names a
/// leading dot does not start an extension.
pub fn split_stem_extension(name: &str) -> (&str, &str) {
    if let Some(ext) = AUDIO_EXTENSIONS.iter().find(|ext| name.ends_with(*ext)) {
        return name.split_at(name.len() - ext.len());
    }
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

/// Append the rename marker to the stem of `name`.
pub fn with_renamed_marker(name: &str) -> String {
    let (stem, ext) = split_stem_extension(name);
    format!("{}{}{}", stem, RENAMED_MARKER, ext)
}

/// Find a free name for `candidate` inside `dir`.
///
/// While `exists(dir/candidate)` holds, the marker is appended to the stem.
/// The stem grows on every step, so the loop cannot revisit a name.
pub fn resolve_collision<F>(dir: &Path, candidate: &str, exists: F) -> String
where
    F: Fn(&Path) -> bool,
{
    let mut name = candidate.to_string();
    while exists(&dir.join(&name)) {
        name = with_renamed_marker(&name);
    }
    name
}
