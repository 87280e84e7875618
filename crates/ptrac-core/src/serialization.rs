use std::fs;
use std::path::Path;

pub fn format_fixed_f64(value: f64, width: usize, precision: usize) -> String {
    format!("{value:>width$.precision$}")
}

pub fn format_fixed_i64(value: i64, width: usize) -> String {
    format!("{value:>width$}")
}

/// One `\n` per row, including the last one.
pub fn normalize_text_artifact(content: &str) -> String {
    content.lines().fold(String::with_capacity(content.len() + 1), |mut text, row| {
        text.push_str(row);
        text.push('\n');
        text
    })
}

/// Writes a table, creating missing parent directories first.
pub fn write_text_artifact(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, normalize_text_artifact(content))
}
