/// Decimal units: KB below 1,000,000 bytes, MB from there on.
pub fn format_file_size(bytes: u64) -> String {
    if bytes < 1_000_000 {
        format!("{:.2} KB", bytes as f64 / 1_000.0)
    } else {
        format!("{:.2} MB", bytes as f64 / 1_000_000.0)
    }
}
