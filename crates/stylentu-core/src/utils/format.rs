/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Show only the first few characters of a token, for status output
pub fn mask_secret(secret: &str) -> String {
    const VISIBLE: usize = 4;
    let count = secret.chars().count();
    if count <= VISIBLE * 2 {
        "*".repeat(count)
    } else {
        let head: String = secret.chars().take(VISIBLE).collect();
        format!("{}...({} chars)", head, count)
    }
}
