// Utility functions

/// Product slug: lowercase, runs of anything but `[a-z0-9]` become one `-`, no leading/trailing `-`.
pub fn to_slug(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Last path segment of a URL, for log lines.
pub fn file_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}
