//! Name sanitization shared by chart and dimension creation (§4.4).
//!
//! Ids are derived from collector-supplied names by keeping only
//! `[A-Za-z0-9._-]`, collapsing runs of anything else into a single `_`, and
//! trimming leading/trailing `_`. An empty result falls back to `"unnamed"`.

/// Sanitizes a raw collector-supplied name into a safe id fragment.
#[must_use]
pub fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_sep = false;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
            out.push(c);
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Disambiguates `candidate` against `taken` by appending `_2`, `_3`, ... until
/// the result is free. Used when a sanitized name collides with an existing
/// one that identifies a different entity.
pub fn disambiguate(candidate: &str, mut taken: impl FnMut(&str) -> bool) -> String {
    if !taken(candidate) {
        return candidate.to_string();
    }
    let mut n = 2u32;
    loop {
        let attempt = format!("{candidate}_{n}");
        if !taken(&attempt) {
            return attempt;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_safe_characters() {
        assert_eq!(sanitize("cpu.usage-total_1"), "cpu.usage-total_1");
    }

    #[test]
    fn collapses_runs_of_unsafe_characters() {
        assert_eq!(sanitize("disk sda1 (read/write)"), "disk_sda1_read_write");
    }

    #[test]
    fn falls_back_when_nothing_survives() {
        assert_eq!(sanitize("!!!"), "unnamed");
    }

    #[test]
    fn disambiguates_on_collision() {
        let taken = ["web", "web_2"];
        let result = disambiguate("web", |s| taken.contains(&s));
        assert_eq!(result, "web_3");
    }
}
