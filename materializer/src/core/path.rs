//! Helpers for splitting step paths into tree segments.

/// Split a `/`-delimited step path into its segments.
///
/// Empty and `.` segments are dropped. Returns `None` when nothing usable
/// remains or any segment is `..`.
pub fn split_segments(path: &str) -> Option<Vec<&str>> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment.trim() {
            "" | "." => continue,
            ".." => return None,
            _ => segments.push(segment),
        }
    }
    if segments.is_empty() {
        return None;
    }
    Some(segments)
}

/// Return the `/`-prefixed node path for the first `depth` segments.
pub fn prefix_path(segments: &[&str], depth: usize) -> String {
    let mut path = String::new();
    for segment in &segments[..depth] {
        path.push('/');
        path.push_str(segment);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_segments_drops_empty_and_dot_segments() {
        assert_eq!(
            split_segments("/src//./components/App.tsx"),
            Some(vec!["src", "components", "App.tsx"])
        );
    }

    #[test]
    fn split_segments_rejects_parent_and_empty_paths() {
        assert_eq!(split_segments("src/../etc/passwd"), None);
        assert_eq!(split_segments("//"), None);
        assert_eq!(split_segments(""), None);
    }

    #[test]
    fn prefix_path_is_slash_prefixed() {
        let segments = ["src", "components", "App.tsx"];
        assert_eq!(prefix_path(&segments, 1), "/src");
        assert_eq!(prefix_path(&segments, 3), "/src/components/App.tsx");
    }
}
