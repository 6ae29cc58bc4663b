//! Core utilities for rclone-artifacts

/// Join a remote base path with an optional sub-path.
///
/// Remote paths always use `/`, whatever the local platform. The sub-path is
/// treated as relative to `base` even when it starts with a separator.
pub fn join_path(base: &str, sub_path: Option<&str>) -> String {
    let sub = match sub_path.map(|s| s.trim_start_matches('/')) {
        Some(sub) if !sub.is_empty() => sub,
        _ => return base.to_string(),
    };

    if base.is_empty() {
        sub.to_string()
    } else if base.ends_with('/') {
        format!("{}{}", base, sub)
    } else {
        format!("{}/{}", base, sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/experiments/42", None), "/experiments/42");
        assert_eq!(join_path("/experiments/42", Some("")), "/experiments/42");
        assert_eq!(join_path("/experiments/42", Some("run1")), "/experiments/42/run1");
        assert_eq!(join_path("/experiments/42/", Some("run1")), "/experiments/42/run1");
        assert_eq!(join_path("/experiments/42", Some("/run1/a")), "/experiments/42/run1/a");
        assert_eq!(join_path("", Some("run1")), "run1");
        assert_eq!(join_path("", None), "");
    }
}
