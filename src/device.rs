/*!
Detect the [`ResourceAttributes`] of the host the agent is running on.
*/

use std::env;

use metrix_core::ResourceAttributes;
use sysinfo::System;

const UNKNOWN: &str = "unknown";

/**
Detect the hostname and the current user.

Either falls back to `unknown` if it can't be detected. This is called once at startup and the
result is shared by every batch.
*/
pub fn detect() -> ResourceAttributes {
    ResourceAttributes::new(hostname(), username())
}

fn hostname() -> String {
    non_empty(System::host_name()).unwrap_or_else(|| UNKNOWN.to_owned())
}

fn username() -> String {
    non_empty(env::var("USER").ok())
        .or_else(|| non_empty(env::var("USERNAME").ok()))
        .unwrap_or_else(|| UNKNOWN.to_owned())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_never_empty() {
        let resource = detect();

        assert!(!resource.hostname.is_empty());
        assert!(!resource.username.is_empty());
    }

    #[test]
    fn non_empty_filters_blank() {
        assert_eq!(None, non_empty(Some("  ".into())));
        assert_eq!(None, non_empty(None));
        assert_eq!(Some("ci".to_owned()), non_empty(Some("ci".into())));
    }
}
