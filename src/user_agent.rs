//! User-Agent string shared by listing fetches and file downloads.

/// Project URL for User-Agent identification (RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/fierce/listing-mirror";

/// Default User-Agent for all requests (identifies the tool).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("listing-mirror/{version} (+{PROJECT_UA_URL})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_carries_version_and_project_url() {
        let ua = default_user_agent();
        assert!(ua.contains(PROJECT_UA_URL), "UA must contain project URL: {ua}");
        assert_eq!(
            Some(env!("CARGO_PKG_VERSION")),
            ua.strip_prefix("listing-mirror/")
                .and_then(|s| s.split(' ').next()),
            "UA must contain crate version: {ua}"
        );
    }
}
