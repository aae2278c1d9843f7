//! User-Agent sent with catalog and file requests.

/// `albumdl/<version>`.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    format!("albumdl/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_carries_version() {
        let ua = default_user_agent();
        assert!(ua.starts_with("albumdl/"));
        assert!(ua.ends_with(env!("CARGO_PKG_VERSION")));
    }
}
