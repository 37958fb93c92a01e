//! Utility functions for target normalization and address handling.
//!
//! This module contains helper functions used by the HTTP layer and the
//! server binary before anything reaches the probe pipeline.

use crate::error::ExporterError;

/// Normalize a raw `target` value from a probe request.
///
/// Surrounding whitespace is trimmed and, when `strip_www` is set, a single
/// literal leading `www.` is removed. A leading `-` is refused since no
/// domain label starts with one and the whois program would take it as an
/// option. Beyond that the whois program is the authority on what a valid
/// name is.
///
/// # Errors
///
/// - `EmptyTarget` if nothing is left after normalization
/// - `InvalidTarget` if the result starts with `-`
pub fn normalize_target(raw: &str, strip_www: bool) -> Result<String, ExporterError> {
    let mut target = raw.trim();

    if strip_www {
        if let Some(rest) = target.strip_prefix("www.") {
            target = rest;
        }
    }

    if target.is_empty() {
        return Err(ExporterError::EmptyTarget);
    }

    if target.starts_with('-') {
        return Err(ExporterError::invalid_target(target, "must not start with '-'"));
    }

    Ok(target.to_string())
}

/// Expand a `host:port` listen address into something `TcpListener::bind` accepts.
///
/// An empty host (`:80`) means all IPv4 interfaces. Hostnames such as
/// `localhost:8080` are passed through and resolved at bind time.
pub fn resolve_listen_address(address: &str) -> Result<String, ExporterError> {
    let address = address.trim();

    let (host, port) = address.rsplit_once(':').ok_or_else(|| {
        ExporterError::config(format!(
            "Invalid listen address '{}', expected host:port",
            address
        ))
    })?;

    if port.parse::<u16>().is_err() {
        return Err(ExporterError::config(format!(
            "Invalid port '{}' in listen address '{}'",
            port, address
        )));
    }

    if host.is_empty() {
        Ok(format!("0.0.0.0:{}", port))
    } else {
        Ok(address.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_target() {
        assert_eq!(normalize_target("example.ru", true).unwrap(), "example.ru");
        assert_eq!(normalize_target("  example.ru\n", true).unwrap(), "example.ru");
        assert_eq!(normalize_target("www.example.ru", true).unwrap(), "example.ru");
        assert_eq!(
            normalize_target("www.example.ru", false).unwrap(),
            "www.example.ru"
        );
        // Only one literal prefix is removed
        assert_eq!(
            normalize_target("www.www.example.ru", true).unwrap(),
            "www.example.ru"
        );
        // Not a prefix match on "www" without the dot
        assert_eq!(normalize_target("wwwexample.ru", true).unwrap(), "wwwexample.ru");
    }

    #[test]
    fn test_normalize_target_empty() {
        assert!(matches!(
            normalize_target("", true),
            Err(ExporterError::EmptyTarget)
        ));
        assert!(matches!(
            normalize_target("   ", true),
            Err(ExporterError::EmptyTarget)
        ));
        assert!(matches!(
            normalize_target(" www. ", true),
            Err(ExporterError::EmptyTarget)
        ));
        assert_eq!(normalize_target("www.", false).unwrap(), "www.");
    }

    #[test]
    fn test_normalize_target_rejects_option_like_names() {
        for raw in ["-hevil.example", "--version", " --help ", "www.-h"] {
            assert!(
                matches!(
                    normalize_target(raw, true),
                    Err(ExporterError::InvalidTarget { .. })
                ),
                "accepted {:?}",
                raw
            );
        }
        // Hyphens elsewhere are fine
        assert_eq!(normalize_target("my-site.ru", true).unwrap(), "my-site.ru");
        assert_eq!(normalize_target("xn--80ak6aa92e.com", true).unwrap(), "xn--80ak6aa92e.com");
    }

    #[test]
    fn test_resolve_listen_address() {
        assert_eq!(resolve_listen_address(":80").unwrap(), "0.0.0.0:80");
        assert_eq!(
            resolve_listen_address("localhost:8080").unwrap(),
            "localhost:8080"
        );
        assert_eq!(
            resolve_listen_address("127.0.0.1:9203").unwrap(),
            "127.0.0.1:9203"
        );
        assert_eq!(resolve_listen_address("[::1]:9203").unwrap(), "[::1]:9203");

        assert!(resolve_listen_address("8080").is_err());
        assert!(resolve_listen_address("localhost:http").is_err());
        assert!(resolve_listen_address("localhost:70000").is_err());
    }
}
