//! Base URL parsing and resource path assembly

use core::fmt::Write;

use heapless::String;

use crate::error::ConfigError;

/// Capacity of an assembled resource path (`/prefix/cse/ae/container`)
pub const PATH_CAPACITY: usize = 128;

/// Capacity of a full target URL used for logging
pub const URL_CAPACITY: usize = 192;

/// Default HTTPS port
pub const HTTPS_PORT: u16 = 443;

/// Request path on the server, always starting with `/`
pub type ResourcePath = String<PATH_CAPACITY>;

/// Parsed `https://` base URL of the resource-tree server
///
/// Trailing slashes on the base URL are dropped, so `https://h/` and
/// `https://h` address the same resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint<'a> {
    host: &'a str,
    port: u16,
    base_path: &'a str,
}

impl<'a> Endpoint<'a> {
    /// Parse `https://host[:port][/prefix][/]`.
    ///
    /// Plain `http://` is refused; there is no unauthenticated transport.
    pub fn parse(base_url: &'a str) -> Result<Self, ConfigError> {
        let rest = strip_scheme(base_url, "https://").ok_or_else(|| {
            if strip_scheme(base_url, "http://").is_some() {
                ConfigError::InsecureScheme
            } else {
                ConfigError::UnsupportedScheme
            }
        })?;

        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, ""),
        };

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .ok()
                    .filter(|p| *p != 0)
                    .ok_or(ConfigError::InvalidPort)?;
                (host, port)
            }
            None => (authority, HTTPS_PORT),
        };

        if host.is_empty() {
            return Err(ConfigError::MissingHost);
        }

        Ok(Self {
            host,
            port,
            base_path: path.trim_end_matches('/'),
        })
    }

    /// Server host name (for DNS, SNI and the `Host` header)
    pub fn host(&self) -> &'a str {
        self.host
    }

    /// Server TCP port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Path of the resource named by `segments` under the base URL.
    pub fn resource_path(&self, segments: &[&str]) -> Result<ResourcePath, ConfigError> {
        let mut path = ResourcePath::new();
        path.push_str(self.base_path)
            .map_err(|_| ConfigError::PathTooLong)?;
        for segment in segments {
            path.push('/').map_err(|_| ConfigError::PathTooLong)?;
            path.push_str(segment)
                .map_err(|_| ConfigError::PathTooLong)?;
        }
        if path.is_empty() {
            path.push('/').map_err(|_| ConfigError::PathTooLong)?;
        }
        Ok(path)
    }

    /// Full `https://` URL of `path`, for logging.
    pub fn url(&self, path: &str) -> Result<String<URL_CAPACITY>, ConfigError> {
        let mut url = String::new();
        write!(url, "https://{}", self.host).map_err(|_| ConfigError::PathTooLong)?;
        if self.port != HTTPS_PORT {
            write!(url, ":{}", self.port).map_err(|_| ConfigError::PathTooLong)?;
        }
        url.push_str(path).map_err(|_| ConfigError::PathTooLong)?;
        Ok(url)
    }
}

fn strip_scheme<'s>(url: &'s str, scheme: &str) -> Option<&'s str> {
    url.get(..scheme.len())
        .filter(|prefix| prefix.eq_ignore_ascii_case(scheme))
        .map(|_| &url[scheme.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEGMENTS: [&str; 3] = ["Mobius", "AE-Sensor", "light"];

    #[test]
    fn test_trailing_slash_normalization() {
        let with_slash = Endpoint::parse("https://192.168.0.10:443/").unwrap();
        let without = Endpoint::parse("https://192.168.0.10:443").unwrap();
        assert_eq!(with_slash, without);
        assert_eq!(
            with_slash.resource_path(&SEGMENTS).unwrap(),
            without.resource_path(&SEGMENTS).unwrap()
        );
        assert_eq!(
            without.resource_path(&SEGMENTS).unwrap().as_str(),
            "/Mobius/AE-Sensor/light"
        );
    }

    #[test]
    fn test_base_path_prefix() {
        let endpoint = Endpoint::parse("https://example.org/onem2m/").unwrap();
        assert_eq!(endpoint.host(), "example.org");
        assert_eq!(endpoint.port(), 443);
        assert_eq!(
            endpoint.resource_path(&SEGMENTS).unwrap().as_str(),
            "/onem2m/Mobius/AE-Sensor/light"
        );
    }

    #[test]
    fn test_custom_port_in_url() {
        let endpoint = Endpoint::parse("HTTPS://mobius.local:8443").unwrap();
        assert_eq!(endpoint.port(), 8443);
        let path = endpoint.resource_path(&SEGMENTS).unwrap();
        assert_eq!(
            endpoint.url(&path).unwrap().as_str(),
            "https://mobius.local:8443/Mobius/AE-Sensor/light"
        );

        let default_port = Endpoint::parse("https://mobius.local:443").unwrap();
        assert_eq!(
            default_port.url("/Mobius").unwrap().as_str(),
            "https://mobius.local/Mobius"
        );
    }

    #[test]
    fn test_rejected_urls() {
        assert_eq!(
            Endpoint::parse("http://mobius.local"),
            Err(ConfigError::InsecureScheme)
        );
        assert_eq!(
            Endpoint::parse("mqtt://mobius.local"),
            Err(ConfigError::UnsupportedScheme)
        );
        assert_eq!(Endpoint::parse("https://:443"), Err(ConfigError::MissingHost));
        assert_eq!(
            Endpoint::parse("https://mobius.local:0"),
            Err(ConfigError::InvalidPort)
        );
        assert_eq!(
            Endpoint::parse("https://mobius.local:https"),
            Err(ConfigError::InvalidPort)
        );
    }

    #[test]
    fn test_resource_path_overflow() {
        let endpoint = Endpoint::parse("https://h").unwrap();
        let long = "x".repeat(PATH_CAPACITY);
        assert_eq!(
            endpoint.resource_path(&[long.as_str()]),
            Err(ConfigError::PathTooLong)
        );
    }
}
