//! Endpoint resolution.
//!
//! Development consoles talk to a fixed local gamebus. Production consoles
//! are deployed next to the server, so the server address is derived from
//! the console's own host by swapping the admin hostname prefix for the
//! server one (`mobile-app-admin-demo.example.com` becomes
//! `gamebus-demo.example.com`). The host is read again on every connect
//! attempt, so a host change between attempts is honored.

use std::fmt;
use std::sync::Arc;

/// Development endpoint used when nothing else is configured.
pub const DEFAULT_DEVELOPMENT_URL: &str = "ws://localhost:9001/game/admin";

/// Hostname prefix of the admin console deployment.
pub const DEFAULT_ADMIN_PREFIX: &str = "mobile-app-admin-";

/// Hostname prefix of the gamebus server deployment.
pub const DEFAULT_SERVER_PREFIX: &str = "gamebus-";

/// Path of the admin endpoint on the gamebus server.
pub const DEFAULT_ADMIN_PATH: &str = "/game/admin";

/// Supplies the host the console is currently served from.
pub trait HostSource: Send + Sync + 'static {
    fn current_host(&self) -> String;
}

impl<F> HostSource for F
where
    F: Fn() -> String + Send + Sync + 'static,
{
    fn current_host(&self) -> String {
        self()
    }
}

/// A [`HostSource`] that always returns the same host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticHost(pub String);

impl HostSource for StaticHost {
    fn current_host(&self) -> String {
        self.0.clone()
    }
}

/// Where the session manager connects.
///
/// # Example
///
/// ```
/// use gamebus_admin_client::endpoint::{Endpoint, StaticHost};
///
/// let endpoint = Endpoint::production(StaticHost("mobile-app-admin-keynote.example.com".into()));
/// assert_eq!(endpoint.resolve(), "ws://gamebus-keynote.example.com/game/admin");
/// ```
#[derive(Clone)]
pub enum Endpoint {
    /// A fixed URL.
    Development { url: String },
    /// A URL derived from the console's host on every attempt.
    Production {
        host: Arc<dyn HostSource>,
        admin_prefix: String,
        server_prefix: String,
        scheme: String,
        path: String,
    },
}

impl Endpoint {
    /// A fixed development endpoint.
    pub fn development(url: impl Into<String>) -> Self {
        Self::Development { url: url.into() }
    }

    /// A host-derived production endpoint with the default prefixes and path.
    pub fn production(host: impl HostSource) -> Self {
        Self::Production {
            host: Arc::new(host),
            admin_prefix: DEFAULT_ADMIN_PREFIX.to_string(),
            server_prefix: DEFAULT_SERVER_PREFIX.to_string(),
            scheme: "ws".to_string(),
            path: DEFAULT_ADMIN_PATH.to_string(),
        }
    }

    /// Override the hostname prefixes of a production endpoint.
    ///
    /// Has no effect on a development endpoint.
    #[must_use]
    pub fn with_prefixes(mut self, admin: impl Into<String>, server: impl Into<String>) -> Self {
        if let Self::Production {
            admin_prefix,
            server_prefix,
            ..
        } = &mut self
        {
            *admin_prefix = admin.into();
            *server_prefix = server.into();
        }
        self
    }

    /// Use `wss` instead of `ws` for a production endpoint.
    #[must_use]
    pub fn with_tls(mut self) -> Self {
        if let Self::Production { scheme, .. } = &mut self {
            *scheme = "wss".to_string();
        }
        self
    }

    /// Override the path of a production endpoint.
    #[must_use]
    pub fn with_path(mut self, new_path: impl Into<String>) -> Self {
        if let Self::Production { path, .. } = &mut self {
            *path = new_path.into();
        }
        self
    }

    /// Resolve the URL for one connect attempt.
    pub fn resolve(&self) -> String {
        match self {
            Self::Development { url } => url.clone(),
            Self::Production {
                host,
                admin_prefix,
                server_prefix,
                scheme,
                path,
            } => {
                let host = host.current_host().replacen(admin_prefix.as_str(), server_prefix, 1);
                format!("{scheme}://{host}{path}")
            }
        }
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::development(DEFAULT_DEVELOPMENT_URL)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development { url } => f.debug_struct("Development").field("url", url).finish(),
            Self::Production {
                admin_prefix,
                server_prefix,
                scheme,
                path,
                ..
            } => f
                .debug_struct("Production")
                .field("admin_prefix", admin_prefix)
                .field("server_prefix", server_prefix)
                .field("scheme", scheme)
                .field("path", path)
                .finish_non_exhaustive(),
        }
    }
}
