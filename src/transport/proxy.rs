//! Proxy selection for outbound requests
//!
//! Precedence: a proxy declared in the environment, then the proxy configured
//! for this host, then a direct connection.

use std::collections::HashMap;
use std::net::IpAddr;

use reqwest::Url;
use tracing::{debug, warn};

/// Proxy environment variables, most specific first
const HTTPS_PROXY_VARS: &[&str] = &["https_proxy", "HTTPS_PROXY"];
const HTTP_PROXY_VARS: &[&str] = &["http_proxy", "HTTP_PROXY"];
const ALL_PROXY_VARS: &[&str] = &["all_proxy", "ALL_PROXY"];
const NO_PROXY_VARS: &[&str] = &["no_proxy", "NO_PROXY"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyCredentials {
    pub username: String,
    pub password: String,
}

impl ProxyCredentials {
    /// Credentials embedded in a proxy address, if any
    fn from_address(address: &Url) -> Option<Self> {
        if address.username().is_empty() {
            return None;
        }
        Some(Self {
            username: address.username().to_string(),
            password: address.password().unwrap_or_default().to_string(),
        })
    }
}

/// The proxy chosen for one target URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyDescriptor {
    pub address: Url,
    pub credentials: Option<ProxyCredentials>,
    /// Contact hosts on the local network directly
    pub bypass_on_local: bool,
}

impl ProxyDescriptor {
    pub fn into_proxy(self) -> reqwest::Proxy {
        let Self {
            address,
            credentials,
            bypass_on_local,
        } = self;

        let proxy = reqwest::Proxy::custom(move |target| {
            if bypass_on_local && is_local(target) {
                None
            } else {
                Some(address.clone())
            }
        });

        match credentials {
            Some(credentials) => proxy.basic_auth(&credentials.username, &credentials.password),
            None => proxy,
        }
    }
}

/// Whether `url` points at the local network: a dotless host name or a loopback address.
pub fn is_local(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };

    match host.trim_start_matches('[').trim_end_matches(']').parse::<IpAddr>() {
        Ok(ip) => ip.is_loopback(),
        Err(_) => !host.contains('.') || host.eq_ignore_ascii_case("localhost"),
    }
}

/// Proxy settings declared through environment variables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvProxy {
    https: Option<Url>,
    http: Option<Url>,
    all: Option<Url>,
    no_proxy: Vec<String>,
}

impl EnvProxy {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| lookup(key))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let no_proxy = first(NO_PROXY_VARS)
            .map(|value| {
                value
                    .split(',')
                    .map(|entry| entry.trim().to_ascii_lowercase())
                    .filter(|entry| !entry.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            https: first(HTTPS_PROXY_VARS).and_then(|value| parse_proxy_address(&value)),
            http: first(HTTP_PROXY_VARS).and_then(|value| parse_proxy_address(&value)),
            all: first(ALL_PROXY_VARS).and_then(|value| parse_proxy_address(&value)),
            no_proxy,
        }
    }

    /// The declared proxy for `url`, unless `no_proxy` excludes its host
    pub fn proxy_for(&self, url: &Url) -> Option<Url> {
        if self.excludes(url) {
            return None;
        }

        let by_scheme = match url.scheme() {
            "https" => self.https.as_ref(),
            "http" => self.http.as_ref(),
            _ => None,
        };

        by_scheme.or(self.all.as_ref()).cloned()
    }

    fn excludes(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();

        self.no_proxy.iter().any(|entry| {
            if entry == "*" {
                return true;
            }
            let domain = entry.trim_start_matches("*.").trim_start_matches('.');
            host == domain || host.ends_with(&format!(".{domain}"))
        })
    }
}

/// Accepts `host:port` as well as full URLs.
fn parse_proxy_address(value: &str) -> Option<Url> {
    let candidate = if value.contains("://") {
        value.to_string()
    } else {
        format!("http://{value}")
    };

    Url::parse(&candidate)
        .inspect_err(|e| warn!("Ignoring invalid proxy address '{}': {}", value, e))
        .ok()
}

/// The proxy configured for this host
pub trait SystemProxy: Send + Sync {
    /// Proxy address for `url`; returns `url` itself for a direct connection
    fn proxy_for(&self, url: &Url) -> Url;
}

/// [`SystemProxy`] with a single proxy address taken from configuration
#[derive(Debug, Clone, Default)]
pub struct ConfiguredProxy {
    address: Option<Url>,
}

impl ConfiguredProxy {
    pub fn new(address: Option<&str>) -> Self {
        Self {
            address: address.and_then(parse_proxy_address),
        }
    }
}

impl SystemProxy for ConfiguredProxy {
    fn proxy_for(&self, url: &Url) -> Url {
        self.address.clone().unwrap_or_else(|| url.clone())
    }
}

pub struct ProxyResolver {
    env: EnvProxy,
    system: Box<dyn SystemProxy>,
}

impl ProxyResolver {
    pub fn new(env: EnvProxy, system: Box<dyn SystemProxy>) -> Self {
        Self { env, system }
    }

    /// Resolver that never uses a proxy
    pub fn direct() -> Self {
        Self::new(EnvProxy::default(), Box::new(ConfiguredProxy::default()))
    }

    /// Choose the proxy for `url`, or None for a direct connection.
    pub fn resolve(&self, url: &Url) -> Option<ProxyDescriptor> {
        if let Some(address) = self.env.proxy_for(url).filter(|address| address != url) {
            debug!("Using environment proxy {} for {}", redacted(&address), url);
            return Some(ProxyDescriptor {
                credentials: ProxyCredentials::from_address(&address),
                address,
                bypass_on_local: false,
            });
        }

        let address = self.system.proxy_for(url);
        if address == *url {
            return None;
        }

        debug!("Using system proxy {} for {}", redacted(&address), url);
        Some(ProxyDescriptor {
            credentials: ProxyCredentials::from_address(&address),
            address,
            bypass_on_local: true,
        })
    }
}

fn redacted(address: &Url) -> String {
    format!(
        "{}://{}",
        address.scheme(),
        address
            .host_str()
            .map(|host| match address.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            })
            .unwrap_or_default()
    )
}
