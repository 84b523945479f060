//! Documentation site configuration.
//!
//! The Fortify handbook is described by one declarative JSON object: site
//! metadata, the dev-server host allow-list, top navigation, sidebar
//! sections, social links and the search provider. This module only models
//! and loads that object; [`crate::site`] checks it against the pages on disk.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file unreadable: {0}")]
    Io(String),
    #[error("config parse failed: {0}")]
    Parse(String),
}

/// A labeled link in the top navigation bar or inside a sidebar section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavEntry {
    pub text: String,
    pub link: String,
}

impl NavEntry {
    pub fn new(text: &str, link: &str) -> Self {
        Self {
            text: text.to_string(),
            link: link.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidebarSection {
    pub text: String,
    #[serde(default)]
    pub items: Vec<NavEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLink {
    /// Icon identifier understood by the theme, e.g. `github`.
    pub icon: String,
    pub link: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchProvider {
    /// Client-side index built with the site.
    #[default]
    Local,
    Algolia,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub provider: SearchProvider,
}

/// Which host names may reach the preview server: `true` for any,
/// `false` for loopback only, or an explicit list on top of loopback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AllowedHosts {
    Any(bool),
    List(Vec<String>),
}

impl Default for AllowedHosts {
    fn default() -> Self {
        AllowedHosts::Any(false)
    }
}

impl AllowedHosts {
    /// A list entry with a leading dot (`.example.org`) also admits every
    /// subdomain.
    pub fn permits(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        if matches!(host.as_str(), "localhost" | "127.0.0.1" | "::1" | "[::1]") {
            return true;
        }
        match self {
            AllowedHosts::Any(any) => *any,
            AllowedHosts::List(hosts) => hosts.iter().any(|allowed| {
                let allowed = allowed.to_ascii_lowercase();
                match allowed.strip_prefix('.') {
                    Some(domain) => host == domain || host.ends_with(&allowed),
                    None => host == allowed,
                }
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default)]
    pub allowed_hosts: AllowedHosts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub nav: Vec<NavEntry>,
    #[serde(default)]
    pub sidebar: Vec<SidebarSection>,
    #[serde(default)]
    pub social_links: Vec<SocialLink>,
    #[serde(default)]
    pub search: SearchConfig,
}

impl SiteConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(format!("{e}")))
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(format!("{e}")))
    }

    /// Every navigation and sidebar entry, nav first, in declaration order.
    pub fn links(&self) -> impl Iterator<Item = &NavEntry> {
        self.nav
            .iter()
            .chain(self.sidebar.iter().flat_map(|section| section.items.iter()))
    }
}

/// Loads the site configuration from a JSON file.
pub fn load_config(path: impl AsRef<Path>) -> Result<SiteConfig, ConfigError> {
    let raw_json = fs::read_to_string(&path).map_err(|e| ConfigError::Io(format!("{e}")))?;
    SiteConfig::from_json(&raw_json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::NamedTempFile;

    fn sample() -> serde_json::Value {
        json!({
            "title": "Fortify",
            "description": "Encrypt files and split keys",
            "server": { "allowedHosts": ["docs.internal", ".example.org"] },
            "nav": [
                { "text": "Home", "link": "/" },
                { "text": "Guide", "link": "/guide/" }
            ],
            "sidebar": [
                {
                    "text": "Guide",
                    "items": [
                        { "text": "Install", "link": "/guide/install" },
                        { "text": "Shamir", "link": "/guide/sss" }
                    ]
                }
            ],
            "socialLinks": [ { "icon": "github", "link": "https://github.com/i3ash/fortify" } ],
            "search": { "provider": "local" }
        })
    }

    #[test]
    fn loads_config_from_disk() {
        let file = NamedTempFile::new().expect("temp file");
        fs::write(file.path(), serde_json::to_vec(&sample()).unwrap()).unwrap();

        let config = load_config(file.path()).expect("config should load");
        assert_eq!(config.title, "Fortify");
        assert_eq!(config.nav.len(), 2);
        assert_eq!(config.sidebar[0].items[1].link, "/guide/sss");
        assert_eq!(config.social_links[0].icon, "github");
        assert_eq!(config.search.provider, SearchProvider::Local);
    }

    #[test]
    fn links_cover_nav_then_sidebar() {
        let config: SiteConfig = serde_json::from_value(sample()).unwrap();
        let links: Vec<&str> = config.links().map(|e| e.link.as_str()).collect();
        assert_eq!(links, ["/", "/guide/", "/guide/install", "/guide/sss"]);
    }

    #[test]
    fn optional_sections_default() {
        let config = SiteConfig::from_json(r#"{"title":"t","description":"d"}"#).unwrap();
        assert!(config.nav.is_empty());
        assert_eq!(config.server.allowed_hosts, AllowedHosts::Any(false));
        assert_eq!(config.search.provider, SearchProvider::Local);
    }

    #[test]
    fn reports_parse_and_io_failures() {
        let err = SiteConfig::from_json(r#"{"title": 3}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        let err = load_config("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn allowed_hosts_accepts_bool_or_list() {
        let open: ServerConfig = serde_json::from_str(r#"{"allowedHosts": true}"#).unwrap();
        assert!(open.allowed_hosts.permits("anything.test"));

        let closed = AllowedHosts::Any(false);
        assert!(closed.permits("localhost"));
        assert!(!closed.permits("docs.internal"));

        let config: SiteConfig = serde_json::from_value(sample()).unwrap();
        let hosts = &config.server.allowed_hosts;
        assert!(hosts.permits("docs.internal"));
        assert!(hosts.permits("DOCS.INTERNAL."));
        assert!(hosts.permits("example.org"));
        assert!(hosts.permits("preview.example.org"));
        assert!(!hosts.permits("badexample.org"));
        assert!(!hosts.permits("other.host"));
    }

    #[test]
    fn round_trips_through_pretty_json() {
        let config: SiteConfig = serde_json::from_value(sample()).unwrap();
        let text = config.to_json_pretty().unwrap();
        assert!(text.contains("\"socialLinks\""));
        assert!(text.contains("\"allowedHosts\""));
        assert_eq!(SiteConfig::from_json(&text).unwrap(), config);
    }
}
