//! Built-in handbook layouts and the link checker.
//!
//! Two layouts ship with the tool: a minimal one that only links the guide
//! and reference landing pages, and a full one that also links every guide
//! chapter. They are alternatives, never merged. `validate` checks either
//! one (or a config loaded from disk) against a directory of markdown pages.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::{
    AllowedHosts, NavEntry, SearchConfig, SearchProvider, ServerConfig, SidebarSection, SiteConfig,
    SocialLink,
};

pub const SITE_TITLE: &str = "Fortify";
pub const SITE_DESCRIPTION: &str = "Fortify is a command-line tool that encrypts files with a 256-bit key and \
     protects that key with Shamir's Secret Sharing, a passphrase or an RSA key pair.";
pub const REPOSITORY_URL: &str = "https://github.com/i3ash/fortify";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Minimal,
    Full,
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "minimal" => Ok(Variant::Minimal),
            "full" => Ok(Variant::Full),
            other => Err(format!("unknown site variant '{other}' (expected minimal or full)")),
        }
    }
}

impl Variant {
    pub fn config(self) -> SiteConfig {
        let (nav, sidebar) = match self {
            Variant::Minimal => (
                vec![
                    NavEntry::new("Home", "/"),
                    NavEntry::new("Guide", "/guide/"),
                    NavEntry::new("Reference", "/reference/cli"),
                ],
                vec![SidebarSection {
                    text: "Introduction".to_string(),
                    items: vec![
                        NavEntry::new("What is Fortify?", "/guide/"),
                        NavEntry::new("Getting Started", "/guide/getting-started"),
                    ],
                }],
            ),
            Variant::Full => (
                vec![
                    NavEntry::new("Home", "/"),
                    NavEntry::new("Guide", "/guide/"),
                    NavEntry::new("Reference", "/reference/cli"),
                    NavEntry::new("Changelog", "/changelog"),
                ],
                vec![
                    SidebarSection {
                        text: "Introduction".to_string(),
                        items: vec![
                            NavEntry::new("What is Fortify?", "/guide/"),
                            NavEntry::new("Getting Started", "/guide/getting-started"),
                        ],
                    },
                    SidebarSection {
                        text: "Guide".to_string(),
                        items: vec![
                            NavEntry::new("Encrypting Files", "/guide/encrypt"),
                            NavEntry::new("Decrypting Files", "/guide/decrypt"),
                            NavEntry::new("Shamir's Secret Sharing", "/guide/sss"),
                            NavEntry::new("Executing Programs", "/guide/execute"),
                        ],
                    },
                    SidebarSection {
                        text: "Reference".to_string(),
                        items: vec![
                            NavEntry::new("Command Line", "/reference/cli"),
                            NavEntry::new("File Format", "/reference/file-format"),
                        ],
                    },
                ],
            ),
        };

        SiteConfig {
            title: SITE_TITLE.to_string(),
            description: SITE_DESCRIPTION.to_string(),
            server: ServerConfig {
                allowed_hosts: AllowedHosts::Any(true),
            },
            nav,
            sidebar,
            social_links: vec![SocialLink {
                icon: "github".to_string(),
                link: REPOSITORY_URL.to_string(),
            }],
            search: SearchConfig {
                provider: SearchProvider::Local,
            },
        }
    }
}

/// Something wrong with a site configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    EmptyTitle,
    EmptyDescription,
    EmptyLinkText { link: String },
    EmptySection { section: String },
    BrokenLink { link: String, expected: PathBuf },
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::EmptyTitle => write!(f, "title is empty"),
            Problem::EmptyDescription => write!(f, "description is empty"),
            Problem::EmptyLinkText { link } => write!(f, "link {link} has no text"),
            Problem::EmptySection { section } => write!(f, "sidebar section '{section}' has no items"),
            Problem::BrokenLink { link, expected } => {
                write!(f, "link {link} does not resolve; expected {}", expected.display())
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub problems: Vec<Problem>,
    pub checked_links: usize,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return write!(f, "ok: {} links resolve", self.checked_links);
        }
        writeln!(f, "{} problem(s):", self.problems.len())?;
        for problem in &self.problems {
            writeln!(f, "  - {problem}")?;
        }
        Ok(())
    }
}

fn is_external(link: &str) -> bool {
    link.starts_with("mailto:") || link.starts_with("//") || link.contains("://")
}

/// `#anchor` and `?query` stay on whatever page holds the link.
fn is_same_page(link: &str) -> bool {
    link.is_empty() || link.starts_with('#') || link.starts_with('?')
}

/// Maps a site link onto the markdown page that renders it, relative to
/// `root`. External and same-page links are not pages and map to `None`.
///
/// `/` is `index.md`, `/a/` is `a/index.md`, `/a/b` is `a/b.md` (or
/// `a/b/index.md` when only that exists), and `.html`/`.md` suffixes are
/// accepted.
pub fn page_for_link(root: &Path, link: &str) -> Option<PathBuf> {
    if is_external(link) || is_same_page(link) {
        return None;
    }
    let path = link.split(|c| c == '#' || c == '?').next().unwrap_or_default();
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return Some(root.join("index.md"));
    }
    if path.ends_with('/') {
        return Some(root.join(path).join("index.md"));
    }
    let stem = path
        .strip_suffix(".html")
        .or_else(|| path.strip_suffix(".md"))
        .unwrap_or(path);
    let page = root.join(format!("{stem}.md"));
    if page.is_file() {
        return Some(page);
    }
    let index = root.join(stem).join("index.md");
    if index.is_file() {
        return Some(index);
    }
    Some(page)
}

/// Checks metadata and every internal link of `config` against `root`.
pub fn validate(config: &SiteConfig, root: &Path) -> ValidationReport {
    let mut report = ValidationReport::default();
    if config.title.trim().is_empty() {
        report.problems.push(Problem::EmptyTitle);
    }
    if config.description.trim().is_empty() {
        report.problems.push(Problem::EmptyDescription);
    }
    for section in &config.sidebar {
        if section.items.is_empty() {
            report.problems.push(Problem::EmptySection {
                section: section.text.clone(),
            });
        }
    }
    for entry in config.links() {
        if entry.text.trim().is_empty() {
            report.problems.push(Problem::EmptyLinkText {
                link: entry.link.clone(),
            });
        }
        let Some(page) = page_for_link(root, &entry.link) else {
            log::debug!("skipping link {} (not a page)", entry.link);
            continue;
        };
        report.checked_links += 1;
        if !page.is_file() {
            report.problems.push(Problem::BrokenLink {
                link: entry.link.clone(),
                expected: page,
            });
        }
    }
    report
}
