//! Site classification by URL pattern.
//!
//! Patterns are glob-style with `*` matching any run of characters, and they
//! match against the full URL (scheme included) so `*://www.youtube.com/*`
//! covers both http and https. Classification is pure: no I/O, no clock.

use url::Url;

/// The built-in distracting-site pattern set.
pub const DEFAULT_PATTERNS: &[&str] = &[
    "*://www.youtube.com/*",
    "*://m.youtube.com/*",
    "*://www.tiktok.com/*",
    "*://www.instagram.com/*",
    "*://www.snapchat.com/*",
    "*://www.tumblr.com/*",
    "*://www.pinterest.com/*",
    "*://www.discord.com/*",
    "*://discord.com/*",
    "*://web.whatsapp.com/*",
    "*://www.reddit.com/*",
    "*://www.twitch.tv/*",
];

/// Decides whether a page URL counts as distracting.
#[derive(Debug, Clone)]
pub struct SiteClassifier {
    patterns: Vec<String>,
}

impl SiteClassifier {
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Match the full URL against the configured pattern set.
    pub fn is_distracting(&self, url: &str) -> bool {
        self.patterns.iter().any(|p| glob_match(p, url))
    }
}

impl Default for SiteClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERNS.iter().map(|p| (*p).to_string()).collect())
    }
}

/// Extract the hostname from a URL. Returns `None` for unparseable input or
/// URLs without a host. Bare hostnames are not URLs; callers that accept
/// either should fall back to the input itself.
pub fn hostname(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
}

/// The tab-query pattern covering every page on a site.
pub fn site_pattern(site: &str) -> String {
    format!("*://{site}/*")
}

/// Match one URL against one pattern. [`TabHost`](crate::platform::TabHost)
/// implementations use this to answer tab queries by URL pattern.
pub fn pattern_matches(pattern: &str, url: &str) -> bool {
    glob_match(pattern, url)
}

/// Glob match with `*` as "any run of characters". Classic two-pointer scan
/// with backtracking to the most recent star.
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if pi < p.len() && p[pi] == t[ti] {
            pi += 1;
            ti += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}
