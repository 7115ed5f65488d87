use std::sync::Arc;

/// What kind of visitor is asking for a short link. Drives UX routing only
/// (redirect vs. metadata page); never an access-control decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequesterClass {
    Crawler,
    Human,
}

/// Link-preview bots of messaging apps, social platforms, and search
/// indexers. Matched case-insensitively as substrings of the user agent.
const DEFAULT_SIGNATURES: &[&str] = &[
    "whatsapp",
    "facebookexternalhit",
    "facebot",
    "twitterbot",
    "telegrambot",
    "slackbot",
    "discordbot",
    "linkedinbot",
    "pinterestbot",
    "skypeuripreview",
    "viber",
    "snapchat",
    "vkshare",
    "redditbot",
    "googlebot",
    "bingbot",
];

/// Classifies requesters against an allow-list of crawler signatures.
/// Unknown or empty user agents default to [`RequesterClass::Human`].
#[derive(Clone)]
pub struct CrawlerDetector {
    signatures: Arc<Vec<String>>,
}

impl CrawlerDetector {
    /// Built-in signature set plus any extra signatures from configuration.
    pub fn new(extra_signatures: &[String]) -> Self {
        let mut signatures: Vec<String> = DEFAULT_SIGNATURES
            .iter()
            .map(|s| s.to_string())
            .collect();
        for extra in extra_signatures {
            let extra = extra.to_ascii_lowercase();
            if !extra.is_empty() && !signatures.contains(&extra) {
                signatures.push(extra);
            }
        }
        Self {
            signatures: Arc::new(signatures),
        }
    }

    pub fn classify(&self, user_agent: &str) -> RequesterClass {
        let ua = user_agent.to_ascii_lowercase();
        if self.signatures.iter().any(|sig| ua.contains(sig.as_str())) {
            RequesterClass::Crawler
        } else {
            RequesterClass::Human
        }
    }
}

impl Default for CrawlerDetector {
    fn default() -> Self {
        Self::new(&[])
    }
}
