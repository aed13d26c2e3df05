//! Content classification
//!
//! Maps a query (and optionally the domains its results come from) to a
//! [`ContentType`], which fixes the default cache TTL.
//!
//! Source domains win over query text. Within each input the buckets are
//! checked in the order realtime, time-sensitive, static; nothing matching
//! means [`ContentType::Daily`]. Classification is a pure function of its
//! input, so the same query always lands in the same bucket.

use crate::value_objects::ContentType;
use regex::Regex;
use std::sync::LazyLock;

/// Sites serving live data
pub const REALTIME_DOMAINS: &[&str] = &[
    "weather.com",
    "accuweather.com",
    "wunderground.com",
    "flightaware.com",
    "flightradar24.com",
    "timeanddate.com",
    "xe.com",
    "marketwatch.com",
];

/// News and event sites
pub const TIME_SENSITIVE_DOMAINS: &[&str] = &[
    "cnn.com",
    "bbc.com",
    "bbc.co.uk",
    "reuters.com",
    "apnews.com",
    "nytimes.com",
    "theguardian.com",
    "eventbrite.com",
    "ticketmaster.com",
];

/// Reference sites
pub const STATIC_DOMAINS: &[&str] = &[
    "wikipedia.org",
    "wikivoyage.org",
    "britannica.com",
    "history.com",
    "unesco.org",
    "nationalgeographic.com",
];

/// Query terms implying live data
pub const REALTIME_KEYWORDS: &[&str] = &[
    "now",
    "right now",
    "current",
    "currently",
    "live",
    "real-time",
    "realtime",
    "weather",
    "temperature",
    "flight status",
    "departures",
    "arrivals",
    "exchange rate",
    "stock price",
    "traffic",
];

/// Query terms implying news or events
pub const TIME_SENSITIVE_KEYWORDS: &[&str] = &[
    "news",
    "latest",
    "breaking",
    "today",
    "tonight",
    "this week",
    "this weekend",
    "upcoming",
    "event",
    "events",
    "schedule",
    "deal",
    "deals",
    "price",
    "prices",
];

/// Query terms implying reference material
pub const STATIC_KEYWORDS: &[&str] = &[
    "history",
    "historical",
    "biography",
    "definition",
    "meaning",
    "origin",
    "origins",
    "ancient",
    "founded",
    "architecture",
    "geography",
    "culture",
];

static REALTIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| keyword_pattern(REALTIME_KEYWORDS));
static TIME_SENSITIVE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| keyword_pattern(TIME_SENSITIVE_KEYWORDS));
static STATIC_PATTERN: LazyLock<Regex> = LazyLock::new(|| keyword_pattern(STATIC_KEYWORDS));

/// Classify a query, letting source domains take priority
///
/// # Example
///
/// ```
/// use waypoint_domain::classifier::classify;
/// use waypoint_domain::value_objects::ContentType;
///
/// assert_eq!(classify("current weather in Rome", &[]), ContentType::Realtime);
/// assert_eq!(classify("Rome travel guide", &["wikipedia.org"]), ContentType::Static);
/// ```
pub fn classify(query: &str, domains: &[&str]) -> ContentType {
    classify_domains(domains).unwrap_or_else(|| classify_query(query))
}

/// Classify by source domains alone, `None` when no domain is known
pub fn classify_domains(domains: &[&str]) -> Option<ContentType> {
    let hosts: Vec<String> = domains.iter().map(|d| normalize_host(d)).collect();

    [
        (REALTIME_DOMAINS, ContentType::Realtime),
        (TIME_SENSITIVE_DOMAINS, ContentType::TimeSensitive),
        (STATIC_DOMAINS, ContentType::Static),
    ]
    .into_iter()
    .find(|(known, _)| {
        hosts
            .iter()
            .any(|host| known.iter().any(|k| host_matches(host, k)))
    })
    .map(|(_, content_type)| content_type)
}

/// Classify by query text alone
pub fn classify_query(query: &str) -> ContentType {
    if REALTIME_PATTERN.is_match(query) {
        ContentType::Realtime
    } else if TIME_SENSITIVE_PATTERN.is_match(query) {
        ContentType::TimeSensitive
    } else if STATIC_PATTERN.is_match(query) {
        ContentType::Static
    } else {
        ContentType::Daily
    }
}

fn keyword_pattern(keywords: &[&str]) -> Regex {
    let alternation = keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    // keywords are escaped literals
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).expect("keyword pattern compiles")
}

/// Reduce a URL or domain to a bare lowercase host
fn normalize_host(raw: &str) -> String {
    let lowered = raw.trim().to_ascii_lowercase();
    let without_scheme = lowered
        .split_once("://")
        .map_or(lowered.as_str(), |(_, rest)| rest);
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host = host.split(':').next().unwrap_or_default();
    host.strip_prefix("www.").unwrap_or(host).to_string()
}

fn host_matches(host: &str, known: &str) -> bool {
    host == known
        || host
            .strip_suffix(known)
            .is_some_and(|prefix| prefix.ends_with('.'))
}
