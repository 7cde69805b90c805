//! Deep link resolver.
//!
//! Notifications and the app shell share one URL convention:
//! `/?open_desafio=<positive integer>`. The page checks its location on load,
//! on window focus and on `popstate`; a valid target is handed to the view
//! layer as a pending open and the parameter is stripped from the address bar
//! with a history replacement.

use serde::Serialize;
use url::form_urlencoded;

/// Query parameter carrying the subject id.
pub const OPEN_PARAM: &str = "open_desafio";

/// Subject the view layer should open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DeepLinkTarget {
    /// Positive subject id.
    pub subject_id: u64,
}

/// Location parts the resolver reads (`window.location`).
#[derive(Debug, Clone, Copy)]
pub struct PageLocation<'a> {
    /// `location.pathname`.
    pub pathname: &'a str,
    /// `location.search`, with or without the leading `?`.
    pub search: &'a str,
    /// `location.hash`, with the leading `#` if present.
    pub hash: &'a str,
}

/// A decoded target plus the URL to put in history in its place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Target to open.
    pub target: DeepLinkTarget,
    /// Same location without the deep-link parameter.
    pub replacement_url: String,
}

/// Largest id JavaScript can hold exactly (`Number.MAX_SAFE_INTEGER`).
pub const MAX_SUBJECT_ID: u64 = (1 << 53) - 1;

/// Build the in-app URL for a notification about `subject_id`.
///
/// A blank id links to the app root.
pub fn deep_link_url(subject_id: &str) -> String {
    let subject_id = subject_id.trim();
    if subject_id.is_empty() {
        return "/".to_string();
    }
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair(OPEN_PARAM, subject_id)
        .finish();
    format!("/?{query}")
}

/// Decode the target from a query string.
///
/// Only a plain positive integer up to [`MAX_SUBJECT_ID`] qualifies; zero,
/// negatives, decimals and non-numeric values yield `None`.
pub fn parse_target(search: &str) -> Option<DeepLinkTarget> {
    let (_, raw) = form_urlencoded::parse(search.trim_start_matches('?').as_bytes())
        .find(|(key, _)| key == OPEN_PARAM)?;

    let value = raw.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match value.parse::<u64>() {
        Ok(subject_id) if (1..=MAX_SUBJECT_ID).contains(&subject_id) => {
            Some(DeepLinkTarget { subject_id })
        }
        _ => None,
    }
}

/// Resolve a location. `None` leaves the URL untouched.
pub fn resolve(location: PageLocation<'_>) -> Option<Resolution> {
    let target = parse_target(location.search)?;
    Some(Resolution {
        target,
        replacement_url: strip_param(location),
    })
}

fn is_open_param(pair: &str) -> bool {
    form_urlencoded::parse(pair.as_bytes())
        .next()
        .is_some_and(|(key, _)| key == OPEN_PARAM)
}

/// Rebuild the location without the deep-link parameter.
///
/// Other query pairs keep their original encoding and order.
pub fn strip_param(location: PageLocation<'_>) -> String {
    let rest: Vec<&str> = location
        .search
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty() && !is_open_param(pair))
        .collect();

    let mut url = location.pathname.to_string();
    if !rest.is_empty() {
        url.push('?');
        url.push_str(&rest.join("&"));
    }
    url.push_str(location.hash);
    url
}

/// Pending-open slot consumed by the view layer.
///
/// The view fetches the subject, displays it and then calls [`clear`](Self::clear),
/// so later focus or popstate events do not reopen it.
#[derive(Debug, Default)]
pub struct PendingOpen {
    pending: Option<DeepLinkTarget>,
}

impl PendingOpen {
    /// Empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a target. Returns `false` if that same target was already pending.
    pub fn offer(&mut self, target: DeepLinkTarget) -> bool {
        if self.pending == Some(target) {
            return false;
        }
        self.pending = Some(target);
        true
    }

    /// Currently pending target.
    pub fn peek(&self) -> Option<DeepLinkTarget> {
        self.pending
    }

    /// Drop the pending target once displayed.
    pub fn clear(&mut self) {
        self.pending = None;
    }
}
