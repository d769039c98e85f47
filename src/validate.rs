use once_cell::sync::Lazy;
use regex::Regex;

/// Watch-page URL shape. Anchored at the start only, so trailing text after
/// the numeric id is still accepted.
static WATCH_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?nicovideo\.jp/watch/(?:sm|nm|so)?\d+")
        .expect("watch url pattern is valid")
});

/// Returns true when `url` starts with a niconico watch-page URL.
pub fn is_valid_niconico_url(url: &str) -> bool {
    WATCH_URL.is_match(url)
}
