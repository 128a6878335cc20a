//! Origin classification for intercepted messages.

use console_relay_domain::SystemTag;
use regex::Regex;
use std::sync::LazyLock;

static BACKEND_PREFIX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\s*\[(?:BACKEND|CONVEX|SERVER)\b[^\]]*\]").ok());

static BACKEND_PHRASE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:cache sync|log sync|sync(?:ed|ing)? (?:\d+ )?logs?|clear(?:ed|ing)? (?:\d+ )?(?:logs?|entries)|clear operation)\b",
    )
    .ok()
});

/// Classify a serialized console message.
///
/// `manual` and `worker` are never inferred; they only arrive through direct
/// submission.
pub fn classify(message: &str) -> SystemTag {
    let matches = |regex: &LazyLock<Option<Regex>>| {
        regex
            .as_ref()
            .is_some_and(|regex| regex.is_match(message))
    };

    if matches(&BACKEND_PREFIX) || matches(&BACKEND_PHRASE) {
        SystemTag::Backend
    } else {
        SystemTag::Browser
    }
}
