use once_cell::sync::Lazy;
use regex::Regex;

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z][A-Za-z0-9+.-]*://\S+").expect("url pattern"));
static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9]{5,30}\b").expect("token pattern"));

/// Platform substrings checked in order, first hit wins.
const PLATFORMS: &[(&str, &str)] = &[
    ("linkedin", "LinkedIn"),
    ("canva", "Canva"),
    ("adobe", "Adobe"),
    ("netflix", "Netflix"),
    ("spotify", "Spotify"),
    ("amazon", "Amazon"),
];

/// Platform words and command words never count as coupon codes.
const STOPLIST: &[&str] = &[
    "canva", "adobe", "linkedin", "amazon", "netflix", "spotify", "start", "save", "claim",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCoupon {
    pub code: String,
    pub platform: String,
    pub details: String,
}

/// Heuristic extraction of a coupon from arbitrary text.
///
/// A URL anywhere in the text short-circuits token scoring and is taken
/// verbatim as the code. Otherwise the best-scoring alphanumeric token wins,
/// with the first occurrence kept on ties. Codes are stored uppercase.
pub fn parse(text: &str) -> Option<ParsedCoupon> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let platform = guess_platform(text);
    let details = text.to_owned();

    if let Some(url) = URL_RE.find(text) {
        return Some(ParsedCoupon {
            code: url.as_str().to_owned(),
            platform,
            details,
        });
    }

    // Starting below zero keeps plain words from ever qualifying: a bare
    // all-letters token bottoms out negative and is not a coupon.
    let mut best: Option<&str> = None;
    let mut best_score = -1;
    for token in TOKEN_RE.find_iter(text) {
        let token = token.as_str();
        let lowered = token.to_lowercase();
        if STOPLIST.contains(&lowered.as_str()) {
            continue;
        }
        let score = score_token(token);
        if score > best_score {
            best_score = score;
            best = Some(token);
        }
    }

    best.map(|code| ParsedCoupon {
        code: code.to_uppercase(),
        platform,
        details,
    })
}

// Coupons tend to mix letters and digits; bare words and bare numbers rank
// below them.
fn score_token(token: &str) -> i32 {
    let has_digit = token.chars().any(|c| c.is_ascii_digit());
    let has_letter = token.chars().any(|c| c.is_ascii_alphabetic());

    let mut score = 0;
    if has_digit {
        score += 50;
    }
    if has_digit && has_letter {
        score += 30;
    }
    if has_letter && !has_digit {
        score -= 30;
    }
    if has_digit && !has_letter {
        score -= 10;
    }
    score + token.len().min(20) as i32
}

fn guess_platform(text: &str) -> String {
    let lowered = text.to_lowercase();
    for (needle, name) in PLATFORMS {
        if lowered.contains(needle) {
            return (*name).to_owned();
        }
    }
    "General".to_owned()
}

#[cfg(test)]
mod test_parser {
    use super::*;

    #[test]
    fn it_should_prefer_urls_over_tokens() {
        let parsed = parse("Get 50% off https://x.co/ABC123 use code HELLO99").unwrap();
        assert_eq!(parsed.code, "https://x.co/ABC123");
    }

    #[test]
    fn it_should_score_mixed_tokens_above_words() {
        let parsed = parse("Use SAVE20 for Canva discount").unwrap();
        assert_eq!(parsed.code, "SAVE20");
        assert_eq!(parsed.platform, "Canva");
    }

    #[test]
    fn it_should_return_none_without_candidates() {
        assert_eq!(parse("hello there"), None);
        assert_eq!(parse("   "), None);
        assert_eq!(parse(""), None);
    }

    #[test]
    fn it_should_keep_the_first_of_tied_tokens() {
        // Same length, same composition: identical scores.
        let parsed = parse("either AAA11 or BBB22 works").unwrap();
        assert_eq!(parsed.code, "AAA11");
    }

    #[test]
    fn it_should_uppercase_codes() {
        let parsed = parse("redeem save20x today").unwrap();
        assert_eq!(parsed.code, "SAVE20X");
    }

    #[test]
    fn it_should_default_the_platform() {
        let parsed = parse("redeem CODE123 today").unwrap();
        assert_eq!(parsed.platform, "General");
    }

    #[test]
    fn it_should_keep_the_trimmed_text_as_details() {
        let parsed = parse("  spotify deal FRESH42  ").unwrap();
        assert_eq!(parsed.details, "spotify deal FRESH42");
        assert_eq!(parsed.platform, "Spotify");
    }

    #[test]
    fn it_should_ignore_stoplisted_words() {
        // "claim" and "spotify" are both 5+ chars but never become codes.
        assert_eq!(parse("claim spotify"), None);
    }
}
