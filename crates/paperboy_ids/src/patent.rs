use once_cell::sync::Lazy;
use regex::Regex;

/// USPTO publication type, sniffed from the bulk XML during scanning
/// rather than from the identifier itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatentDocType {
    Grant,
    Application,
    Unknown,
}

/// A parsed USPTO patent identifier: a bare (digits, optionally
/// `D`/`RE`/`PP`-prefixed) number plus its kind code suffix, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatentId {
    pub bare: String,
    pub kind_code: Option<String>,
}

static US_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^us").unwrap());
static DIGITS_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());
static PREFIXED_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(D|RE|PP)\d+$").unwrap());

impl PatentId {
    /// Parse a raw, user-supplied USPTO identifier in any supported form.
    ///
    /// Never fails: if no valid kind-code split exists, the whole trimmed
    /// (and `US`-stripped) input becomes `bare` with no kind code.
    pub fn parse(raw: &str) -> Self {
        let s = US_PREFIX.replace(raw.trim(), "").into_owned();

        if s.len() >= 2 {
            let split_at = s.len() - 2;
            let (head, tail) = s.split_at(split_at);
            let mut chars = tail.chars();
            let first = chars.next().unwrap_or_default();
            let second = chars.next().unwrap_or_default();
            if first.is_ascii_uppercase() && second.is_ascii_digit() && is_valid_bare(head) {
                return PatentId {
                    bare: head.to_string(),
                    kind_code: Some(tail.to_string()),
                };
            }
        }

        if !s.is_empty() {
            let split_at = s.len() - 1;
            let (head, tail) = s.split_at(split_at);
            let ch = tail.chars().next().unwrap_or_default();
            if ch.is_ascii_uppercase() && is_valid_bare(head) {
                return PatentId {
                    bare: head.to_string(),
                    kind_code: Some(tail.to_string()),
                };
            }
        }

        PatentId {
            bare: s,
            kind_code: None,
        }
    }
}

/// A bare USPTO number is either all digits, or one of the `D`/`RE`/`PP`
/// design-and-reissue prefixes followed by digits.
fn is_valid_bare(s: &str) -> bool {
    !s.is_empty() && (DIGITS_ONLY.is_match(s) || PREFIXED_DIGITS.is_match(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_grant_with_us_prefix() {
        let id = PatentId::parse("US11123456B2");
        assert_eq!(id.bare, "11123456");
        assert_eq!(id.kind_code.as_deref(), Some("B2"));
    }

    #[test]
    fn parses_application_publication() {
        let id = PatentId::parse("US20200123456A1");
        assert_eq!(id.bare, "20200123456");
        assert_eq!(id.kind_code.as_deref(), Some("A1"));
    }

    #[test]
    fn parses_without_us_prefix() {
        let id = PatentId::parse("11123456B2");
        assert_eq!(id.bare, "11123456");
        assert_eq!(id.kind_code.as_deref(), Some("B2"));
    }

    #[test]
    fn parses_design_patent() {
        let id = PatentId::parse("D0987654S");
        assert_eq!(id.bare, "D0987654");
        assert_eq!(id.kind_code.as_deref(), Some("S"));
    }

    #[test]
    fn parses_reissue_patent() {
        let id = PatentId::parse("RE12345E");
        assert_eq!(id.bare, "RE12345");
        assert_eq!(id.kind_code.as_deref(), Some("E"));
    }

    #[test]
    fn unrecognized_input_never_panics() {
        let id = PatentId::parse("");
        assert_eq!(id.bare, "");
        assert_eq!(id.kind_code, None);
    }

    #[test]
    fn idempotent_on_bare_form() {
        for raw in ["US11123456B2", "D0987654S", "RE12345E"] {
            let once = PatentId::parse(raw).bare;
            let twice = PatentId::parse(&once).bare;
            // Re-parsing a bare id with no kind code suffix should not
            // mangle it further.
            assert_eq!(twice, once);
        }
    }
}
