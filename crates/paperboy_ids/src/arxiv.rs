use once_cell::sync::Lazy;
use regex::Regex;

/// A parsed arXiv identifier: a canonical base plus an optional version.
///
/// `base` has already had URL framing, the `arXiv:` prefix, and any
/// trailing `vN` stripped, and legacy `category/number` identifiers have
/// had their slash removed (`astro-ph/0412561` -> `astro-ph0412561`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArxivId {
    pub base: String,
    pub version: Option<u32>,
}

/// Where the bulk archive backing an arXiv identifier is expected to live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArxivLocationHint {
    pub year_dir: String,
    pub pdf_pattern: String,
    pub src_pattern: String,
}

static URL_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https?://(?:export\.)?arxiv\.org/(abs|pdf|e-print)/").unwrap());
static TRAILING_PDF: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.pdf$").unwrap());
static ARXIV_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^arxiv:").unwrap());
static TRAILING_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"v(\d+)$").unwrap());
static NEW_STYLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{2})(\d{2})\.\d{4,5}$").unwrap());
static LEGACY_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-zA-Z-]+)(\d{2})(\d{2})\d{3,4}$").unwrap());

impl ArxivId {
    /// Parse a raw, user-supplied identifier in any supported form.
    ///
    /// Never fails: unrecognized input is returned verbatim as `base`
    /// with no version.
    pub fn parse(raw: &str) -> Self {
        let mut s = raw.trim().to_string();

        s = URL_PREFIX.replace(&s, "").into_owned();
        s = TRAILING_PDF.replace(&s, "").into_owned();
        s = ARXIV_PREFIX.replace(&s, "").into_owned();

        let version = TRAILING_VERSION.captures(&s).and_then(|caps| {
            let v: u32 = caps.get(1)?.as_str().parse().ok()?;
            Some(v)
        });
        if version.is_some() {
            let cut = s.rfind('v').expect("trailing version match implies a 'v'");
            s.truncate(cut);
        }

        let slash_count = s.matches('/').count();
        if slash_count == 1 {
            s = s.replace('/', "");
        }

        ArxivId { base: s, version }
    }

    /// The exact key this identifier is looked up under in the manifest:
    /// `base` if no version was specified, `base` + `v` + version otherwise.
    pub fn lookup_key(&self) -> String {
        match self.version {
            Some(v) => format!("{}v{}", self.base, v),
            None => self.base.clone(),
        }
    }

    /// Derive the expected bulk-file year directory and filename patterns
    /// for this identifier. Used only for diagnostics, never for lookup.
    pub fn location_hint(&self) -> ArxivLocationHint {
        if let Some(caps) = NEW_STYLE.captures(&self.base) {
            let yy: u32 = caps[1].parse().unwrap_or(0);
            let mm = &caps[2];
            let year = two_digit_year(yy);
            return ArxivLocationHint {
                year_dir: year.to_string(),
                pdf_pattern: format!("arXiv_pdf_{:02}{}_*.tar", yy, mm),
                src_pattern: format!("arXiv_src_{:02}{}_*.tar", yy, mm),
            };
        }

        if let Some(caps) = LEGACY_STYLE.captures(&self.base) {
            let category = &caps[1];
            let yy: u32 = caps[2].parse().unwrap_or(0);
            let mm = &caps[3];
            let year = two_digit_year(yy);
            return ArxivLocationHint {
                year_dir: year.to_string(),
                pdf_pattern: format!("arXiv_pdf_{}_{:02}{}_*.tar", category, yy, mm),
                src_pattern: format!("arXiv_src_{}_{:02}{}_*.tar", category, yy, mm),
            };
        }

        ArxivLocationHint {
            year_dir: "unknown".to_string(),
            pdf_pattern: "unknown".to_string(),
            src_pattern: "unknown".to_string(),
        }
    }
}

/// `yy >= 91` is a 1990s filename (arXiv started in 1991); otherwise 2000s.
fn two_digit_year(yy: u32) -> u32 {
    if yy >= 91 {
        1900 + yy
    } else {
        2000 + yy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_new_style_with_version() {
        let id = ArxivId::parse("arXiv:1501.00963v3");
        assert_eq!(id.base, "1501.00963");
        assert_eq!(id.version, Some(3));
        assert_eq!(id.lookup_key(), "1501.00963v3");
    }

    #[test]
    fn parses_bare_new_style() {
        let id = ArxivId::parse("1501.00963");
        assert_eq!(id.base, "1501.00963");
        assert_eq!(id.version, None);
        assert_eq!(id.lookup_key(), "1501.00963");
    }

    #[test]
    fn parses_legacy_style_slash() {
        let id = ArxivId::parse("astro-ph/0412561");
        assert_eq!(id.base, "astro-ph0412561");
        assert_eq!(id.version, None);
    }

    #[test]
    fn parses_legacy_style_slash_with_version() {
        let id = ArxivId::parse("astro-ph/0412561v1");
        assert_eq!(id.base, "astro-ph0412561");
        assert_eq!(id.version, Some(1));
    }

    #[test]
    fn parses_abs_url() {
        let id = ArxivId::parse("https://arxiv.org/abs/1501.00963");
        assert_eq!(id.base, "1501.00963");
    }

    #[test]
    fn parses_pdf_url() {
        let id = ArxivId::parse("https://arxiv.org/pdf/1501.00963.pdf");
        assert_eq!(id.base, "1501.00963");
    }

    #[test]
    fn idempotent_on_already_canonical_forms() {
        for raw in ["1501.00963", "astro-ph0412561", "astro-ph0412561v1"] {
            let once = ArxivId::parse(raw).lookup_key();
            let twice = ArxivId::parse(&once).lookup_key();
            assert_eq!(once, twice, "parse should be idempotent for {raw}");
        }
    }

    #[test]
    fn location_hint_for_new_style() {
        let hint = ArxivId::parse("1501.00963").location_hint();
        assert_eq!(hint.year_dir, "2015");
        assert_eq!(hint.src_pattern, "arXiv_src_1501_*.tar");
    }

    #[test]
    fn location_hint_for_legacy_style() {
        let hint = ArxivId::parse("astro-ph/0412561").location_hint();
        assert_eq!(hint.year_dir, "2004");
        assert_eq!(hint.pdf_pattern, "arXiv_pdf_astro-ph_0412_*.tar");
        assert_eq!(hint.src_pattern, "arXiv_src_astro-ph_0412_*.tar");
    }

    #[test]
    fn unrecognized_input_never_panics() {
        let id = ArxivId::parse("not-an-id-at-all");
        assert_eq!(id.base, "not-an-id-at-all");
        assert_eq!(id.location_hint().year_dir, "unknown");
    }
}
