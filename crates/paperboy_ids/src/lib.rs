//! Canonical identifier handling for the documents this workspace serves.
//!
//! Two corpora, two identifier syntaxes, one shared shape: parse an
//! arbitrary input string into a canonical manifest key plus whatever
//! corpus-specific suffix (arXiv version, USPTO kind code) the caller
//! needs, and offer a hint about where the underlying bulk archive
//! should live on disk.

mod arxiv;
mod patent;

pub use arxiv::{ArxivId, ArxivLocationHint};
pub use patent::{PatentDocType, PatentId};

/// A corpus-specific identifier normalizer.
///
/// Implementors never fail on malformed input: `parse` always returns
/// something, falling back to treating the whole trimmed input as the
/// canonical key when no known pattern matches.
pub trait IdentifierScheme: Sized {
    /// Caller-facing location hint type (differs per corpus).
    type LocationHint;

    /// Parse a raw, user-supplied identifier string.
    fn parse(raw: &str) -> Self;

    /// The exact key this entry would be looked up under in the manifest.
    fn canonical_key(&self) -> String;

    /// Where on disk the backing bulk archive is expected to live.
    fn hint_location(&self) -> Self::LocationHint;
}

impl IdentifierScheme for ArxivId {
    type LocationHint = ArxivLocationHint;

    fn parse(raw: &str) -> Self {
        ArxivId::parse(raw)
    }

    fn canonical_key(&self) -> String {
        self.lookup_key()
    }

    fn hint_location(&self) -> Self::LocationHint {
        self.location_hint()
    }
}

impl IdentifierScheme for PatentId {
    type LocationHint = ();

    fn parse(raw: &str) -> Self {
        PatentId::parse(raw)
    }

    fn canonical_key(&self) -> String {
        self.bare.clone()
    }

    fn hint_location(&self) -> Self::LocationHint {}
}
