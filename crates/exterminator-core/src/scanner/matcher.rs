use std::collections::BTreeSet;
use std::path::Path;

use crate::identity::ApplicationIdentity;

/// Organization segment that names the platform vendor rather than an app.
const RESERVED_VENDOR_SEGMENT: &str = "apple";

/// Lowercased, de-duplicated names an application's leftovers tend to use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchTerms {
    terms: BTreeSet<String>,
}

/// Which rule accepted a candidate name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Prefix,
    Contains,
}

impl SearchTerms {
    pub fn from_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms = terms
            .into_iter()
            .map(|t| t.as_ref().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self { terms }
    }

    /// Drop terms of two characters or fewer; they match almost anything.
    pub fn strict(mut self) -> Self {
        self.terms.retain(|t| t.chars().count() > 2);
        self
    }

    pub fn contains(&self, term: &str) -> bool {
        self.terms.contains(term)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

pub fn build_search_terms(identity: &ApplicationIdentity) -> SearchTerms {
    let mut terms: Vec<String> = Vec::new();

    let bundle_id = identity.bundle_identifier.to_lowercase();
    terms.push(bundle_id.clone());

    let components: Vec<&str> = bundle_id.split('.').filter(|c| !c.is_empty()).collect();
    if let Some(last) = components.last() {
        if last.len() > 2 {
            terms.push(last.to_string());
        }
    }
    if components.len() >= 2 {
        terms.push(components[components.len() - 2..].join("."));
    }
    if let Some(org) = components.get(1) {
        if org.len() > 3 && *org != RESERVED_VENDOR_SEGMENT {
            terms.push(org.to_string());
        }
    }

    let name = identity.display_name.trim().to_lowercase();
    terms.push(name.clone());
    terms.push(name.replace(' ', ""));
    terms.push(name.replace(' ', "-"));
    terms.push(name.replace(' ', "_"));

    let words: Vec<&str> = name.split_whitespace().collect();
    if words.len() > 1 && words[0].chars().count() > 3 {
        terms.push(words[0].to_string());
    }

    if let Some(stem) = identity.install_path.file_stem() {
        terms.push(stem.to_string_lossy().to_lowercase());
    }

    SearchTerms::from_terms(terms)
}

/// First rule (exact, prefix, contains) accepting `candidate_name`.
///
/// `"{term}.plist"` and `"{term}.savedstate"` have `term` as their stem, so
/// the exact rule already accepts them.
pub fn match_kind(candidate_name: &str, terms: &SearchTerms) -> Option<MatchKind> {
    let name = candidate_name.to_lowercase();
    let stem = Path::new(&name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.clone());

    if terms.iter().any(|t| name == t || stem == t) {
        return Some(MatchKind::Exact);
    }
    if terms
        .iter()
        .any(|t| name.starts_with(t) || stem.starts_with(t))
    {
        return Some(MatchKind::Prefix);
    }
    if terms.iter().any(|t| name.contains(t) || stem.contains(t)) {
        return Some(MatchKind::Contains);
    }
    None
}

pub fn matches(candidate_name: &str, terms: &SearchTerms) -> bool {
    match_kind(candidate_name, terms).is_some()
}
