//! Candidate acceptance rules.

use broll_models::{ClipCandidate, ClipMetadata};

/// Include/exclude term lists applied to candidate tags and descriptions.
///
/// Terms match case-insensitively against whole words, allowing plural or
/// inflected suffixes (`woman` matches `womans` but `man` does not match
/// `woman`). Multi-word terms match as a phrase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFilter {
    must_include: Vec<String>,
    must_exclude: Vec<String>,
}

impl MetadataFilter {
    pub fn new<I, E, S, T>(must_include: I, must_exclude: E) -> Self
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        Self {
            must_include: normalize_terms(must_include),
            must_exclude: normalize_terms(must_exclude),
        }
    }

    /// Accept metadata that matches any include term (or the include list is
    /// empty) and no exclude term.
    pub fn accepts(&self, metadata: &ClipMetadata) -> bool {
        let words = tokenize(&metadata.searchable_text());

        let included = self.must_include.is_empty()
            || self.must_include.iter().any(|term| matches_term(&words, term));
        let excluded = self.must_exclude.iter().any(|term| matches_term(&words, term));

        included && !excluded
    }
}

/// Structural requirements a candidate must meet before download.
pub fn is_acceptable(candidate: &ClipCandidate, min_width: u32, filter: &MetadataFilter) -> bool {
    !candidate.remote_url.is_empty()
        && candidate.is_landscape()
        && candidate.width >= min_width
        && filter.accepts(&candidate.metadata)
}

fn normalize_terms<I, S>(terms: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    terms
        .into_iter()
        .map(|t| tokenize(t.as_ref()).join(" "))
        .filter(|t| !t.is_empty())
        .collect()
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn matches_term(words: &[String], term: &str) -> bool {
    let parts: Vec<&str> = term.split(' ').collect();
    if parts.is_empty() || words.len() < parts.len() {
        return false;
    }

    words.windows(parts.len()).any(|window| {
        window
            .iter()
            .zip(&parts)
            .enumerate()
            .all(|(i, (word, part))| {
                // only the last word of a phrase may carry a suffix
                if i + 1 == parts.len() {
                    word.starts_with(*part)
                } else {
                    word.as_str() == *part
                }
            })
    })
}
