//! Slug generation.
//!
//! The registry only needs "given a name, yield a normalized slug"; uniqueness
//! is enforced by the registry against stored definitions. [`Slugger`] is the
//! seam for plugging in a different normalizer.

pub trait Slugger: Send + Sync {
    fn slugify(&self, input: &str) -> String;
}

/// Lowercases, keeps alphanumerics, and collapses every run of whitespace,
/// hyphens, and underscores into a single separator.
///
/// `"Release Date"` → `"release_date"`, `"  --Max   Speed!"` → `"max_speed"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeparatorSlugger {
    separator: char,
}

impl Default for SeparatorSlugger {
    fn default() -> Self {
        Self { separator: '_' }
    }
}

impl SeparatorSlugger {
    pub fn new(separator: char) -> Self {
        Self { separator }
    }

    pub fn separator(&self) -> char {
        self.separator
    }
}

impl Slugger for SeparatorSlugger {
    fn slugify(&self, input: &str) -> String {
        let mut slug = String::with_capacity(input.len());
        let mut pending_separator = false;

        for ch in input.chars() {
            if ch.is_alphanumeric() {
                if pending_separator && !slug.is_empty() {
                    slug.push(self.separator);
                }
                pending_separator = false;
                slug.extend(ch.to_lowercase());
            } else if ch.is_whitespace() || ch == '-' || ch == '_' || ch == self.separator {
                pending_separator = true;
            }
            // anything else (punctuation, symbols) is dropped
        }

        slug
    }
}
