//! Document selectors deciding which providers apply to a document.

use globset::{Glob, GlobMatcher};

use crate::Document;
use crate::error::RegistryError;

/// Score for a field matched through the `*` wildcard.
const WILDCARD_SCORE: u32 = 5;
/// Score for a field matched exactly, or a path matched by the glob.
const EXACT_SCORE: u32 = 10;

/// Filter on language id, uri scheme and uri path.
///
/// Every field that is set must match for the selector to apply. The score of
/// a match is the strongest single field match, so a provider registered for
/// `rust` outranks one registered for `*`.
#[derive(Debug, Clone, Default)]
pub struct DocumentSelector {
	language: Option<String>,
	scheme: Option<String>,
	pattern: Option<(String, GlobMatcher)>,
}

impl DocumentSelector {
	/// Selector applying to every document at the wildcard score.
	pub fn any() -> Self {
		Self::default().language("*")
	}

	/// Selector for one language id.
	pub fn for_language(language: impl Into<String>) -> Self {
		Self::default().language(language)
	}

	pub fn language(mut self, language: impl Into<String>) -> Self {
		self.language = Some(language.into());
		self
	}

	pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
		self.scheme = Some(scheme.into());
		self
	}

	/// Restricts the selector to uri paths matching `glob`.
	pub fn pattern(mut self, glob: &str) -> Result<Self, RegistryError> {
		let matcher = Glob::new(glob)
			.map_err(|source| RegistryError::Pattern {
				pattern: glob.to_string(),
				source,
			})?
			.compile_matcher();
		self.pattern = Some((glob.to_string(), matcher));
		Ok(self)
	}

	/// Scores how well this selector matches `document`; 0 means no match.
	pub fn score(&self, document: &Document) -> u32 {
		let mut score = 0;

		if let Some(language) = &self.language {
			match field_score(language, document.language_id()) {
				0 => return 0,
				s => score = score.max(s),
			}
		}

		if let Some(scheme) = &self.scheme {
			match field_score(scheme, document.uri().scheme()) {
				0 => return 0,
				s => score = score.max(s),
			}
		}

		if let Some((_, matcher)) = &self.pattern {
			if !matcher.is_match(document.uri().path()) {
				return 0;
			}
			score = EXACT_SCORE;
		}

		score
	}
}

fn field_score(wanted: &str, actual: &str) -> u32 {
	if wanted == actual {
		EXACT_SCORE
	} else if wanted == "*" {
		WILDCARD_SCORE
	} else {
		0
	}
}
