use ropey::Rope;
use url::Url;

/// Snapshot of a text document handed to lens providers.
///
/// The engine never inspects the document; it is shared as `Arc<Document>` and
/// passed straight through to every provider of one run.
#[derive(Debug, Clone)]
pub struct Document {
	uri: Url,
	language_id: String,
	version: i32,
	text: Rope,
}

impl Document {
	/// Creates a document snapshot.
	pub fn new(uri: Url, language_id: impl Into<String>, version: i32, text: impl AsRef<str>) -> Self {
		Self {
			uri,
			language_id: language_id.into(),
			version,
			text: Rope::from_str(text.as_ref()),
		}
	}

	pub fn uri(&self) -> &Url {
		&self.uri
	}

	pub fn language_id(&self) -> &str {
		&self.language_id
	}

	pub fn version(&self) -> i32 {
		self.version
	}

	pub fn text(&self) -> &Rope {
		&self.text
	}

	/// Number of lines, counting a trailing empty line after a final newline.
	pub fn line_count(&self) -> usize {
		self.text.len_lines()
	}

	/// Returns a new snapshot with replaced text and the version bumped.
	pub fn edited(&self, text: impl AsRef<str>) -> Self {
		Self {
			uri: self.uri.clone(),
			language_id: self.language_id.clone(),
			version: self.version.wrapping_add(1),
			text: Rope::from_str(text.as_ref()),
		}
	}
}
