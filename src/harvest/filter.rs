//! Extension allow-list.

/// Ordered set of allowed file extensions.
///
/// Entries are trimmed and lowercased when the filter is built. Matching
/// against file names is exact and case-sensitive, so `report.PDF` does not
/// match `pdf`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtensionFilter {
    extensions: Vec<String>,
}

impl ExtensionFilter {
    /// Build a filter, dropping empty and repeated entries (first one wins).
    pub fn new<S: AsRef<str>>(raw: &[S]) -> Self {
        let mut extensions: Vec<String> = Vec::with_capacity(raw.len());
        for ext in raw {
            let ext = ext.as_ref().trim().to_lowercase();
            if !ext.is_empty() && !extensions.contains(&ext) {
                extensions.push(ext);
            }
        }
        Self { extensions }
    }

    /// Parse a comma-separated list such as `"pdf, doc, docx"`.
    pub fn parse_list(list: &str) -> Self {
        let parts: Vec<&str> = list.split(',').collect();
        Self::new(&parts)
    }

    /// True if the text after the last `.` of `filename` is an allowed extension.
    ///
    /// A name without a dot is compared as a whole.
    pub fn is_valid_extension(&self, filename: &str) -> bool {
        let ext = filename.rsplit('.').next().unwrap_or(filename);
        self.extensions.iter().any(|allowed| allowed == ext)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.extensions
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}
