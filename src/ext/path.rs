use std::path::Path;

/// Extension trait for Path with the conversions template discovery needs
pub trait PathExt {
    /// Returns the path relative to `root`, or the path unchanged when it
    /// does not live under `root`.
    fn relative_to(&self, root: &Path) -> &Path;

    /// True when the extension matches one of `extensions`, ignoring case.
    fn has_extension_in(&self, extensions: &[&str]) -> bool;
}

impl PathExt for Path {
    fn relative_to(&self, root: &Path) -> &Path {
        self.strip_prefix(root).unwrap_or(self)
    }

    fn has_extension_in(&self, extensions: &[&str]) -> bool {
        self.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}
