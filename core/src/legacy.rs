use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};

/// Server ids bookmarked under the previous app schema.
///
/// Only consulted when a restaurant row is inserted for the first time, to
/// seed its favorite flag. Never written back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyBookmarks(HashSet<i64>);

impl LegacyBookmarks {
    /// Read a JSON array of server ids. A missing file means no bookmarks.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read legacy bookmarks: {}", path.display()))?;
        let ids: Vec<i64> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse legacy bookmarks: {}", path.display()))?;
        Ok(ids.into_iter().collect())
    }

    #[must_use]
    pub fn contains(&self, server_id: i64) -> bool {
        self.0.contains(&server_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<i64> for LegacyBookmarks {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let bookmarks = LegacyBookmarks::load(&dir.path().join("nope.json")).unwrap();
        assert!(bookmarks.is_empty());
    }

    #[test]
    fn test_load_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy_bookmarks.json");
        std::fs::write(&path, "[3, 17, 3]").unwrap();

        let bookmarks = LegacyBookmarks::load(&path).unwrap();
        assert_eq!(bookmarks.len(), 2);
        assert!(bookmarks.contains(17));
        assert!(!bookmarks.contains(4));
    }

    #[test]
    fn test_load_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy_bookmarks.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(LegacyBookmarks::load(&path).is_err());
    }
}
