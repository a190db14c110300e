use serde::{Deserialize, Serialize};

/// Unique identifier for a subject catalog row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectId(i64);

impl SubjectId {
    /// Creates a subject identifier from a stored row id.
    #[must_use]
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the underlying row id.
    #[must_use]
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

/// Unique identifier for an action catalog row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId(i64);

impl ActionId {
    /// Creates an action identifier from a stored row id.
    #[must_use]
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the underlying row id.
    #[must_use]
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

/// Unique identifier for a permission (subject x action) row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionId(i64);

impl PermissionId {
    /// Creates a permission identifier from a stored row id.
    #[must_use]
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the underlying row id.
    #[must_use]
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

/// A protected resource or domain a permission applies to,
/// e.g. "Purchase Order".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Stable subject identifier.
    pub id: SubjectId,
    /// Unique display name.
    pub name: String,
    /// Unique normalized slug derived from the name.
    pub slug: String,
}

/// An operation verb grantable on a subject, e.g. "create".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Stable action identifier.
    pub id: ActionId,
    /// Unique verb name.
    pub name: String,
}

/// One grantable (subject, action) pair. Created lazily the first time
/// the pair is granted to any role and reused by every later grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Stable permission identifier.
    pub id: PermissionId,
    /// Subject side of the pair.
    pub subject_id: SubjectId,
    /// Action side of the pair.
    pub action_id: ActionId,
}

/// Derives the normalized slug for a human-entered name: lowercased
/// with all whitespace removed.
#[must_use]
pub fn derive_slug(name: &str) -> String {
    name.chars()
        .filter(|character| !character.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::derive_slug;

    #[test]
    fn slug_lowercases_and_strips_whitespace() {
        assert_eq!(derive_slug("Purchase Order"), "purchaseorder");
    }

    #[test]
    fn slug_strips_interior_tabs_and_trims() {
        assert_eq!(derive_slug("  Stock\tKeeper  "), "stockkeeper");
    }

    #[test]
    fn slug_of_single_word_is_lowercase() {
        assert_eq!(derive_slug("Invoice"), "invoice");
    }
}
