use serde::{Deserialize, Serialize};

use crate::catalog::derive_slug;

/// Fixed positional order for the boolean-flags declaration shape.
/// Index `i` of a flags list maps to `FLAG_ACTION_ORDER[i]`.
pub const FLAG_ACTION_ORDER: &[&str] = &["create", "update", "delete", "read"];

/// Policy for resolving subject and action names that are not in the
/// catalog when a grant declaration is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantPolicy {
    /// An unknown name aborts the entire call; nothing is written.
    Strict,
    /// An unknown name is created on the fly and cached for reuse
    /// within the same call.
    Lenient,
}

/// The two accepted action declaration shapes. A single call uses one
/// shape throughout; they are never mixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionSet {
    /// Action-name strings, e.g. `["create", "read"]`.
    Named(Vec<String>),
    /// Booleans positionally mapped against [`FLAG_ACTION_ORDER`].
    Flags(Vec<bool>),
}

impl ActionSet {
    /// Resolves the declared shape into distinct action names.
    ///
    /// Named entries are deduplicated preserving first occurrence.
    /// Flag entries yield the action at their position when set; a
    /// `true` flag whose index falls outside [`FLAG_ACTION_ORDER`] is
    /// skipped, not an error.
    #[must_use]
    pub fn action_names(&self) -> Vec<String> {
        match self {
            Self::Named(names) => {
                let mut distinct = Vec::with_capacity(names.len());
                for name in names {
                    if !distinct.contains(name) {
                        distinct.push(name.clone());
                    }
                }
                distinct
            }
            Self::Flags(flags) => flags
                .iter()
                .enumerate()
                .filter(|(_, allowed)| **allowed)
                .filter_map(|(index, _)| FLAG_ACTION_ORDER.get(index))
                .map(|name| (*name).to_owned())
                .collect(),
        }
    }
}

/// One admin-submitted grant line: a subject plus its allowed actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantDeclaration {
    /// Subject display name as entered by the administrator.
    pub subject: String,
    /// Declared actions in either supported shape.
    pub actions: ActionSet,
}

/// A declaration normalized for the store: resolved action names and
/// the slug a lenient-mode subject insert would use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGrant {
    /// Subject display name.
    pub subject_name: String,
    /// Normalized slug for the subject name.
    pub subject_slug: String,
    /// Distinct action names, first-occurrence order.
    pub action_names: Vec<String>,
}

impl From<&GrantDeclaration> for ResolvedGrant {
    fn from(declaration: &GrantDeclaration) -> Self {
        Self {
            subject_name: declaration.subject.clone(),
            subject_slug: derive_slug(&declaration.subject),
            action_names: declaration.actions.action_names(),
        }
    }
}
