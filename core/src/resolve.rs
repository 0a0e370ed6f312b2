//! Name-to-id resolution for lists on a board.
//!
//! A name is matched case-insensitively against every list on the board.
//! Candidates fall into two tiers: exact (whole name equal) and partial
//! (name contains the query). A single exact match always wins, however many
//! partial matches exist; partial matches are only considered when there is
//! no exact match at all. More than one match in the deciding tier is an
//! error, never an arbitrary pick.

use crate::error::{ApiError, MatchTier, Result};
use crate::http::HttpExecutor;
use crate::transport::{params, segment, Transport};
use crate::types::{Named, TrelloList, LIST_FIELDS};

/// Why a name did not resolve to exactly one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchFailure {
    NotFound,
    Ambiguous { count: usize, tier: MatchTier },
}

impl MatchFailure {
    fn into_error(self, query: &str, scope: &str) -> ApiError {
        match self {
            MatchFailure::NotFound => ApiError::NotFound {
                query: query.to_string(),
                scope: scope.to_string(),
            },
            MatchFailure::Ambiguous { count, tier } => ApiError::Ambiguous {
                query: query.to_string(),
                scope: scope.to_string(),
                count,
                tier,
            },
        }
    }
}

/// Pick the single candidate whose name matches `query`.
///
/// `query` is compared as given; callers trim it. Candidate names are never
/// trimmed. Lowercasing maps each character on its own, with no locale or
/// word-position rules.
pub fn match_by_name<'a, T: Named>(
    candidates: &'a [T],
    query: &str,
) -> std::result::Result<&'a T, MatchFailure> {
    let target = fold_case(query);
    let mut exact = Vec::new();
    let mut partial = Vec::new();
    for candidate in candidates {
        let name = fold_case(candidate.name());
        if name == target {
            exact.push(candidate);
        } else if name.contains(&target) {
            partial.push(candidate);
        }
    }

    match (exact.as_slice(), partial.as_slice()) {
        ([only], _) => Ok(*only),
        ([], [only]) => Ok(*only),
        ([], []) => Err(MatchFailure::NotFound),
        ([], many) => Err(MatchFailure::Ambiguous {
            count: many.len(),
            tier: MatchTier::Partial,
        }),
        (many, _) => Err(MatchFailure::Ambiguous {
            count: many.len(),
            tier: MatchTier::Exact,
        }),
    }
}

fn fold_case(s: &str) -> String {
    s.chars().flat_map(char::to_lowercase).collect()
}

/// Resolves list names on a board through a [`Transport`].
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'t, E> {
    transport: &'t Transport<E>,
}

impl<'t, E: HttpExecutor> Resolver<'t, E> {
    pub fn new(transport: &'t Transport<E>) -> Self {
        Self { transport }
    }

    /// Every list on `board_id`, restricted to the fields [`TrelloList`] holds.
    pub fn board_lists(&self, board_id: &str) -> Result<Vec<TrelloList>> {
        let path = format!("/1/boards/{}/lists", segment(board_id));
        let query = params([("fields", LIST_FIELDS)]);
        Ok(self.transport.get(&path, &query)?.unwrap_or_default())
    }

    /// Resolve `raw_name` to a list id on `board_id`. One network call.
    pub fn resolve_by_name(&self, board_id: &str, raw_name: &str) -> Result<String> {
        let name = raw_name.trim();
        let board_id = board_id.trim();
        if name.is_empty() {
            return Err(ApiError::config(
                "missing list target: provide a list id or a list name",
            ));
        }
        if board_id.is_empty() {
            return Err(ApiError::config(
                "a board id is required to resolve a list by name",
            ));
        }

        let lists = self.board_lists(board_id)?;
        match match_by_name(&lists, name) {
            Ok(list) => {
                tracing::debug!(board = board_id, name, list = list.id(), "resolved list name");
                Ok(list.id().to_string())
            }
            Err(failure) => Err(failure.into_error(name, board_id)),
        }
    }

    /// Prefer `explicit_id`; fall back to resolving `raw_name`.
    ///
    /// A non-blank explicit id is returned as-is without any network call.
    pub fn resolve_target(&self, board_id: &str, explicit_id: &str, raw_name: &str) -> Result<String> {
        let explicit_id = explicit_id.trim();
        if !explicit_id.is_empty() {
            return Ok(explicit_id.to_string());
        }
        self.resolve_by_name(board_id, raw_name)
    }
}
