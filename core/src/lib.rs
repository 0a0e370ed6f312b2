//! Synchronous client core for the Trello REST API.
//!
//! # Overview
//! [`Transport`] executes one authenticated call per invocation: it injects
//! the key/token pair into every query string, encodes form bodies, and turns
//! non-2xx answers into [`ApiError::Remote`] with the most useful message the
//! API provided. [`Resolver`] turns a human list name into a list id within a
//! board. [`TrelloApi`] puts typed operations (boards, lists, cards, comments,
//! checklists) on top of both.
//!
//! # Design
//! - No global state: configuration is loaded once into [`Config`] and passed
//!   by reference; credentials live inside the `Transport`.
//! - Requests and responses are plain data ([`HttpRequest`],
//!   [`HttpResponse`]); the round trip happens behind [`HttpExecutor`], which
//!   is [`UreqExecutor`] in production.
//! - Nothing is retried or cached. Each failure is returned to the caller.

pub mod api;
pub mod config;
pub mod error;
pub mod http;
pub mod resolve;
pub mod transport;
pub mod types;

pub use api::{ListTarget, TrelloApi, DEFAULT_LIMIT};
pub use config::{Config, Credentials, Overrides};
pub use error::{ApiError, MatchTier, Result};
pub use http::{HttpExecutor, HttpMethod, HttpRequest, HttpResponse, UreqExecutor};
pub use resolve::{match_by_name, MatchFailure, Resolver};
pub use transport::{params, Params, Transport};
pub use types::{
    Board, Card, CheckItemState, Checklist, ChecklistItem, CommentAction, Named, NewCard,
    TrelloList,
};
