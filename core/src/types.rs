//! Trello entities and request payloads.
//!
//! # Design
//! Each entity is a flat record holding only the fields the client asks for;
//! the matching `*_FIELDS` constant is sent as the `fields` query parameter so
//! the API never returns more than these records can hold. Entities derive
//! `Default` so an empty success body yields the zero value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const BOARD_FIELDS: &str = "id,name,url,closed";
pub const LIST_FIELDS: &str = "id,name,closed,pos";
pub const CARD_FIELDS: &str = "id,name,desc,idList,shortUrl,url,due,closed";
pub const COMMENT_FIELDS: &str = "data,date,type";
pub const COMMENT_MEMBER_FIELDS: &str = "username,fullName";
pub const CHECKLIST_FIELDS: &str = "name";
pub const CHECK_ITEM_FIELDS: &str = "name,state,pos";

/// An entity that can be looked up by its display name.
pub trait Named {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Board {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub closed: bool,
}

/// A column on a board. Named to avoid clashing with `std` list types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrelloList {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub closed: bool,
    #[serde(default)]
    pub pos: f64,
}

impl Named for TrelloList {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub id_list: String,
    #[serde(default)]
    pub short_url: String,
    #[serde(default)]
    pub url: String,
    /// ISO-8601 timestamp; the API sends `null` when unset.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub due: String,
    #[serde(default)]
    pub closed: bool,
}

impl Card {
    /// Short link when present, full URL otherwise.
    pub fn link(&self) -> &str {
        if self.short_url.trim().is_empty() {
            &self.url
        } else {
            &self.short_url
        }
    }
}

/// A `commentCard` action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentAction {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub data: CommentData,
    #[serde(default)]
    pub member_creator: MemberCreator,
}

impl CommentAction {
    pub fn text(&self) -> &str {
        &self.data.text
    }

    /// Full name when present, username otherwise.
    pub fn author(&self) -> &str {
        let full = self.member_creator.full_name.trim();
        if full.is_empty() {
            self.member_creator.username.trim()
        } else {
            full
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentData {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberCreator {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub full_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checklist {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub check_items: Vec<ChecklistItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub pos: f64,
}

/// Target state for a checklist item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckItemState {
    Complete,
    Incomplete,
}

impl CheckItemState {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckItemState::Complete => "complete",
            CheckItemState::Incomplete => "incomplete",
        }
    }
}

impl fmt::Display for CheckItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckItemState {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "complete" => Ok(CheckItemState::Complete),
            "incomplete" => Ok(CheckItemState::Incomplete),
            "" => Err(ApiError::config("missing checklist item state")),
            _ => Err(ApiError::config("state must be complete or incomplete")),
        }
    }
}

/// Form input for creating a card. Blank optional fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewCard {
    pub name: String,
    pub desc: String,
    /// ISO-8601 due date/time.
    pub due: String,
    /// Comma-separated label ids.
    pub labels: String,
    /// Comma-separated member ids.
    pub members: String,
}

impl NewCard {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
