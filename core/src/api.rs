//! Typed Trello operations.
//!
//! # Design
//! Each operation validates its required inputs, builds the query or form
//! for one endpoint and hands it to [`Transport`]. Operations that accept a
//! [`ListTarget`] resolve it first, so a by-name call costs exactly two
//! sequential requests and a by-id call costs one. Validation errors are
//! raised before any request is made.

use crate::error::{ApiError, Result};
use crate::http::{HttpExecutor, UreqExecutor};
use crate::resolve::Resolver;
use crate::transport::{params, segment, Params, Transport};
use crate::types::{
    Board, Card, CheckItemState, Checklist, ChecklistItem, CommentAction, NewCard, TrelloList,
    BOARD_FIELDS, CARD_FIELDS, CHECKLIST_FIELDS, CHECK_ITEM_FIELDS, COMMENT_FIELDS,
    COMMENT_MEMBER_FIELDS,
};

/// Page size used when the caller does not pick one.
pub const DEFAULT_LIMIT: usize = 100;

/// A list referenced either by id or by name within a board.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListTarget {
    pub board_id: String,
    pub list_id: String,
    pub list_name: String,
}

impl ListTarget {
    pub fn id(list_id: impl Into<String>) -> Self {
        Self {
            list_id: list_id.into(),
            ..Self::default()
        }
    }

    pub fn named(board_id: impl Into<String>, list_name: impl Into<String>) -> Self {
        Self {
            board_id: board_id.into(),
            list_name: list_name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrelloApi<E = UreqExecutor> {
    transport: Transport<E>,
}

impl<E: HttpExecutor> TrelloApi<E> {
    pub fn new(transport: Transport<E>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Transport<E> {
        &self.transport
    }

    pub fn resolver(&self) -> Resolver<'_, E> {
        Resolver::new(&self.transport)
    }

    /// Boards visible to the token owner, sorted by name.
    ///
    /// `filter` keeps boards whose name contains it, ignoring case.
    pub fn boards(&self, filter: Option<&str>) -> Result<Vec<Board>> {
        let query = params([("fields", BOARD_FIELDS)]);
        let mut boards: Vec<Board> = self
            .transport
            .get("/1/members/me/boards", &query)?
            .unwrap_or_default();

        if let Some(needle) = filter.map(|f| f.trim().to_lowercase()) {
            if !needle.is_empty() {
                boards.retain(|b| b.name.to_lowercase().contains(&needle));
            }
        }
        boards.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(boards)
    }

    /// Lists on a board in board order.
    pub fn lists(&self, board_id: &str) -> Result<Vec<TrelloList>> {
        let board_id = required(board_id, "a board id")?;
        let mut lists = self.resolver().board_lists(board_id)?;
        lists.sort_by(|a, b| a.pos.total_cmp(&b.pos));
        Ok(lists)
    }

    /// Resolve `target` to a list id. An explicit id never costs a request.
    pub fn resolve_list(&self, target: &ListTarget) -> Result<String> {
        self.resolver()
            .resolve_target(&target.board_id, &target.list_id, &target.list_name)
    }

    pub fn cards(&self, target: &ListTarget, limit: usize) -> Result<Vec<Card>> {
        let list_id = self.resolve_list(target)?;
        let path = format!("/1/lists/{}/cards", segment(&list_id));
        let query = params([
            ("fields", CARD_FIELDS.to_string()),
            ("limit", limit.to_string()),
        ]);
        Ok(self.transport.get(&path, &query)?.unwrap_or_default())
    }

    pub fn card(&self, card_id: &str) -> Result<Card> {
        let card_id = required(card_id, "a card id")?;
        let path = format!("/1/cards/{}", segment(card_id));
        let query = params([("fields", CARD_FIELDS)]);
        Ok(self.transport.get(&path, &query)?.unwrap_or_default())
    }

    pub fn create_card(&self, target: &ListTarget, card: &NewCard) -> Result<Card> {
        let name = required(&card.name, "a card name")?;
        let list_id = self.resolve_list(target)?;

        let mut form = params([("idList", list_id.as_str()), ("name", name)]);
        insert_non_blank(&mut form, "desc", &card.desc);
        insert_non_blank(&mut form, "due", &card.due);
        insert_non_blank(&mut form, "idLabels", &card.labels);
        insert_non_blank(&mut form, "idMembers", &card.members);

        Ok(self.transport.post("/1/cards", &form)?.unwrap_or_default())
    }

    pub fn move_card(&self, card_id: &str, target: &ListTarget) -> Result<Card> {
        let card_id = required(card_id, "a card id")?;
        let list_id = self.resolve_list(target)?;
        let path = format!("/1/cards/{}", segment(card_id));
        let form = params([("idList", list_id)]);
        Ok(self.transport.put(&path, &form)?.unwrap_or_default())
    }

    pub fn archive_card(&self, card_id: &str) -> Result<Card> {
        let card_id = required(card_id, "a card id")?;
        let path = format!("/1/cards/{}", segment(card_id));
        let form = params([("closed", "true")]);
        Ok(self.transport.put(&path, &form)?.unwrap_or_default())
    }

    pub fn comments(&self, card_id: &str, limit: usize) -> Result<Vec<CommentAction>> {
        let card_id = required(card_id, "a card id")?;
        let path = format!("/1/cards/{}/actions", segment(card_id));
        let query = params([
            ("filter", "commentCard".to_string()),
            ("fields", COMMENT_FIELDS.to_string()),
            ("memberCreator_fields", COMMENT_MEMBER_FIELDS.to_string()),
            ("limit", limit.to_string()),
        ]);
        Ok(self.transport.get(&path, &query)?.unwrap_or_default())
    }

    pub fn add_comment(&self, card_id: &str, text: &str) -> Result<CommentAction> {
        let card_id = required(card_id, "a card id")?;
        required(text, "comment text")?;
        let path = format!("/1/cards/{}/actions/comments", segment(card_id));
        let form = params([("text", text)]);
        Ok(self.transport.post(&path, &form)?.unwrap_or_default())
    }

    pub fn checklists(&self, card_id: &str) -> Result<Vec<Checklist>> {
        let card_id = required(card_id, "a card id")?;
        let path = format!("/1/cards/{}/checklists", segment(card_id));
        let query = params([
            ("fields", CHECKLIST_FIELDS),
            ("checkItems", "all"),
            ("checkItem_fields", CHECK_ITEM_FIELDS),
        ]);
        Ok(self.transport.get(&path, &query)?.unwrap_or_default())
    }

    pub fn create_checklist(&self, card_id: &str, name: &str) -> Result<Checklist> {
        let card_id = required(card_id, "a card id")?;
        required(name, "a checklist name")?;
        let path = format!("/1/cards/{}/checklists", segment(card_id));
        let form = params([("name", name)]);
        Ok(self.transport.post(&path, &form)?.unwrap_or_default())
    }

    pub fn add_check_item(&self, checklist_id: &str, name: &str, checked: bool) -> Result<ChecklistItem> {
        let checklist_id = required(checklist_id, "a checklist id")?;
        required(name, "an item name")?;
        let path = format!("/1/checklists/{}/checkItems", segment(checklist_id));
        let mut form = params([("name", name)]);
        if checked {
            form.insert("checked".to_string(), "true".to_string());
        }
        Ok(self.transport.post(&path, &form)?.unwrap_or_default())
    }

    pub fn set_check_item(
        &self,
        card_id: &str,
        item_id: &str,
        state: CheckItemState,
    ) -> Result<ChecklistItem> {
        let card_id = required(card_id, "a card id")?;
        let item_id = required(item_id, "a checklist item id")?;
        let path = format!(
            "/1/cards/{}/checkItem/{}",
            segment(card_id),
            segment(item_id)
        );
        let form = params([("state", state.as_str())]);
        Ok(self.transport.put(&path, &form)?.unwrap_or_default())
    }
}

fn required<'a>(value: &'a str, what: &str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::config(format!("{what} is required")));
    }
    Ok(value)
}

fn insert_non_blank(form: &mut Params, key: &str, value: &str) {
    if !value.trim().is_empty() {
        form.insert(key.to_string(), value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::http::HttpMethod;
    use crate::transport::testing::{query_of, transport, ScriptedExecutor};

    fn api(executor: ScriptedExecutor) -> TrelloApi<ScriptedExecutor> {
        TrelloApi::new(transport(executor))
    }

    fn form_of(body: &str) -> Vec<(String, String)> {
        url::form_urlencoded::parse(body.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    fn has_pair(pairs: &[(String, String)], key: &str, value: &str) -> bool {
        pairs.iter().any(|(k, v)| k == key && v == value)
    }

    const LISTS: &str = r#"[
        {"id":"l1","name":"To Do","closed":false,"pos":2},
        {"id":"l2","name":"Doing","closed":false,"pos":1}
    ]"#;

    #[test]
    fn boards_are_filtered_and_sorted() {
        let body = r#"[
            {"id":"b2","name":"Roadmap","url":"u2","closed":false},
            {"id":"b1","name":"Eng Platform","url":"u1","closed":false},
            {"id":"b3","name":"Eng Apps","url":"u3","closed":true}
        ]"#;
        let api = api(ScriptedExecutor::new().respond(200, body));
        let boards = api.boards(Some("  ENG ")).unwrap();
        let names: Vec<_> = boards.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Eng Apps", "Eng Platform"]);

        let req = &api.transport().executor().requests()[0];
        assert!(has_pair(&query_of(req), "fields", BOARD_FIELDS));
    }

    #[test]
    fn lists_are_sorted_by_position() {
        let api = api(ScriptedExecutor::new().respond(200, LISTS));
        let lists = api.lists("b1").unwrap();
        assert_eq!(lists[0].name, "Doing");
        assert_eq!(lists[1].name, "To Do");
    }

    #[test]
    fn lists_require_board() {
        let api = api(ScriptedExecutor::new());
        assert!(matches!(api.lists("  "), Err(ApiError::Config(_))));
        assert_eq!(api.transport().executor().calls(), 0);
    }

    #[test]
    fn cards_by_list_name_resolve_then_fetch() {
        let api = api(
            ScriptedExecutor::new()
                .respond(200, LISTS)
                .respond(200, r#"[{"id":"c1","name":"Ship","idList":"l1"}]"#),
        );
        let cards = api.cards(&ListTarget::named("b1", "to do"), 25).unwrap();
        assert_eq!(cards.len(), 1);

        let requests = api.transport().executor().requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].url.contains("/1/lists/l1/cards?"));
        let query = query_of(&requests[1]);
        assert!(has_pair(&query, "limit", "25"));
        assert!(has_pair(&query, "fields", CARD_FIELDS));
    }

    #[test]
    fn cards_by_id_make_one_call() {
        let api = api(ScriptedExecutor::new().respond(200, "[]"));
        let cards = api.cards(&ListTarget::id("l7"), DEFAULT_LIMIT).unwrap();
        assert!(cards.is_empty());
        let requests = api.transport().executor().requests();
        assert_eq!(requests.len(), 1);
        assert!(has_pair(&query_of(&requests[0]), "limit", "100"));
    }

    #[test]
    fn create_card_sends_only_non_blank_fields() {
        let api = api(
            ScriptedExecutor::new()
                .respond(200, LISTS)
                .respond(200, r#"{"id":"c9","name":"Build CLI","idList":"l1"}"#),
        );
        let card = NewCard {
            name: "Build CLI".to_string(),
            desc: "Initial implementation".to_string(),
            due: "  ".to_string(),
            labels: "lab1,lab2".to_string(),
            members: String::new(),
        };
        let created = api
            .create_card(&ListTarget::named("b1", "To Do"), &card)
            .unwrap();
        assert_eq!(created.id, "c9");

        let req = &api.transport().executor().requests()[1];
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(
            form_of(req.body.as_deref().unwrap()),
            vec![
                ("desc".to_string(), "Initial implementation".to_string()),
                ("idLabels".to_string(), "lab1,lab2".to_string()),
                ("idList".to_string(), "l1".to_string()),
                ("name".to_string(), "Build CLI".to_string()),
            ]
        );
    }

    #[test]
    fn create_card_checks_name_before_resolving() {
        let api = api(ScriptedExecutor::new());
        let err = api
            .create_card(&ListTarget::named("b1", "To Do"), &NewCard::named(" "))
            .unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
        assert_eq!(api.transport().executor().calls(), 0);
    }

    #[test]
    fn create_card_with_ambiguous_list_makes_no_post() {
        let lists = r#"[{"id":"l1","name":"Done"},{"id":"l2","name":"done"}]"#;
        let api = api(ScriptedExecutor::new().respond(200, lists));
        let err = api
            .create_card(&ListTarget::named("b1", "done"), &NewCard::named("x"))
            .unwrap_err();
        assert!(matches!(err, ApiError::Ambiguous { count: 2, .. }));
        assert_eq!(api.transport().executor().calls(), 1);
    }

    #[test]
    fn move_card_puts_resolved_list() {
        let api = api(
            ScriptedExecutor::new()
                .respond(200, LISTS)
                .respond(200, r#"{"id":"c1","idList":"l2"}"#),
        );
        let moved = api.move_card("c1", &ListTarget::named("b1", "doing")).unwrap();
        assert_eq!(moved.id_list, "l2");
        let req = &api.transport().executor().requests()[1];
        assert_eq!(req.method, HttpMethod::Put);
        assert!(req.url.contains("/1/cards/c1?"));
        assert_eq!(req.body.as_deref(), Some("idList=l2"));
    }

    #[test]
    fn archive_card_sets_closed() {
        let api = api(ScriptedExecutor::new().respond(200, r#"{"id":"c1","closed":true}"#));
        let card = api.archive_card("c1").unwrap();
        assert!(card.closed);
        let req = &api.transport().executor().requests()[0];
        assert_eq!(req.body.as_deref(), Some("closed=true"));
    }

    #[test]
    fn empty_body_yields_zero_value_entity() {
        let api = api(ScriptedExecutor::new().respond(200, ""));
        assert_eq!(api.card("c1").unwrap(), Card::default());
    }

    #[test]
    fn comments_query_selects_comment_fields() {
        let api = api(ScriptedExecutor::new().respond(200, "[]"));
        api.comments("c1", 10).unwrap();
        let query = query_of(&api.transport().executor().requests()[0]);
        assert!(has_pair(&query, "filter", "commentCard"));
        assert!(has_pair(&query, "fields", COMMENT_FIELDS));
        assert!(has_pair(&query, "memberCreator_fields", COMMENT_MEMBER_FIELDS));
        assert!(has_pair(&query, "limit", "10"));
    }

    #[test]
    fn add_comment_requires_text() {
        let api = api(ScriptedExecutor::new());
        assert!(matches!(api.add_comment("c1", " "), Err(ApiError::Config(_))));
        assert!(matches!(api.add_comment("", "hi"), Err(ApiError::Config(_))));
        assert_eq!(api.transport().executor().calls(), 0);
    }

    #[test]
    fn checklists_request_all_items() {
        let api = api(ScriptedExecutor::new().respond(200, "[]"));
        api.checklists("c1").unwrap();
        let query = query_of(&api.transport().executor().requests()[0]);
        assert!(has_pair(&query, "checkItems", "all"));
        assert!(has_pair(&query, "checkItem_fields", CHECK_ITEM_FIELDS));
        assert!(has_pair(&query, "fields", CHECKLIST_FIELDS));
    }

    #[test]
    fn add_check_item_sends_checked_only_when_set() {
        let api = api(
            ScriptedExecutor::new()
                .respond(200, r#"{"id":"i1","name":"a","state":"incomplete"}"#)
                .respond(200, r#"{"id":"i2","name":"b","state":"complete"}"#),
        );
        api.add_check_item("k1", "a", false).unwrap();
        api.add_check_item("k1", "b", true).unwrap();
        let requests = api.transport().executor().requests();
        assert_eq!(requests[0].body.as_deref(), Some("name=a"));
        assert_eq!(requests[1].body.as_deref(), Some("checked=true&name=b"));
        assert!(requests[0].url.contains("/1/checklists/k1/checkItems?"));
    }

    #[test]
    fn set_check_item_escapes_ids() {
        let api = api(ScriptedExecutor::new().respond(200, r#"{"id":"i/1","state":"complete"}"#));
        let item = api
            .set_check_item("c1", "i/1", CheckItemState::Complete)
            .unwrap();
        assert_eq!(item.state, "complete");
        let req = &api.transport().executor().requests()[0];
        assert!(req.url.contains("/1/cards/c1/checkItem/i%2F1?"));
        assert_eq!(req.body.as_deref(), Some("state=complete"));
    }
}
