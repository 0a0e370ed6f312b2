//! In-memory stand-in for the subset of the Trello REST API the client uses.
//!
//! Every request must carry `key=test-key&token=test-token` in its query
//! string; anything else gets a plain-text 401 like the real service. Each
//! request that reaches the server is appended to a log so tests can assert
//! how many calls were made and with which query parameters.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{Arc, Mutex},
};

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const MOCK_KEY: &str = "test-key";
pub const MOCK_TOKEN: &str = "test-token";

const NOT_FOUND: &str = "The requested resource was not found.";
const FIXED_DATE: &str = "2026-01-01T00:00:00.000Z";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    pub name: String,
    pub url: String,
    pub closed: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct List {
    pub id: String,
    pub id_board: String,
    pub name: String,
    pub closed: bool,
    pub pos: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub name: String,
    pub desc: String,
    pub id_list: String,
    pub short_url: String,
    pub url: String,
    pub due: Option<String>,
    pub closed: bool,
    pub id_labels: Vec<String>,
    pub id_members: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckItem {
    pub id: String,
    pub name: String,
    pub state: String,
    pub pos: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checklist {
    pub id: String,
    pub id_card: String,
    pub name: String,
    pub check_items: Vec<CheckItem>,
}

#[derive(Clone, Debug)]
pub struct Comment {
    pub id: String,
    pub id_card: String,
    pub text: String,
}

#[derive(Clone, Debug, Default)]
pub struct Data {
    pub boards: Vec<Board>,
    pub lists: Vec<List>,
    pub cards: Vec<Card>,
    pub comments: Vec<Comment>,
    pub checklists: Vec<Checklist>,
}

impl Data {
    /// Board `b1` has lists chosen to exercise name resolution: a sole exact
    /// match with a partial sibling ("To Do" / "To Do Later"), an exact match
    /// with a partial sibling ("Backlog" / "Backlog Old"), and a
    /// case-insensitive duplicate ("Done" / "done"). Board `b2` is empty.
    pub fn seeded() -> Self {
        let board = |id: &str, name: &str, closed| Board {
            id: id.to_string(),
            name: name.to_string(),
            url: format!("https://trello.com/b/{id}"),
            closed,
        };
        let boards = vec![
            board("b1", "Engineering", false),
            board("b2", "Empty Board", false),
            board("b3", "Archive", true),
        ];

        let lists = ["To Do", "Doing", "To Do Later", "Done", "done", "Backlog", "Backlog Old"]
            .iter()
            .enumerate()
            .map(|(i, name)| List {
                id: format!("l{}", i + 1),
                id_board: "b1".to_string(),
                name: name.to_string(),
                closed: false,
                // Stored out of order so clients must sort by position.
                pos: ((7 - i) * 1024) as f64,
            })
            .collect();

        let cards = vec![
            new_card("c1", "Draft roadmap", "l1"),
            new_card("c2", "Review PR", "l2"),
        ];

        Self {
            boards,
            lists,
            cards,
            ..Self::default()
        }
    }
}

fn new_card(id: &str, name: &str, id_list: &str) -> Card {
    Card {
        id: id.to_string(),
        name: name.to_string(),
        desc: String::new(),
        id_list: id_list.to_string(),
        short_url: format!("https://trello.com/c/{id}"),
        url: format!("https://trello.com/c/{id}/{}", name.to_lowercase().replace(' ', "-")),
        due: None,
        closed: false,
        id_labels: Vec::new(),
        id_members: Vec::new(),
    }
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()[..24].to_string()
}

/// A request as seen by the server, before authentication.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: BTreeMap<String, String>,
}

#[derive(Clone, Debug)]
pub struct AppState {
    db: Arc<RwLock<Data>>,
    log: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl AppState {
    pub fn new(data: Data) -> Self {
        Self {
            db: Arc::new(RwLock::new(data)),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn seeded() -> Self {
        Self::new(Data::seeded())
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear_requests(&self) {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    fn record(&self, request: RecordedRequest) {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).push(request);
    }
}

pub fn app() -> Router {
    app_with_state(AppState::seeded())
}

pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .route("/1/members/me/boards", get(list_boards))
        .route("/1/boards/{id}/lists", get(list_lists))
        .route("/1/lists/{id}/cards", get(list_cards))
        .route("/1/cards", post(create_card))
        .route("/1/cards/{id}", get(get_card).put(update_card))
        .route("/1/cards/{id}/actions", get(list_comments))
        .route("/1/cards/{id}/actions/comments", post(add_comment))
        .route("/1/cards/{id}/checklists", get(list_checklists).post(create_checklist))
        .route("/1/checklists/{id}/checkItems", post(add_check_item))
        .route("/1/cards/{card}/checkItem/{item}", put(update_check_item))
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, AppState::seeded()).await
}

pub async fn run_with_state(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

type Params = HashMap<String, String>;
type ApiResult = Result<Json<Value>, Response>;

async fn authenticate(
    State(state): State<AppState>,
    Query(params): Query<Params>,
    request: Request,
    next: Next,
) -> Response {
    state.record(RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        query: params.clone().into_iter().collect(),
    });
    if params.get("key").map(String::as_str) != Some(MOCK_KEY) {
        tracing::debug!(path = %request.uri().path(), "rejected key");
        return (StatusCode::UNAUTHORIZED, "invalid key").into_response();
    }
    if params.get("token").map(String::as_str) != Some(MOCK_TOKEN) {
        tracing::debug!(path = %request.uri().path(), "rejected token");
        return (StatusCode::UNAUTHORIZED, "invalid token").into_response();
    }
    next.run(request).await
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, NOT_FOUND).into_response()
}

/// Validation failure in the `{"message", "error"}` envelope.
fn invalid(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "message": message, "error": "ERROR" })),
    )
        .into_response()
}

/// Keep `id` plus the comma-separated `fields`, like the real API does.
fn select(value: Value, fields: Option<&String>) -> Value {
    let Some(fields) = fields else {
        return value;
    };
    if fields == "all" {
        return value;
    }
    let wanted: HashSet<&str> = fields.split(',').map(str::trim).collect();
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(k, _)| k == "id" || wanted.contains(k.as_str()))
                .collect(),
        ),
        other => other,
    }
}

fn select_all<T: Serialize>(items: &[T], params: &Params) -> Value {
    Value::Array(
        items
            .iter()
            .map(|item| select(json!(item), params.get("fields")))
            .collect(),
    )
}

fn limit(params: &Params) -> usize {
    params
        .get("limit")
        .and_then(|l| l.parse().ok())
        .unwrap_or(1000)
}

async fn list_boards(State(state): State<AppState>, Query(params): Query<Params>) -> Json<Value> {
    let db = state.db.read().await;
    Json(select_all(&db.boards, &params))
}

async fn list_lists(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<Params>,
) -> ApiResult {
    let db = state.db.read().await;
    if !db.boards.iter().any(|b| b.id == id) {
        return Err(not_found());
    }
    let lists: Vec<List> = db.lists.iter().filter(|l| l.id_board == id).cloned().collect();
    Ok(Json(select_all(&lists, &params)))
}

async fn list_cards(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<Params>,
) -> ApiResult {
    let db = state.db.read().await;
    if !db.lists.iter().any(|l| l.id == id) {
        return Err(not_found());
    }
    let cards: Vec<Card> = db
        .cards
        .iter()
        .filter(|c| c.id_list == id && !c.closed)
        .take(limit(&params))
        .cloned()
        .collect();
    Ok(Json(select_all(&cards, &params)))
}

async fn get_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<Params>,
) -> ApiResult {
    let db = state.db.read().await;
    let card = db.cards.iter().find(|c| c.id == id).ok_or_else(not_found)?;
    Ok(Json(select(json!(card), params.get("fields"))))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCard {
    pub id_list: Option<String>,
    pub name: Option<String>,
    pub desc: Option<String>,
    pub due: Option<String>,
    pub id_labels: Option<String>,
    pub id_members: Option<String>,
}

fn split_ids(ids: Option<String>) -> Vec<String> {
    ids.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

async fn create_card(State(state): State<AppState>, Form(input): Form<CreateCard>) -> ApiResult {
    let mut db = state.db.write().await;
    let id_list = input.id_list.unwrap_or_default();
    if !db.lists.iter().any(|l| l.id == id_list) {
        return Err(invalid("invalid value for idList"));
    }
    let mut card = new_card(&new_id(), &input.name.unwrap_or_default(), &id_list);
    card.desc = input.desc.unwrap_or_default();
    card.due = input.due;
    card.id_labels = split_ids(input.id_labels);
    card.id_members = split_ids(input.id_members);
    db.cards.push(card.clone());
    Ok(Json(json!(card)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCard {
    pub id_list: Option<String>,
    pub closed: Option<String>,
    pub name: Option<String>,
}

async fn update_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(input): Form<UpdateCard>,
) -> ApiResult {
    let mut db = state.db.write().await;
    if let Some(id_list) = &input.id_list {
        if !db.lists.iter().any(|l| &l.id == id_list) {
            return Err(invalid("invalid value for idList"));
        }
    }
    let card = db.cards.iter_mut().find(|c| c.id == id).ok_or_else(not_found)?;
    if let Some(id_list) = input.id_list {
        card.id_list = id_list;
    }
    if let Some(closed) = input.closed {
        card.closed = closed == "true";
    }
    if let Some(name) = input.name {
        card.name = name;
    }
    Ok(Json(json!(card)))
}

fn comment_json(comment: &Comment) -> Value {
    json!({
        "id": comment.id,
        "type": "commentCard",
        "date": FIXED_DATE,
        "data": { "text": comment.text, "card": { "id": comment.id_card } },
        "memberCreator": { "id": "m1", "username": "mock", "fullName": "Mock User" },
    })
}

async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<Params>,
) -> ApiResult {
    let db = state.db.read().await;
    if !db.cards.iter().any(|c| c.id == id) {
        return Err(not_found());
    }
    if params.get("filter").map(String::as_str) != Some("commentCard") {
        return Ok(Json(json!([])));
    }
    let comments: Vec<Value> = db
        .comments
        .iter()
        .rev()
        .filter(|c| c.id_card == id)
        .take(limit(&params))
        .map(comment_json)
        .collect();
    Ok(Json(Value::Array(comments)))
}

#[derive(Deserialize)]
pub struct AddComment {
    pub text: Option<String>,
}

async fn add_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(input): Form<AddComment>,
) -> ApiResult {
    let mut db = state.db.write().await;
    if !db.cards.iter().any(|c| c.id == id) {
        return Err(not_found());
    }
    let text = input.text.unwrap_or_default();
    if text.trim().is_empty() {
        return Err(invalid("invalid value for text"));
    }
    let comment = Comment {
        id: new_id(),
        id_card: id,
        text,
    };
    db.comments.push(comment.clone());
    Ok(Json(comment_json(&comment)))
}

async fn list_checklists(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let db = state.db.read().await;
    if !db.cards.iter().any(|c| c.id == id) {
        return Err(not_found());
    }
    let checklists: Vec<&Checklist> = db.checklists.iter().filter(|c| c.id_card == id).collect();
    Ok(Json(json!(checklists)))
}

#[derive(Deserialize)]
pub struct CreateChecklist {
    pub name: Option<String>,
}

async fn create_checklist(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(input): Form<CreateChecklist>,
) -> ApiResult {
    let mut db = state.db.write().await;
    if !db.cards.iter().any(|c| c.id == id) {
        return Err(not_found());
    }
    let checklist = Checklist {
        id: new_id(),
        id_card: id,
        name: input.name.unwrap_or_else(|| "Checklist".to_string()),
        check_items: Vec::new(),
    };
    db.checklists.push(checklist.clone());
    Ok(Json(json!(checklist)))
}

#[derive(Deserialize)]
pub struct AddCheckItem {
    pub name: Option<String>,
    pub checked: Option<String>,
}

async fn add_check_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(input): Form<AddCheckItem>,
) -> ApiResult {
    let mut db = state.db.write().await;
    let checklist = db.checklists.iter_mut().find(|c| c.id == id).ok_or_else(not_found)?;
    let name = input.name.unwrap_or_default();
    if name.trim().is_empty() {
        return Err(invalid("invalid value for name"));
    }
    let item_state = if input.checked.as_deref() == Some("true") {
        "complete"
    } else {
        "incomplete"
    };
    let item = CheckItem {
        id: new_id(),
        name,
        state: item_state.to_string(),
        pos: ((checklist.check_items.len() + 1) * 16384) as f64,
    };
    checklist.check_items.push(item.clone());
    Ok(Json(json!(item)))
}

#[derive(Deserialize)]
pub struct UpdateCheckItem {
    pub state: Option<String>,
}

async fn update_check_item(
    State(state): State<AppState>,
    Path((card, item)): Path<(String, String)>,
    Form(input): Form<UpdateCheckItem>,
) -> ApiResult {
    let new_state = match input.state.as_deref() {
        Some(s @ ("complete" | "incomplete")) => s.to_string(),
        _ => return Err(invalid("invalid value for state")),
    };
    let mut db = state.db.write().await;
    let found = db
        .checklists
        .iter_mut()
        .filter(|c| c.id_card == card)
        .flat_map(|c| c.check_items.iter_mut())
        .find(|i| i.id == item);
    match found {
        Some(check_item) => {
            check_item.state = new_state;
            Ok(Json(json!(check_item)))
        }
        None => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "check item not found on card" })),
        )
            .into_response()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_keeps_id_and_requested_fields() {
        let card = new_card("c1", "Ship", "l1");
        let selected = select(json!(card), Some(&"name,idList".to_string()));
        let keys: Vec<&String> = selected.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 3);
        assert_eq!(selected["id"], "c1");
        assert_eq!(selected["idList"], "l1");
        assert!(selected.get("desc").is_none());
    }

    #[test]
    fn select_without_fields_returns_everything() {
        let card = new_card("c1", "Ship", "l1");
        let selected = select(json!(card), None);
        assert!(selected.get("shortUrl").is_some());
        assert!(selected.get("idLabels").is_some());
    }

    #[test]
    fn seeded_board_has_resolution_fixtures() {
        let data = Data::seeded();
        let names: Vec<&str> = data.lists.iter().map(|l| l.name.as_str()).collect();
        assert!(names.contains(&"To Do Later"));
        assert!(names.contains(&"Done") && names.contains(&"done"));
        assert!(data.lists.iter().all(|l| l.id_board == "b1"));
    }

    #[test]
    fn create_card_form_uses_camel_case() {
        let input: CreateCard =
            serde_json::from_str(r#"{"idList":"l1","name":"x","idLabels":"a,b"}"#).unwrap();
        assert_eq!(input.id_list.as_deref(), Some("l1"));
        assert_eq!(split_ids(input.id_labels), vec!["a", "b"]);
    }

    #[test]
    fn new_ids_look_like_trello_ids() {
        let id = new_id();
        assert_eq!(id.len(), 24);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
