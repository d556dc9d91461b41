//! Mocked Bot API for handler and runner tests
//!
//! A wiremock server answers the Bot API methods the bot calls; tests read
//! back the received requests to check which calls were made and in what order.

#![allow(dead_code)]

use teloxide::types::{Me, Update};
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lashmedia::telegram::Bot;

pub const BOT_ID: u64 = 987654321;
pub const BOT_USERNAME: &str = "test_bot";

/// Bot pointed at the mock server
pub fn mock_bot(server: &MockServer) -> Bot {
    Bot::new("12345:TESTTOKEN").set_api_url(server.uri().parse().unwrap())
}

pub fn me() -> Me {
    serde_json::from_value(serde_json::json!({
        "id": BOT_ID,
        "is_bot": true,
        "first_name": "TestBot",
        "username": BOT_USERNAME,
        "can_join_groups": true,
        "can_read_all_group_messages": false,
        "supports_inline_queries": false,
        "can_connect_to_business": false,
        "has_main_web_app": false
    }))
    .unwrap()
}

fn sent_message(chat_id: i64) -> serde_json::Value {
    serde_json::json!({
        "ok": true,
        "result": {
            "message_id": 42,
            "from": { "id": BOT_ID, "is_bot": true, "first_name": "TestBot" },
            "chat": { "id": chat_id, "type": "private", "first_name": "Test" },
            "date": 1735992000,
            "text": "Response"
        }
    })
}

/// Answers `api_method` with a message in `chat_id`.
pub async fn mount_message(server: &MockServer, api_method: &str, chat_id: i64) {
    Mock::given(method("POST"))
        .and(path_regex(format!("(?i)/bot[^/]+/{}$", api_method)))
        .respond_with(ResponseTemplate::new(200).set_body_json(sent_message(chat_id)))
        .mount(server)
        .await;
}

/// Answers `api_method` with `true`.
pub async fn mount_true(server: &MockServer, api_method: &str) {
    Mock::given(method("POST"))
        .and(path_regex(format!("(?i)/bot[^/]+/{}$", api_method)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true, "result": true })))
        .mount(server)
        .await;
}

/// Answers `api_method` with a Bot API error.
pub async fn mount_error(server: &MockServer, api_method: &str, code: u16, description: &str) {
    Mock::given(method("POST"))
        .and(path_regex(format!("(?i)/bot[^/]+/{}$", api_method)))
        .respond_with(ResponseTemplate::new(code).set_body_json(serde_json::json!({
            "ok": false,
            "error_code": code,
            "description": description
        })))
        .mount(server)
        .await;
}

/// Every method the bot uses, all succeeding.
pub async fn mount_all(server: &MockServer, chat_id: i64) {
    for api_method in ["sendMessage", "editMessageText", "sendVideo", "sendAudio"] {
        mount_message(server, api_method, chat_id).await;
    }
    for api_method in ["deleteMessage", "answerCallbackQuery"] {
        mount_true(server, api_method).await;
    }
}

/// Bot API method names in the order they were received
pub async fn calls(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|r| r.url.path().rsplit('/').next().map(camel_case))
        .collect()
}

/// Raw bodies of the calls to `api_method`, in order
pub async fn bodies(server: &MockServer, api_method: &str) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| {
            r.url
                .path()
                .to_ascii_lowercase()
                .ends_with(&format!("/{}", api_method.to_ascii_lowercase()))
        })
        .map(|r| String::from_utf8_lossy(&r.body).into_owned())
        .collect()
}

/// teloxide requests `/SendMessage`; tests name methods as the Bot API does (`sendMessage`)
fn camel_case(name: &str) -> String {
    let mut chars = name.chars();
    chars
        .next()
        .map(|c| c.to_ascii_lowercase().to_string() + chars.as_str())
        .unwrap_or_default()
}

fn user(id: u64) -> serde_json::Value {
    serde_json::json!({ "id": id, "is_bot": false, "first_name": format!("User{}", id) })
}

/// Text message from `user_id` in their private chat
pub fn private_text(update_id: i32, message_id: i32, user_id: u64, text: &str) -> Update {
    serde_json::from_str(&serde_json::json!({
        "update_id": update_id,
        "message": {
            "message_id": message_id,
            "date": 1735992000,
            "chat": { "id": user_id, "type": "private", "first_name": format!("User{}", user_id) },
            "from": user(user_id),
            "text": text
        }
    })
    .to_string())
    .unwrap()
}

/// Press on a picker button sent in group `chat_id` as message `message_id`
pub fn picker_press(update_id: i32, chat_id: i64, message_id: i32, user_id: u64, video_id: &str) -> Update {
    let chat = serde_json::json!({ "id": chat_id, "type": "group", "title": "Music" });
    serde_json::from_str(&serde_json::json!({
        "update_id": update_id,
        "callback_query": {
            "id": format!("cb{}", update_id),
            "from": user(user_id),
            "chat_instance": "instance",
            "data": format!("pick:{}", video_id),
            "message": {
                "message_id": message_id,
                "date": 1735992000,
                "chat": chat.clone(),
                "from": { "id": BOT_ID, "is_bot": true, "first_name": "TestBot", "username": BOT_USERNAME },
                "text": "Choose a track:",
                "reply_to_message": {
                    "message_id": message_id - 1,
                    "date": 1735991990,
                    "chat": chat,
                    "from": user(7),
                    "text": "!believer"
                }
            }
        }
    })
    .to_string())
    .unwrap()
}
