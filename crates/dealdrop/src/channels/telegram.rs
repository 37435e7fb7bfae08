// Dealdrop
// Copyright (C) 2026 Throneless Tech

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::dispatch::{Dispatcher, Payload};
use crate::error::{DealdropError, Result};
use crate::gate::MembershipGate;
use crate::messages::{Button, ButtonAction, Markup, Reply};

/// Seconds one getUpdates call stays open on the Telegram side.
const POLL_TIMEOUT: u64 = 30;
/// Pause after a failed poll before trying again.
const POLL_BACKOFF: Duration = Duration::from_secs(5);
/// Client-side cap per request. Must outlast the long poll.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(40);

/*
Bot API JSON shapes, reduced to the fields this bot reads.
*/

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMember {
    status: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

/// Thin client over the Telegram Bot API. Constructed once at startup and
/// handed by reference to the poller and the membership gate.
#[derive(Debug, Clone)]
pub struct TelegramApi {
    http: reqwest::Client,
    base: Url,
}

impl TelegramApi {
    pub fn new(api_url: &Url, token: &str) -> Result<Self> {
        let base = api_url.join(&format!("bot{token}/"))?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, base })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, payload: &Value) -> Result<T> {
        let url = self.base.join(method)?;
        let response: ApiResponse<T> = self
            .http
            .post(url)
            .json(payload)
            .send()
            .await?
            .json()
            .await?;

        if !response.ok {
            return Err(DealdropError::Telegram(
                response
                    .description
                    .unwrap_or_else(|| format!("{method} failed")),
            ));
        }
        response
            .result
            .ok_or_else(|| DealdropError::Telegram(format!("{method}: empty result")))
    }

    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        self.call(
            "getUpdates",
            &json!({
                "offset": offset,
                "timeout": POLL_TIMEOUT,
                "allowed_updates": ["message", "callback_query"],
            }),
        )
        .await
    }

    pub async fn send_reply(&self, reply: &Reply) -> Result<Message> {
        let mut payload = json!({
            "chat_id": reply.chat_id,
            "text": reply.text,
            "parse_mode": "Markdown",
        });
        if let Some(markup) = &reply.markup {
            payload["reply_markup"] = render_markup(markup);
        }
        self.call("sendMessage", &payload).await
    }

    pub async fn answer_callback(&self, callback_query_id: &str) -> Result<bool> {
        self.call(
            "answerCallbackQuery",
            &json!({ "callback_query_id": callback_query_id }),
        )
        .await
    }

    /// Long polling requires no webhook to be registered.
    pub async fn delete_webhook(&self) -> Result<bool> {
        self.call("deleteWebhook", &json!({ "drop_pending_updates": false }))
            .await
    }

    pub async fn chat_member_status(&self, chat: &str, user_id: i64) -> Result<String> {
        let member: ChatMember = self
            .call(
                "getChatMember",
                &json!({ "chat_id": chat, "user_id": user_id }),
            )
            .await?;
        Ok(member.status)
    }
}

fn render_markup(markup: &Markup) -> Value {
    match markup {
        Markup::Inline(rows) => json!({
            "inline_keyboard": rows
                .iter()
                .map(|row| row.iter().map(render_button).collect::<Vec<_>>())
                .collect::<Vec<_>>(),
        }),
        Markup::Menu(rows) => json!({
            "keyboard": rows,
            "resize_keyboard": true,
        }),
    }
}

fn render_button(button: &Button) -> Value {
    match &button.action {
        ButtonAction::Callback(data) => json!({ "text": button.label, "callback_data": data }),
        ButtonAction::Url(url) => json!({ "text": button.label, "url": url }),
    }
}

/// Membership gate backed by getChatMember against the required channel.
pub struct ChannelGate {
    api: TelegramApi,
    channel: String,
}

impl ChannelGate {
    pub fn new(api: TelegramApi, channel: impl Into<String>) -> Self {
        Self {
            api,
            channel: channel.into(),
        }
    }
}

#[async_trait]
impl MembershipGate for ChannelGate {
    async fn is_member(&self, user_id: i64) -> bool {
        match self.api.chat_member_status(&self.channel, user_id).await {
            Ok(status) => matches!(
                status.as_str(),
                "creator" | "administrator" | "member" | "restricted"
            ),
            Err(err) => {
                warn!(%err, user = user_id, "membership check failed, treating as non-member");
                false
            }
        }
    }

    fn channel(&self) -> &str {
        &self.channel
    }
}

/// Pulls updates until shutdown, dispatching each on its own task. Ordering
/// per user is the dispatcher's job; transport failures only delay the next
/// poll.
pub async fn receive_from<G: MembershipGate + 'static>(
    api: TelegramApi,
    dispatcher: Arc<Dispatcher<G>>,
    shutdown: CancellationToken,
) {
    let mut offset = 0;
    info!("telegram channel polling for updates");

    loop {
        let updates = tokio::select! {
            _ = shutdown.cancelled() => break,
            updates = api.get_updates(offset) => match updates {
                Ok(updates) => updates,
                Err(err) => {
                    warn!(%err, "getUpdates failed, backing off");
                    tokio::time::sleep(POLL_BACKOFF).await;
                    continue;
                }
            },
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            let Some(event) = extract_event(update) else {
                continue;
            };
            let api = api.clone();
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                deliver(api, dispatcher, event).await;
            });
        }
    }

    info!("telegram channel stopped");
}

struct InboundEvent {
    user_id: i64,
    chat_id: i64,
    payload: Payload,
    callback_query_id: Option<String>,
}

fn extract_event(update: Update) -> Option<InboundEvent> {
    if let Some(query) = update.callback_query {
        let chat_id = query.message.as_ref().map(|m| m.chat.id)?;
        let data = query.data?;
        return Some(InboundEvent {
            user_id: query.from.id,
            chat_id,
            payload: Payload::Callback(data),
            callback_query_id: Some(query.id),
        });
    }

    let message = update.message?;
    let user = message.from?;
    let text = message.text?;
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(InboundEvent {
        user_id: user.id,
        chat_id: message.chat.id,
        payload: Payload::Text(text.to_owned()),
        callback_query_id: None,
    })
}

async fn deliver<G: MembershipGate>(
    api: TelegramApi,
    dispatcher: Arc<Dispatcher<G>>,
    event: InboundEvent,
) {
    if let Some(id) = &event.callback_query_id {
        if let Err(err) = api.answer_callback(id).await {
            debug!(%err, "answerCallbackQuery failed");
        }
    }

    match dispatcher
        .handle(event.user_id, event.chat_id, event.payload)
        .await
    {
        Ok(replies) => {
            for reply in replies {
                if let Err(err) = api.send_reply(&reply).await {
                    error!(%err, chat = reply.chat_id, "failed to send reply");
                }
            }
        }
        Err(err) => error!(%err, user = event.user_id, "dispatch failed"),
    }
}

#[cfg(test)]
mod test_telegram {
    use super::*;

    #[test]
    fn it_should_extract_text_events() {
        let update: Update = serde_json::from_value(json!({
            "update_id": 42,
            "message": {
                "message_id": 1,
                "from": { "id": 7 },
                "chat": { "id": 70 },
                "text": "  hello  ",
            },
        }))
        .unwrap();

        let event = extract_event(update).unwrap();
        assert_eq!(event.user_id, 7);
        assert_eq!(event.chat_id, 70);
        assert_eq!(event.payload, Payload::Text("hello".to_owned()));
        assert_eq!(event.callback_query_id, None);
    }

    #[test]
    fn it_should_extract_callback_events() {
        let update: Update = serde_json::from_value(json!({
            "update_id": 43,
            "callback_query": {
                "id": "cb1",
                "from": { "id": 7 },
                "message": {
                    "message_id": 1,
                    "chat": { "id": 70 },
                },
                "data": "plt_Canva",
            },
        }))
        .unwrap();

        let event = extract_event(update).unwrap();
        assert_eq!(event.user_id, 7);
        assert_eq!(event.chat_id, 70);
        assert_eq!(event.payload, Payload::Callback("plt_Canva".to_owned()));
        assert_eq!(event.callback_query_id, Some("cb1".to_owned()));
    }

    #[test]
    fn it_should_skip_empty_and_memberless_updates() {
        let update: Update = serde_json::from_value(json!({
            "update_id": 44,
            "message": {
                "message_id": 1,
                "from": { "id": 7 },
                "chat": { "id": 70 },
                "text": "   ",
            },
        }))
        .unwrap();
        assert!(extract_event(update).is_none());

        let update: Update = serde_json::from_value(json!({ "update_id": 45 })).unwrap();
        assert!(extract_event(update).is_none());
    }

    #[test]
    fn it_should_render_inline_keyboards() {
        let markup = Markup::Inline(vec![vec![
            Button::callback("Canva", "plt_Canva"),
            Button::url("Join", "https://t.me/dealdrop"),
        ]]);
        assert_eq!(
            render_markup(&markup),
            json!({
                "inline_keyboard": [[
                    { "text": "Canva", "callback_data": "plt_Canva" },
                    { "text": "Join", "url": "https://t.me/dealdrop" },
                ]],
            })
        );
    }

    #[test]
    fn it_should_render_menu_keyboards() {
        let markup = Markup::Menu(vec![vec!["A".to_owned()], vec!["B".to_owned()]]);
        assert_eq!(
            render_markup(&markup),
            json!({ "keyboard": [["A"], ["B"]], "resize_keyboard": true })
        );
    }
}
