use serde::{Deserialize, Serialize};

/// One outbound chat message. The channel adapter renders the markup into
/// whatever the transport's keyboard format is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub chat_id: i64,
    pub text: String,
    pub markup: Option<Markup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Markup {
    /// Buttons attached to the message itself.
    Inline(Vec<Vec<Button>>),
    /// A persistent menu keyboard replacing the user's input keyboard.
    Menu(Vec<Vec<String>>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub action: ButtonAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ButtonAction {
    /// Tapping sends this token back as a callback payload.
    Callback(String),
    /// Tapping opens the URL.
    Url(String),
}

impl Reply {
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            markup: None,
        }
    }

    pub fn with_markup(chat_id: i64, text: impl Into<String>, markup: Markup) -> Self {
        Self {
            chat_id,
            text: text.into(),
            markup: Some(markup),
        }
    }
}

impl Button {
    pub fn callback(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Callback(data.into()),
        }
    }

    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Url(url.into()),
        }
    }
}
