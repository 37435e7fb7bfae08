use sea_orm::DatabaseConnection;
use tracing::debug;

use crate::claim::{self, ClaimOutcome};
use crate::db;
use crate::db::entities::coupon;
use crate::error::Result;
use crate::gate::MembershipGate;
use crate::messages::{Button, Markup, Reply};
use crate::parser;
use crate::session::{Sessions, Step, SubmissionSession};

pub const MENU_SUBMIT: &str = "📤 Submit Coupon";
pub const MENU_BROWSE: &str = "📜 Available Coupons";
pub const MENU_ABOUT: &str = "ℹ️ About Us";

/// Raw inbound event content as the transport delivers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Callback(String),
}

/// The closed set of things a user can ask for. Payload strings are parsed
/// into this once, at the boundary; everything downstream matches on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Start,
    Submit,
    Browse,
    About,
    PlatformChosen(String),
    ViewPlatform(String),
    Claim(String),
    Verify(String),
    Text(String),
}

impl Intent {
    /// `None` means an unrecognized callback token, which is dropped.
    /// Unrecognized text stays `Text` and may still carry a parseable
    /// coupon or a dialog answer.
    pub fn from_payload(payload: &Payload) -> Option<Intent> {
        match payload {
            Payload::Text(text) => Some(match text.as_str() {
                "/start" => Intent::Start,
                MENU_SUBMIT => Intent::Submit,
                MENU_BROWSE => Intent::Browse,
                MENU_ABOUT => Intent::About,
                _ => Intent::Text(text.clone()),
            }),
            Payload::Callback(data) => {
                if let Some(platform) = data.strip_prefix("plt_") {
                    Some(Intent::PlatformChosen(platform.to_owned()))
                } else if let Some(platform) = data.strip_prefix("view_") {
                    Some(Intent::ViewPlatform(platform.to_owned()))
                } else if let Some(id) = data.strip_prefix("claim_") {
                    Some(Intent::Claim(id.to_owned()))
                } else if let Some(id) = data.strip_prefix("verify_") {
                    Some(Intent::Verify(id.to_owned()))
                } else {
                    None
                }
            }
        }
    }
}

pub struct Dispatcher<G> {
    db: DatabaseConnection,
    gate: G,
    sessions: Sessions,
    quota: u64,
    platforms: Vec<String>,
}

impl<G: MembershipGate> Dispatcher<G> {
    pub fn new(db: DatabaseConnection, gate: G, quota: u64, platforms: Vec<String>) -> Self {
        Self {
            db,
            gate,
            sessions: Sessions::new(),
            quota,
            platforms,
        }
    }

    /// Handles one inbound event and returns the replies to send. Holds the
    /// user's session slot for the whole turn, so events for one user are
    /// handled strictly one at a time.
    pub async fn handle(&self, user_id: i64, chat_id: i64, payload: Payload) -> Result<Vec<Reply>> {
        let slot = self.sessions.slot(user_id);
        let mut session = slot.lock().await;

        let Some(intent) = Intent::from_payload(&payload) else {
            debug!(user = user_id, ?payload, "dropping unrecognized callback");
            return Ok(Vec::new());
        };

        match intent {
            Intent::Start => {
                *session = None;
                Ok(vec![main_menu(
                    chat_id,
                    "Welcome to Dealdrop! Select an option below to get started:",
                )])
            }
            Intent::Submit => {
                *session = Some(SubmissionSession::new());
                Ok(vec![self.platform_selection(chat_id)])
            }
            Intent::Browse => self.browse(chat_id).await,
            Intent::About => Ok(vec![Reply::text(chat_id, about_text(self.quota))]),
            Intent::PlatformChosen(platform) => {
                Ok(platform_chosen(&mut session, chat_id, platform))
            }
            Intent::ViewPlatform(platform) => self.view_platform(chat_id, &platform).await,
            Intent::Claim(id) => self.process_claim(user_id, chat_id, &id, false).await,
            Intent::Verify(id) => self.process_claim(user_id, chat_id, &id, true).await,
            Intent::Text(text) => {
                if session.is_some() {
                    self.submission_step(&mut session, user_id, chat_id, &text)
                        .await
                } else {
                    self.auto_detect(user_id, chat_id, &text).await
                }
            }
        }
    }

    fn platform_selection(&self, chat_id: i64) -> Reply {
        let mut rows: Vec<Vec<Button>> = self
            .platforms
            .iter()
            .map(|p| vec![Button::callback(p, format!("plt_{p}"))])
            .collect();
        rows.push(vec![Button::callback("Other", "plt_Other")]);
        Reply::with_markup(
            chat_id,
            "Which platform is this coupon for?",
            Markup::Inline(rows),
        )
    }

    async fn browse(&self, chat_id: i64) -> Result<Vec<Reply>> {
        let platforms = db::coupon::available_platforms(&self.db).await?;
        if platforms.is_empty() {
            return Ok(vec![Reply::text(
                chat_id,
                "No coupons are available at the moment.",
            )]);
        }
        let rows = platforms
            .iter()
            .map(|p| vec![Button::callback(p, format!("view_{p}"))])
            .collect();
        Ok(vec![Reply::with_markup(
            chat_id,
            "📌 **Available Platforms**",
            Markup::Inline(rows),
        )])
    }

    async fn view_platform(&self, chat_id: i64, platform: &str) -> Result<Vec<Reply>> {
        let coupons = db::coupon::list_available(platform, 10, &self.db).await?;
        if coupons.is_empty() {
            return Ok(vec![Reply::text(
                chat_id,
                "No coupons are available at the moment.",
            )]);
        }
        let rows = coupons
            .iter()
            .map(|c| {
                let label = match c.details.as_deref() {
                    Some(details) if !details.is_empty() => details.to_owned(),
                    _ => c.code.clone(),
                };
                vec![Button::callback(label, format!("claim_{}", c.id))]
            })
            .collect();
        Ok(vec![Reply::with_markup(
            chat_id,
            format!("🎁 **{platform} Coupons**"),
            Markup::Inline(rows),
        )])
    }

    async fn process_claim(
        &self,
        user_id: i64,
        chat_id: i64,
        coupon_id: &str,
        verifying: bool,
    ) -> Result<Vec<Reply>> {
        if !self.gate.is_member(user_id).await {
            if verifying {
                return Ok(vec![Reply::text(
                    chat_id,
                    format!(
                        "❌ You still haven't joined the channel. Please join {} and click verify again!",
                        self.gate.channel()
                    ),
                )]);
            }
            return Ok(vec![join_required(chat_id, self.gate.channel(), coupon_id)]);
        }

        match claim::claim(coupon_id, user_id, self.quota, &self.db).await? {
            ClaimOutcome::Claimed(coupon) => Ok(vec![claimed_reply(chat_id, &coupon)]),
            ClaimOutcome::LimitReached => Ok(vec![Reply::text(
                chat_id,
                format!(
                    "❌ **Daily Limit Reached**\nYou can only claim up to {} coupons every 24 hours!",
                    self.quota
                ),
            )]),
            ClaimOutcome::NotAvailable => Ok(vec![Reply::text(
                chat_id,
                "❌ Sorry, this coupon was just claimed by another user.",
            )]),
        }
    }

    async fn submission_step(
        &self,
        session: &mut Option<SubmissionSession>,
        user_id: i64,
        chat_id: i64,
        text: &str,
    ) -> Result<Vec<Reply>> {
        let Some(state) = session.as_mut() else {
            return Ok(Vec::new());
        };

        match state.step {
            // Waiting on a button, not on text.
            Step::SelectPlatform => Ok(Vec::new()),
            Step::EnterPlatformName => {
                state.platform = Some(text.to_owned());
                state.step = Step::EnterCode;
                Ok(vec![Reply::text(
                    chat_id,
                    format!("Platform set to: {text}. Now please paste the Coupon Code or redeem link:"),
                )])
            }
            Step::EnterCode => {
                state.code = Some(text.to_owned());
                state.step = Step::EnterDetails;
                Ok(vec![Reply::text(
                    chat_id,
                    "Great! Now enter a one-line description (max 100 characters, no line breaks):",
                )])
            }
            Step::EnterDetails => {
                if text.chars().count() > 100 || text.contains('\n') {
                    return Ok(vec![Reply::text(
                        chat_id,
                        "❌ **Description too long or multi-line.**\nPlease keep it to one short sentence (max 100 characters).",
                    )]);
                }

                let (platform, code) = (state.platform.clone(), state.code.clone());
                let (Some(platform), Some(code)) = (platform, code) else {
                    *session = None;
                    return Ok(Vec::new());
                };

                let coupon =
                    db::coupon::create(user_id, &code, &platform, Some(text), &self.db).await?;
                *session = None;
                Ok(vec![Reply::text(
                    chat_id,
                    format!(
                        "✅ **Success!** Your coupon for {} has been added.",
                        coupon.platform
                    ),
                )])
            }
        }
    }

    async fn auto_detect(&self, user_id: i64, chat_id: i64, text: &str) -> Result<Vec<Reply>> {
        let Some(parsed) = parser::parse(text) else {
            return Ok(Vec::new());
        };
        let coupon = db::coupon::create(
            user_id,
            &parsed.code,
            &parsed.platform,
            Some(&parsed.details),
            &self.db,
        )
        .await?;
        Ok(vec![Reply::text(
            chat_id,
            format!(
                "✅ Detected a {} coupon and saved `{}` to the pool.",
                coupon.platform, coupon.code
            ),
        )])
    }
}

fn platform_chosen(
    session: &mut Option<SubmissionSession>,
    chat_id: i64,
    platform: String,
) -> Vec<Reply> {
    match session.as_mut() {
        Some(state) if state.step == Step::SelectPlatform => {
            if platform == "Other" {
                state.step = Step::EnterPlatformName;
                vec![Reply::text(chat_id, "Please type the name of the platform:")]
            } else {
                state.step = Step::EnterCode;
                state.platform = Some(platform.clone());
                vec![Reply::text(
                    chat_id,
                    format!("Selected: {platform}. Now please paste the Coupon Code or Link:"),
                )]
            }
        }
        // A stale platform button outside an open dialog does nothing.
        _ => Vec::new(),
    }
}

fn main_menu(chat_id: i64, text: &str) -> Reply {
    Reply::with_markup(
        chat_id,
        text,
        Markup::Menu(vec![
            vec![MENU_SUBMIT.to_owned(), MENU_BROWSE.to_owned()],
            vec![MENU_ABOUT.to_owned()],
        ]),
    )
}

fn join_required(chat_id: i64, channel: &str, coupon_id: &str) -> Reply {
    let join_url = format!("https://t.me/{}", channel.trim_start_matches('@'));
    Reply::with_markup(
        chat_id,
        "🔒 **Join Required**",
        Markup::Inline(vec![
            vec![Button::url("📢 Join Channel", join_url)],
            vec![Button::callback("✅ I Joined", format!("verify_{coupon_id}"))],
        ]),
    )
}

fn claimed_reply(chat_id: i64, coupon: &coupon::Model) -> Reply {
    Reply::text(
        chat_id,
        format!(
            "✅ **Coupon Claimed!**\n\nYour code/link is:\n`{}`\n\nℹ️ **Coupon Description:**\n_{}_\n\nUse it quickly before it expires!",
            coupon.code,
            coupon.details.as_deref().unwrap_or_default()
        ),
    )
}

fn about_text(quota: u64) -> String {
    format!(
        "🌟 **About Dealdrop**\n\nThis bot is a community-driven platform where users voluntarily share coupons they won't use so others can benefit.\n\n✅ **Voluntary Submissions**\n✅ **Verified Claims**\n✅ **Fair Use Policy ({quota} claims/day)**\n\nMade with ❤️ for savers!"
    )
}
