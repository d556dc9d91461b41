//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{Me, Message};

use super::commands::{
    enqueue, handle_help_command, handle_search_command, handle_start_command, handle_status_command, reply, submit,
    Origin,
};
use super::types::{HandlerDeps, HandlerError, HandlerResult, PickClaim};
use crate::download::fetcher::FetchRequest;
use crate::download::platform::Platform;
use crate::telegram::bot::{is_private, is_reply_to_bot, Command};
use crate::telegram::picker;
use crate::telegram::router::{route, Inbound, Route};
use crate::telegram::Bot;

/// Creates the main dispatcher schema for the Telegram bot.
///
/// Commands first, then free text, then picker button presses.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    dptree::entry()
        .branch(command_handler(deps.clone()))
        .branch(message_handler(deps.clone()))
        .branch(callback_handler(deps))
}

fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("Received command {:?} from chat {}", cmd, msg.chat.id);
                match cmd {
                    Command::Start => handle_start_command(&bot, &msg, &deps).await,
                    Command::Help => handle_help_command(&bot, &msg, &deps).await,
                    Command::Search(query) => handle_search_command(&bot, &msg, &deps, &query).await,
                    Command::Status => handle_status_command(&bot, &msg, &deps).await,
                }
            }
        },
    ))
}

fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.text().is_some())
        .endpoint(move |bot: Bot, msg: Message, me: Me| {
            let deps = deps.clone();
            async move { handle_text(&bot, &msg, &me, &deps).await }
        })
}

async fn handle_text(bot: &Bot, msg: &Message, me: &Me, deps: &HandlerDeps) -> HandlerResult {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let Some(origin) = Origin::from_message(msg) else {
        return Ok(());
    };

    let inbound = Inbound {
        text,
        is_private: is_private(msg),
        is_reply_to_bot: is_reply_to_bot(msg, me),
    };

    match route(inbound, &deps.router) {
        Route::Download { url, platform } => {
            log::info!("User {} requested {} download: {}", origin.user_id, platform, url);
            submit(bot, deps, &origin, FetchRequest::new(url, platform)).await
        }
        Route::Search(query) => {
            log::info!("User {} searched: {}", origin.user_id, query);
            submit(bot, deps, &origin, FetchRequest::new(query, Platform::Search)).await
        }
        Route::Unsupported => reply(bot, &origin, "Unsupported platform").await,
        Route::Ignore => Ok(()),
    }
}

fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move { handle_pick(&bot, q, &deps).await }
    })
}

/// Answer for a press on a keyboard that is gone
pub const PICK_EXPIRED_TEXT: &str = "This search has expired. Send it again.";

/// Answer for a press on someone else's keyboard
pub const PICK_NOT_YOURS_TEXT: &str = "This is not your search.";

/// A press on a picker button: queue that exact video for whoever ran the search.
///
/// Only the requester may press, and only once; the search already passed
/// the cooldown gate when the keyboard was sent.
async fn handle_pick(bot: &Bot, q: CallbackQuery, deps: &HandlerDeps) -> HandlerResult {
    let video_id = q.data.as_deref().and_then(picker::parse_callback).map(str::to_string);
    let (Some(video_id), Some(picker_msg)) = (video_id, q.regular_message()) else {
        answer_callback(bot, &q, None).await;
        return Ok(());
    };

    let chat_id = picker_msg.chat.id;
    let pending = match deps.claim_pick((chat_id.0, picker_msg.id.0), q.from.id.0) {
        PickClaim::Claimed(pending) => pending,
        PickClaim::NotYours => {
            log::info!("User {} pressed a picker owned by someone else", q.from.id);
            answer_callback(bot, &q, Some(PICK_NOT_YOURS_TEXT)).await;
            return Ok(());
        }
        PickClaim::Expired => {
            answer_callback(bot, &q, Some(PICK_EXPIRED_TEXT)).await;
            return Ok(());
        }
    };
    answer_callback(bot, &q, None).await;

    if let Err(e) = bot.delete_message(chat_id, picker_msg.id).await {
        log::debug!("Failed to remove picker message: {}", e);
    }

    let origin = Origin {
        user_id: pending.requester,
        chat_id,
        message_id: picker_msg.reply_to_message().map(|m| m.id),
    };
    log::info!("User {} picked {} for {:?}", origin.user_id, video_id, pending.query);

    enqueue(
        bot,
        deps,
        &origin,
        FetchRequest::new(pending.query, Platform::Search).with_item(video_id),
    )
    .await
}

async fn answer_callback(bot: &Bot, q: &CallbackQuery, text: Option<&str>) {
    let mut request = bot.answer_callback_query(q.id.clone());
    if let Some(text) = text {
        request = request.text(text);
    }
    if let Err(e) = request.await {
        log::debug!("Failed to answer callback query: {}", e);
    }
}
