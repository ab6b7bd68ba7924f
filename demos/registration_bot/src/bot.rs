//! Handlers and scenes of the registration bot.

use std::sync::{Arc, LazyLock};

use anyhow::Result;
use chirp::prelude::*;
use regex::Regex;
use tracing::{error, info};

const PHOTO_URL: &str = "https://www.w3schools.com/w3images/lights.jpg";
const DOCUMENT_URL: &str = "https://www.w3.org/WAI/ER/tests/xhtml/testfiles/resources/pdf/dummy.pdf";
const AUDIO_URL: &str = "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-1.mp3";
const VIDEO_URL: &str = "https://www.w3schools.com/html/mov_bbb.mp4";

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+").expect("email pattern is valid"));

/// The `registration` scene: first name, last name, email.
pub fn registration_scene() -> Scene {
    Scene::new("registration")
        .step(|ctx| {
            Box::pin(async move {
                ctx.reply("Welcome to registration! What is your first name?")
                    .await?;
                Ok(StepOutcome::Accepted)
            })
        })
        .step(|ctx| {
            Box::pin(async move {
                let Some(first_name) = ctx.text().map(str::to_owned) else {
                    return Ok(StepOutcome::Rejected);
                };
                ctx.session_mut().insert("first_name", first_name);
                ctx.reply("What is your last name?").await?;
                Ok(StepOutcome::Accepted)
            })
        })
        .step(|ctx| {
            Box::pin(async move {
                let Some(last_name) = ctx.text().map(str::to_owned) else {
                    ctx.reply("Please enter your last name.").await?;
                    return Ok(StepOutcome::Rejected);
                };
                ctx.session_mut().insert("last_name", last_name);
                ctx.reply("What is your email address?").await?;
                Ok(StepOutcome::Accepted)
            })
        })
        .step(|ctx| {
            Box::pin(async move {
                let Some(email) = ctx.text().filter(|t| EMAIL.is_match(t)).map(str::to_owned)
                else {
                    ctx.reply("Please enter a valid email address.").await?;
                    return Ok(StepOutcome::Rejected);
                };
                info!(
                    first_name = ?ctx.session().get_str("first_name"),
                    last_name = ?ctx.session().get_str("last_name"),
                    %email,
                    "Registration complete"
                );
                ctx.reply("Registration complete!").await?;
                ctx.leave_scene();
                Ok(StepOutcome::Accepted)
            })
        })
}

fn replying(
    text: &'static str,
) -> impl for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static {
    move |ctx| {
        Box::pin(async move {
            ctx.reply(text).await?;
            Ok(())
        })
    }
}

fn keyboard(text: &str, labels: &[&str]) -> Result<OutgoingMessage> {
    let row = labels.iter().map(|label| Button::reply(*label)).collect();
    Ok(Markup::keyboard(text, vec![row])?.into())
}

/// Registers every middleware, route and the error handler.
pub fn install(dispatcher: &mut Dispatcher) -> Result<()> {
    let scenes = Arc::new(SceneManager::new().with(registration_scene()));

    dispatcher.catch(|err, ctx| {
        Box::pin(async move {
            error!(error = %format!("{err:#}"), "Global error");
            ctx.reply(format!("An error occurred: {err}")).await?;
            Ok(())
        })
    });

    dispatcher
        .use_boxed_middleware(logger())
        .use_boxed_middleware(scenes.middleware());

    dispatcher
        .command(
            ["/start", "/help"],
            replying("Welcome! Type /registration to begin."),
        )
        .hears(
            vec![
                TriggerItem::from("hi"),
                TriggerItem::from("hello"),
                TriggerItem::from(Regex::new(r"^test$")?),
            ],
            replying("Hello! How can I assist you today?"),
        )
        .command("/registration", move |ctx| {
            let scenes = Arc::clone(&scenes);
            Box::pin(async move { scenes.enter("registration", ctx).await })
        });

    // Media
    dispatcher
        .hears("/photo", |ctx| {
            Box::pin(async move {
                ctx.reply_with_photo(PHOTO_URL, None).await?;
                ctx.reply(keyboard("Choose an option:", &["Yes", "No"])?)
                    .await?;
                Ok(())
            })
        })
        .on("image", |ctx| {
            Box::pin(async move {
                ctx.reply("You sent an image!").await?;
                ctx.reply_with_photo(PHOTO_URL, None).await?;
                Ok(())
            })
        })
        .on("document", |ctx| {
            Box::pin(async move {
                if !ctx.documents().is_empty() {
                    ctx.reply("You sent a document!").await?;
                    ctx.reply_with_document(DOCUMENT_URL).await?;
                }
                Ok(())
            })
        })
        .on("audio", |ctx| {
            Box::pin(async move {
                ctx.reply("You sent an audio file!").await?;
                ctx.reply_with_audio(AUDIO_URL).await?;
                Ok(())
            })
        })
        .on("video", |ctx| {
            Box::pin(async move {
                ctx.reply("You sent a video!").await?;
                ctx.reply_with_video(VIDEO_URL).await?;
                Ok(())
            })
        });

    // Keyboards and button replies
    dispatcher
        .hears("/keyboard", |ctx| {
            Box::pin(async move {
                ctx.reply(keyboard("Choose an option:", &["Yes", "No", "test button"])?)
                    .await?;
                Ok(())
            })
        })
        .hears("test button", replying("You clicked test button!"))
        .hears("Yes", replying("You clicked Yes!"))
        .hears("No", replying("You clicked No!"))
        .hears("inlineKeyboard", |ctx| {
            Box::pin(async move {
                ctx.reply(keyboard(
                    "Click a button:",
                    &["Button 1", "Button 2", "Visit Google"],
                )?)
                .await?;
                Ok(())
            })
        })
        .hears("Button 1", |ctx| {
            Box::pin(async move {
                ctx.reply("You clicked Inline Button 1 ✅").await?;
                ctx.reply_with_photo(PHOTO_URL, None).await?;
                Ok(())
            })
        })
        .hears("Button 2", |ctx| {
            Box::pin(async move {
                ctx.reply("You clicked Inline Button 2 ✅").await?;
                ctx.reply_with_document(DOCUMENT_URL).await?;
                Ok(())
            })
        })
        .hears("Visit Google", replying("You clicked Visit Google!"))
        .hears(Regex::new("(?i)yes")?, replying("You clicked Button Yes"))
        .hears(Regex::new("(?i)no")?, replying("You clicked Button No"));

    // Everything else is echoed.
    dispatcher.on("message", |ctx| {
        Box::pin(async move {
            if ctx.is_handled() {
                return Ok(());
            }
            let echo = format!("Echo: {}", ctx.text().unwrap_or_default());
            ctx.reply(echo).await?;
            Ok(())
        })
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use chirp::core::{InboundEvent, MemorySessionStore, SessionStore};
    use chirp::framework::testing::RecordingSender;
    use serde_json::json;

    use super::*;

    const CHAT: &str = "15550001111";

    fn bot() -> (Arc<RecordingSender>, Arc<MemorySessionStore>, Dispatcher) {
        let sender = Arc::new(RecordingSender::new());
        let store = Arc::new(MemorySessionStore::new());
        let mut dispatcher = Dispatcher::new(sender.clone()).with_session_store(store.clone());
        install(&mut dispatcher).unwrap();
        (sender, store, dispatcher)
    }

    async fn say(dispatcher: &Dispatcher, text: &str) {
        dispatcher
            .dispatch(InboundEvent::text(CHAT, text))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_start_and_help_share_a_reply() {
        let (sender, _store, dispatcher) = bot();
        say(&dispatcher, "/start").await;
        say(&dispatcher, "/help").await;

        assert_eq!(
            sender.texts_to(CHAT),
            vec![
                "Welcome! Type /registration to begin.",
                "Welcome! Type /registration to begin."
            ]
        );
    }

    #[tokio::test]
    async fn test_registration_flow() {
        let (sender, store, dispatcher) = bot();

        say(&dispatcher, "/registration").await;
        say(&dispatcher, "Ada").await;
        say(&dispatcher, "Lovelace").await;

        let session = store.get(CHAT).await.unwrap().unwrap();
        assert_eq!(session.scene(), Some("registration"));
        assert_eq!(session.get_str("first_name"), Some("Ada"));
        assert_eq!(session.get_str("last_name"), Some("Lovelace"));

        say(&dispatcher, "not an email").await;
        say(&dispatcher, "ada@example.com").await;

        assert_eq!(
            sender.texts_to(CHAT),
            vec![
                "Welcome to registration! What is your first name?",
                "What is your last name?",
                "What is your email address?",
                "Please enter a valid email address.",
                "Registration complete!",
            ]
        );
        let session = store.get(CHAT).await.unwrap().unwrap_or_default();
        assert!(session.is_empty());

        // Back to regular routing once the scene is done.
        say(&dispatcher, "hi").await;
        assert_eq!(
            sender.texts_to(CHAT).last().map(String::as_str),
            Some("Hello! How can I assist you today?")
        );
    }

    #[tokio::test]
    async fn test_unmatched_text_is_echoed() {
        let (sender, _store, dispatcher) = bot();
        say(&dispatcher, "what's up").await;

        assert_eq!(sender.texts_to(CHAT), vec!["Echo: what's up"]);
    }

    #[tokio::test]
    async fn test_keyboard_payload() {
        let (sender, _store, dispatcher) = bot();
        say(&dispatcher, "/keyboard").await;

        let sent = sender.sent();
        assert_eq!(sent.len(), 1);
        let OutgoingMessage::Payload(payload) = &sent[0].1 else {
            panic!("expected an interactive payload");
        };
        assert_eq!(payload["type"], json!("interactive"));
        assert_eq!(
            payload["interactive"]["action"]["buttons"][2]["reply"],
            json!({ "id": "test button", "title": "test button" })
        );
    }

    #[tokio::test]
    async fn test_button_reply_routes_by_id() {
        let (sender, _store, dispatcher) = bot();
        dispatcher
            .dispatch(InboundEvent::button_reply(CHAT, "Yes", "Yes"))
            .await
            .unwrap();

        assert_eq!(sender.texts_to(CHAT), vec!["You clicked Yes!"]);
    }

    #[tokio::test]
    async fn test_image_gets_text_and_photo() {
        let (sender, _store, dispatcher) = bot();
        dispatcher
            .dispatch(InboundEvent::bare(CHAT, "image"))
            .await
            .unwrap();

        assert_eq!(sender.len(), 2);
        assert_eq!(sender.texts_to(CHAT), vec!["You sent an image!"]);
    }

    #[tokio::test]
    async fn test_document_without_attachment_is_ignored() {
        let (sender, _store, dispatcher) = bot();
        dispatcher
            .dispatch(InboundEvent::bare(CHAT, "document"))
            .await
            .unwrap();

        assert!(sender.is_empty());
    }

    #[tokio::test]
    async fn test_delivery_failure_reaches_error_handler() {
        let sender = Arc::new(RecordingSender::failing());
        let mut dispatcher = Dispatcher::new(sender.clone());
        install(&mut dispatcher).unwrap();

        // The error handler's own reply fails too, so the error surfaces.
        let result = dispatcher.dispatch(InboundEvent::text(CHAT, "/start")).await;
        assert!(result.is_err());

        let texts = sender.texts_to(CHAT);
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0], "Welcome! Type /registration to begin.");
        assert!(texts[1].starts_with("An error occurred: "));
    }
}
