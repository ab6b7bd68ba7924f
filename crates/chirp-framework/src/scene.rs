//! Multi-step conversational scenes.
//!
//! A [`Scene`] is a named, ordered list of steps. While a conversation is in
//! a scene, its session holds the scene name under [`SCENE_KEY`] and the
//! current step index under [`STEP_KEY`], and every incoming event goes to
//! the current step instead of the regular handlers.
//!
//! ```rust,ignore
//! let registration = Scene::new("registration")
//!     .step(|ctx| Box::pin(async move {
//!         ctx.reply("What is your name?").await?;
//!         Ok(StepOutcome::Accepted)
//!     }))
//!     .step(|ctx| Box::pin(async move {
//!         let Some(name) = ctx.text().map(str::to_owned) else {
//!             return Ok(StepOutcome::Rejected);
//!         };
//!         ctx.session_mut().insert("name", name);
//!         ctx.reply("Thanks!").await?;
//!         Ok(StepOutcome::Accepted)
//!     }));
//!
//! let scenes = Arc::new(SceneManager::new().with(registration));
//! dispatcher.use_boxed_middleware(scenes.middleware());
//! ```
//!
//! # Step advancement
//!
//! After a step returns, the step index is incremented only when all of
//! these hold:
//!
//! - the session still names this scene (the step did not leave or enter
//!   another scene)
//! - the step left the index where it was (it did not jump)
//! - the event carried text
//! - the step did not return [`StepOutcome::Rejected`]
//!
//! Advancing past the last step leaves the scene. Leaving wipes the whole
//! session.
//!
//! [`SCENE_KEY`]: chirp_core::SCENE_KEY
//! [`STEP_KEY`]: chirp_core::STEP_KEY

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::context::Context;
use crate::handler::{BoxFuture, HandlerResult};
use crate::middleware::{BoxedMiddleware, from_fn};

/// What a step decided about the current input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepOutcome {
    /// The input was taken; move on to the next step.
    #[default]
    Accepted,
    /// The input was not acceptable; stay on this step.
    Rejected,
}

/// A scene step function.
pub type StepFn =
    dyn for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult<StepOutcome>> + Send + Sync;

/// A type-erased scene step.
pub type BoxedStep = Arc<StepFn>;

/// A named sequence of steps.
pub struct Scene {
    name: String,
    steps: Vec<BoxedStep>,
}

impl Scene {
    /// Creates a scene with no steps.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Appends a step.
    pub fn step<F>(mut self, f: F) -> Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult<StepOutcome>>
            + Send
            + Sync
            + 'static,
    {
        self.steps.push(Arc::new(f));
        self
    }

    /// Appends a pre-built step.
    pub fn step_boxed(mut self, step: BoxedStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Enters the scene at step 0 and runs that step immediately.
    pub async fn enter(self: &Arc<Self>, ctx: &mut Context) -> HandlerResult {
        debug!(scene = %self.name, chat_id = %ctx.chat_id(), "Entering scene");
        let session = ctx.session_mut();
        session.set_scene(self.name.clone());
        session.set_step(0);
        ctx.set_scene(Some(Arc::clone(self)));
        self.handle(ctx).await
    }

    /// Runs the current step for this event.
    pub async fn handle(&self, ctx: &mut Context) -> HandlerResult {
        let step = ctx.session().step().unwrap_or(0);
        let Some(run) = self.steps.get(step) else {
            trace!(scene = %self.name, step, "Step out of range, leaving scene");
            self.leave(ctx);
            return Ok(());
        };

        trace!(scene = %self.name, step, "Running scene step");
        let outcome = run(ctx).await?;

        if ctx.session().scene() != Some(self.name.as_str()) {
            trace!(scene = %self.name, "Step moved the conversation out of this scene");
            return Ok(());
        }

        let unchanged = ctx.session().step() == Some(step);
        if unchanged && ctx.text().is_some() && outcome != StepOutcome::Rejected {
            let next = step + 1;
            if next >= self.steps.len() {
                debug!(scene = %self.name, "Scene completed");
                self.leave(ctx);
            } else {
                ctx.session_mut().set_step(next);
            }
        } else if outcome == StepOutcome::Rejected {
            trace!(scene = %self.name, step, "Step rejected input");
        }
        Ok(())
    }

    /// Leaves the scene, wiping the whole session.
    pub fn leave(&self, ctx: &mut Context) {
        ctx.leave_scene();
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("name", &self.name)
            .field("steps", &self.steps.len())
            .finish()
    }
}

/// Registry of scenes, and the middleware that routes events into them.
#[derive(Debug, Default)]
pub struct SceneManager {
    scenes: HashMap<String, Arc<Scene>>,
}

impl SceneManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a scene, replacing any scene with the same name.
    pub fn register(&mut self, scene: Scene) {
        self.scenes.insert(scene.name.clone(), Arc::new(scene));
    }

    /// Registers a scene (builder pattern).
    pub fn with(mut self, scene: Scene) -> Self {
        self.register(scene);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Scene>> {
        self.scenes.get(name)
    }

    /// Enters the scene called `name`. Unknown names are ignored.
    pub async fn enter(&self, name: &str, ctx: &mut Context) -> HandlerResult {
        match self.scenes.get(name) {
            Some(scene) => scene.enter(ctx).await,
            None => {
                warn!(scene = name, "Tried to enter an unregistered scene");
                Ok(())
            }
        }
    }

    /// Returns the scene the context's session points at, if it is
    /// registered and was not left during this dispatch.
    pub fn active_scene(&self, ctx: &Context) -> Option<Arc<Scene>> {
        if ctx.is_scene_stopped() {
            return None;
        }
        let name = ctx.session().scene()?;
        self.scenes.get(name).cloned()
    }

    /// Returns the middleware that hands events to the active scene.
    ///
    /// When a scene is active its current step runs and the rest of the
    /// chain is skipped. Otherwise control passes on.
    pub fn middleware(self: &Arc<Self>) -> BoxedMiddleware {
        let manager = Arc::clone(self);
        from_fn(move |ctx, next| {
            let manager = Arc::clone(&manager);
            Box::pin(async move {
                match manager.active_scene(ctx) {
                    Some(scene) => {
                        ctx.set_scene(Some(Arc::clone(&scene)));
                        scene.handle(ctx).await
                    }
                    None => next.run(ctx).await,
                }
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use chirp_core::{InboundEvent, SCENE_KEY};

    use super::*;
    use crate::testing::RecordingSender;

    fn context(text: &str) -> Context {
        Context::new(
            Arc::new(RecordingSender::new()),
            InboundEvent::text("123", text),
            "123",
        )
    }

    fn two_step() -> Arc<Scene> {
        Arc::new(
            Scene::new("survey")
                .step(|ctx| {
                    Box::pin(async move {
                        ctx.reply("Question?").await?;
                        Ok(StepOutcome::Accepted)
                    })
                })
                .step(|ctx| {
                    Box::pin(async move {
                        if ctx.text() == Some("valid") {
                            Ok(StepOutcome::Accepted)
                        } else {
                            ctx.reply("Try again").await?;
                            Ok(StepOutcome::Rejected)
                        }
                    })
                }),
        )
    }

    #[tokio::test]
    async fn test_enter_runs_first_step_and_advances() {
        let scene = two_step();
        let mut ctx = context("/survey");

        scene.enter(&mut ctx).await.unwrap();

        assert_eq!(ctx.session().scene(), Some("survey"));
        assert_eq!(ctx.session().step(), Some(1));
        assert!(ctx.scene().is_some());
    }

    #[tokio::test]
    async fn test_rejecting_step_does_not_advance() {
        let scene = two_step();
        let mut ctx = context("nope");
        ctx.session_mut().set_scene("survey");
        ctx.session_mut().set_step(1);

        scene.handle(&mut ctx).await.unwrap();

        assert_eq!(ctx.session().step(), Some(1));
        assert_eq!(ctx.session().scene(), Some("survey"));
    }

    #[tokio::test]
    async fn test_accepting_last_step_leaves_scene() {
        let scene = two_step();
        let mut ctx = context("valid");
        ctx.session_mut().set_scene("survey");
        ctx.session_mut().set_step(1);
        ctx.session_mut().insert("answer", "kept until leave");

        scene.handle(&mut ctx).await.unwrap();

        assert!(!ctx.session().contains_key(SCENE_KEY));
        assert!(ctx.session().is_empty());
        assert!(ctx.is_scene_stopped());
    }

    #[tokio::test]
    async fn test_no_text_does_not_advance() {
        let scene = two_step();
        let mut ctx = Context::new(
            Arc::new(RecordingSender::new()),
            InboundEvent::bare("123", "image"),
            "123",
        );
        ctx.session_mut().set_scene("survey");
        ctx.session_mut().set_step(0);

        scene.handle(&mut ctx).await.unwrap();

        assert_eq!(ctx.session().step(), Some(0));
    }

    #[tokio::test]
    async fn test_step_jump_is_respected() {
        let scene = Arc::new(
            Scene::new("jumper")
                .step(|ctx| {
                    Box::pin(async move {
                        ctx.session_mut().set_step(2);
                        Ok(StepOutcome::Accepted)
                    })
                })
                .step(|_ctx| Box::pin(async move { Ok(StepOutcome::Accepted) }))
                .step(|_ctx| Box::pin(async move { Ok(StepOutcome::Accepted) })),
        );
        let mut ctx = context("go");

        scene.enter(&mut ctx).await.unwrap();

        assert_eq!(ctx.session().step(), Some(2));
    }

    #[tokio::test]
    async fn test_out_of_range_step_leaves() {
        let scene = two_step();
        let mut ctx = context("hello");
        ctx.session_mut().set_scene("survey");
        ctx.session_mut().set_step(7);

        scene.handle(&mut ctx).await.unwrap();

        assert!(ctx.session().is_empty());
    }

    #[tokio::test]
    async fn test_non_numeric_step_defaults_to_first() {
        let scene = two_step();
        let mut ctx = context("hello");
        ctx.session_mut().set_scene("survey");
        ctx.session_mut().insert("step", "garbage");

        scene.handle(&mut ctx).await.unwrap();

        // The step ran, but the index was not a number so it is not advanced.
        assert_eq!(ctx.session().get_str("step"), Some("garbage"));
    }

    #[tokio::test]
    async fn test_last_step_can_enter_another_scene() {
        let follow_up = Arc::new(
            Scene::new("follow_up")
                .step(|ctx| {
                    Box::pin(async move {
                        ctx.reply("b0").await?;
                        Ok(StepOutcome::Accepted)
                    })
                })
                .step(|_ctx| Box::pin(async move { Ok(StepOutcome::Accepted) }))
                .step(|_ctx| Box::pin(async move { Ok(StepOutcome::Accepted) })),
        );
        let next = Arc::clone(&follow_up);
        let intro = Scene::new("intro")
            .step(|ctx| {
                Box::pin(async move {
                    ctx.reply("a0").await?;
                    Ok(StepOutcome::Accepted)
                })
            })
            .step(move |ctx| {
                let next = Arc::clone(&next);
                Box::pin(async move {
                    ctx.reply("a done").await?;
                    next.enter(ctx).await?;
                    Ok(StepOutcome::Accepted)
                })
            });

        let sender = Arc::new(RecordingSender::new());
        let mut ctx = Context::new(sender.clone(), InboundEvent::text("123", "go"), "123");
        ctx.session_mut().set_scene("intro");
        ctx.session_mut().set_step(1);

        intro.handle(&mut ctx).await.unwrap();

        assert_eq!(sender.texts_to("123"), vec!["a done", "b0"]);
        assert_eq!(ctx.session().scene(), Some("follow_up"));
        assert_eq!(ctx.session().step(), Some(1));
    }

    #[tokio::test]
    async fn test_manager_ignores_unknown_scene() {
        let manager = SceneManager::new().with(Scene::new("known"));
        let mut ctx = context("x");

        manager.enter("missing", &mut ctx).await.unwrap();

        assert!(ctx.session().is_empty());
    }

    #[tokio::test]
    async fn test_manager_active_scene_respects_stop() {
        let manager = SceneManager::new().with(Scene::new("known"));
        let mut ctx = context("x");
        ctx.session_mut().set_scene("known");
        assert!(manager.active_scene(&ctx).is_some());

        ctx.leave_scene();
        ctx.session_mut().set_scene("known");
        assert!(manager.active_scene(&ctx).is_none());
    }
}
