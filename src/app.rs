//! Application context wiring registries, entities and playback together.

use std::rc::Rc;

use tracing::info;

use crate::config::Config;
use crate::cutscene::PlaybackOrchestrator;
use crate::entity::{CameraRig, CapabilityServices, EntityFacade, EntityResolver};
use crate::registry::{ActionRegistry, EventBus};
use crate::scene::EntityRegistry;
use crate::script::{DirectoryScriptSource, ScriptSource};
use crate::Result;

/// Everything a host needs to expose actions and events and to play
/// cutscenes.
pub struct Application {
    config: Config,
    actions: Rc<ActionRegistry>,
    events: Rc<EventBus>,
    facade: Rc<EntityFacade>,
    orchestrator: PlaybackOrchestrator,
}

impl Application {
    pub fn builder(config: Config) -> ApplicationBuilder {
        ApplicationBuilder::new(config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn actions(&self) -> &Rc<ActionRegistry> {
        &self.actions
    }

    pub fn events(&self) -> &Rc<EventBus> {
        &self.events
    }

    pub fn facade(&self) -> &Rc<EntityFacade> {
        &self.facade
    }

    pub fn orchestrator(&self) -> &PlaybackOrchestrator {
        &self.orchestrator
    }

    /// Play `Chap{chapter}/{name}`. Returns whether it completed.
    pub async fn play(&self, chapter: u32, name: &str) -> bool {
        self.orchestrator.play(chapter, name).await
    }

    pub fn cancel(&self) -> bool {
        self.orchestrator.cancel()
    }

    /// Stop playback, destroy the session and drop every registration.
    pub fn shutdown(&self) {
        self.orchestrator.shutdown();
        self.actions.clear();
        self.events.clear();
        info!("LuaFlow shut down");
    }
}

/// Builder for [`Application`].
///
/// Without an explicit resolver an empty [`EntityRegistry`] is used, and
/// without a script source scripts are read from `playback.scripts_dir`.
pub struct ApplicationBuilder {
    config: Config,
    resolver: Option<Rc<dyn EntityResolver>>,
    source: Option<Rc<dyn ScriptSource>>,
    camera: Option<Rc<dyn CameraRig>>,
    actions: Option<Rc<ActionRegistry>>,
    events: Option<Rc<EventBus>>,
}

impl ApplicationBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            resolver: None,
            source: None,
            camera: None,
            actions: None,
            events: None,
        }
    }

    pub fn with_resolver(mut self, resolver: Rc<dyn EntityResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_source(mut self, source: Rc<dyn ScriptSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_camera(mut self, camera: Rc<dyn CameraRig>) -> Self {
        self.camera = Some(camera);
        self
    }

    /// Share an existing action registry.
    pub fn with_actions(mut self, actions: Rc<ActionRegistry>) -> Self {
        self.actions = Some(actions);
        self
    }

    /// Share an existing event bus.
    pub fn with_events(mut self, events: Rc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Validate the configuration and assemble the application.
    pub fn build(self) -> Result<Application> {
        self.config.validate()?;

        let actions = self
            .actions
            .unwrap_or_else(|| Rc::new(ActionRegistry::new()));
        let events = self.events.unwrap_or_else(|| Rc::new(EventBus::new()));

        let services = CapabilityServices {
            actions: Rc::clone(&actions),
            events: Rc::clone(&events),
            camera: self.camera,
            movement: self.config.movement.clone(),
            camera_settings: self.config.camera.clone(),
        };

        let resolver = self
            .resolver
            .unwrap_or_else(|| Rc::new(EntityRegistry::new()));
        let facade = Rc::new(EntityFacade::new(
            resolver,
            Rc::new(services),
            self.config.playback.tick_interval(),
        ));

        let source = self.source.unwrap_or_else(|| {
            Rc::new(DirectoryScriptSource::new(&self.config.playback.scripts_dir))
        });
        let orchestrator = PlaybackOrchestrator::new(
            source,
            Rc::clone(&facade),
            self.config.script.clone(),
            self.config.playback.entry_function.clone(),
        );

        Ok(Application {
            config: self.config,
            actions,
            events,
            facade,
            orchestrator,
        })
    }
}
