//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use glam::Vec2;

use luaflow::{
    Application, Config, EntityRef, EntityRegistry, FollowCamera, MemoryScriptSource,
    SceneObject, TimedAnimator,
};

/// Length of the "wave" clip on the player's animator.
pub const WAVE_LENGTH: Duration = Duration::from_millis(600);

/// A small scene with a player, a guide and a camera, plus in-memory
/// scripts.
pub struct Stage {
    pub app: Application,
    pub scene: Rc<EntityRegistry>,
    pub scripts: Rc<MemoryScriptSource>,
    pub camera: Rc<FollowCamera>,
    pub player: Rc<SceneObject>,
    pub guide: Rc<SceneObject>,
    pub animator: Rc<TimedAnimator>,
}

impl Stage {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let animator = Rc::new(TimedAnimator::new().with_clip("wave", WAVE_LENGTH));
        let player = Rc::new(SceneObject::new("Player").with_animator(animator.clone()));
        let guide = Rc::new(SceneObject::new("Guide").at(5.0, 0.0));

        let scene = Rc::new(EntityRegistry::new());
        let player_ref: EntityRef = player.clone();
        let guide_ref: EntityRef = guide.clone();
        scene.register("Player", player_ref);
        scene.register("Guide", guide_ref);

        let scripts = Rc::new(MemoryScriptSource::new());
        let camera = Rc::new(FollowCamera::new(Vec2::new(0.0, 1.0)));

        let app = Application::builder(config)
            .with_resolver(scene.clone())
            .with_source(scripts.clone())
            .with_camera(camera.clone())
            .build()
            .expect("valid test configuration");

        Self {
            app,
            scene,
            scripts,
            camera,
            player,
            guide,
            animator,
        }
    }

    /// Add a chapter 1 script.
    pub fn script(&self, name: &str, source: &str) {
        self.scripts.insert(1, name, source);
    }
}

/// Shared log of strings recorded by host callbacks.
pub fn recorder() -> Rc<RefCell<Vec<String>>> {
    Rc::new(RefCell::new(Vec::new()))
}

/// Register a `record(text)` action appending to `log`.
pub fn register_record(stage: &Stage, log: &Rc<RefCell<Vec<String>>>) {
    let log = Rc::clone(log);
    stage
        .app
        .actions()
        .register_with("record", move |text: String| {
            log.borrow_mut().push(text);
            Ok(())
        })
        .expect("record registers once");
}
