use std::cell::{Cell, RefCell};
use std::time::Duration;

use glam::Vec2;
use tokio_util::sync::CancellationToken;

use crate::entity::{CameraRig, EntityRef};

/// Camera that eases towards its target on every tick.
///
/// Each [`tick`](FollowCamera::tick) moves the camera by the follow speed
/// fraction of the remaining distance to the target position plus offset.
pub struct FollowCamera {
    position: Cell<Vec2>,
    offset: Vec2,
    target: RefCell<Option<(EntityRef, f32)>>,
}

impl FollowCamera {
    pub fn new(offset: Vec2) -> Self {
        Self {
            position: Cell::new(Vec2::ZERO),
            offset,
            target: RefCell::new(None),
        }
    }

    pub fn at(self, position: Vec2) -> Self {
        self.position.set(position);
        self
    }

    pub fn set_position(&self, position: Vec2) {
        self.position.set(position);
    }

    /// Name of the entity being followed.
    pub fn target_name(&self) -> Option<String> {
        self.target
            .borrow()
            .as_ref()
            .map(|(entity, _)| entity.name().to_string())
    }

    pub fn stop_following(&self) {
        self.target.borrow_mut().take();
    }

    /// Advance the camera one step towards its target.
    pub fn tick(&self) {
        let target = self.target.borrow().clone();
        if let Some((entity, speed)) = target {
            let desired = entity.position() + self.offset;
            let factor = speed.clamp(0.0, 1.0);
            self.position.set(self.position.get().lerp(desired, factor));
        }
    }

    /// Tick every `interval` until `token` is cancelled.
    pub async fn run(&self, interval: Duration, token: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => self.tick(),
            }
        }
    }
}

impl CameraRig for FollowCamera {
    fn position(&self) -> Vec2 {
        self.position.get()
    }

    fn position_offset(&self) -> Vec2 {
        self.offset
    }

    fn follow_target(&self, target: EntityRef, follow_speed: f32) {
        *self.target.borrow_mut() = Some((target, follow_speed));
    }
}
