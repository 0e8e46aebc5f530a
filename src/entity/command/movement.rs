use std::cell::Cell;
use std::rc::Rc;

use glam::Vec2;
use mlua::{UserData, UserDataMethods};
use tracing::{debug, warn};

use super::{add_command_meta, CommandBase, CommandRef, ScriptCommand};
use crate::entity::{CapabilityKind, EntityRef};
use crate::scope::SessionScope;
use crate::{FlowError, Result};

/// Tick-driven movement of an entity towards a target point.
///
/// Each tick advances the entity by `speed * tick` units. Movement ends
/// once the entity is within the arrival threshold of the target, at which
/// point it is placed exactly on the target.
pub struct MovementCommand {
    base: CommandBase,
    speed: Cell<f32>,
}

impl MovementCommand {
    pub(crate) fn new(base: CommandBase) -> Self {
        let speed = base.services().movement.default_speed;
        Self {
            base,
            speed: Cell::new(speed),
        }
    }

    /// Current speed in units per second.
    pub fn speed(&self) -> f32 {
        self.speed.get()
    }

    /// Change the speed used by later moves.
    pub fn set_speed(&self, speed: f32) -> Result<()> {
        if speed.is_nan() || speed <= 0.0 {
            warn!(
                "Rejected movement speed {} for '{}'",
                speed,
                self.base.entity().name()
            );
            return Err(FlowError::Validation(format!(
                "movement speed must be positive, got {}",
                speed
            )));
        }
        self.speed.set(speed);
        Ok(())
    }

    /// Move to `target` and resolve on arrival.
    ///
    /// A non-negative `speed` applies to this move only; otherwise the
    /// current speed is used.
    pub async fn move_to(&self, target: Vec2, speed: Option<f32>) -> Result<()> {
        self.base.ensure_live()?;
        let speed = self.effective_speed(speed)?;
        travel(
            Rc::clone(self.base.entity()),
            Rc::clone(self.base.scope()),
            target,
            speed,
            self.base.services().movement.distance_threshold,
        )
        .await
    }

    /// Start moving to `target` without waiting for arrival.
    ///
    /// The move becomes a background task of the session. The playback
    /// keeps driving it after the script returns, and it stops early when
    /// the session is cancelled or destroyed.
    pub fn move_to_detached(&self, target: Vec2, speed: Option<f32>) -> Result<()> {
        self.base.ensure_live()?;
        let speed = self.effective_speed(speed)?;
        let entity = Rc::clone(self.base.entity());
        let scope = Rc::clone(self.base.scope());
        let threshold = self.base.services().movement.distance_threshold;

        self.base.scope().spawn(async move {
            let name = entity.name().to_string();
            if let Err(e) = travel(entity, scope, target, speed, threshold).await {
                debug!("Detached move of '{}' stopped: {}", name, e);
            }
        });
        Ok(())
    }

    fn effective_speed(&self, speed: Option<f32>) -> Result<f32> {
        let speed = match speed {
            Some(s) if s >= 0.0 => s,
            _ => self.speed.get(),
        };
        if speed <= 0.0 {
            warn!(
                "Cannot move '{}' with speed {}",
                self.base.entity().name(),
                speed
            );
            return Err(FlowError::Validation(format!(
                "movement speed must be positive, got {}",
                speed
            )));
        }
        Ok(speed)
    }
}

impl ScriptCommand for MovementCommand {
    const KIND: CapabilityKind = CapabilityKind::Movement;

    fn base(&self) -> &CommandBase {
        &self.base
    }
}

async fn travel(
    entity: EntityRef,
    scope: Rc<SessionScope>,
    target: Vec2,
    speed: f32,
    distance_threshold: f32,
) -> Result<()> {
    let start = entity.position();
    let threshold = distance_threshold.min(start.distance(target) * 0.01);
    let step = speed * scope.tick_interval().as_secs_f32();

    while entity.position().distance(target) > threshold {
        entity.set_position(move_towards(entity.position(), target, step));
        scope.tick().await?;
    }

    entity.set_position(target);
    Ok(())
}

fn move_towards(current: Vec2, target: Vec2, max_delta: f32) -> Vec2 {
    let delta = target - current;
    let distance = delta.length();
    if distance <= max_delta || distance == 0.0 {
        target
    } else {
        current + delta / distance * max_delta
    }
}

impl UserData for CommandRef<MovementCommand> {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("speed", |_, this, speed: f32| {
            this.0.set_speed(speed).map_err(FlowError::into_lua)
        });
        methods.add_method("getSpeed", |_, this, ()| Ok(this.0.speed()));
        methods.add_async_method("to", |_, this, (x, y, speed): (f32, f32, Option<f32>)| {
            let command = Rc::clone(&this.0);
            async move {
                command
                    .move_to(Vec2::new(x, y), speed)
                    .await
                    .map_err(FlowError::into_lua)
            }
        });
        methods.add_method("toSync", |_, this, (x, y, speed): (f32, f32, Option<f32>)| {
            this.0
                .move_to_detached(Vec2::new(x, y), speed)
                .map_err(FlowError::into_lua)
        });
        add_command_meta(methods);
    }
}
