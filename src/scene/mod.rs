//! Ready-made host side: an entity registry, plain scene objects, a timed
//! animator and a follow camera.

mod animator;
mod camera;
mod object;
mod registry;

pub use animator::TimedAnimator;
pub use camera::FollowCamera;
pub use object::SceneObject;
pub use registry::EntityRegistry;
