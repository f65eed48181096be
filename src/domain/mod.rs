// Domain layer: entities, simulation rules and the world that owns them.

pub mod construct;
pub mod emission;
pub mod errors;
pub mod kinematics;
pub mod player;
pub mod praesidium;
pub mod projectile;
pub mod registry;
pub mod state;
pub mod tuning;
pub mod world;

pub use construct::{Construct, ConstructKind};
pub use errors::EntityFault;
pub use state::{BuildRequest, ClientId, EntityId, KeyboardState, PlayerInput, Snapshot};
pub use tuning::Tuning;
pub use world::World;
