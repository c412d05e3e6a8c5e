//! Game objects that feed the BSP broad phase

pub mod body;
pub mod deferred;
pub mod object_bsp;
pub mod objects;

pub use body::{Character, CharacterId, ObjectRef, Particle, ParticleId, SweptBody};
pub use deferred::{DeferredQueue, DrainReport, ObjectCommand};
pub use object_bsp::{CollisionPair, FillStats, ObjectBsp};
pub use objects::{ObjectSet, ObjectView};
