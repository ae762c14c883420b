pub mod item;
pub mod learner;
pub mod memory_state;
pub mod placement;
pub mod review;

pub use item::{Item, ItemPayload, ItemType};
pub use learner::{CefrLevel, Learner};
pub use memory_state::{CardState, MemoryState};
pub use placement::{PlacementResponseLog, PlacementSession};
pub use review::{Rating, ReviewLogEntry};
