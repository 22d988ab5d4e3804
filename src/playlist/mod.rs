pub mod artwork;
pub mod config;
pub mod metadata;
pub mod orchestrator;
pub mod session;
pub mod tags;
pub mod utils;
pub mod waypoints;


pub use config::*;
pub use metadata::*;
pub use session::{PlaylistServices, PlaylistSession};
pub use tags::TagResolver;
