pub mod avatar;
pub mod geo;
pub mod poi;
pub mod presence;
pub mod roster;

pub use avatar::{avatar_index, initials};
pub use geo::*;
pub use poi::*;
pub use presence::*;
pub use roster::*;
