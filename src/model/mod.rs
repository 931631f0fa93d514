pub mod destination;
pub mod edge;
pub mod suggestion;
pub mod visit;

pub use destination::*;
pub use edge::*;
pub use suggestion::*;
pub use visit::*;
