pub mod entities;
pub mod errors;
pub mod update;

pub use entities::*;
pub use errors::*;
pub use update::*;
