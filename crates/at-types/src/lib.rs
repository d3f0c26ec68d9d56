pub mod errors;
pub mod run;

pub use errors::*;
pub use run::*;
