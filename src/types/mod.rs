pub mod bar;
pub mod indicators;
pub mod prediction;
pub mod signals;
pub mod task;

pub use bar::*;
pub use indicators::*;
pub use prediction::*;
pub use signals::*;
pub use task::*;
