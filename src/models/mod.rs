pub mod artifact;
pub mod enums;
pub mod trace;
pub mod workflow_run;

pub use artifact::*;
pub use enums::*;
pub use trace::*;
pub use workflow_run::*;
