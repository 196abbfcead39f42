mod assembler;
pub mod builder;
pub mod fee;
pub mod params;
pub mod results;
pub mod validation;

pub use builder::TransitionBuilder;
pub use params::{BuildContext, FeeParams, MembershipApplication, ProjectProposal};
pub use results::{BuiltTransition, SelectionResult, StateOutput};
