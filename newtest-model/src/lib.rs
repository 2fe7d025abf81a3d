//! Typed scenario/step/action model shared by the parser, validator,
//! dispatcher, and reporters (spec.md §3).

pub mod action;
pub mod defaults;
pub mod expect;
pub mod scenario;
pub mod selector;
pub mod step;
pub mod suite;

pub use action::{ActionName, ActionSpec, DeviceScope, ExecutionKind, find_spec, is_known_action};
pub use expect::{ExpectBlock, RouteSource};
pub use scenario::Scenario;
pub use selector::DeviceSelector;
pub use step::Step;
pub use suite::Suite;
