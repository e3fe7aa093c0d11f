//! The rule engine of keymorph: event definitions, conditions, the `basic`
//! and `mouse_basic` manipulators, and the manager that owns them.
//!
//! Design notes:
//! - Manipulators are a tagged variant ([`Manipulator`]) with an explicit
//!   operation table; the manager owns them exclusively and invalidation is
//!   a pure drop preceded by a wind-down pass.
//! - Nothing here reads a clock. Entries carry timestamps, timer deadlines
//!   live in the manager's [`timer::TimerRegistry`], and the dispatcher
//!   decides when "now" is. Tests drive time explicitly.
//! - Timer tokens reference activations by `(epoch, manipulator index,
//!   activation id)` rather than pointers, so a stale fire is a no-op.

mod condition;
mod environment;
mod event_definition;
mod from_event_definition;
mod manager;
mod manipulators;
mod modifier_definition;
mod parameters;
mod timer;
mod to_event_definition;

pub use condition::{Condition, DeviceMatcher, ExpectedVariableValue, InputSourcePattern};
pub use environment::{DispatchContext, ManipulatorEnvironment};
pub use event_definition::{AnyFamily, EventDefinition};
pub use from_event_definition::{
    FromEventDefinition, FromModifiers, KeyOrder, KeyUpWhen, SimultaneousOptions,
};
pub use manager::ManipulatorManager;
pub use manipulators::{ApplyContext, BasicManipulator, Manipulator, MouseBasicManipulator};
pub use modifier_definition::{Modifier, parse_modifier_list};
pub use parameters::Parameters;
pub use timer::{TimerKind, TimerRegistry, TimerToken};
pub use to_event_definition::ToEventDefinition;
