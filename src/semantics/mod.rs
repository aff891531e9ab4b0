//! Semantic layer: instructions, the calculus they drive and the values they
//! produce.

pub mod calculus;
pub mod definition;
pub mod interpreter;
pub mod timex;

pub use definition::{
    AnchorScope, Attribute, Condition, ConditionKind, Direction, Operation, SemValue, SemanticDefinition, Target,
};
pub use interpreter::{AnchorLookup, AnchorResolver, Evaluation, NoAnchors, Surroundings, interpret};
pub use timex::{
    AnchorRef, Amount, DurationValue, IdAllocator, PartOfDay, TemporalObject, TemporalValue, TimePoint, TimexId,
    TimexType,
};
