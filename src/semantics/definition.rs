//! Semantic definitions: the instructions attached to candidates.
//!
//! A definition says *what to do* to the working temporal value of a
//! candidate: `SET DAY_OF_MONTH 12`, `ADD WEEK_OF_YEAR -1`,
//! `SEEK DAY_OF_WEEK 1 (forward)`, `ANCHOR_TIMEX`, `SET_ATTRIBUTE type DURATION`.
//! Definitions are immutable once built; specialising one (for example to
//! substitute a numeral) goes through [`SemanticDefinition::merged_with`],
//! which clones instead of mutating either side.
//!
//! The free functions at the bottom (`set`, `add`, `seek`, ...) are the
//! building blocks rule modules use:
//!
//! ```text
//! set(Granularity::Month).literal("5")
//! seek(Granularity::DayOfWeek).capture(1)
//! anchor(AnchorScope::Sentence)
//! attribute(Attribute::Type).literal("DURATION")
//! ```

use crate::granularity::{Granularity, GranularitySet};
use crate::token::NumeralForm;

/// Priority given to definitions that do not state one.
pub const DEFAULT_PRIORITY: i32 = 1;
/// Highest priority; applied before everything else.
pub const TOP_PRIORITY: i32 = -1;

/// TIMEX attributes that instructions can set directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Type,
    Value,
    Mod,
    Quant,
    Freq,
    FunctionInDocument,
    TemporalFunction,
}

/// How far an anchoring instruction may look for its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnchorScope {
    /// Only expressions earlier in the same sentence.
    Sentence,
    /// Any earlier expression in the document.
    Document,
}

/// The closed set of instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Set,
    Add,
    Subtract,
    /// Move step by step to the next/previous occurrence of a field value,
    /// excluding the current position.
    Seek,
    /// Like [`Operation::Seek`] but the current position counts as a match.
    SeekIn,
    CreateBeginPoint,
    CreateEndPoint,
    SetAttribute(Attribute),
    AnchorTimex(AnchorScope),
}

impl Operation {
    pub fn is_anchoring(&self) -> bool {
        matches!(self, Operation::AnchorTimex(_))
    }

    /// Operations that change a calendar field.
    pub fn is_calendar(&self) -> bool {
        matches!(self, Operation::Set | Operation::Add | Operation::Subtract | Operation::Seek | Operation::SeekIn)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Set => "SET",
            Operation::Add => "ADD",
            Operation::Subtract => "SUBTRACT",
            Operation::Seek => "SEEK",
            Operation::SeekIn => "SEEK_IN",
            Operation::CreateBeginPoint => "CREATE_BEGIN_POINT",
            Operation::CreateEndPoint => "CREATE_END_POINT",
            Operation::SetAttribute(_) => "SET_ATTRIBUTE",
            Operation::AnchorTimex(_) => "ANCHOR_TIMEX",
        }
    }
}

/// Search direction for SEEK instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Backward,
    Current,
    Forward,
}

impl Direction {
    pub fn sign(self) -> i64 {
        match self {
            Direction::Backward => -1,
            Direction::Current => 0,
            Direction::Forward => 1,
        }
    }
}

/// Which accumulator an instruction writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Main,
    Begin,
    End,
}

/// Value carried by an instruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SemValue {
    Literal(String),
    /// Value captured by the pattern element with this index. Replaced at
    /// extraction time; a capture that never matched drops the definition.
    Capture(usize),
    /// A numeral captured from a token, remembering how it was written.
    Numeral { value: i64, form: NumeralForm, token: usize },
}

impl SemValue {
    /// Textual value as seen by the calculus.
    pub fn text(&self) -> Option<String> {
        match self {
            SemValue::Literal(s) => Some(s.clone()),
            SemValue::Numeral { value, .. } => Some(value.to_string()),
            SemValue::Capture(_) => None,
        }
    }
}

/// Context predicates checked against the candidate's siblings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    /// Some sibling touches a field of the same coarse rank.
    SiblingGranularity(Granularity),
    /// Some sibling carries this pattern tag.
    SiblingLabel(String),
    /// An anchoring instruction already succeeded for this value.
    Anchored,
    /// The anchor's finest field has this rank.
    AnchorGranularity(Granularity),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Condition {
    pub kind: ConditionKind,
    pub negated: bool,
}

impl Condition {
    pub fn when(kind: ConditionKind) -> Self {
        Condition { kind, negated: false }
    }

    pub fn unless(kind: ConditionKind) -> Self {
        Condition { kind, negated: true }
    }
}

/// One instruction. Every field except the operation is optional so that
/// partial definitions can be layered onto each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SemanticDefinition {
    pub operation: Operation,
    pub granularity: Option<Granularity>,
    pub value: Option<SemValue>,
    pub direction: Option<Direction>,
    pub condition: Option<Condition>,
    pub priority: Option<i32>,
    /// Computation model this definition belongs to; `None` means every model.
    pub model: Option<String>,
    pub target: Option<Target>,
    /// Endpoints created by this instruction have their own textual span.
    pub explicit: Option<bool>,
}

impl SemanticDefinition {
    pub fn new(operation: Operation) -> Self {
        SemanticDefinition {
            operation,
            granularity: None,
            value: None,
            direction: None,
            condition: None,
            priority: None,
            model: None,
            target: None,
            explicit: None,
        }
    }

    pub fn granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = Some(granularity);
        self
    }

    pub fn literal(mut self, value: &str) -> Self {
        self.value = Some(SemValue::Literal(value.to_string()));
        self
    }

    pub fn capture(mut self, element: usize) -> Self {
        self.value = Some(SemValue::Capture(element));
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn model(mut self, model: &str) -> Self {
        self.model = Some(model.to_string());
        self
    }

    pub fn target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }

    pub fn explicit(mut self) -> Self {
        self.explicit = Some(true);
        self
    }

    pub fn effective_priority(&self) -> i32 {
        match (self.priority, self.operation) {
            (Some(p), _) => p,
            (None, Operation::AnchorTimex(_)) => TOP_PRIORITY,
            (None, _) => DEFAULT_PRIORITY,
        }
    }

    pub fn effective_target(&self) -> Target {
        self.target.unwrap_or(Target::Main)
    }

    /// True when the definition may run under one of `models`.
    pub fn is_eligible(&self, models: &[String]) -> bool {
        match &self.model {
            None => true,
            Some(model) => models.iter().any(|m| m == model),
        }
    }

    /// Calendar field this definition changes, if any.
    pub fn touched_granularity(&self) -> Option<Granularity> {
        if self.operation.is_calendar() { self.granularity } else { None }
    }

    /// Layer `other` over `self` without touching either: fields unset in
    /// `other` keep this definition's value, set fields override it.
    pub fn merged_with(&self, other: &SemanticDefinition) -> SemanticDefinition {
        SemanticDefinition {
            operation: other.operation,
            granularity: other.granularity.or(self.granularity),
            value: other.value.clone().or_else(|| self.value.clone()),
            direction: other.direction.or(self.direction),
            condition: other.condition.clone().or_else(|| self.condition.clone()),
            priority: other.priority.or(self.priority),
            model: other.model.clone().or_else(|| self.model.clone()),
            target: other.target.or(self.target),
            explicit: other.explicit.or(self.explicit),
        }
    }

    /// Two definitions address the same slot and should be merged, not stacked.
    pub fn overlaps(&self, other: &SemanticDefinition) -> bool {
        self.operation == other.operation
            && self.granularity == other.granularity
            && self.effective_target() == other.effective_target()
    }
}

/// Granularities touched by a list of definitions.
pub fn touched_granularities<'a>(definitions: impl IntoIterator<Item = &'a SemanticDefinition>) -> GranularitySet {
    let mut set = GranularitySet::empty();
    for definition in definitions {
        if let Some(g) = definition.touched_granularity() {
            set.insert_granularity(g);
        }
    }
    set
}

pub fn set(granularity: Granularity) -> SemanticDefinition {
    SemanticDefinition::new(Operation::Set).granularity(granularity)
}

pub fn add(granularity: Granularity) -> SemanticDefinition {
    SemanticDefinition::new(Operation::Add).granularity(granularity)
}

pub fn subtract(granularity: Granularity) -> SemanticDefinition {
    SemanticDefinition::new(Operation::Subtract).granularity(granularity)
}

pub fn seek(granularity: Granularity) -> SemanticDefinition {
    SemanticDefinition::new(Operation::Seek).granularity(granularity)
}

pub fn seek_in(granularity: Granularity) -> SemanticDefinition {
    SemanticDefinition::new(Operation::SeekIn).granularity(granularity)
}

pub fn begin_point(granularity: Granularity) -> SemanticDefinition {
    SemanticDefinition::new(Operation::CreateBeginPoint).granularity(granularity)
}

pub fn end_point(granularity: Granularity) -> SemanticDefinition {
    SemanticDefinition::new(Operation::CreateEndPoint).granularity(granularity)
}

pub fn attribute(attribute: Attribute) -> SemanticDefinition {
    SemanticDefinition::new(Operation::SetAttribute(attribute))
}

pub fn anchor(scope: AnchorScope) -> SemanticDefinition {
    SemanticDefinition::new(Operation::AnchorTimex(scope))
}
