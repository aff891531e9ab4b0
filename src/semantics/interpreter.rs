//! Applies semantic definitions to a working temporal value.
//!
//! An [`Evaluation`] starts from a seed point (the reference time or an
//! anchor), absorbs definitions in priority order and finally turns into a
//! [`TemporalObject`]. Phrase resolution threads one evaluation through the
//! definitions of several children; a leaf runs a single batch.

use crate::granularity::{Granularity, GranularitySet};
use crate::semantics::calculus;
use crate::semantics::definition::{
    AnchorScope, Attribute, Condition, ConditionKind, Direction, Operation, SemanticDefinition, Target,
};
use crate::semantics::timex::{
    AnchorRef, DurationValue, IdAllocator, TemporalObject, TemporalValue, TimePoint, TimexType,
};
use tracing::trace;

/// Outcome of looking up an anchor for an anchoring instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum AnchorLookup {
    Found { point: TimePoint, id: AnchorRef },
    /// An expression exists in scope but has no value.
    Unresolved,
    NotFound,
}

/// Finds the anchor for the candidate being evaluated.
pub trait AnchorResolver {
    fn lookup(&mut self, scope: AnchorScope) -> AnchorLookup;
}

/// A resolver that never finds anything; evaluations stay on their seed.
pub struct NoAnchors;

impl AnchorResolver for NoAnchors {
    fn lookup(&mut self, _scope: AnchorScope) -> AnchorLookup {
        AnchorLookup::NotFound
    }
}

/// What conditions are evaluated against.
#[derive(Debug, Clone, Default)]
pub struct Surroundings {
    /// Fields touched by the sibling candidates.
    pub sibling_granularities: GranularitySet,
    pub sibling_tags: Vec<String>,
    /// Direction for SEEK instructions that do not name one.
    pub direction: Option<Direction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Point,
    Duration,
    Recurrence,
}

#[derive(Debug, Clone)]
struct Endpoint {
    point: TimePoint,
    explicit: bool,
}

/// Working state of one evaluation.
#[derive(Debug, Clone)]
pub struct Evaluation {
    point: TimePoint,
    duration: DurationValue,
    kind: Kind,
    explicit_type: Option<TimexType>,
    begin: Option<Endpoint>,
    end: Option<Endpoint>,
    value_override: Option<String>,
    modifier: Option<String>,
    quant: Option<String>,
    freq: Option<String>,
    function_in_document: Option<String>,
    temporal_function: Option<bool>,
    anchored: bool,
    anchor: Option<AnchorRef>,
    anchor_granularity: Option<Granularity>,
}

impl Evaluation {
    pub fn seeded(seed: TimePoint) -> Self {
        Evaluation {
            point: seed,
            duration: DurationValue::default(),
            kind: Kind::Point,
            explicit_type: None,
            begin: None,
            end: None,
            value_override: None,
            modifier: None,
            quant: None,
            freq: None,
            function_in_document: None,
            temporal_function: None,
            anchored: false,
            anchor: None,
            anchor_granularity: None,
        }
    }

    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    /// Run the anchoring instructions among `definitions`. Succeeds at most
    /// once per evaluation; the first successful anchor reseeds the value.
    /// An instruction whose condition fails is skipped.
    pub fn anchor<'a>(
        &mut self,
        definitions: impl IntoIterator<Item = &'a SemanticDefinition>,
        models: &[String],
        around: &Surroundings,
        resolver: &mut dyn AnchorResolver,
    ) {
        for definition in definitions {
            let Operation::AnchorTimex(scope) = definition.operation else {
                continue;
            };
            if !definition.is_eligible(models) || self.anchored {
                continue;
            }
            if let Some(condition) = &definition.condition {
                if !self.holds(condition, around) {
                    trace!("[resolve] skip anchoring ({:?} failed)", condition.kind);
                    continue;
                }
            }
            match resolver.lookup(scope) {
                AnchorLookup::Found { point, id } => {
                    trace!("[resolve] anchored to {:?}", id);
                    self.anchor_granularity = point.precision();
                    self.point = TimePoint::new(point.datetime, point.unknown);
                    self.point.relative = true;
                    self.anchored = true;
                    self.anchor = Some(id);
                }
                AnchorLookup::Unresolved => {
                    trace!("[resolve] anchor in scope is unresolved");
                    self.anchor = Some(AnchorRef::Unresolved);
                    self.temporal_function = Some(true);
                }
                AnchorLookup::NotFound => {}
            }
        }
    }

    fn holds(&self, condition: &Condition, around: &Surroundings) -> bool {
        let raw = match &condition.kind {
            ConditionKind::SiblingGranularity(g) => around.sibling_granularities.has_rank_of(*g),
            ConditionKind::SiblingLabel(tag) => around.sibling_tags.iter().any(|t| t == tag),
            ConditionKind::Anchored => self.anchored,
            ConditionKind::AnchorGranularity(g) => self.anchor_granularity.is_some_and(|a| a.rank() == g.rank()),
        };
        raw != condition.negated
    }

    /// Apply the non-anchoring instructions in priority order. Returns `None`
    /// when a calendar operation produces an impossible value.
    pub fn apply(
        mut self,
        definitions: &[SemanticDefinition],
        models: &[String],
        around: &Surroundings,
    ) -> Option<Self> {
        let mut ordered: Vec<&SemanticDefinition> =
            definitions.iter().filter(|d| !d.operation.is_anchoring() && d.is_eligible(models)).collect();
        ordered.sort_by_key(|d| d.effective_priority());

        for definition in ordered {
            if let Some(condition) = &definition.condition {
                if !self.holds(condition, around) {
                    trace!("[resolve] skip {} ({:?} failed)", definition.operation.name(), condition.kind);
                    continue;
                }
            }
            self.step(definition, around)?;
        }
        Some(self)
    }

    fn step(&mut self, definition: &SemanticDefinition, around: &Surroundings) -> Option<()> {
        let text = definition.value.as_ref().and_then(|v| v.text());
        match definition.operation {
            Operation::Set | Operation::Add | Operation::Subtract | Operation::Seek | Operation::SeekIn => {
                let granularity = definition.granularity?;
                let direction = definition.direction.or(around.direction).unwrap_or(Direction::Forward);
                match definition.effective_target() {
                    Target::Main => match self.kind {
                        Kind::Point => calendar(&mut self.point, definition.operation, granularity, text, direction)?,
                        Kind::Duration | Kind::Recurrence => {
                            let text = text?;
                            match definition.operation {
                                Operation::Set => self.duration.set_unit(granularity, &text)?,
                                Operation::Add => self.duration.add_unit(granularity, &text, 1.0)?,
                                Operation::Subtract => self.duration.add_unit(granularity, &text, -1.0)?,
                                // Seeking has no meaning on an amount of time.
                                _ => {}
                            }
                        }
                    },
                    Target::Begin => {
                        let seed = self.point.clone();
                        let begin = self.begin.get_or_insert(Endpoint { point: seed, explicit: false });
                        calendar(&mut begin.point, definition.operation, granularity, text, direction)?;
                    }
                    Target::End => {
                        let seed = self.point.clone();
                        let end = self.end.get_or_insert(Endpoint { point: seed, explicit: false });
                        calendar(&mut end.point, definition.operation, granularity, text, direction)?;
                    }
                }
            }
            Operation::CreateBeginPoint | Operation::CreateEndPoint => {
                let mut point = self.point.clone();
                if let (Some(granularity), Some(text)) = (definition.granularity, text.as_deref()) {
                    // "viimased 3 päeva": the begin point lies 3 days before the seed.
                    let amount = calculus::parse_field_value(text)?;
                    let sign = match definition.operation {
                        Operation::CreateBeginPoint => -1,
                        _ => 1,
                    };
                    let sign = definition.direction.map(|d| d.sign()).filter(|s| *s != 0).unwrap_or(sign);
                    point.shift(granularity, amount * sign)?;
                } else if let Some(granularity) = definition.granularity {
                    point.touched.insert_granularity(granularity);
                }
                point.relative = true;
                let endpoint = Endpoint { point, explicit: definition.explicit.unwrap_or(false) };
                if definition.operation == Operation::CreateBeginPoint {
                    self.begin = Some(endpoint);
                } else {
                    self.end = Some(endpoint);
                }
            }
            Operation::SetAttribute(attribute) => self.set_attribute(attribute, text?),
            Operation::AnchorTimex(_) => {}
        }
        Some(())
    }

    fn set_attribute(&mut self, attribute: Attribute, text: String) {
        match attribute {
            Attribute::Type => {
                let Ok(timex_type) = text.parse::<TimexType>() else {
                    return;
                };
                self.kind = match timex_type {
                    TimexType::Date | TimexType::Time => Kind::Point,
                    TimexType::Duration => Kind::Duration,
                    TimexType::Set => Kind::Recurrence,
                };
                self.explicit_type = Some(timex_type);
            }
            Attribute::Value => self.value_override = Some(text),
            Attribute::Mod => self.modifier = Some(text),
            Attribute::Quant => self.quant = Some(text),
            Attribute::Freq => self.freq = Some(text),
            Attribute::FunctionInDocument => self.function_in_document = Some(text),
            Attribute::TemporalFunction => self.temporal_function = Some(text.eq_ignore_ascii_case("true")),
        }
    }

    /// Type this evaluation will end up with, if it was set explicitly.
    pub fn explicit_type(&self) -> Option<TimexType> {
        self.explicit_type
    }

    pub fn finish(self, ids: &mut IdAllocator) -> TemporalObject {
        let id = ids.fresh();
        let value = match self.kind {
            Kind::Point => TemporalValue::Point(self.point.clone()),
            Kind::Duration => TemporalValue::Duration(self.duration.clone()),
            Kind::Recurrence => TemporalValue::Recurrence(self.duration.clone()),
        };
        let mut object = TemporalObject::new(id, value);
        object.timex_type = self.explicit_type;
        object.value_override = self.value_override;
        object.modifier = self.modifier;
        object.quant = self.quant;
        object.freq = self.freq;
        object.function_in_document = self.function_in_document;

        let begin = self.begin.map(|e| (endpoint_object(e.point, ids), e.explicit));
        let end = self.end.map(|e| (endpoint_object(e.point, ids), e.explicit));
        let has_endpoints = begin.is_some() || end.is_some();
        match (begin, end) {
            (Some((b, true)), Some((e, true))) => {
                object.begin_point = Some(b.id);
                object.end_point = Some(e.id);
                object.explicit = vec![b, e];
            }
            (begin, end) => {
                if let Some((b, _)) = begin {
                    object.begin_point = Some(b.id);
                    object.implicit.push(b);
                }
                if let Some((e, _)) = end {
                    object.end_point = Some(e.id);
                    object.implicit.push(e);
                }
            }
        }

        let depends_on_seed = match &object.value {
            TemporalValue::Point(p) => p.depends_on_seed(),
            TemporalValue::Duration(_) | TemporalValue::Recurrence(_) => has_endpoints,
        };
        object.temporal_function = self.temporal_function.unwrap_or(depends_on_seed || self.anchored);
        object.anchor = match self.anchor {
            Some(anchor) => Some(anchor),
            None if object.temporal_function => Some(AnchorRef::ReferenceTime),
            None => None,
        };
        object
    }
}

fn endpoint_object(point: TimePoint, ids: &mut IdAllocator) -> TemporalObject {
    let mut related = TemporalObject::new(ids.fresh(), TemporalValue::Point(point));
    related.temporal_function = true;
    related.anchor = Some(AnchorRef::ReferenceTime);
    related
}

fn calendar(
    point: &mut TimePoint,
    operation: Operation,
    granularity: Granularity,
    text: Option<String>,
    direction: Direction,
) -> Option<()> {
    match operation {
        Operation::Set => point.set(granularity, text.as_deref()?),
        Operation::Add | Operation::Subtract => {
            let text = text?;
            if calculus::is_unknown_marker(&text) {
                return point.set(granularity, &text);
            }
            let amount = calculus::parse_field_value(&text)?;
            let amount = if operation == Operation::Subtract { -amount } else { amount };
            point.shift(granularity, amount)
        }
        Operation::Seek => point.seek(granularity, text.as_deref()?, direction, false),
        Operation::SeekIn => point.seek(granularity, text.as_deref()?, direction, true),
        _ => Some(()),
    }
}

/// Evaluate one candidate's definitions from `seed`.
pub fn interpret(
    definitions: &[SemanticDefinition],
    seed: TimePoint,
    models: &[String],
    around: &Surroundings,
    resolver: &mut dyn AnchorResolver,
    ids: &mut IdAllocator,
) -> Option<TemporalObject> {
    let mut evaluation = Evaluation::seeded(seed);
    evaluation.anchor(definitions, models, around, resolver);
    Some(evaluation.apply(definitions, models, around)?.finish(ids))
}
