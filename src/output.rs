//! Resolved candidates as TIMEX annotations.
//!
//! Walks the candidate forest in document order, renumbers every visible
//! temporal object `t1..tN` by first appearance and rewrites references:
//! the reference time becomes `t0`, anything that no longer resolves
//! becomes `??`.

use std::collections::HashMap;
use std::fmt;

use serde_json::{Map, Value};
use tracing::{trace, warn};

use crate::candidate::{CandidateId, Span};
use crate::document::Document;
use crate::semantics::{AnchorRef, TemporalObject, TimexId};

/// Written in place of a reference that points nowhere.
pub const DANGLING: &str = "??";

/// TIMEX attributes of one object. Field order is serialization order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timex {
    pub tid: String,
    pub timex_type: Option<String>,
    pub function_in_document: Option<String>,
    pub temporal_function: bool,
    pub value: Option<String>,
    pub modifier: Option<String>,
    pub anchor_time_id: Option<String>,
    pub begin_point: Option<String>,
    pub end_point: Option<String>,
    pub quant: Option<String>,
    pub freq: Option<String>,
}

impl Timex {
    /// Present attributes as `(name, value)` pairs in TIMEX order.
    pub fn attributes(&self) -> Vec<(&'static str, String)> {
        let temporal_function = self.temporal_function.then(|| "true".to_string());
        let optional = [
            ("type", &self.timex_type),
            ("functionInDocument", &self.function_in_document),
            ("temporalFunction", &temporal_function),
            ("value", &self.value),
            ("mod", &self.modifier),
            ("anchorTimeID", &self.anchor_time_id),
            ("beginPoint", &self.begin_point),
            ("endPoint", &self.end_point),
            ("quant", &self.quant),
            ("freq", &self.freq),
        ];
        let mut out = vec![("tid", self.tid.clone())];
        out.extend(optional.into_iter().filter_map(|(name, value)| value.clone().map(|v| (name, v))));
        out
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (name, value) in self.attributes() {
            map.insert(name.to_string(), Value::String(value));
        }
        Value::Object(map)
    }
}

impl fmt::Display for Timex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<TIMEX3")?;
        for (name, value) in self.attributes() {
            write!(f, " {name}=\"{value}\"")?;
        }
        write!(f, "/>")
    }
}

/// One emitted TIMEX with the tokens it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// `None` for implicit objects such as synthesized interval endpoints.
    pub span: Option<Span>,
    /// Candidate that carried the object (also set for its related objects).
    pub candidate: Option<CandidateId>,
    pub timex: Timex,
}

impl Annotation {
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        if let Some(span) = self.span {
            map.insert("start".into(), Value::from(span.start));
            map.insert("end".into(), Value::from(span.end));
        }
        map.insert("timex".into(), self.timex.to_json());
        Value::Object(map)
    }
}

/// Collect visible objects in document order.
fn collect<'d>(
    document: &'d Document,
    id: CandidateId,
    out: &mut Vec<(Option<Span>, CandidateId, &'d TemporalObject)>,
) {
    let candidate = document.candidate(id);
    match &candidate.value {
        Some(object) => {
            out.push((Some(candidate.span), id, object));
            related(object, id, out);
        }
        None => {
            for child in &candidate.children {
                collect(document, *child, out);
            }
        }
    }
}

fn related<'d>(
    object: &'d TemporalObject,
    id: CandidateId,
    out: &mut Vec<(Option<Span>, CandidateId, &'d TemporalObject)>,
) {
    for nested in object.explicit.iter().chain(&object.implicit) {
        out.push((None, id, nested));
        related(nested, id, out);
    }
}

/// Renumber and format every resolved candidate of `document`.
pub fn annotate(document: &Document) -> Vec<Annotation> {
    let mut objects = Vec::new();
    for id in document.top_level() {
        collect(document, id, &mut objects);
    }

    let mut renumbered: HashMap<TimexId, String> = HashMap::new();
    for (n, (_, _, object)) in objects.iter().enumerate() {
        renumbered.entry(object.id).or_insert_with(|| format!("t{}", n + 1));
    }
    let reference = |id: TimexId| -> String {
        if id == TimexId::REFERENCE {
            return TimexId::REFERENCE.to_string();
        }
        match renumbered.get(&id) {
            Some(tid) => tid.clone(),
            None => {
                warn!("[output] reference to pruned {} rendered as {}", id, DANGLING);
                DANGLING.to_string()
            }
        }
    };

    objects
        .iter()
        .map(|(span, candidate, object)| {
            let value = object.value_string();
            let timex = Timex {
                tid: renumbered.get(&object.id).cloned().unwrap_or_else(|| DANGLING.to_string()),
                timex_type: Some(object.kind_type().as_str().to_string()),
                function_in_document: object.function_in_document.clone(),
                temporal_function: object.temporal_function,
                value: (!value.is_empty()).then_some(value),
                modifier: object.modifier.clone(),
                anchor_time_id: object.anchor.as_ref().map(|anchor| match anchor {
                    AnchorRef::ReferenceTime => TimexId::REFERENCE.to_string(),
                    AnchorRef::Timex(id) => reference(*id),
                    AnchorRef::Unresolved => DANGLING.to_string(),
                }),
                begin_point: object.begin_point.map(reference),
                end_point: object.end_point.map(reference),
                quant: object.quant.clone(),
                freq: object.freq.clone(),
            };
            trace!("[output] {} {}", candidate, timex);
            Annotation { span: *span, candidate: Some(*candidate), timex }
        })
        .collect()
}

/// Strict-mode cleanup. Annotations that cannot be repaired are dropped.
pub fn purify(annotations: Vec<Annotation>) -> Vec<Annotation> {
    annotations.into_iter().filter_map(purify_one).collect()
}

fn purify_one(mut annotation: Annotation) -> Option<Annotation> {
    let timex = &mut annotation.timex;
    if timex.timex_type.is_none() {
        return None;
    }
    let value = timex.value.as_deref()?;
    if regex!(r"^X+(-X+)*(TX+(:X+)?)?$").is_match(value) {
        trace!("[output] dropping unknown value {}", value);
        return None;
    }

    let halved = match timex.modifier.as_deref() {
        Some("FIRST_HALF") => Some("START"),
        Some("SECOND_HALF") => Some("END"),
        _ => None,
    };
    if let Some(modifier) = halved {
        timex.modifier = Some(modifier.to_string());
    }
    let id = regex!(r"^t\d+$");
    for reference in [&mut timex.anchor_time_id, &mut timex.begin_point, &mut timex.end_point] {
        if reference.as_deref().is_some_and(|r| !id.is_match(r)) {
            *reference = None;
        }
    }
    if timex.freq.as_deref().is_some_and(|f| !regex!(r"^\d+X$").is_match(f)) {
        timex.freq = None;
    }
    Some(annotation)
}
