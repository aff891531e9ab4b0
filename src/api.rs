use crate::align;
use crate::analyzer::Analyzer;
use crate::candidate::{CandidateId, Span, Stage};
use crate::document::{Document, InputToken};
use crate::engine::{Pipeline, RunMetrics};
use crate::error::Result;
use crate::output::{self, Annotation, Timex};
use crate::reference::ReferenceTime;
use crate::rules::RuleSet;
use crate::rules::estonian::DEFAULT_MODEL;
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::OnceCell;
use std::time::{Duration, Instant};

static DEFAULT_RULES: OnceCell<RuleSet> = OnceCell::new();

/// The built-in Estonian rules, compiled on first use.
pub fn default_rules() -> Result<&'static RuleSet> {
    DEFAULT_RULES.get_or_try_init(RuleSet::estonian)
}

/// Tagging context.
///
/// Holds what resolution needs besides the text: the document creation time
/// relative expressions are computed from, and the computation models whose
/// semantic definitions may run.
#[derive(Debug, Clone)]
pub struct Context {
    /// Reference (document creation) time, rendered as `t0`.
    pub reference: ReferenceTime,
    /// Accepted computation-model tags. Must not be empty.
    pub models: Vec<String>,
}

impl Default for Context {
    fn default() -> Self {
        let reference = if cfg!(test) {
            NaiveDate::from_ymd_opt(2013, 2, 12)
                .map(|date| NaiveDateTime::new(date, NaiveTime::MIN))
                .unwrap_or_default()
        } else {
            Local::now().naive_local()
        };
        Self { reference: ReferenceTime::from_datetime(reference), models: vec![DEFAULT_MODEL.to_string()] }
    }
}

impl Context {
    pub fn with_reference(reference: ReferenceTime) -> Self {
        Self { reference, ..Self::default() }
    }
}

/// Options that affect output.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Drop annotations without type or value, normalize `mod`, strip
    /// malformed references and frequencies.
    pub strict: bool,
    /// Input positions kept by an outside segmentation, in its order. When
    /// set, every entity also carries its span in that numbering and a token
    /// missing from it fails the run.
    pub external: Option<Vec<usize>>,
}

/// A TIMEX found in the input.
///
/// `start`/`end` are byte offsets into [`TagResult::text`].
#[derive(Debug, Clone)]
pub struct Entity {
    /// Slice of the text that matched; empty for implicit objects.
    pub body: String,
    /// Start byte index of the match.
    pub start: usize,
    /// End byte index of the match (exclusive).
    pub end: usize,
    /// Inner token span; `None` for implicit objects.
    pub tokens: Option<Span>,
    /// Token span in the external numbering of [`Options::external`].
    pub external: Option<Span>,
    /// Tag of the candidate that carried the TIMEX.
    pub tag: String,
    pub timex: Timex,
}

impl Entity {
    pub fn value(&self) -> &str {
        self.timex.value.as_deref().unwrap_or_default()
    }
}

/// Result from [`tag`] and [`tag_with`].
#[derive(Debug, Clone)]
pub struct TagResult {
    /// The text the entities point into.
    pub text: String,
    pub results: Vec<Entity>,
    /// Total elapsed time spent in the pipeline.
    pub elapsed: Duration,
}

/// A compact candidate summary used in verbose traces.
#[derive(Debug, Clone)]
pub struct CandidateSummary {
    pub id: CandidateId,
    pub span: Span,
    pub stage: Stage,
    pub tag: String,
    /// Nesting depth below the top-level candidate.
    pub depth: usize,
    pub rule: Option<String>,
    pub preview: String,
    pub value: Option<String>,
}

/// Result from [`tag_verbose_with`].
#[derive(Debug, Clone)]
pub struct TagResultVerbose {
    pub text: String,
    pub results: Vec<Entity>,
    pub elapsed: Duration,
    pub metrics: RunMetrics,
    /// Surviving candidate trees, parents before children.
    pub candidates: Vec<CandidateSummary>,
}

/// Tag analyzed tokens with the built-in rules and a default [`Context`].
///
/// # Example
/// ```
/// use ajamuster::{InputToken, tag};
///
/// let tokens: Vec<InputToken> = serde_json::from_str(
///     r#"[{"surface": "homme", "analyses": [{"lemma": "homme", "pos": "D"}]}]"#,
/// ).unwrap();
/// let out = tag(tokens).unwrap();
/// assert_eq!(out.results.len(), 1);
/// assert_eq!(out.results[0].body, "homme");
/// ```
pub fn tag(tokens: Vec<InputToken>) -> Result<TagResult> {
    tag_with(tokens, &Context::default(), &Options::default())
}

/// Tag analyzed tokens with the built-in rules and the provided `context`/`options`.
///
/// The text is rebuilt by joining the surfaces with single spaces.
pub fn tag_with(tokens: Vec<InputToken>, context: &Context, options: &Options) -> Result<TagResult> {
    let text = join_surfaces(&tokens);
    let mut document = Document::from_input(tokens);
    tag_document(&mut document, &text, default_rules()?, context, options)
}

/// Run `analyzer` over `text`, then tag the result against the original text.
pub fn tag_text(text: &str, analyzer: &Analyzer, context: &Context, options: &Options) -> Result<TagResult> {
    let mut document = Document::from_input(analyzer.tokens(text)?);
    tag_document(&mut document, text, default_rules()?, context, options)
}

/// Tag an already built document with any rule set.
pub fn tag_document(
    document: &mut Document,
    text: &str,
    rules: &RuleSet,
    context: &Context,
    options: &Options,
) -> Result<TagResult> {
    let metrics = Pipeline::new(rules).run_with_metrics(document, &context.reference, &context.models)?;
    Ok(TagResult { text: text.to_string(), results: entities(document, text, options)?, elapsed: metrics.total })
}

/// Like [`tag_with`] but also returns stage metrics and the candidate trees.
///
/// This is useful for profiling and rule debugging.
pub fn tag_verbose_with(tokens: Vec<InputToken>, context: &Context, options: &Options) -> Result<TagResultVerbose> {
    let text = join_surfaces(&tokens);
    let rules = default_rules()?;
    let mut document = Document::from_input(tokens);
    let started = Instant::now();
    let metrics = Pipeline::new(rules).run_with_metrics(&mut document, &context.reference, &context.models)?;
    let results = entities(&document, &text, options)?;

    let mut candidates = Vec::new();
    for id in document.top_level() {
        summarize(&document, rules, id, 0, &mut candidates);
    }
    Ok(TagResultVerbose { text, results, elapsed: started.elapsed(), metrics, candidates })
}

fn join_surfaces(tokens: &[InputToken]) -> String {
    tokens.iter().map(|t| t.surface.as_str()).collect::<Vec<_>>().join(" ")
}

fn entities(document: &Document, text: &str, options: &Options) -> Result<Vec<Entity>> {
    let external = match &options.external {
        Some(kept) => Some(align::external_positions(document, kept)?),
        None => None,
    };
    let mut annotations = output::annotate(document);
    if options.strict {
        annotations = output::purify(annotations);
    }
    let alignments = align::align(text, document);
    Ok(annotations
        .into_iter()
        .map(|a| annotation_to_entity(document, text, &alignments, external.as_deref(), a))
        .collect())
}

fn annotation_to_entity(
    document: &Document,
    text: &str,
    alignments: &[align::Alignment],
    external: Option<&[usize]>,
    a: Annotation,
) -> Entity {
    let tag = a.candidate.map(|id| document.candidate(id).tag.clone()).unwrap_or_default();
    let (start, end) = match (a.span, a.candidate) {
        (Some(span), _) => align::byte_range(alignments, span),
        (None, Some(id)) => {
            let (start, _) = align::byte_range(alignments, document.candidate(id).span);
            (start, start)
        }
        (None, None) => (0, 0),
    };
    let external = external
        .zip(a.span)
        .and_then(|(positions, span)| Some(Span::new(*positions.get(span.start)?, *positions.get(span.end)?)));
    Entity {
        body: text.get(start..end).unwrap_or("").to_string(),
        start,
        end,
        tokens: a.span,
        external,
        tag,
        timex: a.timex,
    }
}

fn summarize(document: &Document, rules: &RuleSet, id: CandidateId, depth: usize, out: &mut Vec<CandidateSummary>) {
    let c = document.candidate(id);
    out.push(CandidateSummary {
        id,
        span: c.span,
        stage: c.stage,
        tag: c.tag.clone(),
        depth,
        rule: c.rule.map(|r| rules.rule(r).rule.name.clone()),
        preview: document.text(c.span).chars().take(80).collect(),
        value: c.value.as_ref().map(|v| v.value_string()),
    });
    for child in &c.children {
        summarize(document, rules, *child, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::token::MorphAnalysis;

    fn word(surface: &str, lemma: &str, pos: &str, form: &str) -> InputToken {
        InputToken {
            surface: surface.to_string(),
            analyses: vec![MorphAnalysis::new(lemma, "", pos, form)],
            sentence_end: false,
            clause_boundary: false,
        }
    }

    fn context() -> Context {
        Context::with_reference("2009-07-23T10:30".parse().unwrap())
    }

    fn sentence() -> Vec<InputToken> {
        let mut tokens = vec![
            word("Kohtume", "kohtuma", "V", "me"),
            word("homme", "homme", "D", ""),
            word("kell", "kell", "S", "sg n"),
            word("12", "12", "N", "?"),
            word(".", ".", "Z", ""),
        ];
        tokens[4].sentence_end = true;
        tokens
    }

    #[test]
    fn default_context_is_deterministic_in_tests() {
        let ctx = Context::default();
        assert_eq!(ctx.reference.value(), "2013-02-12T00:00");
        assert_eq!(ctx.models, [DEFAULT_MODEL]);
    }

    #[test]
    fn tag_with_returns_entities() {
        let res = tag_with(sentence(), &context(), &Options::default()).unwrap();
        assert_eq!(res.text, "Kohtume homme kell 12 .");
        assert_eq!(res.results.len(), 1);

        let entity = &res.results[0];
        assert_eq!(entity.body, "homme kell 12");
        assert_eq!((entity.start, entity.end), (8, 21));
        assert_eq!(entity.tag, "REL_DAY-TIME");
        assert_eq!(entity.value(), "2009-07-24T12:00");
        assert_eq!(entity.timex.tid, "t1");
        assert_eq!(entity.timex.anchor_time_id.as_deref(), Some("t0"));
    }

    #[test]
    fn entities_carry_external_spans() {
        let opts = Options { external: Some(vec![0, 1, 2, 3, 4]), ..Options::default() };
        let res = tag_with(sentence(), &context(), &opts).unwrap();
        assert_eq!(res.results[0].tokens, Some(Span::new(1, 3)));
        assert_eq!(res.results[0].external, Some(Span::new(1, 3)));

        // The outside list starts with a token of its own.
        let opts = Options { external: Some(vec![99, 0, 1, 2, 3, 4]), ..Options::default() };
        let res = tag_with(sentence(), &context(), &opts).unwrap();
        assert_eq!(res.results[0].external, Some(Span::new(2, 4)));

        let opts = Options { external: Some(vec![1, 2, 3, 4]), ..Options::default() };
        assert!(matches!(tag_with(sentence(), &context(), &opts), Err(Error::Unmapped { token: 0, .. })));
    }

    #[test]
    fn missing_models_fail_the_run() {
        let ctx = Context { models: Vec::new(), ..context() };
        assert!(tag_with(sentence(), &ctx, &Options::default()).is_err());
    }

    #[test]
    fn verbose_run_lists_candidate_trees() {
        let res = tag_verbose_with(sentence(), &context(), &Options::default()).unwrap();
        assert_eq!(res.results.len(), 1);
        let tags: Vec<(&str, usize)> = res.candidates.iter().map(|c| (c.tag.as_str(), c.depth)).collect();
        assert_eq!(tags, [("REL_DAY-TIME", 0), ("REL_DAY", 1), ("TIME", 1)]);
        assert_eq!(res.candidates[0].stage, Stage::MergedAsPhrase);
        assert_eq!(res.candidates[2].rule.as_deref(), Some("kellaaeg"));
        assert_eq!(res.metrics.extract.produced, 2);
    }
}
