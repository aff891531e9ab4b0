//! Temporal expression tagging for morphologically analyzed Estonian text.
//!
//! Tokens come from an external analyzer (see [`analyzer`]); a [`RuleSet`]
//! extracts candidate expressions, merges them into phrases and ranges, and
//! resolves each one against a [`ReferenceTime`] into TIMEX3 attributes.
//!
//! ```
//! use ajamuster::{Context, Options, ReferenceTime, tag_with};
//!
//! let tokens = serde_json::from_str(
//!     r#"[{"surface": "eile", "analyses": [{"lemma": "eile", "pos": "D"}]}]"#,
//! ).unwrap();
//! let reference: ReferenceTime = "2009-07-23T10:30".parse().unwrap();
//! let out = tag_with(tokens, &Context::with_reference(reference), &Options::default()).unwrap();
//! assert_eq!(out.results[0].value(), "2009-07-22");
//! ```

#[macro_use]
mod macros;
pub mod align;
pub mod analyzer;
mod api;
pub mod candidate;
pub mod document;
mod engine;
pub mod error;
pub mod granularity;
pub mod output;
pub mod reference;
pub mod rules;
pub mod semantics;
pub mod token;

pub use api::{
    CandidateSummary, Context, Entity, Options, TagResult, TagResultVerbose, default_rules, tag, tag_document,
    tag_text, tag_verbose_with, tag_with,
};
pub use document::{Document, InputToken};
pub use engine::{Pipeline, ResolveCounts, RunMetrics, StageMetrics};
pub use error::{Error, Result};
pub use reference::ReferenceTime;
pub use rules::RuleSet;
pub use token::Token;
