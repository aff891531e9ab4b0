use ajamuster::{CandidateSummary, Context, Entity, TagResultVerbose};
use serde_json::{Map, Value};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

pub fn entity_json(entity: &Entity) -> Value {
    let mut map = Map::new();
    map.insert("text".into(), Value::String(entity.body.clone()));
    map.insert("start".into(), Value::from(entity.start));
    map.insert("end".into(), Value::from(entity.end));
    if let Some(span) = entity.external {
        map.insert("external".into(), Value::from(vec![span.start, span.end]));
    }
    map.insert("timex".into(), entity.timex.to_json());
    Value::Object(map)
}

pub fn print_run(res: &TagResultVerbose, ctx: &Context, color: bool) {
    let palette = ansi::Palette::new(color);
    println!("\n{}", palette.bold(palette.paint(format!("⚙  Tagging: \"{}\"", res.text), ansi::CYAN)));
    println!(
        "  {} {}  {} {}",
        palette.dim("reference:"),
        palette.paint(ctx.reference.value(), ansi::YELLOW),
        palette.dim("models:"),
        palette.paint(ctx.models.join(","), ansi::BLUE),
    );

    println!("\n{}", palette.paint("━━━ Stages ━━━", ansi::GRAY));
    for (label, stage) in res.metrics.stages() {
        println!(
            "  {} {}  {}  {}",
            palette.paint(format!("{label:<8}"), ansi::BLUE),
            if stage.produced > 0 {
                palette.paint(format!("+{}", stage.produced), ansi::GREEN)
            } else {
                palette.dim("+0")
            },
            if stage.removed > 0 {
                palette.paint(format!("-{}", stage.removed), ansi::YELLOW)
            } else {
                palette.dim("-0")
            },
            palette.dim(format!("{:?}", stage.duration)),
        );
    }
    let counts = &res.metrics.counts;
    println!(
        "  {} resolved {}  unresolved {}  folded {}  split {}",
        palette.paint("counts  ", ansi::BLUE),
        counts.resolved,
        counts.unresolved,
        counts.folded,
        counts.splits,
    );

    println!("\n{}", palette.paint("━━━ Candidates ━━━", ansi::GRAY));
    if res.candidates.is_empty() {
        println!("{}", palette.dim("  No candidates survived"));
        println!("\n{}", palette.paint("Possible reasons:", ansi::YELLOW));
        println!("  • Tokens carry no analyses the word classes match");
        println!("  • A negative pattern removed the match");
        println!("  • Only non-standalone candidates were found");
        println!("\n{}", palette.dim("  Tip: Set AJAMUSTER_LOG=ajamuster=trace to see every stage"));
    } else {
        for candidate in &res.candidates {
            println!("  {}", fmt_candidate(candidate, &palette));
        }
    }

    println!("\n{}", palette.paint("━━━ Results ━━━", ansi::GRAY));
    if res.results.is_empty() {
        println!("{}", palette.dim("  No TIMEX produced"));
    }
    for (idx, ent) in res.results.iter().enumerate() {
        println!(
            "  {} {} {} {}",
            palette.paint(format!("[{}]", idx), ansi::GRAY),
            palette.bold(palette.paint(ent.value(), ansi::GREEN)),
            palette.dim("│"),
            palette.paint(format!("span {}..{} \"{}\"", ent.start, ent.end, ent.body), ansi::YELLOW),
        );
        println!("      {} {}", palette.dim("tag:"), palette.paint(&ent.tag, ansi::CYAN));
        println!("      {}", palette.dim(ent.timex.to_string()));
    }

    println!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    println!(
        "  Total: {}  │  Extract: {}  │  Resolve: {}",
        palette.paint(format!("{:?}", res.elapsed), ansi::GREEN),
        palette.paint(format!("{:?}", res.metrics.extract.duration), ansi::CYAN),
        palette.dim(format!("{:?}", res.metrics.resolve.duration)),
    );
    println!();
}

fn fmt_candidate(candidate: &CandidateSummary, palette: &ansi::Palette) -> String {
    format!(
        "{}{} {} {} {} {}",
        "  ".repeat(candidate.depth),
        palette.paint(format!("{}..{}", candidate.span.start, candidate.span.end), ansi::YELLOW),
        palette.paint(format!("{:?}", candidate.stage), ansi::GRAY),
        palette.paint(&candidate.tag, ansi::BLUE),
        palette.dim(candidate.rule.as_deref().unwrap_or("-")),
        match &candidate.value {
            Some(value) => format!("{} {}", palette.dim(&candidate.preview), palette.paint(value, ansi::GREEN)),
            None => palette.dim(&candidate.preview),
        },
    )
}
