mod debug_report;

use ajamuster::analyzer::Analyzer;
use ajamuster::{Context, InputToken, Options, ReferenceTime, tag_verbose_with};
use std::io::{self, IsTerminal, Read};
use tracing_subscriber::EnvFilter;

const DEFAULT_REFERENCE: &str = "2013-02-12T04:30";
const LOG_ENV: &str = "AJAMUSTER_LOG";

fn main() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(io::stderr).init();

    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let tokens = match input_tokens(&config) {
        Ok(tokens) => tokens,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let ctx = Context { reference: config.reference, models: config.models };
    let opts = Options { strict: config.strict, external: config.positions };
    match tag_verbose_with(tokens, &ctx, &opts) {
        Ok(res) if config.json => {
            let annotations: Vec<_> = res.results.iter().map(debug_report::entity_json).collect();
            println!("{}", serde_json::Value::Array(annotations));
        }
        Ok(res) => debug_report::print_run(&res, &ctx, config.color),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

struct CliConfig {
    input: String,
    reference: ReferenceTime,
    models: Vec<String>,
    analyzer: Option<String>,
    positions: Option<Vec<usize>>,
    strict: bool,
    json: bool,
    color: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut input: Option<String> = None;
    let mut reference = parse_reference(DEFAULT_REFERENCE)?;
    let mut models: Vec<String> = Vec::new();
    let mut analyzer: Option<String> = None;
    let mut positions: Option<Vec<usize>> = None;
    let mut strict = false;
    let mut json = false;
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1).peekable();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("ajamuster {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--strict" => strict = true,
            "--json" => json = true,
            "--reference" => {
                let value = args.next().ok_or_else(|| "error: --reference expects a value".to_string())?;
                reference = parse_reference(&value)?;
            }
            "--model" => {
                let value = args.next().ok_or_else(|| "error: --model expects a value".to_string())?;
                models.push(value);
            }
            "--analyzer" => {
                let value = args.next().ok_or_else(|| "error: --analyzer expects a program".to_string())?;
                analyzer = Some(value);
            }
            "--positions" => {
                let value = args.next().ok_or_else(|| "error: --positions expects a value".to_string())?;
                positions = Some(parse_positions(&value)?);
            }
            "--input" | "-i" => {
                let value = args.next().ok_or_else(|| "error: --input expects a value".to_string())?;
                if input.is_some() {
                    return Err("error: input provided multiple times".to_string());
                }
                input = Some(value);
            }
            _ if arg.starts_with("--reference=") => {
                reference = parse_reference(arg.trim_start_matches("--reference="))?;
            }
            _ if arg.starts_with("--model=") => models.push(arg.trim_start_matches("--model=").to_string()),
            _ if arg.starts_with('-') => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => {
                let rest = std::iter::once(arg).chain(args).collect::<Vec<_>>().join(" ");
                if input.is_some() {
                    return Err("error: input provided multiple times".to_string());
                }
                input = Some(rest);
                break;
            }
        }
    }

    let input = match input {
        Some(value) => value,
        None => read_stdin_input()?,
    };

    if input.trim().is_empty() {
        return Err(format!("error: no input provided\n\n{}", help_text()));
    }
    if models.is_empty() {
        models = Context::default().models;
    }

    Ok(CliConfig { input, reference, models, analyzer, positions, strict, json, color })
}

/// JSON tokens, or plain text when an analyzer program is given.
fn input_tokens(config: &CliConfig) -> Result<Vec<InputToken>, String> {
    match &config.analyzer {
        Some(program) => {
            Analyzer::new(program).tokens(&config.input).map_err(|err| format!("error: analyzer failed: {err}"))
        }
        None => serde_json::from_str(&config.input).map_err(|err| format!("error: invalid token JSON: {err}")),
    }
}

fn read_stdin_input() -> Result<String, String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(|err| format!("error: failed to read stdin: {err}"))?;
    Ok(buffer)
}

fn parse_reference(value: &str) -> Result<ReferenceTime, String> {
    value
        .parse()
        .map_err(|_| format!("error: invalid --reference '{value}' (expected YYYY-MM-DDTHH:MM, XX allowed)"))
}

fn parse_positions(value: &str) -> Result<Vec<usize>, String> {
    value
        .split(',')
        .map(|p| p.trim().parse::<usize>())
        .collect::<Result<_, _>>()
        .map_err(|_| format!("error: invalid --positions '{value}' (expected comma-separated indices)"))
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "ajamuster {version}

Temporal expression tagger for analyzed Estonian text.

Usage:
  ajamuster [OPTIONS] [--] <tokens-json...>
  ajamuster [OPTIONS] --analyzer <program> --input <text>

Input is a JSON array of tokens:
  [{{\"surface\": \"homme\", \"analyses\": [{{\"lemma\": \"homme\", \"pos\": \"D\"}}]}}, ...]
With --analyzer the input is plain text piped through the analyzer program.

Options:
  -i, --input <value>        Input tokens (or text). If omitted, reads remaining
                             args or stdin when no args are provided.
  --reference <time>         Reference time, YYYY-MM-DDTHH:MM; fields may be XX.
                             Default: {default_reference}
  --model <tag>              Accepted computation model (repeatable).
                             Default: ajavt
  --analyzer <program>       Morphological analyzer reading text on stdin.
  --positions <list>         Input positions kept by an outside segmentation,
                             comma-separated; entities report spans in it.
  --strict                   Drop or repair malformed TIMEX attributes.
  --json                     Print annotations as JSON instead of a report.
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Environment:
  {log_env}               Log filter, e.g. ajamuster=debug.

Exit codes:
  0  Success.
  1  Tagging failed.
  2  Invalid arguments or input.
",
        version = env!("CARGO_PKG_VERSION"),
        default_reference = DEFAULT_REFERENCE,
        log_env = LOG_ENV,
    )
}
