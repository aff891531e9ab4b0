//! External morphological analyzer.
//!
//! The analyzer is a separate program reading plain text on stdin and writing
//! one word per line followed by indented analyses (vabamorf `vmeta` layout):
//!
//! ```text
//! <s>
//! kella
//!     kell+0 //_S_ sg g, //
//! üheksast
//!     üheksa+st //_N_ sg el, //
//! </s>
//! ```
//!
//! `<kindel_piir/>` lines from a clause segmenter mark a definite clause
//! boundary after the preceding word.

use std::io::{self, Read, Write};
use std::process::{Command, Stdio};
use std::thread;

use tracing::{debug, trace};

use crate::document::InputToken;
use crate::error::{Error, Result};
use crate::token::MorphAnalysis;

#[derive(Debug, Clone)]
pub struct Analyzer {
    program: String,
    args: Vec<String>,
}

impl Analyzer {
    pub fn new(program: &str) -> Self {
        Analyzer { program: program.to_string(), args: Vec::new() }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.args.push(arg.to_string());
        self
    }

    /// Run the analyzer over `text` and return its raw output.
    ///
    /// Stdin is fed from one thread while two others drain stdout and stderr,
    /// so a chatty analyzer cannot block on a full pipe.
    pub fn analyze(&self, text: &str) -> Result<String> {
        debug!("[analyzer] running {} {:?}", self.program, self.args);
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (written, output, errors) = thread::scope(|scope| {
            let writer = scope.spawn(move || -> io::Result<()> {
                if let Some(mut stdin) = stdin {
                    stdin.write_all(text.as_bytes())?;
                }
                Ok(())
            });
            let out = scope.spawn(move || drain(stdout));
            let err = scope.spawn(move || drain(stderr));
            (join(writer), join(out), join(err))
        });

        let status = child.wait()?;
        let errors = errors?;
        if !status.success() {
            return Err(Error::Process { status: status.to_string(), stderr: errors.trim().to_string() });
        }
        written?;
        let output = output?;
        trace!("[analyzer] {} bytes of output", output.len());
        Ok(output)
    }

    /// Analyze `text` and parse the output into tokens.
    pub fn tokens(&self, text: &str) -> Result<Vec<InputToken>> {
        Ok(parse_output(&self.analyze(text)?))
    }
}

fn drain(pipe: Option<impl Read>) -> io::Result<String> {
    let mut buffer = String::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_string(&mut buffer)?;
    }
    Ok(buffer)
}

fn join<T>(handle: thread::ScopedJoinHandle<'_, io::Result<T>>) -> io::Result<T> {
    handle.join().unwrap_or_else(|_| Err(io::Error::other("analyzer pipe thread panicked")))
}

fn parse_analysis(line: &str) -> Option<MorphAnalysis> {
    let caps = regex!(r"^\s*(\S+?)\+(\S*)\s+//_([A-Z])_\s*(.*?)\s*//").captures(line)?;
    let lemma: String = caps[1].chars().filter(|c| *c != '_' && *c != '=').collect();
    let ending = if &caps[2] == "0" { "" } else { &caps[2] };
    let form = caps[4].trim_end_matches(',').trim();
    Some(MorphAnalysis::new(&lemma, ending, &caps[3], form))
}

/// Parse analyzer output into input tokens.
pub fn parse_output(output: &str) -> Vec<InputToken> {
    let mut tokens: Vec<InputToken> = Vec::new();
    for line in output.lines() {
        let trimmed = line.trim();
        match trimmed {
            "" | "<s>" => {}
            "</s>" => {
                if let Some(last) = tokens.last_mut() {
                    last.sentence_end = true;
                }
            }
            "<kindel_piir/>" => {
                if let Some(last) = tokens.last_mut() {
                    last.clause_boundary = true;
                }
            }
            _ if line.starts_with(char::is_whitespace) => {
                if let (Some(last), Some(analysis)) = (tokens.last_mut(), parse_analysis(line)) {
                    last.analyses.push(analysis);
                }
            }
            _ => tokens.push(InputToken {
                surface: trimmed.to_string(),
                analyses: Vec::new(),
                sentence_end: false,
                clause_boundary: false,
            }),
        }
    }
    tokens
}
