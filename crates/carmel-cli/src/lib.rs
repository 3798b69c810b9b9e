// carmel-cli: shared utilities for CLI tools.

use std::fmt;
use std::io::Read;
use std::process;
use std::str::FromStr;

use carmel_fst::{Path, Side, Wfst};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `CARMEL_LOG=debug`.
const LOG_ENV: &str = "CARMEL_LOG";

/// Install a stderr log subscriber filtered by `CARMEL_LOG` (default `warn`).
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Read an automaton in text form from `path`, or from stdin when the path
/// is absent or `-`.
pub fn load_wfst(path: Option<&str>) -> Result<Wfst, String> {
    let (source, text) = match path {
        None | Some("-") => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(|e| format!("failed to read stdin: {e}"))?;
            ("<stdin>", text)
        }
        Some(p) => {
            let text = std::fs::read_to_string(p).map_err(|e| format!("failed to read {p}: {e}"))?;
            (p, text)
        }
    };
    let wfst: Wfst = text.parse().map_err(|e| format!("{source}: {e}"))?;
    debug!(source, states = wfst.num_states(), arcs = wfst.num_arcs(), "loaded automaton");
    Ok(wfst)
}

/// Parse a `--name=VALUE` or `--name VALUE` option (and `short VALUE` when
/// given) from command line args.
///
/// Returns `(value, remaining_args)`. The last occurrence wins.
pub fn parse_option(args: &[String], long: &str, short: Option<&str>) -> (Option<String>, Vec<String>) {
    let prefix = format!("{long}=");
    let mut value = None;
    let mut remaining = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        if let Some(val) = arg.strip_prefix(&prefix) {
            value = Some(val.to_string());
        } else if arg == long || Some(arg.as_str()) == short {
            match iter.next() {
                Some(val) => value = Some(val.clone()),
                None => fatal(format_args!("{arg} requires a value")),
            }
        } else {
            remaining.push(arg.clone());
        }
    }

    (value, remaining)
}

/// Parse an option value, exiting with an error message if it is malformed.
pub fn parse_value<T: FromStr>(value: Option<String>, name: &str, default: T) -> T {
    match value {
        None => default,
        Some(v) => v
            .parse()
            .unwrap_or_else(|_| fatal(format_args!("invalid value for {name}: `{v}`"))),
    }
}

/// Check for a bare switch such as `--json`.
pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

/// The first argument that is not a switch, taken as the input file.
pub fn input_path(args: &[String]) -> Option<&str> {
    args.iter()
        .map(String::as_str)
        .find(|a| *a == "-" || !a.starts_with('-'))
}

/// Name the running tool goes by in messages: the file stem of argv[0].
pub fn tool_name() -> String {
    std::env::args_os()
        .next()
        .and_then(|arg0| {
            std::path::Path::new(&arg0)
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "carmel".to_string())
}

fn error_line(tool: &str, msg: &dyn fmt::Display) -> String {
    format!("{tool}: error: {msg}")
}

/// Report `msg` as `TOOL: error: MSG` on stderr and exit with code 1.
pub fn fatal(msg: impl fmt::Display) -> ! {
    eprintln!("{}", error_line(&tool_name(), &msg));
    process::exit(1);
}

/// Whether `--help` or `-h` comes before any `--` separator.
pub fn wants_help(args: &[String]) -> bool {
    args.iter()
        .take_while(|a| *a != "--")
        .any(|a| a == "--help" || a == "-h")
}

// ---------------------------------------------------------------------------
// Path output
// ---------------------------------------------------------------------------

/// One path as printed by the tools.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathRecord {
    pub rank: usize,
    /// Natural log of the path weight.
    pub ln_weight: f64,
    /// Negated `ln_weight`.
    pub cost: f64,
    pub input: String,
    pub output: String,
    pub states: Vec<usize>,
}

impl PathRecord {
    pub fn new(wfst: &Wfst, rank: usize, path: &Path) -> Self {
        PathRecord {
            rank,
            ln_weight: path.weight.ln(),
            cost: path.cost(),
            input: wfst.yield_of(path, Side::Input),
            output: wfst.yield_of(path, Side::Output),
            states: path.states(),
        }
    }

    /// `RANK<TAB>WEIGHT<TAB>INPUT<TAB>OUTPUT`, or the JSON object.
    pub fn render(&self, json: bool) -> String {
        if json {
            serde_json::to_string(self).unwrap_or_else(|e| fatal(format_args!("failed to encode path: {e}")))
        } else {
            format!(
                "{}\t{}\t{}\t{}",
                self.rank,
                carmel_fst::Weight::from_ln(self.ln_weight),
                self.input,
                self.output
            )
        }
    }
}
