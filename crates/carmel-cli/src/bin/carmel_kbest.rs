// carmel-kbest: Print the k best paths of a weighted transducer.
//
// Reads an automaton in text form and prints its k highest-weight
// start-to-final paths, best first, one per line:
//   RANK<TAB>WEIGHT<TAB>INPUT<TAB>OUTPUT
//
// Usage:
//   carmel-kbest [OPTIONS] [FILE]
//
// Options:
//   -k, --k N             Number of paths (default 1)
//   --normalize METHOD    Normalize first: none, joint or conditional
//   --reduce              Drop states not on any start-to-final path first
//   --allow-cycles        Do not fail on paths that repeat an arc
//   --json                Print one JSON object per path
//   -h, --help            Print help

use std::io::{self, Write};

use carmel_cli::PathRecord;
use carmel_fst::{BestPathsConfig, NormalizeMethod, WfstError};

fn main() {
    carmel_cli::init_logging();
    let args: Vec<String> = std::env::args().skip(1).collect();

    if carmel_cli::wants_help(&args) {
        println!("carmel-kbest: Print the k best paths of a weighted transducer.");
        println!();
        println!("Usage: carmel-kbest [OPTIONS] [FILE]");
        println!();
        println!("Reads FILE (or stdin) and prints RANK, WEIGHT, INPUT and OUTPUT per path.");
        println!();
        println!("Options:");
        println!("  -k, --k N             Number of paths (default 1)");
        println!("  --normalize METHOD    Normalize first: none, joint or conditional");
        println!("  --reduce              Drop states not on any start-to-final path first");
        println!("  --allow-cycles        Do not fail on paths that repeat an arc");
        println!("  --json                Print one JSON object per path");
        println!("  -h, --help            Print this help");
        return;
    }

    let (k, args) = carmel_cli::parse_option(&args, "--k", Some("-k"));
    let (method, args) = carmel_cli::parse_option(&args, "--normalize", None);
    let k: usize = carmel_cli::parse_value(k, "--k", 1);
    let method: NormalizeMethod = carmel_cli::parse_value(method, "--normalize", NormalizeMethod::None);
    let json = carmel_cli::has_flag(&args, "--json");

    let mut wfst = carmel_cli::load_wfst(carmel_cli::input_path(&args))
        .unwrap_or_else(|e| carmel_cli::fatal(e));
    if carmel_cli::has_flag(&args, "--reduce") {
        wfst.reduce().unwrap_or_else(|e| carmel_cli::fatal(e));
    }
    wfst.normalize(method)
        .unwrap_or_else(|e| carmel_cli::fatal(e));

    let mut config = BestPathsConfig::new(k);
    if carmel_cli::has_flag(&args, "--allow-cycles") {
        config = config.allow_cycles();
    }
    let paths = match wfst.best_paths_list(&config) {
        Ok(paths) => paths,
        Err(e @ WfstError::BestPathCycle { .. }) => {
            carmel_cli::fatal(format_args!("{e} (rerun with --allow-cycles to permit it)"))
        }
        Err(e) => carmel_cli::fatal(e),
    };

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    for (i, path) in paths.iter().enumerate() {
        let record = PathRecord::new(&wfst, i + 1, path);
        let _ = writeln!(out, "{}", record.render(json));
    }
    if paths.len() < k {
        tracing::info!(found = paths.len(), requested = k, "fewer paths than requested");
    }
}
