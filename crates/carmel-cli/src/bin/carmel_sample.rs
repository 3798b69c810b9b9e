// carmel-sample: Draw random paths from a weighted transducer.
//
// Reads an automaton in text form and prints k random start-to-final
// paths in the same format as carmel-kbest. By default each walk follows
// arc weights until it reaches the final state; with --generate it picks
// input symbols uniformly and stops once enough arcs were taken.
//
// Usage:
//   carmel-sample [OPTIONS] [FILE]
//
// Options:
//   -k, --k N             Number of samples to attempt (default 1)
//   --seed N              Random seed (default: from the OS)
//   --max-len N           Longest walk, in arcs (default 1000)
//   --generate            Generate input/output pairs instead of walking
//   --min-arcs N          With --generate: arcs to take before stopping at final
//   --buffer N            With --generate: longest input or output (default 1000)
//   --json                Print one JSON object per path
//   -h, --help            Print help

use std::io::{self, Write};

use carmel_cli::PathRecord;
use carmel_fst::{GenerateConfig, RandomPathConfig};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn main() {
    carmel_cli::init_logging();
    let args: Vec<String> = std::env::args().skip(1).collect();

    if carmel_cli::wants_help(&args) {
        println!("carmel-sample: Draw random paths from a weighted transducer.");
        println!();
        println!("Usage: carmel-sample [OPTIONS] [FILE]");
        println!();
        println!("Options:");
        println!("  -k, --k N             Number of samples to attempt (default 1)");
        println!("  --seed N              Random seed (default: from the OS)");
        println!("  --max-len N           Longest walk, in arcs (default 1000)");
        println!("  --generate            Generate input/output pairs instead of walking");
        println!("  --min-arcs N          With --generate: arcs to take before stopping at final");
        println!("  --buffer N            With --generate: longest input or output (default 1000)");
        println!("  --json                Print one JSON object per path");
        println!("  -h, --help            Print this help");
        return;
    }

    let (k, args) = carmel_cli::parse_option(&args, "--k", Some("-k"));
    let (seed, args) = carmel_cli::parse_option(&args, "--seed", None);
    let (max_len, args) = carmel_cli::parse_option(&args, "--max-len", None);
    let (min_arcs, args) = carmel_cli::parse_option(&args, "--min-arcs", None);
    let (buffer, args) = carmel_cli::parse_option(&args, "--buffer", None);

    let k: usize = carmel_cli::parse_value(k, "--k", 1);
    let walk = RandomPathConfig {
        max_len: carmel_cli::parse_value(max_len, "--max-len", RandomPathConfig::default().max_len),
    };
    let defaults = GenerateConfig::default();
    let generate = GenerateConfig {
        min_arcs: carmel_cli::parse_value(min_arcs, "--min-arcs", defaults.min_arcs),
        buffer_len: carmel_cli::parse_value(buffer, "--buffer", defaults.buffer_len),
    };
    let mut rng = match seed {
        Some(_) => StdRng::seed_from_u64(carmel_cli::parse_value(seed, "--seed", 0)),
        None => StdRng::from_os_rng(),
    };
    let json = carmel_cli::has_flag(&args, "--json");

    let wfst = carmel_cli::load_wfst(carmel_cli::input_path(&args))
        .unwrap_or_else(|e| carmel_cli::fatal(e));

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let mut rank = 0;
    for _ in 0..k {
        let sample = if carmel_cli::has_flag(&args, "--generate") {
            wfst.generate(&generate, &mut rng)
        } else {
            wfst.random_path(&walk, &mut rng)
        };
        match sample {
            Ok(Some(path)) => {
                rank += 1;
                let record = PathRecord::new(&wfst, rank, &path);
                let _ = writeln!(out, "{}", record.render(json));
            }
            Ok(None) => tracing::debug!("sample exceeded its length limit"),
            Err(e) => carmel_cli::fatal(e),
        }
    }
    if rank < k {
        tracing::warn!(succeeded = rank, attempted = k, "some samples failed");
    }
}
