// carmel-normalize: Normalize, prune and tidy a weighted transducer.
//
// Reads an automaton in text form, applies the requested edits in the
// order listed below and writes the result in text form to stdout.
//
// Usage:
//   carmel-normalize [OPTIONS] [FILE]
//
// Options:
//   --consolidate         Merge parallel arcs with the same labels and group
//   --reduce              Drop states not on any start-to-final path
//   --method METHOD       none, joint or conditional (default conditional)
//   --prune WEIGHT        Drop arcs lighter than WEIGHT after normalizing
//   --invert              Swap input and output
//   --ln                  Write weights as natural logs
//   --state-per-line      Write one state group per line
//   -h, --help            Print help

use std::io::{self, Write};

use carmel_core::{LogStyle, Weight, WeightFormat};
use carmel_fst::{NormalizeMethod, TextFormat};

fn main() {
    carmel_cli::init_logging();
    let args: Vec<String> = std::env::args().skip(1).collect();

    if carmel_cli::wants_help(&args) {
        println!("carmel-normalize: Normalize, prune and tidy a weighted transducer.");
        println!();
        println!("Usage: carmel-normalize [OPTIONS] [FILE]");
        println!();
        println!("Options:");
        println!("  --consolidate         Merge parallel arcs with the same labels and group");
        println!("  --reduce              Drop states not on any start-to-final path");
        println!("  --method METHOD       none, joint or conditional (default conditional)");
        println!("  --prune WEIGHT        Drop arcs lighter than WEIGHT after normalizing");
        println!("  --invert              Swap input and output");
        println!("  --ln                  Write weights as natural logs");
        println!("  --state-per-line      Write one state group per line");
        println!("  -h, --help            Print this help");
        return;
    }

    let (method, args) = carmel_cli::parse_option(&args, "--method", None);
    let (prune, args) = carmel_cli::parse_option(&args, "--prune", None);
    let method: NormalizeMethod = carmel_cli::parse_value(method, "--method", NormalizeMethod::default());
    let prune: Option<Weight> = prune.map(|p| carmel_cli::parse_value(Some(p), "--prune", Weight::zero()));

    let mut wfst = carmel_cli::load_wfst(carmel_cli::input_path(&args))
        .unwrap_or_else(|e| carmel_cli::fatal(e));

    if carmel_cli::has_flag(&args, "--consolidate") {
        let merged = wfst.consolidate_arcs(true, false);
        tracing::info!(merged, "consolidated arcs");
    }
    if carmel_cli::has_flag(&args, "--reduce") {
        wfst.reduce().unwrap_or_else(|e| carmel_cli::fatal(e));
    }
    wfst.normalize(method)
        .unwrap_or_else(|e| carmel_cli::fatal(e));
    if let Some(threshold) = prune {
        let removed = wfst.prune_arcs(threshold);
        tracing::info!(removed, "pruned arcs");
    }
    if carmel_cli::has_flag(&args, "--invert") {
        wfst.invert();
    }

    let format = TextFormat {
        weights: if carmel_cli::has_flag(&args, "--ln") {
            WeightFormat::always_log(LogStyle::Ln)
        } else {
            WeightFormat::default()
        },
        arc_per_line: !carmel_cli::has_flag(&args, "--state-per-line"),
    };
    let text = wfst
        .to_text(&format)
        .unwrap_or_else(|e| carmel_cli::fatal(e));

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let _ = out.write_all(text.as_bytes());
}
