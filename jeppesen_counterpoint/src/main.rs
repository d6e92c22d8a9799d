// Jeppesen Counterpoint Generator: CLI entry point.
//
// Builds one variant, runs the generator, prints the chosen solution voice by
// voice and writes it to MIDI (and optionally JSON).
//
// Usage:
//   cargo run -p jeppesen_counterpoint --bin generate -- --variant first-species
//     [--mode MODE] [--length BARS] [--voices N] [--seed N] [--tempo BPM]
//     [--output out.mid] [--json out.json] [--worst]
//
// Set RUST_LOG=debug to follow individual attempts.

use clap::Parser;
use jeppesen_counterpoint::error::{GenerateError, Result};
use jeppesen_counterpoint::generator::Generator;
use jeppesen_counterpoint::midi::write_midi;
use jeppesen_counterpoint::mode::{Mode, VocalRange};
use jeppesen_counterpoint::variants::{Request, Variant, build_config};
use jeppesen_prng::SeededRng;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Parser)]
#[command(name = "generate", about = "Generate Renaissance counterpoint")]
struct Cli {
    /// Kind of counterpoint (cantus-firmus, first-species .. fifth-species,
    /// multi-part, theme, duet, free-counterpoint)
    #[arg(long, default_value = "cantus-firmus")]
    variant: Variant,

    /// Church mode
    #[arg(long, default_value = "dorian")]
    mode: Mode,

    /// Length in bars; each variant has its own default
    #[arg(long)]
    length: Option<usize>,

    /// Number of voices (multi-part only)
    #[arg(long, default_value_t = 4)]
    voices: usize,

    /// Random seed; drawn from the clock when absent
    #[arg(long)]
    seed: Option<u64>,

    /// Playback tempo in quarter notes per minute
    #[arg(long, default_value_t = 72)]
    tempo: u16,

    /// MIDI output path
    #[arg(short, long, default_value = "output.mid")]
    output: PathBuf,

    /// Also write the solution as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Keep the worst-scored solution instead of the best
    #[arg(long)]
    worst: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let seed = cli.seed.unwrap_or_else(clock_seed);
    let request = Request {
        mode: cli.mode,
        length: cli.length.unwrap_or_else(|| cli.variant.default_length()),
        voices: cli.voices,
    };

    println!("=== Jeppesen Counterpoint Generator ===");
    println!("Variant: {}", cli.variant);
    println!("Mode: {}", request.mode);
    println!("Length: {} bars", request.length);
    println!("Seed: {seed}");
    println!();

    let mut rng = SeededRng::new(seed);

    println!("[1/3] Building {} configuration...", cli.variant);
    let config = build_config(cli.variant, &request, &mut rng)?;
    let ranges: Vec<VocalRange> = config.voices.iter().map(|v| v.range).collect();
    println!(
        "  {} voices on a {}-bar grid, {} with given material",
        ranges.len(),
        config.length(),
        config.voices.iter().filter(|v| !v.material.is_empty()).count()
    );

    println!("[2/3] Generating...");
    let mut generator = Generator::new(config, rng.fork());
    generator.generate();
    let stats = generator.stats();
    println!(
        "  Attempts: {} ({} redraws), backtracks: {}, solutions: {}",
        stats.attempts,
        stats.redraws,
        stats.backtracks,
        generator.get_all_solutions().len()
    );

    let chosen = if cli.worst {
        generator.get_worst_solution()
    } else {
        generator.get_one_solution()
    };
    let Some(solution) = chosen else {
        return Err(GenerateError::NoSolution {
            variant: generator.config().name,
            attempts: stats.attempts,
        });
    };
    println!("  Score: {}", solution.score);
    println!();

    // Top voice first.
    for (range, voice) in ranges.iter().zip(&solution.voices).rev() {
        let line: Vec<String> = voice.iter().map(|v| v.to_string()).collect();
        println!("  {:<8} {}", range.name(), line.join(" "));
    }
    println!();

    println!("[3/3] Writing MIDI to {}...", cli.output.display());
    write_midi(solution, &ranges, cli.tempo, &cli.output)?;
    if let Some(path) = &cli.json {
        std::fs::write(path, serde_json::to_string_pretty(solution)?)?;
        println!("  Wrote JSON to {}", path.display());
    }

    println!();
    println!("Play with: timidity {} (or any MIDI player)", cli.output.display());
    Ok(())
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos() as u64)
}
