use anyhow::{Context, Result};
use clap::Parser;
use clap_verbosity_flag::Verbosity;
use minelogic_core::*;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::Serialize;

/// Plays seeded Minesweeper games with the logical inference engine and reports how each one ended.
#[derive(Parser, Debug)]
#[command(name = "autoplay", version, about)]
struct Args {
    /// Board height in cells
    #[arg(long, default_value_t = 8)]
    height: Coord,

    /// Board width in cells
    #[arg(long, default_value_t = 8)]
    width: Coord,

    /// Number of mines on each board
    #[arg(long, default_value_t = 8)]
    mines: CellCount,

    /// How many games to play
    #[arg(long, default_value_t = 1)]
    games: u32,

    /// Seed of the first game, later games use the following seeds
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Open the center cell first and keep it free of mines
    #[arg(long)]
    safe_start: bool,

    /// Repeat subset resolution until it derives nothing new
    #[arg(long)]
    saturate: bool,

    /// Print the reports as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Print every minefield before playing it
    #[arg(long)]
    show_board: bool,

    #[command(flatten)]
    verbosity: Verbosity,
}

#[derive(Debug, Default, Serialize)]
struct Summary {
    games: u32,
    won: u32,
    lost: u32,
    stuck: u32,
    random_moves: u64,
}

impl Summary {
    fn record(&mut self, report: &GameReport) {
        self.games += 1;
        self.random_moves += u64::from(report.random_moves);
        match report.state {
            PlayState::Won => self.won += 1,
            PlayState::Lost => self.lost += 1,
            PlayState::Stuck | PlayState::Active => self.stuck += 1,
        }
    }
}

#[derive(Debug, Serialize)]
struct SeededReport {
    seed: u64,
    #[serde(flatten)]
    report: GameReport,
}

#[derive(Debug, Serialize)]
struct Output {
    config: GameConfig,
    knowledge: KnowledgeConfig,
    summary: Summary,
    reports: Vec<SeededReport>,
}

fn play_one(
    args: &Args,
    seed: u64,
    config: GameConfig,
    knowledge: KnowledgeConfig,
) -> Result<GameReport> {
    let start = (config.size.0 / 2, config.size.1 / 2);
    let start_tile = if args.safe_start {
        StartTile::SimpleSafe
    } else {
        StartTile::Random
    };

    let minefield = RandomMinefieldGenerator::new(seed, start, start_tile).generate(config);
    if args.show_board {
        println!("seed {seed}:\n{minefield}");
    }

    let mut player = Autoplayer::new(minefield, knowledge);
    let mut rng = SmallRng::seed_from_u64(seed);

    if args.safe_start {
        let outcome = player
            .reveal(start)
            .with_context(|| format!("opening start cell {start:?} of game {seed}"))?;
        if outcome.is_finished() {
            return Ok(player.report(0));
        }
    }

    player
        .play(&mut rng)
        .with_context(|| format!("playing game {seed}"))
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.verbosity.log_level_filter())
        .init();

    let config = GameConfig::try_new((args.height, args.width), args.mines)
        .context("invalid board configuration")?;
    let knowledge = KnowledgeConfig {
        synthesis: if args.saturate {
            SynthesisMode::Saturate
        } else {
            SynthesisMode::SinglePass
        },
    };
    log::debug!("Playing {} games with {config:?} and {knowledge:?}", args.games);

    let mut summary = Summary::default();
    let mut reports = Vec::new();

    for seed in (0..u64::from(args.games)).map(|offset| args.seed.wrapping_add(offset)) {
        let report = play_one(&args, seed, config, knowledge)?;
        summary.record(&report);

        if !args.json {
            let ending = match (report.state, report.triggered_mine) {
                (PlayState::Lost, Some(mine)) => format!("lost at {mine:?}"),
                (state, _) => format!("{state:?}").to_lowercase(),
            };
            println!(
                "game {seed}: {ending}, {} safe / {} random moves, {} mines flagged, {} us",
                report.safe_moves, report.random_moves, report.mines_flagged, report.elapsed_micros,
            );
        }
        reports.push(SeededReport { seed, report });
    }

    if args.json {
        let output = Output {
            config,
            knowledge,
            summary,
            reports,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "{} games: {} won, {} lost, {} stuck, {} random moves",
            summary.games, summary.won, summary.lost, summary.stuck, summary.random_moves,
        );
    }

    Ok(())
}
