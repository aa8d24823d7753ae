use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use pacman_arcade::audio::TracingAudio;
use pacman_arcade::config::GameConfig;
use pacman_arcade::engine::{GameEngine, GameEngineOptions};
use pacman_arcade::levels::LevelCatalog;
use pacman_arcade::runner::{GameRunner, Renderer, RunnerCommand};
use pacman_arcade::score_store::ScoreStore;
use pacman_arcade::types::{
    CollectibleKind, Direction, EntityView, GameMode, GhostState, LevelView, Snapshot,
};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Terminal Pac-Man")]
struct Cli {
    /// High-score file.
    #[arg(
        long,
        global = true,
        env = "PACMAN_SCORES_PATH",
        default_value = ".data/highscores.txt"
    )]
    scores: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a session in the terminal. Type w/a/s/d + Enter to steer, r to retry, q to quit.
    Play(PlayArgs),
    /// Print the high-score table.
    Scores,
    /// Delete every recorded high score.
    ClearScores,
}

#[derive(Args, Debug)]
struct PlayArgs {
    /// `story` or `endless`.
    #[arg(long, default_value = "story")]
    mode: String,
    #[arg(long, default_value_t = 1)]
    level: u32,
    #[arg(long, default_value = "PLAYER")]
    name: String,
    /// JSON file overriding game tunables.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
    /// Let the built-in bot steer.
    #[arg(long)]
    autopilot: bool,
    #[arg(long, env = "PACMAN_LEVELS_DIR")]
    levels_dir: Option<PathBuf>,
}

/// Draws each frame as text to stdout.
struct AsciiRenderer {
    out: io::Stdout,
}

impl Renderer for AsciiRenderer {
    fn draw(&mut self, level: &LevelView, entities: &[EntityView], snapshot: &Snapshot) {
        let frame = render_frame(level, entities, snapshot);
        let mut out = self.out.lock();
        // Clear screen, cursor home.
        if let Err(error) = write!(out, "\x1b[2J\x1b[H{frame}").and_then(|()| out.flush()) {
            tracing::warn!(%error, "Failed to draw frame");
        }
    }
}

fn render_frame(level: &LevelView, entities: &[EntityView], snapshot: &Snapshot) -> String {
    let mut grid: Vec<Vec<char>> = level
        .tiles
        .iter()
        .map(|row| {
            row.chars()
                .map(|code| match code {
                    '=' => '-',
                    ' ' => ' ',
                    _ => '#',
                })
                .collect()
        })
        .collect();

    for entity in entities {
        let glyph = match entity {
            EntityView::Wall { .. } | EntityView::Door { .. } => continue,
            EntityView::Collectible {
                collectible: CollectibleKind::Pellet,
                ..
            } => '.',
            EntityView::Collectible {
                collectible: CollectibleKind::PowerPellet,
                ..
            } => 'o',
            EntityView::Bonus { .. } => '%',
            EntityView::Player { .. } => 'C',
            EntityView::Ghost {
                state: GhostState::Vulnerable,
                ..
            } => 'w',
            EntityView::Ghost { .. } => 'M',
        };
        let pos = entity.position();
        if let Some(cell) = grid
            .get_mut(pos.y as usize)
            .and_then(|row| row.get_mut(pos.x as usize))
        {
            *cell = glyph;
        }
    }

    let mut frame: String = grid
        .into_iter()
        .map(|row| row.into_iter().collect::<String>() + "\n")
        .collect();
    frame.push_str(&format!(
        "SCORE {:>6}  LIVES {}  LEVEL {}  {}\n",
        snapshot.player.score, snapshot.player.lives, snapshot.level, snapshot.message
    ));
    frame
}

fn parse_command(line: &str) -> Option<RunnerCommand> {
    let line = line.trim().to_lowercase();
    match line.as_str() {
        "q" | "quit" => Some(RunnerCommand::Quit),
        "r" | "retry" => Some(RunnerCommand::Retry),
        other => Direction::parse_move(other).map(RunnerCommand::Turn),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let store = ScoreStore::new(cli.scores);

    match cli.command {
        Command::Play(args) => play(args, store).await,
        Command::Scores => {
            let entries = store.load_best();
            if entries.is_empty() {
                println!("No high scores yet.");
            }
            for (rank, entry) in entries.iter().enumerate() {
                println!(
                    "{:>2}. {:<12} {:>8} PTS  {:<9} {}",
                    rank + 1,
                    entry.name,
                    entry.score,
                    entry.level,
                    entry.date
                );
            }
            Ok(())
        }
        Command::ClearScores => {
            store
                .clear()
                .with_context(|| format!("failed to clear {}", store.path().display()))?;
            println!("High scores cleared.");
            Ok(())
        }
    }
}

async fn play(args: PlayArgs, store: ScoreStore) -> anyhow::Result<()> {
    let mode = GameMode::parse(&args.mode.to_lowercase())
        .with_context(|| format!("unknown mode `{}`, expected story or endless", args.mode))?;
    let config = GameConfig::load(args.config.as_deref()).context("failed to load game config")?;
    let catalog = match &args.levels_dir {
        Some(dir) => LevelCatalog::from_dir(dir),
        None => LevelCatalog::Builtin,
    };

    let engine = GameEngine::new(
        config,
        catalog,
        GameEngineOptions {
            mode,
            start_level: args.level,
            seed: args.seed,
            player_name: args.name,
        },
    );
    let mut runner = GameRunner::new(
        engine,
        Box::new(AsciiRenderer { out: io::stdout() }),
        Box::new(TracingAudio),
        Some(store),
    )
    .with_autopilot(args.autopilot);

    // Blocking stdin reads run on their own thread.
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(error) => {
                    tracing::warn!(%error, "Failed to read input");
                    break;
                }
            };
            let Some(command) = parse_command(&line) else {
                tracing::debug!(line = %line, "Ignoring unknown input");
                continue;
            };
            if tx.send(command).is_err() {
                break;
            }
        }
    });

    let status = runner.run_realtime(rx, args.autopilot).await;
    let engine = runner.engine();
    println!(
        "{:?}: {} scored {} on level {}",
        status,
        engine.player_name(),
        engine.score(),
        engine.level()
    );
    Ok(())
}
