use anyhow::Context;
use clap::Parser;
use pacman_arcade::config::GameConfig;
use pacman_arcade::engine::{GameEngine, GameEngineOptions};
use pacman_arcade::levels::LevelCatalog;
use pacman_arcade::types::{BonusEffect, GameMode, RuntimeEvent, SessionStatus, Snapshot};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;

const DEFAULT_MAX_TICKS: u64 = 20_000;

/// Runs autopilot sessions headlessly and prints one JSON line per scenario.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    single: bool,
    #[arg(long)]
    mode: Option<String>,
    #[arg(long)]
    level: Option<u32>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    max_ticks: Option<u64>,
    #[arg(long, env = "PACMAN_LEVELS_DIR")]
    levels_dir: Option<PathBuf>,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    run_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    mode: GameMode,
    #[serde(rename = "startLevel")]
    start_level: u32,
    seed: u64,
    #[serde(rename = "maxTicks")]
    max_ticks: u64,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u64,
    mode: GameMode,
    status: SessionStatus,
    #[serde(rename = "reachedLevel")]
    reached_level: u32,
    #[serde(rename = "endlessRound")]
    endless_round: u32,
    score: u32,
    ticks: u64,
    #[serde(rename = "durationMs")]
    duration_ms: u64,
    #[serde(rename = "pelletsEaten")]
    pellets_eaten: u32,
    #[serde(rename = "powerPelletsEaten")]
    power_pellets_eaten: u32,
    #[serde(rename = "ghostsEaten")]
    ghosts_eaten: u32,
    deaths: u32,
    #[serde(rename = "levelsCleared")]
    levels_cleared: u32,
    #[serde(rename = "bonusesCollected")]
    bonuses_collected: u32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioRunResult {
    #[serde(flatten)]
    result: ScenarioResultLine,
    #[serde(rename = "anomalyRecords")]
    anomaly_records: Vec<AnomalyRecord>,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageScore")]
    average_score: u32,
    #[serde(rename = "statusCounts")]
    status_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

/// Previous tick's values the anomaly checks compare against.
#[derive(Clone, Copy, Debug, Default)]
struct Watch {
    score: u32,
    lives: u32,
    collectibles: usize,
    level: u32,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = GameConfig::load(cli.config.as_deref()).context("failed to load game config")?;
    let catalog = match &cli.levels_dir {
        Some(dir) => LevelCatalog::from_dir(dir),
        None => LevelCatalog::Builtin,
    };
    let scenarios = resolve_scenarios(&cli);
    let run_started_at_ms = now_ms();
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let run_id = cli
        .run_id
        .clone()
        .unwrap_or_else(|| default_run_id(seed_hint, run_started_at_ms));
    let mut has_anomaly = false;
    let mut scenario_results = Vec::new();
    let mut status_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        tracing::info!(
            run_id = %run_id,
            scenario = %scenario.name,
            seed = scenario.seed,
            mode = ?scenario.mode,
            start_level = scenario.start_level,
            "Scenario started"
        );
        let scenario_run = run_scenario(&scenario, &config, &catalog);

        for anomaly in &scenario_run.anomaly_records {
            tracing::warn!(
                run_id = %run_id,
                scenario = %scenario.name,
                tick = anomaly.tick,
                message = %anomaly.message,
                "Anomaly detected"
            );
        }

        if !scenario_run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += scenario_run.anomaly_records.len();
        *status_counts
            .entry(status_key(scenario_run.result.status))
            .or_insert(0) += 1;

        tracing::info!(
            run_id = %run_id,
            scenario = %scenario.name,
            status = ?scenario_run.result.status,
            score = scenario_run.result.score,
            ticks = scenario_run.result.ticks,
            "Scenario finished"
        );

        println!(
            "{}",
            serde_json::to_string(&scenario_run.result).context("failed to encode scenario result")?
        );
        scenario_results.push(scenario_run.result);
    }

    let summary = build_run_summary(
        run_id.clone(),
        run_started_at_ms,
        now_ms(),
        scenario_results,
        status_counts,
        total_anomalies,
    );

    if let Some(path) = cli.summary_out.as_ref() {
        write_summary(path, &summary)
            .with_context(|| format!("failed to write summary to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Summary written");
    }

    tracing::info!(
        run_id = %run_id,
        scenarios = summary.scenario_count,
        anomalies = summary.anomaly_count,
        average_score = summary.average_score,
        "Run finished"
    );

    if has_anomaly {
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_scenario(scenario: &Scenario, config: &GameConfig, catalog: &LevelCatalog) -> ScenarioRunResult {
    let mut engine = GameEngine::new(
        config.clone(),
        catalog.clone(),
        GameEngineOptions {
            mode: scenario.mode,
            start_level: scenario.start_level,
            seed: Some(scenario.seed),
            player_name: format!("BOT-{}", scenario.name.to_uppercase()),
        },
    );

    let mut result = ScenarioResultLine {
        scenario: scenario.name.clone(),
        seed: scenario.seed,
        mode: scenario.mode,
        status: SessionStatus::Playing,
        reached_level: engine.level(),
        endless_round: 0,
        score: 0,
        ticks: 0,
        duration_ms: 0,
        pellets_eaten: 0,
        power_pellets_eaten: 0,
        ghosts_eaten: 0,
        deaths: 0,
        levels_cleared: 0,
        bonuses_collected: 0,
        anomalies: Vec::new(),
    };
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();
    let mut watch = Watch {
        score: engine.score(),
        lives: engine.lives(),
        collectibles: engine.world.remaining_collectibles(),
        level: engine.level(),
    };

    while !engine.is_ended() {
        if engine.tick() >= scenario.max_ticks {
            push_anomaly(
                &mut result.anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                engine.tick(),
                "tick safety limit exceeded".to_string(),
            );
            break;
        }

        let dir = engine.autopilot_direction();
        engine.set_direction(dir);
        let dt_ms = engine.tick_interval_ms();
        engine.step(dt_ms);
        let snapshot = engine.build_snapshot(true);

        let bounds = (engine.world.width, engine.world.height);
        for message in collect_snapshot_anomalies(&snapshot, bounds, watch) {
            push_anomaly(
                &mut result.anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                message,
            );
        }

        for event in &snapshot.events {
            match event {
                RuntimeEvent::PelletEaten { .. } => result.pellets_eaten += 1,
                RuntimeEvent::PowerPelletEaten { .. } => result.power_pellets_eaten += 1,
                RuntimeEvent::GhostEaten { .. } => result.ghosts_eaten += 1,
                RuntimeEvent::PlayerDied { .. } => result.deaths += 1,
                RuntimeEvent::LevelCleared { .. } => result.levels_cleared += 1,
                RuntimeEvent::BonusCollected { .. } => result.bonuses_collected += 1,
                _ => {}
            }
        }

        watch = Watch {
            score: snapshot.player.score,
            lives: snapshot.player.lives,
            collectibles: snapshot.collectibles.len(),
            level: snapshot.level,
        };
    }

    result.status = engine.status();
    result.reached_level = engine.level();
    result.endless_round = engine.endless_round();
    result.score = engine.score();
    result.ticks = engine.tick();
    result.duration_ms = engine.elapsed_ms();

    ScenarioRunResult {
        result,
        anomaly_records,
    }
}

fn collect_snapshot_anomalies(snapshot: &Snapshot, bounds: (i32, i32), previous: Watch) -> Vec<String> {
    let (width, height) = bounds;
    let mut anomalies = Vec::new();
    if snapshot.player.score < previous.score {
        anomalies.push(format!(
            "score decreased: {} -> {}",
            previous.score, snapshot.player.score
        ));
    }

    let extra_life = snapshot.events.iter().any(|event| {
        matches!(
            event,
            RuntimeEvent::BonusCollected {
                effect: BonusEffect::ExtraLife
            }
        )
    });
    if snapshot.player.lives > previous.lives && !extra_life {
        anomalies.push(format!(
            "lives increased without bonus: {} -> {}",
            previous.lives, snapshot.player.lives
        ));
    }

    let same_level = snapshot.level == previous.level
        && !snapshot
            .events
            .iter()
            .any(|event| matches!(event, RuntimeEvent::LevelStarted { .. }));
    if same_level && snapshot.collectibles.len() > previous.collectibles {
        anomalies.push(format!(
            "collectibles reappeared: {} -> {}",
            previous.collectibles,
            snapshot.collectibles.len()
        ));
    }

    let in_bounds = |x: i32, y: i32| (0..width).contains(&x) && (0..height).contains(&y);
    if !in_bounds(snapshot.player.x, snapshot.player.y) {
        anomalies.push(format!(
            "player out of bounds: ({}, {})",
            snapshot.player.x, snapshot.player.y
        ));
    }
    for ghost in &snapshot.ghosts {
        if !in_bounds(ghost.x, ghost.y) {
            anomalies.push(format!(
                "ghost out of bounds: {} at ({}, {})",
                ghost.id, ghost.x, ghost.y
            ));
        }
    }
    anomalies
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = cli.seed.unwrap_or_else(now_ms);
    let max_ticks = cli.max_ticks.unwrap_or(DEFAULT_MAX_TICKS).max(1);
    let mode = cli
        .mode
        .as_deref()
        .and_then(GameMode::parse)
        .unwrap_or(GameMode::Story);

    if cli.single || cli.mode.is_some() || cli.level.is_some() {
        return vec![Scenario {
            name: format!("custom-{}", status_key_for_mode(mode)),
            mode,
            start_level: cli.level.unwrap_or(1).max(1),
            seed,
            max_ticks,
        }];
    }

    vec![
        Scenario {
            name: "story-run".to_string(),
            mode: GameMode::Story,
            start_level: 1,
            seed,
            max_ticks,
        },
        Scenario {
            name: "endless-run".to_string(),
            mode: GameMode::Endless,
            start_level: 1,
            seed: seed.wrapping_add(1),
            max_ticks,
        },
    ]
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_run_id(seed: u64, timestamp_ms: u64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn build_run_summary(
    run_id: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    scenarios: Vec<ScenarioResultLine>,
    status_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
) -> RunSummary {
    let scenario_count = scenarios.len();
    let total_score: u64 = scenarios.iter().map(|scenario| scenario.score as u64).sum();
    let average_score = if scenario_count == 0 {
        0
    } else {
        (total_score / scenario_count as u64) as u32
    };
    RunSummary {
        run_id,
        started_at_ms,
        finished_at_ms,
        scenario_count,
        anomaly_count,
        average_score,
        status_counts,
        scenarios,
    }
}

fn status_key(status: SessionStatus) -> String {
    match status {
        SessionStatus::Playing => "playing",
        SessionStatus::GameOver => "game_over",
        SessionStatus::Completed => "completed",
    }
    .to_string()
}

fn status_key_for_mode(mode: GameMode) -> &'static str {
    match mode {
        GameMode::Story => "story",
        GameMode::Endless => "endless",
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn write_summary(path: &Path, summary: &RunSummary) -> anyhow::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, summary_text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacman_arcade::types::PlayerView;

    fn make_scenario_result(status: SessionStatus, score: u32) -> ScenarioResultLine {
        ScenarioResultLine {
            scenario: "test".to_string(),
            seed: 42,
            mode: GameMode::Story,
            status,
            reached_level: 1,
            endless_round: 0,
            score,
            ticks: 100,
            duration_ms: 20_000,
            pellets_eaten: 0,
            power_pellets_eaten: 0,
            ghosts_eaten: 0,
            deaths: 0,
            levels_cleared: 0,
            bonuses_collected: 0,
            anomalies: Vec::new(),
        }
    }

    fn snapshot_with(score: u32, lives: u32, x: i32) -> Snapshot {
        Snapshot {
            tick: 5,
            now_ms: 1_000,
            tick_interval_ms: 200,
            mode: GameMode::Story,
            level: 1,
            endless_round: 0,
            status: SessionStatus::Playing,
            message: String::new(),
            player: PlayerView {
                name: "BOT".to_string(),
                x,
                y: 1,
                dir: Default::default(),
                lives,
                score,
            },
            ghosts: Vec::new(),
            collectibles: Vec::new(),
            bonus: None,
            power_until: None,
            slow_until: None,
            events: Vec::new(),
        }
    }

    #[test]
    fn default_run_id_contains_seed_and_timestamp() {
        assert_eq!(default_run_id(42, 123456789), "sim-42-123456789");
    }

    #[test]
    fn build_run_summary_calculates_average_score() {
        let summary = build_run_summary(
            "sim-42-1".to_string(),
            1,
            2,
            vec![
                make_scenario_result(SessionStatus::GameOver, 1_000),
                make_scenario_result(SessionStatus::Completed, 3_000),
            ],
            BTreeMap::from([
                ("game_over".to_string(), 1usize),
                ("completed".to_string(), 1usize),
            ]),
            1,
        );
        assert_eq!(summary.average_score, 2_000);
        assert_eq!(summary.scenario_count, 2);
    }

    #[test]
    fn write_summary_returns_error_when_parent_does_not_exist() {
        let target = std::env::temp_dir()
            .join(format!(
                "pacman-sim-missing-{}-{}",
                std::process::id(),
                rand::random::<u64>()
            ))
            .join("summary.json");
        let summary = build_run_summary(
            "sim-1-1".to_string(),
            1,
            2,
            vec![make_scenario_result(SessionStatus::GameOver, 0)],
            BTreeMap::from([("game_over".to_string(), 1usize)]),
            0,
        );
        assert!(write_summary(&target, &summary).is_err());
    }

    #[test]
    fn anomalies_flag_score_drops_unexplained_lives_and_bounds() {
        let previous = Watch {
            score: 100,
            lives: 2,
            collectibles: 0,
            level: 1,
        };
        let anomalies = collect_snapshot_anomalies(&snapshot_with(90, 3, 40), (19, 21), previous);
        assert_eq!(anomalies.len(), 3);

        let clean = collect_snapshot_anomalies(&snapshot_with(110, 2, 3), (19, 21), previous);
        assert!(clean.is_empty());
    }

    #[test]
    fn extra_life_bonus_explains_a_life_gain() {
        let previous = Watch {
            score: 0,
            lives: 2,
            collectibles: 0,
            level: 1,
        };
        let mut snapshot = snapshot_with(0, 3, 3);
        snapshot.events.push(RuntimeEvent::BonusCollected {
            effect: BonusEffect::ExtraLife,
        });
        assert!(collect_snapshot_anomalies(&snapshot, (19, 21), previous).is_empty());
    }

    #[test]
    fn autopilot_scenario_finishes_without_anomalies() {
        let catalog = LevelCatalog::from_layouts(&[&["WWWWWWW", "WP...OW", "WWWWWWW"]]);
        let scenario = Scenario {
            name: "tiny".to_string(),
            mode: GameMode::Story,
            start_level: 1,
            seed: 9,
            max_ticks: 100,
        };
        let run = run_scenario(&scenario, &GameConfig::default(), &catalog);
        assert_eq!(run.result.status, SessionStatus::Completed);
        assert_eq!(run.result.pellets_eaten, 3);
        assert_eq!(run.result.power_pellets_eaten, 1);
        assert!(run.result.anomalies.is_empty());
    }

    #[test]
    fn push_anomaly_keeps_records_and_deduplicates_summary_messages() {
        let mut anomalies = Vec::new();
        let mut records = Vec::new();
        let mut seen = HashSet::new();
        push_anomaly(&mut anomalies, &mut records, &mut seen, 10, "same".to_string());
        push_anomaly(&mut anomalies, &mut records, &mut seen, 11, "same".to_string());

        assert_eq!(anomalies.len(), 1);
        assert_eq!(records.len(), 2);
    }
}
