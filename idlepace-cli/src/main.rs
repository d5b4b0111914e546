mod analysis;
mod report;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::Instant;
use uuid::Uuid;

use idlepace_engine::{
    ProgressionEngine, SECONDS_PER_DAY, SimulationConfig, SimulationResult, UpgradePolicy,
    validate,
};

use analysis::RunReport;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PolicyArg {
    /// Upgrade locations strictly in unlock order
    Sequential,
    /// Upgrade the first affordable location each pass
    FirstAvailable,
}

impl From<PolicyArg> for UpgradePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Sequential => Self::Sequential,
            PolicyArg::FirstAvailable => Self::FirstAvailable,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "idlepace", version)]
#[command(about = "Deterministic progression simulator for idle-game economy tuning")]
struct Args {
    /// Load the simulation configuration from a JSON file instead of the
    /// built-in sample tuning
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the base passive income (gold per second at level 1)
    #[arg(long)]
    base_gold: Option<f64>,

    /// Override the income growth coefficient per user level
    #[arg(long)]
    earn_coefficient: Option<f64>,

    /// Starting gold balance
    #[arg(long)]
    starting_gold: Option<f64>,

    /// Starting experience
    #[arg(long)]
    starting_xp: Option<u64>,

    /// Starting keys
    #[arg(long)]
    starting_keys: Option<u64>,

    /// Multiply every upgrade cooldown by this factor
    #[arg(long)]
    cooldown_multiplier: Option<f64>,

    /// Replace the check schedule with N logins spread across the day
    #[arg(long)]
    checks_per_day: Option<usize>,

    /// Seconds of active play per check-in
    #[arg(long)]
    session_secs: Option<u64>,

    /// Upgrade selection policy
    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,

    /// Enable the tap-to-earn mechanic
    #[arg(long)]
    tapping: bool,

    /// Tapping energy gauge capacity
    #[arg(long)]
    max_energy: Option<f64>,

    /// Taps per second while actively tapping
    #[arg(long)]
    tap_speed: Option<f64>,

    /// Gold credited per tap
    #[arg(long)]
    gold_per_tap: Option<f64>,

    /// Abort the run after this many simulated days
    #[arg(long)]
    max_days: Option<u64>,

    /// Run id for reproducible output; a random id is used when omitted
    #[arg(long)]
    run_id: Option<Uuid>,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["console", "json", "markdown", "csv"])]
    report: String,

    /// Write the report to a file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Also write the full run result (history and all) as JSON
    #[arg(long)]
    export: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = build_config(&args)?;
    if let Err(errors) = validate(&config) {
        log::error!("configuration rejected with {} error(s)", errors.len());
        for err in &errors {
            eprintln!("{} {err}", "config error:".red().bold());
        }
        anyhow::bail!("configuration failed validation with {} error(s)", errors.len());
    }

    announce_banner(&args, &config);

    let start_time = Instant::now();
    let engine = ProgressionEngine::new(config);
    let result = match args.run_id {
        Some(id) => engine.simulate_with_id(id),
        None => engine.simulate(),
    };

    report_faults(&result);

    let run_report = RunReport::build(&result);
    write_report(&args, &run_report, start_time)?;

    if let Some(path) = &args.export {
        export_result(path, &result)?;
        eprintln!("💾 Full run exported to {}", path.display());
    }

    if !result.faults.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

/// Assemble the effective configuration: file or sample base, then flag
/// overrides on top.
fn build_config(args: &Args) -> Result<SimulationConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => SimulationConfig::sample(),
    };

    let mut economy_touched = false;
    if let Some(base) = args.base_gold {
        config.economy.base_gold_per_sec = base;
        economy_touched = true;
    }
    if let Some(coef) = args.earn_coefficient {
        config.economy.earn_coefficient = coef;
        economy_touched = true;
    }
    if economy_touched {
        config.rederive_user_income();
    }

    if let Some(gold) = args.starting_gold {
        config.starting_balance.gold = gold;
    }
    if let Some(xp) = args.starting_xp {
        config.starting_balance.xp = xp;
    }
    if let Some(keys) = args.starting_keys {
        config.starting_balance.keys = keys;
    }

    if let Some(multiplier) = args.cooldown_multiplier {
        config.scale_cooldowns(multiplier);
    }
    if let Some(per_day) = args.checks_per_day {
        config.spread_checks(per_day);
    }
    if let Some(secs) = args.session_secs {
        config.session_duration_secs = secs;
    }
    if let Some(policy) = args.policy {
        config.policy = policy.into();
    }

    if args.tapping {
        config.tapping.enabled = true;
    }
    if let Some(capacity) = args.max_energy {
        config.tapping.max_energy_capacity = capacity;
    }
    if let Some(speed) = args.tap_speed {
        config.tapping.tap_speed = speed;
    }
    if let Some(gold) = args.gold_per_tap {
        config.tapping.gold_per_tap = gold;
    }

    if let Some(days) = args.max_days {
        config.max_timestamp = Some(days * SECONDS_PER_DAY);
    }

    Ok(config)
}

fn load_config(path: &Path) -> Result<SimulationConfig> {
    log::debug!("loading configuration from {}", path.display());
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

// Chatter goes to stderr so a machine-readable report on stdout stays
// parseable.
fn announce_banner(args: &Args, config: &SimulationConfig) {
    eprintln!("{}", "⏳ Idlepace Progression Simulator".bright_cyan().bold());
    eprintln!("{}", "=================================".cyan());
    if args.verbose {
        eprintln!(
            "locations={} user-levels={} checks/day={} session={}s policy={} tapping={}",
            config.locations.len(),
            config.user_levels.len(),
            config.check_schedule.len(),
            config.session_duration_secs,
            config.policy,
            if config.tapping.enabled { "on" } else { "off" }
        );
    }
}

fn report_faults(result: &SimulationResult) {
    if result.faults.is_empty() {
        return;
    }
    log::warn!("run {} recorded {} fault(s)", result.id, result.faults.len());
    for fault in &result.faults {
        eprintln!(
            "⚠️  {} t={}: {}",
            "fault".yellow().bold(),
            fault.timestamp,
            fault.message
        );
    }
}

fn write_report(args: &Args, run_report: &RunReport, start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => report::generate_json_report(&mut output_target, run_report)?,
        "markdown" => report::generate_markdown_report(&mut output_target, run_report)?,
        "csv" => report::generate_csv_report(&mut output_target, run_report)?,
        _ => {
            report::generate_console_report(&mut output_target, run_report)?;
            let duration = start_time.elapsed();
            writeln!(&mut output_target)?;
            writeln!(&mut output_target, "🏁 Wall-clock time: {duration:?}")?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

fn export_result(path: &Path, result: &SimulationResult) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, result)?;
    writer.flush()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            config: None,
            base_gold: None,
            earn_coefficient: None,
            starting_gold: None,
            starting_xp: None,
            starting_keys: None,
            cooldown_multiplier: None,
            checks_per_day: None,
            session_secs: None,
            policy: None,
            tapping: false,
            max_energy: None,
            tap_speed: None,
            gold_per_tap: None,
            max_days: None,
            run_id: None,
            report: "console".to_string(),
            output: None,
            export: None,
            verbose: false,
        }
    }

    fn short_run_report() -> RunReport {
        let mut cfg = SimulationConfig::sample();
        cfg.locations.retain(|&id, _| id == 1);
        cfg.locations
            .values_mut()
            .for_each(|loc| loc.levels.retain(|&level, _| level <= 2));
        let result = ProgressionEngine::new(cfg).simulate_with_id(Uuid::nil());
        RunReport::build(&result)
    }

    #[test]
    fn build_config_defaults_to_sample() {
        let config = build_config(&base_args()).unwrap();
        assert_eq!(config, SimulationConfig::sample());
    }

    #[test]
    fn build_config_applies_economy_overrides() {
        let args = Args {
            base_gold: Some(1.0),
            earn_coefficient: Some(1.2),
            ..base_args()
        };
        let config = build_config(&args).unwrap();
        assert!((config.economy.base_gold_per_sec - 1.0).abs() < f64::EPSILON);
        // The user-level income table follows the new economy parameters.
        assert!((config.user_levels[&1].gold_per_sec - 1.0).abs() < f64::EPSILON);
        assert!((config.user_levels[&2].gold_per_sec - 1.2).abs() < 1e-12);
    }

    #[test]
    fn build_config_applies_schedule_and_tapping() {
        let args = Args {
            checks_per_day: Some(2),
            session_secs: Some(600),
            tapping: true,
            max_energy: Some(900.0),
            max_days: Some(30),
            policy: Some(PolicyArg::FirstAvailable),
            ..base_args()
        };
        let config = build_config(&args).unwrap();
        assert_eq!(config.check_schedule.len(), 2);
        assert_eq!(config.session_duration_secs, 600);
        assert!(config.tapping.enabled);
        assert!((config.tapping.max_energy_capacity - 900.0).abs() < f64::EPSILON);
        assert_eq!(config.max_timestamp, Some(30 * SECONDS_PER_DAY));
        assert_eq!(config.policy, UpgradePolicy::FirstAvailable);
    }

    #[test]
    fn build_config_scales_cooldowns() {
        let args = Args {
            cooldown_multiplier: Some(2.0),
            ..base_args()
        };
        let config = build_config(&args).unwrap();
        assert_eq!(config.location_cooldowns[&1], 20);
        assert_eq!(config.location_cooldowns[&20], 28_800);
    }

    #[test]
    fn build_config_loads_json_file() {
        let path = std::env::temp_dir().join("idlepace-config.json");
        let mut config = SimulationConfig::sample();
        config.starting_balance.gold = 5_000.0;
        std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();

        let args = Args {
            config: Some(path),
            ..base_args()
        };
        let loaded = build_config(&args).unwrap();
        assert!((loaded.starting_balance.gold - 5_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn build_config_rejects_bad_json() {
        let path = std::env::temp_dir().join("idlepace-bad-config.json");
        std::fs::write(&path, "{not json").unwrap();
        let args = Args {
            config: Some(path),
            ..base_args()
        };
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn write_report_emits_json_to_file() {
        let temp = std::env::temp_dir().join("idlepace-report.json");
        let args = Args {
            report: "json".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_report(&args, &short_run_report(), Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert!(value["summary"]["total_upgrades"].as_u64().unwrap() > 0);
    }

    #[test]
    fn write_report_emits_markdown_to_file() {
        let temp = std::env::temp_dir().join("idlepace-report.md");
        let args = Args {
            report: "markdown".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_report(&args, &short_run_report(), Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("# Progression Run Report"));
    }

    #[test]
    fn write_report_emits_csv_to_file() {
        let temp = std::env::temp_dir().join("idlepace-report.csv");
        let args = Args {
            report: "csv".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_report(&args, &short_run_report(), Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.starts_with("day,gold_start"));
    }

    #[test]
    fn export_writes_full_result() {
        let mut cfg = SimulationConfig::sample();
        cfg.locations.retain(|&id, _| id == 1);
        cfg.locations
            .values_mut()
            .for_each(|loc| loc.levels.retain(|&level, _| level == 1));
        let result = ProgressionEngine::new(cfg).simulate_with_id(Uuid::nil());

        let temp = std::env::temp_dir().join("idlepace-export.json");
        export_result(&temp, &result).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        let back: SimulationResult = serde_json::from_str(&content).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn output_target_stdout_writes() {
        let mut target = OutputTarget::new(None).unwrap();
        target.write_all(b"ok").unwrap();
        target.flush().unwrap();
    }
}
