use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use engine::{FrameEvent, HeadlessRunner};
use typestrike::config::RoundConfig;
use typestrike::events::{ObserverList, RoundEvent, RoundObserver, StatusCode};
use typestrike::logging::init_logging;
use typestrike::playtest::{AutoPlayer, Script, TypingLogic};

#[derive(Debug, Parser)]
#[command(name = "typestrike")]
#[command(about = "Headless runner for the typing-challenge round engine")]
struct Cli {
    /// Round config (JSON). Falls back to TYPESTRIKE_CONFIG, then defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct RunOpts {
    #[arg(long, default_value_t = 1)]
    seed: u64,
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,
    /// Print events as JSON lines.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Replay a JSON input script.
    Run {
        #[arg(long)]
        script: PathBuf,
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Let the built-in bot play a round.
    Autoplay {
        #[arg(long, default_value_t = 60.0)]
        secs: f32,
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Print the effective configuration.
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = RoundConfig::resolve(cli.config.as_deref()).context("loading round config")?;
    match cli.command {
        Commands::Run { script, opts } => cmd_run(config, &script, &opts),
        Commands::Autoplay { secs, opts } => cmd_autoplay(config, secs, &opts),
        Commands::Config => {
            println!("{}", config.to_json_pretty()?);
            Ok(())
        }
    }
}

fn new_runner(config: RoundConfig, opts: &RunOpts) -> Result<HeadlessRunner<TypingLogic>> {
    let logic = TypingLogic::new(config, opts.seed).context("building round")?;
    let tick = Duration::from_millis(opts.tick_ms.max(1));
    Ok(HeadlessRunner::new(logic, tick).with_history_limit(4096))
}

fn cmd_run(config: RoundConfig, script_path: &Path, opts: &RunOpts) -> Result<()> {
    let text = fs::read_to_string(script_path)
        .with_context(|| format!("reading script {}", script_path.display()))?;
    let script = Script::from_json_str(&text)
        .with_context(|| format!("parsing script {}", script_path.display()))?;

    let mut runner = new_runner(config, opts)?;
    let frames = script.frames(runner.tick(), runner.game().slot_count());
    let (mut observers, tally) = tally_observers();
    for input in frames {
        let produced = runner.step(input);
        print_events(produced, opts.json);
        observers.dispatch(produced.iter().map(|e| &e.event));
    }
    print_summary(&runner, &tally.borrow());
    Ok(())
}

fn cmd_autoplay(config: RoundConfig, secs: f32, opts: &RunOpts) -> Result<()> {
    let mut runner = new_runner(config, opts)?;
    let player = AutoPlayer::default();
    let frames = (secs.max(0.0) / runner.tick().as_secs_f32()).ceil() as usize;
    let (mut observers, tally) = tally_observers();
    for _ in 0..frames {
        let input = player.next_input(runner.state());
        let produced = runner.step(input);
        print_events(produced, opts.json);
        observers.dispatch(produced.iter().map(|e| &e.event));
        if runner.state().clock().is_finished() {
            break;
        }
    }
    print_summary(&runner, &tally.borrow());
    Ok(())
}

fn print_events(events: &[FrameEvent<RoundEvent>], json: bool) {
    for FrameEvent { frame, event } in events {
        if json {
            let line = serde_json::json!({ "frame": frame, "event": event });
            println!("{line}");
        } else {
            println!("[{frame:>6}] {event}");
        }
    }
}

#[derive(Debug, Default)]
struct Tally {
    damage: f32,
    successes: usize,
    failures: usize,
}

struct TallyObserver(Rc<RefCell<Tally>>);

impl RoundObserver for TallyObserver {
    fn on_damage(&mut self, amount: f32) {
        self.0.borrow_mut().damage += amount;
    }

    fn on_status(&mut self, code: StatusCode, _hold_secs: f32) {
        let mut tally = self.0.borrow_mut();
        match code {
            StatusCode::Success => tally.successes += 1,
            StatusCode::Fail => tally.failures += 1,
            _ => {}
        }
    }
}

fn tally_observers() -> (ObserverList, Rc<RefCell<Tally>>) {
    let tally = Rc::new(RefCell::new(Tally::default()));
    let mut list = ObserverList::new();
    list.register(Box::new(TallyObserver(Rc::clone(&tally))));
    (list, tally)
}

fn print_summary(runner: &HeadlessRunner<TypingLogic>, tally: &Tally) {
    let round = runner.state();
    let suppression: Vec<String> = round
        .enemies()
        .units()
        .iter()
        .map(|u| format!("{:.0}%", u.suppression_percent()))
        .collect();
    println!(
        "frame {} time_left {:.2}s successes {} failures {} damage {:.1} flow {:.0} enemies [{}]",
        runner.frame(),
        round.clock().time_left().as_secs_f32(),
        tally.successes,
        tally.failures,
        tally.damage,
        round.gauge().value(),
        suppression.join(", ")
    );
}
