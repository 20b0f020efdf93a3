use std::io::Write;
use std::sync::Arc;

use breathroom_core::stats::effective_goal;
use breathroom_core::storage::{ConfigFile, LayoutKind, SettingsProvider};
use breathroom_core::timer::Clock;
use breathroom_core::{
    format_duration, readout, ClockSignal, Config, Database, Event, Phase, ReadinessGate, Readout,
    SessionController, StartMode, SystemClock,
};
use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Args)]
pub struct SessionArgs {
    /// Wait for Enter before each later phase starts
    #[arg(long, conflicts_with = "auto")]
    manual: bool,
    /// Start each later phase as soon as the previous one stops
    #[arg(long)]
    auto: bool,
    /// Time three phases instead of two
    #[arg(long)]
    three: bool,
    /// Print events as JSON lines instead of the live readout
    #[arg(long)]
    json: bool,
}

impl SessionArgs {
    fn apply(&self, mut config: Config) -> Config {
        if self.manual {
            config.timer.start_mode = StartMode::Manual;
        }
        if self.auto {
            config.timer.start_mode = StartMode::Auto;
        }
        if self.three {
            config.timer.layout = LayoutKind::Three;
        }
        config
    }
}

pub fn run(args: SessionArgs) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(drive(args));
    // A pending stdin read would otherwise hold the runtime open.
    runtime.shutdown_background();
    result
}

async fn drive(args: SessionArgs) -> Result<(), Box<dyn std::error::Error>> {
    let settings = ConfigFile::default_location()?;
    let mut config = args.apply(settings.snapshot());
    let mut controller = SessionController::new(Database::open()?, &config)?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let (gate, mut signals) = ReadinessGate::new(config.gate.clone()).spawn(Arc::clone(&clock));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let mut view = View::new(args.json);
    let mut goal = {
        let signal = *signals.borrow();
        effective_goal(&config, &controller.today(&signal))
    };
    view.notice("warming up... Enter advances, q quits");

    loop {
        let ready = signals.borrow().ready;
        tokio::select! {
            changed = signals.changed() => {
                if changed.is_err() {
                    break;
                }
                let signal = *signals.borrow_and_update();
                if let Some(event) = controller.on_tick(&signal, &config) {
                    view.event(&event, &config);
                }
                view.render(&readout(controller.machine(), &signal, &config, goal));
            }
            line = lines.next_line(), if ready => {
                let Some(line) = line? else { break };
                if line.trim() == "q" {
                    break;
                }
                config = args.apply(settings.snapshot());
                // Taps are stamped when read, not at the last gate tick.
                let signal = ClockSignal::new(clock.now(), signals.borrow().ready);
                match controller.tap_primary(&signal, &config) {
                    Ok(Some(event)) => {
                        view.event(&event, &config);
                        if matches!(event, Event::SessionSaved { .. }) {
                            goal = effective_goal(&config, &controller.today(&signal));
                        }
                    }
                    Ok(None) => {}
                    Err(e) => view.notice(&format!("could not save session: {e}")),
                }
            }
        }
    }

    gate.stop().await;
    view.finish();
    Ok(())
}

/// Terminal rendering of readouts and events.
struct View {
    json: bool,
    last_frame: Option<String>,
}

impl View {
    fn new(json: bool) -> Self {
        Self {
            json,
            last_frame: None,
        }
    }

    fn render(&mut self, frame: &Readout) {
        if self.json {
            return;
        }
        let hint = match frame.phase {
            _ if !frame.ready => "warming up",
            Phase::Idle => "[Enter] start",
            Phase::Waiting(_) => "[Enter] start next",
            Phase::Running(_) => "[Enter] stop",
        };
        let label = frame.label.as_deref().unwrap_or("ready");
        let text = match frame.highlight {
            Some(color) => format!("\x1b[38;5;{}m{}\x1b[0m", color.ansi_code(), frame.text),
            None => frame.text.clone(),
        };
        let line = format!("{label:>9}  {text}   {hint}");
        if self.last_frame.as_deref() == Some(line.as_str()) {
            return;
        }
        let mut out = std::io::stdout();
        let _ = write!(out, "\r\x1b[2K{line}");
        let _ = out.flush();
        self.last_frame = Some(line);
    }

    fn event(&mut self, event: &Event, config: &Config) {
        if self.json {
            match serde_json::to_string(event) {
                Ok(json) => println!("{json}"),
                Err(e) => tracing::warn!(error = %e, "could not encode event"),
            }
            return;
        }
        let labels = config.labels();
        let label = |k: usize| labels.get(k).cloned().unwrap_or_else(|| format!("record{}", k + 1));
        let style = config.display.style;
        let message = match event {
            Event::PhaseCompleted { index, seconds, .. } => {
                format!("{}: {}", label(*index), format_duration(*seconds, style))
            }
            Event::Announcement { index, seconds, .. } => {
                format!("{} {}", label(*index), format_duration(*seconds as f64, style))
            }
            Event::SessionSaved { id, session, .. } => {
                let last = session.phase_seconds.len().saturating_sub(1);
                let final_phase = session
                    .phase_seconds
                    .last()
                    .map(|s| format_duration(*s, style))
                    .unwrap_or_default();
                format!("{}: {}  (saved #{id})", label(last), final_phase)
            }
            Event::SessionCompleted { .. } | Event::SessionStarted { .. } | Event::PhaseStarted { .. } => {
                return;
            }
        };
        self.notice(&message);
    }

    fn notice(&mut self, message: &str) {
        if self.json {
            eprintln!("{message}");
            return;
        }
        println!("\r\x1b[2K{message}");
        self.last_frame = None;
    }

    fn finish(&mut self) {
        if !self.json && self.last_frame.is_some() {
            println!();
        }
    }
}
