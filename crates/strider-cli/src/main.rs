//! `strider-cli` – Strider Command Line Interface
//!
//! Runs the velocity smoothing and safety loop against the simulated robot.
//! It:
//!
//! 1. Loads `~/.strider/config.toml`, writing the defaults on first run.
//! 2. Switches vendor obstacle avoidance off.
//! 3. Spawns the controller handler and the 50 Hz postprocessor loop.
//! 4. Reads operator commands from stdin (see [`commands`]).
//! 5. Stops the robot and exits on Ctrl-C, `quit`, or end of input.

mod commands;
mod config;

use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::warn;

use strider_hal::{
    ControllerSender, RobotClient, SimObstacleAvoid, SimRobotClient, TimeoutClient,
    controller_channel, disable_obstacle_avoidance,
};
use strider_runtime::{
    ActionSender, ControllerHandler, EstopLatch, PostprocessorLoop, init_tracing,
};
use strider_types::StriderError;

use crate::commands::Flow;
use crate::config::Config;

/// Controller frames buffered between stdin and the handler.
const CONTROLLER_QUEUE: usize = 16;

fn main() {
    print_banner();
    let cfg = load_config();

    // The CLI's user-facing output uses println!; the loop logs via tracing.
    let telemetry = init_tracing("strider", cfg.log_filter());
    if telemetry.is_exporting() {
        println!("  Exporting spans over OTLP");
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            println!("{}: {}", "Failed to start runtime".red(), e);
            drop(telemetry);
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(run(cfg));
    // The stdin reader sits on a blocking thread that never returns on its own.
    runtime.shutdown_timeout(Duration::from_millis(200));

    if let Err(e) = result {
        println!("{}: {}", "Fatal".red().bold(), e);
        drop(telemetry);
        std::process::exit(1);
    }
}

fn load_config() -> Config {
    match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            let cfg = config::defaults_with_env();
            match config::save(&Config::default()) {
                Ok(()) => println!(
                    "  Wrote default config to {}",
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Config error".red(), e),
            }
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::defaults_with_env()
        }
    }
}

async fn run(cfg: Config) -> Result<(), StriderError> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);
    install_ctrlc(Arc::clone(&shutdown_tx));

    let robot = Arc::new(TimeoutClient::new(SimRobotClient::new(), cfg.client.timeout()));
    let client: Arc<dyn RobotClient> = robot.clone();

    if cfg.client.disable_obstacle_avoidance {
        println!("  Disabling obstacle avoidance …");
        let avoid = SimObstacleAvoid::new(true);
        if !disable_obstacle_avoidance(&avoid, cfg.client.obstacle_settle()).await {
            println!("  {}", "Obstacle avoidance may still be on.".yellow());
        }
    }

    let latch = EstopLatch::new();
    let (controller, subscription, handle) = controller_channel(CONTROLLER_QUEUE);
    let (postprocessor, actions) = PostprocessorLoop::new(
        cfg.postprocessor.clone(),
        cfg.profile.clone(),
        Arc::clone(&client),
        latch.clone(),
    )?;
    let postprocessor = postprocessor.with_subscription(handle);
    let handler = ControllerHandler::new(
        cfg.safety.clone(),
        latch.clone(),
        Arc::clone(&client),
        postprocessor.state_receiver(),
    );

    let handler_task = tokio::spawn(handler.run(subscription));
    let loop_task = tokio::spawn(postprocessor.run(shutdown_rx.clone()));

    println!(
        "\n  {} at {} Hz. Type {} for a list of commands.\n",
        "Running".green().bold(),
        1000 / cfg.postprocessor.tick_ms.max(1),
        "help".bold().cyan()
    );
    read_commands(&actions, &controller, shutdown_rx).await;
    shutdown_tx.send_replace(true);

    let ticks = loop_task
        .await
        .map_err(|e| StriderError::Channel(format!("postprocessor task failed: {e}")))?;
    let frames = handler_task
        .await
        .map_err(|e| StriderError::Channel(format!("controller task failed: {e}")))?;

    if let Err(e) = client.stop_move().await.into_result("stop_move") {
        warn!(error = %e, "final stop failed");
    }

    println!(
        "  {} after {} ticks, {} controller frames, {} robot commands{}",
        "Stopped".green(),
        ticks,
        frames,
        robot.inner().commands().len(),
        if latch.is_set() { " (emergency stop latched)" } else { "" }
    );
    Ok(())
}

/// Feed stdin lines to the loop until `quit`, end of input, or shutdown.
async fn read_commands(
    actions: &ActionSender,
    controller: &ControllerSender,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let flow = match commands::parse(&line) {
                        Ok(Some(command)) => commands::apply(command, actions, controller).await,
                        Ok(None) => Ok(Flow::Continue),
                        Err(e) => Err(e),
                    };
                    match flow {
                        Ok(Flow::Continue) => {}
                        Ok(Flow::Exit) => break,
                        Err(e) => println!("  {}: {}", "Error".red(), e),
                    }
                }
                Ok(None) => {
                    println!("  {}", "End of input – shutting down.".yellow());
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "stdin read failed");
                    break;
                }
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

fn install_ctrlc(shutdown: Arc<watch::Sender<bool>>) {
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping the robot …".yellow().bold());
        shutdown.send_replace(true);
    }) {
        warn!(
            error = %e,
            "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available"
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   _____ __       _     __         "#.bold().cyan());
    println!("{}", r#"  / ___// /______(_)___/ /__  _____"#.bold().cyan());
    println!("{}", r#"  \__ \/ __/ ___/ / __  / _ \/ ___/"#.bold().cyan());
    println!("{}", r#" ___/ / /_/ /  / / /_/ /  __/ /    "#.bold().cyan());
    println!("{}", r#"/____/\__/_/  /_/\__,_/\___/_/     "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "Strider".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Velocity smoothing and safety loop");
    println!();
}
