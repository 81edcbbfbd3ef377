//! Trigger Lab - Main Entry Point
//!
//! Terminal console over the simulation engine. `--demo` runs the scripted
//! sequence once and prints the closing statistics.

mod api;
mod logic;
pub mod constants;

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use api::commands;
use logic::engine::SimEngine;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!(
        "Starting {} v{}...",
        constants::APP_NAME,
        constants::APP_VERSION
    );

    let engine = SimEngine::global();
    engine.init();
    engine.start_monitor();

    if std::env::args().any(|a| a == "--demo") {
        run_demo(&engine).await;
    } else {
        run_console(&engine).await;
    }

    engine.shutdown();
}

/// Unattended run: demo script to completion, statistics to stdout.
async fn run_demo(engine: &Arc<SimEngine>) {
    if commands::start_demo(engine).await.is_err() {
        return;
    }

    // five scripted steps plus slack for the spawned operations to land
    let step = constants::demo_step_secs();
    tokio::time::sleep(Duration::from_secs(step * 5 + 10)).await;

    print_json(commands::get_statistics(engine).await);
}

async fn run_console(engine: &Arc<SimEngine>) {
    println!(
        "{} v{} - trigger console",
        constants::APP_NAME,
        constants::APP_VERSION
    );
    println!("type 'help' for the command list, 'quit' to exit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        if stdout.write_all(b"> ").await.is_err() {
            break;
        }
        let _ = stdout.flush().await;

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            _ => break,
        };
        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else {
            continue;
        };

        match keyword {
            "help" => print_help(),
            "quit" | "exit" => break,

            // inspection
            "status" => print_json(commands::get_system_status(engine).await),
            "stats" => print_json(commands::get_statistics(engine).await),
            "settings" => print_json(commands::get_settings(engine).await),
            "data" => {
                print_json(commands::get_data_points(engine, parse_limit(parts.next())).await)
            }
            "predictions" => {
                print_json(commands::get_predictions(engine, parse_limit(parts.next())).await)
            }
            "log" => print_activity(engine, parse_limit(parts.next())).await,

            // collection
            "timed" => print_json(commands::toggle_timed_collection(engine).await),
            "auto" => print_json(commands::toggle_scheduled_sweeps(engine).await),
            "action" => report(commands::trigger_user_action(engine).await),
            "change" => report(commands::trigger_data_change(engine).await),
            "sysevent" => report(commands::trigger_system_event(engine).await),
            "check" => print_json(commands::check_threshold(engine).await),
            "rise" => print_json(commands::simulate_value_increase(engine).await),
            "collect" => {
                let engine = Arc::clone(engine);
                tokio::spawn(async move {
                    let _ = commands::trigger_collection_sweep(&engine).await;
                });
            }

            // prediction
            "quick" => print_json(commands::execute_prediction(engine).await),
            "volume" => print_json(commands::check_data_count(engine).await),
            "accuracy" => print_json(commands::check_accuracy(engine).await),
            "drop" => print_json(commands::simulate_accuracy_drop(engine).await),
            "schedule" => print_json(commands::schedule_next_prediction(engine).await),
            "predict" => {
                let engine = Arc::clone(engine);
                tokio::spawn(async move {
                    let _ = commands::trigger_prediction(&engine).await;
                });
            }
            "batch" => {
                let engine = Arc::clone(engine);
                tokio::spawn(async move {
                    let _ = commands::trigger_batch_prediction(&engine).await;
                });
            }

            // workflow & demo
            "workflow" => {
                let engine = Arc::clone(engine);
                tokio::spawn(async move {
                    let _ = commands::trigger_workflow(&engine).await;
                });
            }
            "demo" => report(commands::start_demo(engine).await),

            // system
            "set" => match (parts.next(), parts.next()) {
                (Some(key), Some(value)) => {
                    print_json(commands::set_setting(engine, key, value).await)
                }
                _ => println!("usage: set <key> <value>"),
            },
            "clear" => report(commands::clear_log(engine).await),
            "reset" => report(commands::reset_system(engine).await),

            other => println!("unknown command: {other} (try 'help')"),
        }
    }
}

fn parse_limit(arg: Option<&str>) -> Option<usize> {
    arg.and_then(|v| v.parse().ok())
}

fn print_json<T: serde::Serialize>(result: Result<T, String>) {
    match result {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(json) => println!("{json}"),
            Err(e) => println!("serialization error: {e}"),
        },
        Err(e) => println!("error: {e}"),
    }
}

fn report(result: Result<(), String>) {
    match result {
        Ok(()) => println!("ok"),
        Err(e) => println!("error: {e}"),
    }
}

async fn print_activity(engine: &Arc<SimEngine>, limit: Option<usize>) {
    match commands::get_recent_activity(engine, limit).await {
        Ok(lines) => {
            for line in lines {
                println!("[{}] {:>5} {}", line.timestamp, line.level, line.message);
            }
        }
        Err(e) => println!("error: {e}"),
    }
}

fn print_help() {
    println!("collection:");
    println!("  timed                    toggle time-based collection");
    println!("  action|change|sysevent   fire an event trigger");
    println!("  check                    run the threshold check");
    println!("  rise                     simulate a value increase");
    println!("  collect                  run a full collection sweep");
    println!("  auto                     toggle scheduled sweeps");
    println!("prediction:");
    println!("  quick                    quick prediction pass");
    println!("  predict                  phased realtime prediction");
    println!("  batch                    batch prediction run");
    println!("  volume                   run the data volume check");
    println!("  accuracy                 run the accuracy check");
    println!("  drop                     simulate an accuracy drop");
    println!("  schedule                 arm the configured schedule");
    println!("workflow & demo:");
    println!("  workflow                 chained collection then prediction");
    println!("  demo                     run the scripted demo");
    println!("inspection:");
    println!("  status | stats | settings");
    println!("  data [n] | predictions [n] | log [n]");
    println!("system:");
    println!("  set <key> <value>        keys: interval, threshold, value, required,");
    println!("                           accuracy-threshold, accuracy, schedule,");
    println!("                           source, model, batch");
    println!("  clear | reset | quit");
}
