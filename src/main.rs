#![deny(missing_docs)]
#![deny(warnings)]

//! Console front-end for the netstudio streaming engine.
//!
//! `netstudio diag` runs the endpoint smoke checks; `netstudio` starts a
//! training session and follows the live streams until stdin closes or a
//! line is entered.

use std::{
    io::BufRead,
    sync::mpsc,
    thread,
    time::{Duration, Instant},
};

use netstudio::api;
use netstudio::config;
use netstudio::logging;
use netstudio::stream::{NetworkTransportFactory, StreamOrchestrator};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }

    let settings = config::load_or_default()?;
    let base = api::resolve_api_base(settings.api_base.as_deref(), None);

    let mode = std::env::args().nth(1);
    match mode.as_deref() {
        Some("diag") => {
            for line in netstudio::diagnostics::run(&settings, &base) {
                println!("{line}");
            }
            Ok(())
        }
        Some(other) => {
            eprintln!("Unknown command '{other}'; expected 'diag' or no argument.");
            std::process::exit(2);
        }
        None => run_session(&settings, &base),
    }
}

fn run_session(
    settings: &config::DashboardConfig,
    base: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let factory = NetworkTransportFactory;
    let mut orchestrator = StreamOrchestrator::new(settings, base);

    println!("API base: {base}");
    orchestrator.start_session(&factory, Instant::now(), &settings.train)?;
    println!("Session started; press Enter to stop.");

    let stop = stdin_closed_signal();
    let mut shown_status: Vec<String> = Vec::new();
    let mut last_summary = Instant::now();

    loop {
        match stop.recv_timeout(Duration::from_millis(100)) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => {}
        }

        orchestrator.poll(&factory, Instant::now());

        let status = orchestrator.status_lines();
        if status != shown_status {
            for line in &status {
                println!("{line}");
            }
            shown_status = status;
        }

        if last_summary.elapsed() >= Duration::from_secs(2) {
            last_summary = Instant::now();
            if let Some(point) = orchestrator.buffer().last() {
                println!(
                    "step {} | loss {:.4} | acc {:.3} | {} samples | activity {:.2}",
                    point.step,
                    point.loss,
                    point.accuracy,
                    orchestrator.buffer().len(),
                    orchestrator.layer_activity()
                );
            }
        }
    }

    orchestrator.stop_session();
    println!("Session stopped.");
    Ok(())
}

/// Signal once when a line arrives on stdin or stdin closes.
fn stdin_closed_signal() -> mpsc::Receiver<()> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut line = String::new();
        let _ = std::io::stdin().lock().read_line(&mut line);
        let _ = tx.send(());
    });
    rx
}
