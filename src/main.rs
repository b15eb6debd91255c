use anyhow::{bail, Context, Result};
use gazeshift_lib::config::{load_settings, AppSettings};
use gazeshift_lib::context::GazeContext;
use serde::Deserialize;
use std::io::{BufRead, BufWriter, Write};
use std::path::PathBuf;

/// One line of the replay stream.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ReplayEvent {
    Gaze { coordinates: Vec<f32> },
    Calibrate { target: [f64; 2] },
    Reset,
    DebugWindow { enabled: bool },
    Save { directory: PathBuf },
}

struct Args {
    settings: Option<PathBuf>,
    data_dir: Option<String>,
    overrides: Vec<(String, f32)>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        settings: None,
        data_dir: None,
        overrides: Vec::new(),
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--settings" => {
                args.settings = Some(iter.next().context("--settings needs a path")?.into());
            }
            "--data-dir" => {
                args.data_dir = Some(iter.next().context("--data-dir needs a path")?);
            }
            "--set" => {
                let pair = iter.next().context("--set needs name=value")?;
                let Some((name, value)) = pair.split_once('=') else {
                    bail!("--set expects name=value, got '{}'", pair);
                };
                let value: f32 = value
                    .parse()
                    .with_context(|| format!("--set {}: '{}' is not a number", name, value))?;
                args.overrides.push((name.to_string(), value));
            }
            other => bail!(
                "unknown argument '{}'\nusage: gazeshift [--settings <file>] [--data-dir <dir>] [--set name=value]...",
                other
            ),
        }
    }
    Ok(args)
}

fn main() -> Result<()> {
    env_logger::init();

    let args = parse_args()?;
    let mut settings = match &args.settings {
        Some(path) => load_settings(path)?,
        None => AppSettings::default(),
    };
    for (name, value) in &args.overrides {
        settings.calibration_mode.set_tunable(name, *value)?;
    }
    if args.data_dir.is_some() {
        settings.persistence.data_directory = args.data_dir;
    }

    let mut context = GazeContext::new(&settings);
    log::info!("Replaying with {} stored samples", context.engine().len());

    let stdin = std::io::stdin();
    let mut out = BufWriter::new(std::io::stdout().lock());
    for (number, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event: ReplayEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                log::warn!("Skipping line {}: {}", number + 1, e);
                continue;
            }
        };
        match event {
            ReplayEvent::Gaze { coordinates } => {
                let position = context.process_gaze(&coordinates);
                serde_json::to_writer(&mut out, &position)?;
                writeln!(out)?;
            }
            ReplayEvent::Calibrate { target } => {
                if !context.calibrate(target[0], target[1]) {
                    log::warn!("Line {}: calibration before any gaze", number + 1);
                }
            }
            ReplayEvent::Reset => {
                context.engine_mut().reset();
                context.reset_smoothing();
            }
            ReplayEvent::DebugWindow { enabled } => {
                context.engine_mut().set_debug_window_enabled(enabled);
            }
            ReplayEvent::Save { directory } => {
                let path = context.engine().save_in_directory(&directory)?;
                log::info!("Saved calibration to {}", path.display());
            }
        }
    }
    out.flush()?;

    context.engine_mut().flush();
    Ok(())
}
