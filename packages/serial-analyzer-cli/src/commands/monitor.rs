use crate::cli::MonitorArgs;
use crate::exit_codes;
use crate::output::{self, SampleLog};
use serde::Serialize;
use serial_analyzer::{
    build_analyzer, AnalyzerSpec, DynAnalyzer, MonitorConfig, ReducerKind, SerialReader,
    SourceConfig,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Serialize)]
struct AnalyzerSummary {
    name: String,
    radius: usize,
    output: String,
    lines_written: u64,
    dropped_samples: u64,
}

#[derive(Serialize)]
struct MonitorSummary {
    source: String,
    elapsed_secs: f64,
    reader_active: bool,
    frames_read: u64,
    records_published: u64,
    raw_output: String,
    raw_lines_written: u64,
    analyzers: Vec<AnalyzerSummary>,
}

enum StopReason {
    Interrupted,
    DurationElapsed,
    SourceInactive,
}

struct Attached {
    analyzer: DynAnalyzer,
    log: SampleLog,
}

/// Assemble the monitor configuration from a config file or the command line
fn build_config(args: &MonitorArgs) -> Result<MonitorConfig, String> {
    let mut config = match &args.config {
        Some(path) => MonitorConfig::from_file(path)
            .map_err(|e| format!("Invalid config '{}': {}", path.display(), e))?,
        None => {
            let source = match (&args.port, &args.file) {
                (Some(port), None) => SourceConfig::SerialPort {
                    port: port.clone(),
                    baud_rate: args.baud,
                    frame_size: args.frame_size,
                    data_bits: None,
                    stop_bits: None,
                    read_timeout_ms: None,
                },
                (None, Some(path)) => SourceConfig::FileStream {
                    path: path.clone(),
                    frame_size: args.frame_size,
                    rate_limit_ms: args.rate_limit_ms,
                    loop_playback: args.loop_playback,
                },
                _ => return Err("Either --port, --file or --config is required".to_string()),
            };

            let mut analyzers: Vec<AnalyzerSpec> = args
                .median
                .iter()
                .map(|&radius| AnalyzerSpec {
                    kind: ReducerKind::Median,
                    radius,
                    output: None,
                })
                .chain(args.mean.iter().map(|&radius| AnalyzerSpec {
                    kind: ReducerKind::Mean,
                    radius,
                    output: None,
                }))
                .collect();
            if analyzers.is_empty() {
                analyzers = MonitorConfig::default().analyzers;
            }

            MonitorConfig {
                source,
                analyzers,
                ..MonitorConfig::default()
            }
        }
    };

    if let Some(interval) = args.interval_ms {
        config.poll_interval_ms = interval;
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if args.duration.is_some() {
        config.duration_secs = args.duration;
    }

    config.validate().map_err(|e| e.to_string())?;
    if config.analyzers.is_empty() {
        return Err("At least one analyzer is required".to_string());
    }
    Ok(config)
}

/// Drop reader handles off the async runtime.
///
/// Dropping the last handle joins the reader threads, which may sit in a
/// blocking read for up to the source's read timeout.
async fn release<T: Send + 'static>(handles: T) {
    if let Err(e) = tokio::task::spawn_blocking(move || drop(handles)).await {
        log::error!("Reader shutdown failed: {}", e);
    }
}

/// Drain the latest values of every analyzer into their logs
fn poll(attached: &mut [Attached], raw_log: &mut SampleLog) -> Result<(), String> {
    // every analyzer sees the same stream, so the first one speaks for the raw data
    if let Some(first) = attached.first() {
        match first.analyzer.raw_data().available() {
            Some(raw) => raw_log.append(raw)?,
            None => log::debug!("Raw data from {} not available", first.analyzer.name()),
        }
    }

    for entry in attached.iter_mut() {
        match entry.analyzer.processed_data().available() {
            Some(processed) => entry.log.append(processed)?,
            None => log::debug!("{} output not available", entry.analyzer.name()),
        }
    }
    Ok(())
}

pub async fn execute(args: MonitorArgs) -> i32 {
    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::INPUT_ERROR;
        }
    };

    if let Err(e) = std::fs::create_dir_all(&config.output_dir) {
        eprintln!(
            "Error: Failed to create output directory '{}': {}",
            config.output_dir.display(),
            e
        );
        return exit_codes::EXECUTION_ERROR;
    }

    let reader = match SerialReader::open(&config.source) {
        Ok(reader) => reader,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::SOURCE_ERROR;
        }
    };
    let source = reader.description().to_string();

    let mut raw_log = match SampleLog::create(&config.raw_output_path()) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("Error: {}", e);
            release(reader).await;
            return exit_codes::EXECUTION_ERROR;
        }
    };

    let mut attached = Vec::with_capacity(config.analyzers.len());
    for (index, spec) in config.analyzers.iter().enumerate() {
        let log = match SampleLog::create(&config.output_path(index)) {
            Ok(log) => log,
            Err(e) => {
                eprintln!("Error: {}", e);
                release((attached, reader)).await;
                return exit_codes::EXECUTION_ERROR;
            }
        };
        let analyzer = build_analyzer(spec.kind, Arc::clone(&reader), spec.radius);
        attached.push(Attached { analyzer, log });
    }
    // the analyzers keep the reader alive from here on
    drop(reader);

    if !args.quiet {
        eprintln!(
            "Monitoring {} with {} analyzer(s), polling every {} ms",
            source,
            attached.len(),
            config.poll_interval_ms
        );
    }

    let started = Instant::now();
    let deadline = config
        .duration_secs
        .map(|secs| started + Duration::from_secs(secs));
    let mut ticker = tokio::time::interval(Duration::from_millis(config.poll_interval_ms));

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let reason = loop {
        tokio::select! {
            _ = &mut ctrl_c => break StopReason::Interrupted,
            _ = ticker.tick() => {}
        }

        if let Err(e) = poll(&mut attached, &mut raw_log) {
            eprintln!("Error: {}", e);
            release(attached).await;
            return exit_codes::EXECUTION_ERROR;
        }

        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            break StopReason::DurationElapsed;
        }
        if !attached[0].analyzer.reader().is_active() {
            break StopReason::SourceInactive;
        }
    };

    match reason {
        StopReason::Interrupted => log::info!("Interrupted, shutting down"),
        StopReason::DurationElapsed => log::info!("Monitoring duration elapsed"),
        StopReason::SourceInactive => log::warn!("Source {} is no longer active", source),
    }

    let stats = attached[0].analyzer.reader().stats();
    let summary = MonitorSummary {
        source,
        elapsed_secs: started.elapsed().as_secs_f64(),
        reader_active: attached[0].analyzer.reader().is_active(),
        frames_read: stats.frames_read,
        records_published: stats.records_published,
        raw_output: raw_log.path().display().to_string(),
        raw_lines_written: raw_log.lines(),
        analyzers: attached
            .iter()
            .map(|entry| AnalyzerSummary {
                name: entry.analyzer.name().to_string(),
                radius: entry.analyzer.radius(),
                output: entry.log.path().display().to_string(),
                lines_written: entry.log.lines(),
                dropped_samples: entry.analyzer.dropped_samples(),
            })
            .collect(),
    };

    release(attached).await;

    if args.json {
        if let Err(e) = output::emit_json(&summary, None, false) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    } else if !args.quiet {
        eprintln!(
            "Read {} frame(s) from {} in {:.1}s",
            summary.frames_read, summary.source, summary.elapsed_secs
        );
        eprintln!(
            "  {:<24} {} line(s)",
            summary.raw_output, summary.raw_lines_written
        );
        for analyzer in &summary.analyzers {
            eprintln!(
                "  {:<24} {} line(s), {} dropped sample(s)",
                analyzer.output, analyzer.lines_written, analyzer.dropped_samples
            );
        }
    }

    exit_codes::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serial_analyzer::source::DEFAULT_BAUD_RATE;

    fn monitor_args(argv: &[&str]) -> MonitorArgs {
        let mut full = vec!["serial-analyzer", "monitor"];
        full.extend_from_slice(argv);
        match crate::cli::Cli::parse_from(full).command {
            crate::cli::Command::Monitor(args) => args,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_default_analyzers() {
        let config = build_config(&monitor_args(&["--port", "/dev/ttyACM0"])).unwrap();
        assert_eq!(config.analyzers, MonitorConfig::default().analyzers);
        assert_eq!(config.source.frame_size(), 10);
        assert!(matches!(
            config.source,
            SourceConfig::SerialPort { baud_rate: DEFAULT_BAUD_RATE, .. }
        ));
    }

    #[test]
    fn test_repeated_filters() {
        let config = build_config(&monitor_args(&[
            "--file", "capture.txt", "--median", "1", "--median", "3", "--mean", "2",
            "--interval-ms", "50",
        ]))
        .unwrap();
        assert_eq!(config.analyzers.len(), 3);
        assert_eq!(config.poll_interval_ms, 50);
        assert_eq!(config.output_name(0), "MedianFilter_0.txt");
        assert_eq!(config.output_name(2), "MovingAverageFilter.txt");
    }

    #[test]
    fn test_source_is_required() {
        assert!(build_config(&monitor_args(&[])).is_err());
    }
}
