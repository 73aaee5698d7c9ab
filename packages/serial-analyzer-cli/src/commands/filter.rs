use crate::cli::FilterArgs;
use crate::exit_codes;
use crate::output;
use serde::Serialize;
use serial_analyzer::{check_radius, SampleWindow, TimestampedText, WindowUpdate};

#[derive(Serialize)]
struct FilterRow {
    line: usize,
    raw: f64,
    /// Line of the centered sample the processed value belongs to
    processed_line: Option<i64>,
    processed: Option<f64>,
}

#[derive(Serialize)]
struct FilterOutput {
    filter: &'static str,
    radius: usize,
    samples: usize,
    rejected: usize,
    rows: Vec<FilterRow>,
}

pub fn execute(args: FilterArgs) -> i32 {
    if let Err(e) = check_radius(args.radius) {
        eprintln!("Error: {}", e);
        return exit_codes::INPUT_ERROR;
    }

    let contents = match std::fs::read_to_string(&args.file) {
        Ok(contents) => contents,
        Err(e) => {
            eprintln!("Error: Failed to read '{}': {}", args.file, e);
            return exit_codes::INPUT_ERROR;
        }
    };

    let reducer = args.kind.reducer();
    let mut window = SampleWindow::new(args.radius);
    let mut rows = Vec::new();
    let mut rejected = 0;

    // Line numbers stand in for timestamps so processed rows point back at their input
    for (index, line) in contents.lines().enumerate() {
        let record = TimestampedText::new(index as i64 + 1, line);
        match window.apply(&record, reducer.as_ref()) {
            WindowUpdate::Rejected => {
                rejected += 1;
                log::debug!("line {}: not a sample: {:?}", index + 1, line);
            }
            WindowUpdate::Reset => {
                log::info!("line {}: {} resets the window", index + 1, line.trim());
            }
            update => {
                let processed = match update {
                    WindowUpdate::Processed(value) => Some(value),
                    _ => None,
                };
                rows.push(FilterRow {
                    line: index + 1,
                    raw: window.raw().value,
                    processed_line: processed.map(|p| p.timestamp),
                    processed: processed.map(|p| p.value),
                });
            }
        }
    }

    let result = FilterOutput {
        filter: args.kind.name(),
        radius: args.radius,
        samples: rows.len(),
        rejected,
        rows,
    };

    if let Err(e) = output::emit_json(&result, args.output.as_deref(), args.compact) {
        eprintln!("Error: {}", e);
        return exit_codes::EXECUTION_ERROR;
    }

    exit_codes::SUCCESS
}
