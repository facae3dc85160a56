use aedat_csv::reader::{
    AnalysisConfig, ChunkCsvData, EventLogReader, PixelActivity, SpatialCsvData,
};
use anyhow::{Context, Result, bail};
use futures::future::join_all;
use log::{error, info};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
enum Mode {
    Spatial,
    Chunks,
    Activity,
}

impl Mode {
    fn parse(arg: &str) -> Option<Self> {
        match arg {
            "spatial" => Some(Mode::Spatial),
            "chunks" => Some(Mode::Chunks),
            "activity" => Some(Mode::Activity),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // --- 1. Argument Parsing & Setup ---
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        println!("Usage: aedat_probe <spatial|chunks|activity> <csv_path>...");
        println!("Set AEDAT_PROBE_CONFIG to a JSON configuration file to override defaults.");
        return Ok(());
    }
    let Some(mode) = Mode::parse(&args[1]) else {
        bail!("unknown mode '{}', expected spatial, chunks or activity", args[1]);
    };
    let paths: Vec<PathBuf> = args[2..].iter().map(PathBuf::from).collect();

    // --- 2. Configuration ---
    let config = match env::var("AEDAT_PROBE_CONFIG") {
        Ok(path) => AnalysisConfig::from_json_file(&path)
            .with_context(|| format!("loading configuration from {path}"))?,
        Err(_) => AnalysisConfig::default(),
    };
    let reader = Arc::new(EventLogReader::new(config)?);

    // --- 3. One blocking ingestion task per file ---
    let tasks = paths.into_iter().map(|path| {
        let reader = Arc::clone(&reader);
        tokio::task::spawn_blocking(move || {
            let summary = summarize(&reader, mode, &path)
                .with_context(|| format!("processing {}", path.display()));
            (path, summary)
        })
    });

    // --- 4. Report ---
    let mut failures = 0usize;
    for joined in join_all(tasks).await {
        let (path, summary) = joined.context("ingestion task panicked")?;
        match summary {
            Ok(line) => info!("{}: {line}", path.display()),
            Err(e) => {
                error!("{e:#}");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{failures} file(s) failed");
    }
    Ok(())
}

fn summarize(reader: &EventLogReader, mode: Mode, path: &Path) -> Result<String> {
    Ok(match mode {
        Mode::Spatial => describe_spatial(&reader.read_spatial(path)?),
        Mode::Chunks => describe_chunks(&reader.read_chunks(path)?),
        Mode::Activity => describe_activity(&reader.read_activity(path)?),
    })
}

fn describe_spatial(data: &SpatialCsvData) -> String {
    let duration_us = data.timestamps().last().copied().unwrap_or_default();
    let on = data.events().filter(|e| e.polarity == Some(true)).count();
    format!(
        "{} events over {:.3}s ({} on, polarity encoded as {:?})",
        data.len(),
        duration_us as f64 / 1_000_000.0,
        on,
        data.truthy_token()
    )
}

fn describe_chunks(data: &ChunkCsvData) -> String {
    let total: u128 = data.all_counts().iter().map(|&count| u128::from(count)).sum();
    let mean = total as f64 / data.len() as f64;
    format!(
        "{} windows, {:.2} events/window on average, {} glitched",
        data.len(),
        mean,
        data.glitched_rows()
    )
}

fn describe_activity(activity: &PixelActivity) -> String {
    let mut line = format!(
        "{} changes, {} redundancies",
        activity.change_times_ms().len(),
        activity.redundancies()
    );
    if let Some(mean) = activity.mean_interval_ms() {
        line.push_str(&format!(", average time between: {mean:.2}ms"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use aedat_csv::core_modules::chunk::ingest_chunks;
    use aedat_csv::reader::ChunkConfig;

    #[test]
    fn chunk_summary_reports_mean_and_glitches() {
        // on/off counts are unbounded; only the total is capped by glitch correction
        let csv = format!(
            "On Count,Off Count,All Count\n{max},{max},8000\n{max},{max},6000\n0,0,9000\n",
            max = u64::MAX
        );
        let data = ingest_chunks(csv.as_bytes(), "big.csv", &ChunkConfig::new(1)).expect("valid csv");
        let summary = describe_chunks(&data);
        assert_eq!(summary, "3 windows, 7000.00 events/window on average, 1 glitched");
    }
}
