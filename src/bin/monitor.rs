use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use incitrack::{
    Config, Event, EventSink, Frame, Incident, IncidentMonitor, Monitoring, SeverityLabel,
};

/// Replays a recorded detection stream through the incident monitor and
/// prints severity updates and incidents as JSON lines.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Detections file, one `{timestamp_ms}:{json array}` line per frame
    #[arg(value_name = "FILE")]
    pub input: String,

    /// Name of the video source
    #[arg(long, default_value = "camera-1", value_name = "NAME")]
    pub source: String,

    /// JSON config file
    #[arg(long, value_name = "FILE")]
    pub config: Option<String>,

    /// Maximum number of frames to process (0 means no limit)
    #[arg(long, default_value_t = 0, value_name = "COUNT")]
    pub max_frames: u64,
}

struct JsonLines<W: Write> {
    out: W,
}

impl<W: Write> JsonLines<W> {
    fn write(&mut self, event: &Event) {
        let res = serde_json::to_writer(&mut self.out, event)
            .map_err(std::io::Error::from)
            .and_then(|_| writeln!(self.out));

        if let Err(err) = res {
            error!("failed to write event: {}", err);
        }
    }
}

impl<W: Write> EventSink for JsonLines<W> {
    fn severity_update(&mut self, score: u32, label: SeverityLabel, factors: &[String]) {
        self.write(&Event::Severity {
            score,
            label,
            factors: factors.to_vec(),
        });
    }

    fn incident_detected(&mut self, incident: &Incident) {
        self.write(&Event::Incident(incident.clone()));
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("incitrack=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("loading config {}", path))?,
        None => Config::default(),
    };

    info!("input: {}", args.input);
    info!("source: {}", args.source);

    let file = std::fs::File::open(&args.input)
        .with_context(|| format!("opening detections file {}", args.input))?;

    let mut monitor = IncidentMonitor::new(config);
    let mut sink = JsonLines {
        out: std::io::stdout().lock(),
    };

    let mut frame_count = 0u64;
    let mut skipped = 0u64;

    for (idx, line) in std::io::BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        if args.max_frames > 0 && frame_count >= args.max_frames {
            warn!("reached max frames {}", args.max_frames);
            break;
        }

        let frame = match Frame::parse_line(&line, idx + 1) {
            Ok(frame) => frame,
            Err(err) => {
                warn!("{}", err);
                skipped += 1;
                continue;
            }
        };

        monitor.update(&frame, &args.source, &mut sink);
        frame_count += 1;
    }

    sink.out.flush()?;

    info!(
        "processed {} frame(s), skipped {} line(s), {} active track(s), final score {}",
        frame_count,
        skipped,
        monitor.tracks(&args.source).len(),
        monitor.session(&args.source).map_or(0, |s| s.score())
    );

    Ok(())
}
