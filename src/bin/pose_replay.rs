use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use flate2::read::GzDecoder;
use pose_tree::{ManualClock, NamedSE3Pose, PoseTree, PoseTreeConfig, Time};
use serde::Deserialize;
use serde_json::json;

/// Replay a recorded pose log into a pose tree and print lookups as JSON
#[derive(Parser, Debug)]
#[command(name = "pose_replay")]
struct Args {
    /// Path to a pose log ({"poses": [...]}), .json or .json.gz
    #[arg(long)]
    log: PathBuf,

    /// JSON config file (PoseTreeConfig)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the retention horizon in seconds
    #[arg(long)]
    max_age_secs: Option<i64>,

    /// Frame to express the result in; omit to list every stored pair
    #[arg(long, requires = "frame_b")]
    frame_a: Option<String>,

    /// Frame whose pose is looked up
    #[arg(long, requires = "frame_a")]
    frame_b: Option<String>,

    /// RFC3339 time to look up (repeatable)
    #[arg(long)]
    at: Vec<DateTime<Utc>>,

    /// Also look up the newest stored pose
    #[arg(long, default_value_t = false)]
    latest: bool,
}

#[derive(Debug, Deserialize)]
struct LogFile {
    poses: Vec<NamedSE3Pose>,
}

/// Parse a pose log, gunzipping it on the fly when the name ends in `.gz`
fn load_log(path: &Path) -> anyhow::Result<LogFile> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let source: Box<dyn Read> = match path.extension() {
        Some(ext) if ext == "gz" => Box::new(GzDecoder::new(file)),
        _ => Box::new(file),
    };
    serde_json::from_reader(BufReader::new(source))
        .with_context(|| format!("parsing pose log {}", path.display()))
}

fn load_config(args: &Args) -> anyhow::Result<PoseTreeConfig> {
    let mut config = match &args.config {
        Some(path) => PoseTreeConfig::from_json_file(path)?,
        None => PoseTreeConfig::default(),
    };
    if let Some(max_age_secs) = args.max_age_secs {
        config.max_age_secs = max_age_secs;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = load_config(&args)?;
    let log_file = load_log(&args.log)?;
    log::info!(
        "Replaying {} poses from {} (max age {}s)",
        log_file.poses.len(),
        args.log.display(),
        config.max_age_secs
    );

    // Retention follows log time, not wall time
    let start = log_file
        .poses
        .iter()
        .filter_map(NamedSE3Pose::stamp)
        .min()
        .unwrap_or_else(Utc::now);
    let clock = ManualClock::new(start);
    let mut tree = PoseTree::with_clock(config, Arc::new(clock.clone()));

    let mut rejected = 0u64;
    for pose in log_file.poses {
        if let Some(stamp) = pose.stamp() {
            clock.advance_to(stamp);
        }
        let pair = format!("{}:{}", pose.frame_a, pose.frame_b);
        if let Err(e) = tree.add_pose(pose) {
            log::warn!("Skipping pose {}: {}", pair, e);
            rejected += 1;
        }
    }

    let pairs: Vec<_> = tree
        .frame_pairs()
        .into_iter()
        .map(|(a, b)| {
            let vector = tree.pose_vector(&a, &b);
            json!({
                "frameA": a,
                "frameB": b,
                "count": vector.map(|v| v.len()).unwrap_or(0),
                "earliest": vector.and_then(|v| v.earliest_stamp()),
                "latest": vector.and_then(|v| v.latest_stamp()),
            })
        })
        .collect();

    let mut output = json!({
        "rejected": rejected,
        "pairs": pairs,
    });

    if let (Some(frame_a), Some(frame_b)) = (&args.frame_a, &args.frame_b) {
        let mut times: Vec<Time> = args.at.iter().copied().map(Time::At).collect();
        if args.latest {
            times.push(Time::Latest);
        }

        let mut lookups = Vec::with_capacity(times.len());
        for time in times {
            let query = match time {
                Time::Latest => "latest".to_string(),
                Time::At(stamp) => stamp.to_rfc3339(),
            };
            let pose = tree.get(frame_a, frame_b, time)?;
            lookups.push(json!({ "query": query, "pose": pose }));
        }
        output["lookups"] = json!(lookups);
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
