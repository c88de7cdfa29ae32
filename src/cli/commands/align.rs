//! clipseek align - Inspect the temporal join for a corpus.
//!
//! Buckets transcripts by window, joins frames against them, and
//! prints one merged record per frame. Useful for checking what a
//! query's transcript references will look like before searching.

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use uuid::Uuid;

use crate::align::{DEFAULT_WINDOW_SECS, build_merged};
use crate::app::AppContext;
use crate::error::Result;
use crate::evidence::{DocId, FrameDoc, TranscriptDoc};
use crate::ingest::{load_frame_records, load_transcript_segments, parse_frame_timestamp};

#[derive(Args, Debug)]
pub struct AlignArgs {
    /// Frame descriptions JSON (array of {file_name, description})
    #[arg(long)]
    pub frames: PathBuf,

    /// Transcript segments JSON (array of {t_start, t_end, text})
    #[arg(long)]
    pub transcripts: PathBuf,

    /// Video id attached to the records
    #[arg(long, default_value = "video")]
    pub video_id: String,

    /// Window width in seconds
    #[arg(long, default_value_t = DEFAULT_WINDOW_SECS)]
    pub window: f64,

    /// Only show frames that have at least one transcript in window
    #[arg(long)]
    pub matched_only: bool,
}

pub fn run(ctx: &AppContext, args: &AlignArgs) -> Result<()> {
    let frames: Vec<(DocId, FrameDoc)> = load_frame_records(&args.frames)?
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let (frame_number, timestamp) = parse_frame_timestamp(&record.file_name, index);
            (
                DocId::from(Uuid::new_v4().to_string()),
                FrameDoc {
                    frame_number,
                    timestamp,
                    description: record.description,
                    video_id: args.video_id.clone(),
                    embedding: None,
                },
            )
        })
        .collect();

    let transcripts: Vec<(DocId, TranscriptDoc)> = load_transcript_segments(&args.transcripts)?
        .into_iter()
        .map(|segment| {
            (
                DocId::from(Uuid::new_v4().to_string()),
                TranscriptDoc {
                    t_start: segment.t_start,
                    t_end: segment.t_end,
                    text: segment.text,
                    video_id: args.video_id.clone(),
                    embedding: None,
                },
            )
        })
        .collect();

    let mut records = build_merged(&frames, &transcripts, args.window);
    if args.matched_only {
        records.retain(|r| r.transcript_count > 0);
    }

    if ctx.robot_mode {
        println!(
            "{}",
            serde_json::json!({
                "status": "ok",
                "window_secs": args.window,
                "count": records.len(),
                "records": records,
            })
        );
        return Ok(());
    }

    if records.is_empty() {
        println!("{} No frames to align", "!".yellow());
        return Ok(());
    }

    println!(
        "{} frames, window {}s:",
        records.len().to_string().bold(),
        args.window
    );
    println!();
    for record in &records {
        println!(
            "frame {:>5} t={:.1}s window {}  {} transcript(s)",
            record.frame_number,
            record.frame_timestamp,
            record.time_range.cyan(),
            record.transcript_count
        );
        if !record.frame_description.is_empty() {
            println!("  {}", record.frame_description.dimmed());
        }
        for id in &record.transcript_ids {
            println!("  {} {}", "->".dimmed(), id);
        }
    }
    Ok(())
}
