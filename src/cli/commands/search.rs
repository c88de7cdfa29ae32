//! clipseek search - Run a hybrid query over a corpus.
//!
//! Loads frame descriptions and transcript segments from sidecar JSON
//! files, indexes them in-process, then runs vector + text pipelines
//! and fuses their rankings. Ctrl-C cancels a query in flight.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use colored::Colorize;

use crate::align::{window_key, window_label};
use crate::app::AppContext;
use crate::embed::build_embedder;
use crate::error::Result;
use crate::ingest::{Ingester, load_frame_records, load_transcript_segments};
use crate::project::PublicResult;
use crate::query::{
    QueryEngine, QueryRequest, QueryResponse, cancel_pair, standard_pipelines, standard_weights,
};
use crate::store::memory::MemoryStore;
use crate::store::{TextSearchMode, await_index_ready};

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search query
    pub query: String,

    /// Frame descriptions JSON (array of {file_name, description})
    #[arg(long)]
    pub frames: PathBuf,

    /// Transcript segments JSON (array of {t_start, t_end, text})
    #[arg(long)]
    pub transcripts: Option<PathBuf>,

    /// Video id attached to ingested evidence
    #[arg(long, default_value = "video")]
    pub video_id: String,

    /// Number of fused results to return
    #[arg(long, short = 'n')]
    pub top_n: Option<usize>,

    /// Temporal join window in seconds
    #[arg(long)]
    pub window: Option<f64>,

    /// Weight for vector pipelines
    #[arg(long)]
    pub vector_weight: Option<f64>,

    /// Weight for the text pipeline
    #[arg(long)]
    pub text_weight: Option<f64>,

    /// Treat the query as an exact phrase in the text pipeline
    #[arg(long)]
    pub phrase: bool,

    /// Show per-pipeline score contributions
    #[arg(long)]
    pub explain: bool,
}

pub fn run(ctx: &AppContext, args: &SearchArgs) -> Result<()> {
    let config = &ctx.config;

    let store = Arc::new(MemoryStore::new(config.storage.clone())?);
    let embedder: Arc<dyn crate::embed::Embedder> = Arc::from(build_embedder(&config.embedding)?);
    let ingester = Ingester::new(Arc::clone(&store), Arc::clone(&embedder));

    let frame_records = load_frame_records(&args.frames)?;
    let frame_report = ingester.ingest_frame_records(&frame_records, &args.video_id)?;

    let transcripts = match &args.transcripts {
        Some(path) => {
            let segments = load_transcript_segments(path)?;
            let (_, installed) = ingester.ingest_transcripts(&segments, &args.video_id)?;
            installed
        }
        None => Vec::new(),
    };

    let engine = QueryEngine::new(
        Arc::clone(&store) as Arc<dyn crate::store::EvidenceStore>,
        embedder,
        standard_pipelines(config),
        config.search.window_secs,
    );
    engine.install_transcripts(&transcripts);

    let mut weights = standard_weights(config);
    if let Some(w) = args.vector_weight {
        weights.insert("frameVector".to_string(), w);
        weights.insert("transcriptVector".to_string(), w);
    }
    if let Some(w) = args.text_weight {
        weights.insert("frameText".to_string(), w);
    }

    let mut request = QueryRequest::new(args.query.clone());
    request.weights = weights;
    request.top_n = args.top_n.unwrap_or(config.search.top_n);
    request.window_secs = args.window;
    request.text_mode = if args.phrase {
        TextSearchMode::Phrase
    } else {
        TextSearchMode::Text
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let response = runtime.block_on(async {
        await_index_ready(
            store.as_ref(),
            &config.storage.frame_text_index,
            config.search.pipeline_timeout,
        )
        .await?;

        let (handle, token) = cancel_pair();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                handle.cancel();
            }
        });

        if args.explain {
            let (explained, warnings) = engine
                .search_explained(request, Some(token))
                .await?;
            display_explained(ctx, args, &explained, &warnings);
            Ok(None)
        } else {
            engine.search(request, Some(token)).await.map(Some)
        }
    })?;

    if let Some(response) = response {
        display_results(ctx, args, frame_report.skipped, &response);
    }
    Ok(())
}

fn display_results(
    ctx: &AppContext,
    args: &SearchArgs,
    skipped: usize,
    response: &QueryResponse,
) {
    if ctx.robot_mode {
        println!(
            "{}",
            serde_json::json!({
                "status": "ok",
                "query": args.query,
                "count": response.results.len(),
                "skipped_documents": skipped,
                "warnings": response.warnings,
                "results": response.results,
            })
        );
        return;
    }

    for warning in &response.warnings {
        eprintln!("{} {warning}", "!".yellow());
    }
    if skipped > 0 {
        eprintln!("{} {skipped} document(s) skipped during ingest", "!".yellow());
    }

    if response.results.is_empty() {
        println!("{} No results for '{}'", "!".yellow(), args.query.cyan());
        return;
    }

    println!(
        "{} results for '{}':",
        response.results.len().to_string().bold(),
        args.query.cyan()
    );
    println!();
    for (i, result) in response.results.iter().enumerate() {
        print_result(i, result);
    }
}

fn print_result(i: usize, result: &PublicResult) {
    let rank = format!("{}.", i + 1);
    println!(
        "{:4} {} {}",
        rank.dimmed(),
        format!("t={:.1}s", result.timestamp).bold(),
        result.video_id.dimmed()
    );
    println!("     score {:.5}", result.score);
    if !result.text.is_empty() {
        println!("     {}", result.text);
    }
    if !result.transcript_refs.is_empty() {
        println!(
            "     transcripts: {}",
            result
                .transcript_refs
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
                .dimmed()
        );
    }
    println!();
}

fn display_explained(
    ctx: &AppContext,
    args: &SearchArgs,
    explained: &[crate::project::ExplainedResult],
    warnings: &[String],
) {
    if ctx.robot_mode {
        println!(
            "{}",
            serde_json::json!({
                "status": "ok",
                "query": args.query,
                "count": explained.len(),
                "warnings": warnings,
                "results": explained,
            })
        );
        return;
    }

    for warning in warnings {
        eprintln!("{} {warning}", "!".yellow());
    }
    for (i, item) in explained.iter().enumerate() {
        print_result(i, &item.result);
        println!("     {} {}", "doc".dimmed(), item.doc_id);
        for c in &item.contributions {
            println!(
                "       {:<18} rank {:>3}  weight {:.2}  contributes {:.5}",
                c.pipeline, c.rank, c.weight, c.contribution
            );
        }
        let width = args.window.unwrap_or(ctx.config.search.window_secs);
        println!(
            "       window {}",
            window_label(window_key(item.result.timestamp, width), width).dimmed()
        );
        println!();
    }
}
