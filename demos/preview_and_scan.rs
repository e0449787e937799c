//! # Example: Previews stay responsive during a library scan
//!
//! A batch of standard `analyze` tasks runs one at a time while instant
//! `preview` tasks start immediately next to them. Statuses are kept by a
//! [`StatusMapper`]; every event is logged through [`LogWriter`].
//!
//! Run with: `cargo run --example preview_and_scan --features logging`

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use worklane::{
    Callbacks, Lane, LogWriter, ResultStatus, Scheduler, SchedulerConfig, StatusMapper, Subscribe,
    TaskError, TaskFn, TaskKey, TaskRef,
};

const TRACKS: [&str; 4] = ["intro.flac", "verse.flac", "bridge.flac", "outro.flac"];

/// Standard task: pretend to analyze a track, honoring cancellation.
fn analyze(track: &'static str, work_ms: u64) -> TaskRef<ResultStatus> {
    TaskFn::arc(
        TaskKey::new("analyze", track),
        Lane::Standard,
        move |ctx: CancellationToken| async move {
            tokio::select! {
                _ = ctx.cancelled() => Err(TaskError::Canceled),
                _ = tokio::time::sleep(Duration::from_millis(work_ms)) => {
                    if track == "bridge.flac" {
                        return Err(TaskError::fail("unsupported sample rate: 11025 Hz"));
                    }
                    Ok(if work_ms % 2 == 0 { ResultStatus::Match } else { ResultStatus::Mismatch })
                }
            }
        },
    )
}

/// Instant task: a quick preview render that never touches statuses.
fn preview(track: &'static str) -> TaskRef<ResultStatus> {
    TaskFn::arc(
        TaskKey::new("preview", track),
        Lane::Instant,
        |_ctx: CancellationToken| async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok::<_, TaskError>(ResultStatus::Resolved)
        },
    )
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cfg = SchedulerConfig {
        grace: Duration::from_secs(2),
        ..SchedulerConfig::default()
    };
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let statuses = Rc::new(RefCell::new(StatusMapper::new()));

    let mut sched = Scheduler::builder(cfg)
        .with_subscribers(subs)
        .with_listener(Rc::clone(&statuses))
        .build();

    // Batch trigger from another thread.
    let handle = sched.handle();
    let producer = std::thread::spawn(move || {
        for (i, track) in TRACKS.into_iter().enumerate() {
            let work_ms = 120 + i as u64 * 41;
            if handle.try_submit(analyze(track, work_ms), false).is_err() {
                eprintln!("[producer] queue closed, stopping");
                break;
            }
        }
    });
    producer
        .join()
        .map_err(|_| anyhow::anyhow!("producer thread panicked"))?;
    sched.poll_completions();

    // The user clicks around while the scan runs.
    sched.submit_with(
        preview("verse.flac"),
        true,
        Callbacks::new().on_completed(|meta, _: &ResultStatus| println!("[ui] preview ready: {}", meta.key)),
    );
    sched.submit(preview("verse.flac"), true);
    sched.cancel(&TaskKey::new("analyze", "outro.flac"));

    sched.run_until_idle().await;

    for track in TRACKS {
        println!("{track:>12}: {}", statuses.borrow().status(track));
    }

    sched.shutdown().await?;
    Ok(())
}
