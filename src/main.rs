use anyhow::Context;
use clap::Parser;
use ffmpeg_transcode::{RunState, TranscodeReport};
use tokio_util::sync::CancellationToken;

mod config;
mod report;

fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .filter_module("ffmpeg_transcode", log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

/// Cancels `stop` on the first Ctrl-C. The loop notices it at the next
/// iteration boundary and drains.
fn watch_interrupt(stop: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            _ = stop.cancelled() => {},
            res = tokio::signal::ctrl_c() => {
                match res {
                    Ok(()) => {
                        log::info!("interrupt received, finishing current frame");
                        stop.cancel();
                    }
                    Err(e) => log::error!("failed to listen for ctrl-c: {}", e),
                }
            },
        }
    });
}

async fn run(args: config::Args) -> anyhow::Result<TranscodeReport> {
    ffmpeg_transcode::init()?;
    let transcode_config = args.transcode_config();

    let state = RunState::default();
    let stop = state.stop_handle();
    watch_interrupt(stop.clone());

    let input = args.input_source.clone();
    let output = args.output_path.clone();
    let result = tokio::task::spawn_blocking(move || {
        let mut state = state;
        ffmpeg_transcode::transcode(&input, &output, &transcode_config, &mut state)
    })
    .await
    .context("transcode task panicked")?;
    // releases the ctrl-c watcher
    stop.cancel();

    Ok(result?)
}

fn print_summary(report: &TranscodeReport, output_path: &str) {
    match ffmpeg_transcode::probe(output_path) {
        Ok(info) => log::info!("output {}", info),
        Err(e) => log::warn!("could not probe {}: {}", output_path, e),
    }
    if let Some(tb) = report.output_time_base {
        log::info!(
            "{}x{}, {} packets, stream time_base {}/{}",
            report.width,
            report.height,
            report.packets_written,
            tb.numerator(),
            tb.denominator()
        );
    }
    match std::fs::metadata(output_path) {
        Ok(meta) => println!(
            "Output Video File size: {}",
            report::format_file_size(meta.len())
        ),
        Err(e) => log::warn!("could not stat {}: {}", output_path, e),
    }
}

#[tokio::main]
async fn main() -> ! {
    init_logging();

    let args = match config::Args::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => e.exit(),
            _ => {
                let _ = e.print();
                std::process::exit(1);
            }
        },
    };

    let output_path = args.output_path.clone();
    match run(args).await {
        Ok(report) => {
            print_summary(&report, &output_path);
            std::process::exit(0);
        }
        Err(e) => {
            log::error!("transcode failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
