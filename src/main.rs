use anyhow::{Context, Result};
use promodash::{
    config::{Job, RenderRequest},
    dashboard::{ended, promo},
    export,
};
use std::{env, path::Path, process::exit, time::Instant};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <REQUEST_YAML>", args[0]);
        exit(1);
    }
    if let Err(e) = run(Path::new(&args[1])) {
        eprintln!("Error: {:#}", e);
        exit(1);
    }
}

fn run(request_path: &Path) -> Result<()> {
    let start = Instant::now();

    // ─── 2) read and validate the request ────────────────────────────
    let request = RenderRequest::load(request_path)?;
    let job = request.job()?;
    let ctx = request.context();
    info!(workbook = %request.workbook.display(), dashboard = ?request.dashboard, "startup");

    // ─── 3) load, render, print ──────────────────────────────────────
    match job {
        Job::Promo(job) => {
            let dataset = ctx.promo_dataset(&request.workbook)?;
            let report = promo::render(&dataset, &job, &ctx.domain)?;
            println!("{}", serde_json::to_string_pretty(&report)?);

            // ─── 4) export the filtered rows ─────────────────────────
            if let Some(path) = &request.export {
                export::write_file(&report.data, path)
                    .with_context(|| format!("exporting to {:?}", path))?;
            }
        }
        Job::Ended(job) => {
            let dataset = ctx.ended_dataset(&request.workbook)?;
            let report = ended::render(&dataset, &job)?;
            println!("{}", serde_json::to_string_pretty(&report)?);

            // one file per non-empty tab: <stem>_sales.<ext>, <stem>_qty.<ext>
            if let Some(path) = &request.export {
                for (suffix, tab) in [("sales", &report.sales), ("qty", &report.qty)] {
                    if let Some(tab) = tab {
                        let target = suffixed(path, suffix);
                        export::write_file(&tab.data, &target)
                            .with_context(|| format!("exporting to {:?}", target))?;
                    }
                }
            }
        }
    }

    info!("done in {:?}", start.elapsed());
    Ok(())
}

fn suffixed(path: &Path, suffix: &str) -> std::path::PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}_{}", stem, suffix),
    };
    path.with_file_name(name)
}
