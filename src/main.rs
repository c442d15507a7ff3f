#![deny(clippy::all)]
#![warn(clippy::nursery)]

mod activity;
mod args;
mod file_list;
mod hash;
mod logging;
mod manifest;
mod model;
mod pool;
mod status;
mod verify;

#[cfg(test)]
mod test_server;

use std::process::exit;
use std::sync::Arc;
use std::time::Duration;
use anyhow::Context;
use clap::Parser;
use reqwest::blocking::Client;
use crate::args::Args;
use crate::manifest::ManifestWriter;
use crate::pool::WorkerPool;
use crate::status::{Counters, StatusBoard};
use crate::verify::Verifier;

fn main() {
    let args = Args::parse();
    logging::init(args.verbose);

    match run(args) {
        Ok(report) => {
            for path in &report.bad_paths {
                println!("{path}");
            }
            tracing::info!("done: {}", report.counters);
        }
        Err(e) => {
            tracing::error!("{e:#}");
            exit(1);
        }
    }
}

/// Result of a full run; mismatches are data, not errors.
struct Report {
    counters: Counters,
    bad_paths: Vec<String>,
}

fn run(args: Args) -> anyhow::Result<Report> {
    let Args { file_list, server, vhost, checksum, workers, create_manifest, timeout, report_interval, .. } = args;
    let workers = workers.get();

    // Creating an HTTP client is not free; every worker shares this one and its connection pool.
    // X-Cache has to come from the edge itself, never from a proxy in between.
    let client = Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(timeout))
        .tcp_keepalive(Duration::from_secs(300))
        .build()
        .context("failed to initialize HTTP client")?;

    let verifier = Verifier::new(client.clone(), server.as_str(), vhost, checksum);
    verifier
        .url_for("/")
        .with_context(|| format!("invalid server '{server}'"))?;

    tracing::info!("getting file list from {file_list}");
    let files = file_list::load(&client, &file_list).context("could not load file list")?;
    tracing::info!("got file list: {} files", files.len());

    let manifest = create_manifest
        .as_deref()
        .map(|path| {
            ManifestWriter::create(path).with_context(|| format!("could not create manifest {}", path.display()))
        })
        .transpose()?;

    let board = Arc::new(StatusBoard::new(workers));
    let (queue, queue_rx) = pool::work_queue();
    let mut pool = WorkerPool::new(queue_rx, Arc::clone(&board), verifier);
    if let Some(manifest) = &manifest {
        pool.set_output(manifest.sender());
    }

    for _ in 0..workers {
        pool.start().context("failed to spawn worker")?;
    }

    let printer = board
        .spawn_printer(Duration::from_secs(report_interval.max(1)))
        .context("failed to spawn status printer")?;

    let fed = pool::feed(&queue, files, workers);
    drop(queue);
    pool.join();

    if let Some(manifest) = manifest {
        match manifest.close() {
            Ok(entries) => tracing::info!("wrote {entries} manifest entries"),
            Err(e) => tracing::error!("could not finish manifest: {e}"),
        }
    }

    tracing::info!("{}", board.snapshot());
    printer.quit();
    fed.context("work queue closed before the file list was drained")?;

    Ok(Report {
        counters: board.counters(),
        bad_paths: board.bad_paths(),
    })
}
