use std::num::NonZeroUsize;
use std::path::PathBuf;
use clap::Parser;

/// Check that an edge server serves the files of a manifest, and whether it serves them from cache.
#[derive(Parser, Debug)]
#[command(name = "edge-verify")]
pub struct Args {
    /// URL (or local path) of the file list; a `.json` suffix selects the JSON-lines format.
    #[clap(long)]
    pub file_list: String,
    /// Edge server to query, as `host` or `host:port`.
    #[clap(short, long, default_value = "localhost")]
    pub server: String,
    /// Value for the `Host` header, when the server hosts several sites.
    #[clap(long)]
    pub vhost: Option<String>,
    /// Read and hash every body instead of trusting `Content-Length`.
    #[clap(short, long)]
    pub checksum: bool,
    #[clap(short = 'j', long, default_value = "10")]
    pub workers: NonZeroUsize,
    /// Write every outcome to this path as a JSON-lines manifest.
    #[clap(long)]
    pub create_manifest: Option<PathBuf>,
    /// Deadline for a single request, in seconds.
    #[clap(long, default_value = "60")]
    pub timeout: u64,
    /// Seconds between two status lines.
    #[clap(long, default_value = "10")]
    pub report_interval: u64,
    #[clap(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["edge-verify", "--file-list", "http://example.com/sha256.txt"]).unwrap();
        assert_eq!(args.server, "localhost");
        assert_eq!(args.workers.get(), 10);
        assert!(!args.checksum);
        assert!(args.vhost.is_none());
        assert!(args.create_manifest.is_none());
        assert_eq!(args.timeout, 60);
        assert_eq!(args.report_interval, 10);
    }

    #[test]
    fn zero_workers_is_rejected() {
        let res = Args::try_parse_from(["edge-verify", "--file-list", "list.txt", "-j", "0"]);
        assert!(res.is_err());
    }

    #[test]
    fn file_list_is_required() {
        assert!(Args::try_parse_from(["edge-verify"]).is_err());
    }
}
