//! gfwlist2pac - one-shot PAC generator.
//!
//! Downloads (or reads) a gfwlist, converts it to a PAC script and writes it
//! to a file.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pacserve::config::validate_proxy;
use pacserve::pac::render;
use pacserve::rules::remote::{DEFAULT_GFWLIST_URL, RemoteLoader};
use pacserve::rules::{decode_rule_list, merge_tiers, parse};

const DEFAULT_PROXY: &str = "SOCKS5 127.0.0.1:1080; SOCKS 127.0.0.1:1080; DIRECT;";

/// Convert a gfwlist into a PAC script.
#[derive(Debug, Parser)]
#[command(name = "gfwlist2pac", version, about)]
struct Args {
    /// gfwlist URL, used when --in is not given.
    #[arg(long, default_value = DEFAULT_GFWLIST_URL)]
    url: String,

    /// Local gfwlist file, or `-` for stdin.
    #[arg(long = "in", value_name = "PATH")]
    input: Option<String>,

    /// Output PAC file.
    #[arg(long, default_value = "gfwlist.pac", value_name = "PATH")]
    out: PathBuf,

    /// Proxy directive returned for proxied hosts.
    #[arg(short = 's', long, default_value = DEFAULT_PROXY)]
    proxy: String,
}

async fn read_input(args: &Args) -> Result<Vec<u8>> {
    match args.input.as_deref() {
        Some("-") => {
            let mut raw = Vec::new();
            std::io::stdin()
                .read_to_end(&mut raw)
                .context("failed to read stdin")?;
            Ok(raw)
        }
        Some(path) => std::fs::read(path).with_context(|| format!("failed to read {path}")),
        None => {
            info!(url = %args.url, "downloading gfwlist");
            let loader = RemoteLoader::new()?;
            Ok(loader.fetch(&args.url).await?)
        }
    }
}

async fn run(args: Args) -> Result<()> {
    validate_proxy(&args.proxy)?;

    let raw = read_input(&args).await?;
    let text = decode_rule_list(&raw).context("failed to decode gfwlist")?;
    let rules = parse(&text)?;
    let lists = merge_tiers([&rules.proxy], [&rules.direct]);
    let script = render(&lists, &args.proxy)?;

    std::fs::write(&args.out, &script)
        .with_context(|| format!("failed to write {}", args.out.display()))?;

    info!(
        proxy_domains = lists.proxy.len(),
        direct_domains = lists.direct.len(),
        out = %args.out.display(),
        "wrote PAC script"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
