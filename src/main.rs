//! Command line entry point for TN3270R
//!
//! Connects, waits for the first screen (or for `--wait TEXT`), prints it
//! and disconnects.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::info;

use tn3270r::{Session, SessionConfig};

struct CliOptions {
    config_path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    /// `--tls` / `--no-tls`; unset leaves the config (or port 992 rule) alone
    tls: Option<bool>,
    insecure: bool,
    ca_bundle: Option<PathBuf>,
    wait_text: Option<String>,
    timeout: Duration,
    html: bool,
    bordered: bool,
}

fn print_help() {
    println!("TN3270R - scriptable IBM 3270 terminal client");
    println!();
    println!("Usage: tn3270r [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --config <file>       Load session settings from a JSON file");
    println!("  --host <host>         Host to connect to (overrides config)");
    println!("  --port <port>         Port to connect to (default: 23)");
    println!("  --tls                 Connect over TLS (default on port 992)");
    println!("  --no-tls              Connect in plain text even on port 992");
    println!("  --insecure            Accept any TLS certificate");
    println!("  --ca-bundle <file>    Trust the CA certificates in a PEM file");
    println!("  --wait <text>         Wait for text before printing the screen");
    println!("  --timeout <ms>        Wait timeout in milliseconds (default: 10000)");
    println!("  --html                Print the screen as markup with input fields");
    println!("  --borderless          Print the text screen without side borders");
    println!("  --help or -h          Show this help message");
    println!();
    println!("Example:");
    println!("  tn3270r --host zos.example.com --wait \"Logon\"");
}

fn next_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .with_context(|| format!("{flag} requires a value"))
}

fn parse_args(args: &[String]) -> Result<Option<CliOptions>> {
    let mut options = CliOptions {
        config_path: None,
        host: None,
        port: None,
        tls: None,
        insecure: false,
        ca_bundle: None,
        wait_text: None,
        timeout: Duration::from_secs(10),
        html: false,
        bordered: true,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                options.config_path = Some(PathBuf::from(next_value(args, &mut i, "--config")?));
            }
            "--host" | "-s" => {
                options.host = Some(next_value(args, &mut i, "--host")?.to_string());
            }
            "--port" | "-p" => {
                let value = next_value(args, &mut i, "--port")?;
                let port = value
                    .parse::<u16>()
                    .with_context(|| format!("--port requires a numeric value, got {value}"))?;
                options.port = Some(port);
            }
            "--tls" => options.tls = Some(true),
            "--no-tls" => options.tls = Some(false),
            "--insecure" => options.insecure = true,
            "--ca-bundle" => {
                options.ca_bundle = Some(PathBuf::from(next_value(args, &mut i, "--ca-bundle")?));
            }
            "--wait" | "-w" => {
                options.wait_text = Some(next_value(args, &mut i, "--wait")?.to_string());
            }
            "--timeout" | "-t" => {
                let value = next_value(args, &mut i, "--timeout")?;
                let ms = value
                    .parse::<u64>()
                    .with_context(|| format!("--timeout requires milliseconds, got {value}"))?;
                options.timeout = Duration::from_millis(ms);
            }
            "--html" => options.html = true,
            "--borderless" => options.bordered = false,
            "--help" | "-h" => {
                print_help();
                return Ok(None);
            }
            other => bail!("unknown option {other} (try --help)"),
        }
        i += 1;
    }
    Ok(Some(options))
}

fn build_config(options: &CliOptions) -> Result<SessionConfig> {
    let mut config = match &options.config_path {
        Some(path) => SessionConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SessionConfig::default(),
    };
    if let Some(host) = &options.host {
        config.host = host.clone();
    }
    if let Some(port) = options.port {
        config.port = port;
    }
    if options.tls.is_some() {
        config.use_tls = options.tls;
    }
    if options.insecure {
        config.tls_insecure = true;
    }
    if let Some(path) = &options.ca_bundle {
        config.tls_ca_bundle_path = Some(path.clone());
    }
    if config.host.is_empty() {
        bail!("no host given; use --host or a config file");
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let Some(options) = parse_args(&args)? else {
        return Ok(());
    };
    let config = build_config(&options)?;

    info!(
        "Connecting to {}:{}{}",
        config.host,
        config.port,
        if config.tls_enabled() { " over TLS" } else { "" }
    );
    let mut session = Session::connect(config).await.context("connecting")?;

    let screen = async {
        if let Some(text) = &options.wait_text {
            session.wait_for_text(text, false, options.timeout).await?;
        }
        let rendered = tokio::time::timeout(options.timeout, async {
            if options.html {
                session.render_html().await
            } else {
                session.render_text(options.bordered).await
            }
        })
        .await
        .context("timed out waiting for the keyboard to unlock")??;
        Ok::<_, anyhow::Error>(rendered)
    }
    .await;

    session.disconnect().await?;
    println!("{}", screen?);
    Ok(())
}
