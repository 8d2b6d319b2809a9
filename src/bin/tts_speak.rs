//! tts-speak: synthesize a line of text and write the audio to disk.
//!
//! Usage:
//!   tts-speak [--credentials <path|json>] [--config <yaml>] [--voice <name>]
//!             [--language <code>] [--out <file>] <text...>

use std::path::PathBuf;

use anyhow::{bail, Context};
use gcp_tts_rust::{ContainerFormat, CredentialSource, SpeechConfig, SpeechPipeline};
use tracing_subscriber::EnvFilter;

const DEFAULT_OUT_STEM: &str = "tts_output";

#[derive(Debug, Default)]
struct Args {
    credentials: Option<String>,
    config: Option<PathBuf>,
    voice: Option<String>,
    language: Option<String>,
    out: Option<PathBuf>,
    text: Vec<String>,
}

fn print_usage() {
    println!(
        r#"tts-speak {} - Google Cloud Text-to-Speech from the command line

USAGE:
    tts-speak [OPTIONS] <TEXT...>

OPTIONS:
    --credentials <src>     Service-account JSON path or inline JSON
                            (default: $GOOGLE_APPLICATION_CREDENTIALS)
    --config <path>         YAML configuration file
    --voice <name>          Voice name, e.g. en-US-Wavenet-D
    --language <code>       BCP-47 language code, e.g. en-US
    --out <file>            Output file (default: {}.<wav|mp3|ogg>)
    -h, --help              Show this help message
    -V, --version           Show version information

ENVIRONMENT:
    GOOGLE_APPLICATION_CREDENTIALS   Service-account JSON path or inline JSON
    TTS_*                            Configuration overrides
    RUST_LOG                         Log filter (default: info)"#,
        env!("CARGO_PKG_VERSION"),
        DEFAULT_OUT_STEM,
    );
}

fn take_value(iter: &mut std::slice::Iter<'_, String>, flag: &str) -> anyhow::Result<String> {
    iter.next()
        .cloned()
        .with_context(|| format!("{flag} requires a value"))
}

fn parse_args(raw: &[String]) -> anyhow::Result<Option<Args>> {
    let mut args = Args::default();
    let mut iter = raw.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                return Ok(None);
            }
            "-V" | "--version" => {
                println!("tts-speak {}", env!("CARGO_PKG_VERSION"));
                return Ok(None);
            }
            "--credentials" => args.credentials = Some(take_value(&mut iter, arg)?),
            "--config" => args.config = Some(take_value(&mut iter, arg)?.into()),
            "--voice" => args.voice = Some(take_value(&mut iter, arg)?),
            "--language" => args.language = Some(take_value(&mut iter, arg)?),
            "--out" => args.out = Some(take_value(&mut iter, arg)?.into()),
            "--" => {
                args.text.extend(iter.by_ref().cloned());
                break;
            }
            flag if flag.starts_with("--") => bail!("unknown option: {flag}"),
            word => args.text.push(word.to_string()),
        }
    }
    if args.text.is_empty() {
        print_usage();
        bail!("no text given");
    }
    Ok(Some(args))
}

/// Output path used when `--out` is not given, matching the audio container.
fn default_out(format: ContainerFormat) -> PathBuf {
    PathBuf::from(format!("{}.{}", DEFAULT_OUT_STEM, format.extension()))
}

fn credential_source(args: &Args) -> CredentialSource {
    args.credentials
        .as_deref()
        .map(CredentialSource::from_value)
        .unwrap_or(CredentialSource::Environment)
}

fn load_config(args: &Args) -> anyhow::Result<SpeechConfig> {
    let mut config = match &args.config {
        Some(path) => SpeechConfig::from_yaml_file(path)?.with_env_overrides()?,
        None => SpeechConfig::from_env()?,
    };
    if let Some(voice) = &args.voice {
        config.voice.name = voice.clone();
    }
    if let Some(language) = &args.language {
        config.voice.language_code = language.clone();
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let raw: Vec<String> = std::env::args().skip(1).collect();
    let Some(args) = parse_args(&raw)? else {
        return Ok(());
    };

    let config = load_config(&args)?;
    let source = credential_source(&args);

    let pipeline = SpeechPipeline::builder()
        .config(config)
        .credential_source(source)
        .build()?;

    let text = args.text.join(" ");
    let clip = pipeline.speak(&text).await?;

    let out = args.out.unwrap_or_else(|| default_out(clip.format()));
    tokio::fs::write(&out, clip.data())
        .await
        .with_context(|| format!("failed to write {}", out.display()))?;

    match clip.duration() {
        Some(d) => println!("{} ({} bytes, {:.2}s)", out.display(), clip.len(), d.as_secs_f64()),
        None => println!("{} ({} bytes)", out.display(), clip.len()),
    }
    Ok(())
}
