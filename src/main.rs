mod cli;

use streamforge::{config, server, streaming::SEGMENT_LENGTH};
use streamforge_av::{check_tools, get_tool_path, probe_audio_codec, AudioSupport, FFProbe, Prober};
use streamforge_media::segment_count;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};

async fn start_server(
    host: String,
    port: u16,
    config_path: Option<&std::path::Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    config.server.host = host;
    config.server.port = port;

    tracing::info!("Starting Streamforge server");
    match &config.streaming.cache_dir {
        Some(dir) => tracing::info!("Segment cache at {}", dir.display()),
        None => tracing::warn!("No cache_dir configured, live transcoding is disabled"),
    }

    server::start_server(config).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "streamforge=trace,streamforge_av=trace,streamforge_common=debug,tower_http=debug"
                .to_string()
        } else {
            "streamforge=debug,streamforge_av=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Probe { file, json } => probe_file(&file, json, cli.config.as_deref()),
        Commands::CheckTools => run_check_tools(),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("streamforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn probe_file(
    file: &std::path::Path,
    json: bool,
    config_path: Option<&std::path::Path>,
) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let config = config::load_config_or_default(config_path)?;
    let ffprobe = get_tool_path("ffprobe", config.tools.ffprobe_path.as_deref())
        .context("ffprobe is required to probe files")?;

    let video = FFProbe::new(ffprobe).probe(file)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&video)?);
        return Ok(());
    }

    let secs = video.duration as u64;
    println!("File: {}", video.path.display());
    println!(
        "Duration: {:02}:{:02}:{:02} ({:.3}s)",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        video.duration
    );
    println!("Video: {}x{}", video.width, video.height);
    match probe_audio_codec(video.audio_codec.as_deref()) {
        AudioSupport::Supported => {
            println!("Audio: {}", video.audio_codec.as_deref().unwrap_or("none"))
        }
        AudioSupport::MissingUnsupported => println!(
            "Audio: {} (dropped when streaming)",
            video.audio_codec.as_deref().unwrap_or("none")
        ),
    }
    println!(
        "Segments: {} x {}s",
        segment_count(video.duration, SEGMENT_LENGTH),
        SEGMENT_LENGTH
    );

    Ok(())
}

fn run_check_tools() -> Result<()> {
    println!("Checking external tools...\n");

    let tools = check_tools();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install ffmpeg to enable streaming.");
    }

    Ok(())
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            match &config.streaming.cache_dir {
                Some(dir) => println!("  Cache dir: {}", dir.display()),
                None => println!("  Cache dir: unset (live transcoding disabled)"),
            }
            println!(
                "  Max transcode size: {}",
                config.streaming.max_transcode_size
            );
            println!("  Library paths: {}", config.library.paths.len());
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
        }
    }

    Ok(())
}
