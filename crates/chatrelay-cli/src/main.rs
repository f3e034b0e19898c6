//! ChatRelay — stream one Gemini conversation turn to stdout.

use std::io::Write;
use std::path::PathBuf;

use chatrelay_chat::{create_chat_service, Message, PromptTable, StreamHandlers, StreamParams};
use chatrelay_core::ChatRelayConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

struct Args {
    prompt_type: Option<String>,
    config: Option<PathBuf>,
    prompts: Option<PathBuf>,
    message: Vec<String>,
}

fn resolve_config_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| std::env::var("CHATRELAY_CONFIG").map(PathBuf::from).ok())
        .unwrap_or_else(|| PathBuf::from("chatrelay.json"))
}

fn print_help() {
    println!("ChatRelay — stream a reply from the Gemini API");
    println!();
    println!("Usage: chatrelay [options] <message...>");
    println!("       chatrelay prompts");
    println!();
    println!("Options:");
    println!("  --prompt-type <type>     System prompt to use (default from config)");
    println!("  --config <file>          Config file (default: $CHATRELAY_CONFIG or chatrelay.json)");
    println!("  --prompts <file>         Prompt table JSON (default: built-in)");
    println!();
    println!("Environment:");
    println!("  GEMINI_API_KEY           API key (GOOGLE_API_KEY also accepted)");
    println!("  CHATRELAY_MODEL          Override the configured model");
    println!("  RUST_LOG                 Log filter (default: info)");
}

fn parse_args(raw: &[String]) -> anyhow::Result<Args> {
    let mut args = Args {
        prompt_type: None,
        config: None,
        prompts: None,
        message: Vec::new(),
    };

    let mut iter = raw.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--prompt-type" | "-p" => {
                let v = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--prompt-type needs a value"))?;
                args.prompt_type = Some(v.clone());
            }
            "--config" | "-c" => {
                let v = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config needs a value"))?;
                args.config = Some(PathBuf::from(v));
            }
            "--prompts" => {
                let v = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--prompts needs a value"))?;
                args.prompts = Some(PathBuf::from(v));
            }
            unknown if unknown.starts_with('-') => {
                anyhow::bail!("Unknown option: {}. Use 'chatrelay help' for usage.", unknown);
            }
            _ => args.message.push(arg.clone()),
        }
    }

    Ok(args)
}

fn load_prompts(path: Option<&PathBuf>) -> anyhow::Result<PromptTable> {
    match path {
        Some(p) => PromptTable::load(p)
            .map_err(|e| anyhow::anyhow!("Failed to load prompts from {}: {}", p.display(), e)),
        None => Ok(PromptTable::builtin()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries only model text.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let raw: Vec<String> = std::env::args().skip(1).collect();

    match raw.first().map(String::as_str) {
        None | Some("--help") | Some("-h") | Some("help") => {
            print_help();
            return Ok(());
        }
        Some("prompts") => {
            let args = parse_args(&raw[1..])?;
            let config = ChatRelayConfig::load(&resolve_config_path(args.config));
            let table = load_prompts(args.prompts.as_ref())?;
            for prompt_type in table.prompt_types() {
                let marker = if prompt_type == config.api.default_prompt_type {
                    " (default)"
                } else {
                    ""
                };
                let description = table
                    .get(prompt_type)
                    .and_then(|t| t.description.as_deref())
                    .unwrap_or("");
                println!("{}{}\t{}", prompt_type, marker, description);
            }
            return Ok(());
        }
        Some(_) => {}
    }

    let args = parse_args(&raw)?;
    if args.message.is_empty() {
        anyhow::bail!("No message given. Use 'chatrelay help' for usage.");
    }

    let config_path = resolve_config_path(args.config);
    let config = ChatRelayConfig::load(&config_path);
    config.validate()?;
    info!("Config: {}", config_path.display());

    let prompts = load_prompts(args.prompts.as_ref())?;
    let service = create_chat_service(None, &config, prompts);

    let mut params = StreamParams::new(vec![Message::user(args.message.join(" "))]);
    params.prompt_type = args.prompt_type;

    let handlers = StreamHandlers::new().on_text(|chunk| {
        let mut stdout = std::io::stdout().lock();
        // Write errors on stdout are ignored.
        let _ = stdout.write_all(chunk.as_bytes());
        let _ = stdout.flush();
    });

    let result = service.stream_conversation(params, handlers).await?;
    println!();
    info!("Received {} chars from {}", result.content.len(), service.model_name());

    Ok(())
}
