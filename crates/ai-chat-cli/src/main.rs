mod logging;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ai_chat_core::{
    ChatConfig, ChatStreamChunk, ChunkEvent, Message, ToolCall, ToolResult, ToolSchema, WireChunk,
};
use ai_chat_loop::{ChatOrchestrator, SendOptions, ToolCallHandler, ToolError};
use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use futures::StreamExt;

#[derive(Parser)]
#[command(name = "ai-chat")]
#[command(about = "Chat with an OpenAI-compatible endpoint, including tool calls")]
#[command(version)]
struct Cli {
    /// API base URL, e.g. https://api.openai.com/v1
    #[arg(long, env = "AI_CHAT_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "AI_CHAT_MODEL")]
    model: Option<String>,

    #[arg(long, env = "AI_CHAT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// System prompt placed at the front of the conversation
    #[arg(long)]
    system: Option<String>,

    #[arg(long)]
    temperature: Option<f32>,

    #[arg(long)]
    max_tokens: Option<u32>,

    /// JSON file holding an array of tool schemas; calls are answered with their arguments
    #[arg(long)]
    tools: Option<PathBuf>,

    /// Enable debug mode
    #[arg(long, short, default_value = "false")]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream a reply chunk by chunk
    Send {
        /// Message content
        message: String,

        /// Print each chunk as a JSON line instead of text
        #[arg(long)]
        json: bool,
    },
    /// Wait for the whole reply and print it
    Complete {
        /// Message content
        message: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.debug);

    let config = resolve_config(&cli);
    log::debug!("Using endpoint {} with model {}", config.base_url, config.model);
    let orchestrator = ChatOrchestrator::from_config(config)?;

    let mut options = SendOptions::new();
    if let Some(system) = &cli.system {
        options = options.with_system_prompt(system.clone());
    }
    if let Some(path) = &cli.tools {
        let tools = load_tools(path)?;
        log::info!("Registered {} tool(s) from {}", tools.len(), path.display());
        options = options
            .with_tools(tools)
            .with_tool_handler(echo_handler());
    }

    match cli.command {
        Commands::Send { message, json } => {
            stream_reply(&orchestrator, &message, options, json).await
        }
        Commands::Complete { message } => complete_reply(&orchestrator, &message, options).await,
    }
}

/// Stored config, then flags. Flags win.
fn resolve_config(cli: &Cli) -> ChatConfig {
    let mut config = ChatConfig::load();
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    if let Some(api_key) = &cli.api_key {
        config.api_key = Some(api_key.clone());
    }
    if cli.temperature.is_some() {
        config.temperature = cli.temperature;
    }
    if cli.max_tokens.is_some() {
        config.max_tokens = cli.max_tokens;
    }
    config
}

fn load_tools(path: &Path) -> anyhow::Result<Vec<ToolSchema>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading tools file {}", path.display()))?;
    let tools = serde_json::from_str(&content)
        .with_context(|| format!("parsing tools file {}", path.display()))?;
    Ok(tools)
}

/// Answers every tool call with its own parsed arguments.
fn echo_handler() -> Arc<dyn ToolCallHandler> {
    Arc::new(|call: ToolCall| async move {
        let arguments = call
            .parse_arguments()
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        Ok::<_, ToolError>(ToolResult::success(call.id, arguments))
    })
}

async fn stream_reply(
    orchestrator: &ChatOrchestrator,
    message: &str,
    options: SendOptions,
    json: bool,
) -> anyhow::Result<()> {
    let mut stream = orchestrator.send_message(vec![Message::user(message)], options);
    let mut stdout = io::stdout();
    let mut failed = false;

    while let Some(chunk) = stream.next().await {
        if chunk.error_message().is_some() {
            failed = true;
        }
        if json {
            writeln!(stdout, "{}", serde_json::to_string(&WireChunk::from(&chunk))?)?;
        } else {
            render_chunk(&mut stdout, &chunk)?;
        }
        stdout.flush()?;
    }

    if failed {
        anyhow::bail!("chat turn failed");
    }
    Ok(())
}

fn render_chunk(out: &mut impl Write, chunk: &ChatStreamChunk) -> io::Result<()> {
    match &chunk.event {
        ChunkEvent::Content { content } => write!(out, "{}", content),
        ChunkEvent::ToolCallsDetected { tool_calls } => {
            for call in tool_calls {
                writeln!(
                    out,
                    "\n{}",
                    format!("🔧 {}({})", call.name(), call.function.arguments).yellow()
                )?;
            }
            Ok(())
        }
        ChunkEvent::ToolExecuting { tool } => {
            writeln!(out, "{}", format!("⏳ running {} [{}]", tool.name, tool.id).dimmed())
        }
        ChunkEvent::ToolResults { results } if results.len() == 1 => {
            let result = &results[0];
            writeln!(
                out,
                "{}",
                format!("✅ {} → {}", result.tool_call_id, result.to_message_content()).green()
            )
        }
        ChunkEvent::ToolResults { .. } | ChunkEvent::Metadata => Ok(()),
        ChunkEvent::ToolError { error } => writeln!(
            out,
            "{}",
            format!("❌ {} ({}): {}", error.tool_name, error.tool_call_id, error.error).red()
        ),
        ChunkEvent::Done => {
            writeln!(out)?;
            if let Some(usage) = &chunk.meta.usage {
                writeln!(
                    out,
                    "{}",
                    format!(
                        "📊 tokens: {} prompt + {} completion = {}",
                        usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
                    )
                    .dimmed()
                )?;
            }
            Ok(())
        }
        ChunkEvent::Error { message, .. } => {
            writeln!(out, "\n{}", format!("❌ Error: {}", message).red())
        }
    }
}

async fn complete_reply(
    orchestrator: &ChatOrchestrator,
    message: &str,
    options: SendOptions,
) -> anyhow::Result<()> {
    let response = orchestrator
        .send_message_complete(vec![Message::user(message)], options)
        .await?;

    println!("{}", response.message.content);
    println!(
        "{}",
        format!(
            "model={} finish={} tokens={}",
            response.model, response.finish_reason, response.usage.total_tokens
        )
        .dimmed()
    );
    Ok(())
}
