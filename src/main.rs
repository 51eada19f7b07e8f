//! Ark Chat CLI
//!
//! Send a prompt to an OpenAI-compatible chat endpoint, or chat in a REPL.
//!
//! Environment Variables:
//!     BASE_URL: Provider endpoint (e.g. https://ark.cn-beijing.volces.com/api/v3)
//!     MODEL: Model or endpoint id
//!     ARK_API_KEY: API key
//!     ARK_TIMEOUT_SECS: Request timeout (default: 120)

use anyhow::Result;
use ark_chat::config::{BASE_URL_VAR, MODEL_VAR};
use ark_chat::{encryption_headers, forward_fragments, ChatClient, Config, Telemetry, Thread};
use clap::{Parser, Subcommand};
use reqwest::header::HeaderMap;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ark-chat")]
#[command(about = "Chat with an OpenAI-compatible model endpoint", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Provider endpoint - overrides BASE_URL
    #[arg(long)]
    base_url: Option<String>,

    /// Model id - overrides MODEL
    #[arg(short, long)]
    model: Option<String>,

    /// System prompt sent before the conversation
    #[arg(short, long)]
    system: Option<String>,

    /// Stream the reply as it is generated
    #[arg(long)]
    stream: bool,

    /// Ask Ark to encrypt the inference session (x-is-encrypted: true)
    #[arg(long)]
    encrypted: bool,

    /// Log directory (default: <data dir>/ark-chat/logs)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Verbose logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a single prompt and print the reply
    Prompt {
        /// The prompt to send
        message: String,
    },

    /// Start an interactive chat session
    Repl,
}

/// Per-run request settings shared by both modes
struct Session {
    client: ChatClient,
    stream: bool,
    headers: Option<HeaderMap>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let log_dir = cli.log_dir.clone().unwrap_or_else(Telemetry::default_log_dir);
    let _telemetry = Telemetry::init(log_dir, cli.verbose)?;

    // CLI flags > environment
    let config = Config::from_lookup(|key| {
        let flag = match key {
            BASE_URL_VAR => cli.base_url.clone(),
            MODEL_VAR => cli.model.clone(),
            _ => None,
        };
        flag.or_else(|| std::env::var(key).ok())
    })?;

    let session = Session {
        client: ChatClient::new(config)?,
        stream: cli.stream,
        headers: cli.encrypted.then(encryption_headers),
    };

    let mut thread = Thread::new(uuid::Uuid::new_v4().to_string());
    if let Some(system) = &cli.system {
        thread = thread.with_system_prompt(system.clone());
    }

    match cli.command {
        Some(Commands::Prompt { message }) => {
            thread.push_user(message);
            let reply = send(&session, &thread).await?;
            if !session.stream {
                println!("{}", reply);
            }
        }
        Some(Commands::Repl) | None => {
            run_repl(&session, &mut thread).await?;
        }
    }

    Ok(())
}

/// Send the thread and return the reply. Streamed replies are echoed as they
/// arrive.
async fn send(session: &Session, thread: &Thread) -> Result<String> {
    let conversation = thread.conversation();
    let headers = session.headers.as_ref();

    if session.stream {
        let stream = session.client.stream_complete(&conversation, headers).await?;
        let mut stdout = std::io::stdout();
        let text = forward_fragments(stream, |fragment| {
            print!("{}", fragment);
            stdout.flush().ok();
        })
        .await?;
        println!();
        Ok(text)
    } else {
        Ok(session.client.complete(&conversation, headers).await?)
    }
}

async fn run_repl(session: &Session, thread: &mut Thread) -> Result<()> {
    println!("Ark Chat REPL");
    println!("Model: {}", session.client.config().model());
    println!("Endpoint: {}", session.client.config().base_url());
    println!();
    print_help();
    println!();

    let mut rl = DefaultEditor::new()?;

    loop {
        let prompt = if thread.is_empty() { "ark> " } else { "ark>> " };

        match rl.readline(prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line)?;

                if line.starts_with('/') {
                    match line {
                        "/quit" | "/exit" => {
                            println!("Goodbye!");
                            break;
                        }
                        "/clear" => {
                            thread.clear();
                            println!("Chat history cleared.");
                        }
                        "/history" => {
                            for message in &thread.messages {
                                println!("[{}] {}", message.role(), message.content());
                            }
                        }
                        "/help" => print_help(),
                        cmd => println!("Unknown command: {}", cmd),
                    }
                    continue;
                }

                thread.push_user(line);
                let reply = send(session, thread).await;
                match reply {
                    Ok(text) => {
                        if !session.stream {
                            println!("{}", text);
                        }
                        println!();
                        thread.push_assistant(text);
                    }
                    Err(e) => {
                        thread.pop_user();
                        eprintln!("Error: {}", e);
                    }
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                break;
            }
        }
    }

    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  /quit, /exit  - Exit the REPL");
    println!("  /clear        - Clear chat history");
    println!("  /history      - Show the conversation so far");
    println!("  /help         - Show this help");
}
