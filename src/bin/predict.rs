//! Ask a chat model one question through the `ChatModel` abstraction
//!
//! Run with: cargo run --bin predict [-- "your question"]
//!
//! Requires BASE_URL, MODEL and ARK_API_KEY (a `.env` file in the working
//! directory is loaded first).

use ark_chat::{ChatClient, ChatModel, Telemetry};
use clap::Parser;

#[derive(Parser)]
#[command(name = "predict")]
#[command(about = "Invoke a chat model with a single prompt")]
struct Args {
    /// Question to ask
    #[arg(default_value = "什么是LangChain?")]
    prompt: String,

    /// Verbose logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    let _telemetry = Telemetry::init(Telemetry::default_log_dir(), args.verbose)?;

    let chat_model = ChatClient::from_env()?;
    let response = chat_model.invoke(&args.prompt).await?;

    println!("{}", response);
    Ok(())
}
