//! Standard and streaming requests against Volcengine Ark
//!
//! Run with: cargo run --bin hello_world [-- --stream]
//!
//! Only ARK_API_KEY is required; BASE_URL and MODEL default to the Ark
//! cn-beijing endpoint and doubao-1-5-pro-32k-250115.

use ark_chat::{encryption_headers, forward_fragments, ChatClient, Config, Message, Telemetry};
use clap::Parser;
use std::io::Write;

#[derive(Parser)]
#[command(name = "hello_world")]
#[command(about = "Send a greeting to Ark and print the reply")]
struct Args {
    /// Also run the streaming variant of the request
    #[arg(long)]
    stream: bool,

    /// Verbose logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    let _telemetry = Telemetry::init(Telemetry::default_log_dir(), args.verbose)?;

    let client = ChatClient::new(Config::ark_from_env()?)?;
    let messages = [Message::system("你是人工智能助手."), Message::user("你好")];
    // free application-layer encryption of the inference session
    let headers = encryption_headers();

    println!("----- standard request -----");
    let reply = client.complete(&messages, Some(&headers)).await?;
    println!("{}", reply);

    if args.stream {
        println!("----- streaming request -----");
        let stream = client.stream_complete(&messages, Some(&headers)).await?;
        let mut stdout = std::io::stdout();
        forward_fragments(stream, |fragment| {
            print!("{}", fragment);
            stdout.flush().ok();
        })
        .await?;
        println!();
    }

    Ok(())
}
