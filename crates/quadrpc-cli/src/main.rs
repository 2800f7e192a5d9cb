//! # QuadRPC CLI Entry Point
//!
//! Main binary for QuadRPC. Serves the demo services, makes calls of every
//! pattern and runs the reference scenarios.
//!
//! ## Usage
//!
//! ```bash
//! # Serve the demo services
//! quadrpc serve -b 127.0.0.1:50051
//!
//! # Unary call (outputs raw JSON)
//! quadrpc call 127.0.0.1:50051 calculator.sum -a '{"a": 5, "b": 45}'
//!
//! # Server stream: one JSON line per message
//! quadrpc call 127.0.0.1:50051 calculator.prime_decomposition \
//!   --pattern server_stream -a '{"number": 120}'
//!
//! # Client and bidi streams take a JSON array of messages
//! quadrpc call 127.0.0.1:50051 calculator.compute_average \
//!   --pattern client_stream -a '[{"number": 1}, {"number": 2}]'
//!
//! # Run the reference scenarios in-process
//! quadrpc demo
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use argh::FromArgs;
use futures_util::stream;
use quadrpc_cli::demo::{run_scenarios, DemoConfig};
use quadrpc_client::{CallOptions, QuadrpcClient};
use quadrpc_common::{ChannelConfig, Pattern, Payload, Status};
use quadrpc_core::{drive_receive, drive_send};
use quadrpc_server::services::{demo_router, GreetService};
use quadrpc_server::{MemoryBlogStore, Server, ServerConfig, TcpServer};

/// Main CLI structure parsed from command-line arguments.
#[derive(FromArgs)]
/// QuadRPC - four-pattern RPC calls
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

/// Available CLI subcommands.
///
/// - **Serve**: Start the demo services over TCP
/// - **Call**: Make a single call (unix-friendly JSON output)
/// - **Demo**: Run the reference scenarios in-process
#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Serve(ServeArgs),
    Call(CallArgs),
    Demo(DemoArgs),
}

/// Arguments for serving the demo services.
///
/// # Example
///
/// ```bash
/// quadrpc serve -b 0.0.0.0:50051 --max-call-time-ms 30000
/// ```
#[derive(FromArgs)]
#[argh(subcommand, name = "serve")]
/// serve the demo calculator, greet and blog services
struct ServeArgs {
    /// address to bind the TCP listener to
    ///
    /// Defaults to "127.0.0.1:50051". Port 0 picks a free port; the actual
    /// bound address is logged at startup.
    #[argh(option, short = 'b', default = "\"127.0.0.1:50051\".into()")]
    bind: String,

    /// messages buffered per call direction
    ///
    /// Overrides QUADRPC_CHANNEL_CAPACITY. Defaults to 8.
    #[argh(option, long = "capacity")]
    capacity: Option<usize>,

    /// optional upper bound on any call's lifetime, in milliseconds
    ///
    /// Caller timeouts longer than this are shortened; calls without a
    /// timeout get this one. Must be between 1 and 3600000 (1 hour).
    #[argh(option, long = "max-call-time-ms")]
    max_call_time_ms: Option<u64>,

    /// pause between streamed greetings, in milliseconds
    ///
    /// Paces `greet.greet_many_times` and sets the length of one unit of
    /// work in `greet.greet_with_deadline`. Defaults to 1000ms.
    #[argh(option, long = "greet-interval-ms", default = "1000")]
    greet_interval_ms: u64,
}

/// Arguments for making a single call.
///
/// # Output Format
///
/// Every streamed message and the final value (unless null) are written to
/// stdout as raw JSON, one per line. Errors go to stderr with a non-zero
/// exit code.
#[derive(FromArgs)]
#[argh(subcommand, name = "call")]
/// call a method on a QuadRPC server
struct CallArgs {
    /// address of the server to call (e.g. 127.0.0.1:50051)
    #[argh(positional)]
    server_address: String,

    /// name of the method to call, e.g. calculator.sum
    #[argh(positional)]
    method: String,

    /// JSON request
    ///
    /// A single message for unary and server_stream calls, an array of
    /// messages for client_stream and bidi_stream calls. Defaults to `{}`.
    #[argh(option, short = 'a', long = "args", default = "\"{}\".into()")]
    args: String,

    /// call pattern: unary, server_stream, client_stream or bidi_stream
    #[argh(option, short = 'p', long = "pattern", default = "\"unary\".into()")]
    pattern: String,

    /// optional timeout for the whole call in milliseconds
    #[argh(option, long = "timeout-ms")]
    timeout_ms: Option<u64>,
}

/// Arguments for the in-process scenario run.
#[derive(FromArgs)]
#[argh(subcommand, name = "demo")]
/// run the reference scenarios in-process
struct DemoArgs {
    /// pause between names in the bidi scenario, in milliseconds
    #[argh(option, long = "pacing-ms", default = "1000")]
    pacing_ms: u64,

    /// deadline of the bidi scenario, in milliseconds
    #[argh(option, long = "deadline-ms", default = "2000")]
    deadline_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // call: keep output clean for unix tool usage (piping to jq, etc.)
    if !matches!(cli.command, Commands::Call(_)) {
        // Set default log level to INFO, but allow RUST_LOG env var to override
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    match cli.command {
        Commands::Serve(args) => run_serve(args).await,
        Commands::Call(args) => run_call(args).await,
        Commands::Demo(args) => run_demo(args).await,
    }
}

fn server_config(args: &ServeArgs) -> Result<ServerConfig> {
    let mut channel = ChannelConfig::from_env();
    if let Some(capacity) = args.capacity {
        channel = channel.with_capacity(capacity);
    }

    let mut config = ServerConfig::new().with_channel(channel);
    if let Some(ms) = args.max_call_time_ms {
        config = config.with_max_call_time(Duration::from_millis(ms));
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid server configuration: {}", e))?;
    Ok(config)
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = server_config(&args)?;
    tracing::info!("Channel capacity: {}", config.channel.capacity);
    if let Some(limit) = config.max_call_time {
        tracing::info!("Maximum call time: {}ms", limit.as_millis());
    }

    let greet = GreetService::new().with_interval(Duration::from_millis(args.greet_interval_ms));
    let router = demo_router(greet, Arc::new(MemoryBlogStore::new()));
    tracing::info!("Registered {} methods", router.len());

    let server = Arc::new(Server::new(router).with_config(config));
    let tcp = TcpServer::bind(&args.bind).await?;
    tracing::info!("Listening on {}", tcp.local_addr()?);

    tcp.run(server).await?;
    Ok(())
}

/// Executes the `call` subcommand.
///
/// No tracing/logging is initialized for this command to keep output clean.
///
/// # Errors
///
/// Returns an error if the arguments are not valid JSON or do not fit the
/// pattern, or if the call ends with an error status.
async fn run_call(args: CallArgs) -> Result<()> {
    let pattern: Pattern = args.pattern.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let request: Payload = serde_json::from_str(&args.args)
        .map_err(|e| anyhow::anyhow!("Invalid JSON in args: {}", e))?;

    let mut options = CallOptions::new();
    if let Some(ms) = args.timeout_ms {
        options = options.with_timeout(Duration::from_millis(ms));
    }
    let client = QuadrpcClient::new(&args.server_address).with_channel_config(ChannelConfig::from_env());

    let outcome = match pattern {
        Pattern::Unary => client.unary(&args.method, request, options).await,
        Pattern::ServerStream => {
            let call = client
                .server_streaming(&args.method, request, options)
                .await
                .map_err(status_error)?;
            let _ = drive_receive(call.handle(), print_message).await;
            call.finish().await
        }
        Pattern::ClientStream | Pattern::BidiStream => {
            let messages = request_messages(request)?;
            let call = client
                .call(&args.method, pattern, options)
                .await
                .map_err(status_error)?;
            let source = stream::iter(messages.into_iter().map(Ok));
            let _ = tokio::join!(
                drive_send(call.handle(), source),
                drive_receive(call.handle(), print_message)
            );
            call.finish().await
        }
    };

    match outcome {
        Ok(value) => {
            if !value.is_null() {
                println!("{}", serde_json::to_string(&value)?);
            }
            Ok(())
        }
        Err(status) => Err(status_error(status)),
    }
}

async fn run_demo(args: DemoArgs) -> Result<()> {
    let config = DemoConfig {
        pacing: Duration::from_millis(args.pacing_ms),
        deadline: Duration::from_millis(args.deadline_ms),
    };

    let reports = run_scenarios(config).await;
    let failed = reports.iter().filter(|r| !r.passed).count();
    for report in &reports {
        let mark = if report.passed { "PASS" } else { "FAIL" };
        println!("[{}] {}: {}", mark, report.name, report.observed);
    }

    if failed > 0 {
        anyhow::bail!("{} of {} scenarios failed", failed, reports.len());
    }
    Ok(())
}

fn print_message(message: Payload) -> std::result::Result<(), Status> {
    println!("{}", message);
    Ok(())
}

/// Streaming requests are given as a JSON array, one element per message.
fn request_messages(request: Payload) -> Result<Vec<Payload>> {
    match request {
        Payload::Array(messages) => Ok(messages),
        _ => Err(anyhow::anyhow!(
            "client_stream and bidi_stream calls take a JSON array of messages"
        )),
    }
}

fn status_error(status: Status) -> anyhow::Error {
    anyhow::anyhow!("call failed with {}", status)
}
