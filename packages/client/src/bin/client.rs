//! DentalChat terminal client.
//!
//! Asks for a name, role and room (unless given on the command line or by
//! the signed-in account), joins the room and relays chat until Ctrl+C or
//! Ctrl+D. Lost connections are retried every 5 seconds by default.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin dentalchat-client -- --username Alice --room room1
//! cargo run --bin dentalchat-client -- -u ws://chat.example.com/chat/websocket --max-retries 5
//! ```

use std::{path::PathBuf, time::Duration};

use clap::Parser;

use dentalchat_client::{
    config::{AuthenticatedUser, ClientConfig, DEFAULT_ENDPOINT, Identity, OutputFormat},
    domain::RetryPolicy,
    envelope::Role,
    error::ClientError,
    setup::{JoinRequest, SetupForm, prompt_setup},
};
use dentalchat_shared::{
    logger::setup_logger,
    time::{DEFAULT_UTC_OFFSET_HOURS, offset_from_hours},
};

#[derive(Parser, Debug)]
#[command(name = "dentalchat-client")]
#[command(about = "Chat with the clinic from your terminal", long_about = None)]
struct Args {
    /// WebSocket endpoint of the chat server
    #[arg(short = 'u', long, env = "DENTALCHAT_URL", default_value = DEFAULT_ENDPOINT)]
    url: String,

    /// Display name (at least 2 characters)
    #[arg(short = 'n', long, env = "DENTALCHAT_USERNAME")]
    username: Option<String>,

    /// Role shown next to your messages
    #[arg(long, value_enum, env = "DENTALCHAT_ROLE")]
    role: Option<Role>,

    /// Room to join
    #[arg(short = 'r', long, env = "DENTALCHAT_ROOM")]
    room: Option<String>,

    /// JSON file with the signed-in account: {"username": .., "isAdmin": ..}
    #[arg(long)]
    auth_file: Option<PathBuf>,

    /// Seconds between reconnect attempts
    #[arg(long, env = "DENTALCHAT_RETRY_INTERVAL_SECS", default_value_t = 5)]
    retry_interval_secs: u64,

    /// Give up after this many failed attempts (retries forever if omitted)
    #[arg(long, env = "DENTALCHAT_MAX_RETRIES")]
    max_retries: Option<u32>,

    /// Multiply the reconnect delay by this factor after each failure
    #[arg(long, env = "DENTALCHAT_BACKOFF", default_value_t = 1.0)]
    backoff: f64,

    /// Upper bound for the reconnect delay when backing off
    #[arg(long, env = "DENTALCHAT_MAX_RETRY_INTERVAL_SECS", default_value_t = 60)]
    max_retry_interval_secs: u64,

    /// Offset from UTC used to display message times
    #[arg(long, env = "DENTALCHAT_UTC_OFFSET_HOURS", default_value_t = DEFAULT_UTC_OFFSET_HOURS, allow_hyphen_values = true)]
    utc_offset_hours: i32,

    /// Output format for messages
    #[arg(long, value_enum, env = "DENTALCHAT_FORMAT", default_value_t = OutputFormat::Terminal)]
    format: OutputFormat,
}

impl Args {
    fn client_config(&self) -> ClientConfig {
        ClientConfig {
            endpoint: self.url.clone(),
            retry: RetryPolicy {
                interval: Duration::from_secs(self.retry_interval_secs),
                max_attempts: self.max_retries,
                backoff_multiplier: self.backoff,
                max_interval: Duration::from_secs(self.max_retry_interval_secs),
            },
            utc_offset: offset_from_hours(self.utc_offset_hours),
            output: self.format,
            ..ClientConfig::default()
        }
    }
}

async fn setup(args: &Args) -> Result<Option<JoinRequest>, ClientError> {
    let authenticated = AuthenticatedUser::load(args.auth_file.as_deref())?;
    let identity = Identity::resolve(authenticated, args.username.clone(), args.role);
    let form = SetupForm::new(identity, args.role.is_some(), args.room.clone());

    if let Ok(request) = form.submit() {
        return Ok(Some(request));
    }

    tokio::task::spawn_blocking(move || prompt_setup(form))
        .await
        .map_err(|e| ClientError::Input(e.to_string()))?
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    let config = args.client_config();

    let request = match setup(&args).await {
        Ok(Some(request)) => request,
        Ok(None) => return,
        Err(e) => {
            tracing::error!("Setup error: {}", e);
            std::process::exit(1);
        }
    };

    // Run the client
    if let Err(e) = dentalchat_client::run_client(config, request).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
