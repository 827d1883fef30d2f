//! Client execution logic with reconnection support.

use std::{future::Future, io::Write, sync::Arc};

use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::{mpsc, watch};

use crate::{
    config::{ClientConfig, OutputFormat},
    domain::count_failure,
    error::ClientError,
    formatter::{MessageRenderer, RenderedMessage},
    session::ChatClient,
    setup::JoinRequest,
    stomp::StompConnector,
    transport::Connector,
    ui::{MessageList, StatusIndicator, prompt, redisplay_prompt},
};

/// Messages kept inside the scrolled viewport
const MESSAGE_VIEWPORT: usize = 50;

/// Shown when a line is typed while the connection is down
const NOT_CONNECTED_NOTICE: &str = "not connected; message not sent";

/// Run the chat client against the configured endpoint until the user quits
pub async fn run_client(config: ClientConfig, request: JoinRequest) -> Result<(), ClientError> {
    let connector = Arc::new(StompConnector::new(&config.endpoint)?);
    let input = spawn_input_reader(prompt(&request.username));
    let mut stdout = std::io::stdout();

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Interrupted");
    };

    run_session(connector, &config, &request, input, &mut stdout, shutdown).await
}

/// Drive one chat session: join, then relay input and inbound messages,
/// reconnecting under the configured retry policy.
///
/// Returns when `input` closes or `shutdown` resolves (after leaving the
/// room), or when reconnection is abandoned.
///
/// # Errors
///
/// * `ClientError::Validation` - the join request was rejected
/// * `ClientError::RetriesExhausted` - the retry cap was reached
/// * `ClientError::MalformedEnvelope` - the server sent an unparseable message
pub async fn run_session<F>(
    connector: Arc<dyn Connector>,
    config: &ClientConfig,
    request: &JoinRequest,
    mut input: mpsc::UnboundedReceiver<String>,
    out: &mut dyn Write,
    shutdown: F,
) -> Result<(), ClientError>
where
    F: Future<Output = ()>,
{
    let mut client = ChatClient::new(connector, config.destinations.clone());
    let mut status_rx = client.subscribe_status();
    let renderer = MessageRenderer::new(request.username.as_str(), config.utc_offset);
    let mut messages = MessageList::new(MESSAGE_VIEWPORT);
    tokio::pin!(shutdown);

    if config.retry.is_unbounded() {
        tracing::warn!(
            "Reconnecting every {:?} with no retry cap; pass --max-retries to bound it",
            config.retry.interval
        );
    }

    let mut failures: u32 = match client
        .join(&request.username, request.role, &request.room_id)
        .await
    {
        Ok(()) => 0,
        Err(ClientError::Connection(_)) => 1,
        Err(e) => return Err(e),
    };
    write_status(out, &mut status_rx, config.output)?;

    loop {
        if !client.is_connected() {
            let Some(delay) = config.retry.delay_for(failures) else {
                tracing::error!("Failed to reconnect after {} attempts. Exiting.", failures);
                client.leave().await;
                return Err(ClientError::RetriesExhausted { attempts: failures });
            };

            tracing::info!(
                "Reconnecting in {:?}... (attempt {})",
                delay,
                count_failure(failures)
            );

            let sleep = tokio::time::sleep(delay);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    _ = &mut sleep => break,
                    line = input.recv() => match line {
                        Some(_) => {
                            writeln!(out, "{}", NOT_CONNECTED_NOTICE)?;
                            out.flush()?;
                        }
                        None => {
                            client.leave().await;
                            return Ok(());
                        }
                    },
                    _ = &mut shutdown => {
                        client.leave().await;
                        return Ok(());
                    }
                }
            }

            let attempt = tokio::select! {
                result = client.connect() => result,
                _ = &mut shutdown => {
                    client.leave().await;
                    return Ok(());
                }
            };
            match attempt {
                Ok(()) => failures = 0,
                Err(ClientError::Connection(_)) => failures = count_failure(failures),
                Err(e) => return Err(e),
            }
            write_status(out, &mut status_rx, config.output)?;
            continue;
        }

        tokio::select! {
            inbound = client.next_envelope() => match inbound? {
                Some(envelope) => {
                    let rendered = messages.push(renderer.render(&envelope));
                    write_message(out, rendered, config.output, &request.username)?;
                }
                None => failures = 1,
            },
            line = input.recv() => match line {
                Some(line) => match client.send(&line).await {
                    Ok(_) => {}
                    Err(e @ ClientError::ContentTooLong { .. }) => {
                        writeln!(out, "{}", e)?;
                    }
                    Err(ClientError::Connection(e)) => {
                        tracing::warn!("Failed to send message: {}", e);
                        failures = 1;
                    }
                    Err(e) => return Err(e),
                },
                None => {
                    client.leave().await;
                    write_status(out, &mut status_rx, config.output)?;
                    return Ok(());
                }
            },
            _ = &mut shutdown => {
                client.leave().await;
                write_status(out, &mut status_rx, config.output)?;
                return Ok(());
            }
        }
        write_status(out, &mut status_rx, config.output)?;
    }
}

/// Print the status line if it changed since the last call
fn write_status(
    out: &mut dyn Write,
    status_rx: &mut watch::Receiver<StatusIndicator>,
    format: OutputFormat,
) -> Result<(), ClientError> {
    if !status_rx.has_changed().unwrap_or(false) {
        return Ok(());
    }
    let status = status_rx.borrow_and_update().clone();

    match format {
        OutputFormat::Terminal => writeln!(out, "\n[{}]", status.to_line())?,
        OutputFormat::Html => tracing::info!("Status: {}", status.to_line()),
    }
    out.flush()?;
    Ok(())
}

fn write_message(
    out: &mut dyn Write,
    message: &RenderedMessage,
    format: OutputFormat,
    username: &str,
) -> Result<(), ClientError> {
    match format {
        OutputFormat::Terminal => {
            write!(out, "{}", message.to_terminal())?;
            redisplay_prompt(out, username)?;
        }
        OutputFormat::Html => {
            writeln!(out, "{}", message.to_html())?;
            out.flush()?;
        }
    }
    Ok(())
}

/// Read lines on a blocking thread and forward them to the session.
///
/// The channel closes on Ctrl+C, Ctrl+D or a readline failure.
pub fn spawn_input_reader(prompt: String) -> mpsc::UnboundedReceiver<String> {
    let (input_tx, input_rx) = mpsc::unbounded_channel::<String>();

    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                tracing::error!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str()).ok();
                    }
                    if input_tx.send(line).is_err() {
                        // Session ended
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    input_rx
}
