// src/view/terminal.rs
use std::sync::Arc;

use anyhow::Result;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    sync::mpsc,
};
use tracing::{debug, info, warn};

use crate::{
    error::{ClientError, SubmitError},
    services::chat_client::ChatBackend,
    state::{ChatView, PendingRequest, RequestToken, Settlement},
    view::render::{TYPING_INDICATOR, render_delivery, render_message, render_transcript},
};

const HELP: &str = "Commands: /retry   resend the last failed message\n          /export  print the conversation as JSON\n          /history show the conversation so far\n          /help    show this help\n          /quit    leave\nStart a message with // to send a leading slash.";

type Outcome = (RequestToken, Result<String, ClientError>);

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Retry,
    Export,
    History,
    Help,
    Quit,
    Unknown(String),
    Message(String),
}

fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    if let Some(rest) = trimmed.strip_prefix("//") {
        return Command::Message(format!("/{rest}"));
    }
    let Some(cmd) = trimmed.strip_prefix('/') else {
        return Command::Message(line.to_string());
    };
    match cmd {
        "retry" => Command::Retry,
        "export" => Command::Export,
        "history" => Command::History,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => Command::Unknown(other.to_string()),
    }
}

async fn say<W: AsyncWrite + Unpin>(out: &mut W, text: &str) -> std::io::Result<()> {
    out.write_all(text.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await
}

/// Interactive chat over stdin/stdout.
pub async fn run<B>(backend: Arc<B>) -> Result<()>
where
    B: ChatBackend + 'static,
{
    run_with(BufReader::new(tokio::io::stdin()), tokio::io::stdout(), backend).await
}

/// Chat loop over any line source and sink. Replies are awaited on a spawned
/// task so input keeps being read while one is outstanding.
pub async fn run_with<R, W, B>(mut input: R, mut out: W, backend: Arc<B>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    B: ChatBackend + 'static,
{
    let mut view = ChatView::new();
    let mut buf = Vec::new();
    let (tx, mut rx) = mpsc::unbounded_channel::<Outcome>();

    say(&mut out, "AI Assistant. Ask me anything! (/help for commands)").await?;

    loop {
        tokio::select! {
            read = input.read_until(b'\n', &mut buf) => {
                match read {
                    Ok(0) if buf.is_empty() => {
                        debug!("input closed");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "reading input failed");
                        break;
                    }
                }

                let bytes = std::mem::take(&mut buf);
                let line = match String::from_utf8(bytes) {
                    Ok(line) => line,
                    Err(_) => {
                        say(&mut out, "  input was not valid UTF-8, ignored").await?;
                        continue;
                    }
                };
                let line = line.trim_end_matches(['\n', '\r']);

                match parse_command(line) {
                    Command::Quit => break,
                    Command::Help => say(&mut out, HELP).await?,
                    Command::History => {
                        let transcript = render_transcript(view.messages(), |m| view.delivery(m.id));
                        out.write_all(transcript.as_bytes()).await?;
                        out.flush().await?;
                    }
                    Command::Export => {
                        let json = serde_json::to_string_pretty(&view.to_chat("Current Chat"))?;
                        say(&mut out, &json).await?;
                    }
                    Command::Retry => match view.retry_last_failed() {
                        Ok(pending) => {
                            say(&mut out, &format!("  retrying: {}", pending.text)).await?;
                            dispatch(&backend, &tx, pending, &mut out).await?;
                        }
                        Err(e) => say(&mut out, &format!("  {e}")).await?,
                    },
                    Command::Unknown(cmd) => {
                        say(&mut out, &format!("  unknown command /{cmd} (// sends a leading slash)")).await?;
                    }
                    Command::Message(text) => {
                        view.set_input(text);
                        match view.submit() {
                            Ok(pending) => {
                                if let Some(msg) = view.messages().last() {
                                    say(&mut out, &render_message(msg)).await?;
                                }
                                dispatch(&backend, &tx, pending, &mut out).await?;
                            }
                            Err(SubmitError::EmptyInput) => {}
                            Err(e) => {
                                view.set_input("");
                                say(&mut out, &format!("  {e}")).await?;
                            }
                        }
                    }
                }
            }
            Some((token, outcome)) = rx.recv() => {
                show(&mut view, token, outcome, &mut out).await?;
            }
        }
    }

    if view.is_loading() {
        info!("waiting for the outstanding reply before exiting");
        if let Some((token, outcome)) = rx.recv().await {
            show(&mut view, token, outcome, &mut out).await?;
        }
    }

    Ok(())
}

async fn dispatch<B, W>(
    backend: &Arc<B>,
    tx: &mpsc::UnboundedSender<Outcome>,
    pending: PendingRequest,
    out: &mut W,
) -> std::io::Result<()>
where
    B: ChatBackend + 'static,
    W: AsyncWrite + Unpin,
{
    say(out, TYPING_INDICATOR).await?;

    let backend = Arc::clone(backend);
    let tx = tx.clone();
    tokio::spawn(async move {
        let outcome = backend.send_message(pending.text).await;
        // The loop may already be gone; nothing to deliver to then.
        let _ = tx.send((pending.token, outcome));
    });
    Ok(())
}

async fn show<W: AsyncWrite + Unpin>(
    view: &mut ChatView,
    token: RequestToken,
    outcome: Result<String, ClientError>,
    out: &mut W,
) -> std::io::Result<()> {
    match view.settle(token, outcome) {
        Settlement::Replied(id) => {
            if let Some(reply) = view.messages().iter().find(|m| m.id == id) {
                say(out, &render_message(reply)).await?;
            }
        }
        Settlement::Failed(id) => {
            if let Some(marker) = view.delivery(id).and_then(render_delivery) {
                say(out, &marker).await?;
            }
        }
        Settlement::Stale => {}
    }
    Ok(())
}
