use chatbot_client::error::ClientError;
use chatbot_client::message::ChatResponse;
use chatbot_client::services::chat_client::ChatBackend;
use chatbot_client::view::terminal::run_with;

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Canned outcomes; when gated, each reply waits for a `notify_one`.
struct TestBackend {
    outcomes: Mutex<VecDeque<Result<String, ClientError>>>,
    gate: Option<Arc<Notify>>,
}

impl TestBackend {
    fn new(outcomes: Vec<Result<String, ClientError>>, gate: Option<Arc<Notify>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            gate,
        }
    }
}

impl ChatBackend for TestBackend {
    fn send_message(
        &self,
        _message: String,
    ) -> impl Future<Output = Result<String, ClientError>> + Send {
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .expect("backend called more often than scripted");
        let gate = self.gate.clone();
        async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            outcome
        }
    }
}

fn decode_error() -> ClientError {
    ClientError::Decode(serde_json::from_str::<ChatResponse>("<html>").unwrap_err())
}

struct Session {
    input: DuplexStream,
    output: Lines<BufReader<DuplexStream>>,
    handle: JoinHandle<anyhow::Result<()>>,
}

fn start(backend: TestBackend) -> Session {
    let (input, loop_input) = tokio::io::duplex(64 * 1024);
    let (loop_output, output) = tokio::io::duplex(64 * 1024);
    let handle = tokio::spawn(run_with(
        BufReader::new(loop_input),
        loop_output,
        Arc::new(backend),
    ));
    Session {
        input,
        output: BufReader::new(output).lines(),
        handle,
    }
}

impl Session {
    async fn send(&mut self, bytes: &[u8]) {
        self.input.write_all(bytes).await.unwrap();
    }

    /// Read output until a line contains `needle`.
    async fn expect(&mut self, needle: &str) -> String {
        let output = &mut self.output;
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let line = output
                    .next_line()
                    .await
                    .unwrap()
                    .unwrap_or_else(|| panic!("output closed before `{needle}`"));
                if line.contains(needle) {
                    return line;
                }
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for `{needle}`"))
    }

    async fn finish(self) {
        drop(self.input);
        let result = tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("loop did not exit")
            .unwrap();
        assert!(result.is_ok(), "loop failed: {result:?}");
    }
}

#[tokio::test]
async fn echoes_user_message_and_refuses_input_while_waiting() {
    let gate = Arc::new(Notify::new());
    let mut session = start(TestBackend::new(vec![Ok("Hi there".into())], Some(gate.clone())));

    session.send(b"Hello\n").await;
    session.expect("] you: Hello").await;
    session.expect("assistant is typing").await;

    session.send(b"Again\n").await;
    session.expect("still waiting for the previous reply").await;

    gate.notify_one();
    session.expect("] assistant: Hi there").await;

    session.send(b"/history\n").await;
    session.expect("] you: Hello").await;
    let line = session.expect("assistant: Hi there").await;
    assert!(!line.contains("Again"));

    session.finish().await;
}

#[tokio::test]
async fn failure_marker_then_retry_gets_the_reply() {
    let mut session = start(TestBackend::new(
        vec![Err(decode_error()), Ok("Hi there".into())],
        None,
    ));

    session.send(b"Hello\n").await;
    session.expect("! not delivered").await;

    session.send(b"/retry\n").await;
    session.expect("retrying: Hello").await;
    session.expect("] assistant: Hi there").await;

    session.send(b"/export\n").await;
    session.expect("\"createdAt\"").await;

    session.send(b"/quit\n").await;
    session.finish().await;
}

#[tokio::test]
async fn end_of_input_waits_for_outstanding_reply() {
    let gate = Arc::new(Notify::new());
    let mut session = start(TestBackend::new(vec![Ok("Hi there".into())], Some(gate.clone())));

    session.send(b"Hello\n").await;
    session.expect("assistant is typing").await;

    let Session {
        input,
        mut output,
        handle,
    } = session;
    drop(input);
    gate.notify_one();

    let mut saw_reply = false;
    while let Some(line) = tokio::time::timeout(Duration::from_secs(5), output.next_line())
        .await
        .expect("timed out reading output")
        .unwrap()
    {
        saw_reply |= line.contains("] assistant: Hi there");
    }
    assert!(saw_reply);
    assert!(handle.await.unwrap().is_ok());
}

#[tokio::test]
async fn invalid_utf8_line_does_not_end_the_session() {
    let gate = Arc::new(Notify::new());
    let mut session = start(TestBackend::new(vec![Ok("Hi there".into())], Some(gate.clone())));

    session.send(b"Hello\n").await;
    session.expect("assistant is typing").await;

    session.send(b"\xff\n").await;
    session.expect("not valid UTF-8").await;

    gate.notify_one();
    session.expect("] assistant: Hi there").await;
    session.finish().await;
}

#[tokio::test]
async fn double_slash_sends_text_starting_with_a_slash() {
    let mut session = start(TestBackend::new(vec![Ok("It is".into())], None));

    session.send(b"//etc is a dir?\n").await;
    session.expect("] you: /etc is a dir?").await;
    session.expect("] assistant: It is").await;

    session.send(b"/etc\n").await;
    session.expect("unknown command /etc").await;
    session.finish().await;
}
