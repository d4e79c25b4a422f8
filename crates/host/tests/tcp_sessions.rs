use std::net::SocketAddr;
use std::sync::Arc;

use host::TcpHost;
use quiz_core::model::QuizDraft;
use quiz_core::time::fixed_clock;
use services::QuizService;
use storage::repository::InMemoryRepository;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, writer) = stream.into_split();
        let mut client = Self {
            reader: BufReader::new(reader),
            writer,
        };
        client.read_until_prompt("quiz > ").await;
        client
    }

    /// Read until the output ends with `prompt`, returning everything read.
    async fn read_until_prompt(&mut self, prompt: &str) -> String {
        let mut seen = Vec::new();
        let mut byte = [0u8; 1];
        while !seen.ends_with(prompt.as_bytes()) {
            let n = self.reader.read(&mut byte).await.unwrap();
            assert_ne!(n, 0, "connection closed, got {:?}", String::from_utf8_lossy(&seen));
            seen.push(byte[0]);
        }
        String::from_utf8(seen).unwrap()
    }

    async fn send(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
    }

    async fn command(&mut self, line: &str) -> String {
        self.send(line).await;
        self.read_until_prompt("quiz > ").await
    }
}

async fn start_host() -> (SocketAddr, Arc<QuizService>) {
    let svc = QuizService::new(fixed_clock(), Arc::new(InMemoryRepository::new()));
    svc.create(QuizDraft::new("Capital of Italy", "Rome"))
        .await
        .unwrap();
    let svc = Arc::new(svc);

    let host = TcpHost::bind("127.0.0.1:0", Arc::clone(&svc)).await.unwrap();
    let addr = host.local_addr().unwrap();
    tokio::spawn(host.serve());
    (addr, svc)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sessions_share_the_store_but_not_their_state() {
    let (addr, svc) = start_host().await;
    let mut alice = Client::connect(addr).await;
    let mut bob = Client::connect(addr).await;

    alice.send("add").await;
    alice.read_until_prompt(" Enter the question: ").await;

    // Bob's commands are not taken as Alice's question text.
    let listing = bob.command("list").await;
    assert!(listing.contains("[1]: Capital of Italy"));

    alice.send("Capital of France").await;
    alice.read_until_prompt(" Enter the answer: ").await;
    alice.send("Paris").await;
    let added = alice.read_until_prompt("quiz > ").await;
    assert!(added.contains("Added [2]: Capital of France => Paris"));

    let listing = bob.command("list").await;
    assert!(listing.contains("[2]: Capital of France"));
    assert_eq!(svc.count().await.unwrap(), 2);
}

#[tokio::test]
async fn quit_closes_only_that_connection() {
    let (addr, _svc) = start_host().await;
    let mut leaving = Client::connect(addr).await;
    let mut staying = Client::connect(addr).await;

    leaving.send("quit").await;
    let mut rest = String::new();
    leaving.reader.read_to_string(&mut rest).await.unwrap();
    assert_eq!(rest, "Bye!\n");

    let shown = staying.command("show 1").await;
    assert!(shown.contains("[1]: Capital of Italy => Rome"));
}

#[tokio::test]
async fn dropped_connection_mid_edit_changes_nothing() {
    let (addr, svc) = start_host().await;
    let mut client = Client::connect(addr).await;

    client.send("edit 1").await;
    let editing = client.read_until_prompt(" Enter the question: ").await;
    assert!(editing.contains("Editing [1]: Capital of Italy => Rome"));
    client.send("Capital of Peru").await;
    client.read_until_prompt(" Enter the answer: ").await;
    drop(client);

    let mut other = Client::connect(addr).await;
    let shown = other.command("show 1").await;
    assert!(shown.contains("Capital of Italy => Rome"));
    assert_eq!(svc.count().await.unwrap(), 1);
}

#[tokio::test]
async fn errors_are_reported_and_the_session_continues() {
    let (addr, _svc) = start_host().await;
    let mut client = Client::connect(addr).await;

    let missing = client.command("show").await;
    assert!(missing.contains("Error: missing <id> parameter"));

    let unknown = client.command("dance").await;
    assert!(unknown.contains("Unknown command: 'dance'"));

    let absent = client.command("delete 42").await;
    assert!(absent.contains("there is no quiz with id=42"));

    client.send("test 1").await;
    client.read_until_prompt("Capital of Italy? ").await;
    let verdict = client.command("  ROME ").await;
    assert!(verdict.contains("Your answer is correct."));
}
