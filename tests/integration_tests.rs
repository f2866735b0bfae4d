//! Integration tests for the palaver library.
//! These tests run the HTTP backend against a scripted server on localhost.

#[cfg(test)]
mod tests {
    use std::io;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use palaver::chat::{ChatConfig, ChatSession, SessionUpdate};
    use palaver::{ChatBackend, HttpBackend, Role, Turn};
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    enum Reply {
        Chunked(Vec<Vec<u8>>),
        Json(u16, String),
    }

    struct TestServer {
        addr: SocketAddr,
        requests: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl TestServer {
        async fn start<F>(route: F) -> Self
        where
            F: Fn(&str) -> Reply + Send + Sync + 'static,
        {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let requests = Arc::new(Mutex::new(Vec::new()));
            let route = Arc::new(route);
            let log = requests.clone();
            tokio::spawn(async move {
                while let Ok((mut socket, _)) = listener.accept().await {
                    let route = route.clone();
                    let log = log.clone();
                    tokio::spawn(async move {
                        let Ok((path, body)) = read_request(&mut socket).await else {
                            return;
                        };
                        log.lock().unwrap().push((path.clone(), body));
                        let _ = write_reply(&mut socket, route(&path)).await;
                    });
                }
            });
            Self { addr, requests }
        }

        fn url(&self) -> String {
            format!("http://{}", self.addr)
        }

        fn bodies_for(&self, path: &str) -> Vec<serde_json::Value> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .filter(|(p, _)| p == path)
                .map(|(_, body)| serde_json::from_str(body).unwrap())
                .collect()
        }
    }

    async fn read_request(socket: &mut TcpStream) -> io::Result<(String, String)> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let header_end = loop {
            let n = socket.read(&mut chunk).await?;
            if n == 0 {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "closed"));
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
        let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
        let length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while buf.len() < header_end + length {
            let n = socket.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        let end = buf.len().min(header_end + length);
        let body = String::from_utf8_lossy(&buf[header_end..end]).into_owned();
        Ok((path, body))
    }

    async fn write_reply(socket: &mut TcpStream, reply: Reply) -> io::Result<()> {
        match reply {
            Reply::Chunked(chunks) => {
                socket
                    .write_all(
                        b"HTTP/1.1 200 OK\r\n\
                          content-type: text/plain; charset=utf-8\r\n\
                          transfer-encoding: chunked\r\n\
                          connection: close\r\n\r\n",
                    )
                    .await?;
                for chunk in chunks {
                    socket
                        .write_all(format!("{:x}\r\n", chunk.len()).as_bytes())
                        .await?;
                    socket.write_all(&chunk).await?;
                    socket.write_all(b"\r\n").await?;
                    socket.flush().await?;
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
                socket.write_all(b"0\r\n\r\n").await?;
            }
            Reply::Json(status, body) => {
                let reason = match status {
                    200 => "OK",
                    500 => "Internal Server Error",
                    _ => "Unknown",
                };
                let head = format!(
                    "HTTP/1.1 {status} {reason}\r\n\
                     content-type: application/json\r\n\
                     content-length: {}\r\n\
                     connection: close\r\n\r\n",
                    body.len()
                );
                socket.write_all(head.as_bytes()).await?;
                socket.write_all(body.as_bytes()).await?;
            }
        }
        socket.flush().await?;
        socket.shutdown().await
    }

    fn session_for(server: &TestServer) -> ChatSession<HttpBackend> {
        let config = ChatConfig::new()
            .with_backend_url(server.url())
            .with_ping_on_ready(false);
        ChatSession::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_streamed_answer_and_suggestions() {
        let server = TestServer::start(|path| match path {
            "/chat" => Reply::Chunked(vec![b"Hi".to_vec(), b" there".to_vec()]),
            "/suggest-followups" => Reply::Json(
                200,
                r#"{"suggestions":["1. Tell me more","What else?"]}"#.to_string(),
            ),
            _ => Reply::Json(404, r#"{"detail":"Not Found"}"#.to_string()),
        })
        .await;
        let mut session = session_for(&server);

        assert!(session.submit("Hello"));
        let mut streamed = String::new();
        let mut saw_open = false;
        while let Some(update) = session.next_update().await {
            match update {
                SessionUpdate::Opened => saw_open = true,
                SessionUpdate::Delta(text) => streamed.push_str(&text),
                SessionUpdate::Failed(message) => panic!("exchange failed: {message}"),
                _ => {}
            }
        }

        assert!(saw_open);
        assert_eq!(streamed, "Hi there");
        assert_eq!(
            session.transcript().turns(),
            &[Turn::user("Hello"), Turn::assistant("Hi there")]
        );
        assert!(!session.is_sending());
        assert!(!session.is_typing());
        assert_eq!(session.suggestions(), &["Tell me more", "What else?"]);

        assert_eq!(
            server.bodies_for("/chat"),
            vec![json!({"history": [{"role": "user", "content": "Hello"}]})]
        );
        assert_eq!(
            server.bodies_for("/suggest-followups"),
            vec![json!({"history": [
                {"role": "user", "content": "Hello"},
                {"role": "assistant", "content": "Hi there"},
            ]})]
        );
    }

    #[tokio::test]
    async fn test_server_error_becomes_error_turn() {
        let server = TestServer::start(|_| {
            Reply::Json(500, r#"{"detail":"Internal Server Error"}"#.to_string())
        })
        .await;
        let mut session = session_for(&server);

        assert!(session.submit("Hello"));
        session.settle().await;

        let turns = session.transcript().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0], Turn::user("Hello"));
        assert_eq!(turns[1].role(), Role::Assistant);
        assert!(
            turns[1].content().starts_with("Error fetching response"),
            "unexpected error turn: {}",
            turns[1].content()
        );
        assert!(turns[1].content().contains("500"));
        assert!(!session.is_sending());
        assert!(session.suggestions().is_empty());
        assert!(server.bodies_for("/suggest-followups").is_empty());

        // The session stays usable after a failure.
        assert!(session.submit("Again?"));
        session.settle().await;
        assert_eq!(session.transcript().len(), 4);
    }

    #[tokio::test]
    async fn test_multibyte_split_across_chunks() {
        let server = TestServer::start(|path| match path {
            "/chat" => Reply::Chunked(vec![b"caf\xc3".to_vec(), b"\xa9 \xf0\x9f".to_vec(), b"\xa6\x80".to_vec()]),
            _ => Reply::Json(200, r#"{"suggestions":[]}"#.to_string()),
        })
        .await;
        let mut session = session_for(&server);

        session.submit("Order?");
        session.settle().await;
        assert_eq!(session.transcript().last().unwrap().content(), "café 🦀");
    }

    #[tokio::test]
    async fn test_json_answer_and_legacy_question() {
        let server = TestServer::start(|path| match path {
            "/chat" => Reply::Json(200, r#"{"answer":"All at once."}"#.to_string()),
            _ => Reply::Json(500, r#"{"detail":"no suggestions today"}"#.to_string()),
        })
        .await;
        let config = ChatConfig::new()
            .with_backend_url(server.url())
            .with_ping_on_ready(false)
            .with_legacy_question(true);
        let mut session = ChatSession::new(config).unwrap();

        session.submit("What is this?");
        session.settle().await;

        assert_eq!(
            session.transcript().last().unwrap(),
            &Turn::assistant("All at once.")
        );
        assert!(session.suggestions().is_empty());
        assert_eq!(
            server.bodies_for("/chat"),
            vec![json!({"question": "What is this?"})]
        );
    }

    #[tokio::test]
    async fn test_malformed_suggestions_leave_answer_intact() {
        for payload in [r#"{"suggestions":"oops"}"#, "not json at all"] {
            let server = TestServer::start(move |path| match path {
                "/chat" => Reply::Chunked(vec![b"Still ".to_vec(), b"here.".to_vec()]),
                _ => Reply::Json(200, payload.to_string()),
            })
            .await;
            let mut session = session_for(&server);

            assert!(session.submit("Hello"));
            let mut saw_suggestions = false;
            while let Some(update) = session.next_update().await {
                match update {
                    SessionUpdate::Failed(message) => panic!("exchange failed: {message}"),
                    SessionUpdate::Suggestions(list) => {
                        saw_suggestions = true;
                        assert!(list.is_empty(), "{payload}: {list:?}");
                    }
                    _ => {}
                }
            }

            assert!(saw_suggestions);
            assert_eq!(server.bodies_for("/suggest-followups").len(), 1);
            assert!(session.suggestions().is_empty());
            assert_eq!(
                session.transcript().turns(),
                &[Turn::user("Hello"), Turn::assistant("Still here.")]
            );
            assert!(!session.is_sending());
            assert!(!session.is_typing());
        }
    }

    #[tokio::test]
    async fn test_ping() {
        let server =
            TestServer::start(|_| Reply::Json(200, r#"{"message":"pong"}"#.to_string())).await;
        let backend = HttpBackend::new(Some(server.url())).unwrap();
        backend.ping().await.unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let backend = HttpBackend::new(Some(format!("http://{addr}"))).unwrap();
        let err = backend.ping().await.unwrap_err();
        assert!(err.is_transport(), "unexpected error: {err}");
    }
}
