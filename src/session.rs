// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 会话状态机
//!
//! 每个被接收的连接对应一个 [`Session`]，只完成一次请求/响应交换：
//!
//! ```text
//! AwaitingRequestLine → Routed → Responding → Closed
//! ```
//!
//! - **AwaitingRequestLine**：读取直到出现空行（`\r\n\r\n`）。读失败、对端提前关闭、
//!   超时或请求头过大时记录 Error 日志并直接进入 `Closed`。
//! - **Routed**：只解析请求行，按路径查注册表。未命中或方法不一致时构建 404；
//!   命中时优先使用缓存，否则解析响应源并渲染 200，开启缓存时写入缓存。
//! - **Responding**：一次性写出全部响应字节。写失败记录 Error 日志，不重试。
//! - **Closed**：关闭传输层并释放会话。不支持 keep-alive。
//!
//! 会话通过 [`Router`] 与 [`Transport`] 两个能力接口工作，
//! 因此可以在不使用真实套接字和文件的情况下测试。

use crate::{
    cache::{self, SharedCache},
    exception::Exception,
    param::*,
    registry::Router,
    request::RequestLine,
    resolver, templates,
};

use bytes::Bytes;
use log::{debug, error, info};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use std::{sync::Arc, time::Duration};

/// 会话可使用的双向字节流
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}

/// 单个会话的运行参数
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// 读取完整请求头的期限，`None` 表示不限时
    pub read_timeout: Option<Duration>,
    /// 请求头允许缓冲的最大字节数
    pub max_request_bytes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            read_timeout: None,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
        }
    }
}

/// 会话所处的状态
#[derive(Debug)]
enum SessionState {
    AwaitingRequestLine,
    Routed(RequestLine),
    Responding { status: u16, response: Bytes },
    Closed,
}

/// 会话结束时的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// 响应已完整写出
    Served { status: u16 },
    /// 读或写失败，会话被中止
    Aborted,
}

pub struct Session<S: Transport> {
    id: u128,
    stream: S,
    router: Arc<dyn Router>,
    cache: Option<SharedCache>,
    config: SessionConfig,
}

impl<S: Transport> Session<S> {
    /// `cache` 为 `None` 时缓存被禁用，会话完全不会访问缓存
    pub fn new(
        id: u128,
        stream: S,
        router: Arc<dyn Router>,
        cache: Option<SharedCache>,
        config: SessionConfig,
    ) -> Self {
        Self {
            id,
            stream,
            router,
            cache,
            config,
        }
    }

    /// 驱动状态机直到 `Closed`，随后释放传输层。
    pub async fn run(mut self) -> SessionOutcome {
        let mut outcome = SessionOutcome::Aborted;
        let mut state = SessionState::AwaitingRequestLine;

        loop {
            state = match state {
                SessionState::AwaitingRequestLine => match self.read_head().await {
                    Ok(head) => {
                        debug!("[ID{}]HTTP请求头接收完毕，共{}字节", self.id, head.len());
                        SessionState::Routed(RequestLine::parse(&head))
                    }
                    Err(e) => {
                        error!("[ID{}]读取请求时遇到错误: {}", self.id, e);
                        SessionState::Closed
                    }
                },
                SessionState::Routed(line) => {
                    let (status, response) = self.respond_to(&line).await;
                    SessionState::Responding { status, response }
                }
                SessionState::Responding { status, response } => {
                    match self.write_response(&response).await {
                        Ok(()) => {
                            debug!("[ID{}]响应发送完毕，长度: {}", self.id, response.len());
                            outcome = SessionOutcome::Served { status };
                        }
                        Err(e) => error!("[ID{}]发送响应时遇到错误: {}", self.id, e),
                    }
                    SessionState::Closed
                }
                SessionState::Closed => break,
            };
        }

        self.close().await;
        outcome
    }

    /// 读取直到请求头结束
    async fn read_head(&mut self) -> Result<Vec<u8>, Exception> {
        match self.config.read_timeout {
            Some(limit) => tokio::time::timeout(limit, self.read_until_terminator())
                .await
                .map_err(|_| Exception::ReadTimeout)?,
            None => self.read_until_terminator().await,
        }
    }

    async fn read_until_terminator(&mut self) -> Result<Vec<u8>, Exception> {
        let mut buffer = Vec::with_capacity(READ_CHUNK_SIZE);
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            let n = self
                .stream
                .read(&mut chunk)
                .await
                .map_err(Exception::ReadFailed)?;
            if n == 0 {
                return Err(Exception::ConnectionClosed);
            }
            // 终止符可能横跨两次读取
            let search_from = buffer.len().saturating_sub(HEADER_TERMINATOR.len() - 1);
            buffer.extend_from_slice(&chunk[..n]);
            if contains_terminator(&buffer[search_from..]) {
                return Ok(buffer);
            }
            if buffer.len() > self.config.max_request_bytes {
                return Err(Exception::RequestTooLarge(self.config.max_request_bytes));
            }
        }
    }

    /// 路由并构建响应
    async fn respond_to(&self, line: &RequestLine) -> (u16, Bytes) {
        let id = self.id;
        let path = line.path();
        let endpoint = self.router.route(path);

        let (method, endpoint) = match (line.method(), endpoint) {
            (Some(method), Some(endpoint)) if endpoint.method() == method => (method, endpoint),
            _ => {
                error!(
                    "[ID{}]No endpoint with name {} and method {}",
                    id,
                    path,
                    line.raw_method()
                );
                return (404, templates::not_found());
            }
        };
        debug!("[ID{}]Endpoint {} of type {} found", id, path, method);

        if let Some(cache) = &self.cache {
            let hit = cache::lock(cache, id).get(method, path);
            if let Some(response) = hit {
                info!("[ID{}]Endpoint {} of type {} responding (cached)", id, path, method);
                return (200, response);
            }
        }

        let body = resolver::resolve(endpoint.source(), id).await;
        let response = templates::ok(&body, endpoint.content_type());
        info!("[ID{}]Endpoint {} of type {} responding", id, path, method);

        if let Some(cache) = &self.cache {
            if cache::lock(cache, id).put(method, path, response.clone()) {
                debug!("[ID{}]Endpoint {} of type {} added to the cache", id, path, method);
            }
        }
        (200, response)
    }

    async fn write_response(&mut self, response: &[u8]) -> Result<(), Exception> {
        self.stream
            .write_all(response)
            .await
            .map_err(Exception::WriteFailed)?;
        self.stream.flush().await.map_err(Exception::WriteFailed)
    }

    /// 关闭写方向，随后丢弃传输层，读方向随之关闭
    async fn close(mut self) {
        if let Err(e) = self.stream.shutdown().await {
            debug!("[ID{}]关闭连接时遇到错误（已忽略）: {}", self.id, e);
        }
        debug!("[ID{}]连接已关闭", self.id);
    }
}

fn contains_terminator(bytes: &[u8]) -> bool {
    bytes
        .windows(HEADER_TERMINATOR.len())
        .any(|w| w == HEADER_TERMINATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cache::CacheKeyMode,
        registry::{self, Endpoint, EndpointRegistry, MockRouter},
        resolver::ResponseSource,
    };
    use std::io::Write;
    use tokio::io::{duplex, DuplexStream};

    fn registry_with(endpoints: &[(&str, &str, HttpRequestMethod)]) -> Arc<dyn Router> {
        let mut registry = EndpointRegistry::new();
        for (path, source, method) in endpoints {
            registry.register(path, ResponseSource::parse(source), *method);
        }
        registry::shared(registry)
    }

    /// 在内存管道上跑一次完整会话，返回结果和客户端收到的全部字节
    async fn exchange(
        request: &[u8],
        router: Arc<dyn Router>,
        cache: Option<SharedCache>,
    ) -> (SessionOutcome, String) {
        let (mut client, server) = duplex(64 * 1024);
        client.write_all(request).await.unwrap();

        let session = Session::new(0, server, router, cache, SessionConfig::default());
        let outcome = session.run().await;

        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        (outcome, String::from_utf8_lossy(&received).to_string())
    }

    #[tokio::test]
    async fn test_serves_literal_endpoint() {
        let router = registry_with(&[("/data", "Some data!", HttpRequestMethod::Get)]);
        let (outcome, response) =
            exchange(b"GET /data HTTP/1.1\r\nHost: x\r\n\r\n", router, None).await;

        assert_eq!(outcome, SessionOutcome::Served { status: 200 });
        assert_eq!(
            response,
            "HTTP/1.1 200 OK\r\nContent-Length: 10\r\nContent-Type: text/html\r\n\r\nSome data!"
        );
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let router = registry_with(&[("/data", "Some data!", HttpRequestMethod::Get)]);
        let (outcome, response) = exchange(b"GET /missing HTTP/1.1\r\n\r\n", router, None).await;

        assert_eq!(outcome, SessionOutcome::Served { status: 404 });
        assert_eq!(
            response,
            "HTTP/1.1 404 Not Found\r\nContent-Length: 14\r\n\r\n404 Not Found!"
        );
    }

    #[tokio::test]
    async fn test_method_mismatch_is_not_found() {
        let router = registry_with(&[("/submit", "Submitted!", HttpRequestMethod::Post)]);
        let (outcome, _) = exchange(b"GET /submit HTTP/1.1\r\n\r\n", router, None).await;
        assert_eq!(outcome, SessionOutcome::Served { status: 404 });
    }

    #[tokio::test]
    async fn test_other_methods_are_not_found() {
        let router = registry_with(&[("/data", "x", HttpRequestMethod::Post)]);
        let (outcome, _) = exchange(b"DELETE /data HTTP/1.1\r\n\r\n", router, None).await;
        assert_eq!(outcome, SessionOutcome::Served { status: 404 });
    }

    #[tokio::test]
    async fn test_post_endpoint() {
        let router = registry_with(&[("/submit", "Submitted!", HttpRequestMethod::Post)]);
        let (outcome, response) = exchange(
            b"POST /submit HTTP/1.1\r\nContent-Length: 3\r\n\r\nabc",
            router,
            None,
        )
        .await;
        assert_eq!(outcome, SessionOutcome::Served { status: 200 });
        assert!(response.ends_with("\r\n\r\nSubmitted!"));
    }

    #[tokio::test]
    async fn test_method_keyed_cache_serves_first_response() {
        let router = registry_with(&[
            ("/a", "A", HttpRequestMethod::Get),
            ("/b", "B", HttpRequestMethod::Get),
        ]);
        let cache = cache::shared(CacheKeyMode::Method);

        let (_, first) = exchange(
            b"GET /a HTTP/1.1\r\n\r\n",
            router.clone(),
            Some(cache.clone()),
        )
        .await;
        let (outcome, second) =
            exchange(b"GET /b HTTP/1.1\r\n\r\n", router, Some(cache.clone())).await;

        assert!(first.ends_with("\r\n\r\nA"));
        assert_eq!(outcome, SessionOutcome::Served { status: 200 });
        assert_eq!(second, first);
        assert_eq!(cache::lock(&cache, 0).len(), 1);
    }

    #[tokio::test]
    async fn test_path_keyed_cache_separates_paths() {
        let router = registry_with(&[
            ("/a", "A", HttpRequestMethod::Get),
            ("/b", "B", HttpRequestMethod::Get),
        ]);
        let cache = cache::shared(CacheKeyMode::PathAndMethod);

        exchange(b"GET /a HTTP/1.1\r\n\r\n", router.clone(), Some(cache.clone())).await;
        let (_, second) = exchange(b"GET /b HTTP/1.1\r\n\r\n", router, Some(cache)).await;

        assert!(second.ends_with("\r\n\r\nB"));
    }

    #[tokio::test]
    async fn test_not_found_is_never_cached() {
        let router = registry_with(&[("/a", "A", HttpRequestMethod::Get)]);
        let cache = cache::shared(CacheKeyMode::Method);

        exchange(b"GET /nope HTTP/1.1\r\n\r\n", router.clone(), Some(cache.clone())).await;
        assert!(cache::lock(&cache, 0).is_empty());

        let (_, response) = exchange(b"GET /a HTTP/1.1\r\n\r\n", router, Some(cache)).await;
        assert!(response.ends_with("\r\n\r\nA"));
    }

    #[tokio::test]
    async fn test_file_endpoint_reflects_edits_without_cache() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<h1>v1</h1>").unwrap();
        let source = format!("{}{}", FILE_PREFIX, file.path().display());
        let router = registry_with(&[("/page", source.as_str(), HttpRequestMethod::Get)]);

        let (_, first) = exchange(b"GET /page HTTP/1.1\r\n\r\n", router.clone(), None).await;
        std::fs::write(file.path(), "<h1>version two</h1>").unwrap();
        let (_, second) = exchange(b"GET /page HTTP/1.1\r\n\r\n", router, None).await;

        assert!(first.ends_with("<h1>v1</h1>"));
        assert!(second.contains("Content-Length: 20\r\n"));
        assert!(second.ends_with("<h1>version two</h1>"));
    }

    #[tokio::test]
    async fn test_missing_file_yields_empty_ok() {
        let dir = tempfile::tempdir().unwrap();
        let source = format!("{}{}", FILE_PREFIX, dir.path().join("gone.html").display());
        let router = registry_with(&[("/gone", source.as_str(), HttpRequestMethod::Get)]);

        let (outcome, response) = exchange(b"GET /gone HTTP/1.1\r\n\r\n", router, None).await;
        assert_eq!(outcome, SessionOutcome::Served { status: 200 });
        assert_eq!(
            response,
            "HTTP/1.1 200 OK\r\nContent-Length: 0\r\nContent-Type: text/html\r\n\r\n"
        );
    }

    #[tokio::test]
    async fn test_custom_content_type() {
        let mut registry = EndpointRegistry::new();
        registry.register_endpoint(
            Endpoint::new("/api", ResponseSource::parse("{}"), HttpRequestMethod::Get)
                .with_content_type("application/json"),
        );
        let (_, response) =
            exchange(b"GET /api HTTP/1.1\r\n\r\n", registry::shared(registry), None).await;
        assert!(response.contains("Content-Type: application/json\r\n"));
    }

    #[tokio::test]
    async fn test_router_consulted_with_request_path() {
        let mut router = MockRouter::new();
        router
            .expect_route()
            .withf(|path| path.to_string() == "/mocked")
            .times(1)
            .returning(|path| {
                Some(Endpoint::new(
                    path,
                    ResponseSource::parse("from mock"),
                    HttpRequestMethod::Get,
                ))
            });

        let (outcome, response) =
            exchange(b"GET /mocked HTTP/1.1\r\n\r\n", Arc::new(router), None).await;
        assert_eq!(outcome, SessionOutcome::Served { status: 200 });
        assert!(response.ends_with("from mock"));
    }

    #[tokio::test]
    async fn test_eof_before_terminator_aborts() {
        let router = registry_with(&[("/data", "x", HttpRequestMethod::Get)]);
        let (mut client, server) = duplex(1024);
        client.write_all(b"GET /data HTTP/1.1\r\n").await.unwrap();
        client.shutdown().await.unwrap();

        let outcome = Session::new(0, server, router, None, SessionConfig::default())
            .run()
            .await;
        assert_eq!(outcome, SessionOutcome::Aborted);

        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        assert!(received.is_empty());
    }

    #[tokio::test]
    async fn test_terminator_split_across_reads() {
        let router = registry_with(&[("/data", "split", HttpRequestMethod::Get)]);
        let (mut client, server) = duplex(1024);
        let session = Session::new(0, server, router, None, SessionConfig::default());
        let handle = tokio::spawn(session.run());

        client.write_all(b"GET /data HTTP/1.1\r\n\r").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        client.write_all(b"\n").await.unwrap();

        assert_eq!(handle.await.unwrap(), SessionOutcome::Served { status: 200 });
        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        assert!(received.ends_with(b"split"));
    }

    #[tokio::test]
    async fn test_oversized_head_aborts() {
        let router = registry_with(&[]);
        let (mut client, server) = duplex(64 * 1024);
        let config = SessionConfig {
            read_timeout: None,
            max_request_bytes: 32,
        };
        let handle = tokio::spawn(Session::new(0, server, router, None, config).run());

        let long_line = format!("GET /{} HTTP/1.1\r\n", "a".repeat(128));
        client.write_all(long_line.as_bytes()).await.unwrap();

        assert_eq!(handle.await.unwrap(), SessionOutcome::Aborted);
    }

    #[tokio::test]
    async fn test_read_timeout_aborts() {
        let router = registry_with(&[]);
        let (_client, server) = duplex(1024);
        let config = SessionConfig {
            read_timeout: Some(Duration::from_millis(20)),
            ..SessionConfig::default()
        };

        let outcome = Session::new(0, server, router, None, config).run().await;
        assert_eq!(outcome, SessionOutcome::Aborted);
    }

    #[tokio::test]
    async fn test_write_failure_aborts() {
        let router = registry_with(&[("/data", "x", HttpRequestMethod::Get)]);
        let (mut client, server) = duplex(1024);
        client.write_all(b"GET /data HTTP/1.1\r\n\r\n").await.unwrap();
        drop(client);

        let outcome = Session::new(0, server, router, None, SessionConfig::default())
            .run()
            .await;
        assert_eq!(outcome, SessionOutcome::Aborted);
    }

    #[test]
    fn test_contains_terminator() {
        assert!(contains_terminator(b"GET / HTTP/1.1\r\n\r\n"));
        assert!(!contains_terminator(b"GET / HTTP/1.1\r\n"));
        assert!(!contains_terminator(b"\r\n\r"));
    }
}
