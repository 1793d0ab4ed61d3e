// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 应用门面
//!
//! 对外的注册/启动/停机接口。`start` 与 `stop` 从不向调用方返回错误：
//! 所有失败都只通过日志体现。

use crate::{
    cache::{self, SharedCache},
    config::Config,
    critical,
    param::*,
    registry::{self, Endpoint, SharedRegistry},
    resolver::ResponseSource,
    server::{Server, StopHandle},
};

use log::{debug, info, warn};
use tokio::{sync::watch, time::Instant};

use std::{
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(20);

pub struct App {
    config: Config,
    registry: SharedRegistry,
    cache: Option<SharedCache>,
    stop_requested: watch::Sender<bool>,
    running: Mutex<Option<StopHandle>>,
    local_addr: Mutex<Option<SocketAddr>>,
    active_sessions: Mutex<Option<Arc<AtomicUsize>>>,
}

impl App {
    pub fn new(config: Config) -> Self {
        let cache = match config.enable_cache() {
            true => Some(cache::shared(config.cache_key())),
            false => None,
        };
        let registry = registry::shared(registry::EndpointRegistry::new());
        for endpoint in config.endpoints() {
            registry::register_shared(&registry, endpoint);
        }
        let (stop_requested, _) = watch::channel(false);
        Self {
            config,
            registry,
            cache,
            stop_requested,
            running: Mutex::new(None),
            local_addr: Mutex::new(None),
            active_sessions: Mutex::new(None),
        }
    }

    /// 注册或覆盖端点。运行期间调用也是安全的。
    pub fn register(&self, path: &str, source: &str, method: HttpRequestMethod) {
        self.register_endpoint(Endpoint::new(path, ResponseSource::parse(source), method));
    }

    pub fn register_endpoint(&self, endpoint: Endpoint) {
        debug!(
            "Endpoint {} with method {} added, source: {}",
            endpoint.path(),
            endpoint.method(),
            endpoint.source()
        );
        registry::register_shared(&self.registry, endpoint);
    }

    /// 以字符串形式给出方法的注册入口，只接受 `GET` 与 `POST`
    pub fn add_endpoint(&self, path: &str, source: &str, method: &str) {
        match HttpRequestMethod::from_token(method) {
            Some(method) => self.register(path, source, method),
            None => warn!("Endpoint {} ignored: unsupported method {}", path, method),
        }
    }

    /// 绑定端口并运行 accept 循环，直到 [`App::stop`] 被调用。
    ///
    /// 绑定失败时记录 Critical 日志后直接返回。
    pub async fn start(&self, port: u16) {
        if *self.stop_requested.borrow() {
            warn!("Server already stopped, start ignored");
            return;
        }
        let address = match self.config.local() {
            true => Ipv4Addr::new(127, 0, 0, 1),
            false => Ipv4Addr::new(0, 0, 0, 0),
        };
        let socket = SocketAddrV4::new(address, port);

        let (server, stop) = match Server::bind(
            socket,
            Arc::clone(&self.registry),
            self.cache.clone(),
            self.config.session_config(),
        )
        .await
        {
            Ok(bound) => bound,
            Err(e) => {
                critical!("Failed to run the server; {}", e);
                return;
            }
        };
        *lock(&self.running) = Some(stop.clone());
        *lock(&self.local_addr) = Some(server.local_addr());
        *lock(&self.active_sessions) = Some(server.active_sessions());

        // 把 App 级别的停机请求转发给本次运行的服务器
        let mut stop_requested = self.stop_requested.subscribe();
        let forward = tokio::spawn(async move {
            if stop_requested.wait_for(|stopped| *stopped).await.is_ok() {
                stop.stop();
            }
        });

        info!("Server starting");
        server.serve().await;
        forward.abort();
        *lock(&self.running) = None;
        *lock(&self.local_addr) = None;
        info!("Server stopped");
    }

    /// 停止接收新连接，进行中的会话不受影响
    pub fn stop(&self) {
        self.stop_requested.send_replace(true);
        if let Some(stop) = lock(&self.running).as_ref() {
            stop.stop();
        }
        info!("Server stopping");
    }

    pub fn is_running(&self) -> bool {
        lock(&self.running).is_some()
    }

    /// 正在监听的地址，服务器未运行时为 `None`
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *lock(&self.local_addr)
    }

    pub fn active_sessions(&self) -> usize {
        lock(&self.active_sessions)
            .as_ref()
            .map_or(0, |active| active.load(Ordering::SeqCst))
    }

    /// 停机后等待进行中的会话全部结束，最多等待 `limit`。
    ///
    /// 全部结束时返回 `true`；超时返回 `false`，剩余会话随运行时一起被丢弃。
    pub async fn drain(&self, limit: Duration) -> bool {
        let deadline = Instant::now() + limit;
        loop {
            let active = self.active_sessions();
            if active == 0 {
                return true;
            }
            if Instant::now() >= deadline {
                warn!("{}个会话在停机时仍未结束", active);
                return false;
            }
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }
    }

    pub fn endpoint_count(&self) -> usize {
        match self.registry.read() {
            Ok(registry) => registry.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn cached_responses(&self) -> usize {
        self.cache
            .as_ref()
            .map_or(0, |shared| cache::lock(shared, 0).len())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
