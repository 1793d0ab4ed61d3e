// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 接收器
//!
//! 持有监听套接字、注册表与缓存。每接收一个连接就创建一个 [`Session`] 并交给
//! tokio 独立调度，然后立即重新进入 accept。accept 失败只记录日志，不会终止循环。
//! 停机只阻止新的 accept，已在处理中的会话会继续运行直到结束。

use crate::{
    cache::SharedCache,
    exception::Exception,
    registry::{Router, SharedRegistry},
    session::{Session, SessionConfig, SessionOutcome},
};

use log::{debug, error, info};
use tokio::{
    net::{TcpListener, ToSocketAddrs},
    sync::watch,
};

use std::{
    io,
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

/// accept 失败后重试前的等待时间，避免 EMFILE 之类的持续错误把循环变成空转
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// 停机句柄，可在任意任务中调用
#[derive(Debug, Clone)]
pub struct StopHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        // 服务器已退出时接收端不存在，仍然记录停机状态
        self.sender.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.sender.borrow()
    }
}

pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    router: Arc<dyn Router>,
    cache: Option<SharedCache>,
    session_config: SessionConfig,
    shutdown: watch::Receiver<bool>,
    active_sessions: Arc<AtomicUsize>,
}

impl Server {
    /// 绑定监听地址。要么返回完整可用的服务器，要么返回 `BindFailed`。
    pub async fn bind<A: ToSocketAddrs>(
        addr: A,
        registry: SharedRegistry,
        cache: Option<SharedCache>,
        session_config: SessionConfig,
    ) -> Result<(Self, StopHandle), Exception> {
        let listener = TcpListener::bind(addr).await.map_err(Exception::BindFailed)?;
        let local_addr = listener.local_addr().map_err(Exception::BindFailed)?;
        info!("地址{}绑定完成", local_addr);

        let (sender, shutdown) = watch::channel(false);
        let server = Self {
            listener,
            local_addr,
            router: registry,
            cache,
            session_config,
            shutdown,
            active_sessions: Arc::new(AtomicUsize::new(0)),
        };
        let handle = StopHandle {
            sender: Arc::new(sender),
        };
        Ok((server, handle))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// 当前仍在运行的会话数，供运维控制台查询
    pub fn active_sessions(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.active_sessions)
    }

    /// 主 accept 循环，收到停机信号后返回。
    ///
    /// 所有 [`StopHandle`] 都被丢弃后再也不会有停机信号，循环会一直运行下去。
    pub async fn serve(mut self) {
        let mut id: u128 = 0;
        let mut stoppable = true;
        info!("服务端开始在{}上接收连接", self.local_addr);

        loop {
            if *self.shutdown.borrow() {
                break;
            }
            tokio::select! {
                changed = self.shutdown.changed(), if stoppable => {
                    if changed.is_err() {
                        debug!("停机句柄已全部释放，只能随进程退出");
                        stoppable = false;
                    } else if *self.shutdown.borrow() {
                        break;
                    }
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        debug!("[ID{}]新的连接：{}", id, addr);
                        self.dispatch(stream, id);
                        id += 1;
                    }
                    Err(e) => accept_failed(e).await,
                },
            }
        }
        info!("主循环接收到停机指令，不再接收新连接");
    }

    fn dispatch(&self, stream: tokio::net::TcpStream, id: u128) {
        let session = Session::new(
            id,
            stream,
            Arc::clone(&self.router),
            self.cache.clone(),
            self.session_config,
        );
        let active = Arc::clone(&self.active_sessions);
        active.fetch_add(1, Ordering::SeqCst);

        tokio::spawn(async move {
            match session.run().await {
                SessionOutcome::Served { status } => debug!("[ID{}]会话结束，状态码{}", id, status),
                SessionOutcome::Aborted => debug!("[ID{}]会话被中止", id),
            }
            active.fetch_sub(1, Ordering::SeqCst);
        });
    }
}

/// 记录 accept 错误并退避一小段时间，然后由调用方继续循环
async fn accept_failed(e: io::Error) {
    error!("{}", Exception::AcceptFailed(e));
    tokio::time::sleep(ACCEPT_BACKOFF).await;
}
