// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 端点注册表
//!
//! 路径到端点的映射，是路由的唯一依据。只做精确字符串匹配，
//! 重复注册同一路径时后者覆盖前者。
//!
//! 会话只依赖 [`Router`] trait，测试时可以用替身代替真实注册表。

use crate::{param::*, resolver::ResponseSource};

use log::warn;

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

/// 一个已注册的端点：路径、响应源、方法与 Content-Type
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    path: String,
    source: ResponseSource,
    method: HttpRequestMethod,
    content_type: String,
}

impl Endpoint {
    pub fn new(path: &str, source: ResponseSource, method: HttpRequestMethod) -> Self {
        Self {
            path: path.to_string(),
            source,
            method,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = content_type.to_string();
        self
    }
}

impl Endpoint {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn source(&self) -> &ResponseSource {
        &self.source
    }

    pub fn method(&self) -> HttpRequestMethod {
        self.method
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }
}

#[derive(Debug, Default)]
pub struct EndpointRegistry {
    endpoints: HashMap<String, Endpoint>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册或覆盖 `path` 对应的端点
    pub fn register(&mut self, path: &str, source: ResponseSource, method: HttpRequestMethod) {
        self.register_endpoint(Endpoint::new(path, source, method));
    }

    pub fn register_endpoint(&mut self, endpoint: Endpoint) {
        self.endpoints.insert(endpoint.path.clone(), endpoint);
    }

    /// 精确匹配查找
    pub fn lookup(&self, path: &str) -> Option<&Endpoint> {
        self.endpoints.get(path)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

/// 注册表在会话之间共享：注册时取写锁，路由时取读锁
pub type SharedRegistry = Arc<RwLock<EndpointRegistry>>;

pub fn shared(registry: EndpointRegistry) -> SharedRegistry {
    Arc::new(RwLock::new(registry))
}

/// 路由能力：按路径找到端点
#[cfg_attr(test, mockall::automock)]
pub trait Router: Send + Sync {
    fn route(&self, path: &str) -> Option<Endpoint>;
}

impl Router for RwLock<EndpointRegistry> {
    fn route(&self, path: &str) -> Option<Endpoint> {
        let registry = match self.read() {
            Ok(lock) => lock,
            Err(poisoned) => {
                warn!("注册表锁被污染，恢复并继续");
                poisoned.into_inner()
            }
        };
        registry.lookup(path).cloned()
    }
}

/// 在共享注册表上注册端点，锁被污染时恢复后继续写入
pub fn register_shared(registry: &SharedRegistry, endpoint: Endpoint) {
    let mut lock = match registry.write() {
        Ok(lock) => lock,
        Err(poisoned) => {
            warn!("注册表锁被污染，恢复并继续");
            poisoned.into_inner()
        }
    };
    lock.register_endpoint(endpoint);
}
