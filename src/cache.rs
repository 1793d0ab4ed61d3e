use crate::param::HttpRequestMethod;

use bytes::Bytes;
use log::warn;
use serde_derive::{Deserialize, Serialize};

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

/// 缓存键的粒度
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CacheKeyMode {
    /// 只按方法缓存：同一方法的所有路径共享第一次渲染出的响应
    #[default]
    Method,
    /// 按路径加方法缓存
    PathAndMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    Method(HttpRequestMethod),
    PathAndMethod(String, HttpRequestMethod),
}

/// 已渲染响应的记忆化存储。没有过期，没有淘汰。
#[derive(Debug, Default)]
pub struct ResponseCache {
    mode: CacheKeyMode,
    cache: HashMap<CacheKey, Bytes>,
}

impl ResponseCache {
    pub fn new(mode: CacheKeyMode) -> Self {
        Self {
            mode,
            cache: HashMap::new(),
        }
    }

    fn key(&self, method: HttpRequestMethod, path: &str) -> CacheKey {
        match self.mode {
            CacheKeyMode::Method => CacheKey::Method(method),
            CacheKeyMode::PathAndMethod => CacheKey::PathAndMethod(path.to_string(), method),
        }
    }

    // 查询
    pub fn get(&self, method: HttpRequestMethod, path: &str) -> Option<Bytes> {
        self.cache.get(&self.key(method, path)).cloned()
    }

    // 放入。已有条目时保留旧值，返回是否真正写入
    pub fn put(&mut self, method: HttpRequestMethod, path: &str, response: Bytes) -> bool {
        let key = self.key(method, path);
        if self.cache.contains_key(&key) {
            return false;
        }
        self.cache.insert(key, response);
        true
    }

    pub fn mode(&self) -> CacheKeyMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

pub type SharedCache = Arc<Mutex<ResponseCache>>;

pub fn shared(mode: CacheKeyMode) -> SharedCache {
    Arc::new(Mutex::new(ResponseCache::new(mode)))
}

/// 获取缓存锁，锁被污染时恢复并继续
pub fn lock(cache: &SharedCache, id: u128) -> MutexGuard<'_, ResponseCache> {
    match cache.lock() {
        Ok(lock) => lock,
        Err(poisoned) => {
            warn!("[ID{}]缓存锁被污染，恢复并继续", id);
            poisoned.into_inner()
        }
    }
}
