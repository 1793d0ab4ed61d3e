//! # 响应源解析
//!
//! 端点注册时给出的响应源有两种形式：
//! - 以 [`FILE_PREFIX`] 开头：剩余部分是文件路径，每次请求时重新读取文件内容；
//! - 其他字符串：原样作为响应正文。

use crate::param::FILE_PREFIX;

use bytes::Bytes;
use log::{debug, error};

use std::{fmt, path::PathBuf};

/// 端点的响应来源
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseSource {
    /// 字面量正文
    Literal(Bytes),
    /// 请求时读取的文件
    File(PathBuf),
}

impl ResponseSource {
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(FILE_PREFIX) {
            Some(path) => ResponseSource::File(PathBuf::from(path)),
            None => ResponseSource::Literal(Bytes::copy_from_slice(raw.as_bytes())),
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, ResponseSource::File(_))
    }
}

impl From<&str> for ResponseSource {
    fn from(raw: &str) -> Self {
        ResponseSource::parse(raw)
    }
}

impl fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseSource::Literal(body) => write!(f, "literal({} bytes)", body.len()),
            ResponseSource::File(path) => write!(f, "{}{}", FILE_PREFIX, path.display()),
        }
    }
}

/// 把响应源转换为正文字节。
///
/// 文件在请求时读取，读取交给 tokio 的阻塞线程池完成，不占用 reactor 线程。
/// 文件无法读取时记录 Error 日志并返回空正文，请求仍以 200 响应。
pub async fn resolve(source: &ResponseSource, id: u128) -> Bytes {
    match source {
        ResponseSource::Literal(body) => body.clone(),
        ResponseSource::File(path) => match tokio::fs::read(path).await {
            Ok(contents) => {
                debug!("[ID{}]文件{}读取成功，大小: {} bytes", id, path.display(), contents.len());
                Bytes::from(contents)
            }
            Err(e) => {
                error!("[ID{}]无法打开文件{}: {}", id, path.display(), e);
                Bytes::new()
            }
        },
    }
}
