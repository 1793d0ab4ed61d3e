// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 请求行解析模块
//!
//! 服务器只关心请求的第一行（方法、路径、版本）。请求头与请求体虽然会被读入缓冲区，
//! 但从不解析。版本字段只保留用于日志，不做任何校验。

use crate::param::*;

/// 请求行：`METHOD SP PATH SP VERSION`
#[derive(Debug, Clone, PartialEq)]
pub struct RequestLine {
    /// 原始方法名
    method: String,
    /// 请求的资源路径（包含查询字符串，原样保留）
    path: String,
    /// 协议版本（不校验）
    version: String,
}

impl RequestLine {
    /// 从读取到的请求头字节中解析第一行。
    ///
    /// 按空白分词，缺失的字段记为空字符串；非 UTF-8 字节按有损方式替换。
    /// 该函数不会失败：格式再差的请求行也只会在路由阶段表现为未匹配。
    pub fn parse(head: &[u8]) -> Self {
        let first_line_end = head
            .windows(CRLF.len())
            .position(|w| w == CRLF.as_bytes())
            .unwrap_or(head.len());
        let first_line = String::from_utf8_lossy(&head[..first_line_end]);

        let mut parts = first_line.split_whitespace();
        let method = parts.next().unwrap_or("").to_string();
        let path = parts.next().unwrap_or("").to_string();
        let version = parts.next().unwrap_or("").to_string();

        Self {
            method,
            path,
            version,
        }
    }
}

// --- Getter 访问器实现 ---

impl RequestLine {
    /// 原始方法名
    pub fn raw_method(&self) -> &str {
        &self.method
    }

    /// 可路由的方法，只有 `GET`/`POST` 返回 `Some`
    pub fn method(&self) -> Option<HttpRequestMethod> {
        HttpRequestMethod::from_token(&self.method)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}
