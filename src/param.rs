// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 协议参数与常量模块
//!
//! 该模块定义了服务器遵循的 HTTP 协议相关常量和数据结构，包括：
//! - 报文分隔符与请求头终止符。
//! - 文件型响应源的保留前缀。
//! - 受支持的 HTTP 方法的强类型枚举。

use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// 服务器名称标识，用于日志与 syslog 标签
pub const SERVER_NAME: &str = "serveme";

/// HTTP 协议规定的换行符（Carriage Return Line Feed）
pub const CRLF: &str = "\r\n";

/// 请求头结束标志：一个空行
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// 以该前缀开头的响应源表示“在请求时读取此文件”
pub const FILE_PREFIX: &str = "@file:";

/// 200 响应的默认 Content-Type
pub const DEFAULT_CONTENT_TYPE: &str = "text/html";

/// 404 响应的默认正文
pub const NOT_FOUND_BODY: &str = "404 Not Found!";

/// 404 模板中写死的 Content-Length，与正文的真实长度无关
pub const NOT_FOUND_CONTENT_LENGTH: usize = 14;

/// 单个请求头允许缓冲的默认最大字节数
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 64 * 1024;

/// 每次从连接读取的块大小
pub const READ_CHUNK_SIZE: usize = 1024;

/// 服务器能够路由的 HTTP 方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpRequestMethod {
    /// 获取资源
    Get,
    /// 提交数据或执行操作
    Post,
}

impl HttpRequestMethod {
    /// 严格按大写方法名匹配。
    ///
    /// 其他任何方法（包括小写的 `get`）都返回 `None`，会话会把它当作未匹配处理。
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "GET" => Some(HttpRequestMethod::Get),
            "POST" => Some(HttpRequestMethod::Post),
            _ => None,
        }
    }
}

impl fmt::Display for HttpRequestMethod {
    /// 将枚举格式化为 HTTP 标准大写方法名
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpRequestMethod::Get => write!(f, "GET"),
            HttpRequestMethod::Post => write!(f, "POST"),
        }
    }
}
