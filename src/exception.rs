// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了服务器在启动与请求处理生命周期中可能出现的各类异常情况。
//!
//! ## 分类
//! - **配置类**：监听端口绑定失败、日志落盘失败、配置文件不可读或格式错误。
//!   以 Critical 级别记录，只中止受影响的组件。
//! - **连接 I/O 类**：accept/读/写失败、对端提前关闭、请求头过大或读取超时。
//!   以 Error 级别记录，只中止当前会话，服务器继续接收新连接。
//!
//! 路由未命中与文件不可读不在此列：前者产生固定的 404 响应，后者以空正文继续响应。

use std::{fmt, io};

/// 服务器运行过程中发生的异常类型。
#[derive(Debug)]
pub enum Exception {
    /// 无法绑定监听地址
    BindFailed(io::Error),
    /// 无法打开日志文件或 syslog
    LogSinkUnavailable(String),
    /// 配置文件无法读取
    ConfigUnreadable(io::Error),
    /// 配置文件内容无法解析
    ConfigInvalid(String),
    /// 接收新连接失败
    AcceptFailed(io::Error),
    /// 读取请求失败
    ReadFailed(io::Error),
    /// 写入响应失败
    WriteFailed(io::Error),
    /// 对端在请求头结束前关闭了连接
    ConnectionClosed,
    /// 请求头超过了允许的最大字节数
    RequestTooLarge(usize),
    /// 在限定时间内未读到完整的请求头
    ReadTimeout,
}

use Exception::*;

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindFailed(e) => write!(f, "Failed to bind listener: {}", e),
            LogSinkUnavailable(reason) => write!(f, "Log sink unavailable: {}", reason),
            ConfigUnreadable(e) => write!(f, "Config file can't be read: {}", e),
            ConfigInvalid(reason) => write!(f, "Config file is invalid: {}", reason),
            AcceptFailed(e) => write!(f, "Failed to accept connection: {}", e),
            ReadFailed(e) => write!(f, "Failed to read request: {}", e),
            WriteFailed(e) => write!(f, "Failed to write response: {}", e),
            ConnectionClosed => write!(f, "Connection closed before request head completed"),
            RequestTooLarge(limit) => write!(f, "Request head exceeds {} bytes", limit),
            ReadTimeout => write!(f, "Timed out waiting for request head"),
        }
    }
}

impl std::error::Error for Exception {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BindFailed(e) | ConfigUnreadable(e) | AcceptFailed(e) | ReadFailed(e)
            | WriteFailed(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::Exception::*;

    #[test]
    fn test_source_is_io_error() {
        use std::error::Error;
        let bind = BindFailed(io::Error::new(io::ErrorKind::AddrInUse, "in use"));
        assert!(bind.source().is_some());
        assert!(ConnectionClosed.source().is_none());
    }

    #[test]
    fn test_display_includes_cause() {
        let e = WriteFailed(io::Error::new(io::ErrorKind::BrokenPipe, "pipe gone"));
        assert!(e.to_string().contains("pipe gone"));
        assert_eq!(RequestTooLarge(16).to_string(), "Request head exceeds 16 bytes");
    }
}
