//! 响应模板：拼接固定格式的 200 / 404 报文。

use crate::param::*;

use bytes::{BufMut, Bytes, BytesMut};

/// 构建 200 响应。Content-Length 为正文的字节数。
pub fn ok(body: &[u8], content_type: &str) -> Bytes {
    let header = [
        "HTTP/1.1 200 OK",
        CRLF,
        "Content-Length: ",
        body.len().to_string().as_str(),
        CRLF,
        "Content-Type: ",
        content_type,
        CRLF,
        CRLF,
    ]
    .concat();
    let mut response = BytesMut::with_capacity(header.len() + body.len());
    response.put_slice(header.as_bytes());
    response.put_slice(body);
    response.freeze()
}

/// 以默认 Content-Type 构建 200 响应
pub fn ok_html(body: &[u8]) -> Bytes {
    ok(body, DEFAULT_CONTENT_TYPE)
}

/// 构建 404 响应。
///
/// Content-Length 固定写为 14（即默认正文 `404 Not Found!` 的长度），
/// 传入其他正文时该值与实际长度不符。
pub fn not_ok(body: &str) -> Bytes {
    let response = [
        "HTTP/1.1 404 Not Found",
        CRLF,
        "Content-Length: ",
        NOT_FOUND_CONTENT_LENGTH.to_string().as_str(),
        CRLF,
        CRLF,
        body,
    ]
    .concat();
    Bytes::from(response)
}

/// 以默认正文构建 404 响应
pub fn not_found() -> Bytes {
    not_ok(NOT_FOUND_BODY)
}
