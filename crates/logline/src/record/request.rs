//! Request: splits the first line of a request into method, resource and protocol.

/// Parts of a request line such as `GET /a/b?x=1 HTTP/1.1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine<'a> {
    pub method: Option<&'a str>,
    /// Everything between method and protocol, rejoined with single spaces
    pub resource: Option<String>,
    pub protocol: Option<&'a str>,
}

/// Split on single spaces: first part method, last part protocol, the rest
/// is the resource. Trailing empty parts are dropped. Once a protocol is
/// present the resource is too, possibly empty.
pub fn split_request_line(line: &str) -> RequestLine<'_> {
    let mut parts: Vec<&str> = line.split(' ').collect();
    while parts.last() == Some(&"") {
        parts.pop();
    }

    let mut parts = parts.into_iter();
    let method = parts.next();
    let mut middle: Vec<&str> = parts.collect();
    let protocol = middle.pop();
    let resource = protocol.map(|_| middle.join(" "));

    RequestLine {
        method,
        resource,
        protocol,
    }
}
