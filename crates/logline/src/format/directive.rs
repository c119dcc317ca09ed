use serde::{Deserialize, Serialize};

/// Logical field named by an Apache LogFormat directive.
///
/// See <http://httpd.apache.org/docs/current/mod/mod_log_config.html#formats>.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    Percent,
    RemoteIp,
    UnderlyingPeerIp,
    LocalIp,
    ResponseBytes,
    TimeTakenUs,
    Filename,
    RemoteHost,
    Protocol,
    Referer,
    UserAgent,
    XForwardedFor,
    KeepaliveNumber,
    RemoteLogname,
    ErrorLogRequestId,
    Method,
    ServerPort,
    Pid,
    QueryString,
    FirstLineOfRequest,
    OriginalRequestStatus,
    /// Final status (`%>s`)
    LastRequestStatus,
    /// Time the request was received
    Time,
    TimeTakenS,
    RemoteUser,
    UrlPath,
    /// Path plus query string (`%U%q`)
    Resource,
    VirtualHost,
    ServerName2,
    ConnectionStatus,
    ReceivedBytesIncludingHeaders,
    SentBytesIncludingHeaders,
    BytesTransferred,
}

/// Directive → field name. `%B` and `%b` both name the response size.
const DIRECTIVES: &[(&str, FieldName)] = &[
    ("%%", FieldName::Percent),
    ("%a", FieldName::RemoteIp),
    ("%{c}a", FieldName::UnderlyingPeerIp),
    ("%A", FieldName::LocalIp),
    ("%B", FieldName::ResponseBytes),
    ("%b", FieldName::ResponseBytes),
    ("%D", FieldName::TimeTakenUs),
    ("%f", FieldName::Filename),
    ("%h", FieldName::RemoteHost),
    ("%H", FieldName::Protocol),
    ("%{Referer}i", FieldName::Referer),
    ("%{User-agent}i", FieldName::UserAgent),
    ("%{X-Forwarded-For}i", FieldName::XForwardedFor),
    ("%k", FieldName::KeepaliveNumber),
    ("%l", FieldName::RemoteLogname),
    ("%L", FieldName::ErrorLogRequestId),
    ("%m", FieldName::Method),
    ("%p", FieldName::ServerPort),
    ("%P", FieldName::Pid),
    ("%q", FieldName::QueryString),
    ("%r", FieldName::FirstLineOfRequest),
    ("%s", FieldName::OriginalRequestStatus),
    ("%>s", FieldName::LastRequestStatus),
    ("%t", FieldName::Time),
    ("%T", FieldName::TimeTakenS),
    ("%u", FieldName::RemoteUser),
    ("%U", FieldName::UrlPath),
    ("%U%q", FieldName::Resource),
    ("%v", FieldName::VirtualHost),
    ("%V", FieldName::ServerName2),
    ("%X", FieldName::ConnectionStatus),
    ("%I", FieldName::ReceivedBytesIncludingHeaders),
    ("%O", FieldName::SentBytesIncludingHeaders),
    ("%S", FieldName::BytesTransferred),
];

impl FieldName {
    pub fn from_directive(directive: &str) -> Option<FieldName> {
        DIRECTIVES
            .iter()
            .find(|(d, _)| *d == directive)
            .map(|(_, name)| *name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldName::Percent => "percent",
            FieldName::RemoteIp => "remote_ip",
            FieldName::UnderlyingPeerIp => "underlying_peer_ip",
            FieldName::LocalIp => "local_ip",
            FieldName::ResponseBytes => "response_bytes",
            FieldName::TimeTakenUs => "time_taken_us",
            FieldName::Filename => "filename",
            FieldName::RemoteHost => "remote_host",
            FieldName::Protocol => "protocol",
            FieldName::Referer => "referer",
            FieldName::UserAgent => "user_agent",
            FieldName::XForwardedFor => "x_forwarded_for",
            FieldName::KeepaliveNumber => "keepalive_number",
            FieldName::RemoteLogname => "remote_logname",
            FieldName::ErrorLogRequestId => "error_log_request_id",
            FieldName::Method => "method",
            FieldName::ServerPort => "server_port",
            FieldName::Pid => "pid",
            FieldName::QueryString => "query_string",
            FieldName::FirstLineOfRequest => "first_line_of_request",
            FieldName::OriginalRequestStatus => "original_request_status",
            FieldName::LastRequestStatus => "last_request_status",
            FieldName::Time => "time",
            FieldName::TimeTakenS => "time_taken_s",
            FieldName::RemoteUser => "remote_user",
            FieldName::UrlPath => "url_path",
            FieldName::Resource => "resource",
            FieldName::VirtualHost => "virtual_host",
            FieldName::ServerName2 => "server_name2",
            FieldName::ConnectionStatus => "connection_status",
            FieldName::ReceivedBytesIncludingHeaders => "received_bytes_including_headers",
            FieldName::SentBytesIncludingHeaders => "sent_bytes_including_headers",
            FieldName::BytesTransferred => "bytes_transferred",
        }
    }
}

impl std::fmt::Display for FieldName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
