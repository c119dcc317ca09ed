//! LTSV labels for LogFormat directives, borrowed from <http://ltsv.org/>.

const LABELS: &[(&str, &str)] = &[
    ("%t", "time"),
    ("%h", "host"),
    ("%{X-Forwarded-For}i", "forwardedfor"),
    ("%l", "ident"),
    ("%u", "user"),
    ("%r", "req"),
    ("%m", "method"),
    ("%U%q", "uri"),
    ("%H", "protocol"),
    ("%>s", "status"),
    ("%B", "size"),
    ("%b", "size"),
    ("%I", "reqsize"),
    ("%{Referer}i", "referer"),
    ("%{User-agent}i", "ua"),
    ("%{Host}i", "vhost"),
    ("%D", "reqtime_microsec"),
    ("%T", "reqtime"),
    ("%{X-Cache}o", "cache"),
    ("%{X-Runtime}o", "runtime"),
];

/// LTSV label for `directive`; directives without a label stand for themselves.
pub fn label_for(directive: &str) -> &str {
    LABELS
        .iter()
        .find(|(d, _)| *d == directive)
        .map(|(_, label)| *label)
        .unwrap_or(directive)
}
