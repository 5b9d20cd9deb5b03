//! Well-known request header fields.
//!
//! The table pairs each symbolic name with its wire spelling. The wire
//! spelling is the symbol with `_` turned into `-`, cased the way the
//! field is registered (`USER_AGENT` is sent as `User-Agent`).

use std::fmt;
use std::str::FromStr;

macro_rules! request_fields {
    ($($variant:ident => $symbol:literal, $wire:literal;)+) => {
        /// Closed set of common HTTP request header fields.
        ///
        /// See <https://en.wikipedia.org/wiki/List_of_HTTP_header_fields>.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum RequestField {
            $($variant,)+
        }

        impl RequestField {
            /// Every field, in declaration order.
            pub const ALL: &'static [RequestField] = &[$(RequestField::$variant,)+];

            /// Canonical wire spelling of the field name.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(RequestField::$variant => $wire,)+
                }
            }

            /// Symbolic name, e.g. `CONTENT_TYPE`.
            pub const fn symbol(&self) -> &'static str {
                match self {
                    $(RequestField::$variant => $symbol,)+
                }
            }

            /// Look up a field by its symbolic name.
            pub fn from_symbol(symbol: &str) -> Option<Self> {
                match symbol {
                    $($symbol => Some(RequestField::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

request_fields! {
    AIm => "A_IM", "A-IM";
    Accept => "ACCEPT", "Accept";
    AcceptCharset => "ACCEPT_CHARSET", "Accept-Charset";
    AcceptDatetime => "ACCEPT_DATETIME", "Accept-Datetime";
    AcceptEncoding => "ACCEPT_ENCODING", "Accept-Encoding";
    AcceptLanguage => "ACCEPT_LANGUAGE", "Accept-Language";
    AccessControlRequestMethod => "ACCESS_CONTROL_REQUEST_METHOD", "Access-Control-Request-Method";
    AccessControlRequestHeaders => "ACCESS_CONTROL_REQUEST_HEADERS", "Access-Control-Request-Headers";
    Authorization => "AUTHORIZATION", "Authorization";
    CacheControl => "CACHE_CONTROL", "Cache-Control";
    Connection => "CONNECTION", "Connection";
    ContentEncoding => "CONTENT_ENCODING", "Content-Encoding";
    ContentLength => "CONTENT_LENGTH", "Content-Length";
    ContentMd5 => "CONTENT_MD5", "Content-MD5";
    ContentType => "CONTENT_TYPE", "Content-Type";
    Cookie => "COOKIE", "Cookie";
    Date => "DATE", "Date";
    Expect => "EXPECT", "Expect";
    Forwarded => "FORWARDED", "Forwarded";
    From => "FROM", "From";
    Host => "HOST", "Host";
    IfMatch => "IF_MATCH", "If-Match";
    IfModifiedSince => "IF_MODIFIED_SINCE", "If-Modified-Since";
    IfNoneMatch => "IF_NONE_MATCH", "If-None-Match";
    IfRange => "IF_RANGE", "If-Range";
    IfUnmodifiedSince => "IF_UNMODIFIED_SINCE", "If-Unmodified-Since";
    MaxForwards => "MAX_FORWARDS", "Max-Forwards";
    Origin => "ORIGIN", "Origin";
    Pragma => "PRAGMA", "Pragma";
    Prefer => "PREFER", "Prefer";
    ProxyAuthorization => "PROXY_AUTHORIZATION", "Proxy-Authorization";
    Range => "RANGE", "Range";
    Referer => "REFERER", "Referer";
    Te => "TE", "TE";
    Trailer => "TRAILER", "Trailer";
    TransferEncoding => "TRANSFER_ENCODING", "Transfer-Encoding";
    UserAgent => "USER_AGENT", "User-Agent";
    Upgrade => "UPGRADE", "Upgrade";
    Via => "VIA", "Via";
    Warning => "WARNING", "Warning";
}

impl AsRef<str> for RequestField {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for RequestField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown request field `{0}`")]
pub struct UnknownField(pub String);

impl FromStr for RequestField {
    type Err = UnknownField;

    /// Accepts the symbolic or the wire spelling, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestField::ALL
            .iter()
            .copied()
            .find(|f| f.as_str().eq_ignore_ascii_case(s) || f.symbol().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}
