//! Opaque tag values for proxy/stream pairing.

use std::borrow::Cow;
use std::fmt;

/// Opaque equality-comparable filter value.
///
/// A stream is only notified by a proxy whose configured tag equals the
/// stream's own tag for the dispatched interface. Tags are carried as
/// `Option<Tag>` on both sides; an absent tag only matches an absent tag.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    /// A string tag.
    Str(Cow<'static, str>),
    /// An integer tag.
    Int(i64),
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Str(v) => f.write_str(v),
            Tag::Int(v) => write!(f, "{v}"),
        }
    }
}

impl From<&'static str> for Tag {
    fn from(v: &'static str) -> Self {
        Tag::Str(Cow::Borrowed(v))
    }
}

impl From<String> for Tag {
    fn from(v: String) -> Self {
        Tag::Str(Cow::Owned(v))
    }
}

impl From<i64> for Tag {
    fn from(v: i64) -> Self {
        Tag::Int(v)
    }
}
