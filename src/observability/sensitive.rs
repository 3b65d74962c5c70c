use std::fmt::{self, Debug, Display, Formatter};

use serde::{Serialize, Serializer};

/// Keeps a value out of log output.
///
/// Used for the sentinel marker: anyone who can read the logs must not learn
/// which value trips the wire. Formatting and serialization only reveal the
/// value's length; `.expose()` returns the real thing.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Sensitive<T>(T);

impl<T> Sensitive<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: AsRef<str>> Sensitive<T> {
    fn redacted(&self) -> String {
        format!("[REDACTED; {} bytes]", self.0.as_ref().len())
    }
}

impl<T: AsRef<str>> Debug for Sensitive<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl<T: AsRef<str>> Display for Sensitive<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl<T: AsRef<str>> Serialize for Sensitive<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.redacted())
    }
}
