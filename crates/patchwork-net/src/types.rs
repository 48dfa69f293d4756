use std::{collections::HashMap, time::Duration};

#[derive(Clone, Debug, PartialEq)]
pub struct Headers {
    inner: HashMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self {
            inner: HashMap::new(),
        }
    }

    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.inner.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Overlay `other` on top of `self`; keys in `other` win.
    #[must_use]
    pub fn merged(&self, other: Option<&Headers>) -> Headers {
        let mut out = self.clone();
        if let Some(other) = other {
            for (k, v) in other.iter() {
                out.insert(k, v);
            }
        }
        out
    }
}

impl Default for Headers {
    fn default() -> Self {
        Self::new()
    }
}

impl From<HashMap<String, String>> for Headers {
    fn from(map: HashMap<String, String>) -> Self {
        Self { inner: map }
    }
}

#[derive(Clone, Debug)]
pub struct NetOptions {
    /// Bound on establishing a connection.
    pub connect_timeout: Duration,
    /// Bound on the response phase of a request, applied by [`crate::TimeoutNet`].
    pub request_timeout: Duration,
    /// Max idle connections per host. Set to 0 to disable pooling and reduce memory.
    pub pool_max_idle_per_host: usize,
    /// Headers attached to every request.
    pub default_headers: Headers,
}

impl Default for NetOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            request_timeout: Duration::from_secs(30),
            pool_max_idle_per_host: 0,
            default_headers: Headers::new(),
        }
    }
}

impl NetOptions {
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_header<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.default_headers.insert(key, value);
        self
    }
}
