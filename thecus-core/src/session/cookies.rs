//! Minimal cookie jar for the device session
//!
//! The device only issues a handful of session cookies (PHPSESSID and
//! friends) for one host, so domain/path scoping is not tracked. The jar
//! serializes to one `name=value` per line. Netscape-format lines (as left
//! behind by curl-based tools) are read too.

const HEADER_LINE: &str = "# check-thecus-nas session cookies";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CookieJar {
    cookies: Vec<(String, String)>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(data: &[u8]) -> Self {
        let text = String::from_utf8_lossy(data);
        let mut jar = Self::new();

        for line in text.lines() {
            let line = line.trim();
            // curl marks HttpOnly cookies with this prefix
            let line = line.strip_prefix("#HttpOnly_").unwrap_or(line);
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() == 7 {
                jar.set(fields[5], fields[6]);
            } else if let Some((name, value)) = line.split_once('=') {
                jar.set(name.trim(), value.trim());
            }
        }
        jar
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = String::from(HEADER_LINE);
        out.push('\n');
        for (name, value) in &self.cookies {
            out.push_str(name);
            out.push('=');
            out.push_str(value);
            out.push('\n');
        }
        out.into_bytes()
    }

    /// Applies one `Set-Cookie` header; returns whether the jar changed
    pub fn absorb(&mut self, set_cookie: &str) -> bool {
        let mut parts = set_cookie.split(';');
        let Some((name, value)) = parts.next().and_then(|pair| pair.split_once('=')) else {
            return false;
        };
        let name = name.trim();
        let value = value.trim();
        if name.is_empty() {
            return false;
        }

        let expired = value.is_empty()
            || value == "deleted"
            || parts.any(|attr| {
                attr.split_once('=')
                    .map(|(k, v)| {
                        k.trim().eq_ignore_ascii_case("max-age")
                            && v.trim().parse::<i64>().map(|age| age <= 0).unwrap_or(false)
                    })
                    .unwrap_or(false)
            });

        if expired {
            self.remove(name)
        } else if self.get(name) == Some(value) {
            false
        } else {
            self.set(name, value);
            true
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, name: &str, value: &str) {
        match self.cookies.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.cookies.push((name.to_string(), value.to_string())),
        }
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.cookies.len();
        self.cookies.retain(|(n, _)| n != name);
        before != self.cookies.len()
    }

    /// Value for the `Cookie` request header
    pub fn header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(n, v)| format!("{}={}", n, v))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }
}
