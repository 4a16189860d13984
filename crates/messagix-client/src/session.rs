// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Session (cookies and per-session form fields) port.

use std::collections::BTreeMap;
use std::sync::Mutex;

/// Supplies the session part of every request and absorbs cookie refreshes.
pub trait Session: Send + Sync {
    /// Session form fields (tokens, revision, request counters...).
    fn form_fields(&self) -> Vec<(String, String)>;

    /// Session headers, including `cookie`.
    fn headers(&self) -> Vec<(String, String)>;

    /// Called with the headers of every completed transport call.
    fn absorb_response_headers(&self, headers: &[(String, String)]);
}

/// Fixed form fields and headers plus a cookie jar fed from `set-cookie`.
#[derive(Debug, Default)]
pub struct StaticSession {
    form: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    cookies: Mutex<BTreeMap<String, String>>,
}

impl StaticSession {
    /// Session with fixed form fields and headers.
    pub fn new(form: Vec<(String, String)>, headers: Vec<(String, String)>) -> Self {
        Self {
            form,
            headers,
            cookies: Mutex::default(),
        }
    }

    /// Seed a cookie.
    pub fn with_cookie(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_cookie(name.into(), value.into());
        self
    }

    /// Current value of cookie `name`.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.jar().get(name).cloned()
    }

    fn set_cookie(&self, name: String, value: String) {
        self.jar().insert(name, value);
    }

    fn jar(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.cookies.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Session for StaticSession {
    fn form_fields(&self) -> Vec<(String, String)> {
        self.form.clone()
    }

    fn headers(&self) -> Vec<(String, String)> {
        let mut headers = self.headers.clone();
        let jar = self.jar();
        if !jar.is_empty() {
            let cookie = jar
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            headers.push(("cookie".to_owned(), cookie));
        }
        headers
    }

    fn absorb_response_headers(&self, headers: &[(String, String)]) {
        for (name, value) in headers {
            if !name.eq_ignore_ascii_case("set-cookie") {
                continue;
            }
            let pair = value.split(';').next().unwrap_or_default();
            if let Some((k, v)) = pair.split_once('=') {
                let (k, v) = (k.trim(), v.trim());
                if k.is_empty() {
                    continue;
                }
                if v.is_empty() || v == "deleted" {
                    self.jar().remove(k);
                } else {
                    self.set_cookie(k.to_owned(), v.to_owned());
                }
            }
        }
    }
}
