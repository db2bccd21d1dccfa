//! Session-authenticated requests against the device web UI
//!
//! Per logical request the client:
//! - attaches the session cookie and follows the device's redirect chain,
//!   writing every cookie change back to the session store
//! - classifies the final response (HTTP class, session markers, JSON body)
//! - on a lost session, logs in once and replays the request once with
//!   auto-login disabled, so a device that keeps rejecting the session
//!   cannot cause a loop

pub mod cookies;
pub mod store;

pub use cookies::CookieJar;
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};

use crate::device::{value_text, DeviceResponse};
use crate::endpoints::LOGIN_PATH;
use crate::error::{CheckError, Result};
use crate::transport::{HttpRequest, HttpResponse, Method, Transport};
use reqwest::Url;
use serde_json::Value;
use tracing::{debug, info, trace, warn};

/// Body marker of the N5500 "session expired" redirect page
const LOGOUT_REDIRECT_MARKER: &str = "/adm/logout.php";
/// Landing page when the submitted credentials were rejected
const UNAUTHENTICATED_PATH: &str = "/unauth.htm";
/// Landing page when another admin session is active
const IN_USE_PATH: &str = "/adm/inuse.htm";

const MAX_REDIRECTS: usize = 10;
const LOGIN_FAILED: &str = "Thecus login failed";

#[derive(Debug, Clone)]
pub struct Credentials {
    pub hostname: String,
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(
        hostname: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

pub struct SessionClient<T: Transport> {
    transport: T,
    credentials: Credentials,
    base_url: String,
    store: Box<dyn SessionStore>,
    jar: Option<CookieJar>,
    login_attempts: u32,
}

impl<T: Transport> SessionClient<T> {
    pub fn new(transport: T, credentials: Credentials, store: Box<dyn SessionStore>) -> Self {
        let base_url = format!("http://{}", credentials.hostname);
        Self {
            transport,
            credentials,
            base_url,
            store,
            jar: None,
            login_attempts: 0,
        }
    }

    /// Switches the base URL scheme (`http` by default)
    pub fn with_scheme(mut self, scheme: &str) -> Self {
        self.base_url = format!("{}://{}", scheme, self.credentials.hostname);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Number of logins performed by this client so far
    pub fn login_attempts(&self) -> u32 {
        self.login_attempts
    }

    /// GET (or POST when `body` is given) with transparent re-login
    pub async fn request(&mut self, path: &str, body: Option<&str>) -> Result<DeviceResponse> {
        self.request_with(path, body, true).await
    }

    pub async fn request_with(
        &mut self,
        path: &str,
        body: Option<&str>,
        allow_auto_login: bool,
    ) -> Result<DeviceResponse> {
        match self.exchange(path, body).await {
            Err(CheckError::AuthorizationExpired) if allow_auto_login => {
                info!("Session on {} not authorized, logging in", self.credentials.hostname);
                self.login().await?;
                self.exchange(path, body).await
            }
            outcome => outcome,
        }
    }

    /// Submits the credentials to the login form
    pub async fn login(&mut self) -> Result<DeviceResponse> {
        self.login_attempts += 1;
        info!(
            "Login attempt {} as {} on {}",
            self.login_attempts, self.credentials.username, self.credentials.hostname
        );

        let form = self.login_form();
        let response = match self.exchange(LOGIN_PATH, Some(&form)).await {
            Ok(response) => response,
            Err(CheckError::AuthorizationExpired) => {
                warn!("Device redirected the login itself to logout");
                return Err(CheckError::AuthenticationFailed(LOGIN_FAILED.to_string()));
            }
            // a broken login page must not send the resolver to the next endpoint
            Err(e) if e.is_endpoint_local() => {
                return Err(CheckError::AuthenticationFailed(format!("{}: {}", LOGIN_FAILED, e)));
            }
            Err(e) => return Err(e),
        };

        if login_succeeded(&response) {
            debug!("Login accepted");
            Ok(response)
        } else {
            let message = response
                .value()
                .pointer("/errormsg/msg")
                .and_then(value_text)
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| LOGIN_FAILED.to_string());
            warn!("Login rejected: {}", message);
            Err(CheckError::AuthenticationFailed(message))
        }
    }

    fn login_form(&self) -> String {
        let username = self.credentials.username.as_str();
        let password = self.credentials.password.as_str();
        [
            ("username", username),
            ("pwd", password),
            ("p_user", username),
            ("p_pass", password),
            ("action", "login"),
            ("option", "com_extplorer"),
            ("eplang", "english"),
        ]
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
    }

    /// One logical call: redirect chain plus classification, no re-login
    async fn exchange(&mut self, path: &str, body: Option<&str>) -> Result<DeviceResponse> {
        debug!(
            "Request issued: {} {}",
            if body.is_some() { "POST" } else { "GET" },
            path
        );
        let response = self.follow(path, body).await?;
        let outcome = classify(path, &response);
        match &outcome {
            Ok(_) => debug!("Request classified: {} -> success", path),
            Err(e) => debug!("Request classified: {} -> {}", path, e),
        }
        outcome
    }

    async fn follow(&mut self, path: &str, body: Option<&str>) -> Result<HttpResponse> {
        let mut method = if body.is_some() { Method::Post } else { Method::Get };
        let mut body = body.map(str::to_string);
        let mut url = format!("{}{}", self.base_url, path);

        for _ in 0..=MAX_REDIRECTS {
            let cookie = self.jar()?.header();
            let request = HttpRequest {
                method,
                url: url.clone(),
                body: body.clone(),
                cookie,
            };
            let mut response = self.transport.execute(request).await?;
            self.persist(&response.set_cookies)?;

            if !response.is_redirect() {
                if response.url.is_empty() {
                    response.url = url;
                }
                return Ok(response);
            }

            let location = response.location.as_deref().unwrap_or_default();
            let next = redirect_target(&url, location)?;
            trace!("Redirect {} -> {} ({})", url, next, response.status);
            if matches!(response.status, 301 | 302 | 303) {
                method = Method::Get;
                body = None;
            }
            url = next;
        }

        Err(CheckError::Transport(format!("Too many redirects requesting {}", path)))
    }

    /// Cookie jar, loaded from the store on first use
    fn jar(&mut self) -> Result<&mut CookieJar> {
        if self.jar.is_none() {
            let loaded = self
                .store
                .load()?
                .map(|data| CookieJar::from_bytes(&data))
                .unwrap_or_default();
            debug!("Session store loaded ({} cookies)", loaded.len());
            self.jar = Some(loaded);
        }
        Ok(self.jar.get_or_insert_with(CookieJar::new))
    }

    fn persist(&mut self, set_cookies: &[String]) -> Result<()> {
        let jar = self.jar()?;
        for header in set_cookies {
            jar.absorb(header);
        }
        let data = jar.to_bytes();
        self.store.save(&data)?;
        Ok(())
    }
}

/// Outcome of one response, checked in fixed priority order
fn classify(path: &str, response: &HttpResponse) -> Result<DeviceResponse> {
    let status = response.status;
    if (400..500).contains(&status) {
        return Err(CheckError::ClientError {
            status,
            path: path.to_string(),
        });
    }
    if (500..600).contains(&status) {
        return Err(CheckError::ServerError {
            status,
            path: path.to_string(),
        });
    }

    if response.body.contains(LOGOUT_REDIRECT_MARKER) {
        return Err(CheckError::AuthorizationExpired);
    }
    let final_path = strip_query(&response.url);
    if final_path.ends_with(UNAUTHENTICATED_PATH) {
        return Err(CheckError::AuthenticationFailed(LOGIN_FAILED.to_string()));
    }
    if final_path.ends_with(IN_USE_PATH) {
        return Err(CheckError::SessionConflict);
    }

    DeviceResponse::parse(&response.body).map_err(|reason| CheckError::Decode {
        path: path.to_string(),
        reason,
    })
}

fn login_succeeded(response: &DeviceResponse) -> bool {
    match response.get("success") {
        Some(Value::Bool(ok)) => *ok,
        Some(Value::String(s)) => s == "true",
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    }
}

fn strip_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

/// Resolves a `Location` header against the URL that produced it
fn redirect_target(current: &str, location: &str) -> Result<String> {
    let base = Url::parse(current)
        .map_err(|e| CheckError::Transport(format!("Invalid request URL {}: {}", current, e)))?;
    let next = base
        .join(location)
        .map_err(|e| CheckError::Transport(format!("Invalid redirect target {}: {}", location, e)))?;
    Ok(next.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, url: &str, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            url: url.to_string(),
            body: body.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_classification_priority() {
        // HTTP class wins over markers in the body
        let r = response(404, "http://nas/adm/x", "/adm/logout.php");
        assert!(matches!(classify("/x", &r), Err(CheckError::ClientError { status: 404, .. })));

        let r = response(503, "http://nas/adm/x", "");
        assert!(matches!(classify("/x", &r), Err(CheckError::ServerError { status: 503, .. })));

        let r = response(200, "http://nas/adm/x", "<script>location='/adm/logout.php'</script>");
        assert!(matches!(classify("/x", &r), Err(CheckError::AuthorizationExpired)));

        let r = response(200, "http://nas/unauth.htm", "<html>");
        assert!(matches!(classify("/x", &r), Err(CheckError::AuthenticationFailed(_))));

        let r = response(200, "http://nas/adm/inuse.htm?from=1.2.3.4", "<html>");
        assert!(matches!(classify("/x", &r), Err(CheckError::SessionConflict)));

        let r = response(200, "http://nas/adm/x", "");
        assert!(matches!(classify("/x", &r), Err(CheckError::Decode { .. })));

        let r = response(200, "http://nas/adm/x", "{\"cpu_loading\": 3}");
        assert!(classify("/x", &r).is_ok());
    }

    #[test]
    fn test_login_success_field() {
        let ok = DeviceResponse::new(serde_json::json!({"success": "true"}));
        let ok_bool = DeviceResponse::new(serde_json::json!({"success": true}));
        let failed = DeviceResponse::new(serde_json::json!({"success": false}));
        let missing = DeviceResponse::new(serde_json::json!({}));
        assert!(login_succeeded(&ok));
        assert!(login_succeeded(&ok_bool));
        assert!(!login_succeeded(&failed));
        assert!(!login_succeeded(&missing));
    }

    #[test]
    fn test_redirect_target() {
        let current = "http://nas.local/adm/getmain.php?fun=disks";
        let target = |location: &str| redirect_target(current, location).unwrap();

        assert_eq!(target("/unauth.htm"), "http://nas.local/unauth.htm");
        assert_eq!(target("inuse.htm"), "http://nas.local/adm/inuse.htm");
        assert_eq!(target("https://other/x"), "https://other/x");
        assert_eq!(
            target("?fun=disks&page=2"),
            "http://nas.local/adm/getmain.php?fun=disks&page=2"
        );
        assert_eq!(target("//nas2/adm/y.php"), "http://nas2/adm/y.php");
        assert_eq!(target("../index.htm"), "http://nas.local/index.htm");
        assert_eq!(
            redirect_target("http://nas.local", "a.htm").unwrap(),
            "http://nas.local/a.htm"
        );
    }

    #[test]
    fn test_redirect_target_rejects_bad_location() {
        let err = redirect_target("http://nas.local/adm/x.php", "http://[bad").unwrap_err();
        assert!(matches!(err, CheckError::Transport(_)));
    }
}
