//! Web session collaborators: account login, join registration and the
//! periodic session keep-alive.
//!
//! Calls are blocking; the client runs them on the blocking pool.

use tracing::debug;

use crate::error::{Error, Result};

const LOGIN_URL: &str = "https://login.minecraft.net";
const JOIN_URL: &str = "http://session.minecraft.net/game/joinserver.jsp";
const SESSION_URL: &str = "https://login.minecraft.net/session";

/// Launcher version reported to the login endpoint
const LAUNCHER_VERSION: &str = "13";

/// Identity used for a game session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    /// Empty in offline mode
    pub token: String,
}

impl Session {
    pub fn offline(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: String::new(),
        }
    }

    pub fn is_offline(&self) -> bool {
        self.token.is_empty()
    }
}

pub trait SessionService: Send + Sync {
    /// Exchange credentials for a session
    fn login(&self, username: &str, password: &str) -> Result<Session>;

    /// Register an upcoming join with the session server
    fn join_server(&self, session: &Session, server_hash: &str) -> Result<()>;

    /// Keep the web session alive
    fn keep_alive(&self, session: &Session) -> Result<()>;
}

/// Session service backed by the legacy HTTP endpoints
#[derive(Debug, Clone)]
pub struct HttpSessionService {
    agent: ureq::Agent,
}

impl HttpSessionService {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
        }
    }
}

impl Default for HttpSessionService {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionService for HttpSessionService {
    fn login(&self, username: &str, password: &str) -> Result<Session> {
        debug!("POST {} user={} version={}", LOGIN_URL, username, LAUNCHER_VERSION);
        let body = self
            .agent
            .post(LOGIN_URL)
            .send_form(&[
                ("user", username),
                ("password", password),
                ("version", LAUNCHER_VERSION),
            ])
            .map_err(|e| Error::Auth(e.to_string()))?
            .into_string()
            .map_err(|e| Error::Auth(e.to_string()))?;
        parse_login_response(&body)
    }

    fn join_server(&self, session: &Session, server_hash: &str) -> Result<()> {
        debug!("GET {} user={} serverId={}", JOIN_URL, session.username, server_hash);
        self.agent
            .get(JOIN_URL)
            .query("user", &session.username)
            .query("sessionId", &session.token)
            .query("serverId", server_hash)
            .call()
            .map_err(|e| Error::Auth(e.to_string()))?;
        Ok(())
    }

    fn keep_alive(&self, session: &Session) -> Result<()> {
        debug!("GET {} name={}", SESSION_URL, session.username);
        self.agent
            .get(SESSION_URL)
            .query("name", &session.username)
            .query("session", &session.token)
            .call()
            .map_err(|e| Error::Auth(e.to_string()))?;
        Ok(())
    }
}

/// Parse `version:ticket:username:session_id`. Anything else is the
/// server's error message.
pub fn parse_login_response(body: &str) -> Result<Session> {
    let body = body.trim();
    let parts: Vec<&str> = body.split(':').collect();
    if parts.len() < 4 {
        return Err(Error::Auth(body.to_string()));
    }
    Ok(Session {
        username: parts[2].to_string(),
        token: parts[3].to_string(),
    })
}

/// Session service for servers running in offline mode
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSessionService;

impl SessionService for OfflineSessionService {
    fn login(&self, username: &str, _password: &str) -> Result<Session> {
        Ok(Session::offline(username))
    }

    fn join_server(&self, _session: &Session, _server_hash: &str) -> Result<()> {
        Ok(())
    }

    fn keep_alive(&self, _session: &Session) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_login_response() {
        let session = parse_login_response("1343825972000:deprecated:Notch:abc123\n").unwrap();
        assert_eq!(session.username, "Notch");
        assert_eq!(session.token, "abc123");
        assert!(!session.is_offline());
    }

    #[test]
    fn test_parse_login_failure() {
        let err = parse_login_response("Bad login").unwrap_err();
        assert!(matches!(err, Error::Auth(ref msg) if msg == "Bad login"));
    }

    #[test]
    fn test_offline_service() {
        let service = OfflineSessionService;
        let session = service.login("steve", "").unwrap();
        assert!(session.is_offline());
        service.join_server(&session, "-").unwrap();
        service.keep_alive(&session).unwrap();
    }
}
