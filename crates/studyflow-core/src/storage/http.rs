//! REST-backed store client.
//!
//! Speaks the dashboard's `/active-timer`, `/study-sessions` and `/goals`
//! endpoints. The bearer credential is read from the session cookie value;
//! absence of the cookie degrades to an unauthenticated request -- rejecting
//! it is the backend's job, not ours.

use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use url::Url;

use super::{CheckpointStore, CompletedSession, GoalStore, SessionLog};
use crate::error::StoreError;
use crate::goals::{Goal, GoalForm};
use crate::timer::TimerCheckpoint;

const TOKEN_COOKIE: &str = "token";

#[derive(Debug, serde::Serialize, Deserialize)]
struct TimerEnvelope {
    timer: Option<TimerCheckpoint>,
}

#[derive(Debug, Deserialize)]
struct SessionEnvelope {
    session: CompletedSession,
}

#[derive(Debug, Deserialize)]
struct SessionsEnvelope {
    sessions: Vec<CompletedSession>,
}

#[derive(Debug, Deserialize)]
struct GoalsEnvelope {
    goals: Vec<Goal>,
}

/// Extract the bearer credential from a `Cookie` header value.
/// Returns `None` when the token cookie is absent or empty.
pub fn bearer_from_cookie(cookie_header: &str) -> Option<String> {
    cookie_header.split(';').find_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        if name.trim() == TOKEN_COOKIE && !value.trim().is_empty() {
            Some(value.trim().to_string())
        } else {
            None
        }
    })
}

/// Client for the record-storage REST endpoints.
pub struct ApiClient {
    base_url: Url,
    bearer: Option<String>,
    http: Client,
    runtime: tokio::runtime::Runtime,
}

impl ApiClient {
    pub fn new(base_url: &str, bearer: Option<String>) -> Result<Self, StoreError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| StoreError::Api {
                status: 0,
                message: format!("invalid base url: {e}"),
            })?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            base_url,
            bearer,
            http: Client::new(),
            runtime,
        })
    }

    /// Build a client taking the credential from a `Cookie` header value.
    pub fn from_cookie(base_url: &str, cookie_header: Option<&str>) -> Result<Self, StoreError> {
        let bearer = cookie_header.and_then(bearer_from_cookie);
        Self::new(base_url, bearer)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, StoreError> {
        let url = self.base_url.join(path).map_err(|e| StoreError::Api {
            status: 0,
            message: format!("invalid path '{path}': {e}"),
        })?;
        let mut builder = self.http.request(method, url);
        if let Some(token) = &self.bearer {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    fn execute<T: for<'de> Deserialize<'de>>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, StoreError> {
        self.runtime.block_on(async {
            let resp = builder.send().await?;
            let status = resp.status();
            if !status.is_success() {
                let message = resp.text().await.unwrap_or_default();
                return Err(StoreError::Api {
                    status: status.as_u16(),
                    message,
                });
            }
            Ok(resp.json::<T>().await?)
        })
    }

    fn execute_no_body(&self, builder: RequestBuilder) -> Result<(), StoreError> {
        self.runtime.block_on(async {
            let resp = builder.send().await?;
            let status = resp.status();
            if !status.is_success() {
                let message = resp.text().await.unwrap_or_default();
                return Err(StoreError::Api {
                    status: status.as_u16(),
                    message,
                });
            }
            Ok(())
        })
    }
}

impl CheckpointStore for ApiClient {
    fn load(&self) -> Result<Option<TimerCheckpoint>, StoreError> {
        let envelope: TimerEnvelope = self.execute(self.request(Method::GET, "active-timer")?)?;
        Ok(envelope.timer)
    }

    fn save(&self, checkpoint: &TimerCheckpoint) -> Result<(), StoreError> {
        let body = TimerEnvelope {
            timer: Some(checkpoint.clone()),
        };
        self.execute_no_body(self.request(Method::POST, "active-timer")?.json(&body))
    }

    fn delete(&self) -> Result<(), StoreError> {
        self.execute_no_body(self.request(Method::DELETE, "active-timer")?)
    }

    /// Read-check-delete against the remote record. Not atomic on the wire --
    /// the backend owns any stronger precondition; this closes the window to
    /// a single round-trip rather than eliminating it.
    fn delete_if_version(&self, version: u64) -> Result<bool, StoreError> {
        match self.load()? {
            Some(stored) if stored.version <= version => {
                self.delete()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl SessionLog for ApiClient {
    fn append(&self, session: &CompletedSession) -> Result<CompletedSession, StoreError> {
        let envelope: SessionEnvelope =
            self.execute(self.request(Method::POST, "study-sessions")?.json(session))?;
        Ok(envelope.session)
    }

    fn list(&self) -> Result<Vec<CompletedSession>, StoreError> {
        let envelope: SessionsEnvelope = self.execute(self.request(Method::GET, "study-sessions")?)?;
        Ok(envelope.sessions)
    }
}

impl GoalStore for ApiClient {
    fn list_goals(&self) -> Result<Vec<Goal>, StoreError> {
        let envelope: GoalsEnvelope = self.execute(self.request(Method::GET, "goals")?)?;
        Ok(envelope.goals)
    }

    fn create_goal(&self, form: &GoalForm) -> Result<Vec<Goal>, StoreError> {
        let envelope: GoalsEnvelope =
            self.execute(self.request(Method::POST, "goals")?.json(form))?;
        Ok(envelope.goals)
    }

    fn delete_goal(&self, id: &str) -> Result<Vec<Goal>, StoreError> {
        let envelope: GoalsEnvelope =
            self.execute(self.request(Method::DELETE, "goals")?.query(&[("id", id)]))?;
        Ok(envelope.goals)
    }
}
