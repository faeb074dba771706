use super::{Remote, RemoteError, UNKNOWN_ERROR};
use crate::config::RemoteConfig;
use crate::model::{Class, ClassPayload, EntityId, EntityKind, Student, StudentPayload};
use reqwest::blocking::{Client, Response};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// REST adapter. The cookie store is enabled so session credentials set by
/// the server travel with every call.
pub struct HttpRemote {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

impl HttpRemote {
    pub fn new(base_url: &str, config: &RemoteConfig) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| RemoteError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, kind: EntityKind, id: Option<EntityId>) -> String {
        match id {
            Some(id) => format!("{}/{}/{}", self.base_url, kind.resource(), id),
            None => format!("{}/{}", self.base_url, kind.resource()),
        }
    }

    fn send(
        &self,
        method: Method,
        url: String,
        body: Option<serde_json::Value>,
    ) -> Result<Response, RemoteError> {
        debug!(%method, %url, "remote request");
        let mut req = self.client.request(method.clone(), &url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().map_err(|e| {
            warn!(%method, %url, error = %e, "remote request failed");
            RemoteError::Transport(e.to_string())
        })?;
        debug!(%method, %url, status = resp.status().as_u16(), "remote response");
        Ok(resp)
    }

    fn list<T: DeserializeOwned>(&self, kind: EntityKind) -> Result<Vec<T>, RemoteError> {
        let resp = self.send(Method::GET, self.url(kind, None), None)?;
        read_record(resp)
    }

    fn write<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        kind: EntityKind,
        id: Option<EntityId>,
        payload: &B,
    ) -> Result<T, RemoteError> {
        let body = serde_json::to_value(payload)
            .map_err(|e| RemoteError::Transport(format!("failed to encode payload: {e}")))?;
        let resp = self.send(method, self.url(kind, id), Some(body))?;
        read_record(resp)
    }

    fn delete(&self, kind: EntityKind, id: EntityId) -> Result<(), RemoteError> {
        let resp = self.send(Method::DELETE, self.url(kind, Some(id)), None)?;
        if resp.status().is_success() {
            return Ok(());
        }
        Err(rejection(resp))
    }
}

fn read_record<T: DeserializeOwned>(resp: Response) -> Result<T, RemoteError> {
    if !resp.status().is_success() {
        return Err(rejection(resp));
    }
    resp.json::<T>()
        .map_err(|e| RemoteError::Transport(format!("invalid response body: {e}")))
}

fn rejection(resp: Response) -> RemoteError {
    let status = resp.status().as_u16();
    match resp.json::<ErrorBody>() {
        Ok(body) => RemoteError::Rejected {
            status,
            message: body.error.unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
        },
        Err(e) => RemoteError::Transport(format!("status {status} with unreadable body: {e}")),
    }
}

impl Remote for HttpRemote {
    fn describe(&self) -> String {
        self.base_url.clone()
    }

    fn list_classes(&self) -> Result<Vec<Class>, RemoteError> {
        self.list(EntityKind::Class)
    }

    fn create_class(&self, payload: &ClassPayload) -> Result<Class, RemoteError> {
        self.write(Method::POST, EntityKind::Class, None, payload)
    }

    fn update_class(&self, id: EntityId, payload: &ClassPayload) -> Result<Class, RemoteError> {
        self.write(Method::PUT, EntityKind::Class, Some(id), payload)
    }

    fn delete_class(&self, id: EntityId) -> Result<(), RemoteError> {
        self.delete(EntityKind::Class, id)
    }

    fn list_students(&self) -> Result<Vec<Student>, RemoteError> {
        self.list(EntityKind::Student)
    }

    fn create_student(&self, payload: &StudentPayload) -> Result<Student, RemoteError> {
        self.write(Method::POST, EntityKind::Student, None, payload)
    }

    fn update_student(
        &self,
        id: EntityId,
        payload: &StudentPayload,
    ) -> Result<Student, RemoteError> {
        self.write(Method::PUT, EntityKind::Student, Some(id), payload)
    }

    fn delete_student(&self, id: EntityId) -> Result<(), RemoteError> {
        self.delete(EntityKind::Student, id)
    }
}
