use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use super::{session::Session, ClientError};
use crate::{
    auth::dto::{LoginResponse, SignupResponse},
    error::ErrorBody,
    todos::{
        dto::{
            CreateTodoRequest, DeleteTodoRequest, MessageResponse, TodoResponse, TodosResponse,
            UpdateTodoRequest,
        },
        NewTodo, Todo, TodoPatch,
    },
};

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn signup(&self, name: &str, email: &str, password: &str)
        -> Result<SignupResponse, ClientError>;
    async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError>;
}

#[async_trait]
pub trait TodoApi: Send + Sync {
    async fn list(&self, session: &Session) -> Result<Vec<Todo>, ClientError>;
    async fn create(&self, session: &Session, todo: &NewTodo) -> Result<Todo, ClientError>;
    async fn update(&self, session: &Session, id: i64, patch: &TodoPatch)
        -> Result<Todo, ClientError>;
    async fn delete(&self, session: &Session, id: i64) -> Result<(), ClientError>;
}

/// HTTP client for the `/api/v1` endpoints.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:8080`.
    pub fn new(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ClientError> {
        let res = req.send().await?;
        let status = res.status();
        if !status.is_success() {
            let message = match res.json::<ErrorBody>().await {
                Ok(body) => body.message,
                Err(_) => status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string(),
            };
            debug!(status = status.as_u16(), %message, "api error");
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(res.json::<T>().await?)
    }
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<SignupResponse, ClientError> {
        let req = self.http.post(self.url("/auth/signup")).json(&json!({
            "name": name,
            "email": email,
            "password": password,
        }));
        self.send(req).await
    }

    async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let req = self
            .http
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }));
        let res: LoginResponse = self.send(req).await?;
        Ok(Session {
            user: res.user,
            access_token: res.access_token,
        })
    }
}

#[async_trait]
impl TodoApi for ApiClient {
    async fn list(&self, session: &Session) -> Result<Vec<Todo>, ClientError> {
        let req = self
            .http
            .get(self.url("/todos"))
            .query(&[("userId", session.user.id.to_string())])
            .bearer_auth(&session.access_token);
        let res: TodosResponse = self.send(req).await?;
        Ok(res.todos)
    }

    async fn create(&self, session: &Session, todo: &NewTodo) -> Result<Todo, ClientError> {
        let body = CreateTodoRequest {
            title: Some(todo.title.clone()),
            description: Some(todo.description.clone()),
            status: Some(todo.status),
            user_id: Some(session.user.id.to_string()),
        };
        let req = self
            .http
            .post(self.url("/todos"))
            .bearer_auth(&session.access_token)
            .json(&body);
        let res: TodoResponse = self.send(req).await?;
        Ok(res.todo)
    }

    async fn update(
        &self,
        session: &Session,
        id: i64,
        patch: &TodoPatch,
    ) -> Result<Todo, ClientError> {
        let body = UpdateTodoRequest {
            id,
            title: patch.title.clone(),
            description: patch.description.clone(),
            status: patch.status,
        };
        let req = self
            .http
            .put(self.url("/todos"))
            .bearer_auth(&session.access_token)
            .json(&body);
        let res: TodoResponse = self.send(req).await?;
        Ok(res.todo)
    }

    async fn delete(&self, session: &Session, id: i64) -> Result<(), ClientError> {
        let req = self
            .http
            .delete(self.url("/todos"))
            .bearer_auth(&session.access_token)
            .json(&DeleteTodoRequest { id });
        let _: MessageResponse = self.send(req).await?;
        Ok(())
    }
}
