use std::sync::Arc;

use async_trait::async_trait;
use proctor_core::{
    ActivityEvent, ActivityTransport, Error, SnapshotUpload, TokenProvider,
    activity::SNAPSHOT_ACTIVITY_TYPE, session::ActivityRoute,
};
use reqwest::{
    Client, Response,
    header::AUTHORIZATION,
    multipart::{Form, Part},
};
use tracing::instrument;

/// Posts activity to `{base_url}/assessment/{type}/{id}/log-activity/`.
///
/// No client-side timeout and no retry: a failed or hung request is abandoned.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenProvider>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
            tokens,
        }
    }

    pub fn url(&self, route: &ActivityRoute) -> String {
        format!("{}{}", self.base_url, route.path())
    }
}

#[async_trait]
impl ActivityTransport for HttpTransport {
    #[instrument(skip_all, fields(path = %route.path(), activity_type = %event.activity_type))]
    async fn post_activity(
        &self,
        route: &ActivityRoute,
        event: &ActivityEvent,
    ) -> Result<(), Error> {
        let mut request = self.client.post(self.url(route)).json(event);
        if let Some(token) = self.tokens.auth_token() {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(transport_error)?;
        check_status(response)
    }

    #[instrument(skip_all, fields(path = %route.path(), bytes = snapshot.png.len()))]
    async fn post_snapshot(
        &self,
        route: &ActivityRoute,
        snapshot: &SnapshotUpload,
        bearer: Option<&str>,
    ) -> Result<(), Error> {
        let image = Part::bytes(snapshot.png.clone())
            .file_name("snapshot.png")
            .mime_str("image/png")
            .map_err(transport_error)?;
        let mut form = Form::new()
            .part("snapshot", image)
            .text("activity_type", SNAPSHOT_ACTIVITY_TYPE)
            .text("timestamp", snapshot.timestamp_iso8601());
        if let Some(question_id) = &snapshot.question_id {
            form = form.text("question_id", question_id.clone());
        }

        let mut request = self.client.post(self.url(route)).multipart(form);
        if let Some(token) = bearer {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let response = request.send().await.map_err(transport_error)?;
        check_status(response)
    }
}

fn check_status(response: Response) -> Result<(), Error> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(Error::Status(status.as_u16()))
    }
}

fn transport_error(error: reqwest::Error) -> Error {
    Error::Transport(format!("{error:?}"))
}
