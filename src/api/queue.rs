use crate::transport::request::Request;
use crate::{Error, PollOptions, QueueItem, QueueItemId, poll};
use serde_json::Value;

/// Jenkins queue APIs.
#[derive(Clone, Debug)]
pub struct QueueService {
    client: crate::Client,
}

impl QueueService {
    pub(crate) fn new(client: crate::Client) -> Self {
        Self { client }
    }

    /// `GET /queue/api/json`
    pub async fn list(&self, tree: Option<&str>) -> Result<Value, Error> {
        let req = Request::get(["queue", "api", "json"]).query_opt("tree", tree);
        self.client.send_json(req).await
    }

    /// `GET /queue/item/<id>/api/json`
    pub async fn item(&self, id: impl Into<QueueItemId>) -> Result<QueueItem, Error> {
        let id = id.into().to_string();
        let req = Request::get(["queue", "item", id.as_str(), "api", "json"]);
        self.client.send_json(req).await
    }

    /// `POST /queue/cancelItem?id=<id>`
    pub async fn cancel(&self, id: impl Into<QueueItemId>) -> Result<(), Error> {
        let req = Request::post(["queue", "cancelItem"]).query_pair("id", id.into().to_string());
        self.client.send_unit(req).await
    }

    /// Poll the queue item until an executor picked it up.
    ///
    /// The returned item has `executable` set. A `404` is waited through,
    /// as the item may not be visible yet; any other failure ends the wait.
    pub async fn wait_for_executable(
        &self,
        id: impl Into<QueueItemId>,
        options: PollOptions,
    ) -> Result<QueueItem, Error> {
        let id = id.into();
        poll::wait_for(
            || self.item(id),
            |attempt| match attempt {
                Ok(item) => item.executable.is_none(),
                Err(err) => err.is_not_found(),
            },
            options,
        )
        .await
    }
}
