//! Client for the parts of the Orion NGSI-v2 API this tool needs.
//!
//! API reference: <https://fiware-ges.github.io/orion/api/v2/stable/>

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use ureq::tls::{TlsConfig, TlsProvider};
use ureq::{Agent, RequestBuilder};
use url::Url;

use crate::config::Config;
use crate::constants::{defaults, headers};
use crate::data_mgmt::batch::flush;
use crate::data_mgmt::models::{EntityRef, MeasurementRequest, MeasurementResult, TIME_INSTANT};
use crate::data_mgmt::{
    upload_if_within_budget, ActionType, Batch, BatchPacker, BatchResult, GateOutcome,
    SerializationError, UploadFailure, UploadOutcome, Uploader,
};
use crate::helpers;

const STATUS_NOT_FOUND: u16 = 404;
const FIRST_ERROR_STATUS: u16 = 400;

#[derive(Error, Debug)]
pub enum FiwareError {
    #[error("request failed: {0}")]
    Transport(#[from] ureq::Error),
    #[error("{url} returned status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("could not parse response JSON: {0}")]
    ParseJson(#[from] serde_json::Error),
    #[error(transparent)]
    Serialization(#[from] SerializationError),
    #[error("invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("endpoint {0} cannot be used as a base URL")]
    BaseUrl(String),
}

struct RawResponse {
    status: u16,
    body: String,
}

pub struct FiwareClient {
    agent: Agent,
    endpoint: String,
    token: String,
    service: Option<String>,
    retry_max_elapsed: Duration,
}

/// Sends packer payloads to `op/update` unchanged.
pub struct OrionUploader<'a> {
    client: &'a FiwareClient,
    key_values: bool,
}

impl<E> Uploader<E> for OrionUploader<'_> {
    fn upload(&mut self, batch: &Batch<'_, E>) -> UploadOutcome {
        self.client.post_update(batch.payload(), self.key_values)
    }
}

fn get_ureq_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .tls_config(
            TlsConfig::builder()
                .provider(TlsProvider::NativeTls)
                .build(),
        )
        .build()
        .into()
}

impl FiwareClient {
    pub fn new(config: &Config) -> Self {
        FiwareClient {
            agent: get_ureq_agent(config.request_timeout()),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            service: config.service().map(str::to_string),
            retry_max_elapsed: config.retry_max_elapsed(),
        }
    }

    fn with_headers<B>(&self, req: RequestBuilder<B>) -> RequestBuilder<B> {
        let req = if self.token.is_empty() {
            req
        } else {
            req.header(headers::AUTH_TOKEN, self.token.as_str())
        };
        match &self.service {
            Some(service) => req.header(headers::FIWARE_SERVICE, service.as_str()),
            None => req,
        }
    }

    /// Sends a GET request, retrying when no response could be obtained.
    fn send_get(&self, url: &str, query: &[(&str, &str)]) -> Result<RawResponse, FiwareError> {
        let request = || -> Result<RawResponse, backoff::Error<ureq::Error>> {
            log::debug!("GET {} {:?}", url, query);
            let mut req = self.with_headers(self.agent.get(url));
            for (key, value) in query {
                req = req.query(*key, *value);
            }
            let mut resp = req.call().map_err(backoff::Error::transient)?;
            let status = resp.status().as_u16();
            let body = resp
                .body_mut()
                .with_config()
                .limit(defaults::MAX_RESPONSE_BYTES)
                .read_to_string()
                .map_err(backoff::Error::transient)?;
            Ok(RawResponse { status, body })
        };
        helpers::backoff_retry(request, Some(self.retry_max_elapsed))
            .map_err(|e: backoff::Error<ureq::Error>| helpers::into_inner(e).into())
    }

    /// Sends a POST request with a JSON body, retrying when no response
    /// could be obtained.
    ///
    /// Once a status has been received the request is never sent again, even
    /// if its body cannot be read: the update may already have been applied.
    fn send_post(
        &self,
        url: &str,
        query: &[(&str, &str)],
        body: &str,
    ) -> Result<RawResponse, FiwareError> {
        let request = || -> Result<RawResponse, backoff::Error<ureq::Error>> {
            log::debug!("POST {} {:?} ({} bytes)", url, query, body.len());
            let mut req = self
                .with_headers(self.agent.post(url))
                .header("Content-Type", headers::CONTENT_TYPE_JSON);
            for (key, value) in query {
                req = req.query(*key, *value);
            }
            let mut resp = req.send(body).map_err(backoff::Error::transient)?;
            let status = resp.status().as_u16();
            let resp_body = resp.body_mut().read_to_string().unwrap_or_else(|e| {
                log::warn!("Could not read response body of POST {} ({}): {}", url, status, e);
                String::new()
            });
            Ok(RawResponse {
                status,
                body: resp_body,
            })
        };
        helpers::backoff_retry(request, Some(self.retry_max_elapsed))
            .map_err(|e: backoff::Error<ureq::Error>| helpers::into_inner(e).into())
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, FiwareError> {
        let resp = self.send_get(url, query)?;
        if resp.status >= FIRST_ERROR_STATUS {
            return Err(FiwareError::Status {
                url: url.to_string(),
                status: resp.status,
                body: resp.body,
            });
        }
        serde_json::from_str(&resp.body).map_err(Into::into)
    }

    fn update_url(&self) -> String {
        format!("{}/op/update", self.endpoint)
    }

    fn entity_url(&self, id: &str) -> Result<String, FiwareError> {
        let mut url = Url::parse(&self.endpoint)?;
        url.path_segments_mut()
            .map_err(|_| FiwareError::BaseUrl(self.endpoint.clone()))?
            .pop_if_empty()
            .extend(["entities", id]);
        Ok(url.into())
    }

    /// Posts an already enveloped `op/update` payload.
    fn post_update(&self, payload: &str, key_values: bool) -> UploadOutcome {
        let query: &[(&str, &str)] = if key_values {
            &[("options", "keyValues")]
        } else {
            &[]
        };
        match self.send_post(&self.update_url(), query, payload) {
            Ok(resp) if resp.status < FIRST_ERROR_STATUS => Ok(resp.status),
            Ok(resp) => Err(UploadFailure::Rejected {
                status: resp.status,
                body: resp.body,
            }),
            Err(e) => Err(UploadFailure::Transport(e.to_string())),
        }
    }

    pub fn uploader(&self, key_values: bool) -> OrionUploader<'_> {
        OrionUploader {
            client: self,
            key_values,
        }
    }

    /// Fetches all entities, optionally of one type, one page at a time.
    pub fn get_all_entities(&self, entity_type: Option<&str>) -> Result<Vec<Value>, FiwareError> {
        let url = format!("{}/entities", self.endpoint);
        let limit = defaults::PAGE_LIMIT.to_string();
        let mut entities = Vec::new();
        let mut offset = 0;

        loop {
            let offset_str = offset.to_string();
            let mut query = vec![("limit", limit.as_str()), ("offset", offset_str.as_str())];
            if let Some(t) = entity_type {
                query.push(("type", t));
            }
            let page: Vec<Value> = self.get_json(&url, &query)?;
            if page.is_empty() {
                break;
            }
            log::debug!("Fetched {} entities at offset {}", page.len(), offset);
            entities.extend(page);
            offset += defaults::PAGE_LIMIT;
        }
        Ok(entities)
    }

    pub fn count_entities(&self, entity_type: Option<&str>) -> Result<usize, FiwareError> {
        Ok(self.get_all_entities(entity_type)?.len())
    }

    /// Deletes all entities, optionally of one type.
    ///
    /// The deletion requests are packed like uploads, so no request exceeds
    /// `max_batch_bytes` unless a single entity reference does.
    pub fn delete_all_entities(
        &self,
        entity_type: Option<&str>,
        max_batch_bytes: usize,
    ) -> Result<Vec<BatchResult>, FiwareError> {
        let refs: Vec<EntityRef> = self
            .get_all_entities(entity_type)?
            .iter()
            .filter_map(EntityRef::from_value)
            .collect();
        if refs.is_empty() {
            log::info!("No entities to delete");
            return Ok(Vec::new());
        }
        log::info!("Deleting {} entities", refs.len());

        let results = BatchPacker::new(max_batch_bytes)
            .with_action(ActionType::Delete)
            .pack_and_upload(&refs, &mut self.uploader(false))?;
        Ok(results)
    }

    /// Reads the latest value of one attribute of an entity.
    pub fn query_entity(
        &self,
        request: &MeasurementRequest,
    ) -> Result<Option<MeasurementResult>, FiwareError> {
        let url = self.entity_url(&request.urn)?;
        let resp = self.send_get(&url, &[])?;
        if resp.status == STATUS_NOT_FOUND {
            log::info!("Entity {} not found", request.urn);
            return Ok(None);
        }
        if resp.status >= FIRST_ERROR_STATUS {
            return Err(FiwareError::Status {
                url,
                status: resp.status,
                body: resp.body,
            });
        }

        let entity: Value = serde_json::from_str(&resp.body)?;
        let Some(attribute) = entity.get(&request.name) else {
            return Ok(None);
        };
        let timestamp = entity
            .get(TIME_INSTANT)
            .and_then(|ts| ts.get("value"))
            .and_then(Value::as_str)
            .and_then(helpers::parse_iso);

        Ok(Some(MeasurementResult {
            urn: request.urn.clone(),
            name: request.name.clone(),
            value: attribute.get("value").cloned().unwrap_or(Value::Null),
            timestamp,
        }))
    }

    /// Uploads all entities in a single request, whatever its size.
    pub fn upload_entities<E: Serialize>(
        &self,
        entities: &[E],
        key_values: bool,
    ) -> Result<BatchResult, SerializationError> {
        let batch = Batch::whole(entities)?;
        Ok(flush(&mut self.uploader(key_values), &batch))
    }

    /// Uploads all entities in a single request if it fits in `max_size_bytes`.
    pub fn upload_entities_with_size_check<E: Serialize>(
        &self,
        entities: &[E],
        key_values: bool,
        max_size_bytes: usize,
    ) -> Result<GateOutcome, SerializationError> {
        upload_if_within_budget(entities, max_size_bytes, &mut self.uploader(key_values))
    }

    /// Splits entities into batches of at most `max_batch_size_bytes` and
    /// uploads each of them.
    pub fn batch_and_upload_entities<E: Serialize>(
        &self,
        entities: &[E],
        key_values: bool,
        max_batch_size_bytes: usize,
    ) -> Result<Vec<BatchResult>, SerializationError> {
        BatchPacker::new(max_batch_size_bytes)
            .pack_and_upload(entities, &mut self.uploader(key_values))
    }
}
