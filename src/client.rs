// Typed blocking client for the EV registry API
//
// Single-entity calls answer `Ok(None)` on a non-success status; list calls
// treat it as an error. The status of the last response is kept for callers
// that need to tell 400 from 404.

use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::entities::{Car, EnumIdentifier, IdList, Make, Model};
use crate::telemetry::MethodCallStats;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {0}")]
    Status(u16),
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

pub struct CarApiClient {
    http: Client,
    base_url: String,
    last_status: Option<u16>,
}

impl CarApiClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Self {
        CarApiClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            last_status: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Status code of the most recent response, if any request completed
    pub fn last_status(&self) -> Option<u16> {
        self.last_status
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send(&mut self, request: RequestBuilder) -> ClientResult<Response> {
        let response = request.send()?;
        self.last_status = Some(response.status().as_u16());
        Ok(response)
    }

    fn get_list<T: DeserializeOwned>(&mut self, path: &str) -> ClientResult<T> {
        let request = self.http.get(self.url(path));
        let response = self.send(request)?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status().as_u16()));
        }
        Ok(response.json()?)
    }

    fn optional_body<T: DeserializeOwned>(&mut self, request: RequestBuilder) -> ClientResult<Option<T>> {
        let response = self.send(request)?;
        if !response.status().is_success() {
            return Ok(None);
        }
        Ok(Some(response.json()?))
    }

    fn get_one<T: DeserializeOwned>(&mut self, path: &str) -> ClientResult<Option<T>> {
        let request = self.http.get(self.url(path));
        self.optional_body(request)
    }

    fn post<T: Serialize + DeserializeOwned>(&mut self, path: &str, body: &T) -> ClientResult<Option<T>> {
        let request = self.http.post(self.url(path)).json(body);
        self.optional_body(request)
    }

    fn put<T: Serialize + DeserializeOwned>(&mut self, path: &str, body: &T) -> ClientResult<Option<T>> {
        let request = self.http.put(self.url(path)).json(body);
        self.optional_body(request)
    }

    fn delete(&mut self, path: &str) -> ClientResult<bool> {
        let request = self.http.delete(self.url(path));
        Ok(self.send(request)?.status().is_success())
    }

    pub fn health(&mut self) -> ClientResult<serde_json::Value> {
        self.get_list("/health")
    }

    // ========================================================================
    // Makes
    // ========================================================================

    pub fn get_make_ids(&mut self) -> ClientResult<IdList> {
        self.get_list("/Makes")
    }

    pub fn get_all_makes(&mut self) -> ClientResult<Vec<Make>> {
        self.get_list("/Makes/all")
    }

    pub fn get_make(&mut self, id: i64) -> ClientResult<Option<Make>> {
        self.get_one(&format!("/Makes/{}", id))
    }

    pub fn create_make(&mut self, make: &Make) -> ClientResult<Option<Make>> {
        self.post("/Makes", make)
    }

    pub fn update_make(&mut self, make: &Make) -> ClientResult<Option<Make>> {
        self.put("/Makes", make)
    }

    pub fn delete_make(&mut self, id: i64) -> ClientResult<bool> {
        self.delete(&format!("/Makes/{}", id))
    }

    // ========================================================================
    // Models
    // ========================================================================

    pub fn get_model_ids(&mut self) -> ClientResult<IdList> {
        self.get_list("/Models")
    }

    pub fn get_all_models(&mut self) -> ClientResult<Vec<Model>> {
        self.get_list("/Models/all")
    }

    pub fn get_models_by_make(&mut self, make_id: i64) -> ClientResult<Vec<Model>> {
        self.get_list(&format!("/Models/all/{}", make_id))
    }

    pub fn get_model(&mut self, id: i64) -> ClientResult<Option<Model>> {
        self.get_one(&format!("/Models/{}", id))
    }

    pub fn create_model(&mut self, model: &Model) -> ClientResult<Option<Model>> {
        self.post("/Models", model)
    }

    pub fn update_model(&mut self, model: &Model) -> ClientResult<Option<Model>> {
        self.put("/Models", model)
    }

    pub fn delete_model(&mut self, id: i64) -> ClientResult<bool> {
        self.delete(&format!("/Models/{}", id))
    }

    // ========================================================================
    // Cars
    // ========================================================================

    pub fn get_car_ids(&mut self) -> ClientResult<IdList> {
        self.get_list("/Cars")
    }

    pub fn get_car(&mut self, id: i64) -> ClientResult<Option<Car>> {
        self.get_one(&format!("/Cars/{}", id))
    }

    pub fn create_car(&mut self, car: &Car) -> ClientResult<Option<Car>> {
        self.post("/Cars", car)
    }

    pub fn update_car(&mut self, car: &Car) -> ClientResult<Option<Car>> {
        self.put("/Cars", car)
    }

    pub fn delete_car(&mut self, id: i64) -> ClientResult<bool> {
        self.delete(&format!("/Cars/{}", id))
    }

    // ========================================================================
    // Enum types and telemetry
    // ========================================================================

    pub fn get_ev_types(&mut self) -> ClientResult<Vec<EnumIdentifier>> {
        self.get_list("/EvTypes")
    }

    pub fn get_ev_type(&mut self, id: i32) -> ClientResult<Option<EnumIdentifier>> {
        self.get_one(&format!("/EvTypes/{}", id))
    }

    pub fn get_cafv_types(&mut self) -> ClientResult<Vec<EnumIdentifier>> {
        self.get_list("/CafvTypes")
    }

    pub fn get_cafv_type(&mut self, id: i32) -> ClientResult<Option<EnumIdentifier>> {
        self.get_one(&format!("/CafvTypes/{}", id))
    }

    pub fn get_method_calls(&mut self) -> ClientResult<MethodCallStats> {
        self.get_list("/Telemetry/methodCalls")
    }

    pub fn get_recent_queries(&mut self) -> ClientResult<Vec<String>> {
        self.get_list("/Telemetry/queries")
    }
}
