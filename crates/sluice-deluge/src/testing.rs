//! Test doubles shared by the unit tests of this crate.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::error::DelugeResult;
use crate::requester::Requester;
use crate::session::Session;
use crate::transport::{Transport, WireResponse};
use crate::wire::RpcRequest;

/// Scripted transport: pops canned responses in order and records the
/// method name and params of every envelope it sees.
pub(crate) struct ScriptedTransport {
    responses: Mutex<VecDeque<DelugeResult<WireResponse>>>,
    calls: Mutex<Vec<(String, Vec<Value>)>>,
}

impl ScriptedTransport {
    pub(crate) fn new(responses: Vec<DelugeResult<WireResponse>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Method names seen so far, in order.
    pub(crate) fn methods(&self) -> Vec<String> {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .map(|(method, _)| method.clone())
            .collect()
    }

    /// Method/params pairs seen so far, in order.
    pub(crate) fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn round_trip(
        &self,
        _endpoint: &Url,
        request: &RpcRequest,
        _session: &Session,
    ) -> DelugeResult<WireResponse> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((request.method.clone(), request.params.clone()));
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .expect("script exhausted")
    }
}

/// A 200 response with the given JSON body.
pub(crate) fn ok_body(body: Value) -> DelugeResult<WireResponse> {
    Ok(WireResponse {
        status: 200,
        set_cookie: None,
        csrf_token: None,
        body: serde_json::to_vec(&body).expect("serialize body"),
    })
}

/// A 200 response wrapping `result` in a JSON-RPC envelope.
pub(crate) fn ok_result(result: Value) -> DelugeResult<WireResponse> {
    ok_body(serde_json::json!({"result": result, "error": null, "id": "t"}))
}

/// A 200 response carrying a fault envelope.
pub(crate) fn fault(message: &str, code: i64) -> DelugeResult<WireResponse> {
    ok_body(serde_json::json!({
        "result": null,
        "error": {"message": message, "code": code},
        "id": "t"
    }))
}

/// An empty-bodied response with the given HTTP status.
pub(crate) fn http_status(status: u16) -> DelugeResult<WireResponse> {
    Ok(WireResponse {
        status,
        set_cookie: None,
        csrf_token: None,
        body: Vec::new(),
    })
}

/// A requester wired to the scripted transport with stock credentials.
pub(crate) fn scripted_requester(transport: Arc<ScriptedTransport>) -> Requester {
    Requester::new(transport, "http://deluge.test:8112", "secret", false)
}
