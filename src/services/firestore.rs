// ============================================================================
// CLIENTE FIRESTORE (REST v1) - SOLO COMUNICACIÓN HTTP
// ============================================================================
// - list:   GET    {root}/{colección}?pageSize=..&pageToken=..
// - get:    GET    {root}/{documento}
// - set:    PATCH  {root}/{documento}            (reemplazo completo)
// - lote:   POST   {root}:commit                 (update + updateMask = merge)
// - delete: DELETE {root}/{documento}
// Las suscripciones se implementan consultando la colección periódicamente
// y notificando solo cuando la lista cambia.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use async_trait::async_trait;
use gloo_net::http::{Request, RequestBuilder, Response};
use gloo_timers::callback::Interval;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use wasm_bindgen_futures::spawn_local;

use crate::config::{AppConfig, FirestoreConfig};
use crate::error::SyncError;
use crate::models::paths::document_id;
use crate::models::Document;
use crate::services::remote_store::{DocumentWrite, RemoteStore, SnapshotListener, Subscription};
use crate::state::AuthProvider;
use crate::utils::constants::LIST_PAGE_SIZE;

// ==========================================
// CODEC DE VALORES TIPADOS
// ==========================================

/// JSON -> valor tipado de Firestore
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            // integerValue viaja como texto (int64)
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or(0.0) }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            if items.is_empty() {
                json!({ "arrayValue": {} })
            } else {
                let values: Vec<Value> = items.iter().map(encode_value).collect();
                json!({ "arrayValue": { "values": values } })
            }
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

pub fn encode_fields(doc: &Document) -> Value {
    let fields: Map<String, Value> = doc
        .iter()
        .map(|(key, value)| (key.clone(), encode_value(value)))
        .collect();
    Value::Object(fields)
}

/// Valor tipado de Firestore -> JSON
pub fn decode_value(value: &Value) -> Result<Value, SyncError> {
    let typed = value
        .as_object()
        .and_then(|map| map.iter().next())
        .map(|(kind, inner)| (kind.as_str(), inner))
        .ok_or_else(|| SyncError::Serialization(format!("valor Firestore inválido: {}", value)))?;

    match typed {
        ("nullValue", _) => Ok(Value::Null),
        ("booleanValue", v) => Ok(Value::Bool(v.as_bool().unwrap_or(false))),
        ("integerValue", v) => {
            let parsed = match v {
                Value::String(s) => s.parse::<i64>().ok(),
                other => other.as_i64(),
            };
            parsed
                .map(Value::from)
                .ok_or_else(|| SyncError::Serialization(format!("integerValue inválido: {}", v)))
        }
        ("doubleValue", v) => match v {
            Value::Number(_) => Ok(v.clone()),
            // NaN / Infinity llegan como texto
            Value::String(_) => Ok(Value::Null),
            other => Err(SyncError::Serialization(format!("doubleValue inválido: {}", other))),
        },
        ("stringValue", v) | ("timestampValue", v) | ("referenceValue", v) | ("bytesValue", v) => {
            Ok(v.clone())
        }
        ("geoPointValue", v) => Ok(json!({
            "latitude": v.get("latitude").cloned().unwrap_or(json!(0.0)),
            "longitude": v.get("longitude").cloned().unwrap_or(json!(0.0)),
        })),
        ("arrayValue", v) => {
            let items = match v.get("values").and_then(Value::as_array) {
                Some(values) => values.iter().map(decode_value).collect::<Result<Vec<_>, _>>()?,
                None => Vec::new(),
            };
            Ok(Value::Array(items))
        }
        ("mapValue", v) => {
            let fields = v.get("fields").cloned().unwrap_or_else(|| json!({}));
            Ok(Value::Object(decode_fields(&fields)?))
        }
        (other, _) => Err(SyncError::Serialization(format!("tipo Firestore desconocido: {}", other))),
    }
}

pub fn decode_fields(fields: &Value) -> Result<Document, SyncError> {
    let map = fields
        .as_object()
        .ok_or_else(|| SyncError::Serialization("`fields` no es un objeto".to_string()))?;
    map.iter()
        .map(|(key, value)| Ok((key.clone(), decode_value(value)?)))
        .collect()
}

/// Documento REST -> Document. Si no trae campo `id` se toma del nombre.
pub fn decode_document(raw: &Value) -> Result<Document, SyncError> {
    let name = raw
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| SyncError::Serialization("documento sin `name`".to_string()))?;
    let mut doc = match raw.get("fields") {
        Some(fields) => decode_fields(fields)?,
        None => Document::new(),
    };
    if !doc.contains_key("id") {
        doc.insert("id".to_string(), Value::String(document_id(name).to_string()));
    }
    Ok(doc)
}

/// Ruta de campo para updateMask (con comillas invertidas si hace falta)
pub fn field_path(key: &str) -> String {
    let simple = key
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false)
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        key.to_string()
    } else {
        format!("`{}`", key.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

/// Cuerpo de `:commit`. Cada escritura lleva updateMask con sus campos de
/// primer nivel: crea el documento si no existe y no toca el resto de campos.
pub fn commit_body(config: &FirestoreConfig, writes: &[DocumentWrite]) -> Value {
    let writes: Vec<Value> = writes
        .iter()
        .map(|write| {
            let field_paths: Vec<String> = write.fields.keys().map(|k| field_path(k)).collect();
            json!({
                "update": {
                    "name": config.document_name(&write.path),
                    "fields": encode_fields(&write.fields),
                },
                "updateMask": { "fieldPaths": field_paths },
            })
        })
        .collect();
    json!({ "writes": writes })
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    documents: Vec<Value>,
    #[serde(rename = "nextPageToken", default)]
    next_page_token: Option<String>,
}

// ==========================================
// CLIENTE
// ==========================================

/// Cliente Firestore - SOLO comunicación HTTP (stateless)
#[derive(Clone)]
pub struct FirestoreClient {
    config: FirestoreConfig,
    auth: Rc<dyn AuthProvider>,
    poll_interval_ms: u32,
}

impl FirestoreClient {
    pub fn new(config: FirestoreConfig, auth: Rc<dyn AuthProvider>, poll_interval_ms: u32) -> Self {
        Self {
            config,
            auth,
            poll_interval_ms,
        }
    }

    pub fn from_app_config(config: &AppConfig, auth: Rc<dyn AuthProvider>) -> Self {
        Self::new(
            config.firestore.clone(),
            auth,
            config.timers.subscription_poll_interval_ms,
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.documents_root(), path.trim_start_matches('/'))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.auth.current_user().and_then(|user| user.id_token) {
            Some(token) => builder.header("Authorization", &format!("Bearer {}", token)),
            None => builder,
        }
    }

    async fn error_text(response: Response) -> String {
        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        format!("HTTP {}: {}", status, text)
    }
}

#[async_trait(?Send)]
impl RemoteStore for FirestoreClient {
    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, SyncError> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!("{}?pageSize={}", self.url(collection), LIST_PAGE_SIZE);
            if let Some(token) = &page_token {
                let encoded: String = js_sys::encode_uri_component(token).into();
                url.push_str("&pageToken=");
                url.push_str(&encoded);
            }

            let response = self
                .authorized(Request::get(&url))
                .send()
                .await
                .map_err(|e| SyncError::RemoteRead(format!("Network error: {}", e)))?;

            if !response.ok() {
                return Err(SyncError::RemoteRead(Self::error_text(response).await));
            }

            let page = response
                .json::<ListResponse>()
                .await
                .map_err(|e| SyncError::RemoteRead(format!("Parse error: {}", e)))?;

            for raw in &page.documents {
                documents.push(decode_document(raw)?);
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        log::info!("📥 {} documentos en {}", documents.len(), collection);
        Ok(documents)
    }

    async fn get_document(&self, path: &str) -> Result<Option<Document>, SyncError> {
        let response = self
            .authorized(Request::get(&self.url(path)))
            .send()
            .await
            .map_err(|e| SyncError::RemoteRead(format!("Network error: {}", e)))?;

        if response.status() == 404 {
            return Ok(None);
        }
        if !response.ok() {
            return Err(SyncError::RemoteRead(Self::error_text(response).await));
        }

        let raw = response
            .json::<Value>()
            .await
            .map_err(|e| SyncError::RemoteRead(format!("Parse error: {}", e)))?;
        decode_document(&raw).map(Some)
    }

    async fn set_document(&self, path: &str, fields: Document) -> Result<(), SyncError> {
        let body = json!({ "fields": encode_fields(&fields) });
        let response = self
            .authorized(Request::patch(&self.url(path)))
            .json(&body)
            .map_err(|e| SyncError::Serialization(format!("Request build error: {}", e)))?
            .send()
            .await
            .map_err(|e| SyncError::RemoteWrite(format!("Network error: {}", e)))?;

        if !response.ok() {
            return Err(SyncError::RemoteWrite(Self::error_text(response).await));
        }
        Ok(())
    }

    async fn commit_upserts(&self, writes: Vec<DocumentWrite>) -> Result<(), SyncError> {
        if writes.is_empty() {
            return Ok(());
        }
        let url = format!("{}:commit", self.config.documents_root());
        let body = commit_body(&self.config, &writes);

        log::info!("📤 Enviando lote de {} documentos", writes.len());

        let response = self
            .authorized(Request::post(&url))
            .json(&body)
            .map_err(|e| SyncError::Serialization(format!("Request build error: {}", e)))?
            .send()
            .await
            .map_err(|e| SyncError::RemoteWrite(format!("Network error: {}", e)))?;

        if !response.ok() {
            return Err(SyncError::RemoteWrite(Self::error_text(response).await));
        }
        Ok(())
    }

    async fn delete_document(&self, path: &str) -> Result<(), SyncError> {
        let response = self
            .authorized(Request::delete(&self.url(path)))
            .send()
            .await
            .map_err(|e| SyncError::RemoteWrite(format!("Network error: {}", e)))?;

        // Firestore responde 200 también si el documento no existía
        if !response.ok() && response.status() != 404 {
            return Err(SyncError::RemoteWrite(Self::error_text(response).await));
        }
        Ok(())
    }

    fn subscribe(&self, collection: &str, listener: SnapshotListener) -> Subscription {
        let alive = Rc::new(Cell::new(true));
        let gate = Rc::new(PollGate::default());

        let poll: Rc<dyn Fn()> = {
            let client = self.clone();
            let collection = collection.to_string();
            let alive = alive.clone();
            Rc::new(move || {
                if !gate.try_begin() {
                    log::info!("⏳ Consulta de {} aún en curso, saltando...", collection);
                    return;
                }
                let client = client.clone();
                let collection = collection.clone();
                let alive = alive.clone();
                let gate = gate.clone();
                let listener = listener.clone();
                spawn_local(async move {
                    let result = client.list_documents(&collection).await;
                    let delivery = gate.complete(result);
                    if !alive.get() {
                        return;
                    }
                    match delivery {
                        Some(Err(e)) => {
                            log::warn!("⚠️ Error consultando {}: {}", collection, e);
                            listener(Err(e));
                        }
                        Some(snapshot) => listener(snapshot),
                        None => {}
                    }
                });
            })
        };

        // Instantánea inicial
        poll();

        let interval = {
            let poll = poll.clone();
            Interval::new(self.poll_interval_ms, move || poll())
        };

        Subscription::new(move || {
            alive.set(false);
            drop(interval);
        })
    }
}

// ==========================================
// ESTADO DE UNA SUSCRIPCIÓN POR SONDEO
// ==========================================

/// Una consulta a la vez por suscripción; solo se entrega lo que cambia
#[derive(Default)]
pub struct PollGate {
    in_flight: Cell<bool>,
    last_snapshot: RefCell<Option<Vec<Document>>>,
}

impl PollGate {
    /// false si la consulta anterior sigue en curso
    pub fn try_begin(&self) -> bool {
        !self.in_flight.replace(true)
    }

    /// Cierra la consulta en curso. None = sin cambios que notificar.
    pub fn complete(
        &self,
        result: Result<Vec<Document>, SyncError>,
    ) -> Option<Result<Vec<Document>, SyncError>> {
        self.in_flight.set(false);
        match result {
            Ok(mut docs) => {
                docs.sort_by(|a, b| {
                    let a = a.get("id").and_then(Value::as_str).unwrap_or("");
                    let b = b.get("id").and_then(Value::as_str).unwrap_or("");
                    a.cmp(b)
                });
                if self.last_snapshot.borrow().as_ref() == Some(&docs) {
                    return None;
                }
                *self.last_snapshot.borrow_mut() = Some(docs.clone());
                Some(Ok(docs))
            }
            Err(e) => {
                *self.last_snapshot.borrow_mut() = None;
                Some(Err(e))
            }
        }
    }
}
