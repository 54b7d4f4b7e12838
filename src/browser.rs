use leptos::web_sys::{Headers, Request, RequestInit, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use crate::api::{HttpResponse, HttpTransport, TransportError};
use crate::config::{ServerSettings, DRAFT_KEY, SETTINGS_KEY};
use crate::page_link::PageInfo;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = ["chrome", "storage", "sync"], js_name = get, catch)]
    async fn sync_get(keys: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "storage", "local"], js_name = get, catch)]
    async fn local_get(keys: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "storage", "local"], js_name = set, catch)]
    async fn local_set(items: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "storage", "local"], js_name = remove, catch)]
    async fn local_remove(keys: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "tabs"], js_name = query, catch)]
    async fn tabs_query(query: JsValue) -> Result<JsValue, JsValue>;
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BrowserError {
    #[error("browser call failed: {0}")]
    Js(String),
    #[error("unexpected value from browser: {0}")]
    Decode(String),
}

fn js_message(value: JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    match value.dyn_ref::<js_sys::Error>() {
        Some(err) => String::from(err.message()),
        None => format!("{value:?}"),
    }
}

impl From<JsValue> for BrowserError {
    fn from(value: JsValue) -> Self {
        BrowserError::Js(js_message(value))
    }
}

fn stored_value<T: DeserializeOwned>(items: &JsValue, key: &str) -> Result<Option<T>, BrowserError> {
    let value = js_sys::Reflect::get(items, &JsValue::from_str(key))?;
    if value.is_undefined() || value.is_null() {
        return Ok(None);
    }
    serde_wasm_bindgen::from_value(value)
        .map(Some)
        .map_err(|e| BrowserError::Decode(e.to_string()))
}

pub async fn load_settings() -> Result<ServerSettings, BrowserError> {
    let items = sync_get(JsValue::from_str(SETTINGS_KEY)).await?;
    Ok(stored_value(&items, SETTINGS_KEY)?.unwrap_or_default())
}

pub async fn load_draft() -> Result<Option<String>, BrowserError> {
    let items = local_get(JsValue::from_str(DRAFT_KEY)).await?;
    stored_value(&items, DRAFT_KEY)
}

pub async fn save_draft(text: &str) -> Result<(), BrowserError> {
    let items = js_sys::Object::new();
    js_sys::Reflect::set(&items, &JsValue::from_str(DRAFT_KEY), &JsValue::from_str(text))?;
    local_set(items.into()).await?;
    Ok(())
}

pub async fn clear_draft() -> Result<(), BrowserError> {
    local_remove(JsValue::from_str(DRAFT_KEY)).await?;
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TabQuery {
    active: bool,
    current_window: bool,
}

pub async fn active_page() -> Result<Option<PageInfo>, BrowserError> {
    let query = serde_wasm_bindgen::to_value(&TabQuery {
        active: true,
        current_window: true,
    })
    .map_err(|e| BrowserError::Decode(e.to_string()))?;
    let tabs = tabs_query(query).await?;
    let tabs: Vec<PageInfo> =
        serde_wasm_bindgen::from_value(tabs).map_err(|e| BrowserError::Decode(e.to_string()))?;
    Ok(tabs.into_iter().next())
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FetchTransport;

impl HttpTransport for FetchTransport {
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, TransportError> {
        let transport_err = |value: JsValue| TransportError(js_message(value));

        let request_headers = Headers::new().map_err(transport_err)?;
        for (name, value) in headers {
            request_headers.set(name, value).map_err(transport_err)?;
        }
        let init = RequestInit::new();
        init.set_method("GET");
        init.set_headers(&request_headers);
        let request = Request::new_with_str_and_init(url, &init).map_err(transport_err)?;

        let window = leptos::web_sys::window()
            .ok_or_else(|| TransportError("no window to fetch from".to_string()))?;
        let response = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(transport_err)?;
        let response: Response = response.dyn_into().map_err(transport_err)?;

        // The body is only used in failure messages; an unreadable one is empty.
        let body = match response.text() {
            Ok(promise) => JsFuture::from(promise)
                .await
                .ok()
                .and_then(|text| text.as_string())
                .unwrap_or_default(),
            Err(_) => String::new(),
        };

        Ok(HttpResponse {
            status: response.status(),
            status_text: response.status_text(),
            body,
        })
    }
}
