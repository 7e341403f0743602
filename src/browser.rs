//! Thin wrappers over the browser APIs the editor uses: fetch, downloads,
//! local storage, file reading and dialogs.
//!
//! Every fallible call maps the thrown `JsValue` into [`GraphError::Host`].

use js_sys::Array;
use log::warn;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{
	Blob, BlobPropertyBag, CanvasRenderingContext2d, Document, File, HtmlAnchorElement,
	HtmlCanvasElement, Response, Storage, Url, Window,
};

use crate::error::{GraphError, Result};

/// Wraps a thrown value, or the original value handed back by a failed
/// `dyn_into`, as a host error.
fn host_error(context: &str, value: impl Into<JsValue>) -> GraphError {
	let value: JsValue = value.into();
	GraphError::host(format!("{context}: {value:?}"))
}

pub fn window() -> Result<Window> {
	web_sys::window().ok_or_else(|| GraphError::host("no window"))
}

fn document() -> Result<Document> {
	window()?
		.document()
		.ok_or_else(|| GraphError::host("no document"))
}

/// Window inner size in CSS pixels.
pub fn inner_size() -> Result<(f64, f64)> {
	let window = window()?;
	let width = window
		.inner_width()
		.map_err(|e| host_error("inner width", e))?
		.as_f64()
		.unwrap_or(0.0);
	let height = window
		.inner_height()
		.map_err(|e| host_error("inner height", e))?
		.as_f64()
		.unwrap_or(0.0);
	Ok((width, height))
}

/// GETs `url` and returns the body, or `None` for a non-2xx response.
pub async fn fetch_text(url: &str) -> Result<Option<String>> {
	let promise = window()?.fetch_with_str(url);
	let response: Response = JsFuture::from(promise)
		.await
		.map_err(|e| host_error("fetch", e))?
		.dyn_into()
		.map_err(|e| host_error("fetch response", e))?;
	if !response.ok() {
		return Ok(None);
	}

	let body = response.text().map_err(|e| host_error("response body", e))?;
	let text = JsFuture::from(body).await.map_err(|e| host_error("response body", e))?;
	Ok(text.as_string())
}

/// Reads a user-selected file as UTF-8 text.
pub async fn read_file_text(file: &File) -> Result<String> {
	let text = JsFuture::from(file.text())
		.await
		.map_err(|e| host_error("file read", e))?;
	text.as_string()
		.ok_or_else(|| GraphError::host("file read: not text"))
}

fn click_download_link(href: &str, file_name: &str) -> Result<()> {
	let anchor: HtmlAnchorElement = document()?
		.create_element("a")
		.map_err(|e| host_error("create link", e))?
		.dyn_into()
		.map_err(|e| host_error("create link", e))?;
	anchor.set_href(href);
	anchor.set_download(file_name);
	anchor.click();
	Ok(())
}

/// Offers `text` as a file download.
pub fn download_text(file_name: &str, mime: &str, text: &str) -> Result<()> {
	let options = BlobPropertyBag::new();
	options.set_type(mime);
	let parts = Array::of1(&JsValue::from_str(text));
	let blob = Blob::new_with_str_sequence_and_options(&parts, &options)
		.map_err(|e| host_error("blob", e))?;
	let url = Url::create_object_url_with_blob(&blob).map_err(|e| host_error("object url", e))?;

	let result = click_download_link(&url, file_name);
	if let Err(e) = Url::revoke_object_url(&url) {
		warn!("browser: failed to revoke object url: {e:?}");
	}
	result
}

/// Offers the canvas contents as a PNG download.
pub fn download_canvas_png(canvas: &HtmlCanvasElement, file_name: &str) -> Result<()> {
	let data_url = canvas
		.to_data_url_with_type("image/png")
		.map_err(|e| host_error("png encode", e))?;
	click_download_link(&data_url, file_name)
}

/// 2D context of `canvas`.
pub fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d> {
	canvas
		.get_context("2d")
		.map_err(|e| host_error("canvas context", e))?
		.ok_or_else(|| GraphError::host("canvas context unavailable"))?
		.dyn_into()
		.map_err(|e| host_error("canvas context", e))
}

/// Detached canvas of the given size, used for off-screen painting.
pub fn offscreen_canvas(width: f64, height: f64) -> Result<HtmlCanvasElement> {
	let canvas: HtmlCanvasElement = document()?
		.create_element("canvas")
		.map_err(|e| host_error("create canvas", e))?
		.dyn_into()
		.map_err(|e| host_error("create canvas", e))?;
	canvas.set_width(width.max(1.0) as u32);
	canvas.set_height(height.max(1.0) as u32);
	Ok(canvas)
}

fn local_storage() -> Result<Storage> {
	window()?
		.local_storage()
		.map_err(|e| host_error("local storage", e))?
		.ok_or_else(|| GraphError::host("local storage unavailable"))
}

pub fn storage_get(key: &str) -> Result<Option<String>> {
	local_storage()?
		.get_item(key)
		.map_err(|e| host_error("local storage read", e))
}

pub fn storage_set(key: &str, value: &str) -> Result<()> {
	local_storage()?
		.set_item(key, value)
		.map_err(|e| host_error("local storage write", e))
}

/// Shows a blocking message to the user.
pub fn alert(message: &str) {
	let shown = window().and_then(|w| {
		w.alert_with_message(message)
			.map_err(|e| host_error("alert", e))
	});
	if let Err(e) = shown {
		warn!("browser: {e} ({message})");
	}
}

/// Asks the user to confirm; anything but an explicit OK is a no.
pub fn confirm(message: &str) -> bool {
	window()
		.and_then(|w| {
			w.confirm_with_message(message)
				.map_err(|e| host_error("confirm", e))
		})
		.unwrap_or(false)
}
