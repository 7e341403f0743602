//! `window.STAC`: a small scripting surface for the page.
//!
//! - `STAC.getNode(id)` returns the node as a plain object, or `undefined`.
//! - `STAC.updateNode(id, data)` shallow-merges `data` (`label`, `group`,
//!   `fields`) into the node and returns whether a node was updated.
//!
//! Updates go through the editor like any other mutation.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{JSON, Object, Reflect};
use log::{info, warn};
use wasm_bindgen::prelude::*;

use crate::browser;
use crate::components::NetworkEditor;
use crate::error::{GraphError, Result};
use crate::graph::{NodePatch, node_id_from_f64};

/// Name of the global the API is installed under.
pub const GLOBAL_NAME: &str = "STAC";

/// Parses the `data` argument of `updateNode` from its JSON text.
pub fn parse_patch(json: &str) -> Result<NodePatch> {
	serde_json::from_str(json).map_err(|e| GraphError::format(format!("Invalid node data: {e}")))
}

fn to_js<T: serde::Serialize>(value: &T) -> Option<JsValue> {
	let text = serde_json::to_string(value).ok()?;
	JSON::parse(&text).ok()
}

fn from_js(value: &JsValue) -> Result<NodePatch> {
	let text: String = JSON::stringify(value)
		.map_err(|e| GraphError::host(format!("stringify: {e:?}")))?
		.into();
	parse_patch(&text)
}

/// Installs `window.STAC`. `on_change` runs after every successful update.
pub fn install(editor: Rc<RefCell<NetworkEditor>>, on_change: Rc<dyn Fn()>) -> Result<()> {
	let api = Object::new();

	let editor_get = editor.clone();
	let get_node = Closure::<dyn Fn(JsValue) -> JsValue>::new(move |id: JsValue| {
		id.as_f64()
			.and_then(node_id_from_f64)
			.and_then(|id| {
				let editor = editor_get.try_borrow().ok()?;
				editor.node(id).and_then(to_js)
			})
			.unwrap_or(JsValue::UNDEFINED)
	});

	let update_node =
		Closure::<dyn Fn(JsValue, JsValue) -> JsValue>::new(move |id: JsValue, data: JsValue| {
			let Some(id) = id.as_f64().and_then(node_id_from_f64) else {
				return JsValue::FALSE;
			};
			let patch = match from_js(&data) {
				Ok(patch) => patch,
				Err(e) => {
					warn!("api: updateNode({id}) rejected: {e}");
					return JsValue::FALSE;
				}
			};
			let updated = match editor.try_borrow_mut() {
				Ok(mut editor) => editor.update_node(id, patch),
				Err(_) => {
					warn!("api: updateNode({id}) called re-entrantly, ignored");
					false
				}
			};
			if updated {
				on_change();
			}
			JsValue::from_bool(updated)
		});

	let set = |key: &str, value: &JsValue| {
		Reflect::set(&api, &JsValue::from_str(key), value)
			.map(|_| ())
			.map_err(|e| GraphError::host(format!("install {key}: {e:?}")))
	};
	set("getNode", get_node.as_ref())?;
	set("updateNode", update_node.as_ref())?;
	get_node.forget();
	update_node.forget();

	let window: JsValue = browser::window()?.into();
	Reflect::set(&window, &JsValue::from_str(GLOBAL_NAME), &api)
		.map_err(|e| GraphError::host(format!("install {GLOBAL_NAME}: {e:?}")))?;
	info!("api: window.{GLOBAL_NAME} installed");
	Ok(())
}
