//! Leptos component hosting the network editor.
//!
//! The component owns a [`NetworkEditor`] behind `Rc<RefCell<_>>` and shares it
//! with the canvas event handlers, the sidebar controls, the animation loop and
//! `window.STAC`. Reactive parts of the view (detail form, tooltip, filter and
//! counters) read signals only; handlers publish editor state into those
//! signals after each change.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use leptos::prelude::*;
use log::{info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Event, HtmlCanvasElement, HtmlInputElement, MouseEvent, WheelEvent};

use super::interaction::DetailForm;
use super::render;
use super::state::NetworkEditor;
use crate::api;
use crate::browser;
use crate::config::EditorConfig;
use crate::error::{GraphError, Result};
use crate::graph::{Filter, Snapshot};
use crate::io;

/// Frame time fed to the animation loop, in seconds.
const FRAME_DT: f64 = 0.016;

/// Hovered-node tooltip contents and page position.
#[derive(Clone, Debug, PartialEq)]
struct Tooltip {
	label: String,
	group: String,
	x: f64,
	y: f64,
}

/// Signals the reactive parts of the view read.
#[derive(Clone, Copy)]
struct UiSignals {
	detail: RwSignal<Option<DetailForm>>,
	filter: RwSignal<Filter>,
	counts: RwSignal<(usize, usize)>,
	groups: RwSignal<Vec<String>>,
	tooltip: RwSignal<Option<Tooltip>>,
}

/// Shared editor plus the signals mirroring it.
#[derive(Clone)]
struct EditorHandle {
	editor: Rc<RefCell<NetworkEditor>>,
	ui: UiSignals,
	/// Detail form last published, so in-progress edits are not clobbered by
	/// unrelated changes.
	shown: Rc<RefCell<Option<DetailForm>>>,
}

impl EditorHandle {
	/// Mirrors editor state into the view signals.
	fn publish(&self) {
		let editor = self.editor.borrow();
		let form = editor.detail().cloned();
		if *self.shown.borrow() != form {
			self.shown.replace(form.clone());
			self.ui.detail.set(form);
		}

		let filter = editor.store().active_filter();
		if self.ui.filter.with_untracked(|shown| shown != filter) {
			self.ui.filter.set(filter.clone());
		}
		self.ui.counts.set((
			editor.store().nodes().len(),
			editor.store().all_links().len(),
		));
		let groups = editor.filter_groups();
		if self.ui.groups.with_untracked(|shown| *shown != groups) {
			self.ui.groups.set(groups);
		}
	}

	/// Runs a mutation, publishes the result and reports any error to the
	/// user.
	fn run<T>(&self, action: impl FnOnce(&mut NetworkEditor) -> Result<T>) -> Option<T> {
		let result = action(&mut self.editor.borrow_mut());
		self.publish();
		result.map_err(|e| report(&e)).ok()
	}
}

fn report(error: &GraphError) {
	warn!("stac-network: {error}");
	browser::alert(&error.to_string());
}

fn export_png(editor: &NetworkEditor) -> Result<()> {
	let viewport = editor.viewport();
	let canvas = browser::offscreen_canvas(viewport.width, viewport.height)?;
	let ctx = browser::context_2d(&canvas)?;
	render::render_export(editor, &ctx);
	browser::download_canvas_png(&canvas, &editor.config().storage.png_file_name)
}

fn canvas_point(canvas: &HtmlCanvasElement, ev: &MouseEvent) -> (f64, f64) {
	let rect = canvas.get_bounding_client_rect();
	(
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	)
}

/// Fetches the CSV files and replaces the graph with their contents, or with
/// the built-in sample when they are unavailable. Edits made while the fetches
/// were pending win over the loaded data.
async fn bootstrap(handle: EditorHandle, nodes_url: String, edges_url: String) {
	let revision = handle.editor.borrow().revision();
	let fetch = |url: String| async move {
		match browser::fetch_text(&url).await {
			Ok(text) => text,
			Err(e) => {
				warn!("stac-network: fetching {url} failed: {e}");
				None
			}
		}
	};
	let nodes = fetch(nodes_url).await;
	let edges = fetch(edges_url).await;

	let snapshot = io::bootstrap(nodes.as_deref(), edges.as_deref());
	if handle.editor.borrow_mut().import_if_unchanged(snapshot, revision) {
		handle.publish();
	}
}

/// Interactive network editor: canvas, sidebar controls, detail page and
/// tooltip.
#[component]
pub fn NetworkGraphEditor(config: EditorConfig) -> impl IntoView {
	let (width, height) = browser::inner_size()
		.map(|(w, h)| config.viewport.canvas_size(w, h))
		.unwrap_or((800.0, 600.0));

	let ui = UiSignals {
		detail: RwSignal::new(None),
		filter: RwSignal::new(Filter::All),
		counts: RwSignal::new((0, 0)),
		groups: RwSignal::new(config.groups.clone()),
		tooltip: RwSignal::new(None),
	};
	let handle = EditorHandle {
		editor: Rc::new(RefCell::new(NetworkEditor::new(
			config.clone(),
			Snapshot::default(),
			width,
			height,
		))),
		ui,
		shown: Rc::new(RefCell::new(None)),
	};

	let handle_api = handle.clone();
	if let Err(e) = api::install(
		handle.editor.clone(),
		Rc::new(move || handle_api.publish()),
	) {
		warn!("stac-network: runtime API unavailable: {e}");
	}

	spawn_local(bootstrap(
		handle.clone(),
		config.storage.nodes_csv_url.clone(),
		config.storage.edges_csv_url.clone(),
	));

	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));

	let (handle_init, animate_init, resize_init) = (handle.clone(), animate.clone(), resize_cb.clone());
	let viewport_config = config.viewport.clone();
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};
		let ctx = match browser::context_2d(&canvas) {
			Ok(ctx) => ctx,
			Err(e) => {
				warn!("stac-network: {e}");
				return;
			}
		};

		let viewport = handle_init.editor.borrow().viewport();
		canvas.set_width(viewport.width as u32);
		canvas.set_height(viewport.height as u32);

		let (editor_resize, canvas_resize) = (handle_init.editor.clone(), canvas.clone());
		let viewport_config = viewport_config.clone();
		*resize_init.borrow_mut() = Some(Closure::new(move || {
			let Ok((w, h)) = browser::inner_size() else {
				return;
			};
			let (w, h) = viewport_config.canvas_size(w, h);
			canvas_resize.set_width(w as u32);
			canvas_resize.set_height(h as u32);
			editor_resize.borrow_mut().resize(w, h);
		}));
		if let Some(ref cb) = *resize_init.borrow() {
			let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
		}

		let (editor_anim, animate_inner) = (handle_init.editor.clone(), animate_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			if let Ok(mut editor) = editor_anim.try_borrow_mut() {
				editor.frame(FRAME_DT);
				render::render(&editor, &ctx);
			}
			if let (Some(cb), Some(window)) = (animate_inner.borrow().as_ref(), web_sys::window()) {
				let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
		info!("stac-network: canvas {}x{} ready", viewport.width, viewport.height);
	});

	let handle_md = handle.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let (x, y) = canvas_point(&canvas, &ev);
		handle_md.editor.borrow_mut().pointer_down(x, y);
		handle_md.ui.tooltip.set(None);
	};

	let handle_mm = handle.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let (x, y) = canvas_point(&canvas, &ev);
		let mut editor = handle_mm.editor.borrow_mut();
		editor.pointer_move(x, y);

		let tooltip = editor
			.hovered()
			.and_then(|id| editor.node(id))
			.map(|node| Tooltip {
				label: node.label.clone(),
				group: node.group.clone(),
				x: ev.page_x() as f64 + 12.0,
				y: ev.page_y() as f64 + 12.0,
			});
		drop(editor);
		handle_mm.ui.tooltip.set(tooltip);
	};

	let handle_mu = handle.clone();
	let on_mouseup = move |_: MouseEvent| {
		handle_mu.editor.borrow_mut().pointer_up();
		handle_mu.publish();
	};

	let handle_ml = handle.clone();
	let on_mouseleave = move |_: MouseEvent| {
		handle_ml.editor.borrow_mut().pointer_leave();
		handle_ml.ui.tooltip.set(None);
	};

	let handle_wh = handle.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let (x, y) = canvas_point(&canvas, &ev);
		handle_wh.editor.borrow_mut().wheel(x, y, ev.delta_y());
	};

	// Sidebar: add node / add link
	let node_label = RwSignal::new(String::new());
	let node_group = RwSignal::new(config.groups.first().cloned().unwrap_or_default());
	let link_source = RwSignal::new(String::new());
	let link_target = RwSignal::new(String::new());
	let link_relationship = RwSignal::new(String::new());

	let handle_add_node = handle.clone();
	let on_add_node = move |_| {
		let (label, group) = (node_label.get_untracked(), node_group.get_untracked());
		if handle_add_node
			.run(|editor| editor.add_node(&label, &group))
			.is_some()
		{
			node_label.set(String::new());
		}
	};

	let handle_add_link = handle.clone();
	let on_add_link = move |_| {
		let (source, target, relationship) = (
			link_source.get_untracked(),
			link_target.get_untracked(),
			link_relationship.get_untracked(),
		);
		if handle_add_link
			.run(|editor| editor.add_link(&source, &target, &relationship))
			.is_some()
		{
			link_relationship.set(String::new());
		}
	};

	let handle_remove_link = handle.clone();
	let on_remove_link = move |_| {
		let (source, target) = (link_source.get_untracked(), link_target.get_untracked());
		handle_remove_link.run(|editor| editor.remove_link_between(&source, &target));
	};

	let group_options = config
		.groups
		.iter()
		.map(|group| view! { <option value=group.clone()>{group.clone()}</option> })
		.collect_view();

	let handle_filters = StoredValue::new_local(handle.clone());
	let filter_buttons = move || {
		let groups = ui.groups.get();
		std::iter::once(("All".to_string(), Filter::All))
			.chain(
				groups
					.into_iter()
					.map(|group| (group.clone(), Filter::Group(group))),
			)
			.map(|(caption, filter)| {
				let handle_filter = handle_filters.get_value();
				let active_filter = filter.clone();
				let filter_signal = ui.filter;
				view! {
					<button
						class="filter"
						class:active=move || filter_signal.with(|current| *current == active_filter)
						on:click=move |_| {
							let filter = filter.clone();
							handle_filter.run(|editor| {
								editor.apply_filter(filter);
								Ok(())
							});
						}
					>
						{caption}
					</button>
				}
			})
			.collect_view()
	};

	// Sidebar: data
	let handle_export = handle.clone();
	let on_export_json = move |_| {
		handle_export.run(|editor| {
			let json = editor.export_json()?;
			browser::download_text(&editor.config().storage.json_file_name, "application/json", &json)
		});
	};

	let handle_import = handle.clone();
	let on_import_json = move |ev: Event| {
		let Some(input) = ev
			.target()
			.and_then(|target| target.dyn_into::<HtmlInputElement>().ok())
		else {
			return;
		};
		let Some(file) = input.files().and_then(|files| files.get(0)) else {
			return;
		};
		input.set_value("");

		let handle = handle_import.clone();
		spawn_local(async move {
			match browser::read_file_text(&file).await {
				Ok(text) => {
					handle.run(|editor| editor.import_json(&text));
				}
				Err(e) => report(&e),
			}
		});
	};

	let handle_save = handle.clone();
	let on_save_local = move |_| {
		let saved = handle_save.run(|editor| {
			let json = editor.export_json()?;
			browser::storage_set(&editor.config().storage.local_storage_key, &json)
		});
		if saved.is_some() {
			browser::alert("Saved to localStorage");
		}
	};

	let handle_load = handle.clone();
	let on_load_local = move |_| {
		let loaded = handle_load.run(|editor| {
			let key = editor.config().storage.local_storage_key.clone();
			match browser::storage_get(&key)? {
				Some(text) => editor.import_json(&text).map(|()| true),
				None => Ok(false),
			}
		});
		if loaded == Some(false) {
			browser::alert("No saved network in localStorage");
		}
	};

	let handle_png = handle.clone();
	let on_export_png = move |_| {
		let result = export_png(&handle_png.editor.borrow());
		if let Err(e) = result {
			warn!("stac-network: {e}");
			browser::alert("PNG export failed");
		}
	};

	let handle_reset = handle.clone();
	let on_reset = move |_| {
		if browser::confirm("Reset network?") {
			handle_reset.run(|editor| {
				editor.reset();
				Ok(())
			});
		}
	};

	// Detail page
	let detail = ui.detail;
	let save_caption = RwSignal::new("Save");

	let handle_close = handle.clone();
	let on_close_detail = move |_| {
		handle_close.run(|editor| {
			editor.close_detail();
			Ok(())
		});
	};

	let handle_delete = handle.clone();
	let on_delete_node = move |_| {
		let Some(id) = detail.with_untracked(|form| form.as_ref().map(|f| f.node)) else {
			return;
		};
		if browser::confirm("Delete node and its links?") {
			handle_delete.run(|editor| {
				editor.remove_node(id);
				Ok(())
			});
		}
	};

	let handle_save_detail = handle.clone();
	let on_save_detail = move |_| {
		let Some(form) = detail.get_untracked() else {
			return;
		};
		let saved = handle_save_detail.run(|editor| Ok(editor.save_detail(&form)));
		if saved == Some(true) {
			save_caption.set("Saved");
			set_timeout(move || save_caption.set("Save"), Duration::from_millis(900));
		}
	};

	let counts = ui.counts;
	let tooltip = ui.tooltip;

	view! {
		<div class="stac-network">
			<aside class="sidebar">
				<section>
					<h3>"Add node"</h3>
					<input placeholder="Label" bind:value=node_label />
					<select
						prop:value=move || node_group.get()
						on:change=move |ev| node_group.set(event_target_value(&ev))
					>
						{group_options}
					</select>
					<button on:click=on_add_node>"Add node"</button>
				</section>
				<section>
					<h3>"Add link"</h3>
					<input placeholder="Source label" bind:value=link_source />
					<input placeholder="Target label" bind:value=link_target />
					<input placeholder="Relationship" bind:value=link_relationship />
					<button on:click=on_add_link>"Add link"</button>
					<button on:click=on_remove_link>"Remove link"</button>
				</section>
				<section>
					<h3>"Filter links"</h3>
					{filter_buttons}
				</section>
				<section>
					<h3>"Data"</h3>
					<button on:click=on_export_json>"Export JSON"</button>
					<label class="file-button">
						"Import JSON"
						<input type="file" accept="application/json,.json" on:change=on_import_json />
					</label>
					<button on:click=on_save_local>"Save local"</button>
					<button on:click=on_load_local>"Load local"</button>
					<button on:click=on_export_png>"Download PNG"</button>
					<button class="danger" on:click=on_reset>"Reset"</button>
				</section>
				<p class="muted">
					{move || {
						let (nodes, links) = counts.get();
						format!("{nodes} nodes, {links} links")
					}}
				</p>
			</aside>

			<main class="canvas-wrap">
				<canvas
					node_ref=canvas_ref
					class="network-canvas"
					on:mousedown=on_mousedown
					on:mousemove=on_mousemove
					on:mouseup=on_mouseup
					on:mouseleave=on_mouseleave
					on:wheel=on_wheel
					style="display: block; cursor: grab;"
				/>
			</main>

			<section
				class="node-page"
				style:display=move || if detail.with(Option::is_some) { "flex" } else { "none" }
				aria-hidden=move || if detail.with(Option::is_some) { "false" } else { "true" }
			>
				<header>
					<div>
						<h2>{move || detail.with(|form| form.as_ref().map(|f| f.title.clone()))}</h2>
						<p class="muted">
							{move || detail.with(|form| form.as_ref().map(|f| f.subtitle.clone()))}
						</p>
					</div>
					<button on:click=on_close_detail>"Close"</button>
				</header>
				<div class="node-page-content">
					{move || detail.get().map(|form| detail_form_view(form, detail))}
				</div>
				<div class="node-page-actions">
					<button on:click=on_save_detail>{move || save_caption.get()}</button>
					<button class="danger" on:click=on_delete_node>"Delete node"</button>
				</div>
			</section>

			{move || {
				tooltip
					.get()
					.map(|tip| {
						view! {
							<div
								class="tooltip"
								style:left=format!("{}px", tip.x)
								style:top=format!("{}px", tip.y)
							>
								<strong>{tip.label}</strong>
								<div class="muted">{tip.group}</div>
							</div>
						}
					})
			}}
		</div>
	}
}

/// Form body for the detail page. Edits write into `detail` without
/// notifying, so typing never re-renders the form.
fn detail_form_view(form: DetailForm, detail: RwSignal<Option<DetailForm>>) -> impl IntoView {
	let rows = form
		.rows
		.into_iter()
		.map(|row| {
			let key = row.key.clone();
			let on_input = move |ev: Event| {
				let value = event_target_value(&ev);
				detail.update_untracked(|form| {
					if let Some(form) = form {
						form.set_field(&key, value);
					}
				});
			};
			let input = if row.multiline {
				view! { <textarea rows="4" prop:value=row.value on:input=on_input /> }.into_any()
			} else {
				view! { <input type="text" prop:value=row.value on:input=on_input /> }.into_any()
			};
			view! {
				<div class="node-field">
					<label>{row.caption}</label>
					{input}
				</div>
			}
		})
		.collect_view();

	view! {
		<form on:submit=|ev| ev.prevent_default()>
			<div class="node-field">
				<label>"Label"</label>
				<input
					prop:value=form.label
					on:input=move |ev| {
						let value = event_target_value(&ev);
						detail.update_untracked(|form| {
							if let Some(form) = form {
								form.label = value;
							}
						});
					}
				/>
			</div>
			<div class="node-field">
				<label>"Group"</label>
				<input
					prop:value=form.group
					on:input=move |ev| {
						let value = event_target_value(&ev);
						detail.update_untracked(|form| {
							if let Some(form) = form {
								form.group = value;
							}
						});
					}
				/>
			</div>
			{rows}
		</form>
	}
}
