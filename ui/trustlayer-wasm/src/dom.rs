//! DOM element bindings.
//!
//! Page-level elements are resolved once at startup; per-campaign inputs are
//! looked up by id when an action fires.

use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlElement, HtmlInputElement, HtmlTextAreaElement};

// ── Helpers ──

pub fn window() -> web_sys::Window {
    web_sys::window().expect_throw("no window")
}

pub fn document() -> Document {
    window().document().expect_throw("no document")
}

pub fn by_id(id: &str) -> Option<Element> {
    document().get_element_by_id(id)
}

pub fn by_id_typed<T: JsCast>(id: &str) -> Option<T> {
    by_id(id).and_then(|e| e.dyn_into::<T>().ok())
}

fn require(id: &str) -> Result<Element, JsValue> {
    by_id(id).ok_or_else(|| JsValue::from_str(&format!("missing #{id}")))
}

fn require_typed<T: JsCast>(id: &str) -> Result<T, JsValue> {
    require(id)?
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("#{id} has an unexpected element type")))
}

pub fn query_all(selector: &str) -> Vec<Element> {
    let Ok(nl) = document().query_selector_all(selector) else {
        return Vec::new();
    };
    (0..nl.length())
        .filter_map(|i| nl.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

pub fn set_text(el: &Element, text: &str) {
    el.set_text_content(Some(text));
}

pub fn set_inner_html(el: &Element, html: &str) {
    el.set_inner_html(html);
}

/// Trimmed value of an `<input>` or `<textarea>` by id; empty when missing.
pub fn field_value(id: &str) -> String {
    if let Some(input) = by_id_typed::<HtmlInputElement>(id) {
        return input.value().trim().to_owned();
    }
    by_id_typed::<HtmlTextAreaElement>(id)
        .map(|area| area.value().trim().to_owned())
        .unwrap_or_default()
}

pub fn clear_field(id: &str) {
    if let Some(input) = by_id_typed::<HtmlInputElement>(id) {
        input.set_value("");
    } else if let Some(area) = by_id_typed::<HtmlTextAreaElement>(id) {
        area.set_value("");
    }
}

pub fn add_class(el: &Element, cls: &str) {
    let _ = el.class_list().add_1(cls);
}

pub fn remove_class(el: &Element, cls: &str) {
    let _ = el.class_list().remove_1(cls);
}

pub fn toggle_class(el: &Element, cls: &str, force: bool) {
    let _ = el.class_list().toggle_with_force(cls, force);
}

pub fn set_display(el: &HtmlElement, value: &str) {
    let _ = el.style().set_property("display", value);
}

pub fn alert(message: &str) {
    let _ = window().alert_with_message(message);
}

pub fn reload() {
    let _ = window().location().reload();
}

// ── Elements struct ──

/// Page-level element references. Clone-friendly (JS GC handles).
#[derive(Clone)]
pub struct Elements {
    pub view_home: Element,
    pub view_project: Element,
    pub view_dashboard: Element,
    pub nav_links: Vec<Element>,
    pub dashboard_link: Option<HtmlElement>,
    pub connect_btn: HtmlElement,
    pub campaigns_grid: Element,
    pub project_container: Element,
    pub dashboard_content: Element,
    pub create_modal: HtmlElement,
}

impl Elements {
    pub fn bind() -> Result<Self, JsValue> {
        Ok(Self {
            view_home: require("view-home")?,
            view_project: require("view-project")?,
            view_dashboard: require("view-dashboard")?,
            nav_links: query_all(".nav-link"),
            dashboard_link: query_all(r#"[data-target="dashboard"]"#)
                .into_iter()
                .next()
                .and_then(|el| el.dyn_into::<HtmlElement>().ok()),
            connect_btn: require_typed("connect-wallet")?,
            campaigns_grid: require("campaigns-grid")?,
            project_container: require("project-details-container")?,
            dashboard_content: require("dashboard-content")?,
            create_modal: require_typed("create-modal")?,
        })
    }
}

// ── Create-campaign modal fields ──

pub const NEW_TITLE: &str = "new-title";
pub const NEW_DESCRIPTION: &str = "new-desc";
pub const NEW_GOAL: &str = "new-goal";
pub const NEW_DURATION: &str = "new-duration";
