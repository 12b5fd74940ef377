pub mod expressions;

use meshmap::classify::style::{DisplayMode, MeshFilter, MeshStyle};
use meshmap::geometric::building::{BuildingFeature, UsageTable};
use meshmap::viewer::{HandlerKind, LayerId};
use meshmap::{
    DataSource, FetchError, MeshAttributes, MeshDataset, RegionTable, Renderer, RuleSet, Viewer,
    ViewerConfig, Viewport,
};
use serde::Serialize;
use meshmap::config::FetchConfig;
use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Duration;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, JsFuture};
use web_sys::{AbortController, AbortSignal, Request, RequestInit, RequestMode, Response, Window};

/// Initialize the WASM module with panic hook
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize: {}", e)))
}

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Reads datasets with the browser fetch API, relative to the page unless
/// a base URL is given. Each fetch is aborted once `timeout` elapses.
#[derive(Debug, Clone)]
pub struct FetchSource {
    base_url: Option<String>,
    timeout: Duration,
}

impl FetchSource {
    pub fn new(base_url: Option<String>, fetch: &FetchConfig) -> Self {
        FetchSource {
            base_url,
            timeout: fetch.timeout(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn resolve(&self, location: &str) -> String {
        match &self.base_url {
            Some(base) if !location.contains("://") => {
                format!("{}/{}", base.trim_end_matches('/'), location.trim_start_matches('/'))
            }
            _ => location.to_string(),
        }
    }

    /// Timer delay handed to `setTimeout`, saturated to its `i32` range.
    fn timeout_ms(&self) -> i32 {
        i32::try_from(self.timeout.as_millis()).unwrap_or(i32::MAX)
    }
}

impl Default for FetchSource {
    fn default() -> Self {
        FetchSource::new(None, &FetchConfig::default())
    }
}

/// An aborted request is a timeout when our timer fired, otherwise the
/// original failure stands.
fn abort_as_timeout(err: FetchError, timed_out: bool, after: Duration) -> FetchError {
    if !timed_out {
        return err;
    }
    match err {
        FetchError::Network { url, .. } | FetchError::Decode { url, .. } => {
            FetchError::Timeout { url, after }
        }
        other => other,
    }
}

async fn fetch_body(url: &str, window: &Window, signal: &AbortSignal) -> Result<String, FetchError> {
    let network = |message: String| FetchError::Network {
        url: url.to_string(),
        message,
    };

    let opts = RequestInit::new();
    opts.set_method("GET");
    opts.set_mode(RequestMode::Cors);
    opts.set_signal(Some(signal));

    let request = Request::new_with_str_and_init(url, &opts)
        .map_err(|e| network(format!("Failed to create request: {:?}", e)))?;

    let resp_value = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(|e| network(format!("{:?}", e)))?;
    let resp: Response = resp_value
        .dyn_into()
        .map_err(|_| network("Invalid response type".into()))?;

    if !resp.ok() {
        return Err(FetchError::Http {
            url: url.to_string(),
            status: resp.status(),
        });
    }

    let decode = |message: String| FetchError::Decode {
        url: url.to_string(),
        message,
    };
    let text_promise = resp
        .text()
        .map_err(|e| decode(format!("Failed to get response text: {:?}", e)))?;
    let text = JsFuture::from(text_promise)
        .await
        .map_err(|e| decode(format!("Failed to read response: {:?}", e)))?;
    text.as_string()
        .ok_or_else(|| decode("Response is not a valid string".into()))
}

impl DataSource for FetchSource {
    async fn fetch_text(&self, location: &str) -> Result<String, FetchError> {
        let url = self.resolve(location);
        let setup = |message: String| FetchError::Network {
            url: url.clone(),
            message,
        };

        let window = web_sys::window().ok_or_else(|| setup("No window object available".into()))?;
        let controller = AbortController::new()
            .map_err(|e| setup(format!("Failed to create abort controller: {:?}", e)))?;

        let timed_out = Rc::new(Cell::new(false));
        let on_timeout = {
            let controller = controller.clone();
            let timed_out = Rc::clone(&timed_out);
            Closure::<dyn FnMut()>::once(move || {
                timed_out.set(true);
                controller.abort();
            })
        };
        let timer = window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                on_timeout.as_ref().unchecked_ref(),
                self.timeout_ms(),
            )
            .map_err(|e| setup(format!("Failed to start timeout: {:?}", e)))?;

        let result = fetch_body(&url, &window, &controller.signal()).await;
        window.clear_timeout_with_handle(timer);
        // Keep the callback alive until the timer can no longer fire
        drop(on_timeout);

        result.map_err(|err| abort_as_timeout(err, timed_out.get(), self.timeout))
    }
}

#[wasm_bindgen]
extern "C" {
    /// Object supplied by the page that applies changes to the map library.
    pub type MapAdapter;

    #[wasm_bindgen(method, js_name = setMeshData)]
    fn set_mesh_data(this: &MapAdapter, data: JsValue);
    #[wasm_bindgen(method, js_name = setMeshFillColor)]
    fn set_mesh_fill_color(this: &MapAdapter, expression: JsValue);
    #[wasm_bindgen(method, js_name = setMeshFilter)]
    fn set_mesh_filter(this: &MapAdapter, expression: JsValue);
    #[wasm_bindgen(method, js_name = setMeshOpacity)]
    fn set_mesh_opacity(this: &MapAdapter, opacity: f64);
    #[wasm_bindgen(method, js_name = setBuildingData)]
    fn set_building_data(this: &MapAdapter, data: JsValue);
    #[wasm_bindgen(method, js_name = setLayerVisibility)]
    fn set_layer_visibility(this: &MapAdapter, layer: &str, visible: bool);
    #[wasm_bindgen(method, js_name = bindPopup)]
    fn bind_popup(this: &MapAdapter, layer: &str, kind: &str);
}

/// [`Renderer`] forwarding to a [`MapAdapter`].
pub struct JsRenderer {
    adapter: MapAdapter,
    handlers: HashSet<(LayerId, HandlerKind)>,
}

impl JsRenderer {
    pub fn new(adapter: MapAdapter) -> Self {
        JsRenderer {
            adapter,
            handlers: HashSet::new(),
        }
    }

    fn send<T: Serialize + ?Sized>(&self, value: &T, apply: impl FnOnce(&MapAdapter, JsValue)) {
        match to_js(value) {
            Ok(js) => apply(&self.adapter, js),
            Err(err) => web_sys::console::error_1(&err),
        }
    }
}

impl Renderer for JsRenderer {
    fn set_mesh_data(&mut self, meshes: &MeshDataset) {
        self.send(&meshes.to_feature_collection(), |a, v| a.set_mesh_data(v));
    }

    fn set_mesh_style(&mut self, style: MeshStyle) {
        self.send(&expressions::fill_color(style), |a, v| a.set_mesh_fill_color(v));
    }

    fn set_mesh_filter(&mut self, filter: MeshFilter) {
        self.send(&expressions::filter(filter), |a, v| a.set_mesh_filter(v));
    }

    fn set_mesh_opacity(&mut self, opacity: f64) {
        self.adapter.set_mesh_opacity(opacity);
    }

    fn set_building_data(&mut self, buildings: &[BuildingFeature], usage: &UsageTable) {
        let collection = expressions::building_collection(buildings, usage);
        self.send(&collection, |a, v| a.set_building_data(v));
    }

    fn set_layer_visibility(&mut self, layer: LayerId, visible: bool) {
        self.adapter.set_layer_visibility(layer.as_str(), visible);
    }

    fn has_handler(&self, layer: LayerId, kind: HandlerKind) -> bool {
        self.handlers.contains(&(layer, kind))
    }

    fn register_handler(&mut self, layer: LayerId, kind: HandlerKind) {
        let kind_name = match kind {
            HandlerKind::MeshPopup => "mesh",
            HandlerKind::BuildingPopup => "building",
        };
        self.adapter.bind_popup(layer.as_str(), kind_name);
        self.handlers.insert((layer, kind));
    }
}

fn parse_config(config: JsValue) -> anyhow::Result<ViewerConfig> {
    if config.is_undefined() || config.is_null() {
        return Ok(ViewerConfig::default());
    }
    serde_wasm_bindgen::from_value(config)
        .map_err(|e| anyhow::anyhow!("Invalid viewer config: {}", e))
}

/// One map session: mesh layer, building partitions and popups.
#[wasm_bindgen]
pub struct WasmViewer {
    inner: Rc<Viewer<FetchSource, JsRenderer>>,
}

#[wasm_bindgen]
impl WasmViewer {
    /// Create a session. `config` is a viewer config object or `undefined`
    /// for the shipped defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(
        adapter: MapAdapter,
        config: JsValue,
        base_url: Option<String>,
    ) -> Result<WasmViewer, JsValue> {
        let config = parse_config(config).map_err(js_error)?;
        let source = FetchSource::new(base_url, &config.fetch);
        let viewer = Viewer::new(config, source, JsRenderer::new(adapter)).map_err(js_error)?;
        Ok(WasmViewer {
            inner: Rc::new(viewer),
        })
    }

    /// Fetch and classify the mesh dataset. Resolves to the load status.
    #[wasm_bindgen(js_name = loadMeshes)]
    pub fn load_meshes(&self) -> js_sys::Promise {
        let inner = Rc::clone(&self.inner);
        future_to_promise(async move {
            let status = inner.load_meshes().await.map_err(|e| {
                web_sys::console::warn_1(&JsValue::from_str(&format!("Mesh load failed: {}", e)));
                js_error(e)
            })?;
            to_js(&status)
        })
    }

    /// Apply a selector value: a category tag, `all`, `heatmap`, anything
    /// else hides the meshes.
    #[wasm_bindgen(js_name = setMode)]
    pub fn set_mode(&self, value: &str) {
        self.inner.set_mode(DisplayMode::parse(value));
    }

    /// Switch to a named rule-set preset and reclassify.
    #[wasm_bindgen(js_name = setRuleSet)]
    pub fn set_rule_set(&self, name: &str) -> Result<(), JsValue> {
        let rules = RuleSet::preset(name).map_err(js_error)?;
        self.inner.set_rules(rules).map_err(js_error)
    }

    /// Call on every `moveend`. Resolves to the applied viewport update.
    #[wasm_bindgen(js_name = onViewportChange)]
    pub fn on_viewport_change(&self, zoom: f64, center_lon: f64, center_lat: f64) -> js_sys::Promise {
        let inner = Rc::clone(&self.inner);
        future_to_promise(async move {
            let update = inner
                .on_viewport_change(Viewport::new(zoom, center_lon, center_lat))
                .await;
            to_js(&update)
        })
    }

    #[wasm_bindgen(js_name = meshPopup)]
    pub fn mesh_popup(&self, index: usize) -> Result<JsValue, JsValue> {
        to_js(&self.inner.mesh_popup(index))
    }

    #[wasm_bindgen(js_name = buildingPopup)]
    pub fn building_popup(&self, id: &str) -> Result<JsValue, JsValue> {
        to_js(&self.inner.building_popup(id))
    }

    /// Per-category mesh counts of the loaded dataset.
    #[wasm_bindgen(js_name = categoryCounts)]
    pub fn category_counts(&self) -> Result<JsValue, JsValue> {
        let meshes = self.inner.meshes();
        match meshes.ready() {
            Some(dataset) => to_js(&dataset.counts()),
            None => Ok(JsValue::NULL),
        }
    }
}

/// Classify one mesh properties object under a named preset. Returns the
/// category tag, or `null` for no category.
#[wasm_bindgen(js_name = classifyMesh)]
pub fn classify_mesh(properties: JsValue, preset: &str) -> Result<JsValue, JsValue> {
    let properties: serde_json::Map<String, serde_json::Value> =
        serde_wasm_bindgen::from_value(properties).map_err(js_error)?;
    let rules = RuleSet::preset(preset).map_err(js_error)?;
    let category = meshmap::classify(&MeshAttributes::from_properties(&properties), &rules);
    Ok(category.tag().map(JsValue::from_str).unwrap_or(JsValue::NULL))
}

/// Region id of a longitude in the default region table, or `undefined`.
#[wasm_bindgen(js_name = determineRegion)]
pub fn determine_region(lon: f64) -> Option<String> {
    RegionTable::fukuoka_default()
        .determine_region(lon)
        .map(str::to_string)
}

/// Legend rows for the selectable categories.
#[wasm_bindgen]
pub fn legend() -> Result<JsValue, JsValue> {
    to_js(&expressions::legend())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_against_base() {
        let source = FetchSource::new(
            Some("https://example.org/app/".to_string()),
            &FetchConfig::default(),
        );
        assert_eq!(
            source.resolve("web_data/mesh_usage.geojson"),
            "https://example.org/app/web_data/mesh_usage.geojson"
        );
        assert_eq!(
            source.resolve("https://cdn.example.org/x.geojsonl"),
            "https://cdn.example.org/x.geojsonl"
        );
        assert_eq!(FetchSource::default().resolve("a/b"), "a/b");
    }

    #[test]
    fn test_timeout_comes_from_fetch_config() {
        let fetch = FetchConfig {
            timeout_secs: 7,
            ..FetchConfig::default()
        };
        let source = FetchSource::new(None, &fetch);
        assert_eq!(source.timeout(), Duration::from_secs(7));
        assert_eq!(source.timeout_ms(), 7000);

        let huge = FetchConfig {
            timeout_secs: u64::MAX / 1000,
            ..FetchConfig::default()
        };
        assert_eq!(FetchSource::new(None, &huge).timeout_ms(), i32::MAX);
    }

    #[test]
    fn test_abort_after_timer_is_a_timeout() {
        let after = Duration::from_secs(30);
        let aborted = FetchError::Network {
            url: "web_data/mesh_usage.geojson".to_string(),
            message: "AbortError".to_string(),
        };

        let err = abort_as_timeout(aborted.clone(), true, after);
        assert_eq!(
            err,
            FetchError::Timeout {
                url: "web_data/mesh_usage.geojson".to_string(),
                after
            }
        );
        assert!(err.is_transient());

        // Without the timer firing the failure is reported as is
        assert_eq!(abort_as_timeout(aborted.clone(), false, after), aborted);
        let http = FetchError::Http {
            url: "x".to_string(),
            status: 404,
        };
        assert_eq!(abort_as_timeout(http.clone(), true, after), http);
    }

    #[test]
    fn test_default_regions_exposed() {
        assert_eq!(determine_region(130.4017).as_deref(), Some("lon_2"));
        assert_eq!(determine_region(129.0), None);
    }
}
