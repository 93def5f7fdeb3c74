use std::sync::Once;

use serde::Deserialize;
use wasm_bindgen::prelude::*;

use edit_graph::{EntityID, Graph};
use geojson_to_edit_graph::{convert_geojson, to_feature_collection};

use crate::{ChainError, Disabled, Straighten, WebMercator};

static START: Once = Once::new();

/// The editing graph and a way to straighten parts of it, for use from a web map.
#[wasm_bindgen]
pub struct JsStraighten {
    graph: Graph,
    config: Config,
}

#[derive(Deserialize)]
#[serde(default)]
struct Config {
    /// The map's zoom; straightness is judged in screen space at this zoom
    zoom: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config { zoom: 16.0 }
    }
}

#[wasm_bindgen]
impl JsStraighten {
    #[wasm_bindgen(constructor)]
    pub fn new(raw_geojson: &str) -> Result<JsStraighten, JsValue> {
        START.call_once(|| {
            // Panics shouldn't happen, but if they do, console.log them.
            console_error_panic_hook::set_once();
            #[cfg(target_arch = "wasm32")]
            console_log::init_with_level(log::Level::Info).unwrap();
        });

        log::info!("Got {} bytes of GeoJSON, building graph", raw_geojson.len());
        let graph = convert_geojson(raw_geojson.to_string()).map_err(err_to_js)?;
        Ok(Self {
            graph,
            config: Config::default(),
        })
    }

    #[wasm_bindgen(js_name = setConfig)]
    pub fn set_config(&mut self, input: JsValue) {
        match serde_wasm_bindgen::from_value(input) {
            Ok(config) => {
                self.config = config;
            }
            Err(err) => {
                log::warn!("Bad input to setConfig: {}", err);
            }
        }
    }

    /// Returns the reason the selection (a list of IDs like `w1`, `n5`) can't be straightened,
    /// or nothing if it can.
    pub fn disabled(&self, selected_ids: JsValue) -> Result<Option<String>, JsValue> {
        let selected = parse_selection(selected_ids)?;
        Ok(self.check(selected).map(|x| x.reason().to_string()))
    }

    /// Straightens the selection and keeps the result. `t` below 1 only moves nodes part of
    /// the way and deletes nothing; leave it out to go fully straight. The caller should redraw.
    pub fn straighten(&mut self, selected_ids: JsValue, t: Option<f64>) -> Result<(), JsValue> {
        let selected = parse_selection(selected_ids)?;
        self.straighten_ids(selected, t).map_err(err_to_js)
    }

    /// Renders what the selection would look like partly straightened, without changing
    /// anything. Useful to animate the edit.
    #[wasm_bindgen(js_name = previewGeojson)]
    pub fn preview_geojson(&self, selected_ids: JsValue, t: f64) -> Result<String, JsValue> {
        let selected = parse_selection(selected_ids)?;
        let graph = self
            .action(selected)
            .apply(&self.graph, Some(t))
            .map_err(err_to_js)?;
        render(&graph).map_err(err_to_js)
    }

    #[wasm_bindgen(js_name = renderGeojson)]
    pub fn render_geojson(&self) -> Result<String, JsValue> {
        render(&self.graph).map_err(err_to_js)
    }
}

impl JsStraighten {
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn check(&self, selected: Vec<EntityID>) -> Option<Disabled> {
        self.action(selected).disabled(&self.graph)
    }

    pub fn straighten_ids(
        &mut self,
        selected: Vec<EntityID>,
        t: Option<f64>,
    ) -> Result<(), ChainError> {
        self.graph = self.action(selected).apply(&self.graph, t)?;
        Ok(())
    }

    fn action(&self, selected: Vec<EntityID>) -> Straighten<WebMercator> {
        Straighten::new(selected, WebMercator::for_zoom(self.config.zoom))
    }
}

fn parse_selection(input: JsValue) -> Result<Vec<EntityID>, JsValue> {
    let ids: Vec<String> = serde_wasm_bindgen::from_value(input)?;
    ids.iter()
        .map(|id| id.parse::<EntityID>())
        .collect::<Result<_, _>>()
        .map_err(err_to_js)
}

fn render(graph: &Graph) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&to_feature_collection(graph))
}

fn err_to_js<E: std::fmt::Display>(err: E) -> JsValue {
    JsValue::from_str(&err.to_string())
}
