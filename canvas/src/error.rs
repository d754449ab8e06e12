//! Error type shared by the canvas crate.

/// Error returned by fallible canvas operations.
#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    /// A required DOM element is absent from the page.
    #[error("missing element: {0}")]
    MissingElement(String),
    /// The canvas did not hand out a 2D rendering context.
    #[error("canvas 2d context unavailable")]
    MissingContext,
    /// A shape has fewer vertices than a persistable polygon needs.
    #[error("polygon needs at least {min} points, got {got}")]
    TooFewPoints { min: usize, got: usize },
    /// Coordinates, records or configuration failed to (de)serialize.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// The parent site plan has not been saved yet.
    #[error("parent record is not saved")]
    UnsavedRecord,
    /// A panel id from the page is not a valid overlay id.
    #[error("unknown overlay: {0}")]
    UnknownOverlay(String),
    /// A browser API call threw.
    #[error("browser call failed: {0}")]
    Js(String),
}

impl From<wasm_bindgen::JsValue> for CanvasError {
    fn from(value: wasm_bindgen::JsValue) -> Self {
        Self::Js(value.as_string().unwrap_or_else(|| format!("{value:?}")))
    }
}

impl From<CanvasError> for wasm_bindgen::JsValue {
    fn from(error: CanvasError) -> Self {
        js_sys::Error::new(&error.to_string()).into()
    }
}
