#![forbid(unsafe_code)]

//! `wasm-bindgen` export of the detector.
//!
//! [`ResizeDetectorHandle`] is the JS-facing surface: it inserts the hidden
//! probe into a container, observes the container and calls a JS function
//! with `(width, height)` whenever a watched dimension changes. Only compiled
//! on `wasm32` targets.

use crate::options::parse_detector_options;
use crate::web_host::WebHost;
use js_sys::{Function, JSON, Reflect};
use resize_detector::detector::probe_node;
use resize_detector::{DetectorProps, ResizeDetector};
use std::rc::Rc;
use tracing::debug;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::Element;

fn console_error(msg: &str) {
    let global = js_sys::global();
    let Ok(console) = Reflect::get(&global, &"console".into()) else {
        return;
    };
    let Ok(error) = Reflect::get(&console, &"error".into()) else {
        return;
    };
    let Ok(error_fn) = error.dyn_into::<Function>() else {
        return;
    };
    let _ = error_fn.call1(&console, &JsValue::from_str(msg));
}

fn install_panic_hook() {
    use std::sync::Once;

    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            let msg = match info.location() {
                Some(loc) => format!(
                    "resize-detector panic at {}:{}:{}: {info}",
                    loc.file(),
                    loc.line(),
                    loc.column()
                ),
                None => format!("resize-detector panic: {info}"),
            };
            console_error(&msg);
        }));
    });
}

#[wasm_bindgen(start)]
pub fn wasm_start() {
    install_panic_hook();
}

fn options_json(options: &JsValue) -> Result<String, JsValue> {
    if options.is_undefined() || options.is_null() {
        return Ok("null".to_string());
    }
    Ok(JSON::stringify(options)?.into())
}

/// Create the hidden probe `div` and append it to `container`.
fn insert_probe(host: &WebHost, container: &Element) -> Result<Element, JsValue> {
    let document = host
        .document()
        .ok_or_else(|| JsValue::from_str("resize-detector: no document"))?;
    let probe = document.create_element("div")?;
    if let Some(template) = probe_node().as_element() {
        probe.set_attribute("style", &template.style_text())?;
    }
    container.append_child(&probe)?;
    Ok(probe)
}

/// A mounted resize detector bound to a DOM container.
#[wasm_bindgen]
pub struct ResizeDetectorHandle {
    detector: ResizeDetector<Element>,
    probe: Option<Element>,
}

#[wasm_bindgen]
impl ResizeDetectorHandle {
    /// Start observing `container`.
    ///
    /// `options` is a plain object with `handleWidth`, `handleHeight`,
    /// `skipOnMount`, `refreshRate`, `refreshMode` and `resizableElementId`;
    /// `undefined` uses the defaults. `onResize` receives `(width, height)`.
    #[wasm_bindgen(constructor)]
    pub fn new(
        container: Element,
        options: JsValue,
        on_resize: Function,
    ) -> Result<ResizeDetectorHandle, JsValue> {
        install_panic_hook();
        let config = parse_detector_options(&options_json(&options)?)
            .map_err(|err| JsValue::from_str(&err.to_string()))?;

        let host = Rc::new(WebHost::new());
        let probe = insert_probe(&host, &container)?;
        let props = DetectorProps::new(config).with_on_resize(move |width, height| {
            let (width, height) = (JsValue::from_f64(width), JsValue::from_f64(height));
            if let Err(err) = on_resize.call2(&JsValue::NULL, &width, &height) {
                console_error(&format!("resize-detector: onResize threw: {err:?}"));
            }
        });

        let mut detector = ResizeDetector::new(Rc::new(props), host.host());
        detector.attach_probe(Some(probe.clone()));
        detector.mount();
        debug!("resize detector handle mounted");

        Ok(Self {
            detector,
            probe: Some(probe),
        })
    }

    /// Stop observing and remove the probe. Safe to call more than once.
    pub fn unmount(&mut self) {
        self.detector.unmount();
        if let Some(probe) = self.probe.take() {
            probe.remove();
        }
    }

    /// Last applied width, or `undefined` before the first measurement.
    pub fn width(&self) -> Option<f64> {
        self.detector.size().width
    }

    /// Last applied height, or `undefined` before the first measurement.
    pub fn height(&self) -> Option<f64> {
        self.detector.size().height
    }

    /// Whether the detector is currently observing.
    #[wasm_bindgen(js_name = isMounted)]
    pub fn is_mounted(&self) -> bool {
        self.detector.is_mounted()
    }
}
