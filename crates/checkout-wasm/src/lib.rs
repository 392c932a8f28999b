//! # checkout-wasm
//!
//! WebAssembly bindings for the storefront hosted checkout widget.
//!
//! `HostedCheckout` loads the processor's checkout script, wires up its
//! completion callbacks and opens the payment form inline, in a modal, or
//! as a full-page redirect.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { HostedCheckout } from 'checkout-wasm';
//!
//! await init();
//!
//! const { sessionId } = await fetch('/api/payment/init-checkout', {...}).then(r => r.json());
//!
//! const checkout = new HostedCheckout(sessionId, {
//!   onComplete: (result) => router.push('/checkout/success'),
//!   onError: (error) => console.error(error),
//!   onCancel: () => {},
//!   onNotice: (level, message) => toast[level](message),
//! });
//!
//! checkout.mount();
//! checkout.selectMode('modal');
//! checkout.startPayment();
//!
//! const outcome = await checkout.outcome(); // { status, payload }
//! ```
//!
//! ## Building
//!
//! ```bash
//! wasm-pack build --target web
//! ```

mod host;

pub use host::WebCheckoutHost;

use checkout_core::{
    CheckoutError, CheckoutWidget, OutcomeHandler, PaymentOutcome, PresentationMode,
    WidgetState,
};
use js_sys::{Function, Reflect};
use serde::Serialize;
use serde_json::Value;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

/// Outcome delivered to JavaScript: `{ status, payload }`
#[derive(Debug, Serialize)]
pub struct OutcomeView<'a> {
    pub status: &'static str,
    pub payload: &'a Value,
}

impl<'a> From<&'a PaymentOutcome> for OutcomeView<'a> {
    fn from(outcome: &'a PaymentOutcome) -> Self {
        let status = match outcome {
            PaymentOutcome::Completed(_) => "completed",
            PaymentOutcome::Failed(_) => "failed",
            PaymentOutcome::Cancelled(_) => "cancelled",
        };
        Self {
            status,
            payload: outcome.payload(),
        }
    }
}

pub fn state_name(state: WidgetState) -> &'static str {
    match state {
        WidgetState::NotLoaded => "not_loaded",
        WidgetState::Loading => "loading",
        WidgetState::Ready => "ready",
        WidgetState::Completed => "completed",
        WidgetState::Failed => "failed",
        WidgetState::Cancelled => "cancelled",
    }
}

fn js_error(err: CheckoutError) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

/// Optional function property of the callbacks object
fn callback(options: &JsValue, name: &str) -> Option<Function> {
    if options.is_undefined() || options.is_null() {
        return None;
    }
    Reflect::get(options, &JsValue::from_str(name))
        .ok()
        .and_then(|f| f.dyn_into::<Function>().ok())
}

/// Forwards terminal callbacks to page-supplied JS functions
struct JsOutcomeHandler {
    on_complete: Option<Function>,
    on_error: Option<Function>,
    on_cancel: Option<Function>,
}

impl JsOutcomeHandler {
    fn call(function: &Option<Function>, payload: &Value) {
        let Some(function) = function else {
            return;
        };
        let argument = host::to_js(payload).unwrap_or(JsValue::NULL);
        if let Err(e) = function.call1(&JsValue::NULL, &argument) {
            web_sys::console::error_2(&JsValue::from_str("Checkout callback threw:"), &e);
        }
    }
}

impl OutcomeHandler for JsOutcomeHandler {
    fn on_complete(&self, payload: &Value) {
        Self::call(&self.on_complete, payload);
    }

    fn on_error(&self, payload: &Value) {
        Self::call(&self.on_error, payload);
    }

    fn on_cancel(&self, payload: &Value) {
        Self::call(&self.on_cancel, payload);
    }
}

/// One mount of the hosted checkout on the page
#[wasm_bindgen]
pub struct HostedCheckout {
    widget: CheckoutWidget<WebCheckoutHost>,
}

#[wasm_bindgen]
impl HostedCheckout {
    /// `callbacks` may carry `onComplete`, `onError`, `onCancel` and
    /// `onNotice(level, message)`; all are optional.
    #[wasm_bindgen(constructor)]
    pub fn new(session_id: String, callbacks: JsValue) -> Result<HostedCheckout, JsValue> {
        if session_id.trim().is_empty() {
            return Err(js_error(CheckoutError::validation("Session ID is required")));
        }

        let host = WebCheckoutHost::new(callback(&callbacks, "onNotice")).map_err(js_error)?;
        let handler = Rc::new(JsOutcomeHandler {
            on_complete: callback(&callbacks, "onComplete"),
            on_error: callback(&callbacks, "onError"),
            on_cancel: callback(&callbacks, "onCancel"),
        });

        Ok(Self {
            widget: CheckoutWidget::new(host, session_id, handler),
        })
    }

    #[wasm_bindgen(getter, js_name = sessionId)]
    pub fn session_id(&self) -> String {
        self.widget.session_id().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn state(&self) -> String {
        state_name(self.widget.state()).to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn mode(&self) -> String {
        self.widget.mode().as_str().to_string()
    }

    #[wasm_bindgen(getter, js_name = modalOpen)]
    pub fn modal_open(&self) -> bool {
        self.widget.is_modal_open()
    }

    /// Load the processor script (or reuse it) and configure the session.
    /// Returns the resulting state.
    pub fn mount(&mut self) -> Result<String, JsValue> {
        self.widget
            .mount()
            .map(|state| state_name(state).to_string())
            .map_err(js_error)
    }

    /// `inline`, `modal` or `redirect`
    #[wasm_bindgen(js_name = selectMode)]
    pub fn select_mode(&mut self, mode: &str) -> Result<(), JsValue> {
        let mode: PresentationMode = mode.parse().map_err(js_error)?;
        self.widget.select_mode(mode).map_err(js_error)
    }

    #[wasm_bindgen(js_name = startPayment)]
    pub fn start_payment(&mut self) -> Result<(), JsValue> {
        self.widget.start_payment().map_err(js_error)
    }

    /// Call after returning from a full-page redirect
    #[wasm_bindgen(js_name = restoreFormFields)]
    pub fn restore_form_fields(&mut self) -> Result<(), JsValue> {
        self.widget.restore_form_fields().map_err(js_error)
    }

    #[wasm_bindgen(js_name = closeModal)]
    pub fn close_modal(&mut self) {
        self.widget.close_modal();
    }

    /// Promise resolving with the first terminal outcome. Available once.
    pub fn outcome(&mut self) -> Result<js_sys::Promise, JsValue> {
        let receiver = self.widget.take_outcome().ok_or_else(|| {
            js_error(CheckoutError::InvalidTransition(
                "outcome already taken".to_string(),
            ))
        })?;

        Ok(wasm_bindgen_futures::future_to_promise(async move {
            let outcome = receiver.await.map_err(|_| {
                JsValue::from(js_sys::Error::new("Checkout was unmounted before completing"))
            })?;
            host::to_js(&OutcomeView::from(&outcome)).map_err(js_error)
        }))
    }

    /// Release the global callbacks. The object is unusable afterwards.
    pub fn unmount(self) {
        self.widget.unmount();
    }
}

/// Get library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
