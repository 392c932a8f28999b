//! Browser implementation of [`CheckoutHost`].
//!
//! Talks to the processor's `window.Checkout` global through `Reflect`,
//! injects the script tag, and exposes the completion callbacks as
//! global functions.

use checkout_core::{
    CallbackKind, CheckoutError, CheckoutHost, CheckoutResult, EventSink, Notice, NoticeLevel,
    ScriptTag, WidgetEvent,
};
use js_sys::{Function, Reflect};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{HtmlScriptElement, Window};

/// Global the processor script defines once loaded
const CHECKOUT_GLOBAL: &str = "Checkout";

/// An injected script tag and the load handlers it points at
struct InjectedScript {
    element: HtmlScriptElement,
    _onload: Closure<dyn FnMut()>,
    _onerror: Closure<dyn FnMut()>,
}

impl Drop for InjectedScript {
    fn drop(&mut self) {
        // The tag outlives the host; it must not call into freed closures
        self.element.set_onload(None);
        self.element.set_onerror(None);
    }
}

pub struct WebCheckoutHost {
    window: Window,
    callbacks: HashMap<String, Closure<dyn FnMut(JsValue)>>,
    scripts: Vec<InjectedScript>,
    notifier: Option<Function>,
}

impl WebCheckoutHost {
    pub fn new(notifier: Option<Function>) -> CheckoutResult<Self> {
        let window = web_sys::window()
            .ok_or_else(|| CheckoutError::Script("No window available".to_string()))?;

        Ok(Self {
            window,
            callbacks: HashMap::new(),
            scripts: Vec::new(),
            notifier,
        })
    }

    fn checkout(&self) -> CheckoutResult<JsValue> {
        let checkout = Reflect::get(&self.window, &JsValue::from_str(CHECKOUT_GLOBAL))
            .map_err(|e| CheckoutError::Script(describe(&e)))?;

        if checkout.is_undefined() || checkout.is_null() {
            return Err(CheckoutError::Script(
                "Checkout is not available".to_string(),
            ));
        }
        Ok(checkout)
    }

    /// `window.Checkout[method](...args)`
    fn invoke(&self, method: &str, args: &[JsValue]) -> CheckoutResult<JsValue> {
        let checkout = self.checkout()?;
        let function: Function = Reflect::get(&checkout, &JsValue::from_str(method))
            .map_err(|e| CheckoutError::Script(describe(&e)))?
            .dyn_into()
            .map_err(|_| CheckoutError::Script(format!("Checkout.{} is not a function", method)))?;

        let args: js_sys::Array = args.iter().collect();
        function
            .apply(&checkout, &args)
            .map_err(|e| CheckoutError::Script(format!("Checkout.{}: {}", method, describe(&e))))
    }
}

impl CheckoutHost for WebCheckoutHost {
    fn script_present(&self) -> bool {
        self.checkout().is_ok()
    }

    fn inject_script(&mut self, tag: &ScriptTag, events: EventSink) -> CheckoutResult<()> {
        let document = self
            .window
            .document()
            .ok_or_else(|| CheckoutError::Script("No document available".to_string()))?;

        let script: HtmlScriptElement = document
            .create_element("script")
            .map_err(|e| CheckoutError::Script(describe(&e)))?
            .dyn_into()
            .map_err(|_| CheckoutError::Script("Not a script element".to_string()))?;

        script.set_src(&tag.src);
        for (name, value) in [
            ("data-error", &tag.data_error),
            ("data-cancel", &tag.data_cancel),
            ("data-complete", &tag.data_complete),
        ] {
            script
                .set_attribute(name, value)
                .map_err(|e| CheckoutError::Script(describe(&e)))?;
        }

        let loaded = events.clone();
        let onload = Closure::<dyn FnMut()>::new(move || {
            loaded.send(WidgetEvent::ScriptLoaded);
        });
        let onerror = Closure::<dyn FnMut()>::new(move || {
            events.send(WidgetEvent::ScriptFailed);
        });
        script.set_onload(Some(onload.as_ref().unchecked_ref()));
        script.set_onerror(Some(onerror.as_ref().unchecked_ref()));

        let head = document
            .head()
            .ok_or_else(|| CheckoutError::Script("Document has no head".to_string()))?;
        head.append_child(&script)
            .map_err(|e| CheckoutError::Script(describe(&e)))?;

        self.scripts.push(InjectedScript {
            element: script,
            _onload: onload,
            _onerror: onerror,
        });

        Ok(())
    }

    fn register_callback(
        &mut self,
        name: &str,
        kind: CallbackKind,
        events: EventSink,
    ) -> CheckoutResult<()> {
        let callback = Closure::<dyn FnMut(JsValue)>::new(move |payload: JsValue| {
            let payload: Value = serde_wasm_bindgen::from_value(payload).unwrap_or(Value::Null);
            events.send(WidgetEvent::Callback(kind, payload));
        });

        Reflect::set(&self.window, &JsValue::from_str(name), callback.as_ref())
            .map_err(|e| CheckoutError::Script(describe(&e)))?;
        self.callbacks.insert(name.to_string(), callback);
        Ok(())
    }

    fn release_callback(&mut self, name: &str) {
        let _ = Reflect::delete_property(&self.window, &JsValue::from_str(name));
        self.callbacks.remove(name);
    }

    fn configure(&mut self, session_id: &str) -> CheckoutResult<()> {
        let config = to_js(&serde_json::json!({ "session": { "id": session_id } }))?;
        self.invoke("configure", &[config]).map(|_| ())
    }

    fn show_embedded_page(&mut self, selector: &str) -> CheckoutResult<()> {
        self.invoke("showEmbeddedPage", &[JsValue::from_str(selector)])
            .map(|_| ())
    }

    fn show_payment_page(&mut self) -> CheckoutResult<()> {
        self.invoke("showPaymentPage", &[]).map(|_| ())
    }

    fn save_form_fields(&mut self) -> CheckoutResult<()> {
        self.invoke("saveFormFields", &[]).map(|_| ())
    }

    fn restore_form_fields(&mut self) -> CheckoutResult<()> {
        self.invoke("restoreFormFields", &[]).map(|_| ())
    }

    fn clear_saved_state(&mut self) {
        if let Ok(Some(storage)) = self.window.session_storage() {
            let _ = storage.clear();
        }
    }

    fn notify(&mut self, notice: Notice) {
        let level = notice_level_name(notice.level);

        if let Some(notifier) = &self.notifier {
            let delivered = notifier.call2(
                &JsValue::NULL,
                &JsValue::from_str(level),
                &JsValue::from_str(&notice.message),
            );
            if delivered.is_ok() {
                return;
            }
        }

        let message = JsValue::from_str(&notice.message);
        match notice.level {
            NoticeLevel::Error => web_sys::console::error_1(&message),
            _ => web_sys::console::log_1(&message),
        }
    }
}

impl Drop for WebCheckoutHost {
    fn drop(&mut self) {
        let names: Vec<String> = self.callbacks.keys().cloned().collect();
        for name in names {
            self.release_callback(&name);
        }
    }
}

/// Name passed to the page's notice function
pub fn notice_level_name(level: NoticeLevel) -> &'static str {
    match level {
        NoticeLevel::Success => "success",
        NoticeLevel::Error => "error",
        NoticeLevel::Info => "info",
    }
}

/// Plain JS objects, not `Map`s
pub(crate) fn to_js<T: Serialize>(value: &T) -> CheckoutResult<JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| CheckoutError::Serialization(e.to_string()))
}

fn describe(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{:?}", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_level_names() {
        assert_eq!(notice_level_name(NoticeLevel::Success), "success");
        assert_eq!(notice_level_name(NoticeLevel::Error), "error");
        assert_eq!(notice_level_name(NoticeLevel::Info), "info");
    }
}
