//! # Checkout Widget Loader
//!
//! Drives the processor's hosted checkout script from the storefront page.
//!
//! ```text
//! NotLoaded ──mount──► Loading ──load──► Ready ──complete──► Completed
//!     │                   │                │ ──error─────► Failed
//!     └──(script present)─┼───────────────►│ ──cancel────► Cancelled
//!                         └──load error──► Failed
//! ```
//!
//! The browser itself sits behind [`CheckoutHost`], so the same state
//! machine runs in the wasm binding and under test. Execution is
//! single-threaded and event driven: the host delivers script load events
//! and processor callbacks later, through an [`EventSink`].
//!
//! Each widget registers its three completion callbacks under names unique
//! to the instance, and the callbacks hold only a weak reference to it, so
//! a slot left behind by a previous mount can never reach a live widget.

use crate::error::{CheckoutError, CheckoutResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::{Ref, RefCell};
use std::rc::{Rc, Weak};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Processor script injected when the page does not already carry it
pub const CHECKOUT_SCRIPT_URL: &str =
    "https://secure.ap.tnspayments.com/static/checkout/checkout.min.js";

/// Element the inline payment form is rendered into
pub const EMBEDDED_CONTAINER: &str = "#embedded-payment-container";

/// Element the modal payment form is rendered into
pub const MODAL_CONTAINER: &str = "#modal-payment-container";

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Loader lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetState {
    NotLoaded,
    Loading,
    Ready,
    Completed,
    Failed,
    Cancelled,
}

impl WidgetState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WidgetState::Completed | WidgetState::Failed | WidgetState::Cancelled
        )
    }
}

/// How the payment form is presented. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentationMode {
    /// Form rendered in a panel on the page
    #[default]
    Inline,
    /// Form rendered in an overlay
    Modal,
    /// Full-page redirect to the processor
    Redirect,
}

impl PresentationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresentationMode::Inline => "inline",
            PresentationMode::Modal => "modal",
            PresentationMode::Redirect => "redirect",
        }
    }
}

impl FromStr for PresentationMode {
    type Err = CheckoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" | "embedded" => Ok(PresentationMode::Inline),
            "modal" => Ok(PresentationMode::Modal),
            "redirect" | "page" => Ok(PresentationMode::Redirect),
            other => Err(CheckoutError::validation(format!(
                "Unknown presentation mode: {}",
                other
            ))),
        }
    }
}

/// Which processor callback fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackKind {
    Complete,
    Error,
    Cancel,
}

/// Terminal result of one checkout attempt
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome {
    Completed(Value),
    Failed(Value),
    Cancelled(Value),
}

impl PaymentOutcome {
    pub fn payload(&self) -> &Value {
        match self {
            PaymentOutcome::Completed(p) | PaymentOutcome::Failed(p) | PaymentOutcome::Cancelled(p) => p,
        }
    }
}

/// Global function names the processor script calls back into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackSlots {
    pub complete: String,
    pub error: String,
    pub cancel: String,
}

impl CallbackSlots {
    /// Fresh, process-unique slot names
    pub fn unique() -> Self {
        let n = NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed);
        Self {
            complete: format!("handlePaymentComplete_{}", n),
            error: format!("handlePaymentError_{}", n),
            cancel: format!("handlePaymentCancel_{}", n),
        }
    }

    pub fn name(&self, kind: CallbackKind) -> &str {
        match kind {
            CallbackKind::Complete => &self.complete,
            CallbackKind::Error => &self.error,
            CallbackKind::Cancel => &self.cancel,
        }
    }

    pub fn all(&self) -> [(CallbackKind, &str); 3] {
        [
            (CallbackKind::Complete, self.complete.as_str()),
            (CallbackKind::Error, self.error.as_str()),
            (CallbackKind::Cancel, self.cancel.as_str()),
        ]
    }
}

/// The script element to inject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTag {
    pub src: String,
    /// `data-complete` attribute
    pub data_complete: String,
    /// `data-error` attribute
    pub data_error: String,
    /// `data-cancel` attribute
    pub data_cancel: String,
}

impl ScriptTag {
    pub fn new(src: impl Into<String>, slots: &CallbackSlots) -> Self {
        Self {
            src: src.into(),
            data_complete: slots.complete.clone(),
            data_error: slots.error.clone(),
            data_cancel: slots.cancel.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
    Info,
}

/// Short user-visible message (a toast in the browser)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }
}

/// Something the host reports back to the widget
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetEvent {
    ScriptLoaded,
    ScriptFailed,
    Callback(CallbackKind, Value),
}

trait Dispatch {
    fn dispatch(&self, event: WidgetEvent);
}

/// Handle the host uses to deliver events. Inert once the widget is gone.
#[derive(Clone)]
pub struct EventSink {
    target: Weak<dyn Dispatch>,
}

impl EventSink {
    /// Deliver an event. Returns false if the widget no longer exists.
    pub fn send(&self, event: WidgetEvent) -> bool {
        match self.target.upgrade() {
            Some(target) => {
                target.dispatch(event);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink")
            .field("alive", &(self.target.strong_count() > 0))
            .finish()
    }
}

/// The page environment the widget runs in.
///
/// Implementations must deliver events asynchronously: never call into an
/// [`EventSink`] from inside one of these methods.
pub trait CheckoutHost {
    /// Is the processor's `Checkout` global already on the page?
    fn script_present(&self) -> bool;

    /// Append the script tag. Load or error must later arrive on `events`.
    fn inject_script(&mut self, tag: &ScriptTag, events: EventSink) -> CheckoutResult<()>;

    /// Expose a global function `name` that forwards to `events`.
    fn register_callback(
        &mut self,
        name: &str,
        kind: CallbackKind,
        events: EventSink,
    ) -> CheckoutResult<()>;

    /// Remove the global function `name`.
    fn release_callback(&mut self, name: &str);

    /// `Checkout.configure({ session: { id } })`
    fn configure(&mut self, session_id: &str) -> CheckoutResult<()>;

    /// `Checkout.showEmbeddedPage(selector)`
    fn show_embedded_page(&mut self, selector: &str) -> CheckoutResult<()>;

    /// `Checkout.showPaymentPage()`
    fn show_payment_page(&mut self) -> CheckoutResult<()>;

    /// `Checkout.saveFormFields()`
    fn save_form_fields(&mut self) -> CheckoutResult<()>;

    /// `Checkout.restoreFormFields()`
    fn restore_form_fields(&mut self) -> CheckoutResult<()>;

    /// Forget anything persisted for an abandoned modal payment.
    fn clear_saved_state(&mut self) {}

    /// Show a notice to the user.
    fn notify(&mut self, notice: Notice);
}

/// Caller-supplied reactions to the terminal callbacks.
pub trait OutcomeHandler {
    fn on_complete(&self, payload: &Value);
    fn on_error(&self, payload: &Value);
    fn on_cancel(&self, payload: &Value);
}

struct Core {
    state: WidgetState,
    mode: PresentationMode,
    modal_open: bool,
    outcome_tx: Option<oneshot::Sender<PaymentOutcome>>,
}

struct Shared<H> {
    session_id: String,
    host: RefCell<H>,
    core: RefCell<Core>,
    handler: Rc<dyn OutcomeHandler>,
}

impl<H: CheckoutHost> Shared<H> {
    fn notify(&self, notice: Notice) {
        self.host.borrow_mut().notify(notice);
    }

    fn configure(&self) {
        let configured = self.host.borrow_mut().configure(&self.session_id);
        match configured {
            Ok(()) => debug!("Checkout configured with session ID: {}", self.session_id),
            Err(e) => {
                warn!("Error configuring checkout: {}", e);
                self.notify(Notice::error("Payment system configuration failed"));
            }
        }
    }

    fn on_script_loaded(&self) {
        {
            let mut core = self.core.borrow_mut();
            if core.state != WidgetState::Loading {
                debug!("Ignoring script load in state {:?}", core.state);
                return;
            }
            core.state = WidgetState::Ready;
        }
        self.configure();
    }

    fn on_script_failed(&self) {
        {
            let mut core = self.core.borrow_mut();
            if core.state != WidgetState::Loading {
                return;
            }
            core.state = WidgetState::Failed;
            if let Some(tx) = core.outcome_tx.take() {
                let _ = tx.send(PaymentOutcome::Failed(
                    serde_json::json!({ "reason": "script_load_failed" }),
                ));
            }
        }
        self.notify(Notice::error("Failed to load payment system"));
    }

    fn on_callback(&self, kind: CallbackKind, payload: Value) {
        {
            let mut core = self.core.borrow_mut();
            if core.state.is_terminal() {
                debug!("Ignoring {:?} callback after {:?}", kind, core.state);
                return;
            }
            let (state, outcome) = match kind {
                CallbackKind::Complete => (WidgetState::Completed, PaymentOutcome::Completed(payload.clone())),
                CallbackKind::Error => (WidgetState::Failed, PaymentOutcome::Failed(payload.clone())),
                CallbackKind::Cancel => (WidgetState::Cancelled, PaymentOutcome::Cancelled(payload.clone())),
            };
            core.state = state;
            if kind != CallbackKind::Error {
                core.modal_open = false;
            }
            if let Some(tx) = core.outcome_tx.take() {
                let _ = tx.send(outcome);
            }
        }

        match kind {
            CallbackKind::Complete => {
                self.notify(Notice::success("Payment completed successfully!"));
                self.handler.on_complete(&payload);
            }
            CallbackKind::Error => {
                warn!("Payment error: {}", payload);
                self.notify(Notice::error("Payment failed. Please try again."));
                self.handler.on_error(&payload);
            }
            CallbackKind::Cancel => {
                self.notify(Notice::info("Payment cancelled"));
                self.handler.on_cancel(&payload);
            }
        }
    }
}

impl<H: CheckoutHost> Dispatch for Shared<H> {
    fn dispatch(&self, event: WidgetEvent) {
        match event {
            WidgetEvent::ScriptLoaded => self.on_script_loaded(),
            WidgetEvent::ScriptFailed => self.on_script_failed(),
            WidgetEvent::Callback(kind, payload) => self.on_callback(kind, payload),
        }
    }
}

/// One mount of the hosted checkout widget.
pub struct CheckoutWidget<H: CheckoutHost + 'static> {
    shared: Rc<Shared<H>>,
    slots: CallbackSlots,
    outcome_rx: Option<oneshot::Receiver<PaymentOutcome>>,
    registered: bool,
}

impl<H: CheckoutHost + 'static> CheckoutWidget<H> {
    pub fn new(host: H, session_id: impl Into<String>, handler: Rc<dyn OutcomeHandler>) -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            shared: Rc::new(Shared {
                session_id: session_id.into(),
                host: RefCell::new(host),
                core: RefCell::new(Core {
                    state: WidgetState::NotLoaded,
                    mode: PresentationMode::default(),
                    modal_open: false,
                    outcome_tx: Some(tx),
                }),
                handler,
            }),
            slots: CallbackSlots::unique(),
            outcome_rx: Some(rx),
            registered: false,
        }
    }

    pub fn state(&self) -> WidgetState {
        self.shared.core.borrow().state
    }

    pub fn mode(&self) -> PresentationMode {
        self.shared.core.borrow().mode
    }

    pub fn is_modal_open(&self) -> bool {
        self.shared.core.borrow().modal_open
    }

    pub fn session_id(&self) -> &str {
        &self.shared.session_id
    }

    pub fn slots(&self) -> &CallbackSlots {
        &self.slots
    }

    pub fn host(&self) -> Ref<'_, H> {
        self.shared.host.borrow()
    }

    /// Sink delivering events to this widget
    pub fn events(&self) -> EventSink {
        let target: Rc<dyn Dispatch> = self.shared.clone();
        EventSink {
            target: Rc::downgrade(&target),
        }
    }

    /// One-shot receiver resolved with the first terminal outcome.
    /// Can be taken once.
    pub fn take_outcome(&mut self) -> Option<oneshot::Receiver<PaymentOutcome>> {
        self.outcome_rx.take()
    }

    /// Register the callbacks and get the script ready.
    pub fn mount(&mut self) -> CheckoutResult<WidgetState> {
        if self.state() != WidgetState::NotLoaded {
            return Err(CheckoutError::InvalidTransition(format!(
                "mount in state {:?}",
                self.state()
            )));
        }

        let registration = self.register_callbacks();
        if let Err(e) = registration {
            self.release_callbacks();
            self.shared.core.borrow_mut().state = WidgetState::Failed;
            self.shared.notify(Notice::error("Failed to load payment system"));
            return Err(e);
        }

        let present = self.shared.host.borrow().script_present();
        if present {
            self.shared.core.borrow_mut().state = WidgetState::Ready;
            self.shared.configure();
            return Ok(WidgetState::Ready);
        }

        self.shared.core.borrow_mut().state = WidgetState::Loading;
        let tag = ScriptTag::new(CHECKOUT_SCRIPT_URL, &self.slots);
        let injected = self.shared.host.borrow_mut().inject_script(&tag, self.events());
        if let Err(e) = injected {
            warn!("Failed to inject checkout script: {}", e);
            self.shared.on_script_failed();
            return Err(e);
        }

        Ok(WidgetState::Loading)
    }

    /// Switch presentation. Allowed until a terminal state.
    pub fn select_mode(&mut self, mode: PresentationMode) -> CheckoutResult<()> {
        let mut core = self.shared.core.borrow_mut();
        if core.state.is_terminal() {
            return Err(CheckoutError::InvalidTransition(format!(
                "select mode in state {:?}",
                core.state
            )));
        }
        core.mode = mode;
        if mode != PresentationMode::Modal {
            core.modal_open = false;
        }
        Ok(())
    }

    /// Open the payment form in the selected presentation.
    pub fn start_payment(&mut self) -> CheckoutResult<()> {
        let mode = {
            let mut core = self.shared.core.borrow_mut();
            if core.state != WidgetState::Ready {
                return Err(CheckoutError::InvalidTransition(format!(
                    "start payment in state {:?}",
                    core.state
                )));
            }
            if core.mode == PresentationMode::Modal {
                core.modal_open = true;
            }
            core.mode
        };

        let mut host = self.shared.host.borrow_mut();
        let result = match mode {
            PresentationMode::Inline => host.show_embedded_page(EMBEDDED_CONTAINER),
            PresentationMode::Modal => host.show_embedded_page(MODAL_CONTAINER),
            PresentationMode::Redirect => match host.save_form_fields() {
                Ok(()) => host.show_payment_page(),
                Err(e) => Err(e),
            },
        };
        drop(host);

        if let Err(e) = &result {
            warn!("Error starting {} payment: {}", mode.as_str(), e);
            let message = match mode {
                PresentationMode::Inline => "Failed to initialize embedded payment",
                PresentationMode::Modal => "Failed to initialize modal payment",
                PresentationMode::Redirect => "Failed to redirect to payment page",
            };
            self.shared.notify(Notice::error(message));
        }
        result
    }

    /// Restore form fields saved before a full-page redirect.
    pub fn restore_form_fields(&mut self) -> CheckoutResult<()> {
        if self.state() != WidgetState::Ready {
            return Err(CheckoutError::InvalidTransition(format!(
                "restore in state {:?}",
                self.state()
            )));
        }
        self.shared.host.borrow_mut().restore_form_fields()
    }

    /// Close the modal without paying.
    pub fn close_modal(&mut self) {
        self.shared.core.borrow_mut().modal_open = false;
        self.shared.host.borrow_mut().clear_saved_state();
    }

    /// Tear down: release all three callback slots.
    pub fn unmount(mut self) {
        self.release_callbacks();
    }

    fn register_callbacks(&mut self) -> CheckoutResult<()> {
        self.registered = true;
        let events = self.events();
        let mut host = self.shared.host.borrow_mut();
        for (kind, name) in self.slots.all() {
            host.register_callback(name, kind, events.clone())?;
        }
        Ok(())
    }

    fn release_callbacks(&mut self) {
        if !self.registered {
            return;
        }
        self.registered = false;
        let mut host = self.shared.host.borrow_mut();
        for (_, name) in self.slots.all() {
            host.release_callback(name);
        }
    }
}

impl<H: CheckoutHost + 'static> Drop for CheckoutWidget<H> {
    fn drop(&mut self) {
        self.release_callbacks();
    }
}
