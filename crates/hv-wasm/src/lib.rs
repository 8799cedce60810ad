//! WebAssembly bindings for the Haven allowlist engine
//!
//! The extension's JS host owns everything environmental: fetching the
//! remote allowlist on its alarm schedule, persisting state in
//! `chrome.storage`, deciding when to capture. This module owns the
//! decisions: whether a URL is protected, and how a fetched payload folds
//! into the allowlist.
//!
//! Division of labor keeps the privacy boundary simple: URLs enter wasm
//! and a boolean comes back; nothing in here logs, stores, or exports a
//! URL.

use std::sync::{Arc, OnceLock};

use wasm_bindgen::prelude::*;

use hv_core::queue::{self, QueueDrain};
use hv_core::storage::{MemoryStorage, QUEUE_KEY, SNAPSHOT_KEY};
use hv_core::store::AllowlistStore;
use hv_core::Guard;
use hv_sync::payload::{apply_payload, PayloadOutcome};

struct EngineState {
    store: Arc<AllowlistStore>,
    storage: MemoryStorage,
    guard: Guard,
    drain: QueueDrain,
}

static ENGINE: OnceLock<EngineState> = OnceLock::new();

fn build_engine(persisted_snapshot: Option<String>, persisted_queue: Option<String>) -> EngineState {
    let storage = MemoryStorage::new();
    if let Some(raw) = persisted_snapshot {
        storage.set_raw(SNAPSHOT_KEY, raw);
    }
    if let Some(raw) = persisted_queue {
        storage.set_raw(QUEUE_KEY, raw);
    }

    // Malformed persisted state degrades to bundled defaults inside load.
    let store = Arc::new(AllowlistStore::load(&storage));
    let (recorder, drain) = queue::channel();
    let guard = Guard::new(store.clone()).with_recorder(recorder);

    EngineState {
        store,
        storage,
        guard,
        drain,
    }
}

// A call that arrives before `init` (service-worker startup races) runs
// against bundled defaults rather than failing open.
fn engine() -> &'static EngineState {
    ENGINE.get_or_init(|| build_engine(None, None))
}

/// Initialize the engine from state the host persisted previously. Pass
/// `null` for either argument on first run.
#[wasm_bindgen]
pub fn init(
    persisted_snapshot: Option<String>,
    persisted_queue: Option<String>,
) -> Result<(), JsValue> {
    ENGINE
        .set(build_engine(persisted_snapshot, persisted_queue))
        .map_err(|_| JsValue::from_str("Already initialized. Reload the extension to reinitialize."))
}

#[wasm_bindgen]
pub fn is_initialized() -> bool {
    ENGINE.get().is_some()
}

/// The hot-path check: should capture be suppressed for this URL?
#[wasm_bindgen]
pub fn is_url_protected(url: &str) -> bool {
    engine().guard.is_url_protected(url)
}

/// Fold a fetched allowlist payload into the engine. Returns whether the
/// allowlist changed; an invalid payload changes nothing.
#[wasm_bindgen]
pub fn apply_remote_payload(body: &str) -> bool {
    let state = engine();
    matches!(
        apply_payload(body, &state.store, &state.storage),
        PayloadOutcome::Changed
    )
}

/// Serialized live snapshot, for the host to write to `chrome.storage`.
#[wasm_bindgen]
pub fn export_snapshot() -> Result<String, JsValue> {
    serde_json::to_string(&engine().store.snapshot())
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize snapshot: {e}")))
}

/// Drain pending fuzzy-match records into the persisted queue and return
/// the queue as JSON for the host to store. Base domains only.
#[wasm_bindgen]
pub fn export_fuzzy_queue() -> Result<String, JsValue> {
    let state = engine();
    state.drain.flush_to_storage(&state.storage);

    match state.storage.raw(QUEUE_KEY) {
        Some(raw) => Ok(raw),
        None => serde_json::to_string(&hv_core::ImprovementQueue::new())
            .map_err(|e| JsValue::from_str(&format!("Failed to serialize queue: {e}"))),
    }
}

/// Version string of the active allowlist.
#[wasm_bindgen]
pub fn allowlist_version() -> String {
    engine().store.version()
}

/// Number of protected domains. The domains themselves never cross this
/// boundary.
#[wasm_bindgen]
pub fn protected_domain_count() -> u32 {
    engine().store.domain_count() as u32
}

/// Diagnostic summary for the popup's debug view.
#[wasm_bindgen]
pub fn engine_info() -> JsValue {
    let result = js_sys::Object::new();
    let initialized = ENGINE.get().is_some();
    let _ = js_sys::Reflect::set(&result, &"initialized".into(), &JsValue::from(initialized));
    if let Some(state) = ENGINE.get() {
        let _ = js_sys::Reflect::set(
            &result,
            &"version".into(),
            &JsValue::from(state.store.version()),
        );
        let _ = js_sys::Reflect::set(
            &result,
            &"domainCount".into(),
            &JsValue::from(state.store.domain_count() as u32),
        );
    }
    result.into()
}
