//! # FFI interface for tezlink-native
//!
//! ## Thread Safety
//! - The global codec table (`CODEC_TABLE`) is backed by `DashMap` and is safe to access
//!   from multiple threads.
//!
//! ## Memory and Lifetime
//! - Every string returned from Rust must be freed with [`tezlink_free_string`].
//! - Codec handles remain valid until released with [`tezlink_codec_release`] or
//!   [`tezlink_clear_codecs`].
//!
//! ## Error Handling
//! - Functions report failure by returning `NULL` or `0` and storing the error string
//!   internally.
//! - Use [`tezlink_last_error`] to retrieve the last failure of the current thread.

use dashmap::DashMap;
use lazy_static::lazy_static;
use std::{
    cell::RefCell,
    collections::BTreeMap,
    ffi::{CStr, CString},
    os::raw::c_char,
    ptr,
    sync::atomic::{AtomicU64, Ordering},
};
use tezlink_connector::{
    codec::{self, DeepLinkCodec, DeepLinkKind},
    inbound::EventNormalizer,
    transport::{BeaconNormalizer, BridgeNormalizer, DeepLinkNormalizer},
};
use zeroize::Zeroize;

type Handle = u64;

/// Raw messages from a JavaScript bridge.
pub const SOURCE_BRIDGE: u32 = 0;
/// Wallet callback URLs.
pub const SOURCE_DEEP_LINK: u32 = 1;
/// Beacon messages.
pub const SOURCE_BEACON: u32 = 2;

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

lazy_static! {
    static ref CODEC_TABLE: DashMap<Handle, DeepLinkCodec> = DashMap::new();
}

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(s: impl Into<String>) {
    if let Ok(c_string) = CString::new(s.into()) {
        LAST_ERROR.with(|cell| cell.borrow_mut().replace(c_string));
    }
}

/// Returns the last error string for the current thread.
///
/// # Returns
/// - `NULL` if no error has occurred yet.
/// - A pointer to a null-terminated UTF-8 string otherwise, valid until the next failing
///   call on the same thread. Do not free it.
#[no_mangle]
pub extern "C" fn tezlink_last_error() -> *const c_char {
    LAST_ERROR.with(|cell| cell.borrow().as_ref().map_or(ptr::null(), |s| s.as_ptr()))
}

/// Reads a borrowed C string argument.
unsafe fn read_str<'a>(value: *const c_char, name: &str) -> Option<&'a str> {
    if value.is_null() {
        set_last_error(format!("null {name} argument"));
        return None;
    }
    match CStr::from_ptr(value).to_str() {
        Ok(s) => Some(s),
        Err(_) => {
            set_last_error(format!("{name} is not valid UTF-8"));
            None
        }
    }
}

/// Hands a string to the caller, who must free it with [`tezlink_free_string`].
fn into_raw(value: String) -> *mut c_char {
    match CString::new(value) {
        Ok(c_string) => c_string.into_raw(),
        Err(_) => {
            set_last_error("result contains an interior NUL byte");
            ptr::null_mut()
        }
    }
}

/// Registers a deep-link codec for the given wallet base URL.
///
/// # Safety
/// - `base_url` must be a valid, null-terminated string.
///
/// # Returns
/// - A non-zero handle on success.
/// - `0` if the URL does not parse.
#[no_mangle]
pub unsafe extern "C" fn tezlink_codec_new(base_url: *const c_char) -> Handle {
    let Some(base_url) = read_str(base_url, "base_url") else {
        return 0;
    };
    let codec = match DeepLinkCodec::new(base_url) {
        Ok(codec) => codec,
        Err(e) => {
            set_last_error(format!("invalid base url: {}", e));
            return 0;
        }
    };
    let handle = NEXT_HANDLE.fetch_add(1, Ordering::Relaxed);
    CODEC_TABLE.insert(handle, codec);
    handle
}

/// Builds a deep link.
///
/// # Safety
/// - `kind` must be one of `login`, `operation`, `sign` or `originate`.
/// - `fields_json` must be a JSON object whose values are all strings.
///
/// # Returns
/// - The encoded link, to be freed with [`tezlink_free_string`].
/// - `NULL` if the handle or an argument is invalid.
///
/// # Example
/// ```c
/// char* link = tezlink_codec_encode(codec, "sign", "{\"payload\":\"05\"}");
/// open_url(link);
/// tezlink_free_string(link);
/// ```
#[no_mangle]
pub unsafe extern "C" fn tezlink_codec_encode(
    handle: Handle,
    kind: *const c_char,
    fields_json: *const c_char,
) -> *mut c_char {
    let (Some(kind), Some(fields_json)) =
        (read_str(kind, "kind"), read_str(fields_json, "fields_json"))
    else {
        return ptr::null_mut();
    };
    let Some(kind) = DeepLinkKind::parse(kind) else {
        set_last_error(format!("unknown link kind: {}", kind));
        return ptr::null_mut();
    };
    let fields: BTreeMap<String, String> = match serde_json::from_str(fields_json) {
        Ok(fields) => fields,
        Err(e) => {
            set_last_error(format!("fields decode failed: {}", e));
            return ptr::null_mut();
        }
    };

    let link = match CODEC_TABLE.get(&handle) {
        Some(codec) => codec.encode(kind, &fields),
        None => {
            set_last_error("invalid handle");
            return ptr::null_mut();
        }
    };
    into_raw(link)
}

/// Releases a codec handle.
#[no_mangle]
pub extern "C" fn tezlink_codec_release(handle: Handle) {
    if handle == 0 {
        return;
    }
    if CODEC_TABLE.remove(&handle).is_none() {
        set_last_error("invalid handle");
    }
}

/// Releases every codec handle.
#[no_mangle]
pub extern "C" fn tezlink_clear_codecs() {
    CODEC_TABLE.clear();
    CODEC_TABLE.shrink_to_fit();
}

/// Parses a deep link into a JSON object of its query parameters.
///
/// # Safety
/// - `link` must be a valid, null-terminated string.
///
/// # Returns
/// - A JSON object string, to be freed with [`tezlink_free_string`].
/// - `NULL` if `link` is not a URL.
#[no_mangle]
pub unsafe extern "C" fn tezlink_decode_deep_link(link: *const c_char) -> *mut c_char {
    let Some(link) = read_str(link, "link") else {
        return ptr::null_mut();
    };
    let Some(params) = codec::decode(link) else {
        set_last_error("not a deep link");
        return ptr::null_mut();
    };
    match serde_json::to_string(&params.into_map()) {
        Ok(json) => into_raw(json),
        Err(e) => {
            set_last_error(format!("params encode failed: {}", e));
            ptr::null_mut()
        }
    }
}

/// Normalizes a raw wallet message into event envelope JSON.
///
/// `source` is one of [`SOURCE_BRIDGE`], [`SOURCE_DEEP_LINK`] or [`SOURCE_BEACON`]. Beacon
/// messages are routed by message type only, since no request ids are known here.
///
/// # Safety
/// - `raw` must be a valid, null-terminated string.
///
/// # Returns
/// - The envelope JSON, to be freed with [`tezlink_free_string`].
/// - An empty string for messages that carry no event (such as acknowledgements).
/// - `NULL` if the message is malformed or `source` is unknown.
#[no_mangle]
pub unsafe extern "C" fn tezlink_normalize(source: u32, raw: *const c_char) -> *mut c_char {
    let Some(raw) = read_str(raw, "raw") else {
        return ptr::null_mut();
    };
    let normalizer: Box<dyn EventNormalizer> = match source {
        SOURCE_BRIDGE => Box::new(BridgeNormalizer),
        SOURCE_DEEP_LINK => Box::new(DeepLinkNormalizer),
        SOURCE_BEACON => Box::new(BeaconNormalizer::default()),
        other => {
            set_last_error(format!("unknown source: {}", other));
            return ptr::null_mut();
        }
    };

    let envelope = match normalizer.normalize(raw) {
        Ok(Some(envelope)) => envelope,
        Ok(None) => return into_raw(String::new()),
        Err(e) => {
            set_last_error(format!("normalize failed: {}", e));
            return ptr::null_mut();
        }
    };
    match envelope.to_json() {
        Ok(json) => into_raw(json),
        Err(e) => {
            set_last_error(format!("envelope encode failed: {}", e));
            ptr::null_mut()
        }
    }
}

/// Frees a string previously returned by any FFI function.
///
/// # Safety
/// - `value` must come from this library and must not be used afterwards.
///
/// # Notes
/// - Zeroes the bytes before freeing, since links can carry signatures.
/// - No-op if null.
#[no_mangle]
pub unsafe extern "C" fn tezlink_free_string(value: *mut c_char) {
    if value.is_null() {
        return;
    }
    let mut bytes = CString::from_raw(value).into_bytes();
    bytes.zeroize();
}
