//! JSON-RPC control server.
//!
//! Exposes an engine as a JSON-RPC 2.0 server over stdin/stdout, one
//! request per line. Tools allow agents and scripts to load, drive,
//! observe, snapshot and capture the emulator programmatically.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

use emu_core::{Core, Observable, parse_address};

use crate::capture;
use crate::input::{ActionQueue, ButtonMask, SnesButton};
use crate::Engine;

const PARSE_ERROR: i32 = -32700;
const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const ENGINE_ERROR: i32 = -32000;

// ---------------------------------------------------------------------------
// JSON-RPC types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RpcRequest {
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: JsonValue,
    #[serde(default)]
    id: JsonValue,
}

#[derive(Serialize)]
struct RpcResponse {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
    id: JsonValue,
}

#[derive(Serialize)]
struct RpcError {
    code: i32,
    message: String,
}

impl RpcResponse {
    fn success(id: JsonValue, result: JsonValue) -> Self {
        Self {
            jsonrpc: "2.0",
            result: Some(result),
            error: None,
            id,
        }
    }

    fn error(id: JsonValue, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
            id,
        }
    }

    fn ok(id: JsonValue) -> Self {
        Self::success(id, json!({"status": "ok"}))
    }

    fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Control server wrapping one engine.
pub struct McpServer<C: Core> {
    engine: Engine<C>,
    rom_path: Option<PathBuf>,
}

impl<C: Core> McpServer<C> {
    #[must_use]
    pub fn new(engine: Engine<C>) -> Self {
        Self {
            engine,
            rom_path: None,
        }
    }

    /// Default ROM for `load_rom` without a `path` (from `--rom`).
    pub fn set_rom_path(&mut self, path: PathBuf) {
        self.rom_path = Some(path);
    }

    #[must_use]
    pub fn engine(&self) -> &Engine<C> {
        &self.engine
    }

    /// Run the server loop: read requests from stdin, write responses to
    /// stdout. Returns at end of input.
    pub fn run(&mut self) {
        let stdin = io::stdin();
        let stdout = io::stdout();
        let mut stdout = stdout.lock();

        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if let Some(response) = self.handle_line(&line) {
                let _ = writeln!(stdout, "{response}");
                let _ = stdout.flush();
            }
        }
    }

    /// Handle one request line. Blank lines get no response.
    pub fn handle_line(&mut self, line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let request: RpcRequest = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                return Some(
                    RpcResponse::error(JsonValue::Null, PARSE_ERROR, format!("Parse error: {e}"))
                        .to_line(),
                );
            }
        };

        if request.jsonrpc != "2.0" {
            return Some(
                RpcResponse::error(request.id, INVALID_REQUEST, "Invalid JSON-RPC version")
                    .to_line(),
            );
        }

        Some(
            self.dispatch(&request.method, &request.params, request.id)
                .to_line(),
        )
    }

    fn dispatch(&mut self, method: &str, params: &JsonValue, id: JsonValue) -> RpcResponse {
        match method {
            "load_rom" => self.handle_load_rom(params, id),
            "unload" => self.handle_unload(id),
            "reset" => self.handle_reset(id),
            "step" => self.handle_step(params, id),
            "advance" => self.handle_advance(params, id),
            "screenshot" => self.handle_screenshot(id),
            "query" => self.handle_query(params, id),
            "poke" => self.handle_poke(params, id),
            "query_memory" => self.handle_query_memory(params, id),
            "save_state" => self.handle_save_state(id),
            "load_state" => self.handle_load_state(params, id),
            "input_sequence" => self.handle_input_sequence(params, id),
            "set_done" => self.handle_set_done(params, id),
            _ => RpcResponse::error(id, METHOD_NOT_FOUND, format!("Unknown method: {method}")),
        }
    }

    fn require_engine(&mut self, id: &JsonValue) -> Result<&mut Engine<C>, RpcResponse> {
        if self.engine.is_initialized() {
            Ok(&mut self.engine)
        } else {
            Err(RpcResponse::error(
                id.clone(),
                ENGINE_ERROR,
                "No ROM loaded. Call 'load_rom' first.",
            ))
        }
    }

    // === Tool handlers ===

    fn handle_load_rom(&mut self, params: &JsonValue, id: JsonValue) -> RpcResponse {
        let Some(path) = params
            .get("path")
            .and_then(JsonValue::as_str)
            .map(PathBuf::from)
            .or_else(|| self.rom_path.clone())
        else {
            return RpcResponse::error(id, INVALID_PARAMS, "Provide 'path' or --rom CLI argument");
        };

        // Loading replaces whatever is running.
        self.engine.unload();
        match self.engine.try_load(&path) {
            Ok(()) => {
                let (width, height) = self.engine.screen_size();
                RpcResponse::success(
                    id,
                    json!({
                        "status": "ok",
                        "path": path.display().to_string(),
                        "memory_size": self.engine.memory_size(),
                        "width": width,
                        "height": height,
                    }),
                )
            }
            Err(e) => RpcResponse::error(id, ENGINE_ERROR, format!("ROM load failed: {e}")),
        }
    }

    fn handle_unload(&mut self, id: JsonValue) -> RpcResponse {
        let unloaded = self.engine.unload();
        RpcResponse::success(id, json!({"unloaded": unloaded}))
    }

    fn handle_reset(&mut self, id: JsonValue) -> RpcResponse {
        match self.require_engine(&id) {
            Ok(engine) => {
                engine.reset();
                RpcResponse::ok(id)
            }
            Err(e) => e,
        }
    }

    fn handle_step(&mut self, params: &JsonValue, id: JsonValue) -> RpcResponse {
        let buttons = match parse_buttons(params.get("buttons")) {
            Ok(b) => b,
            Err(msg) => return RpcResponse::error(id, INVALID_PARAMS, msg),
        };
        let engine = match self.require_engine(&id) {
            Ok(e) => e,
            Err(e) => return e,
        };

        engine.step(buttons);
        RpcResponse::success(id, json!({"frame_count": engine.frame_count()}))
    }

    fn handle_advance(&mut self, params: &JsonValue, id: JsonValue) -> RpcResponse {
        let count = match params.get("count").map(JsonValue::as_u64) {
            None => 1,
            Some(Some(n)) if n <= u64::from(u32::MAX) => n as u32,
            Some(_) => {
                return RpcResponse::error(id, INVALID_PARAMS, "Invalid 'count' (0-4294967295)");
            }
        };
        let render = params
            .get("render")
            .and_then(JsonValue::as_bool)
            .unwrap_or(true);
        let buttons = match parse_buttons(params.get("buttons")) {
            Ok(b) => b,
            Err(msg) => return RpcResponse::error(id, INVALID_PARAMS, msg),
        };
        let engine = match self.require_engine(&id) {
            Ok(e) => e,
            Err(e) => return e,
        };

        engine.advance(count, render, buttons);
        RpcResponse::success(
            id,
            json!({
                "frames": count,
                "frame_count": engine.frame_count(),
            }),
        )
    }

    fn handle_screenshot(&mut self, id: JsonValue) -> RpcResponse {
        let engine = match self.require_engine(&id) {
            Ok(e) => e,
            Err(e) => return e,
        };

        let screen = engine.screen();
        let (width, height) = (screen.width, screen.height);
        let png = match capture::encode_png(&screen) {
            Ok(png) => png,
            Err(e) => return RpcResponse::error(id, ENGINE_ERROR, format!("PNG encode error: {e}")),
        };

        RpcResponse::success(
            id,
            json!({
                "format": "png",
                "width": width,
                "height": height,
                "data": base64::engine::general_purpose::STANDARD.encode(&png),
            }),
        )
    }

    fn handle_query(&mut self, params: &JsonValue, id: JsonValue) -> RpcResponse {
        let Some(path) = params.get("path").and_then(JsonValue::as_str) else {
            return RpcResponse::error(id, INVALID_PARAMS, "Missing 'path' parameter");
        };

        match self.engine.query(path) {
            Some(value) => {
                RpcResponse::success(id, json!({"path": path, "value": observable_to_json(&value)}))
            }
            None => RpcResponse::error(id, ENGINE_ERROR, format!("Unknown query path: {path}")),
        }
    }

    fn handle_poke(&mut self, params: &JsonValue, id: JsonValue) -> RpcResponse {
        let size = self.engine.memory_size();
        let address = match parse_param_address(params.get("address")) {
            Some(a) if a < size => a,
            _ => {
                return RpcResponse::error(
                    id,
                    INVALID_PARAMS,
                    format!("Missing or invalid 'address' (0-{})", size - 1),
                );
            }
        };
        let value = match params.get("value").and_then(JsonValue::as_u64) {
            Some(v) if v <= 0xFF => v as u8,
            _ => return RpcResponse::error(id, INVALID_PARAMS, "Missing or invalid 'value' (0-255)"),
        };
        let engine = match self.require_engine(&id) {
            Ok(e) => e,
            Err(e) => return e,
        };

        match engine.memory_mut().and_then(|ram| ram.get_mut(address)) {
            Some(byte) => {
                *byte = value;
                RpcResponse::success(id, json!({"address": address, "value": value}))
            }
            None => RpcResponse::error(id, ENGINE_ERROR, "Memory not available"),
        }
    }

    fn handle_query_memory(&mut self, params: &JsonValue, id: JsonValue) -> RpcResponse {
        let size = self.engine.memory_size();
        let Some(address) = parse_param_address(params.get("address")).filter(|&a| a < size) else {
            return RpcResponse::error(
                id,
                INVALID_PARAMS,
                format!("Missing or invalid 'address' (0-{})", size - 1),
            );
        };
        let length = match params.get("length").and_then(JsonValue::as_u64) {
            Some(l) if l >= 1 && l as usize <= size - address => l as usize,
            Some(_) => {
                return RpcResponse::error(
                    id,
                    INVALID_PARAMS,
                    format!("Invalid 'length' (1-{})", size - address),
                );
            }
            None => return RpcResponse::error(id, INVALID_PARAMS, "Missing 'length' parameter"),
        };
        let engine = match self.require_engine(&id) {
            Ok(e) => e,
            Err(e) => return e,
        };

        let Some(bytes) = engine.memory().and_then(|ram| ram.get(address..address + length))
        else {
            return RpcResponse::error(id, ENGINE_ERROR, "Memory not available");
        };

        RpcResponse::success(
            id,
            json!({
                "address": address,
                "length": length,
                "data": bytes,
            }),
        )
    }

    fn handle_save_state(&mut self, id: JsonValue) -> RpcResponse {
        let engine = match self.require_engine(&id) {
            Ok(e) => e,
            Err(e) => return e,
        };

        let blob = engine.save_state();
        if blob.is_empty() {
            return RpcResponse::error(id, ENGINE_ERROR, "Core produced no state");
        }
        RpcResponse::success(
            id,
            json!({
                "size": blob.len(),
                "frame_count": engine.frame_count(),
                "data": base64::engine::general_purpose::STANDARD.encode(&blob),
            }),
        )
    }

    fn handle_load_state(&mut self, params: &JsonValue, id: JsonValue) -> RpcResponse {
        let Some(b64) = params.get("data").and_then(JsonValue::as_str) else {
            return RpcResponse::error(id, INVALID_PARAMS, "Missing 'data' (base64) parameter");
        };
        let blob = match base64::engine::general_purpose::STANDARD.decode(b64) {
            Ok(d) => d,
            Err(e) => return RpcResponse::error(id, INVALID_PARAMS, format!("Invalid base64: {e}")),
        };
        let engine = match self.require_engine(&id) {
            Ok(e) => e,
            Err(e) => return e,
        };

        if engine.load_state(&blob) {
            RpcResponse::success(id, json!({"status": "ok", "size": blob.len()}))
        } else {
            RpcResponse::error(id, ENGINE_ERROR, "State rejected by the core")
        }
    }

    fn handle_input_sequence(&mut self, params: &JsonValue, id: JsonValue) -> RpcResponse {
        let Some(sequence) = params.get("sequence").and_then(JsonValue::as_array) else {
            return RpcResponse::error(id, INVALID_PARAMS, "Missing 'sequence' array parameter");
        };
        let render = params
            .get("render")
            .and_then(JsonValue::as_bool)
            .unwrap_or(true);

        let mut queue = ActionQueue::new();
        for (i, item) in sequence.iter().enumerate() {
            let buttons = match parse_buttons(item.get("buttons")) {
                Ok(b) => b,
                Err(msg) => {
                    return RpcResponse::error(id, INVALID_PARAMS, format!("sequence[{i}]: {msg}"));
                }
            };
            let frames = item
                .get("frames")
                .and_then(JsonValue::as_u64)
                .unwrap_or(1)
                .min(u64::from(u32::MAX)) as u32;
            queue.push(buttons, frames);
        }

        let engine = match self.require_engine(&id) {
            Ok(e) => e,
            Err(e) => return e,
        };
        let start_frame = engine.frame_count();
        let frames = engine.run_actions(&mut queue, render);

        RpcResponse::success(
            id,
            json!({
                "frames": frames,
                "start_frame": start_frame,
                "frame_count": engine.frame_count(),
            }),
        )
    }

    fn handle_set_done(&mut self, params: &JsonValue, id: JsonValue) -> RpcResponse {
        let Some(done) = params.get("done").and_then(JsonValue::as_bool) else {
            return RpcResponse::error(id, INVALID_PARAMS, "Missing 'done' boolean parameter");
        };
        self.engine.set_done(done);
        RpcResponse::success(id, json!({"done": done}))
    }

    /// Run a script file: read a JSON array of simplified requests, dispatch
    /// each in order, and write JSON-line responses to stdout. Steps with a
    /// `save_path` param write their base64 `data` result to that file.
    pub fn run_script(&mut self, path: &Path) -> io::Result<()> {
        let data = std::fs::read_to_string(path)?;
        let steps: Vec<ScriptStep> = serde_json::from_str(&data)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let stdout = io::stdout();
        let mut stdout = stdout.lock();

        for (i, step) in steps.iter().enumerate() {
            let id = JsonValue::from(i as u64 + 1);
            let params = step.params.clone().unwrap_or_else(|| json!({}));
            let response = self.dispatch(&step.method, &params, id);

            let _ = writeln!(stdout, "{}", response.to_line());
            let _ = stdout.flush();

            let Some(save_path) = params.get("save_path").and_then(JsonValue::as_str) else {
                continue;
            };
            let Some(data_b64) = response
                .result
                .as_ref()
                .and_then(|r| r.get("data"))
                .and_then(JsonValue::as_str)
            else {
                continue;
            };
            match save_capture_data(save_path, data_b64) {
                Ok(()) => eprintln!("Saved {save_path}"),
                Err(e) => eprintln!("Failed to save {save_path}: {e}"),
            }
        }

        Ok(())
    }
}

/// A single step in a script file.
#[derive(Deserialize)]
struct ScriptStep {
    method: String,
    #[serde(default)]
    params: Option<JsonValue>,
}

/// Decode base64 capture data and write to a file.
fn save_capture_data(path: &str, data_b64: &str) -> io::Result<()> {
    if data_b64.is_empty() {
        return Ok(());
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data_b64)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    std::fs::write(path, bytes)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Buttons as an array of names, an object of name → bool, or a raw mask.
/// Names are case-insensitive here; unknown names are ignored. Absent means
/// no buttons.
fn parse_buttons(value: Option<&JsonValue>) -> Result<ButtonMask, String> {
    let bit = |name: &str| SnesButton::parse(name).map_or(ButtonMask::empty(), SnesButton::mask);

    match value {
        None | Some(JsonValue::Null) => Ok(ButtonMask::empty()),
        Some(JsonValue::Array(names)) => {
            names
                .iter()
                .try_fold(ButtonMask::empty(), |mask, v| -> Result<_, String> {
                    let name = v.as_str().ok_or("Button names must be strings")?;
                    Ok(mask | bit(name))
                })
        }
        Some(JsonValue::Object(map)) => {
            map.iter()
                .try_fold(ButtonMask::empty(), |mask, (k, v)| -> Result<_, String> {
                    let pressed = v.as_bool().ok_or("Button values must be booleans")?;
                    Ok(if pressed { mask | bit(k.as_str()) } else { mask })
                })
        }
        Some(JsonValue::Number(n)) => n
            .as_u64()
            .and_then(|bits| u32::try_from(bits).ok())
            .and_then(ButtonMask::from_bits)
            .ok_or_else(|| format!("Invalid button mask: {n}")),
        Some(_) => Err("'buttons' must be an array, object or mask".to_string()),
    }
}

/// Addresses as a number or a string (`"0x0DBF"`, `"$0DBF"`, `"3519"`).
fn parse_param_address(value: Option<&JsonValue>) -> Option<usize> {
    match value? {
        JsonValue::Number(n) => n.as_u64().and_then(|a| usize::try_from(a).ok()),
        JsonValue::String(s) => parse_address(s),
        _ => None,
    }
}

fn observable_to_json(value: &emu_core::Value) -> JsonValue {
    match value {
        emu_core::Value::Bool(v) => json!(v),
        emu_core::Value::U8(v) => json!(v),
        emu_core::Value::U16(v) => json!(v),
        emu_core::Value::U32(v) => json!(v),
        emu_core::Value::U64(v) => json!(v),
        emu_core::Value::String(v) => json!(v),
    }
}

#[cfg(test)]
mod tests {
    use snes_sim::SimCore;

    use super::*;

    fn server() -> McpServer<SimCore> {
        McpServer::new(Engine::new(SimCore::new()))
    }

    #[test]
    fn unknown_method_returns_error() {
        let mut server = server();
        let resp = server.dispatch("nonexistent", &JsonValue::Null, JsonValue::from(1));
        assert_eq!(resp.error.as_ref().map(|e| e.code), Some(METHOD_NOT_FOUND));
    }

    #[test]
    fn step_without_rom_returns_error() {
        let mut server = server();
        let resp = server.dispatch("step", &json!({"buttons": ["a"]}), JsonValue::from(1));
        assert_eq!(resp.error.as_ref().map(|e| e.code), Some(ENGINE_ERROR));
    }

    #[test]
    fn button_forms() {
        assert_eq!(
            parse_buttons(Some(&json!(["a", "RIGHT"]))),
            Ok(ButtonMask::A | ButtonMask::RIGHT)
        );
        assert_eq!(
            parse_buttons(Some(&json!({"Start": true, "B": false}))),
            Ok(ButtonMask::START)
        );
        assert_eq!(parse_buttons(Some(&json!(128))), Ok(ButtonMask::A));
        assert_eq!(parse_buttons(None), Ok(ButtonMask::empty()));
        assert_eq!(
            parse_buttons(Some(&json!(["turbo", "up"]))),
            Ok(ButtonMask::UP)
        );
        assert_eq!(
            parse_buttons(Some(&json!({"Right": true, "Turbo": true}))),
            Ok(ButtonMask::RIGHT)
        );
        assert!(parse_buttons(Some(&json!([7]))).is_err());
        assert!(parse_buttons(Some(&json!({"A": 1}))).is_err());
        assert!(parse_buttons(Some(&json!("A"))).is_err());
        assert!(parse_buttons(Some(&json!(1))).is_err());
    }

    #[test]
    fn address_forms() {
        assert_eq!(parse_param_address(Some(&json!(3519))), Some(0x0DBF));
        assert_eq!(parse_param_address(Some(&json!("0x0DBF"))), Some(0x0DBF));
        assert_eq!(parse_param_address(Some(&json!("$0DBF"))), Some(0x0DBF));
        assert_eq!(parse_param_address(Some(&json!(true))), None);
    }

    #[test]
    fn set_done_works_without_rom() {
        let mut server = server();
        let resp = server.dispatch("set_done", &json!({"done": true}), JsonValue::from(1));
        assert!(resp.error.is_none());
        assert!(server.engine().is_done());
    }
}
