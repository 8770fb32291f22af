//! Toolchain classification of deployed contract binaries
//!
//! Pure byte-signature matching. Each signature family that matches adds one
//! candidate; only a single candidate is trusted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const WASM_MAGIC: &[u8] = b"\0asm";

// "lib/assemblyscript" as UTF-16LE
const ASSEMBLYSCRIPT_LIB_UTF16: &[u8] =
    b"l\x00i\x00b\x00/\x00a\x00s\x00s\x00e\x00m\x00b\x00l\x00y\x00s\x00c\x00r\x00i\x00p\x00t";
const ASSEMBLYSCRIPT_PERSISTENT_MAP: &[u8] =
    b"~lib/near-sdk-core/collections/persistentMap/PersistentMap";

/// Terminal classification label stored in `unique_contracts.contract_sdk_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SdkType {
    #[serde(rename = "RS")]
    Rust,
    #[serde(rename = "JS")]
    JavaScript,
    #[serde(rename = "AS")]
    AssemblyScript,
    #[serde(rename = "UNKNOWN")]
    Unknown,
    #[serde(rename = "EMPTY")]
    Empty,
    #[serde(rename = "NOT_WASM")]
    NotWasm,
}

impl SdkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SdkType::Rust => "RS",
            SdkType::JavaScript => "JS",
            SdkType::AssemblyScript => "AS",
            SdkType::Unknown => "UNKNOWN",
            SdkType::Empty => "EMPTY",
            SdkType::NotWasm => "NOT_WASM",
        }
    }
}

impl fmt::Display for SdkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SdkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RS" => Ok(SdkType::Rust),
            "JS" => Ok(SdkType::JavaScript),
            "AS" => Ok(SdkType::AssemblyScript),
            "UNKNOWN" => Ok(SdkType::Unknown),
            "EMPTY" => Ok(SdkType::Empty),
            "NOT_WASM" => Ok(SdkType::NotWasm),
            other => Err(format!("Unknown SDK type label: {:?}", other)),
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// Toolchains whose markers appear in a wasm binary, in label order
pub fn detect_candidates(code: &[u8]) -> Vec<SdkType> {
    let mut candidates = Vec::new();

    if contains(code, b"__data_end") && contains(code, b"__heap_base") {
        candidates.push(SdkType::Rust);
    }

    if contains(code, b"JS_TAG_MODULE") && contains(code, b"quickjs-libc-min.") {
        candidates.push(SdkType::JavaScript);
    }

    if contains(code, ASSEMBLYSCRIPT_LIB_UTF16) || contains(code, ASSEMBLYSCRIPT_PERSISTENT_MAP) {
        candidates.push(SdkType::AssemblyScript);
    }

    candidates
}

/// Classify a contract binary
///
/// Empty code is `Empty` (the only way to shrink a deployed contract), non-wasm
/// payloads are `NotWasm`, and anything other than exactly one matching
/// toolchain is `Unknown`.
pub fn classify(code: &[u8]) -> SdkType {
    if code.is_empty() {
        return SdkType::Empty;
    }

    if !code.starts_with(WASM_MAGIC) {
        return SdkType::NotWasm;
    }

    match detect_candidates(code).as_slice() {
        [single] => *single,
        _ => SdkType::Unknown,
    }
}
