//! Exception code table and lookup helpers.
//!
//! The code table lives in `exception_codes.toml` (embedded) and can be
//! extended at runtime with additional vendor codes through
//! `ExceptionRegistry::from_path(..)?.register_or_merge()`. Lookups return
//! `None` until a registry has been registered.

use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::RwLock;

use crate::error::MonitorError;

/// The table compiled into the crate.
pub const EMBEDDED_EXCEPTION_CODES: &str = include_str!("exception_codes.toml");

#[derive(Debug, Deserialize)]
struct ExceptionCodeEntry {
    // TOML tables usually write codes in hex, so accept "0x.." strings as well as integers
    #[serde(deserialize_with = "parse_hex_or_int")]
    code: u8,
    name: Option<String>,
    description: Option<String>,
}

fn parse_hex_or_int<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct V;
    impl serde::de::Visitor<'_> for V {
        type Value = u8;
        fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "hex string like 0xNN or integer")
        }
        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            u8::try_from(v).map_err(|_| E::custom(format!("value out of range: {v}")))
        }
        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            u8::try_from(v).map_err(|_| E::custom(format!("value out of range: {v}")))
        }
        fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            let s = s.trim();
            s.strip_prefix("0x")
                .or_else(|| s.strip_prefix("0X"))
                .map_or_else(
                    || s.parse::<u8>().map_err(|e| E::custom(format!("parse int: {e}"))),
                    |h| u8::from_str_radix(h, 16).map_err(|e| E::custom(format!("parse hex: {e}"))),
                )
        }
    }
    deserializer.deserialize_any(V)
}

#[derive(Debug, Deserialize)]
struct ExceptionCodesToml {
    #[serde(default)]
    codes: Vec<ExceptionCodeEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExceptionEntry {
    pub code: u8,
    pub name: Option<String>,
    pub description: Option<String>,
}

/// In-memory handle for a parsed exception-code table.
#[derive(Debug)]
pub struct ExceptionRegistry {
    codes: Vec<ExceptionCodeEntry>,
}

impl ExceptionRegistry {
    /// Parse a TOML string into an `ExceptionRegistry`.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, MonitorError> {
        let parsed: ExceptionCodesToml = toml::from_str(s)
            .map_err(|e| MonitorError::Registry(format!("exception_codes.toml parse error: {e}")))?;
        Ok(Self {
            codes: parsed.codes,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, MonitorError> {
        let s = fs::read_to_string(path)?;
        Self::from_str(&s)
    }

    /// The table compiled into the crate.
    pub fn embedded() -> Result<Self, MonitorError> {
        Self::from_str(EMBEDDED_EXCEPTION_CODES)
    }

    /// Validate a TOML string without registering it.
    pub fn validate_str(s: &str) -> Result<(), MonitorError> {
        Self::from_str(s).map(|_| ())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    fn entries(&self) -> HashMap<u8, ExceptionEntry> {
        let mut map = HashMap::with_capacity(self.codes.len());
        for e in &self.codes {
            let entry = ExceptionEntry {
                code: e.code,
                name: e.name.clone(),
                description: e.description.clone(),
            };
            if map.insert(e.code, entry).is_some() {
                tracing::warn!("duplicate exception code 0x{:02x}; last entry wins", e.code);
            }
        }
        map
    }

    /// Register parsed codes into the global registry. Fails if already set.
    pub fn register_codes(&self) -> Result<(), MonitorError> {
        EXCEPTION_REGISTRY
            .set(RwLock::new(self.entries()))
            .map_err(|_| MonitorError::AlreadyRegistered)
    }

    /// Register parsed codes, merging into the existing global registry when
    /// one is already set. Later entries replace earlier ones with the same code.
    pub fn register_or_merge(&self) -> Result<(), MonitorError> {
        match EXCEPTION_REGISTRY.set(RwLock::new(self.entries())) {
            Ok(()) => Ok(()),
            Err(_existing) => {
                let cell = EXCEPTION_REGISTRY.get().ok_or_else(|| {
                    MonitorError::Registry("exception registry inconsistent state".into())
                })?;
                let mut w = cell
                    .write()
                    .map_err(|_| MonitorError::Registry("exception registry poisoned".into()))?;
                w.extend(self.entries());
                Ok(())
            }
        }
    }
}

impl std::str::FromStr for ExceptionRegistry {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExceptionRegistry::from_str(s)
    }
}

static EXCEPTION_REGISTRY: OnceCell<RwLock<HashMap<u8, ExceptionEntry>>> = OnceCell::new();

fn lookup(code: u8) -> Option<ExceptionEntry> {
    EXCEPTION_REGISTRY
        .get()
        .and_then(|rw| rw.read().ok())
        .and_then(|map| map.get(&code).cloned())
}

/// Registered symbolic name (e.g. `ILLEGAL_DATA_ADDRESS`).
#[must_use]
pub fn code_name(code: u8) -> Option<String> {
    lookup(code).and_then(|e| e.name)
}

/// Registered description (e.g. `Illegal data address`).
#[must_use]
pub fn code_description(code: u8) -> Option<String> {
    lookup(code).and_then(|e| e.description)
}

/// Description if registered, otherwise a generic text carrying the number.
#[must_use]
pub fn describe_exception(code: u8) -> String {
    code_description(code).unwrap_or_else(|| format!("exception code {code}"))
}

/// Codes 0x0A and 0x0B are raised by gateways rather than the addressed slave.
#[must_use]
pub const fn is_gateway_error(code: u8) -> bool {
    matches!(code, 0x0A | 0x0B)
}
