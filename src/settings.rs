//! Application settings.
//!
//! Resolved once when the [`Application`](crate::Application) is built and
//! shared read-only with every request afterwards. All fields have defaults,
//! so a minimal TOML file (or none at all) is valid:
//!
//! ```toml
//! strict_routing = true
//! etag           = "strong"
//! json_spaces    = 2
//! ```
//!
//! Function-valued settings ([`Etag::Custom`], [`Settings::json_replacer`])
//! can only be set in code.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;

/// Every knob the framework reads at request time.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// `/Foo` and `/foo` are different routes.
    pub case_sensitive_routing: bool,
    /// `/foo` and `/foo/` are different routes.
    pub strict_routing: bool,
    /// How `Response::send` generates `ETag` headers.
    pub etag: Etag,
    /// Applied to every value serialized by `Response::json`.
    #[serde(skip)]
    pub json_replacer: Option<JsonReplacer>,
    /// Pretty-print JSON with this many spaces (clamped to 10).
    pub json_spaces: Option<usize>,
    /// Escape `<`, `>` and `&` in JSON output.
    pub json_escape: bool,
    /// Query parameter carrying the JSONP callback name.
    pub jsonp_callback_name: String,
    /// Honour `X-Forwarded-*` headers for `protocol`, `hostname` and `ip`.
    pub trust_proxy: bool,
    /// Send `X-Powered-By: strata`.
    pub x_powered_by: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            case_sensitive_routing: false,
            strict_routing: false,
            etag: Etag::Weak,
            json_replacer: None,
            json_spaces: None,
            json_escape: false,
            jsonp_callback_name: "callback".to_owned(),
            trust_proxy: false,
            x_powered_by: true,
        }
    }
}

impl Settings {
    /// Parses settings from a TOML document. Unknown keys are ignored.
    pub fn from_toml(source: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(source)?;
        Ok(settings.normalized())
    }

    /// Reads and parses a TOML settings file.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml(&source)
    }

    pub(crate) fn normalized(mut self) -> Self {
        self.json_spaces = self.json_spaces.map(|n| n.min(10)).filter(|n| *n > 0);
        if self.jsonp_callback_name.is_empty() {
            self.jsonp_callback_name = "callback".to_owned();
        }
        self
    }
}

// ── ETag strategy ─────────────────────────────────────────────────────────────

/// ETag generation strategy.
///
/// In TOML: `true`/`"weak"`, `"strong"`, or `false`/`"disabled"`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(try_from = "EtagSetting")]
pub enum Etag {
    Disabled,
    #[default]
    Weak,
    Strong,
    Custom(EtagFn),
}

impl Etag {
    /// Computes the validator for `body`, or `None` when generation is off.
    pub fn generate(&self, body: &[u8]) -> Option<String> {
        match self {
            Self::Disabled  => None,
            Self::Weak      => Some(crate::conditional::entity_tag(body, true)),
            Self::Strong    => Some(crate::conditional::entity_tag(body, false)),
            Self::Custom(f) => (f.0)(body),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }

    /// A user-supplied generator.
    pub fn custom(f: impl Fn(&[u8]) -> Option<String> + Send + Sync + 'static) -> Self {
        Self::Custom(EtagFn(Arc::new(f)))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EtagSetting {
    Flag(bool),
    Named(String),
}

impl TryFrom<EtagSetting> for Etag {
    type Error = String;

    fn try_from(setting: EtagSetting) -> std::result::Result<Self, Self::Error> {
        match setting {
            EtagSetting::Flag(true) => Ok(Self::Weak),
            EtagSetting::Flag(false) => Ok(Self::Disabled),
            EtagSetting::Named(name) => match name.to_ascii_lowercase().as_str() {
                "weak"                => Ok(Self::Weak),
                "strong"              => Ok(Self::Strong),
                "disabled" | "off"    => Ok(Self::Disabled),
                _ => Err(format!("unknown etag mode `{name}`")),
            },
        }
    }
}

/// Shared custom ETag function.
#[derive(Clone)]
pub struct EtagFn(Arc<dyn Fn(&[u8]) -> Option<String> + Send + Sync>);

impl fmt::Debug for EtagFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EtagFn(..)")
    }
}

// ── JSON replacer ─────────────────────────────────────────────────────────────

/// A `JSON.stringify`-style replacer: called with each key (the empty string
/// for the root, the decimal index for array elements) and value. Returning
/// `None` drops an object member and turns an array element into `null`.
#[derive(Clone)]
pub struct JsonReplacer(Arc<dyn Fn(&str, &Value) -> Option<Value> + Send + Sync>);

impl JsonReplacer {
    pub fn new(f: impl Fn(&str, &Value) -> Option<Value> + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Runs the replacer over `value`, outermost first. `None` means the
    /// root itself was dropped.
    pub fn apply(&self, value: &Value) -> Option<Value> {
        self.visit("", value)
    }

    fn visit(&self, key: &str, value: &Value) -> Option<Value> {
        let replaced = (self.0)(key, value)?;
        Some(match replaced {
            Value::Object(map) => Value::Object(
                map.iter()
                    .filter_map(|(k, v)| self.visit(k, v).map(|v| (k.clone(), v)))
                    .collect(),
            ),
            Value::Array(items) => Value::Array(
                items.iter()
                    .enumerate()
                    .map(|(i, v)| self.visit(&i.to_string(), v).unwrap_or(Value::Null))
                    .collect(),
            ),
            other => other,
        })
    }
}

impl fmt::Debug for JsonReplacer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JsonReplacer(..)")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert!(matches!(s.etag, Etag::Weak));
        assert_eq!(s.jsonp_callback_name, "callback");
        assert!(s.x_powered_by);
        assert!(!s.strict_routing);
    }

    #[test]
    fn parses_toml() {
        let s = Settings::from_toml(
            r#"
            strict_routing = true
            etag = "strong"
            json_spaces = 40
            jsonp_callback_name = "cb"
            "#,
        )
        .unwrap();
        assert!(s.strict_routing);
        assert!(matches!(s.etag, Etag::Strong));
        assert_eq!(s.json_spaces, Some(10));
        assert_eq!(s.jsonp_callback_name, "cb");

        let s = Settings::from_toml("etag = false").unwrap();
        assert!(!s.etag.is_enabled());
        assert!(Settings::from_toml("etag = \"sideways\"").is_err());
    }

    #[test]
    fn loads_from_a_file() {
        let path = std::env::temp_dir().join(format!("strata-settings-{}.toml", std::process::id()));
        std::fs::write(&path, "trust_proxy = true\njson_spaces = 0\n").unwrap();
        let s = Settings::load(&path).unwrap();
        assert!(s.trust_proxy);
        assert_eq!(s.json_spaces, None);
        std::fs::remove_file(&path).unwrap();

        assert!(Settings::load(&path).is_err());
    }

    #[test]
    fn replacer_drops_members_and_nulls_elements() {
        let hide = JsonReplacer::new(|key, v| (key != "secret").then(|| v.clone()));
        let out = hide.apply(&json!({"a": 1, "secret": 2, "list": [1, 2]})).unwrap();
        assert_eq!(out, json!({"a": 1, "list": [1, 2]}));

        let drop_twos = JsonReplacer::new(|_, v| (v != &json!(2)).then(|| v.clone()));
        assert_eq!(drop_twos.apply(&json!([1, 2, 3])).unwrap(), json!([1, null, 3]));
    }
}
