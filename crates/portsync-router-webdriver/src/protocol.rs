//! W3C WebDriver wire details
//!
//! Request payloads, capability documents and locator strategies. Nothing
//! in here performs I/O.

use portsync_core::BrowserChannel;
use serde::Deserialize;
use serde_json::{Value, json};

/// Key under which WebDriver returns element references
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f434976464c";

/// Error code returned when a lookup matches nothing
pub const NO_SUCH_ELEMENT: &str = "no such element";

/// Error code returned when an element left the document
pub const STALE_ELEMENT: &str = "stale element reference";

/// Calls the page-global function named by the first argument
pub const INVOKE_SCRIPT: &str = "const fn = window[arguments[0]];\
if (typeof fn !== 'function') { throw new Error('no such page function: ' + arguments[0]); }\
fn();";

/// Error payload of a failed command
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WireError {
    pub error: String,
    #[serde(default)]
    pub message: String,
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.error)
        } else {
            write!(f, "{}: {}", self.error, self.message)
        }
    }
}

/// `POST /session` body for `channel`
pub fn new_session_body(channel: BrowserChannel, headless: bool) -> Value {
    let (browser_name, options_key, mut args) = match channel {
        BrowserChannel::Msedge => ("MicrosoftEdge", "ms:edgeOptions", chromium_args()),
        BrowserChannel::Chrome | BrowserChannel::Chromium => {
            ("chrome", "goog:chromeOptions", chromium_args())
        }
        BrowserChannel::Firefox => ("firefox", "moz:firefoxOptions", Vec::new()),
    };

    if headless {
        args.push(match channel {
            BrowserChannel::Firefox => "-headless",
            _ => "--headless=new",
        });
    }

    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": browser_name,
                options_key: { "args": args },
            }
        }
    })
}

fn chromium_args() -> Vec<&'static str> {
    vec!["--window-size=1280,1024", "--disable-gpu"]
}

/// Quote `text` as an XPath 1.0 string literal
///
/// XPath has no escape sequences, so text holding both quote kinds is
/// split into pieces and joined with `concat()`.
pub fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        return format!("'{text}'");
    }
    if !text.contains('"') {
        return format!("\"{text}\"");
    }

    let pieces: Vec<String> = text
        .split('\'')
        .map(|piece| format!("'{piece}'"))
        .collect();
    format!("concat({})", pieces.join(", \"'\", "))
}

/// Relative XPath of the table row whose text contains `text`
pub fn row_xpath(text: &str) -> String {
    format!(".//tr[contains(., {})]", xpath_literal(text))
}

/// Relative XPath of the selection checkbox inside that row
pub fn row_checkbox_xpath(text: &str) -> String {
    format!("{}//input[@type='checkbox']", row_xpath(text))
}

/// Body of an element lookup
pub fn find_body(using: &str, value: &str) -> Value {
    json!({ "using": using, "value": value })
}

/// Element reference from a lookup result
pub fn element_id(value: &Value) -> Option<String> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(str::to_string)
}
