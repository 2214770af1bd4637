//! Firmware-specific details of the router admin panel
//!
//! Everything in here is a quirk of one router firmware: element ids,
//! page-native script entry points, the mapping page path, and the way the
//! panel abbreviates long entry names. Other panels need another profile,
//! not another session.

use serde::{Deserialize, Serialize};

/// Router admin panel profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterProfile {
    /// Root URL of the admin panel, without trailing slash
    pub base_url: String,

    /// Path of the IPv6 port mapping page
    pub mapping_path: String,

    /// Page function revealing the login form
    pub login_trigger: String,

    /// Username input
    pub username_field: String,

    /// Password input
    pub password_field: String,

    /// Page function submitting the login form
    pub submit_trigger: String,

    /// Element only present once logged in
    pub logged_in_marker: String,

    /// Table listing the mapping entries
    pub mapping_table: String,

    /// Internal client address input of the edit form
    pub internal_client_field: String,

    /// Button applying the edit form
    pub apply_button: String,

    /// Longest entry name the panel shows unabbreviated
    pub label_limit: usize,

    /// Appended by the panel to abbreviated names
    pub ellipsis: String,
}

impl RouterProfile {
    /// Default profile pointed at another root URL
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// URL of the login page
    pub fn root_url(&self) -> String {
        self.base_url.clone()
    }

    /// URL of the port mapping page
    pub fn mapping_url(&self) -> String {
        format!("{}{}", self.base_url, self.mapping_path)
    }

    /// Text the panel renders for an entry called `name`
    ///
    /// Names longer than `label_limit` characters are shown as their first
    /// `label_limit` characters followed by `ellipsis`, and the row text only
    /// contains that abbreviation.
    pub fn search_label(&self, name: &str) -> String {
        if name.chars().count() > self.label_limit {
            let head: String = name.chars().take(self.label_limit).collect();
            format!("{}{}", head, self.ellipsis)
        } else {
            name.to_string()
        }
    }
}

impl Default for RouterProfile {
    fn default() -> Self {
        Self {
            base_url: "http://192.168.1.1".to_string(),
            mapping_path: "/html/bbsp/ipv6portmapping/ipv6portmapping.asp".to_string(),
            login_trigger: "AdminuserSubmit1".to_string(),
            username_field: "input#txt_normalUsername".to_string(),
            password_field: "input#txt_normalPassword".to_string(),
            submit_trigger: "SubmitForm".to_string(),
            logged_in_marker: "#headerLogoutText".to_string(),
            mapping_table: "#portMappingInst".to_string(),
            internal_client_field: "#InternalClient".to_string(),
            apply_button: "#btnApply_ex".to_string(),
            label_limit: 10,
            ellipsis: "......".to_string(),
        }
    }
}
