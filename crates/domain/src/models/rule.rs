use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

/// The two independent rule sets the backend maintains.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RuleKind {
    Format,
    Linting,
}

/// Rule parameter: some rules carry a numeric limit, some a textual option,
/// some nothing at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(untagged)]
pub enum RuleValue {
    Number(f64),
    Text(String),
}

/// Presentation model for a single lint/format rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    /// Human-readable name derived from the id (`max_line_length` → "Max Line Length").
    pub name: String,
    pub is_active: bool,
    #[serde(default)]
    pub value: Option<RuleValue>,
}

/// Wire shape of a rule as the backend stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct ApiRule {
    pub id: String,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<RuleValue>,
}

impl From<ApiRule> for Rule {
    fn from(api: ApiRule) -> Self {
        let name = prettify_id(&api.id);
        Rule {
            id: api.id,
            name,
            is_active: api.enabled,
            value: api.value,
        }
    }
}

impl Rule {
    pub fn to_api(&self) -> ApiRule {
        ApiRule {
            id: self.id.clone(),
            enabled: self.is_active,
            value: self.value.clone(),
        }
    }
}

/// Rule sets are replaced wholesale: the full collection travels on every
/// save, optionally together with the raw config text it was edited as.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct RuleSetUpdate {
    #[serde(rename = "type")]
    pub kind: RuleKind,
    pub rules: Vec<ApiRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_format: Option<String>,
}

impl RuleSetUpdate {
    pub fn new(kind: RuleKind, rules: &[Rule]) -> Self {
        Self {
            kind,
            rules: rules.iter().map(Rule::to_api).collect(),
            config_text: None,
            config_format: None,
        }
    }

    pub fn with_config(mut self, text: impl Into<String>, format: impl Into<String>) -> Self {
        self.config_text = Some(text.into());
        self.config_format = Some(format.into());
        self
    }
}

/// One backend-reported problem in snippet content (compilation or rule
/// violation), attached to validation failures on create/update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub rule_id: String,
    pub message: String,
    pub line: u32,
    pub col: u32,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rule: {} – {} (line {}, column {})",
            self.rule_id, self.message, self.line, self.col
        )
    }
}

/// `max_line-length` → "Max Line Length".
fn prettify_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for word in id.split(['_', '-']).filter(|w| !w.is_empty()) {
        if !out.is_empty() {
            out.push(' ');
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_rule_maps_to_presentation_rule() {
        let api = ApiRule {
            id: "max_line-length".into(),
            enabled: true,
            value: Some(RuleValue::Number(120.0)),
        };
        let rule = Rule::from(api.clone());
        assert_eq!(rule.name, "Max Line Length");
        assert!(rule.is_active);
        assert_eq!(rule.to_api(), api);
    }

    #[test]
    fn rule_set_update_carries_type_discriminator() {
        let rules = vec![Rule::from(ApiRule {
            id: "identifier_format".into(),
            enabled: false,
            value: Some(RuleValue::Text("camelCase".into())),
        })];
        let update = RuleSetUpdate::new(RuleKind::Linting, &rules);
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["type"], "linting");
        assert_eq!(value["rules"][0]["enabled"], false);
        assert_eq!(value["rules"][0]["value"], "camelCase");
        assert!(value.get("configText").is_none());
    }

    #[test]
    fn diagnostic_renders_human_readable() {
        let diag = Diagnostic {
            rule_id: "identifier_format".into(),
            message: "identifier must be camelCase".into(),
            line: 3,
            col: 7,
        };
        assert_eq!(
            diag.to_string(),
            "Rule: identifier_format – identifier must be camelCase (line 3, column 7)"
        );
    }

    #[test]
    fn rule_value_is_untagged_on_the_wire() {
        let parsed: Vec<ApiRule> = serde_json::from_str(
            r#"[{"id":"a","enabled":true,"value":40},{"id":"b","enabled":false,"value":"snake_case"},{"id":"c","enabled":true}]"#,
        )
        .unwrap();
        assert_eq!(parsed[0].value, Some(RuleValue::Number(40.0)));
        assert_eq!(parsed[1].value, Some(RuleValue::Text("snake_case".into())));
        assert_eq!(parsed[2].value, None);
    }
}
