use std::collections::BTreeMap;

/// Represents ways to locate an element in the watched document tree
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Select by role and optional accessible name
    Role { role: String, name: Option<String> },
    /// Select by element ID
    Id(String),
    /// Select by name attribute (form controls share a name within a group)
    Name(String),
    /// Select by descendant text content (contains-match)
    Text(String),
    /// Select by fixed machine identifier (the `data-testid` analog)
    TestId(String),
    /// Select by multiple attributes (key-value contains-match)
    Attributes(BTreeMap<String, String>),
    /// Select by the text of the element's associated label (contains-match)
    LabelContains(String),
    /// Chain multiple selectors, each scoped to the previous match
    Chain(Vec<Selector>),
    /// Select the n-th element from the matches
    Nth(i32),
    /// Represents an invalid selector string, with a reason.
    Invalid(String),
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        // Handle chained selectors first
        let parts: Vec<&str> = s.split(">>").map(|p| p.trim()).collect();
        if parts.len() > 1 {
            return Selector::Chain(parts.into_iter().map(Selector::from).collect());
        }

        // if using pipe, use it for the role plus name (preferred precise format)
        if s.contains('|') {
            let parts: Vec<&str> = s.split('|').collect();
            if parts.len() >= 2 {
                let role_part = parts[0].trim();
                let name_part = parts[1].trim();

                // Handle role:abcd|name:abcd format
                let role = role_part
                    .strip_prefix("role:")
                    .unwrap_or(role_part)
                    .to_string();
                let name = name_part
                    .strip_prefix("name:")
                    .unwrap_or(name_part)
                    .to_string();

                return Selector::Role {
                    role,
                    name: Some(name),
                };
            }
        }

        // Make common roles like "button", "link", etc. default to Role selectors
        // instead of Name selectors
        match s {
            _ if s.starts_with("role:") => Selector::Role {
                role: s[5..].to_string(),
                name: None,
            },
            "link" | "button" | "radio" | "checkbox" | "textbox" | "textarea" | "input"
            | "section" | "form" | "region" => Selector::Role {
                role: s.to_string(),
                name: None,
            },
            _ if s.starts_with("Name:") || s.starts_with("name:") => {
                let parts: Vec<&str> = s.splitn(2, ':').collect();
                Selector::Name(parts[1].to_string())
            }
            _ if s.to_lowercase().starts_with("testid:") => {
                let parts: Vec<&str> = s.splitn(2, ':').collect();
                Selector::TestId(parts[1].trim().to_string())
            }
            _ if s.to_lowercase().starts_with("label:") => {
                let parts: Vec<&str> = s.splitn(2, ':').collect();
                Selector::LabelContains(parts[1].trim().to_string())
            }
            _ if s.to_lowercase().starts_with("nth=") || s.to_lowercase().starts_with("nth:") => {
                let index_str = &s["nth=".len()..];
                if let Ok(index) = index_str.parse::<i32>() {
                    Selector::Nth(index)
                } else {
                    Selector::Invalid(format!("Invalid index for nth selector: '{index_str}'"))
                }
            }
            _ if s.starts_with("id:") => Selector::Id(s[3..].to_string()),
            _ if s.starts_with("text:") => Selector::Text(s[5..].to_string()),
            _ if s.starts_with('#') => Selector::Id(s[1..].to_string()),
            _ if s.contains(':') => {
                let parts: Vec<&str> = s.splitn(2, ':').collect();
                Selector::Role {
                    role: parts[0].to_string(),
                    name: Some(parts[1].to_string()),
                }
            }
            _ => Selector::Invalid(format!(
                "Unknown selector format: \"{s}\". Use prefixes like 'role:', 'name:', 'id:', 'text:', 'testid:', or 'label:' to specify the selector type."
            )),
        }
    }
}

impl From<String> for Selector {
    fn from(s: String) -> Self {
        Selector::from(s.as_str())
    }
}
