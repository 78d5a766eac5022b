//! `c2pa.actions[.v2]` (§3): the ordered record of edits that produced the
//! asset, each an action name plus optional actor/parameters/ingredient
//! references.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hashed_uri::HashedUri;
use crate::jumbf::data_box::CborBox;
use crate::jumbf::description_box::DescriptionBox;
use crate::jumbf::{box_type, JumbfBox, SuperBox};

pub const LABEL_V1: &str = "c2pa.actions";
pub const LABEL_V2: &str = "c2pa.actions.v2";
pub const LABELS: &[&str] = &[LABEL_V1, LABEL_V2];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub when: Option<String>,
    #[serde(rename = "softwareAgent", skip_serializing_if = "Option::is_none", default)]
    pub software_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parameters: Option<serde_json::Value>,
    /// References to the `c2pa.ingredient[.v2]` assertions this action
    /// operated on, present from `c2pa.actions.v2` onward.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub changed: Vec<HashedUri>,
}

impl Action {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            when: None,
            software_agent: None,
            parameters: None,
            changed: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionAssertion {
    #[serde(skip)]
    pub version: u8,
    pub actions: Vec<Action>,
}

impl ActionAssertion {
    pub fn new(version: u8) -> Self {
        Self { version, actions: Vec::new() }
    }

    pub fn label(&self) -> &'static str {
        match self.version {
            1 => LABEL_V1,
            _ => LABEL_V2,
        }
    }

    pub fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub(crate) fn parse(sbox: &SuperBox) -> Result<Self> {
        let label = sbox.description.label.as_deref().unwrap_or(LABEL_V1);
        let version = if label == LABEL_V1 { 1 } else { 2 };
        let cbor = sbox
            .children
            .iter()
            .find_map(JumbfBox::as_cbor)
            .ok_or_else(|| Error::MalformedContent("action assertion missing cbor box".into()))?;
        let mut parsed: ActionAssertion = ciborium::de::from_reader(cbor.raw.as_slice())?;
        parsed.version = version;
        Ok(parsed)
    }

    pub(crate) fn to_super_box(&self) -> Result<SuperBox> {
        let mut raw = Vec::new();
        ciborium::ser::into_writer(self, &mut raw)?;
        let desc = DescriptionBox::new(box_type::CBOR_ASSERTION_UUID).with_label(self.label());
        Ok(SuperBox::new(desc).with_child(JumbfBox::Cbor(CborBox { tag: None, raw })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_ordered_actions() {
        let mut assertion = ActionAssertion::new(2);
        assertion.push(Action::new("c2pa.created"));
        let mut edited = Action::new("c2pa.color_adjustments");
        edited.software_agent = Some("Acme Editor 1.0".to_string());
        assertion.push(edited);

        let sbox = assertion.to_super_box().unwrap();
        assert_eq!(sbox.description.label.as_deref(), Some(LABEL_V2));

        let parsed = ActionAssertion::parse(&sbox).unwrap();
        assert_eq!(parsed.actions.len(), 2);
        assert_eq!(parsed.actions[0].action, "c2pa.created");
        assert_eq!(parsed.actions[1].software_agent.as_deref(), Some("Acme Editor 1.0"));
    }
}
