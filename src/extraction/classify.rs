use serde::{Deserialize, Serialize};

/// Which typed stream a row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowClass {
    Annotation,
    FlowLimitation,
}

/// Row type values that select each stream. Matching is exact after trimming.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ClassificationRules {
    pub annotation_kinds: Vec<String>,
    pub flow_limitation_kinds: Vec<String>,
}

impl Default for ClassificationRules {
    fn default() -> Self {
        Self {
            annotation_kinds: vec![
                "ClearAirway".into(),
                "Central".into(),
                "Obstructive".into(),
                "Mixed".into(),
            ],
            flow_limitation_kinds: vec!["FLG".into()],
        }
    }
}

impl ClassificationRules {
    pub fn classify(&self, event_type: &str) -> Option<RowClass> {
        let event_type = event_type.trim();
        if self.annotation_kinds.iter().any(|k| k == event_type) {
            Some(RowClass::Annotation)
        } else if self.flow_limitation_kinds.iter().any(|k| k == event_type) {
            Some(RowClass::FlowLimitation)
        } else {
            None
        }
    }
}
