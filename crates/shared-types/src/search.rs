use serde::{Deserialize, Serialize};

/// A single hit from the compliance search endpoint.
///
/// `entity_type` is one of `contract_clause`, `compliance_deadline`,
/// `compliance_notice`; `metadata` carries per-type fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceSearchResult {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub title: String,
    pub description: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: Option<String>,
}

/// Query parameters for compliance search.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
pub struct ComplianceSearchParams {
    pub q: String,
    /// Comma-separated subset of searchable types.
    pub types: Option<String>,
    pub status: Option<String>,
    pub severity: Option<String>,
}

/// Searchable entity type keys.
pub const SEARCHABLE_TYPES: &[&str] = &[
    "contract_clause",
    "compliance_deadline",
    "compliance_notice",
];

/// Parse the `types` query parameter into a validated list. An absent or
/// empty parameter means all types; unknown entries are rejected.
pub fn parse_search_types(raw: Option<&str>) -> Result<Vec<&'static str>, String> {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Ok(SEARCHABLE_TYPES.to_vec());
    };
    let mut out = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        match SEARCHABLE_TYPES.iter().find(|t| **t == part) {
            Some(t) => {
                if !out.contains(t) {
                    out.push(*t);
                }
            }
            None => return Err(format!("Unknown search type: {}", part)),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn absent_types_means_all() {
        assert_eq!(parse_search_types(None).unwrap(), SEARCHABLE_TYPES.to_vec());
        assert_eq!(parse_search_types(Some("  ")).unwrap(), SEARCHABLE_TYPES.to_vec());
    }

    #[test]
    fn parses_and_dedupes() {
        let types = parse_search_types(Some("contract_clause, compliance_notice,contract_clause")).unwrap();
        assert_eq!(types, vec!["contract_clause", "compliance_notice"]);
    }

    #[test]
    fn unknown_type_rejected() {
        let err = parse_search_types(Some("contract_clause,rfi")).unwrap_err();
        assert!(err.contains("rfi"));
    }
}
