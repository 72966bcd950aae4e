use serde::{Deserialize, Serialize};

/// Identity supplied by the caller alongside a chat or reservation request.
/// All fields are optional on the chat path; the reservation write path
/// requires a name and a deliverable email address.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl StudentInfo {
    /// Identity is complete when a non-empty name and a plausible email are
    /// present. Completeness gates the inventory write path.
    pub fn is_complete(&self) -> bool {
        let has_name = self.name.as_deref().is_some_and(|name| !name.trim().is_empty());
        let has_email = self.email.as_deref().is_some_and(valid_email);
        has_name && has_email
    }
}

/// Minimal deliverability check: a local part, an `@`, and a domain with at
/// least one dot separator after it.
pub fn valid_email(candidate: &str) -> bool {
    let trimmed = candidate.trim();
    let Some((local, domain)) = trimmed.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::{valid_email, StudentInfo};

    #[test]
    fn accepts_plain_addresses() {
        assert!(valid_email("2220123@ub.edu.ph"));
        assert!(valid_email("maria.santos@example.edu"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!valid_email("no-at-sign"));
        assert!(!valid_email("@missing.local"));
        assert!(!valid_email("missing-domain@"));
        assert!(!valid_email("dot-at-edge@.example"));
        assert!(!valid_email("no-domain-dot@example"));
    }

    #[test]
    fn completeness_requires_name_and_email() {
        let empty = StudentInfo::default();
        assert!(!empty.is_complete());

        let name_only =
            StudentInfo { name: Some("Maria Santos".to_string()), ..StudentInfo::default() };
        assert!(!name_only.is_complete());

        let complete = StudentInfo {
            student_id: Some("2220123".to_string()),
            name: Some("Maria Santos".to_string()),
            email: Some("2220123@ub.edu.ph".to_string()),
        };
        assert!(complete.is_complete());
    }
}
