//! Maps raw state-pull failures to actionable guidance.
//!
//! Entries are checked in order and the first whose pattern occurs in the
//! message wins. Adding a category means adding an entry, nothing else.

/// One remediation category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Remediation {
    /// Short category name
    pub category: &'static str,
    /// Substrings that select this entry (any one matches)
    pub patterns: &'static [&'static str],
    /// Multi-line guidance shown to the user
    pub message: &'static str,
}

impl Remediation {
    pub fn matches(&self, raw: &str) -> bool {
        self.patterns.iter().any(|p| raw.contains(p))
    }
}

/// Remediation entries, most specific first.
pub const REMEDIATIONS: &[Remediation] = &[
    Remediation {
        category: "missing-state",
        patterns: &["no state file"],
        message: "No remote state found. This could mean:\n\
                  \x20 - The remote backend has not been initialized (run 'terraform init')\n\
                  \x20 - No resources have been created yet\n\
                  \x20 - The state file does not exist in the remote backend",
    },
    Remediation {
        category: "access-denied",
        patterns: &["access denied", "permission denied"],
        message: "Permission denied accessing remote state. Check:\n\
                  \x20 - Your AWS/GCP/Azure credentials are configured\n\
                  \x20 - You have read access to the backend\n\
                  \x20 - The backend configuration is correct",
    },
    Remediation {
        category: "timeout",
        patterns: &["context deadline exceeded", "timeout"],
        message: "Timed out connecting to the remote backend. Check:\n\
                  \x20 - Your network connection\n\
                  \x20 - That the backend endpoint is reachable\n\
                  \x20 - Proxy and firewall settings",
    },
    Remediation {
        category: "dns",
        patterns: &["no such host"],
        message: "Cannot resolve the backend hostname. Check:\n\
                  \x20 - Your DNS configuration\n\
                  \x20 - That the backend endpoint URL is correct",
    },
];

/// First remediation entry matching `raw`, if any.
pub fn find_remediation(raw: &str) -> Option<&'static Remediation> {
    REMEDIATIONS.iter().find(|r| r.matches(raw))
}

/// Remediation text for a raw error message.
///
/// Falls back to generic troubleshooting steps that echo the raw error.
pub fn classify_error(raw: &str) -> String {
    match find_remediation(raw) {
        Some(remediation) => remediation.message.to_string(),
        None => format!(
            "Failed to pull remote state: {}\n\n\
             Troubleshooting steps:\n\
             \x20 1. Run 'terraform init'\n\
             \x20 2. Verify the backend configuration\n\
             \x20 3. Check cloud provider credentials\n\
             \x20 4. Ensure network access to the backend",
            raw
        ),
    }
}
