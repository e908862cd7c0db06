//! Image reference parsing for push requests.
//!
//! The daemon's push endpoint takes the familiar repository name in the
//! path and the tag as a query parameter, so a user-supplied reference like
//! `ghcr.io/org/app:v1` is split into those pieces here.

use opsdeck_core::error::{OpsError, Result};

/// Registry assumed when a reference names none.
const DEFAULT_REGISTRY: &str = "docker.io";

/// Namespace Docker Hub uses for single-component names.
const OFFICIAL_NAMESPACE: &str = "library/";

/// Parsed image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Registry hostname, with port if any (e.g. "ghcr.io", "localhost:5000")
    pub registry: String,
    /// Repository path (e.g. "library/nginx", "org/app")
    pub repository: String,
    /// Explicit tag, if one was given
    pub tag: Option<String>,
    /// Digest (e.g. "sha256:abc...")
    pub digest: Option<String>,
}

impl ImageReference {
    /// Parse a reference such as `nginx`, `org/app:v1`,
    /// `registry.local:5000/app:dev` or `ghcr.io/org/app@sha256:...`.
    pub fn parse(reference: &str) -> Result<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(OpsError::InvalidReference(
                "empty image reference".to_string(),
            ));
        }
        if reference.chars().any(char::is_whitespace) {
            return Err(OpsError::InvalidReference(format!(
                "'{}' contains whitespace",
                reference
            )));
        }

        let (name_tag, digest) = match reference.split_once('@') {
            Some((name_tag, digest)) => {
                if !digest.contains(':') {
                    return Err(OpsError::InvalidReference(format!(
                        "invalid digest in '{}': expected algorithm:hex",
                        reference
                    )));
                }
                (name_tag, Some(digest.to_string()))
            }
            None => (reference, None),
        };

        // A tag can only follow the last path component; a colon before
        // that belongs to a registry port.
        let last_component = name_tag.rfind('/').map(|p| p + 1).unwrap_or(0);
        let (name, tag) = match name_tag[last_component..].rfind(':') {
            Some(colon) => {
                let colon = last_component + colon;
                (&name_tag[..colon], Some(name_tag[colon + 1..].to_string()))
            }
            None => (name_tag, None),
        };

        if tag.as_deref() == Some("") {
            return Err(OpsError::InvalidReference(format!(
                "empty tag in '{}'",
                reference
            )));
        }

        let (registry, repository) = split_registry(name, reference)?;
        validate_parts(
            reference,
            &registry,
            &repository,
            tag.as_deref(),
            digest.as_deref(),
        )?;

        Ok(Self {
            registry,
            repository,
            tag,
            digest,
        })
    }

    /// Repository name as the daemon knows it: the default registry and the
    /// official-image namespace are elided.
    pub fn familiar_name(&self) -> String {
        if self.registry == DEFAULT_REGISTRY {
            self.repository
                .strip_prefix(OFFICIAL_NAMESPACE)
                .unwrap_or(&self.repository)
                .to_string()
        } else {
            format!("{}/{}", self.registry, self.repository)
        }
    }

    /// Name and tag to send with a push request.
    ///
    /// A digest-pinned reference cannot be pushed. Without a tag the daemon
    /// pushes every local tag of the repository.
    pub fn push_target(&self) -> Result<(String, Option<String>)> {
        if self.digest.is_some() {
            return Err(OpsError::InvalidReference(format!(
                "cannot push a digest reference: {}",
                self
            )));
        }
        Ok((self.familiar_name(), self.tag.clone()))
    }
}

fn split_registry(name: &str, reference: &str) -> Result<(String, String)> {
    if name.is_empty() {
        return Err(OpsError::InvalidReference(format!(
            "missing repository in '{}'",
            reference
        )));
    }

    if let Some((first, rest)) = name.split_once('/') {
        if first.contains('.') || first.contains(':') || first == "localhost" {
            if rest.is_empty() {
                return Err(OpsError::InvalidReference(format!(
                    "empty repository in '{}'",
                    reference
                )));
            }
            return Ok((first.to_string(), rest.to_string()));
        }
        return Ok((DEFAULT_REGISTRY.to_string(), name.to_string()));
    }

    Ok((
        DEFAULT_REGISTRY.to_string(),
        format!("{}{}", OFFICIAL_NAMESPACE, name),
    ))
}

/// Longest tag the registry accepts.
const MAX_TAG_LEN: usize = 128;

/// Reject anything outside the reference grammar. The name and tag end up
/// in a request path and query, so characters like `?`, `#` or `%` must never
/// get through.
fn validate_parts(
    reference: &str,
    registry: &str,
    repository: &str,
    tag: Option<&str>,
    digest: Option<&str>,
) -> Result<()> {
    let invalid = |what: &str| {
        OpsError::InvalidReference(format!("invalid {} in '{}'", what, reference))
    };

    let registry_ok = registry
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':'));
    if !registry_ok {
        return Err(invalid("registry"));
    }

    // Components are lowercase alphanumerics joined by '.', '_' or '-'.
    let component_ok = |component: &str| {
        let bytes = component.as_bytes();
        !bytes.is_empty()
            && bytes[0].is_ascii_alphanumeric()
            && bytes[bytes.len() - 1].is_ascii_alphanumeric()
            && bytes
                .iter()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'.' | b'_' | b'-'))
    };
    if !repository.split('/').all(component_ok) {
        return Err(invalid("repository name"));
    }

    if let Some(tag) = tag {
        let bytes = tag.as_bytes();
        let tag_ok = bytes.len() <= MAX_TAG_LEN
            && (bytes[0].is_ascii_alphanumeric() || bytes[0] == b'_')
            && bytes
                .iter()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-'));
        if !tag_ok {
            return Err(invalid("tag"));
        }
    }

    if let Some(digest) = digest {
        let digest_ok = digest
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '+' | '.' | '_' | '-' | '='));
        if !digest_ok {
            return Err(invalid("digest"));
        }
    }

    Ok(())
}

impl std::fmt::Display for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.registry, self.repository)?;
        if let Some(ref tag) = self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(ref digest) = self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_official_image() {
        let r = ImageReference::parse("nginx:1.25").unwrap();
        assert_eq!(r.registry, "docker.io");
        assert_eq!(r.repository, "library/nginx");
        assert_eq!(r.tag.as_deref(), Some("1.25"));
        assert_eq!(r.familiar_name(), "nginx");
    }

    #[test]
    fn test_parse_without_tag() {
        let r = ImageReference::parse("myuser/app").unwrap();
        assert_eq!(r.repository, "myuser/app");
        assert_eq!(r.tag, None);
        assert_eq!(r.push_target().unwrap(), ("myuser/app".to_string(), None));
    }

    #[test]
    fn test_parse_registry_with_port() {
        let r = ImageReference::parse("localhost:5000/team/app:dev").unwrap();
        assert_eq!(r.registry, "localhost:5000");
        assert_eq!(r.repository, "team/app");
        assert_eq!(r.tag.as_deref(), Some("dev"));
        assert_eq!(
            r.push_target().unwrap(),
            ("localhost:5000/team/app".to_string(), Some("dev".to_string()))
        );
    }

    #[test]
    fn test_explicit_docker_hub_is_familiar() {
        let r = ImageReference::parse("docker.io/library/alpine:3.19").unwrap();
        assert_eq!(r.familiar_name(), "alpine");
        assert_eq!(r.to_string(), "docker.io/library/alpine:3.19");
    }

    #[test]
    fn test_digest_reference_cannot_be_pushed() {
        let r = ImageReference::parse("ghcr.io/org/app@sha256:abc123").unwrap();
        assert_eq!(r.digest.as_deref(), Some("sha256:abc123"));
        assert!(matches!(
            r.push_target(),
            Err(OpsError::InvalidReference(_))
        ));
    }

    #[test]
    fn test_rejects_characters_outside_grammar() {
        for bad in [
            "app?x=1",
            "app:v1?x=1",
            "app#frag",
            "team/app%2F..",
            "app:v1#x",
            "Team/App:v1",
            "ghcr.io/org/app:-v1",
            "reg?istry.io/app",
            "app@sha256:abc?x",
        ] {
            assert!(
                matches!(ImageReference::parse(bad), Err(OpsError::InvalidReference(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_accepts_grammar_punctuation() {
        let r = ImageReference::parse("registry.local:5000/my_org/app-name.v2:1.0_rc-1").unwrap();
        assert_eq!(r.repository, "my_org/app-name.v2");
        assert_eq!(r.tag.as_deref(), Some("1.0_rc-1"));
    }

    #[test]
    fn test_invalid_references() {
        for bad in ["", "   ", "app@nodigest", "app:", "ghcr.io/", "my app:v1", "team//app"] {
            assert!(
                matches!(ImageReference::parse(bad), Err(OpsError::InvalidReference(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }
}
