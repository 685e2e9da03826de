//! Structural kubeconfig validation.
//!
//! Only checks that the document is shaped like a kubeconfig and is internally
//! consistent. Connectivity and credentials are left to the CLI.

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Kubeconfig {
    kind: Option<String>,
    // client-go serializes empty lists as `null`.
    clusters: Option<Vec<NamedCluster>>,
    contexts: Option<Vec<NamedContext>>,
    current_context: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedCluster {
    name: String,
}

#[derive(Debug, Deserialize)]
struct NamedContext {
    name: String,
    context: Option<ContextRef>,
}

#[derive(Debug, Deserialize)]
struct ContextRef {
    cluster: Option<String>,
}

/// Reject `content` unless it parses as a usable kubeconfig document.
pub fn validate(content: &[u8]) -> Result<()> {
    let config: Kubeconfig =
        serde_yaml::from_slice(content).map_err(|e| Error::InvalidCredential(e.to_string()))?;

    if let Some(kind) = config.kind.as_deref() {
        if kind != "Config" {
            return Err(Error::InvalidCredential(format!(
                "unexpected kind '{}', expected 'Config'",
                kind
            )));
        }
    }

    let clusters = config.clusters.unwrap_or_default();
    let contexts = config.contexts.unwrap_or_default();

    if clusters.is_empty() {
        return Err(Error::InvalidCredential("no clusters defined".to_string()));
    }

    for ctx in &contexts {
        let Some(cluster) = ctx.context.as_ref().and_then(|c| c.cluster.as_deref()) else {
            continue;
        };
        if !clusters.iter().any(|c| c.name == cluster) {
            return Err(Error::InvalidCredential(format!(
                "context '{}' references unknown cluster '{}'",
                ctx.name, cluster
            )));
        }
    }

    if let Some(current) = config.current_context.as_deref().filter(|c| !c.is_empty()) {
        if !contexts.iter().any(|c| c.name == current) {
            return Err(Error::InvalidCredential(format!(
                "current-context '{}' is not defined",
                current
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
apiVersion: v1
kind: Config
clusters:
- name: dev
  cluster:
    server: https://api.dev.example.com:6443
contexts:
- name: dev-admin
  context:
    cluster: dev
    user: admin
current-context: dev-admin
users:
- name: admin
  user:
    token: sha256~abc
"#;

    #[test]
    fn accepts_well_formed_config() {
        assert!(validate(VALID.as_bytes()).is_ok());
    }

    #[test]
    fn accepts_empty_current_context() {
        let doc = VALID.replace("current-context: dev-admin", "current-context: \"\"");
        assert!(validate(doc.as_bytes()).is_ok());
    }

    #[test]
    fn accepts_null_lists_written_by_client_go() {
        let doc = "apiVersion: v1\nkind: Config\nclusters:\n- name: dev\n  cluster:\n    server: https://x:6443\ncontexts: null\nusers: null\ncurrent-context: \"\"\n";
        assert!(validate(doc.as_bytes()).is_ok());
    }

    #[test]
    fn accepts_context_without_cluster() {
        let doc = VALID.replace("    cluster: dev\n", "");
        assert!(validate(doc.as_bytes()).is_ok());

        let doc = "clusters:\n- name: dev\ncontexts:\n- name: bare\n  context: null\n";
        assert!(validate(doc.as_bytes()).is_ok());
    }

    #[test]
    fn null_clusters_still_rejected() {
        let err = validate(b"kind: Config\nclusters: null\n").unwrap_err();
        assert!(err.to_string().contains("no clusters"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            validate(&[0x01, 0x02]),
            Err(Error::InvalidCredential(_))
        ));
        assert!(matches!(
            validate(b"just some text"),
            Err(Error::InvalidCredential(_))
        ));
    }

    #[test]
    fn rejects_wrong_kind() {
        let doc = VALID.replace("kind: Config", "kind: Pod");
        let err = validate(doc.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("unexpected kind"));
    }

    #[test]
    fn rejects_missing_clusters() {
        let err = validate(b"apiVersion: v1\nkind: Config\n").unwrap_err();
        assert!(err.to_string().contains("no clusters"));
    }

    #[test]
    fn rejects_dangling_references() {
        let doc = VALID.replace("    cluster: dev\n", "    cluster: prod\n");
        let err = validate(doc.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("unknown cluster 'prod'"));

        let doc = VALID.replace("current-context: dev-admin", "current-context: other");
        let err = validate(doc.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("current-context 'other'"));
    }
}
