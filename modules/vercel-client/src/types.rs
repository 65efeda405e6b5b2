use base64::Engine;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// One inline file in a deployment request, content-addressed by the
/// SHA-1 of its bytes as the deployment API requires.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentFile {
    pub file: String,
    pub sha: String,
    pub size: usize,
    pub encoding: String,
    pub data: String,
}

impl DeploymentFile {
    pub fn new(path: &str, bytes: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(bytes);
        let sha = hex::encode(hasher.finalize());

        Self {
            file: path.to_string(),
            sha,
            size: bytes.len(),
            encoding: "base64".to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }
}

/// Terminal and in-flight deployment states reported by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Ready,
    Error,
    InProgress,
}

impl ReadyState {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "READY" => ReadyState::Ready,
            "ERROR" | "CANCELED" => ReadyState::Error,
            _ => ReadyState::InProgress,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Deployment {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(rename = "readyState", default)]
    pub ready_state: Option<String>,
    #[serde(rename = "errorMessage", default)]
    pub error_message: Option<String>,
}

impl Deployment {
    pub fn state(&self) -> ReadyState {
        ReadyState::parse(self.ready_state.as_deref().unwrap_or(""))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_state_parse() {
        assert_eq!(ReadyState::parse("READY"), ReadyState::Ready);
        assert_eq!(ReadyState::parse("ERROR"), ReadyState::Error);
        assert_eq!(ReadyState::parse("CANCELED"), ReadyState::Error);
        assert_eq!(ReadyState::parse("BUILDING"), ReadyState::InProgress);
        assert_eq!(ReadyState::parse("QUEUED"), ReadyState::InProgress);
        assert_eq!(ReadyState::parse(""), ReadyState::InProgress);
    }

    #[test]
    fn test_deployment_file_digest() {
        let file = DeploymentFile::new("index.html", b"<html></html>");
        assert_eq!(file.file, "index.html");
        assert_eq!(file.size, 13);
        assert_eq!(file.encoding, "base64");
        // SHA-1 hex digests are 40 chars
        assert_eq!(file.sha.len(), 40);
        assert_eq!(file.data, "PGh0bWw+PC9odG1sPg==");
    }

    #[test]
    fn test_deployment_file_digest_is_content_addressed() {
        let a = DeploymentFile::new("a.txt", b"same");
        let b = DeploymentFile::new("b.txt", b"same");
        assert_eq!(a.sha, b.sha);
    }
}
