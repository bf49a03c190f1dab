use bollard::models::ContainerSummary;

/// Display metadata for one log source, derived from Docker's list API.
/// The core only interprets `id` (as a map key) and `state` (liveness);
/// everything else is passed through to collaborators untouched.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SourceInfo {
    pub id: String,    // Full container ID 64-char hash
    pub name: String,  // Without leading slash
    pub image: String,
    pub state: String, // "running", "paused", "exited"
    pub status: String, // "Up 2 hours"
    pub labels: std::collections::HashMap<String, String>,
    pub created_at: i64, // Unix timestamp
}

impl SourceInfo {
    /// A source is live while its container can still produce output. A
    /// paused container keeps its stream open, so it stays live.
    pub fn is_live(&self) -> bool {
        matches!(self.state.as_str(), "running" | "paused" | "restarting")
    }
}

impl From<ContainerSummary> for SourceInfo {
    fn from(s: ContainerSummary) -> Self {
        Self {
            id: s.id.unwrap_or_default(),
            name: s
                .names
                .as_deref()
                .and_then(|n| n.first())
                .map(|n| n.trim_start_matches('/'))
                .unwrap_or("unknown")
                .to_string(),
            image: s.image.unwrap_or_default(),
            state: s
                .state
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unknown".into()),
            status: s.status.unwrap_or_default(),
            labels: s.labels.unwrap_or_default(),
            created_at: s.created.unwrap_or_default(),
        }
    }
}
