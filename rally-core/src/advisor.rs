use async_trait::async_trait;

/// External text generator that turns a short activity summary into advice.
/// Its output is opaque, render-only text.
#[async_trait]
pub trait Advisor: Send + Sync {
    async fn advise(
        &self,
        summary: &str,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

/// Used when no advisor endpoint is configured.
pub struct DisabledAdvisor;

#[async_trait]
impl Advisor for DisabledAdvisor {
    async fn advise(
        &self,
        _summary: &str,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        Err("Advisor is not configured".into())
    }
}

/// Returns a canned reply; handy in tests and demos.
pub struct StaticAdvisor {
    reply: String,
}

impl StaticAdvisor {
    pub fn new(reply: impl Into<String>) -> Self {
        Self { reply: reply.into() }
    }
}

#[async_trait]
impl Advisor for StaticAdvisor {
    async fn advise(
        &self,
        summary: &str,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        tracing::debug!("Static advisor asked about: {}", summary);
        Ok(self.reply.clone())
    }
}
