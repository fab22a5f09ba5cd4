//! Severity resolution strategies.
//!
//! `TableLookupResolver` maps the image label through the severity table;
//! `TextModelResolver` classifies the user's message. Deployments pick one.

use crate::domain::{DomainError, SeverityTable, SeverityTier};
use crate::ports::{InputPolicy, SeverityContext, SeverityResolver, TextSeverityPort};
use std::sync::Arc;
use tracing::debug;

/// Deterministic lookup of the image-derived label.
pub struct TableLookupResolver {
    table: Arc<SeverityTable>,
}

impl TableLookupResolver {
    pub fn new(table: Arc<SeverityTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &SeverityTable {
        &self.table
    }
}

#[async_trait::async_trait]
impl SeverityResolver for TableLookupResolver {
    fn name(&self) -> &'static str {
        "table"
    }

    fn input_policy(&self) -> InputPolicy {
        InputPolicy::ImageRequired
    }

    async fn resolve(&self, ctx: SeverityContext<'_>) -> Result<SeverityTier, DomainError> {
        let tier = ctx
            .disease
            .map(|disease| self.table.lookup(disease))
            .unwrap_or(SeverityTier::Unknown);
        debug!(disease = ?ctx.disease, tier = %tier, "severity table lookup");
        Ok(tier)
    }
}

/// Severity from a text classifier run over the user's message.
pub struct TextModelResolver {
    classifier: Arc<dyn TextSeverityPort>,
}

impl TextModelResolver {
    pub fn new(classifier: Arc<dyn TextSeverityPort>) -> Self {
        Self { classifier }
    }
}

#[async_trait::async_trait]
impl SeverityResolver for TextModelResolver {
    fn name(&self) -> &'static str {
        "text_model"
    }

    fn input_policy(&self) -> InputPolicy {
        InputPolicy::AnyModality
    }

    async fn resolve(&self, ctx: SeverityContext<'_>) -> Result<SeverityTier, DomainError> {
        let Some(message) = ctx.message else {
            return Ok(SeverityTier::Unknown);
        };
        let tier = self
            .classifier
            .classify_severity(message)
            .await?
            .unwrap_or(SeverityTier::Unknown);
        debug!(tier = %tier, "text severity classification");
        Ok(tier)
    }
}
