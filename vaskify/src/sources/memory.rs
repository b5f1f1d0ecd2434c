//! In-memory source.

use super::PanelSource;
use crate::error::Result;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::prelude::SessionContext;
use std::sync::Arc;

/// A panel that is already in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    batch: Arc<RecordBatch>,
    name: String,
}

impl MemorySource {
    pub fn new(batch: impl Into<Arc<RecordBatch>>) -> Self {
        Self {
            batch: batch.into(),
            name: "memory".to_string(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl PanelSource for MemorySource {
    async fn load(&self, _ctx: &SessionContext) -> Result<RecordBatch> {
        Ok(self.batch.as_ref().clone())
    }

    fn description(&self) -> String {
        format!(
            "In-memory panel '{}' ({} rows)",
            self.name,
            self.batch.num_rows()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::small_panel;

    #[tokio::test]
    async fn test_memory_source_returns_batch() {
        let source = MemorySource::new(small_panel().unwrap()).with_name("survey");
        let ctx = SessionContext::new();

        let batch = source.load(&ctx).await.unwrap();
        assert_eq!(batch.num_rows(), 9);
        assert_eq!(source.description(), "In-memory panel 'survey' (9 rows)");
    }
}
