use crate::dataset::DatasetRef;
use crate::error::Result;
use crate::models::Record;
use crate::pipeline::{GroupRow, Pipeline};
use crate::search::Filter;

/// Query interface of the record store.
///
/// Implementations route each [`DatasetRef`] to the source it was resolved to.
#[allow(async_fn_in_trait)]
pub trait RecordStore {
    /// Records of `dataset` matching `filter`, in storage order.
    async fn find(&self, dataset: &DatasetRef, filter: &Filter) -> Result<Vec<Record>>;

    async fn aggregate(&self, dataset: &DatasetRef, pipeline: &Pipeline)
        -> Result<Vec<GroupRow>>;
}

#[cfg(test)]
pub mod memory {
    use std::collections::HashMap;

    use super::*;

    /// Record store backed by in-process vectors, keyed by collection name.
    #[derive(Default)]
    pub struct MemoryStore {
        datasets: HashMap<String, Vec<Record>>,
    }

    impl MemoryStore {
        pub fn with(mut self, dataset: &DatasetRef, records: Vec<Record>) -> Self {
            self.datasets.insert(dataset.collection(), records);
            self
        }

        fn records(&self, dataset: &DatasetRef) -> &[Record] {
            self.datasets
                .get(&dataset.collection())
                .map(Vec::as_slice)
                .unwrap_or(&[])
        }
    }

    impl RecordStore for MemoryStore {
        async fn find(&self, dataset: &DatasetRef, filter: &Filter) -> Result<Vec<Record>> {
            Ok(self
                .records(dataset)
                .iter()
                .filter(|record| filter.matches(record))
                .cloned()
                .collect())
        }

        async fn aggregate(
            &self,
            dataset: &DatasetRef,
            pipeline: &Pipeline,
        ) -> Result<Vec<GroupRow>> {
            Ok(pipeline.evaluate(self.records(dataset)))
        }
    }
}
