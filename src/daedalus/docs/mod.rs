// SPDX-License-Identifier: MIT

//! Documentation lookup
//!
//! The scope writer only needs the identifiers of the reference pages
//! available to the coder, not their content.

pub mod supabase;

pub use supabase::SupabaseDocs;

use async_trait::async_trait;

use crate::adk::error::DaedalusError;

/// Source of reference-document identifiers
#[async_trait]
pub trait DocumentationSource: Send + Sync {
    async fn list_documentation_pages(&self) -> Result<Vec<String>, DaedalusError>;
}

/// Fixed list of pages, for offline use and tests
#[derive(Debug, Clone, Default)]
pub struct StaticDocs {
    pages: Vec<String>,
}

impl StaticDocs {
    pub fn new(pages: Vec<String>) -> Self {
        Self { pages }
    }
}

#[async_trait]
impl DocumentationSource for StaticDocs {
    async fn list_documentation_pages(&self) -> Result<Vec<String>, DaedalusError> {
        Ok(self.pages.clone())
    }
}
