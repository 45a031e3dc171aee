//! Search Module
//!
//! Clients for external literature-search APIs:
//! - arXiv - preprint metadata via the public Atom query API

pub mod arxiv;

pub use arxiv::{
    ArxivClient, ArxivError, ArxivSearch, Paper, PaperLink, SearchResults, SortCriterion,
    SortOrder,
};
