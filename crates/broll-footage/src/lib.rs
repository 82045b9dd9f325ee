//! Stock footage providers and clip acquisition.
//!
//! This crate provides:
//! - Pexels and Pixabay video search clients behind one trait
//! - Candidate filtering on size, orientation and metadata terms
//! - Bounded streaming downloads
//! - The acquisition engine with cross-provider fallback
//! - Keyword translation for search queries

pub mod acquire;
pub mod download;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod pexels;
pub mod pixabay;
pub mod provider;
pub mod translate;

pub use acquire::{AcquisitionConfig, AcquisitionEngine, CandidateChoice, ProviderOrder};
pub use download::ClipDownloader;
pub use error::{ProviderError, ProviderResult};
pub use filter::MetadataFilter;
pub use pexels::{PexelsProvider, PEXELS_BASE_URL};
pub use pixabay::{PixabayProvider, PIXABAY_BASE_URL};
pub use provider::{FootageProvider, ProviderConfig};
pub use translate::{HttpTranslator, KeywordTranslator, StaticTermTable, MYMEMORY_BASE_URL};
