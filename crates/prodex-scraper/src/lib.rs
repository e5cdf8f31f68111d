pub mod error;
pub mod fetch;
pub mod fields;
pub mod identifier;
pub mod image_probe;
pub mod lazy_images;
pub mod options;
pub mod page;
pub mod parser;
pub mod pipeline;
pub mod poll;
mod rate_limit;
pub mod registry;
pub mod sites;
pub mod structured;
pub mod variants;

pub use error::{PageError, RegistryError, ScraperError};
pub use fetch::PageFetcher;
pub use image_probe::{HttpImageProbe, ImageProbe};
pub use lazy_images::{LazyImageLoader, LazyLoadConfig, LazyLoadReport, LoaderState};
pub use page::{ElementHandle, ElementSnapshot, PageHandle, SnapshotPage};
pub use parser::{PageContext, Parser, SiteSelectors};
pub use pipeline::{extract_product, ExtractionOutcome};
pub use registry::{Detection, SiteRegistration, SiteRegistry};
pub use sites::AdapterServices;
pub use structured::StructuredProduct;
