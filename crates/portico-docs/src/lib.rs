pub mod merge;
pub mod router;
pub mod viewer;

pub use merge::merge_service_doc;
pub use router::{DocFetchError, DocsState, ServiceDocSource, docs_router};
pub use viewer::ViewerConfig;
