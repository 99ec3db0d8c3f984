// src/extractors/mod.rs
pub mod normalize;
pub mod section;

// Re-export key extraction types for convenience
#[allow(unused_imports)]
pub use section::{
    choose_heading,
    is_toc_remainder,
    ExtractionConfig,
    HeadingCandidate,
    HeadingChoice,
    SectionExtractor,
    SectionId,
    SectionSpan,
    SpanBoundary,
};
pub use normalize::normalize;
