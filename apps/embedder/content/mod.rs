mod localized;
mod rich_text;
mod tour;

pub use localized::{Blank, LocalizedRichText, LocalizedText, pick};
pub use rich_text::{MAX_EXTRACTED_CHARS, extract_text};
pub use tour::{RelatedEntity, TourRecord, TourStatus};
