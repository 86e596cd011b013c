pub mod consent;
pub mod extractors;
pub mod filler;
pub mod gates;

pub use consent::{detect_consent, ConsentResult};
pub use extractors::{extract_address, extract_name, extract_phone, extract_time};
pub use filler::{is_effectively_silent, preprocess};
pub use gates::slot_is_complete;
