//! Disease resolution and therapeutic-area classification (spec §4.3, §4.4).

pub mod disease;
pub mod therapeutic_area;

pub use disease::DiseaseResolver;
