pub mod metadata;
pub mod plot;
pub mod table;
pub mod tiff;
