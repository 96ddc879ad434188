pub mod location;
pub mod source_map;
