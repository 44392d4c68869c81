pub mod sample_loader;
pub mod stem_set;

pub use sample_loader::decode_stem_set;
pub use stem_set::{list_songs, StemSet};
