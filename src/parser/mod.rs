pub mod title;

pub use title::infer_title;
