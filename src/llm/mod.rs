mod embedders;

pub use embedders::*;
