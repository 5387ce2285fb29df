mod post;

pub use post::*;
