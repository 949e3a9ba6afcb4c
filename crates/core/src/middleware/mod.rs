mod cors;
mod headers;

pub use cors::*;
pub use headers::*;
