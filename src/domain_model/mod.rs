mod member;
mod principal;

pub use member::*;
pub use principal::*;
