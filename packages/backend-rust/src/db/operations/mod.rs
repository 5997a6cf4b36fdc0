pub mod attempts;
pub mod items;
pub mod mastery;
pub mod parameters;
pub mod skills;

pub use attempts::*;
pub use items::*;
pub use mastery::*;
pub use parameters::*;
pub use skills::*;
