mod explanation;
mod item;
mod session;

pub use explanation::{AttributeImportance, Explanation, ItemSummary, Reason, ReasonKind};
pub use item::{Item, ItemAttributes, RecommendedItem};
pub use session::{Session, SessionUpdate};
