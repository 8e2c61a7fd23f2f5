pub mod catalog;
pub mod interaction_store;
pub mod recommendation;
pub mod recorder;
