pub mod event;
pub mod journal;
pub mod proof;
pub mod settlement;
pub mod status;
