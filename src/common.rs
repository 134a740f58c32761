pub mod error;
pub mod i18n;
pub mod pagination;
pub mod slug;
pub mod validators;
