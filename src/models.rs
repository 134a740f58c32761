pub mod activity;
pub mod auth;
pub mod import;
pub mod invitation;
pub mod lead;
pub mod owner;
pub mod owner_confirmation;
pub mod property;
pub mod tenancy;
pub mod user;
