pub mod activity;
pub mod auth;
pub mod confirmations;
pub mod health;
pub mod imports;
pub mod invitations;
pub mod leads;
pub mod owners;
pub mod properties;
pub mod tenants;
pub mod users;
