pub mod activity_service;
pub mod auth;
pub mod document_service;
pub mod import_parser;
pub mod import_service;
pub mod invitation_service;
pub mod lead_service;
pub mod mailer;
pub mod owner_confirmation_service;
pub mod owner_service;
pub mod property_service;
pub mod tenancy_service;
pub mod user_service;
