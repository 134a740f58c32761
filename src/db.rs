pub mod activity_repo;
pub use activity_repo::ActivityRepository;
pub mod import_repo;
pub use import_repo::ImportRepository;
pub mod invitation_repo;
pub use invitation_repo::InvitationRepository;
pub mod lead_repo;
pub use lead_repo::LeadRepository;
pub mod owner_confirmation_repo;
pub use owner_confirmation_repo::OwnerConfirmationRepository;
pub mod owner_repo;
pub use owner_repo::OwnerRepository;
pub mod property_repo;
pub use property_repo::PropertyRepository;
pub mod tenant_repo;
pub use tenant_repo::TenantRepository;
pub mod user_repo;
pub use user_repo::{UserRepository, UserSession};
