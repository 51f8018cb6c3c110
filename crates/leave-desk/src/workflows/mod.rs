pub mod leave;
pub mod notifications;
pub mod onboarding;
pub mod people;
pub mod store;
