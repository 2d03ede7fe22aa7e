pub mod stub_identity_service;

pub use stub_identity_service::StubIdentityService;
