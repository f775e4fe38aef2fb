//! Application services: login, account and organization lifecycles, the
//! operation log, and first-start seeding.
//!
//! Services are transport-agnostic. Each call takes the caller's verified
//! `IdentityClaims` explicitly and returns `DomainResult`.

pub mod accounts;
pub mod bootstrap;
pub mod context;
pub mod login;
pub mod op_logs;
pub mod organizations;
pub mod requests;

pub use accounts::AccountService;
pub use bootstrap::{BootstrapConfig, BootstrapReport, PLATFORM_ORG_NAME, bootstrap};
pub use context::ServiceContext;
pub use login::{LoginResult, LoginService, UserInfo};
pub use op_logs::{OpLogService, REDACTED, redact_params};
pub use organizations::{
    AdminSummary, CreatedOrganization, OrganizationDetails, OrganizationService, OrganizationSummary,
};
pub use requests::{
    CreateAccountRequest, CreateSchoolRequest, CreateSupplierRequest, LoginRequest, ResetPasswordRequest,
    UpdateAccountRequest, UpdateSchoolRequest, UpdateStatusRequest, UpdateSupplierRequest,
    UpdateSupplierStatusRequest, validate_input,
};
