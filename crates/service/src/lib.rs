//! Business layer over the repositories.
//!
//! Services add human-readable context to repository failures while keeping
//! the underlying [`RepoError`](idm_db::RepoError) reachable, and map entities
//! to response DTOs before returning them.

pub mod dto;
pub mod employee;
pub mod error;
pub mod role;

pub use dto::{EmployeeResponse, RoleResponse};
pub use employee::EmployeeService;
pub use error::{ServiceError, ServiceResult};
pub use role::RoleService;
