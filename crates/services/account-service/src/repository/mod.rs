//! Repository layer for data access.

mod account_repository;
mod department_repository;
pub mod entities;
mod role_repository;

pub use account_repository::{AccountCriteria, AccountRepository, AccountStore};
pub use department_repository::{DepartmentRepository, DepartmentStore};
pub use role_repository::{RoleRepository, RoleStore};

#[cfg(any(test, feature = "test-utils"))]
pub use account_repository::MockAccountRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use department_repository::MockDepartmentRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use role_repository::MockRoleRepository;
