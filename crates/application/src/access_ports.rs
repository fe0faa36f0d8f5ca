mod administration;
mod cache;
mod entities;
mod permissions;
mod principals;

pub use administration::{GrantUserPermissionInput, PermissionAdminRepository, RolePermissionInput};
pub use cache::{PermissionCacheEntry, PermissionCacheRepository, PrincipalContextCache};
pub use entities::EntityAccessRepository;
pub use permissions::PermissionRepository;
pub use principals::{ModuleAccessEntry, PrincipalRepository};
