pub mod audit_logs;
pub mod cart_items;
pub mod carts;
pub mod categories;
pub mod order_items;
pub mod orders;
pub mod products;
pub mod roles;
pub mod tokens;
pub mod user_roles;
pub mod users;
pub mod vendors;
pub mod wishlist_items;

pub use audit_logs::Entity as AuditLogs;
pub use cart_items::Entity as CartItems;
pub use carts::Entity as Carts;
pub use categories::Entity as Categories;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use roles::Entity as Roles;
pub use tokens::Entity as Tokens;
pub use user_roles::Entity as UserRoles;
pub use users::Entity as Users;
pub use vendors::Entity as Vendors;
pub use wishlist_items::Entity as WishlistItems;
